//! Sculpt DSP - Signal Chain and Analysis Pipeline
//!
//! This crate provides the signal-processing core for Sculpt:
//! - The cut/peak/cut filter chain (Butterworth cascades + RBJ peak)
//! - The coefficient factory and its immutable, swappable filter banks
//! - Lock-free block relays moving audio off the real-time thread
//! - The windowed-FFT spectrum generator and its frame queue
//! - Curve building and analytic response evaluation for display
//!
//! # Architecture
//!
//! Everything here is thread-agnostic: no threads are spawned and no
//! locks taken. The audio callback owns `ChannelChain`s and
//! `BlockProducer`s; the analysis side owns the consumers, the
//! `SpectrumGenerator`s and the curve code. Coefficients cross the
//! boundary as immutable `FilterBank` values behind an atomic handle
//! owned by the caller.

mod coeffs;
mod curve;
mod error;
mod filter;
mod relay;
mod response;
mod settings;
mod spectrum;

pub use coeffs::{
    build_filter_bank, high_cut_coefficients, identity, low_cut_coefficients, peak_coefficients,
    CutCoeffs, FilterBank, MAX_CUT_SECTIONS,
};
pub use curve::{db_to_y, normalized_log_position, CurveBuilder};
pub use error::DspError;
pub use filter::{ChannelChain, CutStage};
pub use relay::{BlockConsumer, BlockProducer, BlockRelay};
pub use response::{
    chain_magnitude_db, magnitude_db_at, pixel_frequency, response_db, response_points,
    RESPONSE_CEIL_DB, RESPONSE_FLOOR_DB,
};
pub use settings::{
    ChainSettings, Slope, MAX_FREQ_HZ, MAX_GAIN_DB, MAX_Q, MIN_FREQ_HZ, MIN_GAIN_DB, MIN_Q,
};
pub use spectrum::{
    SpectrumFrame, SpectrumFrames, SpectrumGenerator, DEFAULT_FFT_SIZE, SPECTRUM_FLOOR_DB,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let settings = ChainSettings::default();
        let _bank = build_filter_bank(&settings, 48_000.0, 0);
        let _chain = ChannelChain::new();
    }
}
