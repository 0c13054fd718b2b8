//! DSP Error Types

use thiserror::Error;

/// Errors that can occur when constructing DSP components.
///
/// Nothing on the per-sample path returns errors: out-of-range settings
/// are clamped at the boundary and degenerate coefficients are prevented
/// inside the factory, so these only surface at build time.
#[derive(Error, Debug)]
pub enum DspError {
    #[error("FFT size must be a power of two >= 64, got {0}")]
    InvalidFftSize(usize),

    #[error("Sample rate must be positive, got {0}")]
    InvalidSampleRate(f32),

    #[error("Relay needs a non-zero block length and capacity, got {block_len} x {capacity_blocks}")]
    InvalidRelayCapacity {
        block_len: usize,
        capacity_blocks: usize,
    },

    #[error("Frame queue capacity must be non-zero, got {0}")]
    InvalidQueueCapacity(usize),
}
