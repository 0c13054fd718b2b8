//! Coefficient Factory
//!
//! Pure functions turning a [`ChainSettings`] snapshot into biquad
//! coefficients: an RBJ parametric peak section and Butterworth high-order
//! cut cascades decomposed into second-order sections.
//!
//! Called once per parameter change, never per sample. Deterministic:
//! the same snapshot and sample rate always produce bit-identical
//! coefficients, so results can be cached and compared in tests.
//!
//! The factory is the only place coefficient validity is enforced. A
//! degenerate (NaN/Inf) result trips a debug assertion; release builds
//! substitute an identity section so the chain keeps passing audio.

use biquad::{Coefficients, ToHertz, Type};

use crate::settings::{ChainSettings, Slope};

/// Maximum number of second-order sections in a cut cascade
pub const MAX_CUT_SECTIONS: usize = 4;

/// Cutoff frequencies are clamped below this fraction of the sample rate
/// before filter design. Designing a section at (or within ~1 Hz of) the
/// Nyquist frequency produces non-finite coefficients; the clamp keeps a
/// little headroom instead.
const NYQUIST_GUARD: f32 = 0.49;

/// Ordered coefficient sets for one cut stage.
///
/// Only `sections[..active]` carry a designed filter; trailing slots hold
/// the identity section and are never run by the chain.
#[derive(Debug, Clone, Copy)]
pub struct CutCoeffs {
    pub sections: [Coefficients<f32>; MAX_CUT_SECTIONS],
    pub active: usize,
}

impl CutCoeffs {
    /// The designed sections for the selected slope
    pub fn active_sections(&self) -> &[Coefficients<f32>] {
        &self.sections[..self.active]
    }
}

/// A complete, immutable set of coefficients for the whole chain.
///
/// Built off the audio thread and published behind an atomically swapped
/// handle; both channels' stages read the same bank. The `generation`
/// counter lets the audio thread skip re-installing a bank it has already
/// applied.
#[derive(Debug, Clone)]
pub struct FilterBank {
    pub generation: u64,
    pub sample_rate: f32,
    pub settings: ChainSettings,
    pub peak: Coefficients<f32>,
    pub low_cut: CutCoeffs,
    pub high_cut: CutCoeffs,
}

/// Build every coefficient set for one settings snapshot.
pub fn build_filter_bank(settings: &ChainSettings, sample_rate: f32, generation: u64) -> FilterBank {
    FilterBank {
        generation,
        sample_rate,
        settings: *settings,
        peak: peak_coefficients(settings, sample_rate),
        low_cut: low_cut_coefficients(settings, sample_rate),
        high_cut: high_cut_coefficients(settings, sample_rate),
    }
}

/// A pass-through second-order section: output == input, bit for bit.
pub fn identity() -> Coefficients<f32> {
    Coefficients {
        a1: 0.0,
        a2: 0.0,
        b0: 1.0,
        b1: 0.0,
        b2: 0.0,
    }
}

/// RBJ parametric peak section from center frequency, Q and dB gain.
///
/// Center-frequency gain is `10^(dB/20)` linear, which is what the
/// `PeakingEQ` design realizes from a dB argument.
pub fn peak_coefficients(settings: &ChainSettings, sample_rate: f32) -> Coefficients<f32> {
    let freq = clamp_below_nyquist(settings.peak_freq, sample_rate);
    let coeffs = Coefficients::<f32>::from_params(
        Type::PeakingEQ(settings.peak_gain_db),
        sample_rate.hz(),
        freq.hz(),
        settings.peak_q,
    );
    sanitized(coeffs, freq, sample_rate)
}

/// Butterworth high-pass cascade for the low-cut stage.
pub fn low_cut_coefficients(settings: &ChainSettings, sample_rate: f32) -> CutCoeffs {
    design_cut(CutKind::HighPass, settings.low_cut_freq, settings.low_cut_slope, sample_rate)
}

/// Butterworth low-pass cascade for the high-cut stage.
pub fn high_cut_coefficients(settings: &ChainSettings, sample_rate: f32) -> CutCoeffs {
    design_cut(CutKind::LowPass, settings.high_cut_freq, settings.high_cut_slope, sample_rate)
}

#[derive(Clone, Copy)]
enum CutKind {
    HighPass,
    LowPass,
}

/// Decompose a Butterworth filter of order `2 * sections` into cascaded
/// second-order sections.
///
/// Section k of an order-N Butterworth filter uses
/// `Q_k = 1 / (2 cos(pi * (2k + 1) / (2N)))`; every section shares the
/// cutoff frequency. Cascading the active sections yields the selected
/// 12/24/36/48 dB per octave response.
fn design_cut(kind: CutKind, cutoff: f32, slope: Slope, sample_rate: f32) -> CutCoeffs {
    let cutoff = clamp_below_nyquist(cutoff, sample_rate);
    let order = slope.order();
    let active = slope.sections();

    let mut sections = [identity(); MAX_CUT_SECTIONS];
    for (k, section) in sections.iter_mut().take(active).enumerate() {
        let q = butterworth_section_q(order, k);
        let ty = match kind {
            CutKind::HighPass => Type::HighPass,
            CutKind::LowPass => Type::LowPass,
        };
        let coeffs = Coefficients::<f32>::from_params(ty, sample_rate.hz(), cutoff.hz(), q);
        *section = sanitized(coeffs, cutoff, sample_rate);
    }

    CutCoeffs { sections, active }
}

/// Q of section `k` (0-based) in an even-order Butterworth cascade.
fn butterworth_section_q(order: usize, k: usize) -> f32 {
    let theta = std::f32::consts::PI * (2 * k + 1) as f32 / (2 * order) as f32;
    1.0 / (2.0 * theta.cos())
}

/// Keep a design frequency safely below Nyquist.
fn clamp_below_nyquist(freq: f32, sample_rate: f32) -> f32 {
    freq.min(sample_rate * NYQUIST_GUARD)
}

/// Last line of defense against degenerate coefficients reaching the
/// real-time path: assert in debug builds, substitute the identity
/// section in release builds.
fn sanitized(
    coeffs: Result<Coefficients<f32>, biquad::Errors>,
    frequency: f32,
    sample_rate: f32,
) -> Coefficients<f32> {
    let coeffs = match coeffs {
        Ok(c) => c,
        Err(_) => {
            debug_assert!(
                false,
                "filter design failed for {frequency} Hz at {sample_rate} Hz"
            );
            return identity();
        }
    };

    let finite = coeffs.a1.is_finite()
        && coeffs.a2.is_finite()
        && coeffs.b0.is_finite()
        && coeffs.b1.is_finite()
        && coeffs.b2.is_finite();
    debug_assert!(
        finite,
        "non-finite coefficients for {frequency} Hz at {sample_rate} Hz"
    );
    if finite {
        coeffs
    } else {
        identity()
    }
}
