//! Response Curve Evaluator
//!
//! Computes the theoretical magnitude response of the whole chain at a
//! dense, evenly-log-spaced set of frequencies: the analytic
//! |H(e^{jw})| of every active stage, multiplied together and converted
//! to dB. Built from the same coefficient factory the audio path uses,
//! so the plotted curve matches actual filtering behavior to within
//! numerical precision. Completely decoupled from live audio.

use biquad::Coefficients;

use crate::coeffs::{build_filter_bank, FilterBank};
use crate::curve::db_to_y;
use crate::settings::{ChainSettings, MAX_FREQ_HZ, MIN_FREQ_HZ};

/// Display range of the response plot (dB)
pub const RESPONSE_FLOOR_DB: f32 = -24.0;
pub const RESPONSE_CEIL_DB: f32 = 24.0;

/// Magnitude of one second-order section at `freq` Hz.
///
/// Evaluates H(z) = (b0 + b1 z^-1 + b2 z^-2) / (1 + a1 z^-1 + a2 z^-2)
/// at z = e^{jw}; done in f64 so cascading eight sections does not lose
/// precision at deep attenuation.
pub fn section_magnitude(coeffs: &Coefficients<f32>, freq: f32, sample_rate: f32) -> f64 {
    let omega = 2.0 * std::f64::consts::PI * freq as f64 / sample_rate as f64;
    let (sin1, cos1) = omega.sin_cos();
    let (sin2, cos2) = (2.0 * omega).sin_cos();

    // z^-1 = cos(w) - j sin(w), z^-2 = cos(2w) - j sin(2w)
    let num_re = coeffs.b0 as f64 + coeffs.b1 as f64 * cos1 + coeffs.b2 as f64 * cos2;
    let num_im = -(coeffs.b1 as f64 * sin1 + coeffs.b2 as f64 * sin2);
    let den_re = 1.0 + coeffs.a1 as f64 * cos1 + coeffs.a2 as f64 * cos2;
    let den_im = -(coeffs.a1 as f64 * sin1 + coeffs.a2 as f64 * sin2);

    let num = (num_re * num_re + num_im * num_im).sqrt();
    let den = (den_re * den_re + den_im * den_im).sqrt();
    num / den.max(1e-30)
}

/// Combined chain magnitude at one frequency, in dB.
///
/// Bypassed stages contribute nothing, exactly as they are skipped in
/// the sample path.
pub fn chain_magnitude_db(bank: &FilterBank, freq: f32) -> f32 {
    let settings = &bank.settings;
    let mut magnitude = 1.0_f64;

    if !settings.low_cut_bypassed {
        for section in bank.low_cut.active_sections() {
            magnitude *= section_magnitude(section, freq, bank.sample_rate);
        }
    }
    if !settings.peak_bypassed {
        magnitude *= section_magnitude(&bank.peak, freq, bank.sample_rate);
    }
    if !settings.high_cut_bypassed {
        for section in bank.high_cut.active_sections() {
            magnitude *= section_magnitude(section, freq, bank.sample_rate);
        }
    }

    (20.0 * magnitude.max(1e-30).log10()) as f32
}

/// Response in dB at one frequency for a settings snapshot.
pub fn magnitude_db_at(settings: &ChainSettings, sample_rate: f32, freq: f32) -> f32 {
    let bank = build_filter_bank(settings, sample_rate, 0);
    chain_magnitude_db(&bank, freq)
}

/// The frequency evaluated at horizontal position `i` of `width`
/// (evenly log-spaced across the audible band, one per pixel).
pub fn pixel_frequency(i: usize, width: usize) -> f32 {
    let denom = width.saturating_sub(1).max(1) as f32;
    let t = i as f32 / denom;
    MIN_FREQ_HZ * (MAX_FREQ_HZ / MIN_FREQ_HZ).powf(t)
}

/// Response in dB at every horizontal pixel.
pub fn response_db(settings: &ChainSettings, sample_rate: f32, width: usize) -> Vec<f32> {
    let bank = build_filter_bank(settings, sample_rate, 0);
    (0..width)
        .map(|i| chain_magnitude_db(&bank, pixel_frequency(i, width)))
        .collect()
}

/// Response mapped onto a `width` x `height` rectangle, one point per
/// pixel column, using the display range of [`RESPONSE_FLOOR_DB`,
/// `RESPONSE_CEIL_DB`].
pub fn response_points(
    settings: &ChainSettings,
    sample_rate: f32,
    width: usize,
    height: f32,
) -> Vec<(f32, f32)> {
    response_db(settings, sample_rate, width)
        .into_iter()
        .enumerate()
        .map(|(i, db)| {
            (
                i as f32,
                db_to_y(db, RESPONSE_FLOOR_DB, RESPONSE_CEIL_DB, height),
            )
        })
        .collect()
}
