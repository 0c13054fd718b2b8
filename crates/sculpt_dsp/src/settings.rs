//! Chain Settings
//!
//! The immutable snapshot of every user-facing filter parameter.
//! A fresh snapshot is built on every read of the parameter store; nothing
//! in the signal path ever mutates one in place.

/// Lowest frequency any filter parameter may take (Hz)
pub const MIN_FREQ_HZ: f32 = 20.0;

/// Highest frequency any filter parameter may take (Hz)
pub const MAX_FREQ_HZ: f32 = 20_000.0;

/// Peak filter quality range
pub const MIN_Q: f32 = 0.1;
pub const MAX_Q: f32 = 10.0;

/// Peak filter gain range (dB)
pub const MIN_GAIN_DB: f32 = -24.0;
pub const MAX_GAIN_DB: f32 = 24.0;

/// Steepness of a cut stage, realized by activating 1-4 cascaded
/// second-order sections (12 dB/octave each).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Slope {
    #[default]
    Db12,
    Db24,
    Db36,
    Db48,
}

impl Slope {
    /// Number of active second-order sections for this slope
    pub const fn sections(self) -> usize {
        match self {
            Slope::Db12 => 1,
            Slope::Db24 => 2,
            Slope::Db36 => 3,
            Slope::Db48 => 4,
        }
    }

    /// Butterworth filter order (two poles per section)
    pub const fn order(self) -> usize {
        self.sections() * 2
    }

    /// Attenuation in dB per octave
    pub const fn db_per_octave(self) -> u32 {
        self.sections() as u32 * 12
    }

    /// Discrete selector index, matching combo-box style parameter storage
    pub const fn index(self) -> u32 {
        match self {
            Slope::Db12 => 0,
            Slope::Db24 => 1,
            Slope::Db36 => 2,
            Slope::Db48 => 3,
        }
    }

    /// Build from a selector index, clamping out-of-range values to the
    /// steepest slope rather than failing.
    pub fn from_index(index: u32) -> Self {
        match index {
            0 => Slope::Db12,
            1 => Slope::Db24,
            2 => Slope::Db36,
            _ => Slope::Db48,
        }
    }
}

/// One immutable read of the full parameter set.
///
/// `low_cut` is the high-pass stage (cuts lows), `high_cut` the low-pass
/// stage (cuts highs). Frequencies are in Hz, gain in dB.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChainSettings {
    pub peak_freq: f32,
    pub peak_gain_db: f32,
    pub peak_q: f32,
    pub low_cut_freq: f32,
    pub high_cut_freq: f32,
    pub low_cut_slope: Slope,
    pub high_cut_slope: Slope,
    pub low_cut_bypassed: bool,
    pub peak_bypassed: bool,
    pub high_cut_bypassed: bool,
    pub spectrum_enabled: bool,
}

impl Default for ChainSettings {
    fn default() -> Self {
        Self {
            peak_freq: 750.0,
            peak_gain_db: 0.0,
            peak_q: 1.0,
            low_cut_freq: MIN_FREQ_HZ,
            high_cut_freq: MAX_FREQ_HZ,
            low_cut_slope: Slope::Db12,
            high_cut_slope: Slope::Db12,
            low_cut_bypassed: false,
            peak_bypassed: false,
            high_cut_bypassed: false,
            spectrum_enabled: true,
        }
    }
}

impl ChainSettings {
    /// Return a copy with every parameter forced into its valid range.
    ///
    /// Out-of-range values are corrected here, never propagated as errors;
    /// callers at the settings boundary apply this before anything else
    /// sees the snapshot. Non-finite inputs fall back to the defaults.
    pub fn clamped(mut self) -> Self {
        self.peak_freq = clamp_or(self.peak_freq, MIN_FREQ_HZ, MAX_FREQ_HZ, 750.0);
        self.peak_gain_db = clamp_or(self.peak_gain_db, MIN_GAIN_DB, MAX_GAIN_DB, 0.0);
        self.peak_q = clamp_or(self.peak_q, MIN_Q, MAX_Q, 1.0);
        self.low_cut_freq = clamp_or(self.low_cut_freq, MIN_FREQ_HZ, MAX_FREQ_HZ, MIN_FREQ_HZ);
        self.high_cut_freq = clamp_or(self.high_cut_freq, MIN_FREQ_HZ, MAX_FREQ_HZ, MAX_FREQ_HZ);
        self
    }
}

fn clamp_or(value: f32, min: f32, max: f32, fallback: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        fallback
    }
}
