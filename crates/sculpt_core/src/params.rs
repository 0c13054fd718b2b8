//! Parameter Store
//!
//! `EqParams` holds every user-facing parameter as an atomic and keeps a
//! pre-built [`FilterBank`] behind an `ArcSwap` handle. Setters clamp,
//! store, rebuild the bank once through the coefficient factory, and
//! publish it with a bumped generation; the audio thread's only work is
//! an atomic handle load and a generation compare.
//!
//! This replaces listener/observer fan-out with a generation counter
//! polled per block, and replaces in-place coefficient mutation with an
//! immutably constructed value swapped atomically. There is no lock on
//! this path in either direction.
//!
//! The UI/render side is the sole writer; `snapshot()` may be called
//! wait-free from any thread.

use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;

use arc_swap::ArcSwap;
use tracing::debug;

use sculpt_dsp::{
    build_filter_bank, ChainSettings, FilterBank, Slope, MAX_FREQ_HZ, MAX_GAIN_DB, MAX_Q,
    MIN_FREQ_HZ, MIN_GAIN_DB, MIN_Q,
};

/// Shared parameter state plus the published coefficient bank.
///
/// `AtomicF32` doesn't exist, so float parameters are stored as bit-cast
/// `AtomicU32` values. Relaxed ordering is fine for independent scalar
/// parameters; cross-thread agreement on coefficients comes from the
/// bank swap, not from the scalars.
pub struct EqParams {
    peak_freq_bits: AtomicU32,
    peak_gain_bits: AtomicU32,
    peak_q_bits: AtomicU32,
    low_cut_freq_bits: AtomicU32,
    high_cut_freq_bits: AtomicU32,
    low_cut_slope: AtomicU32,
    high_cut_slope: AtomicU32,
    low_cut_bypassed: AtomicBool,
    peak_bypassed: AtomicBool,
    high_cut_bypassed: AtomicBool,
    spectrum_enabled: AtomicBool,
    sample_rate_bits: AtomicU32,
    generation: AtomicU64,
    bank: ArcSwap<FilterBank>,
}

impl EqParams {
    /// Create a store with default settings and a bank built for
    /// `sample_rate`.
    pub fn new(sample_rate: f32) -> Self {
        let settings = ChainSettings::default();
        let bank = build_filter_bank(&settings, sample_rate, 1);

        Self {
            peak_freq_bits: AtomicU32::new(settings.peak_freq.to_bits()),
            peak_gain_bits: AtomicU32::new(settings.peak_gain_db.to_bits()),
            peak_q_bits: AtomicU32::new(settings.peak_q.to_bits()),
            low_cut_freq_bits: AtomicU32::new(settings.low_cut_freq.to_bits()),
            high_cut_freq_bits: AtomicU32::new(settings.high_cut_freq.to_bits()),
            low_cut_slope: AtomicU32::new(settings.low_cut_slope.index()),
            high_cut_slope: AtomicU32::new(settings.high_cut_slope.index()),
            low_cut_bypassed: AtomicBool::new(settings.low_cut_bypassed),
            peak_bypassed: AtomicBool::new(settings.peak_bypassed),
            high_cut_bypassed: AtomicBool::new(settings.high_cut_bypassed),
            spectrum_enabled: AtomicBool::new(settings.spectrum_enabled),
            sample_rate_bits: AtomicU32::new(sample_rate.to_bits()),
            generation: AtomicU64::new(1),
            bank: ArcSwap::from_pointee(bank),
        }
    }

    /// Build a clamped settings snapshot from the current parameter
    /// values. Wait-free; callable from both threads.
    pub fn snapshot(&self) -> ChainSettings {
        ChainSettings {
            peak_freq: f32::from_bits(self.peak_freq_bits.load(Ordering::Relaxed)),
            peak_gain_db: f32::from_bits(self.peak_gain_bits.load(Ordering::Relaxed)),
            peak_q: f32::from_bits(self.peak_q_bits.load(Ordering::Relaxed)),
            low_cut_freq: f32::from_bits(self.low_cut_freq_bits.load(Ordering::Relaxed)),
            high_cut_freq: f32::from_bits(self.high_cut_freq_bits.load(Ordering::Relaxed)),
            low_cut_slope: Slope::from_index(self.low_cut_slope.load(Ordering::Relaxed)),
            high_cut_slope: Slope::from_index(self.high_cut_slope.load(Ordering::Relaxed)),
            low_cut_bypassed: self.low_cut_bypassed.load(Ordering::Relaxed),
            peak_bypassed: self.peak_bypassed.load(Ordering::Relaxed),
            high_cut_bypassed: self.high_cut_bypassed.load(Ordering::Relaxed),
            spectrum_enabled: self.spectrum_enabled.load(Ordering::Relaxed),
        }
        .clamped()
    }

    /// The published coefficient bank handle. The audio thread loads
    /// this once per block; `ArcSwap::load` never blocks or allocates.
    pub fn bank(&self) -> &ArcSwap<FilterBank> {
        &self.bank
    }

    /// Generation of the most recently published bank
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Relaxed)
    }

    /// Sample rate the current bank was built for
    pub fn sample_rate(&self) -> f32 {
        f32::from_bits(self.sample_rate_bits.load(Ordering::Relaxed))
    }

    /// Rebuild all coefficient sets for a new sample rate. Idempotent;
    /// call before any processing and on every rate change.
    pub fn prepare(&self, sample_rate: f32) {
        self.sample_rate_bits
            .store(sample_rate.to_bits(), Ordering::Relaxed);
        self.rebuild();
        debug!(sample_rate, "parameter store prepared");
    }

    pub fn set_peak_freq(&self, freq: f32) {
        self.peak_freq_bits.store(
            clamp_param(freq, MIN_FREQ_HZ, MAX_FREQ_HZ).to_bits(),
            Ordering::Relaxed,
        );
        self.rebuild();
    }

    pub fn set_peak_gain_db(&self, gain_db: f32) {
        self.peak_gain_bits.store(
            clamp_param(gain_db, MIN_GAIN_DB, MAX_GAIN_DB).to_bits(),
            Ordering::Relaxed,
        );
        self.rebuild();
    }

    pub fn set_peak_q(&self, q: f32) {
        self.peak_q_bits
            .store(clamp_param(q, MIN_Q, MAX_Q).to_bits(), Ordering::Relaxed);
        self.rebuild();
    }

    pub fn set_low_cut_freq(&self, freq: f32) {
        self.low_cut_freq_bits.store(
            clamp_param(freq, MIN_FREQ_HZ, MAX_FREQ_HZ).to_bits(),
            Ordering::Relaxed,
        );
        self.rebuild();
    }

    pub fn set_high_cut_freq(&self, freq: f32) {
        self.high_cut_freq_bits.store(
            clamp_param(freq, MIN_FREQ_HZ, MAX_FREQ_HZ).to_bits(),
            Ordering::Relaxed,
        );
        self.rebuild();
    }

    pub fn set_low_cut_slope(&self, slope: Slope) {
        self.low_cut_slope.store(slope.index(), Ordering::Relaxed);
        self.rebuild();
    }

    pub fn set_high_cut_slope(&self, slope: Slope) {
        self.high_cut_slope.store(slope.index(), Ordering::Relaxed);
        self.rebuild();
    }

    pub fn set_low_cut_bypassed(&self, bypassed: bool) {
        self.low_cut_bypassed.store(bypassed, Ordering::Relaxed);
        self.rebuild();
    }

    pub fn set_peak_bypassed(&self, bypassed: bool) {
        self.peak_bypassed.store(bypassed, Ordering::Relaxed);
        self.rebuild();
    }

    pub fn set_high_cut_bypassed(&self, bypassed: bool) {
        self.high_cut_bypassed.store(bypassed, Ordering::Relaxed);
        self.rebuild();
    }

    /// Toggle the spectrum pipeline. No coefficient rebuild: the flag is
    /// read directly by the processor each block.
    pub fn set_spectrum_enabled(&self, enabled: bool) {
        self.spectrum_enabled.store(enabled, Ordering::Relaxed);
    }

    pub fn spectrum_enabled(&self) -> bool {
        self.spectrum_enabled.load(Ordering::Relaxed)
    }

    /// Rebuild and publish the coefficient bank from current values.
    ///
    /// Runs on the caller's (non-audio) thread; the audio thread picks
    /// up the new bank at its next block boundary.
    fn rebuild(&self) {
        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let settings = self.snapshot();
        let bank = build_filter_bank(&settings, self.sample_rate(), generation);
        self.bank.store(Arc::new(bank));
    }
}

fn clamp_param(value: f32, min: f32, max: f32) -> f32 {
    if value.is_finite() {
        value.clamp(min, max)
    } else {
        min
    }
}
