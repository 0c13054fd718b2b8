//! Real-Time Processor
//!
//! `EqProcessor` is the audio-thread half of the pipeline: both channel
//! chains, both relay producers, and the logic that picks up freshly
//! published coefficient banks. `EqPipeline` wires a processor to its
//! matching [`Analyzer`](crate::analyzer::Analyzer) and shared
//! [`EqParams`](crate::params::EqParams).
//!
//! # Real-time Safety
//!
//! `process_planar`/`process_interleaved` never allocate, lock or wait:
//! coefficient pickup is an `ArcSwap` load plus a generation compare,
//! filtering is pure arithmetic on owned state, and the relays refuse
//! writes instead of blocking.

use std::sync::Arc;

use tracing::debug;

use sculpt_dsp::{BlockProducer, BlockRelay, ChannelChain};

use crate::analyzer::Analyzer;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::params::EqParams;

/// Audio-thread half of the EQ pipeline.
pub struct EqProcessor {
    params: Arc<EqParams>,
    left: ChannelChain,
    right: ChannelChain,
    left_relay: BlockProducer,
    right_relay: BlockProducer,
    applied_generation: u64,
}

impl EqProcessor {
    fn new(params: Arc<EqParams>, left_relay: BlockProducer, right_relay: BlockProducer) -> Self {
        let mut processor = Self {
            params,
            left: ChannelChain::new(),
            right: ChannelChain::new(),
            left_relay,
            right_relay,
            applied_generation: 0,
        };
        processor.refresh_coefficients();
        processor
    }

    /// Rebuild coefficients and reset all filter state for a (possibly
    /// new) sample rate. Idempotent; must run before any processing and
    /// again on every sample-rate change - state is deliberately NOT
    /// reset on ordinary parameter changes.
    pub fn prepare(&mut self, sample_rate: f32, max_block_samples: usize) {
        self.params.prepare(sample_rate);
        self.left.reset();
        self.right.reset();
        self.applied_generation = 0;
        self.refresh_coefficients();
        debug!(sample_rate, max_block_samples, "processor prepared");
    }

    /// Filter a stereo pair of planar buffers in place and feed the
    /// relays with the post-filter signal.
    #[inline]
    pub fn process_planar(&mut self, left: &mut [f32], right: &mut [f32]) {
        debug_assert_eq!(left.len(), right.len(), "channel buffers must match");
        self.refresh_coefficients();

        self.left.process_buffer(left);
        self.right.process_buffer(right);

        if self.params.spectrum_enabled() {
            self.left_relay.push_slice(left);
            self.right_relay.push_slice(right);
        }
    }

    /// Filter an interleaved stereo buffer ([L0, R0, L1, R1, ...]) in
    /// place and feed the relays with the post-filter signal.
    #[inline]
    pub fn process_interleaved(&mut self, buffer: &mut [f32]) {
        self.refresh_coefficients();
        let feed_relays = self.params.spectrum_enabled();

        for frame in buffer.chunks_exact_mut(2) {
            let left = self.left.process_sample(frame[0]);
            let right = self.right.process_sample(frame[1]);
            frame[0] = left;
            frame[1] = right;
            if feed_relays {
                self.left_relay.push_sample(left);
                self.right_relay.push_sample(right);
            }
        }
    }

    /// Relay blocks dropped so far (left, right); useful for diagnosing
    /// an under-polled analyzer.
    pub fn dropped_blocks(&self) -> (u64, u64) {
        (
            self.left_relay.dropped_blocks(),
            self.right_relay.dropped_blocks(),
        )
    }

    /// Shared parameter store
    pub fn params(&self) -> &Arc<EqParams> {
        &self.params
    }

    /// Install the latest published bank if it is newer than what the
    /// chains currently run. Coefficients change, filter state does not.
    #[inline]
    fn refresh_coefficients(&mut self) {
        let bank = self.params.bank().load();
        if bank.generation != self.applied_generation {
            self.left.apply(&bank);
            self.right.apply(&bank);
            self.applied_generation = bank.generation;
        }
    }
}

/// A connected processor/analyzer pair sharing one parameter store.
///
/// Split it and move the processor into the audio callback; the analyzer
/// stays with whatever drives rendering.
pub struct EqPipeline {
    pub processor: EqProcessor,
    pub analyzer: Analyzer,
    pub params: Arc<EqParams>,
}

impl EqPipeline {
    /// Build a pipeline with its own parameter store.
    pub fn new(config: &EngineConfig) -> EngineResult<Self> {
        let params = Arc::new(EqParams::new(config.stream.sample_rate as f32));
        Self::with_params(config, params)
    }

    /// Build a pipeline around an existing parameter store, so settings
    /// survive stream restarts.
    pub fn with_params(config: &EngineConfig, params: Arc<EqParams>) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let analyzer_config = config.analyzer.clone();
        let (left_tx, left_rx) = BlockRelay::with_capacity(
            analyzer_config.relay_block_len,
            analyzer_config.relay_capacity_blocks,
        )?;
        let (right_tx, right_rx) = BlockRelay::with_capacity(
            analyzer_config.relay_block_len,
            analyzer_config.relay_capacity_blocks,
        )?;

        let processor = EqProcessor::new(Arc::clone(&params), left_tx, right_tx);
        let analyzer = Analyzer::new(analyzer_config, Arc::clone(&params), left_rx, right_rx)?;

        Ok(Self {
            processor,
            analyzer,
            params,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sculpt_dsp::Slope;

    const SAMPLE_RATE: f32 = 48_000.0;

    fn pipeline() -> EqPipeline {
        let mut config = EngineConfig::default();
        // Small blocks so tests can fill the relay quickly
        config.analyzer.relay_block_len = 256;
        config.analyzer.fft_size = 2_048;
        EqPipeline::new(&config).unwrap()
    }

    fn sine(freq: f32, n: usize) -> Vec<f32> {
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin() * 0.5)
            .collect()
    }

    #[test]
    fn test_fully_bypassed_pipeline_passes_audio_through() {
        let mut pipeline = pipeline();
        pipeline.params.set_low_cut_bypassed(true);
        pipeline.params.set_peak_bypassed(true);
        pipeline.params.set_high_cut_bypassed(true);

        let input = sine(440.0, 512);
        let mut left = input.clone();
        let mut right = input.clone();
        pipeline.processor.process_planar(&mut left, &mut right);

        assert_eq!(left, input);
        assert_eq!(right, input);
    }

    #[test]
    fn test_parameter_change_reaches_the_audio_path() {
        let mut pipeline = pipeline();
        pipeline.params.set_peak_bypassed(true);
        pipeline.params.set_high_cut_bypassed(true);
        pipeline.params.set_low_cut_freq(2_000.0);
        pipeline.params.set_low_cut_slope(Slope::Db48);

        // A 100 Hz tone sits >4 octaves under a 2 kHz 48 dB/oct low cut;
        // after settling it must be essentially gone.
        let mut left = sine(100.0, 24_000);
        let mut right = left.clone();
        pipeline.processor.process_planar(&mut left, &mut right);

        let tail = &left[20_000..];
        let peak = tail.iter().fold(0.0_f32, |m, s| m.max(s.abs()));
        assert!(peak < 1e-3, "low cut did not engage, peak {peak}");
    }

    #[test]
    fn test_interleaved_and_planar_agree() {
        let mut a = pipeline();
        let mut b = pipeline();
        for p in [&a.params, &b.params] {
            p.set_peak_gain_db(6.0);
            p.set_low_cut_freq(200.0);
        }

        let input = sine(750.0, 256);
        let mut left = input.clone();
        let mut right = input.clone();
        a.processor.process_planar(&mut left, &mut right);

        let mut interleaved: Vec<f32> = input.iter().flat_map(|&s| [s, s]).collect();
        b.processor.process_interleaved(&mut interleaved);

        for (i, frame) in interleaved.chunks_exact(2).enumerate() {
            assert_eq!(frame[0], left[i]);
            assert_eq!(frame[1], right[i]);
        }
    }

    #[test]
    fn test_spectrum_toggle_controls_relay_feeding() {
        let mut pipeline = pipeline();
        pipeline.params.set_spectrum_enabled(false);

        let mut left = sine(440.0, 2_048);
        let mut right = left.clone();
        pipeline.processor.process_planar(&mut left, &mut right);
        assert_eq!(pipeline.analyzer.pending_blocks(), (0, 0));

        pipeline.params.set_spectrum_enabled(true);
        pipeline.processor.process_planar(&mut left, &mut right);
        let (left_pending, right_pending) = pipeline.analyzer.pending_blocks();
        assert!(left_pending > 0);
        assert!(right_pending > 0);
    }

    #[test]
    fn test_prepare_is_idempotent_and_resets_state() {
        let mut aged = pipeline();
        aged.processor.prepare(SAMPLE_RATE, 512);
        aged.processor.prepare(SAMPLE_RATE, 512);

        // Drive some signal through, then re-prepare: output must match a
        // freshly prepared processor sample for sample.
        let mut warmup = sine(100.0, 1_024);
        let mut warmup_r = warmup.clone();
        aged.processor.process_planar(&mut warmup, &mut warmup_r);
        aged.processor.prepare(SAMPLE_RATE, 512);

        let mut fresh = pipeline();
        fresh.processor.prepare(SAMPLE_RATE, 512);

        let input = sine(440.0, 256);
        let (mut l1, mut r1) = (input.clone(), input.clone());
        let (mut l2, mut r2) = (input.clone(), input.clone());
        aged.processor.process_planar(&mut l1, &mut r1);
        fresh.processor.process_planar(&mut l2, &mut r2);
        assert_eq!(l1, l2);
        assert_eq!(r1, r2);
    }

    #[test]
    fn test_dropped_block_accounting() {
        let mut config = EngineConfig::default();
        config.analyzer.relay_block_len = 64;
        config.analyzer.relay_capacity_blocks = 2;
        let mut pipeline = EqPipeline::with_params(
            &config,
            Arc::new(EqParams::new(SAMPLE_RATE)),
        )
        .unwrap();

        // Never drained: everything past the ring capacity is dropped.
        let mut left = sine(440.0, 64 * 8);
        let mut right = left.clone();
        pipeline.processor.process_planar(&mut left, &mut right);

        let (dropped_left, dropped_right) = pipeline.processor.dropped_blocks();
        assert_eq!(dropped_left, 6);
        assert_eq!(dropped_right, 6);
    }
}
