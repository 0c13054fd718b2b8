//! Analysis Front End
//!
//! The render-thread half of the pipeline: drains the sample relays,
//! feeds the per-channel spectrum generators, and turns the newest
//! frames into display polylines. Also evaluates the theoretical
//! response curve from the current settings snapshot.
//!
//! Everything here runs on one thread at a bounded polling cadence
//! (tens of Hz); nothing blocks and nothing is shared with the audio
//! callback except the lock-free relays and the parameter store.

use std::sync::Arc;

use tracing::debug;

use sculpt_dsp::{
    response_points, BlockConsumer, CurveBuilder, SpectrumFrames, SpectrumGenerator,
    SPECTRUM_FLOOR_DB,
};

use crate::config::AnalyzerConfig;
use crate::error::EngineResult;
use crate::params::EqParams;

/// One channel's analysis lane: relay -> generator -> frame queue ->
/// cached path.
struct ChannelLane {
    relay: BlockConsumer,
    generator: SpectrumGenerator,
    frames: SpectrumFrames,
    path: Vec<(f32, f32)>,
}

impl ChannelLane {
    fn new(relay: BlockConsumer, config: &AnalyzerConfig, sample_rate: f32) -> EngineResult<Self> {
        let (generator, frames) = SpectrumGenerator::new(
            config.fft_size,
            sample_rate,
            config.spectrum_queue_frames,
        )?;
        Ok(Self {
            relay,
            generator,
            frames,
            path: Vec::new(),
        })
    }

    /// Move every waiting relay block into the generator, then rebuild
    /// the cached path from the newest resulting frame (if any).
    fn drain(&mut self, scratch: &mut [f32], builder: &CurveBuilder, width: f32, height: f32) {
        while self.relay.pop_block(scratch) {
            self.generator.push_block(scratch);
        }
        if let Some(frame) = self.frames.latest() {
            self.path = builder.build(&frame, width, height);
        }
    }
}

/// Render-side owner of spectrum history, curve output and cached
/// geometry.
pub struct Analyzer {
    params: Arc<EqParams>,
    config: AnalyzerConfig,
    builder: CurveBuilder,
    left: ChannelLane,
    right: ChannelLane,
    scratch: Vec<f32>,
    sample_rate: f32,
}

impl Analyzer {
    pub(crate) fn new(
        config: AnalyzerConfig,
        params: Arc<EqParams>,
        left_relay: BlockConsumer,
        right_relay: BlockConsumer,
    ) -> EngineResult<Self> {
        let sample_rate = params.sample_rate();
        let builder = CurveBuilder::new(SPECTRUM_FLOOR_DB, 0.0, config.curve_stride);
        Ok(Self {
            left: ChannelLane::new(left_relay, &config, sample_rate)?,
            right: ChannelLane::new(right_relay, &config, sample_rate)?,
            scratch: vec![0.0; config.relay_block_len],
            builder,
            params,
            config,
            sample_rate,
        })
    }

    /// Drain the relays and return the current spectrum polylines for
    /// both channels, mapped onto a `width` x `height` rectangle.
    ///
    /// Returns cached geometry when no new audio arrived (or while the
    /// spectrum pipeline is disabled); never blocks or waits. Call this
    /// at the render cadence.
    pub fn poll_spectrum(
        &mut self,
        width: f32,
        height: f32,
    ) -> (Vec<(f32, f32)>, Vec<(f32, f32)>) {
        self.sync_sample_rate();

        let scratch = &mut self.scratch;
        let builder = &self.builder;
        for lane in [&mut self.left, &mut self.right] {
            lane.drain(scratch.as_mut_slice(), builder, width, height);
        }

        (self.left.path.clone(), self.right.path.clone())
    }

    /// Theoretical magnitude response of the current settings, one point
    /// per pixel column across `width`, mapped into `height` pixels over
    /// the +/-24 dB display range.
    ///
    /// Purely a function of the snapshot and sample rate; independent of
    /// live audio.
    pub fn response_curve(&self, width: usize, height: f32) -> Vec<(f32, f32)> {
        response_points(
            &self.params.snapshot(),
            self.params.sample_rate(),
            width,
            height,
        )
    }

    /// Complete relay blocks waiting per channel (left, right)
    pub fn pending_blocks(&self) -> (usize, usize) {
        (
            self.left.relay.blocks_available(),
            self.right.relay.blocks_available(),
        )
    }

    /// Spectrum frames the generators could not queue (left, right)
    pub fn dropped_frames(&self) -> (u64, u64) {
        (
            self.left.generator.dropped_frames(),
            self.right.generator.dropped_frames(),
        )
    }

    /// A sample-rate change re-prepares the whole pipeline; the
    /// generators are rebuilt here because bin width depends on the
    /// rate. Cached paths are stale at that point and cleared.
    fn sync_sample_rate(&mut self) {
        let current = self.params.sample_rate();
        if current == self.sample_rate {
            return;
        }
        debug!(from = self.sample_rate, to = current, "analyzer rate change");
        self.sample_rate = current;
        for lane in [&mut self.left, &mut self.right] {
            if let Ok((generator, frames)) = SpectrumGenerator::new(
                self.config.fft_size,
                current,
                self.config.spectrum_queue_frames,
            ) {
                lane.generator = generator;
                lane.frames = frames;
            }
            lane.path.clear();
        }
    }
}
