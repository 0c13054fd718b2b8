//! Audio Stream Management
//!
//! Low-level CPAL stream setup and the real-time callbacks. The
//! [`EqProcessor`] lives inside the output callback; an optional capture
//! stream feeds it through an SPSC ring so the engine can run either as
//! a pure playback filter or as a capture -> EQ -> speakers pass-through.
//!
//! ```text
//!   capture callback --rtrb--> output callback
//!                                 EqProcessor::process_interleaved
//!                                 (zero allocation in this path)
//! ```

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use cpal::traits::{DeviceTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig as CpalStreamConfig};
use crossbeam_channel::Sender;
use rtrb::{Consumer, Producer, RingBuffer};

use crate::config::StreamConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::Event;
use crate::processor::EqProcessor;

/// State shared between the audio callback and the control thread.
///
/// `AtomicF32` doesn't exist, so levels are stored as bit-cast u32s.
pub struct SharedState {
    peak_left_bits: AtomicU32,
    peak_right_bits: AtomicU32,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            peak_left_bits: AtomicU32::new(0.0_f32.to_bits()),
            peak_right_bits: AtomicU32::new(0.0_f32.to_bits()),
        }
    }

    pub fn set_peaks(&self, left: f32, right: f32) {
        self.peak_left_bits.store(left.to_bits(), Ordering::Relaxed);
        self.peak_right_bits
            .store(right.to_bits(), Ordering::Relaxed);
    }

    pub fn peaks(&self) -> (f32, f32) {
        (
            f32::from_bits(self.peak_left_bits.load(Ordering::Relaxed)),
            f32::from_bits(self.peak_right_bits.load(Ordering::Relaxed)),
        )
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

/// Manages an active audio stream pair.
pub struct AudioStream {
    /// Kept alive to maintain audio flow; cpal stops a stream on drop
    #[allow(dead_code)]
    capture_stream: Option<Stream>,

    #[allow(dead_code)]
    output_stream: Option<Stream>,

    /// Shared state for meter reads from the control thread
    pub shared: Arc<SharedState>,

    /// Current stream configuration
    pub config: StreamConfig,
}

impl AudioStream {
    /// Capture from `capture_device`, filter, and play on
    /// `output_device`.
    ///
    /// The processor must already be prepared for `config.sample_rate`.
    pub fn new_with_capture(
        config: StreamConfig,
        capture_device: &Device,
        output_device: &Device,
        processor: EqProcessor,
        event_sender: Sender<Event>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let shared = Arc::new(SharedState::new());

        // Ring buffer between the two callbacks: 4 buffers of margin
        let ring_size = config.buffer_size as usize * config.channels as usize * 4;
        let (producer, consumer) = RingBuffer::<f32>::new(ring_size);

        let cpal_config = CpalStreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let capture_stream =
            Self::build_capture_stream(capture_device, &cpal_config, producer, event_sender.clone())?;
        let output_stream = Self::build_output_stream(
            output_device,
            &cpal_config,
            Some(consumer),
            processor,
            Arc::clone(&shared),
            event_sender,
        )?;

        capture_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;
        output_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;

        Ok(Self {
            capture_stream: Some(capture_stream),
            output_stream: Some(output_stream),
            shared,
            config,
        })
    }

    /// Output-only stream: the callback filters whatever is already in
    /// the output buffer (silence, unless a host upstream fills it).
    /// Useful when audio arrives from outside cpal.
    pub fn new_output_only(
        config: StreamConfig,
        output_device: &Device,
        processor: EqProcessor,
        event_sender: Sender<Event>,
    ) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let shared = Arc::new(SharedState::new());

        let cpal_config = CpalStreamConfig {
            channels: config.channels,
            sample_rate: cpal::SampleRate(config.sample_rate),
            buffer_size: cpal::BufferSize::Fixed(config.buffer_size),
        };

        let output_stream = Self::build_output_stream(
            output_device,
            &cpal_config,
            None,
            processor,
            Arc::clone(&shared),
            event_sender,
        )?;

        output_stream
            .play()
            .map_err(|e| EngineError::StreamPlayError(e.to_string()))?;

        Ok(Self {
            capture_stream: None,
            output_stream: Some(output_stream),
            shared,
            config,
        })
    }

    fn build_capture_stream(
        device: &Device,
        config: &CpalStreamConfig,
        mut producer: Producer<f32>,
        event_sender: Sender<Event>,
    ) -> EngineResult<Stream> {
        let err_sender = event_sender.clone();

        let stream = device
            .build_input_stream(
                config,
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    // Real-time callback: push what fits, drop the rest
                    let written = producer.write_chunk_uninit(data.len()).map_or(0, |mut chunk| {
                        let (first, second) = chunk.as_mut_slices();
                        let split = first.len();
                        for (slot, &sample) in first.iter_mut().zip(&data[..split]) {
                            slot.write(sample);
                        }
                        for (slot, &sample) in second.iter_mut().zip(&data[split..]) {
                            slot.write(sample);
                        }
                        let len = chunk.len();
                        unsafe { chunk.commit_all() };
                        len
                    });

                    if written < data.len() {
                        let _ = event_sender.try_send(Event::BufferUnderrun);
                    }
                },
                move |err| {
                    let _ = err_sender.try_send(Event::error(err));
                },
                None, // No timeout
            )
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(stream)
    }

    fn build_output_stream(
        device: &Device,
        config: &CpalStreamConfig,
        consumer: Option<Consumer<f32>>,
        mut processor: EqProcessor,
        shared: Arc<SharedState>,
        event_sender: Sender<Event>,
    ) -> EngineResult<Stream> {
        let err_sender = event_sender.clone();
        let mut consumer = consumer;

        let stream = device
            .build_output_stream(
                config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    // Real-time audio callback - NO allocations allowed here

                    if let Some(consumer) = consumer.as_mut() {
                        let available = consumer.slots();
                        let to_read = data.len().min(available);

                        if to_read < data.len() {
                            // Underrun: the tail stays silent this block
                            data.fill(0.0);
                            let _ = event_sender.try_send(Event::BufferUnderrun);
                        }

                        if let Ok(chunk) = consumer.read_chunk(to_read) {
                            let (first, second) = chunk.as_slices();
                            data[..first.len()].copy_from_slice(first);
                            data[first.len()..first.len() + second.len()]
                                .copy_from_slice(second);
                            chunk.commit_all();
                        }
                    }

                    // Filter in place and feed the spectrum relays
                    processor.process_interleaved(data);

                    // Peak levels for metering
                    let mut peak_left = 0.0_f32;
                    let mut peak_right = 0.0_f32;
                    for frame in data.chunks_exact(2) {
                        peak_left = peak_left.max(frame[0].abs());
                        peak_right = peak_right.max(frame[1].abs());
                    }
                    shared.set_peaks(peak_left, peak_right);
                },
                move |err| {
                    let _ = err_sender.try_send(Event::error(err));
                },
                None,
            )
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(stream)
    }

    /// Get current peak levels (for UI meters)
    pub fn get_peaks(&self) -> (f32, f32) {
        self.shared.peaks()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shared_state_defaults() {
        let state = SharedState::new();
        assert_eq!(state.peaks(), (0.0, 0.0));
    }

    #[test]
    fn test_shared_state_peaks() {
        let state = SharedState::new();
        state.set_peaks(0.8, 0.6);
        assert_eq!(state.peaks(), (0.8, 0.6));
    }

    // Hardware-dependent test
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_output_stream_creation() {
        use crate::config::EngineConfig;
        use crate::processor::EqPipeline;
        use cpal::traits::HostTrait;

        let (sender, _receiver) = crossbeam_channel::unbounded();
        let config = EngineConfig::default();
        let host = cpal::default_host();

        if let Some(output_device) = host.default_output_device() {
            let mut pipeline = EqPipeline::new(&config).unwrap();
            pipeline
                .processor
                .prepare(config.stream.sample_rate as f32, config.stream.buffer_size as usize);

            let result = AudioStream::new_output_only(
                config.stream.clone(),
                &output_device,
                pipeline.processor,
                sender,
            );
            // May fail without usable audio hardware, which is fine for CI
            if let Ok(stream) = result {
                assert_eq!(stream.config.sample_rate, 48_000);
            }
        }
    }
}
