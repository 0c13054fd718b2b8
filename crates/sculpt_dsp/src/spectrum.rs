//! Spectrum Data Generator
//!
//! Consumes relayed sample blocks, keeps a rolling time-domain window,
//! and turns it into magnitude-in-decibels frames for display: apply a
//! Blackman-Harris taper, run a forward FFT, normalize by half the
//! transform length, clamp anything non-finite to zero and convert to dB
//! with a floor.
//!
//! Frames leave through a second bounded SPSC queue with the same
//! discipline as the sample relay: a full queue drops the new frame. The
//! generator runs entirely on the analysis thread; nothing here is called
//! from the audio callback.

use rtrb::{Consumer, Producer, RingBuffer};
use rustfft::{num_complex::Complex, Fft, FftPlanner};
use std::sync::Arc;

use crate::error::DspError;

/// Default transform length: ~5.9 Hz per bin at 48 kHz
pub const DEFAULT_FFT_SIZE: usize = 8_192;

/// Magnitudes at or below silence render at this level
pub const SPECTRUM_FLOOR_DB: f32 = -48.0;

/// One completed transform: per-bin magnitudes in dB plus the mapping
/// back to frequency (`frequency = bin_index * bin_hz`).
#[derive(Debug, Clone)]
pub struct SpectrumFrame {
    pub bins: Box<[f32]>,
    pub bin_hz: f32,
}

impl SpectrumFrame {
    pub fn bin_count(&self) -> usize {
        self.bins.len()
    }

    /// Center frequency of a bin in Hz
    pub fn frequency_of(&self, bin: usize) -> f32 {
        bin as f32 * self.bin_hz
    }
}

/// Blackman-Harris taper table (4-term), pre-computed once per transform
/// length to keep the per-frame cost to a multiply per sample.
struct BlackmanHarris {
    coeffs: Vec<f32>,
}

impl BlackmanHarris {
    fn new(size: usize) -> Self {
        const A0: f32 = 0.35875;
        const A1: f32 = 0.48829;
        const A2: f32 = 0.14128;
        const A3: f32 = 0.01168;

        let coeffs = (0..size)
            .map(|n| {
                let x = 2.0 * std::f32::consts::PI * n as f32 / (size - 1) as f32;
                A0 - A1 * x.cos() + A2 * (2.0 * x).cos() - A3 * (3.0 * x).cos()
            })
            .collect();
        Self { coeffs }
    }
}

/// Sliding-window FFT magnitude analyzer for one channel.
pub struct SpectrumGenerator {
    fft: Arc<dyn Fft<f32>>,
    taper: BlackmanHarris,
    /// Rolling time-domain window; newest samples at the back
    window: Vec<f32>,
    scratch: Vec<Complex<f32>>,
    frames: Producer<SpectrumFrame>,
    fft_size: usize,
    sample_rate: f32,
    dropped: u64,
}

impl SpectrumGenerator {
    /// Create a generator and the consumer end of its frame queue.
    ///
    /// `fft_size` must be a power of two of at least 64; `queue_frames`
    /// bounds how many un-consumed frames may be in flight.
    pub fn new(
        fft_size: usize,
        sample_rate: f32,
        queue_frames: usize,
    ) -> Result<(Self, SpectrumFrames), DspError> {
        if !fft_size.is_power_of_two() || fft_size < 64 {
            return Err(DspError::InvalidFftSize(fft_size));
        }
        if !(sample_rate > 0.0) {
            return Err(DspError::InvalidSampleRate(sample_rate));
        }
        if queue_frames == 0 {
            return Err(DspError::InvalidQueueCapacity(queue_frames));
        }

        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(fft_size);
        let (producer, consumer) = RingBuffer::<SpectrumFrame>::new(queue_frames);

        let generator = Self {
            fft,
            taper: BlackmanHarris::new(fft_size),
            window: vec![0.0; fft_size],
            scratch: vec![Complex::new(0.0, 0.0); fft_size],
            frames: producer,
            fft_size,
            sample_rate,
            dropped: 0,
        };
        Ok((generator, SpectrumFrames { queue: consumer }))
    }

    /// Shift a block of new samples into the window and run one
    /// transform.
    ///
    /// The window slides: the oldest `samples.len()` values fall off the
    /// front and the new block lands at the back. This is a ring shift,
    /// not a reset, so consecutive frames overlap in time.
    pub fn push_block(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        let n = samples.len();
        if n >= self.fft_size {
            self.window.copy_from_slice(&samples[n - self.fft_size..]);
        } else {
            self.window.copy_within(n.., 0);
            let keep = self.fft_size - n;
            self.window[keep..].copy_from_slice(samples);
        }
        self.transform();
    }

    /// Transform length in samples
    pub fn fft_size(&self) -> usize {
        self.fft_size
    }

    /// Width of one output bin in Hz
    pub fn bin_hz(&self) -> f32 {
        self.sample_rate / self.fft_size as f32
    }

    /// Frames refused because the queue was full
    pub fn dropped_frames(&self) -> u64 {
        self.dropped
    }

    fn transform(&mut self) {
        for ((slot, &sample), &taper) in self
            .scratch
            .iter_mut()
            .zip(self.window.iter())
            .zip(self.taper.coeffs.iter())
        {
            *slot = Complex::new(sample * taper, 0.0);
        }
        self.fft.process(&mut self.scratch);

        // Positive-frequency half only; normalize so a full-scale
        // bin-centered sine lands near 0 dB (modulo window gain).
        let half = self.fft_size / 2;
        let scale = 1.0 / half as f32;
        let mut bins = vec![0.0_f32; half].into_boxed_slice();
        for (bin, value) in bins.iter_mut().zip(self.scratch[..half].iter()) {
            let mut magnitude = value.norm() * scale;
            if !magnitude.is_finite() {
                magnitude = 0.0;
            }
            *bin = magnitude_to_db(magnitude, SPECTRUM_FLOOR_DB);
        }

        let frame = SpectrumFrame {
            bins,
            bin_hz: self.bin_hz(),
        };
        if self.frames.push(frame).is_err() {
            self.dropped = self.dropped.wrapping_add(1);
        }
    }
}

/// Consumer end of a generator's frame queue.
pub struct SpectrumFrames {
    queue: Consumer<SpectrumFrame>,
}

impl SpectrumFrames {
    /// Take the oldest waiting frame, if any. Never blocks.
    pub fn pop(&mut self) -> Option<SpectrumFrame> {
        self.queue.pop().ok()
    }

    /// Drain the queue and return only the newest frame.
    ///
    /// Only the most recent transform matters for a live display, but
    /// stale frames still have to leave the queue or it would fill up.
    pub fn latest(&mut self) -> Option<SpectrumFrame> {
        let mut latest = None;
        while let Ok(frame) = self.queue.pop() {
            latest = Some(frame);
        }
        latest
    }

    /// Frames currently waiting
    pub fn len(&self) -> usize {
        self.queue.slots()
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}

/// Convert a linear magnitude to dB, flooring silence instead of
/// returning negative infinity.
fn magnitude_to_db(magnitude: f32, floor_db: f32) -> f32 {
    if !magnitude.is_finite() || magnitude <= 0.0 {
        return floor_db;
    }
    (20.0 * magnitude.log10()).max(floor_db)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48_000.0;
    const FFT_SIZE: usize = 2_048;

    fn make() -> (SpectrumGenerator, SpectrumFrames) {
        SpectrumGenerator::new(FFT_SIZE, SAMPLE_RATE, 4).unwrap()
    }

    fn bin_centered_sine(bin: usize, n: usize) -> Vec<f32> {
        let freq = bin as f32 * SAMPLE_RATE / FFT_SIZE as f32;
        (0..n)
            .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / SAMPLE_RATE).sin())
            .collect()
    }

    #[test]
    fn test_rejects_invalid_construction() {
        assert!(SpectrumGenerator::new(1_000, SAMPLE_RATE, 4).is_err());
        assert!(SpectrumGenerator::new(32, SAMPLE_RATE, 4).is_err());
        assert!(SpectrumGenerator::new(FFT_SIZE, 0.0, 4).is_err());
        assert!(SpectrumGenerator::new(FFT_SIZE, -1.0, 4).is_err());
        assert!(SpectrumGenerator::new(FFT_SIZE, SAMPLE_RATE, 0).is_err());
    }

    #[test]
    fn test_bin_mapping() {
        let (generator, _frames) = make();
        assert!((generator.bin_hz() - SAMPLE_RATE / FFT_SIZE as f32).abs() < 1e-6);

        let frame = SpectrumFrame {
            bins: vec![0.0; FFT_SIZE / 2].into_boxed_slice(),
            bin_hz: generator.bin_hz(),
        };
        assert!((frame.frequency_of(64) - 1_500.0).abs() < 1e-3);
    }

    #[test]
    fn test_sine_produces_single_dominant_peak() {
        let (mut generator, mut frames) = make();

        let target_bin = 64;
        generator.push_block(&bin_centered_sine(target_bin, FFT_SIZE));

        let frame = frames.latest().expect("one transform should be queued");
        let peak_bin = frame
            .bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();

        assert!(
            peak_bin.abs_diff(target_bin) <= 1,
            "peak at bin {peak_bin}, expected within one bin of {target_bin}"
        );

        // The peak must dominate: bins a few octaves away sit at the floor.
        assert!(frame.bins[peak_bin] > frame.bins[target_bin * 8] + 24.0);
    }

    #[test]
    fn test_window_slides_instead_of_resetting() {
        let (mut generator, mut frames) = make();

        // Fill the window with a tone, then push a short silent block.
        // The tone is still mostly inside the window, so its peak must
        // still dominate the new frame.
        generator.push_block(&bin_centered_sine(64, FFT_SIZE));
        let _ = frames.latest();

        generator.push_block(&vec![0.0; FFT_SIZE / 8]);
        let frame = frames.latest().unwrap();
        let peak_bin = frame
            .bins
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert!(peak_bin.abs_diff(64) <= 1);
    }

    #[test]
    fn test_non_finite_input_yields_floored_finite_bins() {
        let (mut generator, mut frames) = make();

        let mut block = vec![0.0_f32; FFT_SIZE];
        block[10] = f32::NAN;
        block[11] = f32::INFINITY;
        generator.push_block(&block);

        let frame = frames.latest().unwrap();
        for &bin in frame.bins.iter() {
            assert!(bin.is_finite());
            assert!(bin >= SPECTRUM_FLOOR_DB);
        }
    }

    #[test]
    fn test_silence_sits_at_the_floor() {
        let (mut generator, mut frames) = make();
        generator.push_block(&vec![0.0; FFT_SIZE]);

        let frame = frames.latest().unwrap();
        for &bin in frame.bins.iter() {
            assert_eq!(bin, SPECTRUM_FLOOR_DB);
        }
    }

    #[test]
    fn test_full_queue_drops_new_frames() {
        let (mut generator, mut frames) = SpectrumGenerator::new(FFT_SIZE, SAMPLE_RATE, 2).unwrap();

        for _ in 0..5 {
            generator.push_block(&vec![0.25; 256]);
        }
        assert_eq!(generator.dropped_frames(), 3);
        assert_eq!(frames.len(), 2);

        // latest() drains everything
        assert!(frames.latest().is_some());
        assert!(frames.is_empty());
    }

    #[test]
    fn test_magnitude_to_db() {
        assert_eq!(magnitude_to_db(1.0, SPECTRUM_FLOOR_DB), 0.0);
        assert!((magnitude_to_db(0.5, SPECTRUM_FLOOR_DB) + 6.0206).abs() < 1e-3);
        assert_eq!(magnitude_to_db(0.0, SPECTRUM_FLOOR_DB), SPECTRUM_FLOOR_DB);
        assert_eq!(magnitude_to_db(f32::NAN, SPECTRUM_FLOOR_DB), SPECTRUM_FLOOR_DB);
        assert_eq!(magnitude_to_db(1e-12, SPECTRUM_FLOOR_DB), SPECTRUM_FLOOR_DB);
    }
}
