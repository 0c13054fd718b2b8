//! Engine, Stream and Analyzer Configuration

use serde::{Deserialize, Serialize};

/// Audio stream configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamConfig {
    /// Sample rate in Hz (e.g., 44100, 48000, 96000)
    pub sample_rate: u32,

    /// Number of audio channels (this engine processes stereo)
    pub channels: u16,

    /// Buffer size in frames (lower = less latency, higher = more stability)
    pub buffer_size: u32,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
            channels: 2,
            buffer_size: 512,
        }
    }
}

impl StreamConfig {
    /// Calculate latency in milliseconds for this configuration
    pub fn latency_ms(&self) -> f32 {
        (self.buffer_size as f32 / self.sample_rate as f32) * 1000.0
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.sample_rate < 8_000 || self.sample_rate > 192_000 {
            return Err(format!("Invalid sample rate: {}", self.sample_rate));
        }
        if self.channels != 2 {
            return Err(format!(
                "Invalid channel count: {} (stereo only)",
                self.channels
            ));
        }
        if self.buffer_size < 32 || self.buffer_size > 8_192 {
            return Err(format!("Invalid buffer size: {}", self.buffer_size));
        }
        Ok(())
    }
}

/// Spectrum/visualization pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyzerConfig {
    /// Samples per relayed block (per channel)
    pub relay_block_len: usize,

    /// Complete blocks the relay can hold in flight. Size this so that
    /// overflow is rare at the consumer's polling rate; at 48 kHz with
    /// 1024-sample blocks, 8 blocks covers ~170 ms of consumer stall.
    pub relay_capacity_blocks: usize,

    /// Transform length (power of two)
    pub fft_size: usize,

    /// Un-consumed spectrum frames allowed in flight per channel
    pub spectrum_queue_frames: usize,

    /// Emit one spectrum path point per this many bins
    pub curve_stride: usize,

    /// Pixel rectangle the engine renders spectrum paths into
    pub plot_width: f32,
    pub plot_height: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            relay_block_len: 1_024,
            relay_capacity_blocks: 8,
            fft_size: sculpt_dsp::DEFAULT_FFT_SIZE,
            spectrum_queue_frames: 4,
            curve_stride: 2,
            plot_width: 600.0,
            plot_height: 200.0,
        }
    }
}

impl AnalyzerConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.relay_block_len == 0 || self.relay_capacity_blocks == 0 {
            return Err(format!(
                "Invalid relay sizing: {} x {}",
                self.relay_block_len, self.relay_capacity_blocks
            ));
        }
        if !self.fft_size.is_power_of_two() || self.fft_size < 64 {
            return Err(format!("Invalid FFT size: {}", self.fft_size));
        }
        if self.spectrum_queue_frames == 0 {
            return Err("Spectrum queue capacity must be non-zero".to_string());
        }
        if !(self.plot_width > 0.0) || !(self.plot_height > 0.0) {
            return Err(format!(
                "Invalid plot size: {} x {}",
                self.plot_width, self.plot_height
            ));
        }
        Ok(())
    }
}

/// Overall engine configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Stream configuration
    pub stream: StreamConfig,

    /// Visualization pipeline configuration
    pub analyzer: AnalyzerConfig,
}

impl EngineConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            stream: StreamConfig {
                sample_rate: 48_000,
                channels: 2,
                buffer_size: 128, // ~2.6ms latency
            },
            analyzer: AnalyzerConfig {
                relay_block_len: 512,
                relay_capacity_blocks: 16,
                ..Default::default()
            },
        }
    }

    /// Validate both halves at once
    pub fn validate(&self) -> Result<(), String> {
        self.stream.validate()?;
        self.analyzer.validate()
    }
}
