//! Message Types for Thread Communication
//!
//! Commands flow from the UI thread to the engine's control thread;
//! events flow back. Parameter commands land in the shared store, so
//! the audio callback itself never sees a channel.

use serde::{Deserialize, Serialize};

/// Commands sent from UI thread to the audio engine
#[derive(Debug, Clone)]
pub enum Command {
    /// Start the audio stream
    Start,

    /// Stop the audio stream
    Stop,

    /// Peak stage parameters
    SetPeakFreq(f32),
    SetPeakGainDb(f32),
    SetPeakQ(f32),

    /// Cut stage parameters (slope as its 0-3 selector index)
    SetLowCutFreq(f32),
    SetLowCutSlope(u32),
    SetHighCutFreq(f32),
    SetHighCutSlope(u32),

    /// Per-stage bypass
    SetLowCutBypassed(bool),
    SetPeakBypassed(bool),
    SetHighCutBypassed(bool),

    /// Run or pause the whole spectrum pipeline (cost saving when the
    /// display is hidden)
    SetSpectrumEnabled(bool),

    /// Request current state (triggers a StateUpdate event)
    RequestState,

    /// Shut down the engine thread
    Shutdown,
}

/// Events sent from the audio engine to the UI thread
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum Event {
    /// Stream started successfully
    Started,

    /// Stream stopped
    Stopped,

    /// Error occurred
    Error { message: String },

    /// Peak levels for meters: (left, right) in 0.0 - 1.0
    LevelUpdate { left: f32, right: f32 },

    /// Current state snapshot
    StateUpdate {
        is_running: bool,
        peak_freq: f32,
        peak_gain_db: f32,
        peak_q: f32,
        low_cut_freq: f32,
        high_cut_freq: f32,
        low_cut_slope: u32,
        high_cut_slope: u32,
        low_cut_bypassed: bool,
        peak_bypassed: bool,
        high_cut_bypassed: bool,
        spectrum_enabled: bool,
    },

    /// Fresh spectrum polylines for both channels, in the plot rectangle
    /// configured by `AnalyzerConfig`. Sent at the render cadence while
    /// audio is flowing and the spectrum is enabled.
    SpectrumUpdate {
        left: Vec<(f32, f32)>,
        right: Vec<(f32, f32)>,
    },

    /// The output callback ran out of captured audio (duplex mode)
    BufferUnderrun,
}

impl Event {
    /// Create an error event from any error type
    pub fn error<E: std::fmt::Display>(err: E) -> Self {
        Event::Error {
            message: err.to_string(),
        }
    }
}
