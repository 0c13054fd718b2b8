//! Sculpt Core - Audio Engine
//!
//! This crate wires the DSP core into a running system:
//! - `EqParams`: the shared parameter store and atomic coefficient swap
//! - `EqProcessor`: the audio-callback half (filtering + relay feeding)
//! - `Analyzer`: the render half (spectrum paths + response curve)
//! - `AudioEngine`: a standalone cpal-based transport around the pair
//!
//! # Architecture
//!
//! ```text
//! UI thread ──commands──▶ control thread ──ArcSwap<FilterBank>──▶ audio callback
//!           ◀──events───      │    ▲                                   │
//!                             ▼    └───────rtrb sample relays──────────┘
//!                          Analyzer ─▶ spectrum frames ─▶ paths
//! ```
//!
//! Hosts that bring their own transport (a plugin wrapper, a test
//! harness) skip `AudioEngine` and embed [`EqPipeline`] directly: move
//! the processor into the audio callback, keep the analyzer with the
//! renderer, and hand the params store to the UI.

mod analyzer;
mod config;
mod engine;
mod error;
mod message;
mod params;
mod processor;
mod stream;

pub use analyzer::Analyzer;
pub use config::{AnalyzerConfig, EngineConfig, StreamConfig};
pub use engine::AudioEngine;
pub use error::{EngineError, EngineResult};
pub use message::{Command, Event};
pub use params::EqParams;
pub use processor::{EqPipeline, EqProcessor};
pub use stream::{AudioStream, SharedState};

// Re-export DSP types for convenience
pub use sculpt_dsp::{ChainSettings, FilterBank, Slope};
