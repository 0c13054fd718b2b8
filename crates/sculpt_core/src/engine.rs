//! Audio Engine - Main Entry Point
//!
//! The `AudioEngine` owns the control thread and coordinates the three
//! execution contexts:
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                         UI Thread                            │
//! │      setters ──commands──▶ Engine ◀──events── poll_event     │
//! └──────────────────────────────────────────────────────────────┘
//!                               │ crossbeam-channel
//!                               ▼
//! ┌──────────────────────────────────────────────────────────────┐
//! │    Control thread: EqParams writes, Analyzer polling         │
//! │      set_*() ──ArcSwap──▶ FilterBank                         │
//! │      Analyzer ◀──rtrb─── relays                              │
//! └──────────────────────────────────────────────────────────────┘
//!                               ▲
//! ┌──────────────────────────────────────────────────────────────┐
//! │    Audio callback (cpal): EqProcessor                        │
//! │      bank load ─▶ chains ─▶ relays   (no locks, no alloc)    │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Parameter commands land in the shared store immediately; the audio
//! callback picks the resulting bank up at its next block. The control
//! loop's receive timeout doubles as the render cadence: on every tick
//! it polls the analyzer and forwards levels and spectrum paths as
//! events.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use cpal::traits::HostTrait;
use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use tracing::{debug, error, info, warn};

use sculpt_dsp::Slope;

use crate::analyzer::Analyzer;
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::message::{Command, Event};
use crate::params::EqParams;
use crate::processor::EqPipeline;
use crate::stream::AudioStream;

/// The main audio engine controller.
///
/// Lives on the UI/main thread and communicates with the control thread
/// via channels. Parameters survive stream stop/start cycles because
/// the store outlives the pipeline.
pub struct AudioEngine {
    command_sender: Sender<Command>,
    event_receiver: Receiver<Event>,
    control_thread: Option<JoinHandle<()>>,
    shutdown_flag: Arc<AtomicBool>,
    params: Arc<EqParams>,
    config: EngineConfig,
    is_running: Arc<AtomicBool>,
}

impl AudioEngine {
    /// Create a new audio engine with default configuration
    pub fn new() -> EngineResult<Self> {
        Self::with_config(EngineConfig::default())
    }

    /// Create a new audio engine with custom configuration
    pub fn with_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate().map_err(EngineError::ConfigError)?;

        let (command_sender, command_receiver) = bounded::<Command>(32);
        let (event_sender, event_receiver) = unbounded::<Event>();

        let shutdown_flag = Arc::new(AtomicBool::new(false));
        let is_running = Arc::new(AtomicBool::new(false));
        let params = Arc::new(EqParams::new(config.stream.sample_rate as f32));

        let shutdown_clone = Arc::clone(&shutdown_flag);
        let running_clone = Arc::clone(&is_running);
        let params_clone = Arc::clone(&params);
        let config_clone = config.clone();

        let control_thread = thread::Builder::new()
            .name("sculpt-audio".into())
            .spawn(move || {
                Self::control_thread_main(
                    command_receiver,
                    event_sender,
                    shutdown_clone,
                    running_clone,
                    params_clone,
                    config_clone,
                );
            })
            .map_err(|e| EngineError::StreamBuildError(e.to_string()))?;

        Ok(Self {
            command_sender,
            event_receiver,
            control_thread: Some(control_thread),
            shutdown_flag,
            params,
            config,
            is_running,
        })
    }

    /// Start audio processing
    pub fn start(&self) -> EngineResult<()> {
        self.send_command(Command::Start)
    }

    /// Stop audio processing
    pub fn stop(&self) -> EngineResult<()> {
        self.send_command(Command::Stop)
    }

    pub fn set_peak_freq(&self, freq: f32) -> EngineResult<()> {
        self.send_command(Command::SetPeakFreq(freq))
    }

    pub fn set_peak_gain_db(&self, gain_db: f32) -> EngineResult<()> {
        self.send_command(Command::SetPeakGainDb(gain_db))
    }

    pub fn set_peak_q(&self, q: f32) -> EngineResult<()> {
        self.send_command(Command::SetPeakQ(q))
    }

    pub fn set_low_cut_freq(&self, freq: f32) -> EngineResult<()> {
        self.send_command(Command::SetLowCutFreq(freq))
    }

    pub fn set_low_cut_slope(&self, slope: Slope) -> EngineResult<()> {
        self.send_command(Command::SetLowCutSlope(slope.index()))
    }

    pub fn set_high_cut_freq(&self, freq: f32) -> EngineResult<()> {
        self.send_command(Command::SetHighCutFreq(freq))
    }

    pub fn set_high_cut_slope(&self, slope: Slope) -> EngineResult<()> {
        self.send_command(Command::SetHighCutSlope(slope.index()))
    }

    pub fn set_low_cut_bypassed(&self, bypassed: bool) -> EngineResult<()> {
        self.send_command(Command::SetLowCutBypassed(bypassed))
    }

    pub fn set_peak_bypassed(&self, bypassed: bool) -> EngineResult<()> {
        self.send_command(Command::SetPeakBypassed(bypassed))
    }

    pub fn set_high_cut_bypassed(&self, bypassed: bool) -> EngineResult<()> {
        self.send_command(Command::SetHighCutBypassed(bypassed))
    }

    /// Toggle the spectrum pipeline (cost saving while the display is
    /// hidden)
    pub fn set_spectrum_enabled(&self, enabled: bool) -> EngineResult<()> {
        self.send_command(Command::SetSpectrumEnabled(enabled))
    }

    /// Request current state (triggers a StateUpdate event)
    pub fn request_state(&self) -> EngineResult<()> {
        self.send_command(Command::RequestState)
    }

    /// Check if the stream is currently running
    pub fn is_running(&self) -> bool {
        self.is_running.load(Ordering::SeqCst)
    }

    /// Get next event (non-blocking)
    pub fn poll_event(&self) -> Option<Event> {
        self.event_receiver.try_recv().ok()
    }

    /// Get next event (blocking)
    pub fn wait_event(&self) -> Option<Event> {
        self.event_receiver.recv().ok()
    }

    /// The shared parameter store; `snapshot()` is safe from any thread.
    pub fn params(&self) -> &Arc<EqParams> {
        &self.params
    }

    /// Theoretical response curve for the current settings, one point
    /// per pixel column. Pure function of the snapshot; safe to call at
    /// the UI's own cadence without going through the engine thread.
    pub fn response_curve(&self, width: usize, height: f32) -> Vec<(f32, f32)> {
        sculpt_dsp::response_points(
            &self.params.snapshot(),
            self.params.sample_rate(),
            width,
            height,
        )
    }

    /// Get current configuration
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn send_command(&self, command: Command) -> EngineResult<()> {
        self.command_sender
            .send(command)
            .map_err(|_| EngineError::ChannelSendError)
    }

    /// Control thread main loop
    fn control_thread_main(
        command_receiver: Receiver<Command>,
        event_sender: Sender<Event>,
        shutdown_flag: Arc<AtomicBool>,
        is_running: Arc<AtomicBool>,
        params: Arc<EqParams>,
        config: EngineConfig,
    ) {
        info!("Control thread started");

        let mut stream: Option<AudioStream> = None;
        let mut analyzer: Option<Analyzer> = None;

        while !shutdown_flag.load(Ordering::SeqCst) {
            // The timeout doubles as the render cadence: ~60 polls/sec
            match command_receiver.recv_timeout(std::time::Duration::from_millis(16)) {
                Ok(command) => match command {
                    Command::Start => {
                        if stream.is_some() {
                            warn!("Engine already running");
                            let _ = event_sender.send(Event::error("Already running"));
                            continue;
                        }

                        info!("Starting audio stream");
                        match Self::start_stream(&config, &params, event_sender.clone()) {
                            Ok((new_stream, new_analyzer)) => {
                                stream = Some(new_stream);
                                analyzer = Some(new_analyzer);
                                is_running.store(true, Ordering::SeqCst);
                                let _ = event_sender.send(Event::Started);
                            }
                            Err(e) => {
                                error!("Failed to start stream: {}", e);
                                let _ = event_sender.send(Event::error(e));
                            }
                        }
                    }

                    Command::Stop => {
                        if stream.is_none() {
                            debug!("Engine not running");
                            continue;
                        }
                        info!("Stopping audio stream");
                        // Dropping the stream lets cpal finish the block
                        // in flight before tearing the callback down.
                        stream = None;
                        analyzer = None;
                        is_running.store(false, Ordering::SeqCst);
                        let _ = event_sender.send(Event::Stopped);
                    }

                    Command::SetPeakFreq(freq) => params.set_peak_freq(freq),
                    Command::SetPeakGainDb(gain_db) => params.set_peak_gain_db(gain_db),
                    Command::SetPeakQ(q) => params.set_peak_q(q),
                    Command::SetLowCutFreq(freq) => params.set_low_cut_freq(freq),
                    Command::SetLowCutSlope(index) => {
                        params.set_low_cut_slope(Slope::from_index(index))
                    }
                    Command::SetHighCutFreq(freq) => params.set_high_cut_freq(freq),
                    Command::SetHighCutSlope(index) => {
                        params.set_high_cut_slope(Slope::from_index(index))
                    }
                    Command::SetLowCutBypassed(bypassed) => params.set_low_cut_bypassed(bypassed),
                    Command::SetPeakBypassed(bypassed) => params.set_peak_bypassed(bypassed),
                    Command::SetHighCutBypassed(bypassed) => {
                        params.set_high_cut_bypassed(bypassed)
                    }
                    Command::SetSpectrumEnabled(enabled) => {
                        debug!("Spectrum pipeline enabled: {}", enabled);
                        params.set_spectrum_enabled(enabled);
                    }

                    Command::RequestState => {
                        let snapshot = params.snapshot();
                        let _ = event_sender.send(Event::StateUpdate {
                            is_running: stream.is_some(),
                            peak_freq: snapshot.peak_freq,
                            peak_gain_db: snapshot.peak_gain_db,
                            peak_q: snapshot.peak_q,
                            low_cut_freq: snapshot.low_cut_freq,
                            high_cut_freq: snapshot.high_cut_freq,
                            low_cut_slope: snapshot.low_cut_slope.index(),
                            high_cut_slope: snapshot.high_cut_slope.index(),
                            low_cut_bypassed: snapshot.low_cut_bypassed,
                            peak_bypassed: snapshot.peak_bypassed,
                            high_cut_bypassed: snapshot.high_cut_bypassed,
                            spectrum_enabled: snapshot.spectrum_enabled,
                        });
                    }

                    Command::Shutdown => {
                        info!("Shutdown command received");
                        shutdown_flag.store(true, Ordering::SeqCst);
                    }
                },

                Err(crossbeam_channel::RecvTimeoutError::Timeout) => {
                    // Render tick: forward meters and spectrum paths
                    if let (Some(active_stream), Some(active_analyzer)) =
                        (&stream, &mut analyzer)
                    {
                        let (left, right) = active_stream.get_peaks();
                        if left > 0.001 || right > 0.001 {
                            let _ = event_sender.try_send(Event::LevelUpdate { left, right });
                        }

                        if params.spectrum_enabled() {
                            let (left_path, right_path) = active_analyzer.poll_spectrum(
                                config.analyzer.plot_width,
                                config.analyzer.plot_height,
                            );
                            if !left_path.is_empty() || !right_path.is_empty() {
                                let _ = event_sender.try_send(Event::SpectrumUpdate {
                                    left: left_path,
                                    right: right_path,
                                });
                            }
                        }
                    }
                }

                Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
            }
        }

        // The render thread side can stop at any block boundary; only
        // published, immutable snapshots were ever read.
        drop(stream);
        drop(analyzer);
        is_running.store(false, Ordering::SeqCst);
        info!("Control thread exited");
    }

    /// Build pipeline + cpal stream for the default output device.
    fn start_stream(
        config: &EngineConfig,
        params: &Arc<EqParams>,
        event_sender: Sender<Event>,
    ) -> EngineResult<(AudioStream, Analyzer)> {
        let host = cpal::default_host();
        let output_device = host
            .default_output_device()
            .ok_or(EngineError::NoOutputDevice)?;

        let mut pipeline = EqPipeline::with_params(config, Arc::clone(params))?;
        pipeline.processor.prepare(
            config.stream.sample_rate as f32,
            config.stream.buffer_size as usize,
        );

        let stream = AudioStream::new_output_only(
            config.stream.clone(),
            &output_device,
            pipeline.processor,
            event_sender,
        )?;

        Ok((stream, pipeline.analyzer))
    }
}

impl Drop for AudioEngine {
    fn drop(&mut self) {
        let _ = self.command_sender.send(Command::Shutdown);
        self.shutdown_flag.store(true, Ordering::SeqCst);
        if let Some(handle) = self.control_thread.take() {
            let _ = handle.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_engine_rejects_invalid_config() {
        let mut config = EngineConfig::default();
        config.stream.sample_rate = 1;
        assert!(AudioEngine::with_config(config).is_err());
    }

    #[test]
    fn test_parameter_commands_reach_the_store() {
        let engine = AudioEngine::new().unwrap();
        engine.set_peak_gain_db(6.0).unwrap();
        engine.set_low_cut_slope(Slope::Db36).unwrap();

        // Commands are applied asynchronously on the control thread
        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            let snapshot = engine.params().snapshot();
            if snapshot.peak_gain_db == 6.0 && snapshot.low_cut_slope == Slope::Db36 {
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "commands never reached the parameter store"
            );
            std::thread::yield_now();
        }
    }

    #[test]
    fn test_request_state_round_trip() {
        let engine = AudioEngine::new().unwrap();
        engine.set_peak_freq(1_234.0).unwrap();
        engine.request_state().unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(2);
        loop {
            if let Some(Event::StateUpdate {
                is_running,
                peak_freq,
                ..
            }) = engine.poll_event()
            {
                assert!(!is_running);
                assert_eq!(peak_freq, 1_234.0);
                break;
            }
            assert!(
                std::time::Instant::now() < deadline,
                "no StateUpdate event arrived"
            );
            std::thread::yield_now();
        }
    }

    #[test]
    fn test_response_curve_is_available_without_a_stream() {
        let engine = AudioEngine::new().unwrap();
        let points = engine.response_curve(300, 150.0);
        assert_eq!(points.len(), 300);
        for &(x, y) in &points {
            assert!(x.is_finite() && y.is_finite());
        }
    }

    // Hardware-dependent test
    #[test]
    #[ignore = "requires audio hardware"]
    fn test_start_stop_cycle() {
        let engine = AudioEngine::new().unwrap();
        engine.start().unwrap();
        std::thread::sleep(std::time::Duration::from_millis(200));
        engine.stop().unwrap();
    }
}
