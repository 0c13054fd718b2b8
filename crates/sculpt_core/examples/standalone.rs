//! Run the EQ engine against the default output device and print its
//! events for a few seconds.
//!
//! Run with: cargo run -p sculpt_core --example standalone

use std::time::{Duration, Instant};

use sculpt_core::{AudioEngine, Event, Slope};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let engine = AudioEngine::new()?;

    // Shape the chain a little so the response curve is interesting
    engine.set_low_cut_freq(80.0)?;
    engine.set_low_cut_slope(Slope::Db24)?;
    engine.set_peak_freq(1_000.0)?;
    engine.set_peak_gain_db(6.0)?;
    engine.set_high_cut_freq(12_000.0)?;

    let curve = engine.response_curve(80, 20.0);
    println!("response curve ({} points):", curve.len());
    for &(x, y) in curve.iter().step_by(10) {
        println!("  x={x:5.1}  y={y:5.1}");
    }

    engine.start()?;

    let deadline = Instant::now() + Duration::from_secs(5);
    while Instant::now() < deadline {
        match engine.wait_event() {
            Some(Event::SpectrumUpdate { left, right }) => {
                println!("spectrum: {} left points, {} right points", left.len(), right.len());
            }
            Some(Event::LevelUpdate { left, right }) => {
                println!("levels: L {left:.3}  R {right:.3}");
            }
            Some(event) => println!("{event:?}"),
            None => break,
        }
    }

    engine.stop()?;
    Ok(())
}
