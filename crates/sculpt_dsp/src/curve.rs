//! Curve Builder
//!
//! Turns a spectrum frame into a renderable polyline: x is a log10
//! interpolation of bin frequency across the audible band, y a linear
//! map of dB onto the target rectangle. One point is emitted per
//! `stride` bins to bound path complexity, and anything non-finite is
//! skipped rather than handed to a renderer as degenerate geometry.

use crate::settings::{MAX_FREQ_HZ, MIN_FREQ_HZ};
use crate::spectrum::SpectrumFrame;

/// Display mapping for spectrum polylines. Independent per channel:
/// builders carry no per-frame state, so one instance per channel is
/// purely a matter of configuration.
#[derive(Debug, Clone, Copy)]
pub struct CurveBuilder {
    floor_db: f32,
    ceil_db: f32,
    stride: usize,
}

impl CurveBuilder {
    /// `floor_db`/`ceil_db` bound the vertical axis (floor at the bottom
    /// edge, ceiling at the top); every `stride`-th bin becomes a point.
    pub fn new(floor_db: f32, ceil_db: f32, stride: usize) -> Self {
        Self {
            floor_db,
            ceil_db: if ceil_db > floor_db { ceil_db } else { floor_db + 1.0 },
            stride: stride.max(1),
        }
    }

    /// Map a frame onto a `width` x `height` rectangle.
    ///
    /// The result is strictly increasing in x: bin frequency only grows,
    /// and any bin that would repeat or precede the previous x (or map to
    /// a non-finite value) is dropped.
    pub fn build(&self, frame: &SpectrumFrame, width: f32, height: f32) -> Vec<(f32, f32)> {
        let mut points = Vec::with_capacity(frame.bin_count() / self.stride + 1);
        let mut last_x = f32::NEG_INFINITY;

        for bin in (0..frame.bin_count()).step_by(self.stride) {
            let freq = frame.frequency_of(bin);
            if !(MIN_FREQ_HZ..=MAX_FREQ_HZ).contains(&freq) {
                continue;
            }

            let x = width * normalized_log_position(freq);
            let y = db_to_y(frame.bins[bin], self.floor_db, self.ceil_db, height);
            if !x.is_finite() || !y.is_finite() || x <= last_x {
                continue;
            }

            last_x = x;
            points.push((x, y));
        }

        points
    }
}

impl Default for CurveBuilder {
    fn default() -> Self {
        Self::new(crate::spectrum::SPECTRUM_FLOOR_DB, 0.0, 2)
    }
}

/// Position of a frequency within [20 Hz, 20 kHz] on a log10 axis,
/// 0.0 at the low edge and 1.0 at the high edge.
pub fn normalized_log_position(freq: f32) -> f32 {
    (freq / MIN_FREQ_HZ).log10() / (MAX_FREQ_HZ / MIN_FREQ_HZ).log10()
}

/// Linear dB-to-pixel map: `floor_db` lands on the bottom edge
/// (`y == height`), `ceil_db` on the top edge (`y == 0`).
pub fn db_to_y(db: f32, floor_db: f32, ceil_db: f32, height: f32) -> f32 {
    height - (db - floor_db) / (ceil_db - floor_db) * height
}
