//! Trajectory feature extraction from raw touch samples
//!
//! Turns a noisy (x, y, t) touch path into the smoothed, normalized,
//! fixed-length feature arrays the encoder expects. Pure over its input;
//! irregular sensor data (non-monotonic timestamps, NaN coordinates) is
//! clamped or guarded rather than rejected.

use tracing::debug;

use crate::error::{GlideError, Result};
use crate::input::{Point, SwipeInput};
use crate::tokens::PAD_IDX;
use crate::MAX_SEQ_LEN;

/// Moving-average window for touch-jitter smoothing.
const SMOOTHING_WINDOW: usize = 3;

/// Leading samples closer than this (pixels) are collapsed before feature
/// extraction, so touch-down jitter does not zero out the velocity profile.
const DUPLICATE_START_THRESHOLD: f32 = 1.0;

/// First letter token id ('a').
const LETTER_BASE: i64 = 4;

const QWERTY_ROWS: [&str; 3] = ["qwertyuiop", "asdfghjkl", "zxcvbnm"];

/// Fixed-length per-sample feature arrays derived from one gesture.
///
/// Every array has exactly [`MAX_SEQ_LEN`] entries. Coordinates and nearest
/// keys pad by repeating their last valid value (the layout the model was
/// trained with); velocity and acceleration are zero in the padding region.
#[derive(Debug, Clone)]
pub struct TrajectoryFeatures {
    /// Normalized x in [0, 1]
    pub xs: Vec<f32>,
    /// Normalized y in [0, 1]
    pub ys: Vec<f32>,
    /// Per-sample velocity magnitude (normalized units per second)
    pub velocities: Vec<f32>,
    /// Per-sample acceleration magnitude
    pub accelerations: Vec<f32>,
    /// Nearest-key token id per sample
    pub nearest_keys: Vec<i64>,
    /// Count of real, non-padding samples
    pub actual_length: usize,
}

/// Extracts [`TrajectoryFeatures`] from raw gestures.
///
/// Nearest-key assignment uses real key-center positions when the host
/// provides them, falling back to a synthetic staggered QWERTY grid derived
/// from the keyboard dimensions.
#[derive(Debug, Clone)]
pub struct TrajectoryProcessor {
    keyboard_width: f32,
    keyboard_height: f32,
    key_positions: Vec<(char, Point)>,
}

impl TrajectoryProcessor {
    pub fn new(keyboard_width: f32, keyboard_height: f32) -> Self {
        Self {
            keyboard_width: keyboard_width.max(1.0),
            keyboard_height: keyboard_height.max(1.0),
            key_positions: Vec::new(),
        }
    }

    pub fn set_keyboard_dimensions(&mut self, width: f32, height: f32) {
        self.keyboard_width = width.max(1.0);
        self.keyboard_height = height.max(1.0);
    }

    /// Provide real key-center positions in keyboard pixel coordinates.
    pub fn set_key_positions(&mut self, positions: Vec<(char, Point)>) {
        self.key_positions = positions;
    }

    /// Derive fixed-length features from a gesture.
    ///
    /// Gestures with fewer than 2 samples are rejected; everything else is
    /// processed leniently.
    pub fn extract_features(&self, input: &SwipeInput) -> Result<TrajectoryFeatures> {
        if input.len() < 2 {
            return Err(GlideError::invalid_input(format!(
                "gesture too short: {} point(s), need at least 2",
                input.len()
            )));
        }

        let (mut points, mut timestamps) =
            filter_duplicate_start(input.points(), input.timestamps());
        if points.len() < 2 {
            // Entirely static gesture; fall back to the raw samples
            points = input.points().to_vec();
            timestamps = input.timestamps().to_vec();
        }

        let smoothed = smooth(&points);

        let raw_len = smoothed.len();
        let actual_length = raw_len.min(MAX_SEQ_LEN);
        if raw_len > MAX_SEQ_LEN {
            debug!(raw_len, "truncating gesture to {} samples", MAX_SEQ_LEN);
        }

        // Nearest keys from un-normalized coordinates, then normalization
        let mut nearest_keys: Vec<i64> = smoothed
            .iter()
            .take(actual_length)
            .map(|p| self.nearest_key(p))
            .collect();

        let mut xs = Vec::with_capacity(MAX_SEQ_LEN);
        let mut ys = Vec::with_capacity(MAX_SEQ_LEN);
        for p in smoothed.iter().take(actual_length) {
            xs.push(normalize(p.x, self.keyboard_width));
            ys.push(normalize(p.y, self.keyboard_height));
        }

        // Pad by repeating the last valid value (model-training layout)
        let last_x = *xs.last().expect("at least two samples");
        let last_y = *ys.last().expect("at least two samples");
        let last_key = *nearest_keys.last().unwrap_or(&PAD_IDX);
        xs.resize(MAX_SEQ_LEN, last_x);
        ys.resize(MAX_SEQ_LEN, last_y);
        nearest_keys.resize(MAX_SEQ_LEN, last_key);

        timestamps.truncate(actual_length);
        let velocities = velocities(&xs, &ys, &timestamps, actual_length);
        let accelerations = accelerations(&velocities, &timestamps, actual_length);

        Ok(TrajectoryFeatures {
            xs,
            ys,
            velocities,
            accelerations,
            nearest_keys,
            actual_length,
        })
    }

    fn nearest_key(&self, point: &Point) -> i64 {
        if self.key_positions.is_empty() {
            return self.grid_key(point);
        }

        // Squared distance is enough for argmin
        let mut best = ('a', f32::INFINITY);
        for (c, center) in &self.key_positions {
            let dx = point.x - center.x;
            let dy = point.y - center.y;
            let d2 = dx * dx + dy * dy;
            if d2 < best.1 {
                best = (*c, d2);
            }
        }
        letter_token(best.0)
    }

    /// Staggered QWERTY grid lookup: three letter rows with per-row
    /// horizontal offsets (half a key on the home row, a full key on the
    /// bottom row).
    fn grid_key(&self, point: &Point) -> i64 {
        let key_width = self.keyboard_width / 10.0;
        let key_height = self.keyboard_height / 4.0;

        let x = if point.x.is_finite() { point.x } else { 0.0 };
        let y = if point.y.is_finite() { point.y } else { 0.0 };

        let row = ((y / key_height) as isize).clamp(0, 2) as usize;
        let (offset, max_col) = match row {
            0 => (0.0, 9),
            1 => (key_width / 2.0, 8),
            _ => (key_width, 6),
        };
        let col = (((x - offset) / key_width) as isize).clamp(0, max_col) as usize;

        match QWERTY_ROWS[row].chars().nth(col) {
            Some(c) => letter_token(c),
            None => PAD_IDX,
        }
    }
}

fn letter_token(c: char) -> i64 {
    let c = c.to_ascii_lowercase();
    if c.is_ascii_lowercase() {
        LETTER_BASE + (c as i64 - 'a' as i64)
    } else {
        PAD_IDX
    }
}

/// Collapse consecutive leading samples within [`DUPLICATE_START_THRESHOLD`].
fn filter_duplicate_start(points: &[Point], timestamps: &[u64]) -> (Vec<Point>, Vec<u64>) {
    if points.is_empty() {
        return (Vec::new(), Vec::new());
    }

    let first = points[0];
    let mut idx = 1;
    while idx < points.len() {
        let p = points[idx];
        if (p.x - first.x).abs() > DUPLICATE_START_THRESHOLD
            || (p.y - first.y).abs() > DUPLICATE_START_THRESHOLD
        {
            break;
        }
        idx += 1;
    }

    if idx == 1 {
        return (points.to_vec(), timestamps.to_vec());
    }

    let mut out_points = Vec::with_capacity(points.len() - idx + 1);
    let mut out_timestamps = Vec::with_capacity(points.len() - idx + 1);
    out_points.push(first);
    out_timestamps.push(timestamps[0]);
    out_points.extend_from_slice(&points[idx..]);
    out_timestamps.extend_from_slice(&timestamps[idx..]);
    (out_points, out_timestamps)
}

/// Moving-average smoothing with edge-truncated windows: the first and last
/// samples average over partial windows instead of being dropped.
fn smooth(points: &[Point]) -> Vec<Point> {
    if points.len() <= SMOOTHING_WINDOW {
        return points.to_vec();
    }

    let radius = SMOOTHING_WINDOW / 2;
    let mut smoothed = Vec::with_capacity(points.len());
    for i in 0..points.len() {
        let start = i.saturating_sub(radius);
        let end = (i + radius + 1).min(points.len());
        let window = &points[start..end];
        let inv = 1.0 / window.len() as f32;
        let sx: f32 = window.iter().map(|p| p.x).sum();
        let sy: f32 = window.iter().map(|p| p.y).sum();
        smoothed.push(Point::new(sx * inv, sy * inv));
    }
    smoothed
}

fn normalize(value: f32, extent: f32) -> f32 {
    if !value.is_finite() {
        return 0.0;
    }
    (value / extent).clamp(0.0, 1.0)
}

/// Per-segment velocity magnitude: Euclidean distance over elapsed seconds.
/// Zero or backwards timestamps yield 0 rather than an error.
fn velocities(xs: &[f32], ys: &[f32], timestamps: &[u64], actual_length: usize) -> Vec<f32> {
    let mut out = vec![0.0; MAX_SEQ_LEN];
    for i in 1..actual_length.min(timestamps.len()) {
        let dt = timestamps[i].saturating_sub(timestamps[i - 1]) as f32 / 1000.0;
        if dt > 0.0 {
            let dx = xs[i] - xs[i - 1];
            let dy = ys[i] - ys[i - 1];
            out[i] = (dx * dx + dy * dy).sqrt() / dt;
        }
    }
    out
}

/// First difference of velocity over elapsed seconds, same Δt guard.
fn accelerations(velocities: &[f32], timestamps: &[u64], actual_length: usize) -> Vec<f32> {
    let mut out = vec![0.0; MAX_SEQ_LEN];
    for i in 1..actual_length.min(timestamps.len()) {
        let dt = timestamps[i].saturating_sub(timestamps[i - 1]) as f32 / 1000.0;
        if dt > 0.0 {
            out[i] = (velocities[i] - velocities[i - 1]) / dt;
        }
    }
    out
}
