//! Swipe gesture input and derived path statistics

use serde::{Deserialize, Serialize};

use crate::error::{GlideError, Result};
use crate::vocab::SwipeStats;

/// A single touch sample in keyboard pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = other.x - self.x;
        let dy = other.y - self.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// One completed swipe gesture: touch samples with parallel timestamps.
///
/// Created once per gesture and never mutated; the engine does not retain it
/// after prediction completes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwipeInput {
    points: Vec<Point>,
    /// Milliseconds, monotonically non-decreasing
    timestamps: Vec<u64>,
    /// Keys the path passed over, when the host tracks them
    #[serde(default)]
    touched_keys: Vec<char>,
}

impl SwipeInput {
    /// Build a gesture from parallel point/timestamp sequences.
    ///
    /// Rejects mismatched lengths and empty gestures; a single-sample gesture
    /// is representable (it is rejected later, at prediction time).
    pub fn new(points: Vec<Point>, timestamps: Vec<u64>) -> Result<Self> {
        if points.len() != timestamps.len() {
            return Err(GlideError::invalid_input(format!(
                "points/timestamps length mismatch: {} vs {}",
                points.len(),
                timestamps.len()
            )));
        }
        if points.is_empty() {
            return Err(GlideError::invalid_input("gesture has no samples"));
        }
        Ok(Self {
            points,
            timestamps,
            touched_keys: Vec::new(),
        })
    }

    pub fn with_touched_keys(mut self, keys: Vec<char>) -> Self {
        self.touched_keys = keys;
        self
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn timestamps(&self) -> &[u64] {
        &self.timestamps
    }

    pub fn touched_keys(&self) -> &[char] {
        &self.touched_keys
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Total path length in pixels.
    pub fn path_length(&self) -> f32 {
        self.points
            .windows(2)
            .map(|w| w[0].distance_to(&w[1]))
            .sum()
    }

    /// Gesture duration in milliseconds.
    pub fn duration_ms(&self) -> u64 {
        match (self.timestamps.first(), self.timestamps.last()) {
            (Some(first), Some(last)) => last.saturating_sub(*first),
            _ => 0,
        }
    }

    /// Ratio of start-to-end distance over path length, in [0, 1].
    /// A perfectly straight swipe scores 1.0; degenerate paths score 1.0.
    pub fn straightness(&self) -> f32 {
        let total = self.path_length();
        if total <= f32::EPSILON {
            return 1.0;
        }
        let direct = self.points[0].distance_to(self.points.last().expect("non-empty"));
        (direct / total).clamp(0.0, 1.0)
    }

    /// Summary statistics handed to the vocabulary rescorer.
    pub fn stats(&self) -> SwipeStats {
        SwipeStats {
            path_length: self.path_length(),
            duration_ms: self.duration_ms() as f32,
            straightness: self.straightness(),
        }
    }
}
