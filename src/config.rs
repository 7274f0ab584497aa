//! Engine configuration

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{GlideError, Result};

/// Beam width bounds accepted from configuration.
pub const BEAM_WIDTH_RANGE: (usize, usize) = (1, 32);
/// Maximum decoded word length bounds.
pub const MAX_LENGTH_RANGE: (usize, usize) = (10, 50);

/// Configuration for the swipe prediction engine.
///
/// Values outside the documented ranges are clamped, never rejected; a host
/// persisting user settings cannot put the engine into an invalid state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Number of candidate sequences kept alive at each decoding step
    pub beam_width: usize,

    /// Maximum number of beam search steps (upper bound on word length)
    pub max_length: usize,

    /// Candidates below this confidence are dropped from the final result
    pub confidence_threshold: f32,

    /// Keyboard width in pixels, used for coordinate normalization
    pub keyboard_width: f32,

    /// Keyboard height in pixels, used for coordinate normalization
    pub keyboard_height: f32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            beam_width: 8,
            max_length: 35,
            confidence_threshold: 0.1,
            keyboard_width: 1080.0,
            keyboard_height: 400.0,
        }
    }
}

impl EngineConfig {
    /// Return a copy with every field coerced into its documented range.
    pub fn clamped(mut self) -> Self {
        self.beam_width = self.beam_width.clamp(BEAM_WIDTH_RANGE.0, BEAM_WIDTH_RANGE.1);
        self.max_length = self.max_length.clamp(MAX_LENGTH_RANGE.0, MAX_LENGTH_RANGE.1);
        self.confidence_threshold = if self.confidence_threshold.is_finite() {
            self.confidence_threshold.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self.keyboard_width = self.keyboard_width.max(1.0);
        self.keyboard_height = self.keyboard_height.max(1.0);
        self
    }

    pub fn with_beam_width(mut self, beam_width: usize) -> Self {
        self.beam_width = beam_width;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = max_length;
        self
    }

    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    pub fn with_keyboard_dimensions(mut self, width: f32, height: f32) -> Self {
        self.keyboard_width = width;
        self.keyboard_height = height;
        self
    }

    /// Load configuration from a JSON file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| GlideError::config(format!("Failed to parse config: {}", e)))?;
        Ok(config.clamped())
    }
}
