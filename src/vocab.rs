//! Narrow interface to the host's vocabulary rescoring

use serde::{Deserialize, Serialize};

/// A raw beam-search candidate handed to the rescorer.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateWord {
    pub word: String,
    pub confidence: f32,
}

/// A rescored candidate returned by the rescorer.
#[derive(Debug, Clone, PartialEq)]
pub struct FilteredPrediction {
    pub word: String,
    pub score: f32,
}

/// Gesture summary statistics the rescorer may combine with dictionary
/// frequency (long fast swipes favor longer words, and so on).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SwipeStats {
    /// Total path length in pixels
    pub path_length: f32,
    /// Gesture duration in milliseconds
    pub duration_ms: f32,
    /// Start-to-end distance over path length, in [0, 1]
    pub straightness: f32,
}

/// Dictionary-based filtering and rescoring of raw candidates.
///
/// Vocabulary storage and frequency data live outside this crate; the engine
/// only consumes this interface. Implementations must not assume candidates
/// are real words.
pub trait VocabularyRescorer: Send {
    fn filter(&self, candidates: &[CandidateWord], stats: &SwipeStats) -> Vec<FilteredPrediction>;
}

/// Rescorer used when no dictionary is available: keeps every candidate with
/// its neural confidence as the score.
#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughRescorer;

impl VocabularyRescorer for PassthroughRescorer {
    fn filter(&self, candidates: &[CandidateWord], _stats: &SwipeStats) -> Vec<FilteredPrediction> {
        candidates
            .iter()
            .map(|c| FilteredPrediction {
                word: c.word.clone(),
                score: c.confidence,
            })
            .collect()
    }
}
