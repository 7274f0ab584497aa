//! Prediction engine: gesture in, ranked words out

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::beam::{Beam, BeamSearchDecoder, CancellationToken};
use crate::config::EngineConfig;
use crate::error::Result;
use crate::input::{Point, SwipeInput};
use crate::model::{EncoderInputs, OnnxSwipeModel, SwipeModel};
use crate::pool::TensorPool;
use crate::tensor::FeatureTensorBuilder;
use crate::tokens::CharTokenizer;
use crate::trajectory::TrajectoryProcessor;
use crate::vocab::{CandidateWord, PassthroughRescorer, VocabularyRescorer};

/// Ranked prediction list: parallel words and integer confidence scores
/// (probability × 1000), descending.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub words: Vec<String>,
    pub scores: Vec<i32>,
}

impl PredictionResult {
    pub fn empty() -> Self {
        Self {
            words: Vec::new(),
            scores: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }
}

/// Swipe prediction engine over an injected model handle.
///
/// A prediction owns the engine exclusively for its duration (`&mut self`);
/// hosts that predict from several tasks must serialize access or give each
/// task its own engine.
pub struct SwipeEngine<M: SwipeModel> {
    model: M,
    processor: TrajectoryProcessor,
    builder: FeatureTensorBuilder,
    pool: TensorPool,
    tokenizer: CharTokenizer,
    config: EngineConfig,
    rescorer: Box<dyn VocabularyRescorer>,
}

impl<M: SwipeModel> SwipeEngine<M> {
    pub fn new(model: M, config: EngineConfig) -> Self {
        let config = config.clamped();
        let processor = TrajectoryProcessor::new(config.keyboard_width, config.keyboard_height);
        info!(
            beam_width = config.beam_width,
            max_length = config.max_length,
            "swipe engine ready"
        );
        Self {
            model,
            processor,
            builder: FeatureTensorBuilder::new(),
            pool: TensorPool::new(),
            tokenizer: CharTokenizer::new(),
            config,
            rescorer: Box::new(PassthroughRescorer),
        }
    }

    /// Install a dictionary-backed rescorer.
    pub fn with_rescorer(mut self, rescorer: Box<dyn VocabularyRescorer>) -> Self {
        self.rescorer = rescorer;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config.clamped();
        self.processor
            .set_keyboard_dimensions(self.config.keyboard_width, self.config.keyboard_height);
    }

    pub fn set_keyboard_dimensions(&mut self, width: f32, height: f32) {
        self.config.keyboard_width = width;
        self.config.keyboard_height = height;
        self.processor.set_keyboard_dimensions(width, height);
    }

    /// Provide real key-center positions for nearest-key assignment.
    pub fn set_key_positions(&mut self, positions: Vec<(char, Point)>) {
        self.processor.set_key_positions(positions);
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    /// Buffers currently checked out of the tensor pool. Zero between
    /// predictions.
    pub fn pool_outstanding(&self) -> usize {
        self.pool.outstanding()
    }

    /// Predict ranked word candidates for one completed gesture.
    pub fn predict(&mut self, input: &SwipeInput) -> Result<PredictionResult> {
        self.predict_cancellable(input, &CancellationToken::new())
    }

    /// [`predict`](Self::predict) with cooperative cancellation: cancelling
    /// between beam-search steps stops further decoder calls and returns the
    /// hypotheses found so far.
    pub fn predict_cancellable(
        &mut self,
        input: &SwipeInput,
        cancel: &CancellationToken,
    ) -> Result<PredictionResult> {
        let features = self.processor.extract_features(input)?;
        let tensors = self.builder.build(&features);

        // First model contact; failure here is fatal, nothing to degrade to
        let memory = self.model.encode(&EncoderInputs {
            trajectory: &tensors.trajectory,
            nearest_keys: &tensors.nearest_keys,
            src_mask: &tensors.src_mask,
        })?;

        let decoder = BeamSearchDecoder::new(self.config.beam_width, self.config.max_length);
        let beams = decoder.decode(
            &mut self.model,
            &memory,
            &tensors.src_mask,
            &self.pool,
            cancel,
        )?;
        debug!(hypotheses = beams.len(), "beam search complete");

        let candidates = self.assemble_candidates(&beams);
        if candidates.is_empty() {
            return Ok(PredictionResult::empty());
        }

        let mut rescored = self.rescorer.filter(&candidates, &input.stats());
        rescored.sort_by(|a, b| b.score.total_cmp(&a.score));

        let words = rescored.iter().map(|p| p.word.clone()).collect();
        let scores = rescored
            .iter()
            .map(|p| (p.score * 1000.0) as i32)
            .collect();
        Ok(PredictionResult { words, scores })
    }

    /// Detokenize, threshold and dedup beam hypotheses, best first.
    fn assemble_candidates(&self, beams: &[Beam]) -> Vec<CandidateWord> {
        let mut best: HashMap<String, f32> = HashMap::new();
        for beam in beams {
            let word = self.tokenizer.tokens_to_word(&beam.tokens);
            if word.is_empty() {
                continue;
            }
            let confidence = beam.confidence();
            if confidence < self.config.confidence_threshold {
                continue;
            }
            let entry = best.entry(word).or_insert(confidence);
            if confidence > *entry {
                *entry = confidence;
            }
        }

        let mut candidates: Vec<CandidateWord> = best
            .into_iter()
            .map(|(word, confidence)| CandidateWord { word, confidence })
            .collect();
        candidates.sort_by(|a, b| {
            b.confidence
                .total_cmp(&a.confidence)
                .then_with(|| a.word.cmp(&b.word))
        });
        candidates
    }
}

impl SwipeEngine<OnnxSwipeModel> {
    /// Load the ONNX model pair from a directory and build an engine.
    pub fn from_model_dir<P: AsRef<std::path::Path>>(
        model_dir: P,
        config: EngineConfig,
    ) -> Result<Self> {
        let model = OnnxSwipeModel::from_directory(model_dir)?;
        Ok(Self::new(model, config))
    }
}

/// Engine over the ONNX-backed model.
pub type OnnxSwipeEngine = SwipeEngine<OnnxSwipeModel>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlideError;
    use crate::testutil::ScriptedModel;
    use crate::vocab::{FilteredPrediction, SwipeStats};

    fn hi_gesture() -> SwipeInput {
        // Straight horizontal swipe from 'h' to 'i' on a 1080x400 keyboard,
        // 5 evenly spaced points over 100ms
        let points = (0..5)
            .map(|i| Point::new(630.0 + i as f32 * 45.0, 150.0))
            .collect();
        let timestamps = (0..5).map(|i| i * 25).collect();
        SwipeInput::new(points, timestamps).unwrap()
    }

    fn engine_for(word: &str) -> SwipeEngine<ScriptedModel> {
        SwipeEngine::new(ScriptedModel::spelling(word), EngineConfig::default())
    }

    #[test]
    fn test_predict_ranks_scripted_word_first() {
        let mut engine = engine_for("hi");
        let result = engine.predict(&hi_gesture()).unwrap();

        assert!(!result.is_empty());
        assert_eq!(result.words[0], "hi");
        assert_eq!(result.words.len(), result.scores.len());
        assert!(result.scores[0] > 500);
        assert_eq!(engine.model().encode_calls(), 1);
    }

    #[test]
    fn test_scores_are_descending() {
        let mut engine = SwipeEngine::new(
            ScriptedModel::branching(4),
            EngineConfig::default().with_confidence_threshold(0.0),
        );
        let result = engine.predict(&hi_gesture()).unwrap();

        assert!(!result.is_empty());
        for pair in result.scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }

    #[test]
    fn test_single_point_gesture_rejected_before_model() {
        let mut engine = engine_for("hi");
        let input = SwipeInput::new(vec![Point::new(100.0, 100.0)], vec![0]).unwrap();
        let result = engine.predict(&input);

        assert!(matches!(result, Err(GlideError::InvalidInput(_))));
        assert_eq!(engine.model().encode_calls(), 0);
        assert_eq!(engine.model().decode_calls(), 0);
    }

    #[test]
    fn test_overlong_gesture_predicts_without_error() {
        let mut engine = engine_for("hi");
        let points = (0..300).map(|i| Point::new(i as f32 * 3.0, 150.0)).collect();
        let timestamps = (0..300).map(|i| i * 4).collect();
        let input = SwipeInput::new(points, timestamps).unwrap();

        let result = engine.predict(&input).unwrap();
        assert_eq!(result.words[0], "hi");
    }

    #[test]
    fn test_predict_is_deterministic() {
        let mut engine = SwipeEngine::new(
            ScriptedModel::branching(4),
            EngineConfig::default().with_confidence_threshold(0.0),
        );
        let input = hi_gesture();

        let first = engine.predict(&input).unwrap();
        let second = engine.predict(&input).unwrap();
        assert!(!first.is_empty());
        assert_eq!(first, second);
    }

    #[test]
    fn test_pool_balanced_after_success() {
        let mut engine = engine_for("hi");
        engine.predict(&hi_gesture()).unwrap();
        assert_eq!(engine.pool_outstanding(), 0);
    }

    #[test]
    fn test_pool_balanced_after_fatal_failure() {
        let mut engine = SwipeEngine::new(
            ScriptedModel::spelling("hi").failing_after(0),
            EngineConfig::default(),
        );
        let result = engine.predict(&hi_gesture());

        assert!(matches!(result, Err(GlideError::Inference(_))));
        assert_eq!(engine.pool_outstanding(), 0);
    }

    #[test]
    fn test_step_failure_degrades_to_partial_result() {
        let mut engine = SwipeEngine::new(
            ScriptedModel::spelling("hi").failing_after(1),
            EngineConfig::default(),
        );
        let result = engine.predict(&hi_gesture()).unwrap();

        // Only the first decoder step ran, so the best hypothesis is "h"
        assert_eq!(result.words, vec!["h".to_string()]);
        assert_eq!(engine.pool_outstanding(), 0);
    }

    #[test]
    fn test_cancelled_prediction_returns_empty_without_decoding() {
        let mut engine = engine_for("hi");
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = engine
            .predict_cancellable(&hi_gesture(), &cancel)
            .unwrap();
        assert!(result.is_empty());
        assert_eq!(engine.model().decode_calls(), 0);
        assert_eq!(engine.pool_outstanding(), 0);
    }

    #[test]
    fn test_candidate_dedup_keeps_best_confidence() {
        let engine = engine_for("hi");
        // 'h' 'i' with and without EOS decode to the same word
        let beams = vec![
            Beam {
                tokens: vec![2, 11, 12, 3],
                score: -0.2,
                finished: true,
            },
            Beam {
                tokens: vec![2, 11, 12],
                score: -0.9,
                finished: false,
            },
        ];

        let candidates = engine.assemble_candidates(&beams);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].word, "hi");
        assert!((candidates[0].confidence - (-0.2f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_confidence_threshold_filters_candidates() {
        let engine = SwipeEngine::new(
            ScriptedModel::spelling("hi"),
            EngineConfig::default().with_confidence_threshold(0.9),
        );
        let beams = vec![Beam {
            tokens: vec![2, 11, 3],
            score: -3.0, // confidence ~0.05
            finished: true,
        }];

        assert!(engine.assemble_candidates(&beams).is_empty());
    }

    #[test]
    fn test_rescorer_can_reorder_results() {
        struct Reverser;
        impl VocabularyRescorer for Reverser {
            fn filter(
                &self,
                candidates: &[CandidateWord],
                _stats: &SwipeStats,
            ) -> Vec<FilteredPrediction> {
                candidates
                    .iter()
                    .map(|c| FilteredPrediction {
                        word: c.word.clone(),
                        score: 1.0 - c.confidence,
                    })
                    .collect()
            }
        }

        let mut engine = SwipeEngine::new(
            ScriptedModel::branching(3),
            EngineConfig::default().with_confidence_threshold(0.0),
        )
        .with_rescorer(Box::new(Reverser));
        let result = engine.predict(&hi_gesture()).unwrap();

        assert!(!result.is_empty());
        for pair in result.scores.windows(2) {
            assert!(pair[0] >= pair[1]);
        }
    }
}
