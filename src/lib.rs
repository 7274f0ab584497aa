//! Glidetype — neural swipe-typing prediction
//!
//! Turns a raw swipe trajectory into ranked word candidates by driving a
//! transformer encoder/decoder pair through batched beam search.
//!
//! ## Pipeline
//!
//! - Trajectory processing: smoothing, normalization, velocity/acceleration,
//!   nearest-key assignment
//! - Fixed-shape feature tensors for the encoder
//! - Batched beam-search decoding with pooled tensor buffers
//! - Vocabulary rescoring through a narrow host-provided interface
//!
//! ## Quick Start
//!
//! ```no_run
//! use glidetype::{EngineConfig, OnnxSwipeEngine, Point, SwipeInput};
//!
//! let mut engine = OnnxSwipeEngine::from_model_dir(
//!     "/opt/glidetype/models/swipe-character",
//!     EngineConfig::default(),
//! )?;
//!
//! let input = SwipeInput::new(
//!     vec![Point::new(648.0, 150.0), Point::new(810.0, 50.0)],
//!     vec![0, 100],
//! )?;
//! let result = engine.predict(&input)?;
//! println!("Top prediction: {:?}", result.words.first());
//! # Ok::<(), glidetype::GlideError>(())
//! ```

pub mod beam;
pub mod config;
pub mod engine;
pub mod error;
pub mod input;
pub mod model;
pub mod pool;
pub mod tensor;
pub mod tokens;
pub mod trajectory;
pub mod vocab;

#[cfg(test)]
pub(crate) mod testutil;

pub use beam::{Beam, BeamSearchDecoder, CancellationToken};
pub use config::EngineConfig;
pub use engine::{OnnxSwipeEngine, PredictionResult, SwipeEngine};
pub use error::{GlideError, Result};
pub use input::{Point, SwipeInput};
pub use model::{OnnxSwipeModel, SwipeModel};
pub use pool::TensorPool;
pub use tokens::CharTokenizer;
pub use trajectory::{TrajectoryFeatures, TrajectoryProcessor};
pub use vocab::{CandidateWord, FilteredPrediction, SwipeStats, VocabularyRescorer};

/// Encoder input sequence length; must match the ONNX model export.
pub const MAX_SEQ_LEN: usize = 150;

/// Decoder input sequence length; must match the ONNX model export.
pub const DECODER_SEQ_LEN: usize = 20;

/// Per-step trajectory feature count: x, y, vx, vy, ax, ay.
pub const TRAJECTORY_FEATURES: usize = 6;
