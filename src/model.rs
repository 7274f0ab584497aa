//! Model boundary: encoder/decoder sessions behind a trait seam
//!
//! The neural model is an opaque pair of tensor functions with a fixed
//! input/output contract. The engine owns its model handle explicitly
//! (constructor-injected), never through a process-wide singleton, and the
//! [`SwipeModel`] trait keeps the beam search testable without ONNX Runtime.

use std::path::{Path, PathBuf};

use ndarray::Array2;
use ort::{
    session::{builder::GraphOptimizationLevel, Session},
    value::Tensor,
};
use tracing::{debug, info};

use crate::error::{GlideError, Result};
use crate::{DECODER_SEQ_LEN, MAX_SEQ_LEN, TRAJECTORY_FEATURES};

/// Input names the encoder session must expose.
pub const ENCODER_INPUT_NAMES: [&str; 3] = ["trajectory_features", "nearest_keys", "src_mask"];
/// Input names the decoder session must expose.
pub const DECODER_INPUT_NAMES: [&str; 4] = ["memory", "target_tokens", "target_mask", "src_mask"];

/// Flat encoder input buffers for a single gesture (batch size 1).
pub struct EncoderInputs<'a> {
    /// `[1, 150, 6]` f32
    pub trajectory: &'a [f32],
    /// `[1, 150]` i64
    pub nearest_keys: &'a [i64],
    /// `[1, 150]` bool, true where padded
    pub src_mask: &'a [bool],
}

/// Flat decoder input buffers for one batched beam-search step.
pub struct DecoderInputs<'a> {
    /// `[batch, 150, hidden]` f32
    pub memory: &'a [f32],
    /// `[batch, 20]` i64
    pub target_tokens: &'a [i64],
    /// `[batch, 20]` bool, true where the token slot is empty
    pub target_mask: &'a [bool],
    /// `[batch, 150]` bool
    pub src_mask: &'a [bool],
    pub batch: usize,
    pub hidden: usize,
}

/// Encoder output for a single gesture, shaped `[150, hidden]` (batch 1).
#[derive(Debug, Clone)]
pub struct Memory {
    data: Array2<f32>,
}

impl Memory {
    pub fn new(data: Vec<f32>, hidden: usize) -> Result<Self> {
        let data = Array2::from_shape_vec((MAX_SEQ_LEN, hidden), data)
            .map_err(|e| GlideError::inference(format!("Failed to shape memory tensor: {}", e)))?;
        Ok(Self { data })
    }

    /// Flat row-major view, `150 * hidden` elements.
    pub fn data(&self) -> &[f32] {
        self.data.as_slice().expect("memory is standard layout")
    }

    pub fn hidden(&self) -> usize {
        self.data.ncols()
    }
}

/// Decoder output for one batched step: `[batch, 20, vocab]`, stored flat.
#[derive(Debug, Clone)]
pub struct Logits {
    data: Vec<f32>,
    seq: usize,
    vocab: usize,
}

impl Logits {
    pub fn new(data: Vec<f32>, seq: usize, vocab: usize) -> Self {
        Self { data, seq, vocab }
    }

    pub fn vocab(&self) -> usize {
        self.vocab
    }

    /// Vocabulary logits for one batch row at one sequence position.
    pub fn at(&self, batch_idx: usize, pos: usize) -> &[f32] {
        let start = (batch_idx * self.seq + pos) * self.vocab;
        &self.data[start..start + self.vocab]
    }
}

/// The two tensor functions of the swipe model. Both are synchronous,
/// stateless and side-effect-free from the caller's perspective.
pub trait SwipeModel {
    /// Encode a gesture into its memory representation.
    fn encode(&mut self, inputs: &EncoderInputs) -> Result<Memory>;

    /// One batched decoder call over all active beams.
    fn decode(&mut self, inputs: &DecoderInputs) -> Result<Logits>;
}

/// Swipe model backed by two ONNX Runtime sessions.
pub struct OnnxSwipeModel {
    encoder: Session,
    decoder: Session,
    model_dir: PathBuf,
}

impl OnnxSwipeModel {
    /// Load encoder/decoder sessions from a model directory.
    ///
    /// Looks for `encoder.int8.onnx` / `encoder.onnx` (same for `decoder`)
    /// and validates both sessions against the expected input names; a
    /// missing input is fatal, never silently degraded.
    pub fn from_directory<P: AsRef<Path>>(model_dir: P) -> Result<Self> {
        let model_dir = model_dir.as_ref().to_path_buf();
        info!("Loading swipe model from {}", model_dir.display());

        let encoder_path = find_model_file(&model_dir, "encoder")?;
        let encoder = build_session(&encoder_path)?;
        validate_inputs(&encoder, "encoder", &ENCODER_INPUT_NAMES)?;
        info!("Encoder loaded: {}", encoder_path.display());

        let decoder_path = find_model_file(&model_dir, "decoder")?;
        let decoder = build_session(&decoder_path)?;
        validate_inputs(&decoder, "decoder", &DECODER_INPUT_NAMES)?;
        info!("Decoder loaded: {}", decoder_path.display());

        Ok(Self {
            encoder,
            decoder,
            model_dir,
        })
    }

    pub fn model_dir(&self) -> &Path {
        &self.model_dir
    }
}

impl SwipeModel for OnnxSwipeModel {
    fn encode(&mut self, inputs: &EncoderInputs) -> Result<Memory> {
        let trajectory = Tensor::from_array((
            vec![1usize, MAX_SEQ_LEN, TRAJECTORY_FEATURES],
            inputs.trajectory.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create trajectory tensor: {}", e)))?;

        let nearest_keys = Tensor::from_array((
            vec![1usize, MAX_SEQ_LEN],
            inputs.nearest_keys.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create nearest_keys tensor: {}", e)))?;

        let src_mask = Tensor::from_array((
            vec![1usize, MAX_SEQ_LEN],
            inputs.src_mask.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create src_mask tensor: {}", e)))?;

        let outputs = self
            .encoder
            .run(ort::inputs![
                "trajectory_features" => trajectory,
                "nearest_keys" => nearest_keys,
                "src_mask" => src_mask
            ])
            .map_err(|e| GlideError::inference(format!("Encoder inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GlideError::inference(format!("Failed to extract memory tensor: {}", e)))?;

        if shape.len() != 3 || shape[0] != 1 || shape[1] as usize != MAX_SEQ_LEN {
            return Err(GlideError::inference(format!(
                "Unexpected memory shape {:?}, expected [1, {}, H]",
                shape, MAX_SEQ_LEN
            )));
        }

        let hidden = shape[2] as usize;
        debug!(hidden, "encoder produced memory tensor");
        Memory::new(data.to_vec(), hidden)
    }

    fn decode(&mut self, inputs: &DecoderInputs) -> Result<Logits> {
        let batch = inputs.batch;

        let memory = Tensor::from_array((
            vec![batch, MAX_SEQ_LEN, inputs.hidden],
            inputs.memory.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create memory tensor: {}", e)))?;

        let target_tokens = Tensor::from_array((
            vec![batch, DECODER_SEQ_LEN],
            inputs.target_tokens.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| {
            GlideError::inference(format!("Failed to create target_tokens tensor: {}", e))
        })?;

        let target_mask = Tensor::from_array((
            vec![batch, DECODER_SEQ_LEN],
            inputs.target_mask.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create target_mask tensor: {}", e)))?;

        let src_mask = Tensor::from_array((
            vec![batch, MAX_SEQ_LEN],
            inputs.src_mask.to_vec().into_boxed_slice(),
        ))
        .map_err(|e| GlideError::inference(format!("Failed to create src_mask tensor: {}", e)))?;

        let outputs = self
            .decoder
            .run(ort::inputs![
                "memory" => memory,
                "target_tokens" => target_tokens,
                "target_mask" => target_mask,
                "src_mask" => src_mask
            ])
            .map_err(|e| GlideError::inference(format!("Decoder inference failed: {}", e)))?;

        let (shape, data) = outputs[0]
            .try_extract_tensor::<f32>()
            .map_err(|e| GlideError::inference(format!("Failed to extract logits tensor: {}", e)))?;

        if shape.len() != 3 || shape[0] as usize != batch || shape[1] as usize != DECODER_SEQ_LEN {
            return Err(GlideError::inference(format!(
                "Unexpected logits shape {:?}, expected [{}, {}, V]",
                shape, batch, DECODER_SEQ_LEN
            )));
        }

        Ok(Logits::new(
            data.to_vec(),
            DECODER_SEQ_LEN,
            shape[2] as usize,
        ))
    }
}

/// Prefer the INT8 quantized model file when both are present.
fn find_model_file(model_dir: &Path, name: &str) -> Result<PathBuf> {
    let int8_path = model_dir.join(format!("{}.int8.onnx", name));
    if int8_path.exists() {
        return Ok(int8_path);
    }
    let onnx_path = model_dir.join(format!("{}.onnx", name));
    if onnx_path.exists() {
        return Ok(onnx_path);
    }
    Err(GlideError::model_load(format!(
        "Could not find {}.onnx or {}.int8.onnx in {}",
        name,
        name,
        model_dir.display()
    )))
}

fn build_session(path: &Path) -> Result<Session> {
    Session::builder()
        .map_err(|e| GlideError::model_load(format!("Failed to create session builder: {}", e)))?
        .with_optimization_level(GraphOptimizationLevel::Level3)
        .map_err(|e| GlideError::model_load(format!("Failed to set optimization level: {}", e)))?
        .with_intra_threads(4)
        .map_err(|e| GlideError::model_load(format!("Failed to set intra threads: {}", e)))?
        .commit_from_file(path)
        .map_err(|e| {
            GlideError::model_load(format!("Failed to load {}: {}", path.display(), e))
        })
}

fn validate_inputs(session: &Session, which: &str, expected: &[&str]) -> Result<()> {
    let missing: Vec<&str> = expected
        .iter()
        .filter(|name| !session.inputs().iter().any(|i| i.name() == **name))
        .copied()
        .collect();

    if !missing.is_empty() {
        return Err(GlideError::schema(format!(
            "{} session is missing expected inputs: {:?}",
            which, missing
        )));
    }
    Ok(())
}
