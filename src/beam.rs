//! Batched beam-search decoding over the swipe model
//!
//! All active beams are packed into a single decoder call per step; this is
//! what keeps decoding inside the latency budget compared with invoking the
//! model once per beam. Each step produces a fresh generation of beam
//! values; a beam referenced by a previous step is never mutated.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, warn};

use crate::error::{GlideError, Result};
use crate::model::{DecoderInputs, Memory, SwipeModel};
use crate::pool::TensorPool;
use crate::tokens::{EOS_IDX, SOS_IDX};
use crate::{DECODER_SEQ_LEN, MAX_SEQ_LEN};

/// Cooperative cancellation flag, checked at beam-search step boundaries.
/// Cancelling stops the loop before its next batched decoder call; the
/// hypotheses accumulated so far are still returned.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// One partial hypothesis: a token sequence starting with SOS, its
/// cumulative log-probability, and whether it has terminated.
///
/// Beams are copy-on-expand: extending a parent builds a new value.
#[derive(Debug, Clone, PartialEq)]
pub struct Beam {
    pub tokens: Vec<i64>,
    pub score: f32,
    pub finished: bool,
}

impl Beam {
    fn start() -> Self {
        Self {
            tokens: vec![SOS_IDX],
            score: 0.0,
            finished: false,
        }
    }

    fn extend(&self, token: i64, log_prob: f32) -> Self {
        let mut tokens = Vec::with_capacity(self.tokens.len() + 1);
        tokens.extend_from_slice(&self.tokens);
        tokens.push(token);
        Self {
            tokens,
            score: self.score + log_prob,
            finished: token == EOS_IDX,
        }
    }

    /// Linear confidence recovered from the accumulated log-probability.
    pub fn confidence(&self) -> f32 {
        self.score.exp()
    }
}

/// Result of one batched step: either the next beam generation, or a step
/// error the caller turns into early termination with partial results.
enum StepOutcome {
    Expanded {
        survivors: Vec<Beam>,
        newly_finished: Vec<Beam>,
    },
    Failed(GlideError),
}

/// Batched beam-search decoder.
pub struct BeamSearchDecoder {
    beam_width: usize,
    max_length: usize,
}

impl BeamSearchDecoder {
    pub fn new(beam_width: usize, max_length: usize) -> Self {
        Self {
            beam_width: beam_width.max(1),
            max_length: max_length.max(1),
        }
    }

    /// Run the search until every hypothesis terminates, `max_length` steps
    /// elapse, or the token is cancelled.
    ///
    /// A failing step ends the search early and the hypotheses accumulated
    /// so far are returned, except a failure at the very first step with
    /// nothing accumulated, which is fatal. Still-active beams at loop exit
    /// are kept as implicitly truncated hypotheses.
    pub fn decode<M: SwipeModel>(
        &self,
        model: &mut M,
        memory: &Memory,
        src_mask: &[bool],
        pool: &TensorPool,
        cancel: &CancellationToken,
    ) -> Result<Vec<Beam>> {
        let mut active = vec![Beam::start()];
        let mut finished: Vec<Beam> = Vec::new();

        for step in 0..self.max_length {
            if active.is_empty() {
                break;
            }
            if cancel.is_cancelled() {
                debug!(step, "beam search cancelled");
                break;
            }

            match self.step(model, memory, src_mask, pool, &active) {
                StepOutcome::Expanded {
                    survivors,
                    newly_finished,
                } => {
                    finished.extend(newly_finished);
                    active = survivors;
                }
                StepOutcome::Failed(err) => {
                    if step == 0 && finished.is_empty() {
                        return Err(err);
                    }
                    warn!(step, error = %err, "beam search step failed, keeping partial hypotheses");
                    break;
                }
            }
        }

        finished.extend(active);
        Ok(finished)
    }

    /// Expand every active beam through one batched decoder call.
    ///
    /// All four input tensors come from the pool and are returned before
    /// this function exits, on success and on error alike.
    fn step<M: SwipeModel>(
        &self,
        model: &mut M,
        memory: &Memory,
        src_mask: &[bool],
        pool: &TensorPool,
        active: &[Beam],
    ) -> StepOutcome {
        let batch = active.len();
        let hidden = memory.hidden();

        let mut tokens_buf = pool.acquire::<i64>(&[batch, DECODER_SEQ_LEN]);
        let mut target_mask_buf = pool.acquire::<bool>(&[batch, DECODER_SEQ_LEN]);
        let mut memory_buf = pool.acquire::<f32>(&[batch, MAX_SEQ_LEN, hidden]);
        let mut src_mask_buf = pool.acquire::<bool>(&[batch, MAX_SEQ_LEN]);

        for (row, beam) in active.iter().enumerate() {
            let len = beam.tokens.len().min(DECODER_SEQ_LEN);
            let tokens_row = &mut tokens_buf[row * DECODER_SEQ_LEN..(row + 1) * DECODER_SEQ_LEN];
            tokens_row[..len].copy_from_slice(&beam.tokens[..len]);

            // true marks an empty slot; populated positions stay false
            let mask_row = &mut target_mask_buf[row * DECODER_SEQ_LEN..(row + 1) * DECODER_SEQ_LEN];
            for slot in mask_row.iter_mut().skip(len) {
                *slot = true;
            }

            // Replicate the batch-1 encoder outputs row-wise
            let mem_row = &mut memory_buf[row * MAX_SEQ_LEN * hidden..(row + 1) * MAX_SEQ_LEN * hidden];
            mem_row.copy_from_slice(memory.data());
            let src_row = &mut src_mask_buf[row * MAX_SEQ_LEN..(row + 1) * MAX_SEQ_LEN];
            src_row.copy_from_slice(src_mask);
        }

        let logits = match model.decode(&DecoderInputs {
            memory: &memory_buf,
            target_tokens: &tokens_buf,
            target_mask: &target_mask_buf,
            src_mask: &src_mask_buf,
            batch,
            hidden,
        }) {
            Ok(logits) => logits,
            Err(err) => return StepOutcome::Failed(err),
        };

        let mut children: Vec<Beam> = Vec::with_capacity(batch * self.beam_width);
        for (row, beam) in active.iter().enumerate() {
            let pos = beam.tokens.len() - 1;
            let log_probs = log_softmax(logits.at(row, pos));
            for (token, log_prob) in top_k(&log_probs, self.beam_width) {
                children.push(beam.extend(token as i64, log_prob));
            }
        }

        // A child that filled the decoder window can no longer be presented
        // to the model; retire it as an implicitly truncated hypothesis.
        let mut newly_finished = Vec::new();
        let mut survivors = Vec::new();
        for child in children {
            if child.finished || child.tokens.len() >= DECODER_SEQ_LEN {
                newly_finished.push(child);
            } else {
                survivors.push(child);
            }
        }

        // Global pruning across all parents, not per-parent top-K
        survivors.sort_unstable_by(|a, b| b.score.total_cmp(&a.score));
        survivors.truncate(self.beam_width);

        StepOutcome::Expanded {
            survivors,
            newly_finished,
        }
    }
}

/// Numerically stable log-softmax: subtract the row max before
/// exponentiating so large logits cannot overflow.
pub fn log_softmax(logits: &[f32]) -> Vec<f32> {
    let max = logits.iter().copied().fold(f32::NEG_INFINITY, f32::max);
    let sum_exp: f32 = logits.iter().map(|&x| (x - max).exp()).sum();
    let log_sum_exp = max + sum_exp.ln();
    logits.iter().map(|&x| x - log_sum_exp).collect()
}

/// Indices and values of the k largest entries, in descending order.
fn top_k(values: &[f32], k: usize) -> Vec<(usize, f32)> {
    let mut indexed: Vec<(usize, f32)> = values.iter().copied().enumerate().collect();
    indexed.sort_unstable_by(|a, b| b.1.total_cmp(&a.1));
    indexed.truncate(k);
    indexed
}
