//! Scripted in-memory model for exercising the decoder without ONNX Runtime

use std::collections::HashMap;

use crate::error::{GlideError, Result};
use crate::model::{DecoderInputs, EncoderInputs, Logits, Memory, SwipeModel};
use crate::tokens::{CharTokenizer, EOS_IDX, SOS_IDX};
use crate::{DECODER_SEQ_LEN, MAX_SEQ_LEN};

const VOCAB: usize = 30;
const HIDDEN: usize = 8;
const PREFERRED_LOGIT: f32 = 5.0;

/// Deterministic [`SwipeModel`] whose decoder output depends only on the last
/// populated token of each row: scripted transitions get a high logit, every
/// other token gets zero.
pub(crate) struct ScriptedModel {
    transitions: HashMap<i64, Vec<(i64, f32)>>,
    fail_on_call: Option<usize>,
    decode_calls: usize,
    max_batch_seen: usize,
    encode_calls: usize,
}

impl ScriptedModel {
    /// Model that strongly prefers spelling `word` and then EOS.
    pub fn spelling(word: &str) -> Self {
        let tokenizer = CharTokenizer::new();
        let mut transitions: HashMap<i64, Vec<(i64, f32)>> = HashMap::new();
        let mut prev = SOS_IDX;
        for c in word.chars() {
            let token = tokenizer.char_to_token(c);
            transitions.entry(prev).or_default().push((token, PREFERRED_LOGIT));
            prev = token;
        }
        transitions.entry(prev).or_default().push((EOS_IDX, PREFERRED_LOGIT));

        Self {
            transitions,
            fail_on_call: None,
            decode_calls: 0,
            max_batch_seen: 0,
            encode_calls: 0,
        }
    }

    /// Model where the first `n` letters are equally likely after any prefix,
    /// keeping `n` beams alive indefinitely.
    pub fn branching(n: usize) -> Self {
        let letters: Vec<(i64, f32)> = (0..n as i64).map(|i| (4 + i, 2.0)).collect();
        let mut transitions: HashMap<i64, Vec<(i64, f32)>> = HashMap::new();
        transitions.insert(SOS_IDX, letters.clone());
        for i in 0..n as i64 {
            transitions.insert(4 + i, letters.clone());
        }

        Self {
            transitions,
            fail_on_call: None,
            decode_calls: 0,
            max_batch_seen: 0,
            encode_calls: 0,
        }
    }

    /// Fail the decode call with this zero-based index.
    pub fn failing_after(mut self, call: usize) -> Self {
        self.fail_on_call = Some(call);
        self
    }

    /// A zero memory tensor of the fixed test hidden size.
    pub fn memory(&self) -> Memory {
        Memory::new(vec![0.0; MAX_SEQ_LEN * HIDDEN], HIDDEN).expect("valid test shape")
    }

    /// Raw logits row following `last` (before log-softmax).
    pub fn logits_after(&self, last: i64) -> Vec<f32> {
        let mut row = vec![0.0; VOCAB];
        if let Some(next) = self.transitions.get(&last) {
            for &(token, logit) in next {
                row[token as usize] = logit;
            }
        }
        row
    }

    pub fn decode_calls(&self) -> usize {
        self.decode_calls
    }

    pub fn encode_calls(&self) -> usize {
        self.encode_calls
    }

    pub fn max_batch_seen(&self) -> usize {
        self.max_batch_seen
    }
}

impl SwipeModel for ScriptedModel {
    fn encode(&mut self, _inputs: &EncoderInputs) -> Result<Memory> {
        self.encode_calls += 1;
        Ok(self.memory())
    }

    fn decode(&mut self, inputs: &DecoderInputs) -> Result<Logits> {
        let call = self.decode_calls;
        self.decode_calls += 1;
        self.max_batch_seen = self.max_batch_seen.max(inputs.batch);

        if self.fail_on_call == Some(call) {
            return Err(GlideError::inference("scripted decode failure"));
        }

        let mut data = vec![0.0; inputs.batch * DECODER_SEQ_LEN * VOCAB];
        for row in 0..inputs.batch {
            let mask_row = &inputs.target_mask[row * DECODER_SEQ_LEN..(row + 1) * DECODER_SEQ_LEN];
            let populated = mask_row.iter().filter(|&&padded| !padded).count();
            if populated == 0 {
                continue;
            }
            let pos = populated - 1;
            let last = inputs.target_tokens[row * DECODER_SEQ_LEN + pos];
            let logits_row = self.logits_after(last);
            let start = (row * DECODER_SEQ_LEN + pos) * VOCAB;
            data[start..start + VOCAB].copy_from_slice(&logits_row);
        }

        Ok(Logits::new(data, DECODER_SEQ_LEN, VOCAB))
    }
}
