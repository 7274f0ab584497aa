//! Character-level token vocabulary for the decoder

/// Padding token id
pub const PAD_IDX: i64 = 0;
/// Unknown token id
pub const UNK_IDX: i64 = 1;
/// Start-of-sequence token id
pub const SOS_IDX: i64 = 2;
/// End-of-sequence token id
pub const EOS_IDX: i64 = 3;

/// First letter token id: 'a' maps to 4, 'z' to 29.
const LETTER_BASE: i64 = 4;
const LETTER_COUNT: i64 = 26;

/// Maps between characters and the fixed character-level token ids the model
/// was trained with: four special tokens followed by 'a'..'z'.
#[derive(Debug, Clone, Default)]
pub struct CharTokenizer;

impl CharTokenizer {
    pub fn new() -> Self {
        Self
    }

    /// Vocabulary size (specials + letters).
    pub fn vocab_size(&self) -> usize {
        (LETTER_BASE + LETTER_COUNT) as usize
    }

    /// Token id for a character; anything outside 'a'..'z' maps to unknown.
    pub fn char_to_token(&self, c: char) -> i64 {
        let c = c.to_ascii_lowercase();
        if c.is_ascii_lowercase() {
            LETTER_BASE + (c as i64 - 'a' as i64)
        } else {
            UNK_IDX
        }
    }

    /// Character for a letter token id; special and out-of-range ids yield None.
    pub fn token_to_char(&self, token: i64) -> Option<char> {
        if (LETTER_BASE..LETTER_BASE + LETTER_COUNT).contains(&token) {
            Some((b'a' + (token - LETTER_BASE) as u8) as char)
        } else {
            None
        }
    }

    /// Decode a token sequence into a word, skipping special tokens.
    pub fn tokens_to_word(&self, tokens: &[i64]) -> String {
        tokens.iter().filter_map(|&t| self.token_to_char(t)).collect()
    }
}
