use crate::error::EncoderError;

use super::{normalize, Encoder};

const STOP_WORDS: &[&str] = &[
  "a", "an", "and", "are", "as", "at", "be", "by", "can", "did", "do", "does", "for", "from",
  "get", "give", "how", "i", "in", "is", "it", "list", "me", "my", "of", "on", "or", "our",
  "please", "show", "that", "the", "this", "to", "was", "we", "were", "what", "which", "with",
];

const BIGRAM_WEIGHT: f32 = 0.5;

/// Hashed bag-of-words encoder.
///
/// Needs no model files, so it is always available. Questions sharing
/// content words (and word pairs) land close together; paraphrases with no
/// shared vocabulary do not. Output is L2-normalized, so squared distances
/// fall in `[0, 4]`.
#[derive(Debug, Clone)]
pub struct LexicalEncoder {
  dimensions: usize,
}

impl LexicalEncoder {
  pub fn new(dimensions: usize) -> Self {
    Self { dimensions: dimensions.max(1) }
  }

  pub fn dimensions(&self) -> usize {
    self.dimensions
  }

  fn tokens(text: &str) -> Vec<String> {
    text
      .split(|c: char| !c.is_alphanumeric())
      .map(str::to_lowercase)
      .filter(|word| !word.is_empty() && !STOP_WORDS.contains(&word.as_str()))
      .map(stem)
      .collect()
  }

  fn accumulate(&self, vector: &mut [f32], feature: &str, weight: f32) {
    let hash = fnv1a(feature.as_bytes());
    let bucket = (hash % self.dimensions as u64) as usize;
    let sign = if hash >> 63 == 0 { 1.0 } else { -1.0 };
    vector[bucket] += sign * weight;
  }
}

impl Default for LexicalEncoder {
  fn default() -> Self {
    Self::new(384)
  }
}

impl Encoder for LexicalEncoder {
  fn name(&self) -> &'static str {
    "lexical"
  }

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    let tokens = Self::tokens(text);
    if tokens.is_empty() {
      return Err(EncoderError::EmptyInput);
    }

    let mut vector = vec![0.0f32; self.dimensions];
    for token in &tokens {
      self.accumulate(&mut vector, token, 1.0);
    }
    for pair in tokens.windows(2) {
      self.accumulate(&mut vector, &format!("{} {}", pair[0], pair[1]), BIGRAM_WEIGHT);
    }

    Ok(normalize(vector))
  }
}

/// Strip a plural "s" so "merchants" and "merchant" share a bucket.
fn stem(word: String) -> String {
  if word.len() > 3 && word.ends_with('s') && !word.ends_with("ss") {
    word[..word.len() - 1].to_string()
  } else {
    word
  }
}

fn fnv1a(bytes: &[u8]) -> u64 {
  let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
  for byte in bytes {
    hash ^= u64::from(*byte);
    hash = hash.wrapping_mul(0x0000_0100_0000_01b3);
  }
  hash
}
