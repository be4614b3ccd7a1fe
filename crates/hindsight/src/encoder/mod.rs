//! Text encoders: turn a question into a fixed-length vector.
//!
//! Encoding is blocking. A neural backend can take tens of milliseconds per
//! call, so async callers should run it on a blocking thread.

use std::collections::HashMap;

use crate::error::EncoderError;

mod lexical;
#[cfg(feature = "neural")]
mod neural;

pub use lexical::LexicalEncoder;
#[cfg(feature = "neural")]
pub use neural::NeuralEncoder;

#[cfg_attr(test, mockall::automock)]
pub trait Encoder: Send + Sync {
  /// Short identifier shown in logs and status output
  fn name(&self) -> &'static str;

  /// Embed `text`. Every call on one encoder returns the same length.
  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError>;
}

/// Scale `vector` to unit length; zero vectors are returned unchanged.
pub fn normalize(mut vector: Vec<f32>) -> Vec<f32> {
  let magnitude: f32 = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
  if magnitude < f32::EPSILON {
    return vector;
  }
  for value in vector.iter_mut() {
    *value /= magnitude;
  }
  vector
}

/// Fixed lookup table of text to vector.
///
/// Useful for wiring the memory into tests or tools where the vectors are
/// already known.
#[derive(Debug, Clone, Default)]
pub struct StaticEncoder {
  vectors: HashMap<String, Vec<f32>>,
}

impl StaticEncoder {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn with(mut self, text: impl Into<String>, vector: Vec<f32>) -> Self {
    self.vectors.insert(text.into(), vector);
    self
  }
}

impl Encoder for StaticEncoder {
  fn name(&self) -> &'static str {
    "static"
  }

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    self
      .vectors
      .get(text)
      .cloned()
      .ok_or_else(|| EncoderError::Failed(format!("no vector registered for {text:?}")))
  }
}
