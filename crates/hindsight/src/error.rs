//! Error types for the feedback memory.
//!
//! The public `FeedbackMemory` operations never surface these; they exist so the
//! lower layers (store, index, codec) can report precisely what went
//! wrong and be tested in isolation.

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by the store and its persistence layer
#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("I/O error on {path}: {source}")]
  Io {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("malformed records file: {0}")]
  Json(#[from] serde_json::Error),

  #[error("invalid vector file: {reason}")]
  InvalidVectorFile { reason: String },

  #[error("vector has {actual} dimensions, store expects {expected}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("vector contains non-finite values")]
  NonFiniteVector,

  #[error("index error: {0}")]
  Index(#[from] IndexError),
}

impl MemoryError {
  pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
    Self::Io { path: path.into(), source }
  }

  pub fn invalid_vectors(reason: impl Into<String>) -> Self {
    Self::InvalidVectorFile { reason: reason.into() }
  }
}

/// Errors raised by a `VectorIndex` implementation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum IndexError {
  #[error("index holds {expected}-dimensional vectors, got {actual}")]
  DimensionMismatch { expected: usize, actual: usize },

  #[error("refusing to index a vector with non-finite components")]
  NonFinite,

  #[error("cannot index zero-dimensional vectors")]
  ZeroDimension,
}

/// Errors raised by an `Encoder`
#[derive(Debug, Error)]
pub enum EncoderError {
  #[error("nothing to encode: input has no meaningful tokens")]
  EmptyInput,

  #[error("encoder is unavailable: {0}")]
  Unavailable(String),

  #[error("encoding failed: {0}")]
  Failed(String),
}

/// Rejections for user-submitted feedback
#[derive(Debug, Error, PartialEq)]
pub enum SubmissionError {
  #[error("{field} must not be empty")]
  MissingField { field: &'static str },

  #[error("improvement suggestion must be between {min} and {max} characters, got {actual}")]
  SuggestionLength { min: usize, max: usize, actual: usize },
}

/// Errors loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
  #[error("failed to read config {path}: {source}")]
  Read {
    path: PathBuf,
    #[source]
    source: std::io::Error,
  },

  #[error("failed to parse config {path}: {source}")]
  Parse {
    path: PathBuf,
    #[source]
    source: serde_json::Error,
  },
}

pub type Result<T> = std::result::Result<T, MemoryError>;
