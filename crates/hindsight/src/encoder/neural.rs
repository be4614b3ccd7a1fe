use anyhow::{anyhow, Result};
use hf_hub::api::tokio::Api;
use ndarray::Array2;
use ort::{session::Session, value::Value};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::PathBuf;
use tokenizers::Tokenizer;
use tracing::{info, warn};

use crate::error::EncoderError;

use super::{normalize, Encoder};

const MODEL_NAME: &str = "sentence-transformers/all-MiniLM-L6-v2";
const TOKENIZER_FILE: &str = "tokenizer.json";
const MODEL_FILE: &str = "onnx/model.onnx";
const MAX_SEQUENCE_LENGTH: usize = 256;

/// Sentence-embedding model run through ONNX Runtime.
///
/// The session is behind a mutex because a run needs exclusive access.
pub struct NeuralEncoder {
  session: Mutex<Session>,
  tokenizer: Tokenizer,
}

struct ModelFiles {
  tokenizer_file: PathBuf,
  model_path: PathBuf,
}

#[cfg(not(tarpaulin_include))]
impl NeuralEncoder {
  /// Download (or reuse cached) model files and start a session
  pub async fn load() -> Result<Self> {
    info!("loading sentence embedding model {MODEL_NAME}");
    let files = Self::download_model().await?;

    let tokenizer = Tokenizer::from_file(files.tokenizer_file)
      .map_err(|e| anyhow!("Failed to load tokenizer: {e}"))?;
    let session = Session::builder()?.commit_from_file(files.model_path)?;

    Ok(Self { session: Mutex::new(session), tokenizer })
  }

  async fn download_model() -> Result<ModelFiles> {
    let api = Api::new().map_err(|e| anyhow!("HF API initialization failed: {e}"))?;
    let repo = api.model(MODEL_NAME.to_string());

    let tokenizer_file =
      repo.get(TOKENIZER_FILE).await.map_err(|e| anyhow!("Failed to download tokenizer: {e}"))?;
    let model_path =
      repo.get(MODEL_FILE).await.map_err(|e| anyhow!("Failed to download ONNX model: {e}"))?;

    Ok(ModelFiles { tokenizer_file, model_path })
  }

  fn run(&self, text: &str) -> Result<Vec<f32>> {
    let encoding =
      self.tokenizer.encode(text, true).map_err(|e| anyhow!("Tokenization failed: {e}"))?;

    let mut ids = encoding.get_ids().to_vec();
    let mut mask = encoding.get_attention_mask().to_vec();
    let mut type_ids = encoding.get_type_ids().to_vec();
    if ids.len() > MAX_SEQUENCE_LENGTH {
      warn!("truncating {} tokens to {MAX_SEQUENCE_LENGTH}", ids.len());
      ids.truncate(MAX_SEQUENCE_LENGTH);
      mask.truncate(MAX_SEQUENCE_LENGTH);
      type_ids.truncate(MAX_SEQUENCE_LENGTH);
    }

    let mut session = self.session.lock();
    let input_names: Vec<String> = session.inputs.iter().map(|i| i.name.to_string()).collect();

    let mut input: HashMap<String, Value> = HashMap::new();
    input.insert("input_ids".to_string(), to_tensor(&ids)?);
    input.insert("attention_mask".to_string(), to_tensor(&mask)?);
    if input_names.iter().any(|n| n == "token_type_ids") {
      input.insert("token_type_ids".to_string(), to_tensor(&type_ids)?);
    }

    let output = session.run(input)?;
    let tensor = output
      .get("last_hidden_state")
      .or_else(|| output.get("token_embeddings"))
      .ok_or_else(|| anyhow!("model produced no last_hidden_state output"))?;
    let (shape, data) = tensor.try_extract_tensor::<f32>()?;

    Ok(normalize(mean_pool(shape.as_ref(), data)?))
  }
}

impl Encoder for NeuralEncoder {
  fn name(&self) -> &'static str {
    "neural"
  }

  fn encode(&self, text: &str) -> Result<Vec<f32>, EncoderError> {
    if text.trim().is_empty() {
      return Err(EncoderError::EmptyInput);
    }
    self.run(text).map_err(|e| EncoderError::Failed(e.to_string()))
  }
}

fn to_tensor(values: &[u32]) -> Result<Value> {
  let row: Vec<i64> = values.iter().map(|&v| i64::from(v)).collect();
  let array = Array2::from_shape_vec((1, row.len()), row)?;
  Ok(Value::from_array(array)?.into())
}

/// Average token embeddings of shape `[1, seq, hidden]` into one vector
fn mean_pool(shape: &[i64], data: &[f32]) -> Result<Vec<f32>> {
  let [_, seq_length, hidden_size] = shape else {
    return Err(anyhow!("expected a rank-3 output, got shape {shape:?}"));
  };
  let (seq_length, hidden_size) = (*seq_length as usize, *hidden_size as usize);
  if seq_length == 0 || data.len() < seq_length * hidden_size {
    return Err(anyhow!("output tensor is smaller than its shape {shape:?}"));
  }

  let mut pooled = vec![0.0f32; hidden_size];
  for token in data.chunks_exact(hidden_size).take(seq_length) {
    for (sum, value) in pooled.iter_mut().zip(token) {
      *sum += value;
    }
  }
  for value in pooled.iter_mut() {
    *value /= seq_length as f32;
  }
  Ok(pooled)
}
