//! Feedback-driven semantic memory.
//!
//! `FeedbackMemory` is the one object callers hold. Build it once at process
//! start and share it (it is `Send + Sync`). None of its operations return
//! errors: failures are logged and degrade to "nothing learned".

pub mod categorize;
pub mod index;
pub mod matrix;
pub mod prompt;
pub mod record;
pub mod report;
pub mod retrieval;
pub mod store;

use chrono::Utc;
use parking_lot::RwLock;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::{debug, info, warn};

use crate::config::{Config, EncoderKind};
use crate::encoder::{Encoder, LexicalEncoder};

use record::FeedbackRecord;
use report::AccuracyReport;
use retrieval::{ImprovementSuggestion, RetrievalService, RetrievalSettings, SimilarQuery};
use store::FeedbackStore;

/// Snapshot of the memory's size and capability
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct MemoryStats {
  pub enabled: bool,
  /// Name of the active encoder, `None` when learning is disabled
  pub encoder: Option<String>,
  pub records: usize,
  pub indexed: usize,
  pub dimension: Option<usize>,
  pub data_dir: String,
}

pub struct FeedbackMemory {
  encoder: Option<Box<dyn Encoder>>,
  store: RwLock<FeedbackStore>,
  settings: RetrievalSettings,
}

impl FeedbackMemory {
  pub fn new(
    data_dir: impl Into<PathBuf>,
    encoder: Box<dyn Encoder>,
    settings: RetrievalSettings,
  ) -> Self {
    Self { encoder: Some(encoder), store: RwLock::new(FeedbackStore::open(data_dir)), settings }
  }

  /// Memory with no encoder. Stored feedback stays readable for reports,
  /// but nothing is learned and retrieval always comes back empty.
  pub fn disabled(data_dir: impl Into<PathBuf>, settings: RetrievalSettings) -> Self {
    info!("semantic learning disabled");
    Self { encoder: None, store: RwLock::new(FeedbackStore::open(data_dir)), settings }
  }

  /// Build the memory the configuration describes.
  ///
  /// An encoder that cannot be constructed leaves the memory disabled.
  pub async fn from_config(config: &Config) -> Self {
    let data_dir = config.data_dir.clone();
    let settings = config.retrieval.clone();
    if !config.enabled {
      return Self::disabled(data_dir, settings);
    }

    let encoder: Box<dyn Encoder> = match config.encoder {
      EncoderKind::Lexical => Box::new(LexicalEncoder::new(config.lexical_dimensions)),
      EncoderKind::Neural => match load_neural_encoder().await {
        Some(encoder) => encoder,
        None => return Self::disabled(data_dir, settings),
      },
      EncoderKind::Disabled => return Self::disabled(data_dir, settings),
    };
    info!("semantic learning enabled with the {} encoder", encoder.name());
    Self::new(data_dir, encoder, settings)
  }

  pub fn is_enabled(&self) -> bool {
    self.encoder.is_some()
  }

  pub fn encoder_name(&self) -> Option<&'static str> {
    self.encoder.as_ref().map(|encoder| encoder.name())
  }

  pub fn settings(&self) -> &RetrievalSettings {
    &self.settings
  }

  pub fn len(&self) -> usize {
    self.store.read().len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  pub fn stats(&self) -> MemoryStats {
    let store = self.store.read();
    MemoryStats {
      enabled: self.is_enabled(),
      encoder: self.encoder_name().map(str::to_string),
      records: store.len(),
      indexed: store.indexed(),
      dimension: store.dimension(),
      data_dir: store.data_dir().display().to_string(),
    }
  }

  /// Records in insertion order
  pub fn records(&self) -> Vec<FeedbackRecord> {
    self.store.read().records().to_vec()
  }

  fn encode(&self, text: &str) -> Option<Vec<f32>> {
    let encoder = self.encoder.as_ref()?;
    match encoder.encode(text) {
      Ok(vector) => Some(vector),
      Err(e) => {
        warn!("could not encode {text:?}: {e}");
        None
      }
    }
  }

  /// Record one feedback event. A no-op when learning is disabled.
  pub fn add_feedback(
    &self,
    question: &str,
    generated_code: &str,
    was_helpful: bool,
    improvement_suggestion: Option<&str>,
    chart_type: Option<&str>,
  ) {
    if !self.is_enabled() {
      debug!("learning disabled, feedback not recorded");
      return;
    }
    let Some(vector) = self.encode(question) else {
      return;
    };

    let record =
      FeedbackRecord::new(question, generated_code, was_helpful, improvement_suggestion, chart_type);
    let category = record.category;

    let mut store = self.store.write();
    match store.append(record, &vector) {
      Ok(()) => info!(
        "recorded {} feedback ({category}), {} records total",
        if was_helpful { "positive" } else { "negative" },
        store.len()
      ),
      Err(e) => warn!("feedback not recorded: {e}"),
    }
  }

  pub fn get_improvement_suggestions(&self, question: &str) -> Vec<ImprovementSuggestion> {
    self.improvement_suggestions_within(question, self.settings.suggestion_threshold)
  }

  /// At most `max_suggestions` suggestions within squared distance `threshold`
  pub fn improvement_suggestions_within(
    &self,
    question: &str,
    threshold: f32,
  ) -> Vec<ImprovementSuggestion> {
    if !self.is_enabled() {
      debug!("learning disabled, no suggestions");
      return Vec::new();
    }
    let Some(query) = self.encode(question) else {
      return Vec::new();
    };

    let store = self.store.read();
    match RetrievalService::new(&store, &self.settings).improvement_suggestions(&query, threshold) {
      Ok(found) => {
        debug!("{} improvement suggestions for {question:?}", found.len());
        found
      }
      Err(e) => {
        warn!("suggestion lookup failed: {e}");
        Vec::new()
      }
    }
  }

  pub fn get_similar_successful_queries(&self, question: &str) -> Vec<SimilarQuery> {
    self.similar_successful_queries_within(question, self.settings.similar_threshold)
  }

  pub fn similar_successful_queries_within(&self, question: &str, threshold: f32) -> Vec<SimilarQuery> {
    if !self.is_enabled() {
      debug!("learning disabled, no similar queries");
      return Vec::new();
    }
    let Some(query) = self.encode(question) else {
      return Vec::new();
    };

    let store = self.store.read();
    match RetrievalService::new(&store, &self.settings).similar_successful_queries(&query, threshold) {
      Ok(found) => {
        debug!("{} similar successful queries for {question:?}", found.len());
        found
      }
      Err(e) => {
        warn!("similar query lookup failed: {e}");
        Vec::new()
      }
    }
  }

  pub fn accuracy_report(&self) -> AccuracyReport {
    AccuracyReport::build(self.store.read().records(), Utc::now())
  }

  /// `base_prompt` plus whatever the memory knows about questions like this one
  pub fn enhance_prompt(&self, base_prompt: &str, question: &str) -> String {
    if !self.is_enabled() {
      return base_prompt.to_string();
    }

    let guidance = {
      let store = self.store.read();
      let report = AccuracyReport::build(store.records(), Utc::now());
      prompt::learning_guidance(question, store.records(), &report)
    };
    let suggestions = self.get_improvement_suggestions(question);
    let similar = self.get_similar_successful_queries(question);
    prompt::enhance_prompt(base_prompt, &guidance, &suggestions, &similar)
  }
}

#[cfg(feature = "neural")]
async fn load_neural_encoder() -> Option<Box<dyn Encoder>> {
  match crate::encoder::NeuralEncoder::load().await {
    Ok(encoder) => Some(Box::new(encoder)),
    Err(e) => {
      warn!("neural encoder unavailable: {e}");
      None
    }
  }
}

#[cfg(not(feature = "neural"))]
async fn load_neural_encoder() -> Option<Box<dyn Encoder>> {
  warn!("neural encoder requested but this build lacks the `neural` feature");
  None
}
