//! Similarity retrieval over the feedback store.
//!
//! Both operations follow the same pipeline: search the k nearest rows,
//! filter by outcome and raw distance, score, rank, then shape the output.
//! Thresholds are compared against squared distance, not similarity.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::Result;

use super::index::Neighbor;
use super::record::{ComplexityTier, FeedbackRecord, ImprovementCategory, Outcome, QueryCategory};
use super::store::FeedbackStore;

/// Tuning for the two retrieval paths
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalSettings {
  #[serde(default = "default_suggestion_threshold")]
  pub suggestion_threshold: f32,
  #[serde(default = "default_suggestion_neighbors")]
  pub suggestion_neighbors: usize,
  #[serde(default = "default_max_suggestions")]
  pub max_suggestions: usize,
  #[serde(default = "default_similar_threshold")]
  pub similar_threshold: f32,
  #[serde(default = "default_similar_neighbors")]
  pub similar_neighbors: usize,
  /// `None` returns every match that passes the filter
  #[serde(default)]
  pub max_similar: Option<usize>,
}

fn default_suggestion_threshold() -> f32 {
  0.85
}
fn default_suggestion_neighbors() -> usize {
  10
}
fn default_max_suggestions() -> usize {
  3
}
fn default_similar_threshold() -> f32 {
  0.8
}
fn default_similar_neighbors() -> usize {
  5
}

impl Default for RetrievalSettings {
  fn default() -> Self {
    Self {
      suggestion_threshold: default_suggestion_threshold(),
      suggestion_neighbors: default_suggestion_neighbors(),
      max_suggestions: default_max_suggestions(),
      similar_threshold: default_similar_threshold(),
      similar_neighbors: default_similar_neighbors(),
      max_similar: None,
    }
  }
}

/// A past improvement suggestion for a question like the current one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ImprovementSuggestion {
  pub similarity: f32,
  pub question: String,
  pub failed_code: String,
  pub improvement_suggestion: String,
  pub improvement_category: ImprovementCategory,
  pub chart_type: Option<String>,
  pub query_category: QueryCategory,
  pub sql_complexity: ComplexityTier,
  pub timestamp: String,
}

/// A past helpful answer to a question like the current one
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SimilarQuery {
  pub similarity: f32,
  pub question: String,
  pub code: String,
  pub query_category: QueryCategory,
  pub chart_type: Option<String>,
  pub sql_complexity: ComplexityTier,
}

/// Read-only view answering retrieval questions against one store
pub struct RetrievalService<'a> {
  store: &'a FeedbackStore,
  settings: &'a RetrievalSettings,
}

impl<'a> RetrievalService<'a> {
  pub fn new(store: &'a FeedbackStore, settings: &'a RetrievalSettings) -> Self {
    Self { store, settings }
  }

  /// Suggestions left on unhelpful answers to nearby questions.
  ///
  /// Ranked by similarity, pie-chart suggestions first on ties, deduplicated
  /// by case-folded text and category, capped at `max_suggestions`.
  pub fn improvement_suggestions(
    &self,
    query: &[f32],
    threshold: f32,
  ) -> Result<Vec<ImprovementSuggestion>> {
    if self.store.is_empty() {
      return Ok(Vec::new());
    }
    let hits = self.store.search(query, self.settings.suggestion_neighbors)?;
    Ok(rank_suggestions(hits, threshold, self.settings.max_suggestions))
  }

  /// Helpful answers to nearby questions, most similar first.
  pub fn similar_successful_queries(
    &self,
    query: &[f32],
    threshold: f32,
  ) -> Result<Vec<SimilarQuery>> {
    if self.store.is_empty() {
      return Ok(Vec::new());
    }
    let hits = self.store.search(query, self.settings.similar_neighbors)?;
    Ok(rank_similar(hits, threshold, self.settings.max_similar))
  }
}

fn rank_suggestions(
  hits: Vec<(Neighbor, &FeedbackRecord)>,
  threshold: f32,
  cap: usize,
) -> Vec<ImprovementSuggestion> {
  let mut candidates: Vec<ImprovementSuggestion> = hits
    .into_iter()
    .filter(|(n, r)| r.outcome == Outcome::Unhelpful && n.distance < threshold)
    .filter_map(|(n, r)| {
      let suggestion = r.improvement_suggestion.as_deref().filter(|s| !s.is_empty())?;
      Some(ImprovementSuggestion {
        similarity: n.similarity(),
        question: r.question.clone(),
        failed_code: r.generated_code.clone(),
        improvement_suggestion: suggestion.to_string(),
        improvement_category: r
          .improvement_category
          .unwrap_or(ImprovementCategory::GeneralImprovement),
        chart_type: r.chart_type.clone(),
        query_category: r.category,
        sql_complexity: r.complexity_tier,
        timestamp: r.timestamp.clone(),
      })
    })
    .collect();

  // Stable: equal keys keep nearest-first search order.
  candidates.sort_by(|a, b| {
    let pie = |s: &ImprovementSuggestion| s.improvement_category == ImprovementCategory::ChartTypePie;
    b.similarity.total_cmp(&a.similarity).then(pie(b).cmp(&pie(a)))
  });

  let mut seen = HashSet::new();
  candidates
    .into_iter()
    .filter(|s| seen.insert((s.improvement_suggestion.to_lowercase(), s.improvement_category)))
    .take(cap)
    .collect()
}

fn rank_similar(
  hits: Vec<(Neighbor, &FeedbackRecord)>,
  threshold: f32,
  cap: Option<usize>,
) -> Vec<SimilarQuery> {
  let mut matches: Vec<SimilarQuery> = hits
    .into_iter()
    .filter(|(n, r)| r.outcome == Outcome::Helpful && n.distance < threshold)
    .map(|(n, r)| SimilarQuery {
      similarity: n.similarity(),
      question: r.question.clone(),
      code: r.generated_code.clone(),
      query_category: r.category,
      chart_type: r.chart_type.clone(),
      sql_complexity: r.complexity_tier,
    })
    .collect();

  matches.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
  if let Some(cap) = cap {
    matches.truncate(cap);
  }
  matches
}
