//! Feedback records and their on-disk shape.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use super::categorize::{analyze_sql_complexity, categorize_improvement, categorize_query};

/// Whether the user found the generated answer useful
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
  Helpful,
  Unhelpful,
}

impl Outcome {
  pub fn from_helpful(was_helpful: bool) -> Self {
    if was_helpful {
      Outcome::Helpful
    } else {
      Outcome::Unhelpful
    }
  }

  pub fn is_helpful(self) -> bool {
    matches!(self, Outcome::Helpful)
  }
}

/// Structural complexity of generated SQL
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityTier {
  Simple,
  Medium,
  Complex,
}

/// What kind of analysis a question asks for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum QueryCategory {
  PieChartRequest,
  TrendAnalysis,
  RateAnalysis,
  ComparisonAnalysis,
  UserAnalysis,
  GeneralQuery,
}

/// What an improvement suggestion asks to change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ImprovementCategory {
  ChartTypePie,
  ChartTypeBar,
  ChartTypeLine,
  SqlImprovement,
  DataAggregation,
  GeneralImprovement,
}

macro_rules! string_enum {
  ($ty:ty { $($variant:ident => $name:literal),+ $(,)? }) => {
    impl $ty {
      pub fn as_str(self) -> &'static str {
        match self {
          $(Self::$variant => $name),+
        }
      }

      pub fn parse(value: &str) -> Option<Self> {
        match value {
          $($name => Some(Self::$variant),)+
          _ => None,
        }
      }
    }

    impl std::fmt::Display for $ty {
      fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
      }
    }
  };
}

string_enum!(ComplexityTier {
  Simple => "simple",
  Medium => "medium",
  Complex => "complex",
});

string_enum!(QueryCategory {
  PieChartRequest => "pie_chart_request",
  TrendAnalysis => "trend_analysis",
  RateAnalysis => "rate_analysis",
  ComparisonAnalysis => "comparison_analysis",
  UserAnalysis => "user_analysis",
  GeneralQuery => "general_query",
});

string_enum!(ImprovementCategory {
  ChartTypePie => "chart_type_pie",
  ChartTypeBar => "chart_type_bar",
  ChartTypeLine => "chart_type_line",
  SqlImprovement => "sql_improvement",
  DataAggregation => "data_aggregation",
  GeneralImprovement => "general_improvement",
});

/// One stored feedback event. Immutable once created.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackRecord {
  pub question: String,
  pub generated_code: String,
  pub outcome: Outcome,
  pub improvement_suggestion: Option<String>,
  pub category: QueryCategory,
  pub improvement_category: Option<ImprovementCategory>,
  pub complexity_tier: ComplexityTier,
  pub chart_type: Option<String>,
  pub timestamp: String,
}

impl FeedbackRecord {
  /// Build a record from a raw submission, deriving every classification.
  ///
  /// A suggestion is only kept for unhelpful feedback, and only when it is
  /// non-blank after trimming.
  pub fn new(
    question: &str,
    generated_code: &str,
    was_helpful: bool,
    improvement_suggestion: Option<&str>,
    chart_type: Option<&str>,
  ) -> Self {
    Self::at(question, generated_code, was_helpful, improvement_suggestion, chart_type, Utc::now())
  }

  pub fn at(
    question: &str,
    generated_code: &str,
    was_helpful: bool,
    improvement_suggestion: Option<&str>,
    chart_type: Option<&str>,
    created: DateTime<Utc>,
  ) -> Self {
    let outcome = Outcome::from_helpful(was_helpful);
    let suggestion = match outcome {
      Outcome::Unhelpful => improvement_suggestion
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string),
      Outcome::Helpful => None,
    };
    let improvement_category = suggestion.as_deref().map(categorize_improvement);

    Self {
      question: question.to_string(),
      generated_code: generated_code.to_string(),
      outcome,
      improvement_category,
      improvement_suggestion: suggestion,
      category: categorize_query(question),
      complexity_tier: analyze_sql_complexity(generated_code),
      chart_type: chart_type.map(str::to_string),
      timestamp: created.to_rfc3339_opts(SecondsFormat::Micros, true),
    }
  }

  /// Creation time, accepting both zoned and naive ISO-8601 stamps.
  ///
  /// Naive stamps are treated as UTC.
  pub fn created_at(&self) -> Option<DateTime<Utc>> {
    if let Ok(zoned) = DateTime::parse_from_rfc3339(&self.timestamp) {
      return Some(zoned.with_timezone(&Utc));
    }
    NaiveDateTime::parse_from_str(&self.timestamp, "%Y-%m-%dT%H:%M:%S%.f")
      .ok()
      .map(|naive| naive.and_utc())
  }
}

/// The JSON object written for each record in `query_memory.json`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistedRecord {
  pub question: String,
  #[serde(default)]
  pub sql: String,
  #[serde(default)]
  pub was_helpful: Option<bool>,
  #[serde(default)]
  pub feedback_type: Option<String>,
  #[serde(default)]
  pub timestamp: String,
  #[serde(default)]
  pub chart_type: Option<String>,
  #[serde(default)]
  pub query_category: Option<String>,
  #[serde(default)]
  pub sql_complexity: Option<String>,
  #[serde(default)]
  pub success_score: Option<f64>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub improvement_suggestion: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub improvement_category: Option<String>,
}

impl From<&FeedbackRecord> for PersistedRecord {
  fn from(record: &FeedbackRecord) -> Self {
    let helpful = record.outcome.is_helpful();
    let suggestion = record.improvement_suggestion.clone().filter(|_| !helpful);
    let improvement_category =
      suggestion.as_ref().and(record.improvement_category).map(|c| c.as_str().to_string());

    Self {
      question: record.question.clone(),
      sql: record.generated_code.clone(),
      was_helpful: Some(helpful),
      feedback_type: Some(if helpful { "positive" } else { "negative" }.to_string()),
      timestamp: record.timestamp.clone(),
      chart_type: record.chart_type.clone(),
      query_category: Some(record.category.as_str().to_string()),
      sql_complexity: Some(record.complexity_tier.as_str().to_string()),
      success_score: Some(if helpful { 1.0 } else { 0.0 }),
      improvement_suggestion: suggestion,
      improvement_category,
    }
  }
}

impl From<PersistedRecord> for FeedbackRecord {
  /// Older files may lack derived fields or carry values this version does
  /// not know; those are recomputed from the record's own text.
  fn from(stored: PersistedRecord) -> Self {
    let was_helpful = stored
      .was_helpful
      .or_else(|| stored.feedback_type.as_deref().map(|t| t != "negative"))
      .unwrap_or(true);
    let outcome = Outcome::from_helpful(was_helpful);

    let suggestion = stored
      .improvement_suggestion
      .filter(|s| !s.trim().is_empty() && !outcome.is_helpful());
    let improvement_category = suggestion.as_deref().map(|text| {
      stored
        .improvement_category
        .as_deref()
        .and_then(ImprovementCategory::parse)
        .unwrap_or_else(|| categorize_improvement(text))
    });

    let category = stored
      .query_category
      .as_deref()
      .and_then(QueryCategory::parse)
      .unwrap_or_else(|| categorize_query(&stored.question));
    let complexity_tier = stored
      .sql_complexity
      .as_deref()
      .and_then(ComplexityTier::parse)
      .unwrap_or_else(|| analyze_sql_complexity(&stored.sql));

    Self {
      question: stored.question,
      generated_code: stored.sql,
      outcome,
      improvement_suggestion: suggestion,
      category,
      improvement_category,
      complexity_tier,
      chart_type: stored.chart_type,
      timestamp: stored.timestamp,
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  #[test]
  fn test_unhelpful_record_keeps_trimmed_suggestion() {
    let record = FeedbackRecord::new(
      "Show payment success rate",
      "SELECT status, COUNT(*) FROM payments GROUP BY status",
      false,
      Some("  use a pie chart instead  "),
      None,
    );

    assert_eq!(record.outcome, Outcome::Unhelpful);
    assert_eq!(record.improvement_suggestion.as_deref(), Some("use a pie chart instead"));
    assert_eq!(record.improvement_category, Some(ImprovementCategory::ChartTypePie));
    assert_eq!(record.category, QueryCategory::RateAnalysis);
    assert_eq!(record.complexity_tier, ComplexityTier::Simple);
  }

  #[test]
  fn test_helpful_record_drops_suggestion() {
    let record = FeedbackRecord::new("Top merchants", "SELECT 1", true, Some("use a bar chart"), None);
    assert!(record.improvement_suggestion.is_none());
    assert!(record.improvement_category.is_none());
  }

  #[test]
  fn test_blank_suggestion_is_absent() {
    let record = FeedbackRecord::new("Top merchants", "SELECT 1", false, Some("   "), None);
    assert!(record.improvement_suggestion.is_none());
    assert!(record.improvement_category.is_none());
  }

  #[test]
  fn test_persisted_shape_for_negative_feedback() {
    let created = Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap();
    let record = FeedbackRecord::at(
      "Show payment success rate",
      "SELECT 1",
      false,
      Some("use a pie chart instead"),
      Some("pie"),
      created,
    );
    let json = serde_json::to_value(PersistedRecord::from(&record)).unwrap();

    assert_eq!(json["sql"], "SELECT 1");
    assert_eq!(json["was_helpful"], false);
    assert_eq!(json["feedback_type"], "negative");
    assert_eq!(json["success_score"], 0.0);
    assert_eq!(json["query_category"], "rate_analysis");
    assert_eq!(json["sql_complexity"], "simple");
    assert_eq!(json["chart_type"], "pie");
    assert_eq!(json["improvement_suggestion"], "use a pie chart instead");
    assert_eq!(json["improvement_category"], "chart_type_pie");
    assert_eq!(json["timestamp"], "2024-03-01T12:00:00.000000Z");
  }

  #[test]
  fn test_persisted_shape_for_positive_feedback_omits_improvements() {
    let record = FeedbackRecord::new("Top merchants", "SELECT 1", true, None, None);
    let json = serde_json::to_value(PersistedRecord::from(&record)).unwrap();

    assert_eq!(json["feedback_type"], "positive");
    assert_eq!(json["success_score"], 1.0);
    assert!(json["chart_type"].is_null());
    assert!(json.get("improvement_suggestion").is_none());
    assert!(json.get("improvement_category").is_none());
  }

  #[test]
  fn test_legacy_record_recomputes_missing_fields() {
    let stored: PersistedRecord = serde_json::from_str(
      r#"{
        "question": "Revenue trend over time",
        "sql": "SELECT a FROM x JOIN y ON x.id = y.id GROUP BY a",
        "was_helpful": false,
        "timestamp": "2024-01-02T03:04:05.123456",
        "improvement_suggestion": "try a line chart",
        "sql_complexity": "unknown"
      }"#,
    )
    .unwrap();
    let record = FeedbackRecord::from(stored);

    assert_eq!(record.category, QueryCategory::TrendAnalysis);
    assert_eq!(record.complexity_tier, ComplexityTier::Medium);
    assert_eq!(record.improvement_category, Some(ImprovementCategory::ChartTypeLine));
    assert!(record.created_at().is_some());
  }

  #[test]
  fn test_outcome_falls_back_to_feedback_type() {
    let stored: PersistedRecord = serde_json::from_str(
      r#"{"question": "q", "sql": "SELECT 1", "feedback_type": "negative", "timestamp": ""}"#,
    )
    .unwrap();
    assert_eq!(FeedbackRecord::from(stored).outcome, Outcome::Unhelpful);
  }

  #[test]
  fn test_category_names_round_trip() {
    for category in [
      QueryCategory::PieChartRequest,
      QueryCategory::TrendAnalysis,
      QueryCategory::RateAnalysis,
      QueryCategory::ComparisonAnalysis,
      QueryCategory::UserAnalysis,
      QueryCategory::GeneralQuery,
    ] {
      assert_eq!(QueryCategory::parse(category.as_str()), Some(category));
    }
    assert_eq!(ImprovementCategory::parse("general"), None);
  }
}
