//! Validation for feedback arriving from users.
//!
//! The memory itself accepts whatever it is given; the CLI and REST layers
//! run submissions through here first.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;

pub const MIN_SUGGESTION_CHARS: usize = 5;
pub const MAX_SUGGESTION_CHARS: usize = 1000;

const CHART_MENTIONS: &[(&str, &str)] = &[("pie chart", "pie"), ("bar chart", "bar"), ("line chart", "line")];

/// Raw feedback as a user sends it
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
pub struct FeedbackSubmission {
  pub question: String,
  #[serde(alias = "sql")]
  pub generated_code: String,
  pub was_helpful: bool,
  #[serde(default)]
  pub improvement_suggestion: Option<String>,
  #[serde(default)]
  pub chart_type: Option<String>,
}

/// A submission that passed validation, ready for `add_feedback`
#[derive(Debug, Clone, PartialEq)]
pub struct ValidFeedback {
  pub question: String,
  pub generated_code: String,
  pub was_helpful: bool,
  pub improvement_suggestion: Option<String>,
  pub chart_type: Option<String>,
}

impl FeedbackSubmission {
  pub fn validate(self) -> Result<ValidFeedback, SubmissionError> {
    let question = self.question.trim();
    if question.is_empty() {
      return Err(SubmissionError::MissingField { field: "question" });
    }
    if self.generated_code.trim().is_empty() {
      return Err(SubmissionError::MissingField { field: "generated_code" });
    }

    let suggestion = match self.improvement_suggestion.as_deref().map(str::trim) {
      Some(text) if !text.is_empty() && !self.was_helpful => {
        let length = text.chars().count();
        if !(MIN_SUGGESTION_CHARS..=MAX_SUGGESTION_CHARS).contains(&length) {
          return Err(SubmissionError::SuggestionLength {
            min: MIN_SUGGESTION_CHARS,
            max: MAX_SUGGESTION_CHARS,
            actual: length,
          });
        }
        Some(text.to_string())
      }
      _ => None,
    };

    let chart_type = self
      .chart_type
      .map(|c| c.trim().to_lowercase())
      .filter(|c| !c.is_empty())
      .or_else(|| suggestion.as_deref().and_then(detect_chart_type).map(str::to_string));

    Ok(ValidFeedback {
      question: question.to_string(),
      generated_code: self.generated_code,
      was_helpful: self.was_helpful,
      improvement_suggestion: suggestion,
      chart_type,
    })
  }
}

/// Chart type named in a suggestion, e.g. "use a pie chart" gives `pie`
pub fn detect_chart_type(suggestion: &str) -> Option<&'static str> {
  let lowered = suggestion.to_lowercase();
  CHART_MENTIONS.iter().find(|(mention, _)| lowered.contains(mention)).map(|(_, chart)| *chart)
}

#[cfg(test)]
mod tests {
  use super::*;

  fn submission(helpful: bool, suggestion: Option<&str>) -> FeedbackSubmission {
    FeedbackSubmission {
      question: "Show payment success rate".to_string(),
      generated_code: "SELECT 1".to_string(),
      was_helpful: helpful,
      improvement_suggestion: suggestion.map(str::to_string),
      chart_type: None,
    }
  }

  #[test]
  fn test_valid_negative_feedback_detects_chart() {
    let valid = submission(false, Some("  Use a Pie Chart instead ")).validate().unwrap();
    assert_eq!(valid.improvement_suggestion.as_deref(), Some("Use a Pie Chart instead"));
    assert_eq!(valid.chart_type.as_deref(), Some("pie"));
  }

  #[test]
  fn test_explicit_chart_type_wins() {
    let mut raw = submission(false, Some("use a pie chart"));
    raw.chart_type = Some("Bar".to_string());
    assert_eq!(raw.validate().unwrap().chart_type.as_deref(), Some("bar"));
  }

  #[test]
  fn test_missing_fields() {
    let mut raw = submission(true, None);
    raw.question = "   ".to_string();
    assert_eq!(raw.validate(), Err(SubmissionError::MissingField { field: "question" }));

    let mut raw = submission(true, None);
    raw.generated_code = String::new();
    assert_eq!(raw.validate(), Err(SubmissionError::MissingField { field: "generated_code" }));
  }

  #[test]
  fn test_suggestion_length_bounds() {
    assert!(matches!(
      submission(false, Some("meh")).validate(),
      Err(SubmissionError::SuggestionLength { actual: 3, .. })
    ));
    let long = "x".repeat(1001);
    assert!(submission(false, Some(&long)).validate().is_err());
    assert!(submission(false, Some(&"x".repeat(1000))).validate().is_ok());
  }

  #[test]
  fn test_blank_or_helpful_suggestion_is_dropped() {
    assert_eq!(submission(false, Some("   ")).validate().unwrap().improvement_suggestion, None);
    assert_eq!(submission(true, Some("use a bar chart")).validate().unwrap().improvement_suggestion, None);
  }

  #[test]
  fn test_detect_chart_type_order() {
    assert_eq!(detect_chart_type("bar chart or line chart"), Some("bar"));
    assert_eq!(detect_chart_type("a LINE CHART"), Some("line"));
    assert_eq!(detect_chart_type("a table"), None);
  }

  #[test]
  fn test_sql_alias() {
    let raw: FeedbackSubmission =
      serde_json::from_str(r#"{"question": "q", "sql": "SELECT 1", "was_helpful": true}"#).unwrap();
    assert_eq!(raw.generated_code, "SELECT 1");
  }
}
