//! Folding retrieved feedback into a generation prompt.

use super::record::{ComplexityTier, FeedbackRecord};
use super::report::{keywords_in, AccuracyReport};
use super::retrieval::{ImprovementSuggestion, SimilarQuery};

const PROMPT_EXAMPLES: usize = 2;
const EXAMPLE_CODE_CHARS: usize = 100;

// A keyword is flagged once it has more than two queries below this accuracy.
const KEYWORD_MIN_QUERIES: usize = 3;
const KEYWORD_ACCURACY_FLOOR: f64 = 0.6;

const OVERALL_ACCURACY_TARGET: f64 = 0.8;
const RECENT_ACCURACY_TARGET: f64 = 0.7;

const SHORT_QUESTION_CHARS: usize = 20;
const SHORT_FAILURE_SHARE: f64 = 0.3;
const COMPLEX_FAILURE_SHARE: f64 = 0.4;

/// Guidance lines derived from accuracy statistics: a note for each keyword
/// in `question` that tends to fail, then general notes about overall and
/// recent accuracy and common failure shapes. Empty when nothing is stored.
pub fn learning_guidance(
  question: &str,
  records: &[FeedbackRecord],
  report: &AccuracyReport,
) -> Vec<String> {
  let mut guidance: Vec<String> = keywords_in(question)
    .into_iter()
    .filter(|keyword| {
      report.keyword_accuracy.get(*keyword).is_some_and(|bucket| {
        bucket.total_queries >= KEYWORD_MIN_QUERIES && bucket.accuracy < KEYWORD_ACCURACY_FLOOR
      })
    })
    .map(|keyword| format!("Note: '{keyword}' queries often need more specific context"))
    .collect();

  if records.is_empty() {
    return guidance;
  }

  if report.overall_accuracy < OVERALL_ACCURACY_TARGET {
    guidance.push("Consider providing more specific details in your query".to_string());
  }
  if report.recent_queries > 0 && report.recent_accuracy < RECENT_ACCURACY_TARGET {
    guidance.push("Recent queries show lower accuracy - try being more explicit".to_string());
  }

  let failed: Vec<&FeedbackRecord> = records.iter().filter(|r| !r.outcome.is_helpful()).collect();
  if !failed.is_empty() {
    let share = |count: usize| count as f64 / failed.len() as f64;

    let short = failed.iter().filter(|r| r.question.chars().count() < SHORT_QUESTION_CHARS).count();
    if share(short) > SHORT_FAILURE_SHARE {
      guidance.push(
        "Queries that are too short or vague often fail - try being more specific".to_string(),
      );
    }

    let complex = failed.iter().filter(|r| r.complexity_tier == ComplexityTier::Complex).count();
    if share(complex) > COMPLEX_FAILURE_SHARE {
      guidance.push("Complex queries may need to be broken down into simpler parts".to_string());
    }
  }

  guidance
}

/// Append learned guidance, up to two past suggestions and two past
/// successful examples, in that order.
pub fn enhance_prompt(
  base_prompt: &str,
  guidance: &[String],
  suggestions: &[ImprovementSuggestion],
  similar: &[SimilarQuery],
) -> String {
  let mut prompt = base_prompt.to_string();

  if !guidance.is_empty() {
    prompt.push_str("\n\nLEARNING-BASED GUIDANCE:\n");
    prompt.push_str(&guidance.join("\n"));
  }

  if !suggestions.is_empty() {
    prompt.push_str("\n\nRECENT IMPROVEMENTS:\n");
    let lines: Vec<&str> = suggestions
      .iter()
      .take(PROMPT_EXAMPLES)
      .map(|s| s.improvement_suggestion.as_str())
      .collect();
    prompt.push_str(&lines.join("\n"));
  }

  if !similar.is_empty() {
    prompt.push_str("\n\nSIMILAR SUCCESSFUL QUERIES:\n");
    for (i, example) in similar.iter().take(PROMPT_EXAMPLES).enumerate() {
      let code: String = example.code.chars().take(EXAMPLE_CODE_CHARS).collect();
      prompt.push_str(&format!("Example {}: '{}' → {}...\n", i + 1, example.question, code));
    }
  }

  prompt
}
