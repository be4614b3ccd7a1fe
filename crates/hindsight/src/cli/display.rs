//! Display formatting utilities for CLI output

use colored::*;

use crate::memory::retrieval::{ImprovementSuggestion, SimilarQuery};

/// Shorten `text` to `max` characters, marking the cut with an ellipsis
pub fn truncate(text: &str, max: usize) -> String {
  let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
  if flat.chars().count() <= max {
    return flat;
  }
  let kept: String = flat.chars().take(max.saturating_sub(3)).collect();
  format!("{kept}...")
}

pub fn percent(value: f64) -> String {
  format!("{:.1}%", value * 100.0)
}

pub fn similarity(value: f32) -> ColoredString {
  let text = format!("{value:.2}");
  if value >= 0.8 {
    text.green()
  } else if value >= 0.5 {
    text.yellow()
  } else {
    text.normal()
  }
}

pub fn print_suggestion(position: usize, suggestion: &ImprovementSuggestion) {
  println!(
    "{}. {} [{}] (similarity {})",
    position,
    suggestion.improvement_suggestion.bold(),
    suggestion.improvement_category.to_string().cyan(),
    similarity(suggestion.similarity)
  );
  println!("   from: {}", truncate(&suggestion.question, 80).dimmed());
  println!("   failed code: {}", truncate(&suggestion.failed_code, 80).dimmed());
}

pub fn print_similar(position: usize, query: &SimilarQuery) {
  println!(
    "{}. {} (similarity {})",
    position,
    query.question.bold(),
    similarity(query.similarity)
  );
  println!("   {}", truncate(&query.code, 100).dimmed());
}
