use anyhow::{anyhow, Result};
use colored::*;

use crate::cli::display::{percent, print_similar, print_suggestion};
use crate::memory::FeedbackMemory;
use crate::submission::FeedbackSubmission;

/// Validate and record one piece of feedback
pub fn add_feedback(memory: &FeedbackMemory, submission: FeedbackSubmission) -> Result<()> {
  let feedback = submission.validate()?;

  if !memory.is_enabled() {
    println!("{} Learning is disabled; feedback was not recorded", "!".yellow());
    return Ok(());
  }

  let before = memory.len();
  memory.add_feedback(
    &feedback.question,
    &feedback.generated_code,
    feedback.was_helpful,
    feedback.improvement_suggestion.as_deref(),
    feedback.chart_type.as_deref(),
  );

  if memory.len() == before {
    return Err(anyhow!("feedback could not be recorded (run with --verbose for details)"));
  }

  let kind = if feedback.was_helpful { "positive".green() } else { "negative".red() };
  println!("{} Recorded {} feedback", "✓".green(), kind);
  println!("  {} records in memory", memory.len().to_string().cyan());
  Ok(())
}

pub fn suggest(memory: &FeedbackMemory, question: &str, threshold: Option<f32>) -> Result<()> {
  let threshold = threshold.unwrap_or(memory.settings().suggestion_threshold);
  let suggestions = memory.improvement_suggestions_within(question, threshold);

  if suggestions.is_empty() {
    println!("No improvement suggestions found.");
    return Ok(());
  }

  println!("{}", "Improvement suggestions".cyan().bold());
  for (i, suggestion) in suggestions.iter().enumerate() {
    print_suggestion(i + 1, suggestion);
  }
  Ok(())
}

pub fn similar(memory: &FeedbackMemory, question: &str, threshold: Option<f32>) -> Result<()> {
  let threshold = threshold.unwrap_or(memory.settings().similar_threshold);
  let queries = memory.similar_successful_queries_within(question, threshold);

  if queries.is_empty() {
    println!("No similar successful queries found.");
    return Ok(());
  }

  println!("{}", "Similar successful queries".cyan().bold());
  for (i, query) in queries.iter().enumerate() {
    print_similar(i + 1, query);
  }
  Ok(())
}

pub fn report(memory: &FeedbackMemory, json: bool) -> Result<()> {
  let report = memory.accuracy_report();
  if json {
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  println!("{}", "Accuracy report".cyan().bold());
  println!(
    "  Overall: {} ({} of {} helpful)",
    percent(report.overall_accuracy).yellow(),
    report.successful_queries,
    report.total_queries
  );
  println!("  Last 7 days: {}", percent(report.recent_accuracy).yellow());

  if !report.category_accuracy.is_empty() {
    println!("\n{}", "By category".cyan());
    for (category, bucket) in &report.category_accuracy {
      println!("  {category}: {} ({} queries)", percent(bucket.accuracy), bucket.total_queries);
    }
  }

  if !report.keyword_accuracy.is_empty() {
    println!("\n{}", "By keyword".cyan());
    for (keyword, bucket) in &report.keyword_accuracy {
      println!("  {keyword}: {} ({} queries)", percent(bucket.accuracy), bucket.total_queries);
    }
  }

  if !report.top_improvements.is_empty() {
    println!("\n{}", "Most requested improvements".cyan());
    for suggestion in &report.top_improvements {
      println!("  - {suggestion}");
    }
  }

  match &report.weekly_trends {
    Some(weeks) => {
      println!("\n{}", "Weekly trend (last 20 records)".cyan());
      for (week, accuracy) in weeks {
        println!("  {week}: {}", percent(*accuracy));
      }
    }
    None => println!("\n{}", "Not enough feedback for trend analysis yet.".dimmed()),
  }

  Ok(())
}

pub fn prompt(memory: &FeedbackMemory, question: &str, base_prompt: &str) -> Result<()> {
  println!("{}", memory.enhance_prompt(base_prompt, question));
  Ok(())
}

pub fn status(memory: &FeedbackMemory) -> Result<()> {
  let stats = memory.stats();
  let learning = if stats.enabled { "enabled".green() } else { "disabled".yellow() };

  match &stats.encoder {
    Some(encoder) => println!("Learning: {learning} ({encoder} encoder)"),
    None => println!("Learning: {learning}"),
  }
  println!("Data directory: {}", stats.data_dir);
  println!("Records: {}", stats.records);
  if stats.indexed != stats.records {
    println!("Indexed: {} {}", stats.indexed, "(index behind store)".yellow());
  }
  match stats.dimension {
    Some(d) => println!("Dimension: {d}"),
    None => println!("Dimension: unset"),
  }
  Ok(())
}
