//! Keyword heuristics used to label questions, suggestions and SQL.
//!
//! All matching is case-insensitive substring matching; the first rule that
//! matches wins.

use super::record::{ComplexityTier, ImprovementCategory, QueryCategory};

const QUERY_RULES: &[(QueryCategory, &[&str])] = &[
  (QueryCategory::PieChartRequest, &["pie", "distribution", "breakdown"]),
  (QueryCategory::TrendAnalysis, &["trend", "over time", "line"]),
  (QueryCategory::RateAnalysis, &["rate", "success", "percentage"]),
  (QueryCategory::ComparisonAnalysis, &["comparison", "compare", "vs"]),
  (QueryCategory::UserAnalysis, &["user", "merchant"]),
];

const IMPROVEMENT_RULES: &[(ImprovementCategory, &[&str])] = &[
  (ImprovementCategory::ChartTypePie, &["pie chart"]),
  (ImprovementCategory::ChartTypeBar, &["bar chart"]),
  (ImprovementCategory::ChartTypeLine, &["line chart"]),
  (ImprovementCategory::SqlImprovement, &["sql", "query"]),
  (ImprovementCategory::DataAggregation, &["rate", "percentage"]),
];

fn first_match<T: Copy>(text: &str, rules: &[(T, &[&str])]) -> Option<T> {
  let lowered = text.to_lowercase();
  rules
    .iter()
    .find(|(_, keywords)| keywords.iter().any(|k| lowered.contains(k)))
    .map(|(label, _)| *label)
}

pub fn categorize_query(text: &str) -> QueryCategory {
  first_match(text, QUERY_RULES).unwrap_or(QueryCategory::GeneralQuery)
}

pub fn categorize_improvement(text: &str) -> ImprovementCategory {
  first_match(text, IMPROVEMENT_RULES).unwrap_or(ImprovementCategory::GeneralImprovement)
}

/// Score SQL by the structural features that usually make generation go wrong.
///
/// join +2, union +2, group by +1, having +1, more than one select +2.
pub fn analyze_sql_complexity(code: &str) -> ComplexityTier {
  let lowered = code.to_lowercase();

  let mut score = 0;
  if lowered.contains("join") {
    score += 2;
  }
  if lowered.contains("union") {
    score += 2;
  }
  if lowered.contains("group by") {
    score += 1;
  }
  if lowered.contains("having") {
    score += 1;
  }
  if lowered.matches("select").count() > 1 {
    score += 2;
  }

  match score {
    s if s >= 4 => ComplexityTier::Complex,
    s if s >= 2 => ComplexityTier::Medium,
    _ => ComplexityTier::Simple,
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn test_query_categories() {
    assert_eq!(categorize_query("Payment status distribution"), QueryCategory::PieChartRequest);
    assert_eq!(categorize_query("Revenue over time"), QueryCategory::TrendAnalysis);
    assert_eq!(categorize_query("Show payment success rate"), QueryCategory::RateAnalysis);
    assert_eq!(categorize_query("Compare Q1 and Q2"), QueryCategory::ComparisonAnalysis);
    assert_eq!(categorize_query("Top 10 merchants by revenue"), QueryCategory::UserAnalysis);
    assert_eq!(categorize_query("How much did we earn?"), QueryCategory::GeneralQuery);
  }

  #[test]
  fn test_query_priority_order() {
    // "breakdown" outranks "rate"
    assert_eq!(categorize_query("success rate breakdown"), QueryCategory::PieChartRequest);
    // "trend" outranks "user"
    assert_eq!(categorize_query("USER growth TREND"), QueryCategory::TrendAnalysis);
  }

  #[test]
  fn test_query_matching_is_substring_based() {
    // "deadline" contains "line"
    assert_eq!(categorize_query("missed deadline count"), QueryCategory::TrendAnalysis);
  }

  #[test]
  fn test_improvement_categories() {
    assert_eq!(categorize_improvement("Use a Pie Chart instead"), ImprovementCategory::ChartTypePie);
    assert_eq!(categorize_improvement("bar chart please"), ImprovementCategory::ChartTypeBar);
    assert_eq!(categorize_improvement("a line chart fits"), ImprovementCategory::ChartTypeLine);
    assert_eq!(categorize_improvement("the SQL is wrong"), ImprovementCategory::SqlImprovement);
    assert_eq!(categorize_improvement("show it as a percentage"), ImprovementCategory::DataAggregation);
    assert_eq!(categorize_improvement("make it prettier"), ImprovementCategory::GeneralImprovement);
  }

  #[test]
  fn test_improvement_chart_beats_sql() {
    assert_eq!(
      categorize_improvement("query should use a bar chart"),
      ImprovementCategory::ChartTypeBar
    );
  }

  #[test]
  fn test_sql_complexity_tiers() {
    assert_eq!(analyze_sql_complexity("SELECT * FROM payments"), ComplexityTier::Simple);
    assert_eq!(
      analyze_sql_complexity("SELECT status, COUNT(*) FROM p GROUP BY status HAVING COUNT(*) > 1"),
      ComplexityTier::Medium
    );
    assert_eq!(
      analyze_sql_complexity("SELECT a FROM x JOIN y ON x.id = y.id GROUP BY a"),
      ComplexityTier::Medium
    );
    assert_eq!(
      analyze_sql_complexity("SELECT a FROM x JOIN y ON 1=1 WHERE a IN (SELECT b FROM z)"),
      ComplexityTier::Complex
    );
    assert_eq!(
      analyze_sql_complexity("select a from x union select a from y"),
      ComplexityTier::Complex
    );
  }

  #[test]
  fn test_sql_complexity_empty_code() {
    assert_eq!(analyze_sql_complexity(""), ComplexityTier::Simple);
  }
}
