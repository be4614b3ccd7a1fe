//! Accuracy statistics over the stored feedback.

use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use super::record::FeedbackRecord;

/// Words worth tracking accuracy for in analytics questions
pub const TRACKED_KEYWORDS: &[&str] = &[
  "revenue",
  "payment",
  "subscription",
  "user",
  "customer",
  "amount",
  "count",
  "sum",
  "average",
  "total",
  "monthly",
  "yearly",
  "trend",
  "growth",
  "top",
  "highest",
  "lowest",
  "percentage",
  "distribution",
  "breakdown",
  "compare",
];

const RECENT_DAYS: i64 = 7;
const TREND_WINDOW: usize = 20;
const TREND_MINIMUM: usize = 10;
const TOP_IMPROVEMENTS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct BucketAccuracy {
  pub total_queries: usize,
  pub successful_queries: usize,
  pub accuracy: f64,
}

impl BucketAccuracy {
  fn record(&mut self, helpful: bool) {
    self.total_queries += 1;
    if helpful {
      self.successful_queries += 1;
    }
    self.accuracy = ratio(self.successful_queries, self.total_queries);
  }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct AccuracyReport {
  pub total_queries: usize,
  pub successful_queries: usize,
  pub overall_accuracy: f64,
  /// Records from the last seven days
  pub recent_queries: usize,
  /// Accuracy over the last seven days, 0 when nothing is that recent
  pub recent_accuracy: f64,
  pub keyword_accuracy: BTreeMap<String, BucketAccuracy>,
  pub category_accuracy: BTreeMap<String, BucketAccuracy>,
  pub top_improvements: Vec<String>,
  /// Week start (Monday) to accuracy; `None` below ten records
  pub weekly_trends: Option<BTreeMap<NaiveDate, f64>>,
}

impl AccuracyReport {
  pub fn build(records: &[FeedbackRecord], now: DateTime<Utc>) -> Self {
    let successful = records.iter().filter(|r| r.outcome.is_helpful()).count();

    let cutoff = now - Duration::days(RECENT_DAYS);
    let recent: Vec<&FeedbackRecord> =
      records.iter().filter(|r| r.created_at().is_some_and(|t| t > cutoff)).collect();
    let recent_successful = recent.iter().filter(|r| r.outcome.is_helpful()).count();

    let mut keyword_accuracy: BTreeMap<String, BucketAccuracy> = BTreeMap::new();
    let mut category_accuracy: BTreeMap<String, BucketAccuracy> = BTreeMap::new();
    for record in records {
      let helpful = record.outcome.is_helpful();
      for keyword in keywords_in(&record.question) {
        keyword_accuracy.entry(keyword.to_string()).or_default().record(helpful);
      }
      category_accuracy.entry(record.category.as_str().to_string()).or_default().record(helpful);
    }

    Self {
      total_queries: records.len(),
      successful_queries: successful,
      overall_accuracy: ratio(successful, records.len()),
      recent_queries: recent.len(),
      recent_accuracy: ratio(recent_successful, recent.len()),
      keyword_accuracy,
      category_accuracy,
      top_improvements: top_improvements(records),
      weekly_trends: weekly_trends(records),
    }
  }
}

fn ratio(part: usize, whole: usize) -> f64 {
  if whole == 0 {
    0.0
  } else {
    part as f64 / whole as f64
  }
}

/// Tracked keywords appearing as whole words in `question`
pub fn keywords_in(question: &str) -> Vec<&'static str> {
  let lowered = question.to_lowercase();
  let words: Vec<&str> = lowered.split(|c: char| !c.is_alphanumeric()).collect();
  TRACKED_KEYWORDS.iter().copied().filter(|k| words.contains(k)).collect()
}

fn top_improvements(records: &[FeedbackRecord]) -> Vec<String> {
  let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
  for (position, suggestion) in
    records.iter().filter_map(|r| r.improvement_suggestion.as_deref()).enumerate()
  {
    counts.entry(suggestion).or_insert((0, position)).0 += 1;
  }

  let mut ranked: Vec<(&str, (usize, usize))> = counts.into_iter().collect();
  ranked.sort_by(|a, b| b.1 .0.cmp(&a.1 .0).then(a.1 .1.cmp(&b.1 .1)));
  ranked.into_iter().take(TOP_IMPROVEMENTS).map(|(s, _)| s.to_string()).collect()
}

fn weekly_trends(records: &[FeedbackRecord]) -> Option<BTreeMap<NaiveDate, f64>> {
  if records.len() < TREND_MINIMUM {
    return None;
  }

  let window = &records[records.len().saturating_sub(TREND_WINDOW)..];
  let mut weeks: BTreeMap<NaiveDate, BucketAccuracy> = BTreeMap::new();
  for record in window {
    let Some(created) = record.created_at() else {
      continue;
    };
    let day = created.date_naive();
    let week_start = day - Duration::days(i64::from(day.weekday().num_days_from_monday()));
    weeks.entry(week_start).or_default().record(record.outcome.is_helpful());
  }

  Some(weeks.into_iter().map(|(week, bucket)| (week, bucket.accuracy)).collect())
}

#[cfg(test)]
mod tests {
  use super::*;
  use chrono::TimeZone;

  fn at(question: &str, helpful: bool, suggestion: Option<&str>, when: DateTime<Utc>) -> FeedbackRecord {
    FeedbackRecord::at(question, "SELECT 1", helpful, suggestion, None, when)
  }

  fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 6, 14, 12, 0, 0).unwrap()
  }

  #[test]
  fn test_empty_report() {
    let report = AccuracyReport::build(&[], now());
    assert_eq!(report.total_queries, 0);
    assert_eq!(report.overall_accuracy, 0.0);
    assert_eq!(report.recent_accuracy, 0.0);
    assert!(report.top_improvements.is_empty());
    assert!(report.weekly_trends.is_none());
  }

  #[test]
  fn test_overall_and_recent_accuracy() {
    let old = now() - Duration::days(30);
    let fresh = now() - Duration::days(1);
    let records = vec![
      at("total revenue", true, None, old),
      at("total revenue", false, Some("use sum"), old),
      at("monthly revenue", true, None, fresh),
      at("monthly revenue", true, None, fresh),
    ];

    let report = AccuracyReport::build(&records, now());
    assert_eq!(report.successful_queries, 3);
    assert_eq!(report.overall_accuracy, 0.75);
    assert_eq!(report.recent_queries, 2);
    assert_eq!(report.recent_accuracy, 1.0);
  }

  #[test]
  fn test_keyword_accuracy_uses_whole_words() {
    let records = vec![
      at("Total revenue by user", true, None, now()),
      at("users signed up", false, None, now()),
    ];

    let report = AccuracyReport::build(&records, now());
    assert_eq!(report.keyword_accuracy["revenue"].total_queries, 1);
    assert_eq!(report.keyword_accuracy["user"].accuracy, 1.0);
    assert_eq!(report.keyword_accuracy["user"].total_queries, 1);
    assert!(!report.keyword_accuracy.contains_key("count"));
  }

  #[test]
  fn test_category_accuracy() {
    let records = vec![
      at("success rate", true, None, now()),
      at("success rate", false, None, now()),
    ];
    let report = AccuracyReport::build(&records, now());
    assert_eq!(report.category_accuracy["rate_analysis"].accuracy, 0.5);
  }

  #[test]
  fn test_top_improvements_by_frequency_then_first_seen() {
    let records = vec![
      at("q", false, Some("use a pie chart"), now()),
      at("q", false, Some("group by month"), now()),
      at("q", false, Some("group by month"), now()),
      at("q", false, Some("add a filter"), now()),
    ];
    let report = AccuracyReport::build(&records, now());
    assert_eq!(report.top_improvements, vec!["group by month", "use a pie chart", "add a filter"]);
  }

  #[test]
  fn test_weekly_trends_need_ten_records() {
    let records: Vec<FeedbackRecord> =
      (0..9).map(|i| at("q", true, None, now() - Duration::days(i))).collect();
    assert!(AccuracyReport::build(&records, now()).weekly_trends.is_none());
  }

  #[test]
  fn test_weekly_trends_group_by_monday() {
    // 2024-06-14 is a Friday; its week starts 2024-06-10.
    let this_week = now();
    let last_week = now() - Duration::days(7);
    let mut records: Vec<FeedbackRecord> = (0..6).map(|_| at("q", true, None, last_week)).collect();
    records.extend((0..4).map(|i| at("q", i % 2 == 0, None, this_week)));

    let trends = AccuracyReport::build(&records, now()).weekly_trends.unwrap();
    let monday = NaiveDate::from_ymd_opt(2024, 6, 10).unwrap();
    let previous = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
    assert_eq!(trends[&previous], 1.0);
    assert_eq!(trends[&monday], 0.5);
  }
}
