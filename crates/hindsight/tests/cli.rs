use assert_cmd::prelude::*;

use predicates::prelude::*;
use predicates::str::contains;
use serial_test::serial;
use std::process::Command;

/// Helper to create a Command for the `hindsight` binary with a temporary data dir.
fn hindsight_cmd(data_dir: &assert_fs::TempDir) -> Command {
  let mut cmd = Command::cargo_bin("hindsight").expect("binary exists");
  cmd.env("HINDSIGHT_DATA_DIR", data_dir.path());
  cmd.env("NO_COLOR", "1");
  cmd.env_remove("RUST_LOG");
  cmd
}

#[test]
#[serial]
fn test_add_then_similar() {
  let temp = assert_fs::TempDir::new().unwrap();

  hindsight_cmd(&temp)
    .args([
      "add",
      "Top 10 merchants by revenue",
      "SELECT merchant, SUM(amount) FROM payments GROUP BY merchant LIMIT 10",
      "--helpful",
    ])
    .assert()
    .success()
    .stdout(contains("Recorded").and(contains("positive")));

  hindsight_cmd(&temp)
    .args(["similar", "Top 10 merchants by revenue"])
    .assert()
    .success()
    .stdout(contains("Similar successful queries").and(contains("1.00")));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_add_then_suggest() {
  let temp = assert_fs::TempDir::new().unwrap();

  hindsight_cmd(&temp)
    .args([
      "add",
      "Show payment success rate",
      "SELECT status, COUNT(*) FROM payments GROUP BY status",
      "--unhelpful",
      "--suggestion",
      "use a pie chart instead",
    ])
    .assert()
    .success()
    .stdout(contains("negative"));

  hindsight_cmd(&temp)
    .args(["suggest", "Show payment success rate"])
    .assert()
    .success()
    .stdout(contains("use a pie chart instead").and(contains("chart_type_pie")));

  hindsight_cmd(&temp)
    .args(["suggest", "Average basket size per customer"])
    .assert()
    .success()
    .stdout(contains("No improvement suggestions found."));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_empty_memory_lookups() {
  let temp = assert_fs::TempDir::new().unwrap();

  hindsight_cmd(&temp)
    .args(["suggest", "anything at all"])
    .assert()
    .success()
    .stdout(contains("No improvement suggestions found."));

  hindsight_cmd(&temp)
    .args(["similar", "anything at all"])
    .assert()
    .success()
    .stdout(contains("No similar successful queries found."));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_add_requires_verdict_and_valid_suggestion() {
  let temp = assert_fs::TempDir::new().unwrap();

  hindsight_cmd(&temp).args(["add", "question", "SELECT 1"]).assert().failure();

  hindsight_cmd(&temp)
    .args(["add", "question", "SELECT 1", "--helpful", "--unhelpful"])
    .assert()
    .failure();

  hindsight_cmd(&temp)
    .args(["add", "question", "SELECT 1", "--unhelpful", "--suggestion", "meh"])
    .assert()
    .failure()
    .stderr(contains("between 5 and 1000 characters"));

  hindsight_cmd(&temp)
    .args(["add", "  ", "SELECT 1", "--helpful"])
    .assert()
    .failure()
    .stderr(contains("question must not be empty"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_status_and_report() {
  let temp = assert_fs::TempDir::new().unwrap();

  for (question, flag) in [("monthly revenue", "--helpful"), ("total revenue", "--unhelpful")] {
    hindsight_cmd(&temp).args(["add", question, "SELECT 1", flag]).assert().success();
  }

  hindsight_cmd(&temp)
    .args(["status"])
    .assert()
    .success()
    .stdout(
      contains("Records: 2")
        .and(contains("Dimension: 384"))
        .and(contains("Learning: enabled (lexical encoder)")),
    );

  hindsight_cmd(&temp)
    .args(["report"])
    .assert()
    .success()
    .stdout(contains("50.0%").and(contains("revenue")));

  hindsight_cmd(&temp)
    .args(["report", "--json"])
    .assert()
    .success()
    .stdout(contains("\"total_queries\": 2"));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_disabled_config_records_nothing() {
  let temp = assert_fs::TempDir::new().unwrap();
  std::fs::write(temp.path().join("config.json"), r#"{"encoder": "disabled"}"#).unwrap();

  hindsight_cmd(&temp)
    .args(["add", "monthly revenue", "SELECT 1", "--helpful"])
    .assert()
    .success()
    .stdout(contains("Learning is disabled"));

  hindsight_cmd(&temp)
    .args(["status"])
    .assert()
    .success()
    .stdout(contains("disabled").and(contains("Records: 0")));

  temp.close().unwrap();
}

#[test]
#[serial]
fn test_prompt_includes_learned_feedback() {
  let temp = assert_fs::TempDir::new().unwrap();

  hindsight_cmd(&temp)
    .args([
      "add",
      "payment success rate",
      "SELECT 1",
      "--unhelpful",
      "-s",
      "group results by month",
    ])
    .assert()
    .success();

  hindsight_cmd(&temp)
    .args(["prompt", "payment success rate", "Write MySQL for the question."])
    .assert()
    .success()
    .stdout(contains("Write MySQL for the question.").and(contains("RECENT IMPROVEMENTS:")));

  temp.close().unwrap();
}
