use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

use hindsight::cli::commands;
use hindsight::submission::FeedbackSubmission;
use hindsight::{Config, FeedbackMemory};

#[derive(Parser)]
#[command(name = "hindsight")]
#[command(
  about = "Hindsight - Feedback-Driven Semantic Memory\nLearn from rated analytics answers and recall what worked for similar questions"
)]
#[command(version = concat!(env!("CARGO_PKG_VERSION"), ", courtesy of Kernelle Software"))]
struct Cli {
  /// Path to a JSON config file
  #[arg(long, global = true)]
  config: Option<PathBuf>,

  /// Enable verbose logging
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Command,
}

/// Whether the answer helped
#[derive(Args)]
#[group(required = true, multiple = false)]
struct Verdict {
  /// The generated answer was useful
  #[arg(long)]
  helpful: bool,
  /// The generated answer was not useful
  #[arg(long)]
  unhelpful: bool,
}

#[derive(Subcommand)]
enum Command {
  /// Record feedback on a generated answer
  Add {
    /// The natural-language question
    question: String,
    /// The SQL (or other code) generated for it
    code: String,
    #[command(flatten)]
    verdict: Verdict,
    /// What should have been done differently (unhelpful feedback only)
    #[arg(short, long)]
    suggestion: Option<String>,
    /// Chart type shown with the answer
    #[arg(long)]
    chart_type: Option<String>,
  },
  /// Show past improvement suggestions for similar questions
  Suggest {
    question: String,
    /// Maximum squared distance for a match
    #[arg(short, long)]
    threshold: Option<f32>,
  },
  /// Show past successful answers to similar questions
  Similar {
    question: String,
    /// Maximum squared distance for a match
    #[arg(short, long)]
    threshold: Option<f32>,
  },
  /// Show accuracy statistics
  Report {
    /// Print the raw report as JSON
    #[arg(long)]
    json: bool,
  },
  /// Print a generation prompt enriched with learned feedback
  Prompt {
    question: String,
    /// The prompt to extend
    base_prompt: String,
  },
  /// Show where the memory lives and how much it holds
  Status,
}

fn init_logging(verbose: bool) {
  let default = if verbose { "hindsight=debug,info" } else { "hindsight=warn,error" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
  tracing_subscriber::registry().with(fmt::layer().with_writer(std::io::stderr)).with(filter).init();
}

fn handle(memory: &FeedbackMemory, command: Command) -> Result<()> {
  match command {
    Command::Add { question, code, verdict, suggestion, chart_type } => {
      let submission = FeedbackSubmission {
        question,
        generated_code: code,
        was_helpful: verdict.helpful && !verdict.unhelpful,
        improvement_suggestion: suggestion,
        chart_type,
      };
      commands::add_feedback(memory, submission)
    }
    Command::Suggest { question, threshold } => commands::suggest(memory, &question, threshold),
    Command::Similar { question, threshold } => commands::similar(memory, &question, threshold),
    Command::Report { json } => commands::report(memory, json),
    Command::Prompt { question, base_prompt } => commands::prompt(memory, &question, &base_prompt),
    Command::Status => commands::status(memory),
  }
}

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();
  init_logging(cli.verbose);

  let config = Config::load(cli.config.as_deref())?;
  let memory = FeedbackMemory::from_config(&config).await;

  handle(&memory, cli.command)
}
