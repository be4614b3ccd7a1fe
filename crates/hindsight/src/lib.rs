//! Hindsight - Feedback-Driven Semantic Memory
//!
//! Remembers how users rated past natural-language analytics answers and,
//! for a new question, recalls what went wrong on similar questions and what
//! worked. Questions are matched by embedding distance, not exact text.

pub mod cli;
pub mod config;
pub mod encoder;
pub mod error;
pub mod memory;
pub mod server;
pub mod submission;

pub use config::Config;
pub use memory::retrieval::{ImprovementSuggestion, RetrievalSettings, SimilarQuery};
pub use memory::FeedbackMemory;
