//! REST API types with schemars annotations for OpenAPI generation

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::memory::report::AccuracyReport;
use crate::memory::retrieval::{ImprovementSuggestion, SimilarQuery};
use crate::memory::MemoryStats;

// Base Response Structure
// ======================

/// Base response object for all API endpoints
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct BaseResponse<T> {
  /// API versioning information
  pub versioning: VersionInfo,

  /// Transaction ID for logging correlation
  pub transaction_id: Uuid,

  /// Optional error information
  #[serde(skip_serializing_if = "Vec::is_empty", default)]
  pub errors: Vec<ApiError>,

  /// Response data (generic for different endpoint types)
  #[serde(flatten)]
  pub data: T,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionInfo {
  pub latest: String,
  pub requested: String,
  pub resolved: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ApiError {
  /// Error key, unique to the error source
  pub key: String,

  /// Human readable error message
  pub message: String,

  /// Additional error context
  #[serde(default)]
  pub context: serde_json::Value,
}

impl<T> BaseResponse<T> {
  pub fn success(data: T, transaction_id: Uuid) -> Self {
    Self { versioning: VersionInfo::current(), transaction_id, errors: Vec::new(), data }
  }

  pub fn error(errors: Vec<ApiError>, transaction_id: Uuid) -> BaseResponse<()> {
    BaseResponse { versioning: VersionInfo::current(), transaction_id, errors, data: () }
  }
}

impl VersionInfo {
  fn current() -> Self {
    let version = env!("CARGO_PKG_VERSION");
    Self {
      latest: version.to_string(),
      requested: version.to_string(),
      resolved: version.to_string(),
    }
  }
}

impl ApiError {
  pub fn new(key: &str, message: &str) -> Self {
    Self { key: key.to_string(), message: message.to_string(), context: serde_json::Value::Null }
  }
}

// Status Endpoints
// ================

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct StatusResponse {
  pub status: String,
  pub version: String,
  pub memory: MemoryStats,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct VersionResponse {
  pub version: String,
}

// Feedback Endpoints
// ==================

/// Response for POST /feedback
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct AddFeedbackResponse {
  /// False when learning is disabled or the question could not be encoded
  pub recorded: bool,
  pub learning_enabled: bool,
  pub total_records: usize,
}

/// Request for POST /suggestions and POST /similar
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct LookupRequest {
  pub question: String,
  /// Maximum squared distance; the configured default when omitted
  #[serde(default)]
  pub threshold: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SuggestionsResponse {
  pub suggestions: Vec<ImprovementSuggestion>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct SimilarResponse {
  pub queries: Vec<SimilarQuery>,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct ReportResponse {
  pub report: AccuracyReport,
}

/// Request for POST /prompt
#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PromptRequest {
  pub question: String,
  pub base_prompt: String,
}

#[derive(Debug, Serialize, Deserialize, JsonSchema)]
pub struct PromptResponse {
  pub prompt: String,
}
