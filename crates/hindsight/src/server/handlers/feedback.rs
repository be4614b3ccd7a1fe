//! Feedback memory endpoint handlers
//!
//! Encoding and disk writes block, so every memory call runs on the blocking
//! pool rather than the async executor.

use axum::{extract::State, http::StatusCode, response::Json as ResponseJson, Json};
use tracing::{error, info};
use uuid::Uuid;

use crate::server::types::{
  AddFeedbackResponse, ApiError, BaseResponse, LookupRequest, PromptRequest, PromptResponse,
  ReportResponse, SimilarResponse, SuggestionsResponse,
};
use crate::server::SharedMemory;
use crate::submission::FeedbackSubmission;

type HandlerError = (StatusCode, ResponseJson<BaseResponse<()>>);
type HandlerResult<T> = Result<ResponseJson<BaseResponse<T>>, HandlerError>;

fn failure(status: StatusCode, key: &str, message: &str, transaction_id: Uuid) -> HandlerError {
  let error = ApiError::new(key, message);
  (status, ResponseJson(BaseResponse::<()>::error(vec![error], transaction_id)))
}

async fn blocking<T, F>(transaction_id: Uuid, work: F) -> Result<T, HandlerError>
where
  T: Send + 'static,
  F: FnOnce() -> T + Send + 'static,
{
  tokio::task::spawn_blocking(work).await.map_err(|e| {
    error!("memory task failed: {e}");
    failure(StatusCode::INTERNAL_SERVER_ERROR, "memory_task_failed", &e.to_string(), transaction_id)
  })
}

fn require_question(question: &str, transaction_id: Uuid) -> Result<(), HandlerError> {
  if question.trim().is_empty() {
    return Err(failure(
      StatusCode::BAD_REQUEST,
      "missing_question",
      "question must not be empty",
      transaction_id,
    ));
  }
  Ok(())
}

/// POST /feedback - Validate and record feedback
pub async fn add_feedback(
  State(memory): State<SharedMemory>,
  Json(request): Json<FeedbackSubmission>,
) -> HandlerResult<AddFeedbackResponse> {
  let transaction_id = Uuid::new_v4();

  let feedback = request.validate().map_err(|e| {
    failure(StatusCode::BAD_REQUEST, "invalid_feedback", &e.to_string(), transaction_id)
  })?;

  let response = blocking(transaction_id, move || {
    let before = memory.len();
    memory.add_feedback(
      &feedback.question,
      &feedback.generated_code,
      feedback.was_helpful,
      feedback.improvement_suggestion.as_deref(),
      feedback.chart_type.as_deref(),
    );
    let total_records = memory.len();
    AddFeedbackResponse {
      recorded: total_records > before,
      learning_enabled: memory.is_enabled(),
      total_records,
    }
  })
  .await?;

  // Not recording is not a request failure: learning may simply be off.
  info!("feedback request {transaction_id}: recorded={}", response.recorded);
  Ok(ResponseJson(BaseResponse::success(response, transaction_id)))
}

/// POST /suggestions - Improvement suggestions for similar failed questions
pub async fn suggestions(
  State(memory): State<SharedMemory>,
  Json(request): Json<LookupRequest>,
) -> HandlerResult<SuggestionsResponse> {
  let transaction_id = Uuid::new_v4();
  require_question(&request.question, transaction_id)?;

  let suggestions = blocking(transaction_id, move || {
    let threshold = request.threshold.unwrap_or(memory.settings().suggestion_threshold);
    memory.improvement_suggestions_within(&request.question, threshold)
  })
  .await?;

  Ok(ResponseJson(BaseResponse::success(SuggestionsResponse { suggestions }, transaction_id)))
}

/// POST /similar - Successful answers to similar questions
pub async fn similar(
  State(memory): State<SharedMemory>,
  Json(request): Json<LookupRequest>,
) -> HandlerResult<SimilarResponse> {
  let transaction_id = Uuid::new_v4();
  require_question(&request.question, transaction_id)?;

  let queries = blocking(transaction_id, move || {
    let threshold = request.threshold.unwrap_or(memory.settings().similar_threshold);
    memory.similar_successful_queries_within(&request.question, threshold)
  })
  .await?;

  Ok(ResponseJson(BaseResponse::success(SimilarResponse { queries }, transaction_id)))
}

/// GET /report - Accuracy statistics
pub async fn report(State(memory): State<SharedMemory>) -> HandlerResult<ReportResponse> {
  let transaction_id = Uuid::new_v4();
  let report = blocking(transaction_id, move || memory.accuracy_report()).await?;

  Ok(ResponseJson(BaseResponse::success(ReportResponse { report }, transaction_id)))
}

/// POST /prompt - Extend a generation prompt with learned feedback
pub async fn prompt(
  State(memory): State<SharedMemory>,
  Json(request): Json<PromptRequest>,
) -> HandlerResult<PromptResponse> {
  let transaction_id = Uuid::new_v4();
  require_question(&request.question, transaction_id)?;

  let prompt =
    blocking(transaction_id, move || memory.enhance_prompt(&request.base_prompt, &request.question))
      .await?;

  Ok(ResponseJson(BaseResponse::success(PromptResponse { prompt }, transaction_id)))
}
