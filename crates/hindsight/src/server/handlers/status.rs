//! Status and version endpoint handlers

use axum::{extract::State, response::Json};
use uuid::Uuid;

use crate::server::types::{BaseResponse, StatusResponse, VersionResponse};
use crate::server::SharedMemory;

/// GET /status - Health check with memory statistics
pub async fn status(State(memory): State<SharedMemory>) -> Json<BaseResponse<StatusResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = StatusResponse {
    status: "healthy".to_string(),
    version: env!("CARGO_PKG_VERSION").to_string(),
    memory: memory.stats(),
  };

  Json(BaseResponse::success(response, transaction_id))
}

/// GET /version - Returns current API version
pub async fn version() -> Json<BaseResponse<VersionResponse>> {
  let transaction_id = Uuid::new_v4();
  let response = VersionResponse { version: env!("CARGO_PKG_VERSION").to_string() };

  Json(BaseResponse::success(response, transaction_id))
}
