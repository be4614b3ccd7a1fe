//! Axum router configuration for all endpoints

use axum::{
  routing::{get, post},
  Router,
};

use crate::server::handlers::{feedback, status};
use crate::server::SharedMemory;

/// Create the main application router around a shared memory
pub fn create_router(memory: SharedMemory) -> Router {
  Router::new()
    // Status and version endpoints
    .route("/status", get(status::status))
    .route("/version", get(status::version))
    // Memory endpoints
    .route("/feedback", post(feedback::add_feedback))
    .route("/suggestions", post(feedback::suggestions))
    .route("/similar", post(feedback::similar))
    .route("/report", get(feedback::report))
    .route("/prompt", post(feedback::prompt))
    .with_state(memory)
}
