//! REST API module for the feedback memory
//!
//! One endpoint per memory operation. Uses axum for routing and schemars for
//! response schemas.

use std::sync::Arc;

use crate::memory::FeedbackMemory;

pub mod handlers;
pub mod routing;
pub mod startup;
pub mod types;

/// The memory instance every handler shares
pub type SharedMemory = Arc<FeedbackMemory>;
