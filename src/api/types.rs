//! API request and response types

use crate::runtime::ErrorClass;
use serde::{Deserialize, Serialize};

/// Request to answer the pending question
#[derive(Debug, Deserialize)]
pub struct AnswerRequest {
    pub text: String,
}

/// Acknowledgement for an ended session
#[derive(Debug, Serialize)]
pub struct EndResponse {
    pub status: &'static str,
    pub session_id: String,
    pub report_available: bool,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub llm_configured: bool,
    pub provider: String,
    pub model: String,
}

/// Error response
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub class: ErrorClass,
}
