//! Classification of execution outcomes

use graphload_core::{ErrorCode, ExecutionResponse, Result};

/// Server error codes that are never worth retrying
pub const PERMANENT_ERROR_CODES: &[ErrorCode] =
    &[ErrorCode::E_SYNTAX_ERROR, ErrorCode::E_SEMANTIC_ERROR];

/// Error message fragment the storage layer reports when its write buffer is saturated
pub const BACKPRESSURE_SIGNATURE: &str = "raft buffer is full";

/// How an execution outcome should be handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// The statement executed successfully
    Success,
    /// Stop retrying, regardless of remaining budget
    Permanent,
    /// Server-side backpressure; retry without consuming the budget
    Backpressure,
    /// Retry while the bounded budget lasts
    Transient,
}

impl ErrorClass {
    pub fn is_retryable(self) -> bool {
        matches!(self, ErrorClass::Backpressure | ErrorClass::Transient)
    }
}

/// Classify the outcome of one execute call.
///
/// A transport error (no response) is always transient. A response is
/// checked for a permanent code first, then for the backpressure signature.
pub fn classify(outcome: &Result<ExecutionResponse>) -> ErrorClass {
    match outcome {
        Ok(response) => classify_response(response),
        Err(_) => ErrorClass::Transient,
    }
}

fn classify_response(response: &ExecutionResponse) -> ErrorClass {
    if response.is_succeeded() {
        ErrorClass::Success
    } else if PERMANENT_ERROR_CODES.contains(&response.error_code()) {
        ErrorClass::Permanent
    } else if response.error_msg().contains(BACKPRESSURE_SIGNATURE) {
        ErrorClass::Backpressure
    } else {
        ErrorClass::Transient
    }
}
