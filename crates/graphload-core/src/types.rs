//! Core types for graphload

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::ClientError;

/// Error code reported by the graph server for a statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    pub const SUCCEEDED: ErrorCode = ErrorCode(0);
    pub const E_DISCONNECTED: ErrorCode = ErrorCode(-1);
    pub const E_FAIL_TO_CONNECT: ErrorCode = ErrorCode(-2);
    pub const E_RPC_FAILURE: ErrorCode = ErrorCode(-3);
    pub const E_BAD_USERNAME_PASSWORD: ErrorCode = ErrorCode(-1001);
    pub const E_SESSION_INVALID: ErrorCode = ErrorCode(-1002);
    pub const E_SESSION_TIMEOUT: ErrorCode = ErrorCode(-1003);
    pub const E_SYNTAX_ERROR: ErrorCode = ErrorCode(-1004);
    pub const E_EXECUTION_ERROR: ErrorCode = ErrorCode(-1005);
    pub const E_STATEMENT_EMPTY: ErrorCode = ErrorCode(-1006);
    pub const E_BAD_PERMISSION: ErrorCode = ErrorCode(-1008);
    pub const E_SEMANTIC_ERROR: ErrorCode = ErrorCode(-1009);

    /// Check whether this code denotes success
    pub fn is_success(self) -> bool {
        self == Self::SUCCEEDED
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Server reply to a single executed statement
///
/// A response is returned whenever the server was reached, even if it
/// rejected the statement; transport failures surface as
/// [`ClientError::Transport`] instead.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ExecutionResponse {
    error_code: ErrorCode,
    error_msg: String,
    /// Server-side execution latency
    latency: Duration,
    rows: Vec<Vec<String>>,
}

impl Default for ErrorCode {
    fn default() -> Self {
        Self::SUCCEEDED
    }
}

impl ExecutionResponse {
    /// Create a successful response with the given server latency
    pub fn succeeded(latency: Duration) -> Self {
        Self {
            latency,
            ..Self::default()
        }
    }

    /// Create a failed response carrying the server's error code and message
    pub fn failed(error_code: ErrorCode, error_msg: impl Into<String>) -> Self {
        Self {
            error_code,
            error_msg: error_msg.into(),
            ..Self::default()
        }
    }

    /// Attach result rows
    pub fn with_rows(mut self, rows: Vec<Vec<String>>) -> Self {
        self.rows = rows;
        self
    }

    pub fn is_succeeded(&self) -> bool {
        self.error_code.is_success()
    }

    pub fn error_code(&self) -> ErrorCode {
        self.error_code
    }

    pub fn error_msg(&self) -> &str {
        &self.error_msg
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Convert a failed response into the matching [`ClientError::Execution`]
    pub fn into_error(self) -> ClientError {
        ClientError::Execution {
            code: self.error_code,
            message: self.error_msg,
        }
    }
}

/// One source record together with its encoded size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Data {
    /// Column values of the record
    pub record: Vec<String>,
    /// Size of the record in the source, in bytes
    pub bytes: usize,
}

impl Data {
    pub fn new(record: Vec<String>, bytes: usize) -> Self {
        Self { record, bytes }
    }
}

/// Total byte size of a batch of records
pub fn batch_bytes(data: &[Data]) -> u64 {
    data.iter().map(|d| d.bytes as u64).sum()
}

/// Kind of a stats report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatsKind {
    /// A batch was written successfully
    Success,
}

/// Per-batch metrics published on the shared stats channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stats {
    pub kind: StatsKind,
    /// Server-reported latency of the final successful attempt
    pub latency: Duration,
    /// Wall-clock time from dequeue to resolution, including retries
    pub req_time: Duration,
    /// Number of records in the batch
    pub batch_size: usize,
    /// Sum of the records' byte sizes
    pub imported_bytes: u64,
}

impl Stats {
    /// Create stats for a successfully written batch
    pub fn success(
        latency: Duration,
        req_time: Duration,
        batch_size: usize,
        imported_bytes: u64,
    ) -> Self {
        Self {
            kind: StatsKind::Success,
            latency,
            req_time,
            batch_size,
            imported_bytes,
        }
    }
}
