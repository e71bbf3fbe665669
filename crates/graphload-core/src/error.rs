//! Error types for graphload

use std::fmt;

use thiserror::Error;

use crate::ErrorCode;

/// Lifecycle stage a hook command batch runs in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookStage {
    /// Runs once after sessions are acquired, before workers start
    PostStart,
    /// Runs once during shutdown, before sessions are released
    PreStop,
}

impl fmt::Display for HookStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookStage::PostStart => f.write_str("post-start"),
            HookStage::PreStop => f.write_str("pre-stop"),
        }
    }
}

/// Core error type for graphload operations
#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Connection error: {0}")]
    Connection(String),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    /// The server answered but rejected the statement
    #[error("{code}:{message}")]
    Execution { code: ErrorCode, message: String },

    /// A statement failed on a specific worker
    #[error("Client {worker} fail to execute: {statement}, Error: {source}")]
    Statement {
        worker: usize,
        statement: String,
        source: Box<ClientError>,
    },

    #[error("{stage} commands failed: {source}")]
    Hook {
        stage: HookStage,
        source: Box<ClientError>,
    },

    #[error("No available session")]
    NoActiveSession,

    #[error("Client pool already initialized")]
    AlreadyInitialized,

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Client pool is closed")]
    Closed,
}

impl ClientError {
    /// Build an execution error from a server error code and message.
    pub fn execution(code: ErrorCode, message: impl Into<String>) -> Self {
        ClientError::Execution {
            code,
            message: message.into(),
        }
    }

    /// The server error code carried by this error, looking through
    /// statement and hook context.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            ClientError::Execution { code, .. } => Some(*code),
            ClientError::Statement { source, .. } | ClientError::Hook { source, .. } => {
                source.code()
            }
            _ => None,
        }
    }

    /// The innermost error, with statement and hook context stripped.
    pub fn root_cause(&self) -> &ClientError {
        match self {
            ClientError::Statement { source, .. } | ClientError::Hook { source, .. } => {
                source.root_cause()
            }
            other => other,
        }
    }
}

/// Result type alias for graphload operations
pub type Result<T> = std::result::Result<T, ClientError>;
