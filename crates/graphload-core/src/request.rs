//! Messages carried by the per-worker request queues

use tokio::sync::mpsc;

use crate::{ClientError, Data};

/// Caller-owned channel that receives failure reports and drain acknowledgements
pub type ErrorSender = mpsc::Sender<ErrData>;

/// A request routed to one worker's queue
#[derive(Debug)]
pub enum ClientRequest {
    /// A write statement to execute
    Batch(BatchRequest),
    /// No more input for this worker; acknowledged on `err_tx` before the worker stops
    EndOfInput { err_tx: ErrorSender },
}

impl ClientRequest {
    /// Create a batch request
    pub fn batch(statement: impl Into<String>, data: Vec<Data>, err_tx: ErrorSender) -> Self {
        ClientRequest::Batch(BatchRequest {
            statement: statement.into(),
            data,
            err_tx,
        })
    }

    /// Create the end-of-input sentinel
    pub fn end_of_input(err_tx: ErrorSender) -> Self {
        ClientRequest::EndOfInput { err_tx }
    }

    pub fn is_end_of_input(&self) -> bool {
        matches!(self, ClientRequest::EndOfInput { .. })
    }
}

/// A statement plus the records it was built from
#[derive(Debug)]
pub struct BatchRequest {
    pub statement: String,
    pub data: Vec<Data>,
    pub err_tx: ErrorSender,
}

/// Report sent on a request's error channel
///
/// `error` is `None` only for the end-of-input acknowledgement.
#[derive(Debug)]
pub struct ErrData {
    pub error: Option<ClientError>,
    pub data: Vec<Data>,
}

impl ErrData {
    /// Acknowledge the end-of-input sentinel
    pub fn ack() -> Self {
        Self {
            error: None,
            data: Vec::new(),
        }
    }

    /// Report a failed batch with its original records
    pub fn failure(error: ClientError, data: Vec<Data>) -> Self {
        Self {
            error: Some(error),
            data,
        }
    }

    pub fn is_ack(&self) -> bool {
        self.error.is_none()
    }
}
