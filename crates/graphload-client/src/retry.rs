//! Failure classification and retry policy for statement execution
//!
//! Every failed attempt is classified into one of three cases:
//!
//! - permanent: the statement itself is invalid, stop immediately
//! - backpressure: the server is catching up, retry without spending the budget
//! - transient: retry while the per-request budget lasts
//!
//! All retries are additionally bounded by the backoff's elapsed-time cap.
//!
//! # Example
//!
//! ```
//! use graphload_client::retry::{BackoffStrategy, RetryDecision, RetryPolicy};
//! use graphload_core::{ErrorCode, ExecutionResponse};
//!
//! let policy = RetryPolicy::new(2, BackoffStrategy::new(10, 1_000));
//! let mut state = policy.start();
//!
//! let outcome = Ok(ExecutionResponse::failed(ErrorCode::E_SYNTAX_ERROR, "syntax error"));
//! assert!(matches!(state.next(outcome), RetryDecision::GiveUp(_)));
//! ```

mod backoff;
mod classifier;
mod policy;

#[cfg(test)]
mod tests;

pub use backoff::{BackoffStrategy, ExponentialBackoff};
pub use classifier::{BACKPRESSURE_SIGNATURE, ErrorClass, PERMANENT_ERROR_CODES, classify};
pub use policy::{RetryDecision, RetryPolicy, RetryState};
