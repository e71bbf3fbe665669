//! graphload client - concurrent statement execution for bulk graph writes
//!
//! This crate runs write statements against a graph cluster through a fixed
//! pool of sessions, one worker per session, retrying failures by class.

mod config;
pub mod pool;
pub mod retry;
mod slot;
pub mod worker;

#[cfg(test)]
mod test_support;

pub use config::{ClientSettings, PostStart, PreStop};
pub use pool::ClientPool;
pub use retry::{
    BACKPRESSURE_SIGNATURE, BackoffStrategy, ErrorClass, ExponentialBackoff,
    PERMANENT_ERROR_CODES, RetryDecision, RetryPolicy, RetryState, classify,
};
pub use slot::{SessionSlot, use_space_statement};
pub use worker::{Worker, WorkerContext, WorkerState};
