//! Worker loop draining one request queue through one session
//!
//! Each worker selects the target space once, then executes requests in
//! enqueue order, retrying failures according to the pool's
//! [`RetryPolicy`](crate::retry::RetryPolicy). Every resolved request
//! publishes exactly one outcome: stats on success, an [`ErrData`] on the
//! request's own error channel on failure.
//!
//! [`ErrData`]: graphload_core::ErrData

mod runner;
mod state;


pub use runner::{Worker, WorkerContext};
pub use state::WorkerState;
