//! Per-request retry state machine

use std::time::Duration;

use graphload_core::{ClientError, ExecutionResponse, Result};

use super::backoff::{BackoffStrategy, ExponentialBackoff};
use super::classifier::{ErrorClass, classify};

/// Retry budget and backoff shared by all requests of a pool
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Bounded retries allowed per request for transient failures
    budget: u32,
    backoff: BackoffStrategy,
}

impl RetryPolicy {
    pub fn new(budget: u32, backoff: BackoffStrategy) -> Self {
        Self { budget, backoff }
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    pub fn backoff(&self) -> &BackoffStrategy {
        &self.backoff
    }

    /// Fresh state for one request; the elapsed-time clock starts now.
    pub fn start(&self) -> RetryState {
        RetryState {
            budget: self.budget,
            remaining: self.budget,
            attempts: 0,
            backoff: self.backoff.start(),
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(1, BackoffStrategy::default())
    }
}

/// What the worker should do after an attempt
#[derive(Debug)]
pub enum RetryDecision {
    /// The statement succeeded
    Succeeded(ExecutionResponse),
    /// Wait `delay`, then execute again
    Retry { delay: Duration, class: ErrorClass },
    /// Stop and report this error
    GiveUp(ClientError),
}

/// Remaining budget and backoff timer of one in-flight request
#[derive(Debug)]
pub struct RetryState {
    budget: u32,
    remaining: u32,
    attempts: u32,
    backoff: ExponentialBackoff,
}

impl RetryState {
    /// Feed the outcome of an attempt and decide what happens next.
    pub fn next(&mut self, outcome: Result<ExecutionResponse>) -> RetryDecision {
        self.attempts += 1;
        let class = classify(&outcome);
        let error = match outcome {
            Ok(response) if class == ErrorClass::Success => {
                return RetryDecision::Succeeded(response);
            }
            Ok(response) => response.into_error(),
            Err(error) => error,
        };

        match class {
            ErrorClass::Permanent => return RetryDecision::GiveUp(error),
            ErrorClass::Backpressure => self.remaining = self.budget,
            ErrorClass::Transient | ErrorClass::Success => {
                if self.remaining == 0 {
                    return RetryDecision::GiveUp(error);
                }
                self.remaining -= 1;
            }
        }

        match self.backoff.next_delay() {
            Some(delay) => RetryDecision::Retry { delay, class },
            None => {
                tracing::warn!(
                    attempts = self.attempts,
                    elapsed_ms = self.backoff.elapsed().as_millis() as u64,
                    "retry elapsed time exceeded"
                );
                RetryDecision::GiveUp(error)
            }
        }
    }

    /// Bounded retries still available
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn budget(&self) -> u32 {
        self.budget
    }

    /// Execute attempts observed so far
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Retries performed so far
    pub fn retries(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub fn elapsed(&self) -> Duration {
        self.backoff.elapsed()
    }
}
