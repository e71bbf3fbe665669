//! Worker loop implementation

use std::ops::ControlFlow;
use std::sync::Arc;
use std::time::Duration;

use graphload_core::{
    BatchRequest, ClientError, ClientRequest, ErrData, ExecutionResponse, Result, Stats,
    batch_bytes,
};
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::state::WorkerState;
use crate::retry::{RetryDecision, RetryPolicy};
use crate::slot::{SessionSlot, use_space_statement};

/// Settings and channels shared by all workers of a pool
pub struct WorkerContext {
    space: String,
    stats_tx: mpsc::Sender<Stats>,
    policy: RetryPolicy,
    execute_timeout: Option<Duration>,
    shutdown: CancellationToken,
}

impl WorkerContext {
    pub fn new(
        space: impl Into<String>,
        stats_tx: mpsc::Sender<Stats>,
        policy: RetryPolicy,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            space: space.into(),
            stats_tx,
            policy,
            execute_timeout: None,
            shutdown,
        }
    }

    /// Bound every execute call; expiry counts as a transient failure.
    pub fn with_execute_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.execute_timeout = timeout;
        self
    }

    pub fn space(&self) -> &str {
        &self.space
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }
}

/// How a request left the retry loop
enum Resolution {
    Succeeded(ExecutionResponse),
    Failed { error: ClientError, retries: u32 },
    /// Shutdown was requested; nothing is published
    Interrupted,
}

/// One worker: a session slot plus the queue feeding it
pub struct Worker {
    slot: Arc<SessionSlot>,
    requests: mpsc::Receiver<ClientRequest>,
    ctx: Arc<WorkerContext>,
    state: watch::Sender<WorkerState>,
}

impl Worker {
    pub fn new(
        slot: Arc<SessionSlot>,
        requests: mpsc::Receiver<ClientRequest>,
        ctx: Arc<WorkerContext>,
        state: watch::Sender<WorkerState>,
    ) -> Self {
        Self {
            slot,
            requests,
            ctx,
            state,
        }
    }

    pub fn index(&self) -> usize {
        self.slot.index()
    }

    /// Run until end of input, queue closure, or shutdown.
    ///
    /// If the space cannot be selected the worker logs the error and exits
    /// without touching its queue; the rest of the pool keeps running.
    pub async fn run(mut self) {
        let statement = use_space_statement(&self.ctx.space);
        if let Err(error) = self
            .slot
            .exec_unless_cancelled(&statement, &self.ctx.shutdown)
            .await
        {
            if !self.ctx.shutdown.is_cancelled() {
                tracing::error!(worker = self.index(), %error, "failed to select space");
                self.slot.mark_unhealthy();
            }
            self.finish();
            return;
        }
        tracing::debug!(worker = self.index(), space = %self.ctx.space, "worker started");

        loop {
            self.transition(WorkerState::Idle);
            let request = tokio::select! {
                biased;
                _ = self.ctx.shutdown.cancelled() => break,
                request = self.requests.recv() => request,
            };

            match request {
                None => {
                    tracing::debug!(worker = self.index(), "request queue closed");
                    break;
                }
                Some(ClientRequest::EndOfInput { err_tx }) => {
                    self.transition(WorkerState::Draining);
                    if err_tx.send(ErrData::ack()).await.is_err() {
                        tracing::warn!(worker = self.index(), "end-of-input receiver dropped");
                    }
                    break;
                }
                Some(ClientRequest::Batch(batch)) => {
                    if self.process(batch).await.is_break() {
                        break;
                    }
                }
            }
        }

        self.finish();
    }

    async fn process(&self, batch: BatchRequest) -> ControlFlow<()> {
        let BatchRequest {
            statement,
            data,
            err_tx,
        } = batch;
        let started = Instant::now();

        let resolution = self.execute_with_retry(&statement).await;
        if self.ctx.shutdown.is_cancelled() {
            return ControlFlow::Break(());
        }

        match resolution {
            Resolution::Interrupted => ControlFlow::Break(()),
            Resolution::Succeeded(response) => {
                let stats = Stats::success(
                    response.latency(),
                    started.elapsed(),
                    data.len(),
                    batch_bytes(&data),
                );
                tokio::select! {
                    _ = self.ctx.shutdown.cancelled() => ControlFlow::Break(()),
                    sent = self.ctx.stats_tx.send(stats) => {
                        if sent.is_err() {
                            tracing::warn!(worker = self.index(), "stats receiver dropped");
                        }
                        ControlFlow::Continue(())
                    }
                }
            }
            Resolution::Failed { error, retries } => {
                let error = self.slot.statement_error(&statement, error);
                tracing::warn!(worker = self.index(), retries, %error, "statement failed");
                tokio::select! {
                    _ = self.ctx.shutdown.cancelled() => ControlFlow::Break(()),
                    sent = err_tx.send(ErrData::failure(error, data)) => {
                        if sent.is_err() {
                            tracing::warn!(worker = self.index(), "error receiver dropped");
                        }
                        ControlFlow::Continue(())
                    }
                }
            }
        }
    }

    async fn execute_with_retry(&self, statement: &str) -> Resolution {
        let mut retry = self.ctx.policy.start();

        loop {
            self.transition(WorkerState::Executing);
            let Some(outcome) = self.execute_once(statement).await else {
                return Resolution::Interrupted;
            };

            match retry.next(outcome) {
                RetryDecision::Succeeded(response) => return Resolution::Succeeded(response),
                RetryDecision::GiveUp(error) => {
                    return Resolution::Failed {
                        error,
                        retries: retry.retries(),
                    };
                }
                RetryDecision::Retry { delay, class } => {
                    self.transition(WorkerState::Retrying);
                    tracing::debug!(
                        worker = self.index(),
                        attempt = retry.attempts(),
                        remaining = retry.remaining(),
                        ?class,
                        delay_ms = delay.as_millis() as u64,
                        "retrying statement"
                    );
                    tokio::select! {
                        _ = self.ctx.shutdown.cancelled() => return Resolution::Interrupted,
                        _ = tokio::time::sleep(delay) => {}
                    }
                }
            }
        }
    }

    /// One execute call; `None` once shutdown was requested or the session released.
    async fn execute_once(&self, statement: &str) -> Option<Result<ExecutionResponse>> {
        let attempt = self
            .slot
            .execute_unless_cancelled(statement, &self.ctx.shutdown);
        match self.ctx.execute_timeout {
            Some(limit) => tokio::time::timeout(limit, attempt)
                .await
                .unwrap_or_else(|_| {
                    Some(Err(ClientError::Timeout(format!(
                        "statement did not complete within {limit:?}"
                    ))))
                }),
            None => attempt.await,
        }
    }

    fn transition(&self, next: WorkerState) {
        self.state.send_replace(next);
    }

    fn finish(&mut self) {
        self.requests.close();
        self.transition(WorkerState::Stopped);
        tracing::debug!(worker = self.index(), "worker stopped");
    }
}
