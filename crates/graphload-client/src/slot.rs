//! A pool slot holding one worker's session

use std::sync::atomic::{AtomicBool, Ordering};

use graphload_core::{ClientError, ExecutionResponse, Result, Session};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

/// One session slot of the client pool.
///
/// The owning worker is the only steady-state user of the session. The pool
/// locks the slot only to run lifecycle hooks and to release the session,
/// so shutdown waits for an in-flight execute instead of racing it.
pub struct SessionSlot {
    index: usize,
    session: Mutex<Option<Box<dyn Session>>>,
    /// Cleared when the worker gives up on its session or the session is released
    healthy: AtomicBool,
}

impl SessionSlot {
    pub fn new(index: usize, session: Box<dyn Session>) -> Self {
        Self {
            index,
            session: Mutex::new(Some(session)),
            healthy: AtomicBool::new(true),
        }
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn is_healthy(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }

    pub(crate) fn mark_unhealthy(&self) {
        self.healthy.store(false, Ordering::SeqCst);
    }

    /// Run one statement and return the raw outcome.
    ///
    /// Fails with [`ClientError::Closed`] once the session has been released.
    pub async fn execute(&self, statement: &str) -> Result<ExecutionResponse> {
        let mut guard = self.session.lock().await;
        let session = guard.as_mut().ok_or(ClientError::Closed)?;
        session.execute(statement).await
    }

    /// Like [`execute`](Self::execute), but refuses to start once `shutdown`
    /// is cancelled. The check happens under the slot lock.
    ///
    /// Returns `None` without touching the session if shutdown was requested
    /// or the session has been released.
    pub(crate) async fn execute_unless_cancelled(
        &self,
        statement: &str,
        shutdown: &CancellationToken,
    ) -> Option<Result<ExecutionResponse>> {
        let mut guard = self.session.lock().await;
        if shutdown.is_cancelled() {
            return None;
        }
        let session = guard.as_mut()?;
        Some(session.execute(statement).await)
    }

    /// Run a command batch, treating a non-success response as an error.
    ///
    /// Empty command text is a no-op.
    pub async fn exec(&self, statement: &str) -> Result<()> {
        if statement.is_empty() {
            return Ok(());
        }
        let outcome = self.execute(statement).await;
        self.check(statement, outcome)
    }

    /// Like [`exec`](Self::exec), but fails with [`ClientError::Closed`]
    /// instead of executing once `shutdown` is cancelled.
    pub(crate) async fn exec_unless_cancelled(
        &self,
        statement: &str,
        shutdown: &CancellationToken,
    ) -> Result<()> {
        if statement.is_empty() {
            return Ok(());
        }
        match self.execute_unless_cancelled(statement, shutdown).await {
            Some(outcome) => self.check(statement, outcome),
            None => Err(ClientError::Closed),
        }
    }

    fn check(&self, statement: &str, outcome: Result<ExecutionResponse>) -> Result<()> {
        let response = outcome.map_err(|e| self.statement_error(statement, e))?;
        if !response.is_succeeded() {
            return Err(self.statement_error(statement, response.into_error()));
        }
        Ok(())
    }

    /// Release the session. Later calls are no-ops.
    pub async fn release(&self) {
        self.mark_unhealthy();
        let session = self.session.lock().await.take();
        if let Some(mut session) = session {
            session.release().await;
            tracing::debug!(index = self.index, "session released");
        }
    }

    pub(crate) fn statement_error(&self, statement: &str, source: ClientError) -> ClientError {
        ClientError::Statement {
            worker: self.index,
            statement: statement.to_string(),
            source: Box::new(source),
        }
    }
}

/// Statement selecting the graph space a session writes into
pub fn use_space_statement(space: &str) -> String {
    format!("USE `{space}`;")
}
