//! Scripted sessions shared by the worker and pool tests

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::sync::Once;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use graphload_core::{
    ClientError, ConnectionPoolConfig, Connector, ErrorCode, ExecutionResponse, HostAddress,
    Result, Session, SessionSource,
};
use parking_lot::Mutex;

static INIT: Once = Once::new();

/// Initialize test logging once per test binary
pub fn initialize_logging() {
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .with_test_writer()
            .try_init();
    });
}

pub type Outcome = Result<ExecutionResponse>;

pub fn ok() -> Outcome {
    Ok(ExecutionResponse::succeeded(Duration::from_millis(1)))
}

pub fn rejected(code: ErrorCode) -> Outcome {
    Ok(ExecutionResponse::failed(code, "statement rejected"))
}

pub fn backpressure() -> Outcome {
    Ok(ExecutionResponse::failed(
        ErrorCode::E_EXECUTION_ERROR,
        "Storage Error: raft buffer is full. Please retry later.",
    ))
}

pub fn transport() -> Outcome {
    Err(ClientError::Transport("connection reset by peer".into()))
}

#[derive(Default)]
struct ScriptState {
    queued: HashMap<String, VecDeque<Outcome>>,
    per_session: HashMap<(usize, String), VecDeque<Outcome>>,
    forever: HashMap<String, fn() -> Outcome>,
    delays: HashMap<String, Duration>,
    executed: Vec<(usize, String)>,
    released: Vec<usize>,
}

/// Responses the mock sessions give, plus a log of what they were asked.
///
/// A statement with nothing scripted succeeds.
#[derive(Default)]
pub struct Script {
    state: Mutex<ScriptState>,
    source_closed: AtomicBool,
}

impl Script {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Queue `outcomes` for `statement`, consumed one per execute
    pub fn respond(&self, statement: &str, outcomes: Vec<Outcome>) {
        self.state
            .lock()
            .queued
            .entry(statement.to_string())
            .or_default()
            .extend(outcomes);
    }

    /// Queue `outcomes` for `statement` on one session only, ahead of the shared queue
    pub fn respond_on(&self, session: usize, statement: &str, outcomes: Vec<Outcome>) {
        self.state
            .lock()
            .per_session
            .entry((session, statement.to_string()))
            .or_default()
            .extend(outcomes);
    }

    /// Answer `statement` with `outcome()` once its queue is empty
    pub fn respond_forever(&self, statement: &str, outcome: fn() -> Outcome) {
        self.state
            .lock()
            .forever
            .insert(statement.to_string(), outcome);
    }

    /// Make every execute of `statement` take `delay`
    pub fn delay(&self, statement: &str, delay: Duration) {
        self.state
            .lock()
            .delays
            .insert(statement.to_string(), delay);
    }

    /// Every `(session, statement)` executed so far, in order
    pub fn executed(&self) -> Vec<(usize, String)> {
        self.state.lock().executed.clone()
    }

    /// Statements executed by `session`, in order
    pub fn executed_by(&self, session: usize) -> Vec<String> {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|(id, _)| *id == session)
            .map(|(_, statement)| statement.clone())
            .collect()
    }

    pub fn count(&self, statement: &str) -> usize {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|(_, s)| s == statement)
            .count()
    }

    pub fn released(&self) -> Vec<usize> {
        let mut released = self.state.lock().released.clone();
        released.sort_unstable();
        released
    }

    pub fn source_closed(&self) -> bool {
        self.source_closed.load(Ordering::SeqCst)
    }

    fn next(&self, session: usize, statement: &str) -> (Option<Duration>, Outcome) {
        let mut guard = self.state.lock();
        let state = &mut *guard;
        state.executed.push((session, statement.to_string()));
        let delay = state.delays.get(statement).copied();
        let queued = match state
            .per_session
            .get_mut(&(session, statement.to_string()))
            .and_then(VecDeque::pop_front)
        {
            Some(outcome) => Some(outcome),
            None => state.queued.get_mut(statement).and_then(VecDeque::pop_front),
        };
        let outcome = match queued {
            Some(outcome) => outcome,
            None => state.forever.get(statement).map_or_else(ok, |f| f()),
        };
        (delay, outcome)
    }
}

pub struct MockSession {
    id: usize,
    script: Arc<Script>,
}

impl MockSession {
    pub fn new(id: usize, script: Arc<Script>) -> Self {
        Self { id, script }
    }
}

#[async_trait]
impl Session for MockSession {
    async fn execute(&mut self, statement: &str) -> Result<ExecutionResponse> {
        let (delay, outcome) = self.script.next(self.id, statement);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        outcome
    }

    async fn release(&mut self) {
        self.script.state.lock().released.push(self.id);
    }
}

pub struct MockSource {
    script: Arc<Script>,
    next_id: AtomicUsize,
    fail_after: Option<usize>,
}

#[async_trait]
impl SessionSource for MockSource {
    async fn get_session(&self, _user: &str, _password: &str) -> Result<Box<dyn Session>> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        if self.fail_after.is_some_and(|limit| id >= limit) {
            return Err(ClientError::Connection("authentication failed".into()));
        }
        Ok(Box::new(MockSession::new(id, self.script.clone())))
    }

    async fn close(&self) {
        self.script.source_closed.store(true, Ordering::SeqCst);
    }
}

/// Connector handing out [`MockSession`]s bound to one script
pub struct MockConnector {
    script: Arc<Script>,
    fail_after: Option<usize>,
    refuse: bool,
    connected: Mutex<Option<(Vec<HostAddress>, ConnectionPoolConfig)>>,
}

impl MockConnector {
    pub fn new(script: Arc<Script>) -> Self {
        Self {
            script,
            fail_after: None,
            refuse: false,
            connected: Mutex::new(None),
        }
    }

    /// Fail every session acquisition after the first `sessions`
    pub fn failing_after(mut self, sessions: usize) -> Self {
        self.fail_after = Some(sessions);
        self
    }

    /// Fail to connect at all
    pub fn refusing(mut self) -> Self {
        self.refuse = true;
        self
    }

    pub fn connected(&self) -> Option<(Vec<HostAddress>, ConnectionPoolConfig)> {
        self.connected.lock().clone()
    }
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        hosts: &[HostAddress],
        config: ConnectionPoolConfig,
    ) -> Result<Arc<dyn SessionSource>> {
        if self.refuse {
            return Err(ClientError::Connection("connection refused".into()));
        }
        *self.connected.lock() = Some((hosts.to_vec(), config));
        Ok(Arc::new(MockSource {
            script: self.script.clone(),
            next_id: AtomicUsize::new(0),
            fail_after: self.fail_after,
        }))
    }
}
