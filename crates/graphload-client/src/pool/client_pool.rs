//! Client pool implementation

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use graphload_core::{
    ClientError, ClientRequest, ConnectionPoolConfig, Connector, HookStage, Result, Session,
    SessionSource, Stats, parse_addresses,
};
use parking_lot::Mutex;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, Span};

use crate::config::ClientSettings;
use crate::slot::{SessionSlot, use_space_statement};
use crate::worker::{Worker, WorkerContext, WorkerState};

/// Queue and state handle of a worker that has not been started yet
struct PendingWorker {
    requests: mpsc::Receiver<ClientRequest>,
    state: watch::Sender<WorkerState>,
}

/// A pool of sessions, one worker per session
///
/// Invariant: `sessions.len() == senders.len() == concurrency` until
/// [`close`](Self::close) clears the senders.
pub struct ClientPool {
    settings: ClientSettings,
    concurrency: usize,
    source: Arc<dyn SessionSource>,
    sessions: Vec<Arc<SessionSlot>>,
    senders: Mutex<Vec<mpsc::Sender<ClientRequest>>>,
    states: Vec<watch::Receiver<WorkerState>>,
    pending: Mutex<Option<Vec<PendingWorker>>>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
    stats_tx: mpsc::Sender<Stats>,
    shutdown: CancellationToken,
    closed: AtomicBool,
    span: Span,
}

impl ClientPool {
    /// Connect to the cluster and acquire one session per slot.
    ///
    /// Fails without returning a partial pool if an address is malformed,
    /// the cluster cannot be reached, or any session cannot be acquired.
    /// Sessions acquired before a failure are released.
    pub async fn new(
        settings: ClientSettings,
        connector: &dyn Connector,
        stats_tx: mpsc::Sender<Stats>,
    ) -> Result<Self> {
        settings.validate()?;
        let hosts = parse_addresses(settings.address())?;
        let concurrency = settings.concurrency() * hosts.len();

        let source = connector
            .connect(&hosts, ConnectionPoolConfig::new(concurrency))
            .await?;

        let mut acquired: Vec<Box<dyn Session>> = Vec::with_capacity(concurrency);
        for index in 0..concurrency {
            match source
                .get_session(settings.user(), settings.password())
                .await
            {
                Ok(session) => acquired.push(session),
                Err(error) => {
                    tracing::error!(index, %error, "failed to acquire session");
                    for mut session in acquired {
                        session.release().await;
                    }
                    source.close().await;
                    return Err(error);
                }
            }
        }

        let mut sessions = Vec::with_capacity(concurrency);
        let mut senders = Vec::with_capacity(concurrency);
        let mut states = Vec::with_capacity(concurrency);
        let mut pending = Vec::with_capacity(concurrency);
        for (index, session) in acquired.into_iter().enumerate() {
            let (tx, rx) = mpsc::channel(settings.channel_buffer_size());
            let (state_tx, state_rx) = watch::channel(WorkerState::Idle);
            sessions.push(Arc::new(SessionSlot::new(index, session)));
            senders.push(tx);
            states.push(state_rx);
            pending.push(PendingWorker {
                requests: rx,
                state: state_tx,
            });
        }

        tracing::info!(
            hosts = hosts.len(),
            concurrency,
            space = %settings.space(),
            "client pool created"
        );

        Ok(Self {
            settings,
            concurrency,
            source,
            sessions,
            senders: Mutex::new(senders),
            states,
            pending: Mutex::new(Some(pending)),
            tasks: Mutex::new(Vec::new()),
            stats_tx,
            shutdown: CancellationToken::new(),
            closed: AtomicBool::new(false),
            span: tracing::info_span!("client_pool"),
        })
    }

    /// Route this pool's and its workers' logs under `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    /// Run post-start commands, select the space, and start the workers.
    ///
    /// Post-start and space selection failures are returned; nothing is
    /// started in that case and `init` may be called again. Once the workers
    /// are running, further calls fail with
    /// [`ClientError::AlreadyInitialized`] without running any hook.
    pub async fn init(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ClientError::Closed);
        }
        let pending = self
            .pending
            .lock()
            .take()
            .ok_or(ClientError::AlreadyInitialized)?;

        let span = self.span.clone();
        async {
            match self.prepare().await {
                Ok(()) if self.is_closed() => Err(ClientError::Closed),
                Ok(()) => {
                    self.start_workers(pending);
                    Ok(())
                }
                Err(error) => {
                    if !self.is_closed() {
                        *self.pending.lock() = Some(pending);
                    }
                    Err(error)
                }
            }
        }
        .instrument(span)
        .await
    }

    /// Post-start hook, settle period, and the space pre-check
    async fn prepare(&self) -> Result<()> {
        let slot = self
            .active_session()
            .map(|index| self.sessions[index].clone())
            .ok_or(ClientError::NoActiveSession)?;

        if let Some(post_start) = self.settings.post_start() {
            slot.exec(post_start.commands())
                .await
                .map_err(|e| ClientError::Hook {
                    stage: HookStage::PostStart,
                    source: Box::new(e),
                })?;
            tracing::info!(
                after_period_ms = post_start.after_period().as_millis() as u64,
                "post-start commands finished"
            );
            tokio::time::sleep(post_start.after_period()).await;
        }

        slot.exec(&use_space_statement(self.settings.space()))
            .await
    }

    fn start_workers(&self, pending: Vec<PendingWorker>) {
        let ctx = Arc::new(
            WorkerContext::new(
                self.settings.space(),
                self.stats_tx.clone(),
                self.settings.retry_policy(),
                self.shutdown.clone(),
            )
            .with_execute_timeout(self.settings.execute_timeout()),
        );

        let mut tasks = self.tasks.lock();
        for (slot, worker) in self.sessions.iter().zip(pending) {
            let span = tracing::info_span!(parent: &self.span, "worker", index = slot.index());
            let worker = Worker::new(slot.clone(), worker.requests, ctx.clone(), worker.state);
            tasks.push(tokio::spawn(worker.run().instrument(span)));
        }
        tracing::info!(workers = tasks.len(), "workers started");
    }

    /// Index of the first slot whose session is still usable.
    ///
    /// Lifecycle hooks run on this session. Slots whose worker could not
    /// select the space are skipped.
    pub fn active_session(&self) -> Option<usize> {
        self.sessions
            .iter()
            .position(|slot| slot.is_healthy())
    }

    /// Number of workers: sessions per endpoint times endpoints
    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// Ingress queue of worker `index`, or `None` after close
    pub fn sender(&self, index: usize) -> Option<mpsc::Sender<ClientRequest>> {
        self.senders.lock().get(index).cloned()
    }

    /// Ingress queues of all workers, in worker order; empty after close
    pub fn senders(&self) -> Vec<mpsc::Sender<ClientRequest>> {
        self.senders.lock().clone()
    }

    /// Current state of worker `index`
    pub fn worker_state(&self, index: usize) -> Option<WorkerState> {
        self.states.get(index).map(|state| *state.borrow())
    }

    /// Watch handles for every worker's state, in worker order
    pub fn worker_states(&self) -> Vec<watch::Receiver<WorkerState>> {
        self.states.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Shut the pool down.
    ///
    /// Workers stop between requests or during backoff and publish nothing
    /// further; requests still queued are dropped without a report. The
    /// pre-stop commands run on the active session, and their failure is
    /// only logged. Then every session is released, every queue closed, and
    /// the underlying connection pool closed. Calling `close` again is a
    /// no-op.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        let span = self.span.clone();
        async {
            self.shutdown.cancel();

            if let Some(pre_stop) = self.settings.pre_stop() {
                if let Some(index) = self.active_session() {
                    if let Err(error) = self.sessions[index].exec(pre_stop.commands()).await {
                        tracing::error!(%error, "pre-stop commands failed");
                    }
                }
            }

            for slot in &self.sessions {
                slot.release().await;
            }

            self.senders.lock().clear();
            self.pending.lock().take();

            let tasks: Vec<_> = self.tasks.lock().drain(..).collect();
            for task in tasks {
                if let Err(error) = task.await {
                    tracing::warn!(%error, "worker task ended abnormally");
                }
            }

            self.source.close().await;
            tracing::info!("client pool closed");
        }
        .instrument(span)
        .await
    }
}

impl Drop for ClientPool {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
