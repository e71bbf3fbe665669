//! Session traits and connection pool configuration

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::{ExecutionResponse, HostAddress, Result};

/// One authenticated connection to the graph database
///
/// A session is owned by exactly one worker, so `execute` takes `&mut self`
/// and implementations need no internal locking. No retry happens here.
#[async_trait]
pub trait Session: Send {
    /// Execute a single statement and return the raw server response.
    ///
    /// Returns `Err` only when the server could not be reached or the reply
    /// could not be read; a rejected statement is an `Ok` response with a
    /// non-success error code.
    async fn execute(&mut self, statement: &str) -> Result<ExecutionResponse>;

    /// Return the session to the server. Called exactly once at shutdown.
    async fn release(&mut self);
}

/// An opened connection pool that hands out authenticated sessions
#[async_trait]
pub trait SessionSource: Send + Sync {
    /// Authenticate and open a new session
    async fn get_session(&self, user: &str, password: &str) -> Result<Box<dyn Session>>;

    /// Close the underlying connection pool
    async fn close(&self);
}

/// Opens a [`SessionSource`] against a set of cluster endpoints
#[async_trait]
pub trait Connector: Send + Sync {
    async fn connect(
        &self,
        hosts: &[HostAddress],
        config: ConnectionPoolConfig,
    ) -> Result<Arc<dyn SessionSource>>;
}

#[async_trait]
impl<T: Connector> Connector for Arc<T> {
    async fn connect(
        &self,
        hosts: &[HostAddress],
        config: ConnectionPoolConfig,
    ) -> Result<Arc<dyn SessionSource>> {
        (**self).connect(hosts, config).await
    }
}

/// Sizing and timeouts for the underlying connection pool
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionPoolConfig {
    /// Socket timeout; zero means no timeout
    pub timeout: Duration,
    /// Idle connection lifetime; zero means connections never expire
    pub idle_time: Duration,
    pub max_size: usize,
    pub min_size: usize,
}

impl ConnectionPoolConfig {
    /// Pool sized for `max_size` sessions with no timeouts
    pub fn new(max_size: usize) -> Self {
        Self {
            timeout: Duration::ZERO,
            idle_time: Duration::ZERO,
            max_size,
            min_size: 1,
        }
    }
}
