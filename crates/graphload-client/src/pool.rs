//! Fixed-size pool of sessions, each drained by its own worker
//!
//! The pool derives its concurrency as `concurrency x endpoints`, acquires
//! one session and one bounded request queue per slot, and leaves routing to
//! the caller: requests are sent to a specific worker through
//! [`ClientPool::sender`].
//!
//! # Example
//!
//! ```ignore
//! use graphload_client::{ClientPool, ClientSettings};
//! use graphload_core::ClientRequest;
//!
//! let settings = ClientSettings::new("h1:9669,h2:9669", "social").with_concurrency(4);
//! let (stats_tx, stats_rx) = tokio::sync::mpsc::channel(1024);
//! let pool = ClientPool::new(settings, &connector, stats_tx).await?;
//! pool.init().await?;
//!
//! let worker = pool.sender(batch_id % pool.concurrency()).unwrap();
//! worker.send(ClientRequest::batch(stmt, records, err_tx.clone())).await?;
//!
//! pool.close().await;
//! ```

mod client_pool;


pub use client_pool::ClientPool;
