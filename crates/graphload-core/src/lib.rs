//! graphload core - shared abstractions for the bulk statement executor
//!
//! This crate provides the types and traits that the client pool and its
//! collaborators agree on. It defines:
//!
//! - `Session` - Trait for one authenticated, exclusively owned connection
//! - `SessionSource` / `Connector` - Traits for opening sessions against a cluster
//! - `ClientRequest` / `ErrData` / `Stats` - Messages exchanged over the worker channels
//! - `ExecutionResponse` / `ErrorCode` - Structured server replies
//! - `HostAddress` - Cluster endpoint parsing

mod address;
mod error;
mod request;
mod session;
mod types;

pub use address::*;
pub use error::*;
pub use request::*;
pub use session::*;
pub use types::*;
