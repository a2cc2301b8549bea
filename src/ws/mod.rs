//! WebSocket connection infrastructure.
//!
//! This module owns the transport side of the pipeline client:
//!
//! - [`ConnectionManager`]: connection lifecycle, keep-alive, receive loop,
//!   and automatic reconnection
//! - [`Options`]: client behavior configuration and endpoint resolution
//! - [`SocketError`]: transport-level error variants

pub mod config;
pub mod connection;
pub mod error;

pub(crate) mod backoff;
pub(crate) mod frame;

pub use config::{Options, resolve_endpoint};
pub use connection::{ClientEvent, ConnectionManager, ConnectionState};
pub use error::SocketError;
