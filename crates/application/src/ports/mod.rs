//! Port definitions (interfaces)
//!
//! Ports define the boundaries between the session core and external systems.
//! Each port is a trait implemented by adapters in the infrastructure layer.

mod http_transport;
mod token_storage;

pub use http_transport::{HttpTransport, TransportError, TransportFuture};
pub use token_storage::{StorageError, TokenStorage};
