//! Docflow Application - session layer and API client core
//!
//! This crate owns the session state machine: the token store, the auth
//! event bus, the request interceptor and the refresh coordinator, plus the
//! `ApiClient` and `AuthService` built on them. I/O is reached only through
//! the ports in [`ports`].

pub mod auth;
pub mod client;
pub mod ports;

#[cfg(test)]
pub(crate) mod test_support;

pub use auth::{
    ACCESS_TOKEN_KEY, AuthEventBus, AuthService, REFRESH_TOKEN_KEY, RefreshCoordinator,
    Subscription, TokenStore, attach_bearer,
};
pub use client::ApiClient;
pub use ports::{HttpTransport, StorageError, TokenStorage, TransportError};
