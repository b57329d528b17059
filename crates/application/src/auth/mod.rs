//! Session handling for the API client.
//!
//! This module provides:
//! - The token store, durable with an in-memory fallback
//! - The auth event bus
//! - Bearer injection for outgoing requests
//! - Single-flight token refresh with request replay
//! - The auth service used by the login and logout flows

mod events;
mod interceptor;
mod refresh;
mod service;
mod token_store;

pub use events::{AuthEventBus, Subscription};
pub use interceptor::attach_bearer;
pub use refresh::RefreshCoordinator;
pub use service::AuthService;
pub use token_store::{ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY, TokenStore};
