//! Docflow Infrastructure - Adapters and implementations
//!
//! This crate provides concrete implementations of the ports
//! defined in the application layer, the settings loader and the
//! composition root that wires them together.

pub mod adapters;
pub mod persistence;
pub mod serialization;
pub mod session;
pub mod settings;

pub use adapters::ReqwestTransport;
pub use persistence::{FileTokenStorage, MemoryTokenStorage};
pub use serialization::SerializationError;
pub use session::{Session, SessionError};
pub use settings::{SettingsError, default_token_file, load_settings, load_settings_from};
