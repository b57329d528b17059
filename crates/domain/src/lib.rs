//! Docflow Domain - Core session types
//!
//! This crate defines the domain model for the Docflow session client.
//! All types here are pure Rust with no I/O dependencies.

pub mod auth;
pub mod error;
pub mod id;
pub mod request;
pub mod response;
pub mod settings;

pub use auth::{
    AuthEvent, Credentials, LoginResponse, LogoutOutcome, RefreshedTokens, TokenPair,
    UserProfile, token_preview,
};
pub use error::{ApiError, ApiErrorKind, DomainError, DomainResult};
pub use id::generate_request_id;
pub use request::{AUTHORIZATION, ApiRequest, HttpMethod, RequestHeader};
pub use response::{ApiResponse, StatusCode};
pub use settings::ClientSettings;
