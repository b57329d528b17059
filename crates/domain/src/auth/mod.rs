//! Authentication domain types

mod response;
mod types;

pub use types::{
    AuthEvent, Credentials, LoginResponse, LogoutOutcome, RefreshedTokens, TokenPair,
    UserProfile, token_preview,
};
