//! Domain error types

use thiserror::Error;

/// Domain-level errors that can occur during validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DomainError {
    /// The provided URL is invalid or malformed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The HTTP method is not supported.
    #[error("unsupported HTTP method: {0}")]
    UnsupportedMethod(String),

    /// A request body could not be parsed as JSON.
    #[error("invalid body: {0}")]
    InvalidBody(String),
}

/// Result type alias for domain operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Coarse category of an [`ApiError`], for callers that only need to branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiErrorKind {
    /// The session could not be renewed; the user must log in again.
    AuthExpired,
    /// The server rejected the credentials that were presented.
    AuthInvalid,
    /// No response was received.
    Network,
    /// The server answered with a non-auth failure.
    Server,
}

/// Errors surfaced by the API client and the auth service.
///
/// The set is closed on purpose so that presentation code can branch on
/// [`ApiError::kind`] without knowing anything about the transport.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The access token expired and could not be refreshed.
    #[error("session expired: {message}")]
    AuthExpired {
        /// Why the session ended.
        message: String,
    },

    /// The server returned 401/403 for a request that cannot be retried.
    #[error("not authorized ({status}): {message}")]
    AuthInvalid {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the reason phrase.
        message: String,
    },

    /// The request never produced a response.
    #[error("network error: {message}")]
    Network {
        /// Transport-level description.
        message: String,
    },

    /// The server returned a non-auth error status or an unreadable body.
    #[error("server error ({status}): {message}")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Server-provided message, or the reason phrase.
        message: String,
    },
}

impl ApiError {
    /// Creates an `AuthExpired` error.
    #[must_use]
    pub fn auth_expired(message: impl Into<String>) -> Self {
        Self::AuthExpired {
            message: message.into(),
        }
    }

    /// Creates a `Network` error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    /// Builds the error for a failed HTTP status.
    ///
    /// 401 and 403 are authorization failures, everything else is a server
    /// error.
    #[must_use]
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 | 403 => Self::AuthInvalid { status, message },
            _ => Self::Server { status, message },
        }
    }

    /// Returns the coarse category of this error.
    #[must_use]
    pub const fn kind(&self) -> ApiErrorKind {
        match self {
            Self::AuthExpired { .. } => ApiErrorKind::AuthExpired,
            Self::AuthInvalid { .. } => ApiErrorKind::AuthInvalid,
            Self::Network { .. } => ApiErrorKind::Network,
            Self::Server { .. } => ApiErrorKind::Server,
        }
    }

    /// Returns the HTTP status, if a response was received.
    #[must_use]
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::AuthInvalid { status, .. } | Self::Server { status, .. } => Some(*status),
            Self::AuthExpired { .. } | Self::Network { .. } => None,
        }
    }

    /// Returns true if the user has to sign in again.
    #[must_use]
    pub const fn requires_login(&self) -> bool {
        matches!(self.kind(), ApiErrorKind::AuthExpired | ApiErrorKind::AuthInvalid)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_splits_auth_and_server() {
        assert_eq!(
            ApiError::from_status(401, "nope").kind(),
            ApiErrorKind::AuthInvalid
        );
        assert_eq!(
            ApiError::from_status(403, "nope").kind(),
            ApiErrorKind::AuthInvalid
        );
        assert_eq!(
            ApiError::from_status(500, "boom").kind(),
            ApiErrorKind::Server
        );
        assert_eq!(ApiError::from_status(404, "gone").status(), Some(404));
    }

    #[test]
    fn test_requires_login() {
        assert!(ApiError::auth_expired("refresh rejected").requires_login());
        assert!(!ApiError::network("connection reset").requires_login());
        assert!(!ApiError::from_status(502, "bad gateway").requires_login());
    }

    #[test]
    fn test_display_messages() {
        assert_eq!(
            ApiError::auth_expired("no refresh token available").to_string(),
            "session expired: no refresh token available"
        );
        assert_eq!(
            ApiError::from_status(403, "Forbidden").to_string(),
            "not authorized (403): Forbidden"
        );
    }
}
