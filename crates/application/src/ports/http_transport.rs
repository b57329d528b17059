//! HTTP transport port

use std::future::Future;
use std::pin::Pin;

use docflow_domain::{ApiError, ApiRequest, ApiResponse};

/// Errors raised when no response could be obtained.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TransportError {
    /// The request exceeded its timeout.
    #[error("request timed out after {timeout_ms}ms")]
    Timeout {
        /// The timeout that elapsed.
        timeout_ms: u64,
    },

    /// The connection could not be established.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The request URL could not be parsed.
    #[error("invalid URL: {0}")]
    InvalidUrl(String),

    /// The request body could not be encoded.
    #[error("invalid body: {0}")]
    InvalidBody(String),

    /// Any other transport failure.
    #[error("{0}")]
    Other(String),
}

impl From<TransportError> for ApiError {
    fn from(error: TransportError) -> Self {
        Self::network(error.to_string())
    }
}

/// Boxed future returned by [`HttpTransport::execute`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<ApiResponse, TransportError>> + Send + 'a>>;

/// Sends a fully prepared request over the network.
///
/// Implementations return every received response, whatever its status;
/// only the absence of a response is an error.
pub trait HttpTransport: Send + Sync {
    /// Executes the request.
    fn execute(&self, request: &ApiRequest) -> TransportFuture<'_>;
}
