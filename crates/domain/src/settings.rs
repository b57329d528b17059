//! Client settings
//!
//! Defaults match a local development backend. Loading from the
//! environment lives in the infrastructure crate.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{DomainError, DomainResult};

/// Base URL used when nothing else is configured.
pub const DEFAULT_API_URL: &str = "http://localhost:4000/api";

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

const fn default_request_timeout_secs() -> u64 {
    30
}

const fn default_refresh_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("docflow/{}", env!("CARGO_PKG_VERSION"))
}

/// Settings for the shared API client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Base URL of the REST API, e.g. `http://localhost:4000/api`.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Where the session tokens are persisted. `None` uses the platform
    /// default chosen by the storage adapter.
    #[serde(default)]
    pub token_file: Option<PathBuf>,
    /// Per-request timeout in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// Upper bound on a token refresh in seconds; 0 waits forever.
    #[serde(default = "default_refresh_timeout_secs")]
    pub refresh_timeout_secs: u64,
    /// `User-Agent` header value.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            token_file: None,
            request_timeout_secs: default_request_timeout_secs(),
            refresh_timeout_secs: default_refresh_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl ClientSettings {
    /// Settings pointing at the given base URL, defaults elsewhere.
    #[must_use]
    pub fn with_api_url(api_url: impl Into<String>) -> Self {
        Self {
            api_url: api_url.into(),
            ..Self::default()
        }
    }

    /// Checks that the base URL is an absolute http(s) URL.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidUrl` otherwise.
    pub fn validate(&self) -> DomainResult<()> {
        let url = Url::parse(&self.api_url)
            .map_err(|e| DomainError::InvalidUrl(format!("{e}: {}", self.api_url)))?;
        match url.scheme() {
            "http" | "https" => Ok(()),
            other => Err(DomainError::InvalidUrl(format!(
                "unsupported scheme {other}: {}",
                self.api_url
            ))),
        }
    }

    /// Joins an API path onto the base URL.
    ///
    /// Absolute `http(s)://` inputs are returned unchanged.
    #[must_use]
    pub fn endpoint(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            return path.to_string();
        }
        format!(
            "{}/{}",
            self.api_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Per-request timeout.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Refresh timeout, `None` when disabled.
    #[must_use]
    pub const fn refresh_timeout(&self) -> Option<Duration> {
        if self.refresh_timeout_secs == 0 {
            None
        } else {
            Some(Duration::from_secs(self.refresh_timeout_secs))
        }
    }
}
