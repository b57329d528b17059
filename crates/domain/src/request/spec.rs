//! Outgoing API request.

use serde_json::Value;

use super::method::HttpMethod;
use crate::id::generate_request_id;

/// Name of the header carrying bearer credentials.
pub const AUTHORIZATION: &str = "Authorization";

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHeader {
    /// Header name, compared case-insensitively.
    pub name: String,
    /// Header value.
    pub value: String,
}

/// An outgoing API call.
///
/// The transport treats everything except the flags as opaque; the flags are
/// read by the refresh protocol only.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiRequest {
    /// Correlation id for logs.
    pub id: String,
    /// HTTP method.
    pub method: HttpMethod,
    /// Absolute URL.
    pub url: String,
    /// Headers in insertion order.
    pub headers: Vec<RequestHeader>,
    /// JSON body, if any.
    pub body: Option<Value>,
    /// Set once this request has been replayed after a token refresh.
    pub retried: bool,
    /// Auth endpoints that must never enter the refresh protocol.
    pub skip_refresh: bool,
}

impl ApiRequest {
    /// Creates a request with no headers and no body.
    #[must_use]
    pub fn new(method: HttpMethod, url: impl Into<String>) -> Self {
        Self {
            id: generate_request_id(),
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
            retried: false,
            skip_refresh: false,
        }
    }

    /// Adds or replaces a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name, value);
        self
    }

    /// Sets a JSON body and a JSON content type unless one is already set.
    #[must_use]
    pub fn with_json_body(mut self, body: Value) -> Self {
        if self.header("content-type").is_none() {
            self.set_header("Content-Type", "application/json");
        }
        self.body = Some(body);
        self
    }

    /// Excludes this request from the refresh protocol.
    #[must_use]
    pub const fn without_refresh(mut self) -> Self {
        self.skip_refresh = true;
        self
    }

    /// Adds a header, replacing any existing header with the same name.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(existing) = self
            .headers
            .iter_mut()
            .find(|h| h.name.eq_ignore_ascii_case(&name))
        {
            existing.value = value;
        } else {
            self.headers.push(RequestHeader { name, value });
        }
    }

    /// Returns the value of a header.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name))
            .map(|h| h.value.as_str())
    }

    /// Sets `Authorization: Bearer <token>`.
    pub fn set_bearer(&mut self, token: &str) {
        self.set_header(AUTHORIZATION, format!("Bearer {token}"));
    }

    /// Returns the bearer token this request carries, if any.
    #[must_use]
    pub fn bearer_token(&self) -> Option<&str> {
        self.header(AUTHORIZATION)
            .and_then(|value| value.strip_prefix("Bearer "))
            .filter(|token| !token.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_set_header_replaces_case_insensitively() {
        let mut request = ApiRequest::new(HttpMethod::Get, "http://localhost/x")
            .with_header("X-Trace", "1");
        request.set_header("x-trace", "2");
        assert_eq!(request.headers.len(), 1);
        assert_eq!(request.header("X-TRACE"), Some("2"));
    }

    #[test]
    fn test_json_body_sets_content_type_once() {
        let request = ApiRequest::new(HttpMethod::Post, "http://localhost/x")
            .with_header("content-type", "application/vnd.docflow+json")
            .with_json_body(json!({"a": 1}));
        assert_eq!(
            request.header("Content-Type"),
            Some("application/vnd.docflow+json")
        );
        assert_eq!(request.body, Some(json!({"a": 1})));
    }

    #[test]
    fn test_bearer_round_trip() {
        let mut request = ApiRequest::new(HttpMethod::Get, "http://localhost/x");
        assert_eq!(request.bearer_token(), None);
        request.set_bearer("A1");
        request.set_bearer("A2");
        assert_eq!(request.header(AUTHORIZATION), Some("Bearer A2"));
        assert_eq!(request.bearer_token(), Some("A2"));
    }

    #[test]
    fn test_new_request_flags() {
        let request = ApiRequest::new(HttpMethod::Post, "http://localhost/auth/login");
        assert!(!request.retried);
        assert!(!request.skip_refresh);
        assert!(request.without_refresh().skip_refresh);
    }
}
