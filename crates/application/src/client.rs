//! Shared API client.

use std::fmt;
use std::sync::Arc;

use docflow_domain::{ApiError, ApiRequest, ApiResponse, ClientSettings, HttpMethod, TokenPair};
use serde_json::Value;

use crate::auth::{AuthEventBus, RefreshCoordinator, TokenStore, attach_bearer};
use crate::ports::HttpTransport;

/// HTTP client every feature module goes through.
///
/// Outgoing requests get the current bearer token; a 401 hands the request
/// to the [`RefreshCoordinator`].
pub struct ApiClient {
    settings: ClientSettings,
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    events: Arc<AuthEventBus>,
    refresh: RefreshCoordinator,
}

impl ApiClient {
    /// Creates a client. `store` and `events` should share the same bus.
    #[must_use]
    pub fn new(
        settings: ClientSettings,
        transport: Arc<dyn HttpTransport>,
        store: Arc<TokenStore>,
        events: Arc<AuthEventBus>,
    ) -> Self {
        let refresh = RefreshCoordinator::new(
            &settings,
            Arc::clone(&transport),
            Arc::clone(&store),
            Arc::clone(&events),
        );
        Self {
            settings,
            transport,
            store,
            events,
            refresh,
        }
    }

    /// Builds a request for `path` under the API base URL.
    #[must_use]
    pub fn request(&self, method: HttpMethod, path: &str) -> ApiRequest {
        ApiRequest::new(method, self.settings.endpoint(path))
            .with_header("Accept", "application/json")
    }

    /// Sends `request` through the interceptor pipeline.
    ///
    /// # Errors
    ///
    /// Returns an error if no response arrives, or if the response is not
    /// 2xx after any token refresh.
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, ApiError> {
        attach_bearer(&self.store, &mut request);
        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            "sending request"
        );

        let response = self.transport.execute(&request).await?;
        tracing::debug!(
            request_id = %request.id,
            status = response.status,
            elapsed_ms = u64::try_from(response.duration.as_millis()).unwrap_or(u64::MAX),
            "response received"
        );

        if response.is_success() {
            Ok(response)
        } else if response.is_unauthorized() {
            self.refresh.handle_unauthorized(request, response).await
        } else {
            Err(response.to_error())
        }
    }

    /// `GET path`, decoding the JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`]; an undecodable body is a server error.
    pub async fn get_json(&self, path: &str) -> Result<Value, ApiError> {
        self.send_json(self.request(HttpMethod::Get, path)).await
    }

    /// `POST path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn post_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send_json(self.request(HttpMethod::Post, path).with_json_body(body))
            .await
    }

    /// `PUT path` with a JSON body.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn put_json(&self, path: &str, body: Value) -> Result<Value, ApiError> {
        self.send_json(self.request(HttpMethod::Put, path).with_json_body(body))
            .await
    }

    /// `DELETE path`. An empty response body yields `Value::Null`.
    ///
    /// # Errors
    ///
    /// See [`ApiClient::send`].
    pub async fn delete(&self, path: &str) -> Result<Value, ApiError> {
        self.send_json(self.request(HttpMethod::Delete, path)).await
    }

    /// Refreshes the session through the shared single-flight refresh.
    ///
    /// # Errors
    ///
    /// Returns the refresh error; the session is cleared by then.
    pub async fn refresh_session(&self) -> Result<TokenPair, ApiError> {
        self.refresh.refresh_session().await
    }

    /// The session token store.
    #[must_use]
    pub fn token_store(&self) -> &TokenStore {
        &self.store
    }

    /// The auth event bus.
    #[must_use]
    pub fn events(&self) -> &AuthEventBus {
        &self.events
    }

    /// The settings this client was built with.
    #[must_use]
    pub const fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    /// The refresh coordinator, for diagnostics.
    #[must_use]
    pub const fn refresh_coordinator(&self) -> &RefreshCoordinator {
        &self.refresh
    }

    async fn send_json(&self, request: ApiRequest) -> Result<Value, ApiError> {
        self.send(request).await?.json_value()
    }
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("api_url", &self.settings.api_url)
            .field("store", &self.store)
            .field("refresh", &self.refresh)
            .finish_non_exhaustive()
    }
}
