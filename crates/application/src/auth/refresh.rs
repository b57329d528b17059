//! Single-flight token refresh.
//!
//! When a request fails with 401, [`RefreshCoordinator`] makes sure exactly
//! one `/auth/refresh` call is in flight. Requests that fail while it runs
//! are queued and replayed with the new access token once it settles.
//!
//! Queued requests are replayed one after another in arrival order, and the
//! request that started the refresh is replayed last. If the refresh fails
//! the session is cleared and every waiter receives the same error.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use docflow_domain::{
    ApiError, ApiRequest, ApiResponse, AuthEvent, ClientSettings, HttpMethod, RefreshedTokens,
    TokenPair, token_preview,
};
use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::oneshot;

use crate::auth::{AuthEventBus, TokenStore};
use crate::ports::HttpTransport;

type Reply<T> = oneshot::Sender<Result<T, ApiError>>;

/// A caller waiting for the in-flight refresh to settle.
enum Waiter {
    /// A failed request to replay with the new token.
    Request {
        request: ApiRequest,
        reply: Reply<ApiResponse>,
    },
    /// An explicit refresh that joined the one in flight.
    Session(Reply<TokenPair>),
}

impl Waiter {
    fn reject(self, error: ApiError) {
        // A closed channel means the caller gave up waiting.
        match self {
            Self::Request { reply, .. } => {
                let _ = reply.send(Err(error));
            }
            Self::Session(reply) => {
                let _ = reply.send(Err(error));
            }
        }
    }
}

enum RefreshState {
    Idle,
    Refreshing { queue: VecDeque<Waiter> },
}

/// Outcome of trying to take the refresh.
enum Claim<'a, T, P> {
    /// The caller runs the refresh and must settle the lease.
    Leader(RefreshLease<'a>, P),
    /// A refresh is already running; the caller was queued behind it.
    Queued(oneshot::Receiver<Result<T, ApiError>>),
}

/// Ownership of the `Refreshing` state.
///
/// Dropping an unreleased lease, which happens when the leader future is
/// cancelled, puts the coordinator back to `Idle` and closes the queued
/// channels.
struct RefreshLease<'a> {
    state: &'a Mutex<RefreshState>,
    released: bool,
}

impl<'a> RefreshLease<'a> {
    const fn new(state: &'a Mutex<RefreshState>) -> Self {
        Self {
            state,
            released: false,
        }
    }

    /// Returns to `Idle` and hands back the queued waiters.
    fn release(mut self) -> VecDeque<Waiter> {
        self.released = true;
        self.take_queue()
    }

    fn take_queue(&self) -> VecDeque<Waiter> {
        match std::mem::replace(&mut *self.state.lock(), RefreshState::Idle) {
            RefreshState::Refreshing { queue } => queue,
            RefreshState::Idle => VecDeque::new(),
        }
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.released {
            let abandoned = self.take_queue();
            tracing::warn!(waiters = abandoned.len(), "token refresh cancelled");
        }
    }
}

/// Coordinates access-token refreshes for one API client.
pub struct RefreshCoordinator {
    transport: Arc<dyn HttpTransport>,
    store: Arc<TokenStore>,
    events: Arc<AuthEventBus>,
    refresh_url: String,
    timeout: Option<Duration>,
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    /// Creates an idle coordinator refreshing against `settings`' API.
    #[must_use]
    pub fn new(
        settings: &ClientSettings,
        transport: Arc<dyn HttpTransport>,
        store: Arc<TokenStore>,
        events: Arc<AuthEventBus>,
    ) -> Self {
        Self {
            transport,
            store,
            events,
            refresh_url: settings.endpoint("/auth/refresh"),
            timeout: settings.refresh_timeout(),
            state: Mutex::new(RefreshState::Idle),
        }
    }

    /// Returns true while a refresh call is outstanding.
    #[must_use]
    pub fn is_refreshing(&self) -> bool {
        matches!(*self.state.lock(), RefreshState::Refreshing { .. })
    }

    /// Number of callers queued behind the outstanding refresh.
    #[must_use]
    pub fn pending_waiters(&self) -> usize {
        match &*self.state.lock() {
            RefreshState::Refreshing { queue } => queue.len(),
            RefreshState::Idle => 0,
        }
    }

    /// Recovers from a failed response to `request`.
    ///
    /// Only a first 401 on a request that takes part in the refresh protocol
    /// is recovered: the session is refreshed (or the outstanding refresh
    /// joined) and the request replayed once with the new access token.
    /// Anything else is returned as the matching [`ApiError`].
    ///
    /// # Errors
    ///
    /// Returns the response's error when it is not recoverable, the refresh
    /// error when the refresh fails, or the replay's error.
    pub async fn handle_unauthorized(
        &self,
        request: ApiRequest,
        response: ApiResponse,
    ) -> Result<ApiResponse, ApiError> {
        if request.skip_refresh || request.retried || !response.is_unauthorized() {
            return Err(response.to_error());
        }

        let mut request = request;
        request.retried = true;

        if let Some(current) = self.store.access_token()
            && request.bearer_token() != Some(current.as_str())
        {
            tracing::debug!(
                request_id = %request.id,
                "session changed while the request was in flight, replaying"
            );
            return self.replay(request, &current).await;
        }

        match self.claim_for_request(request) {
            Claim::Queued(receiver) => Self::wait_for_refresh(receiver).await,
            Claim::Leader(lease, request) => {
                let access_token = self.refresh(lease).await?;
                self.replay(request, &access_token).await
            }
        }
    }

    /// Refreshes the session, joining the outstanding refresh if there is
    /// one, and returns the tokens in effect afterwards.
    ///
    /// # Errors
    ///
    /// Returns the refresh error. The session has been cleared by then.
    pub async fn refresh_session(&self) -> Result<TokenPair, ApiError> {
        match self.claim_for_session() {
            Claim::Queued(receiver) => Self::wait_for_refresh(receiver).await,
            Claim::Leader(lease, ()) => {
                self.refresh(lease).await?;
                Ok(self.store.snapshot())
            }
        }
    }

    fn claim_for_request(&self, request: ApiRequest) -> Claim<'_, ApiResponse, ApiRequest> {
        let mut state = self.state.lock();
        if let RefreshState::Refreshing { queue } = &mut *state {
            let (reply, receiver) = oneshot::channel();
            tracing::debug!(
                request_id = %request.id,
                position = queue.len(),
                "queued behind token refresh"
            );
            queue.push_back(Waiter::Request { request, reply });
            return Claim::Queued(receiver);
        }
        *state = RefreshState::Refreshing {
            queue: VecDeque::new(),
        };
        Claim::Leader(RefreshLease::new(&self.state), request)
    }

    fn claim_for_session(&self) -> Claim<'_, TokenPair, ()> {
        let mut state = self.state.lock();
        if let RefreshState::Refreshing { queue } = &mut *state {
            let (reply, receiver) = oneshot::channel();
            queue.push_back(Waiter::Session(reply));
            return Claim::Queued(receiver);
        }
        *state = RefreshState::Refreshing {
            queue: VecDeque::new(),
        };
        Claim::Leader(RefreshLease::new(&self.state), ())
    }

    async fn wait_for_refresh<T>(
        receiver: oneshot::Receiver<Result<T, ApiError>>,
    ) -> Result<T, ApiError> {
        receiver
            .await
            .unwrap_or_else(|_| Err(ApiError::auth_expired("token refresh was cancelled")))
    }

    /// Runs the refresh as leader and settles every waiter.
    ///
    /// Returns the new access token for the leader's own replay.
    async fn refresh(&self, lease: RefreshLease<'_>) -> Result<String, ApiError> {
        let Some(refresh_token) = self.store.refresh_token() else {
            tracing::warn!("access token rejected and no refresh token stored, signing out");
            let error = ApiError::auth_expired("no refresh token available");
            self.fail(lease, &error);
            return Err(error);
        };

        tracing::info!(
            refresh_token = %token_preview(&refresh_token),
            "access token rejected, refreshing session"
        );

        match self.request_tokens(&refresh_token).await {
            Ok(tokens) => {
                let access_token = tokens.access_token.clone();
                self.store.set_tokens(&tokens.into());
                self.events.emit(AuthEvent::Refresh);
                tracing::info!(access_token = %token_preview(&access_token), "session refreshed");

                let waiters = lease.release();
                self.resume(waiters, &access_token).await;
                Ok(access_token)
            }
            Err(error) => {
                tracing::warn!(%error, "token refresh failed, signing out");
                self.fail(lease, &error);
                Err(error)
            }
        }
    }

    fn fail(&self, lease: RefreshLease<'_>, error: &ApiError) {
        self.store.clear();
        for waiter in lease.release() {
            waiter.reject(error.clone());
        }
    }

    async fn resume(&self, waiters: VecDeque<Waiter>, access_token: &str) {
        for waiter in waiters {
            match waiter {
                Waiter::Request { request, reply } => {
                    if reply.is_closed() {
                        continue;
                    }
                    let result = self.replay(request, access_token).await;
                    let _ = reply.send(result);
                }
                Waiter::Session(reply) => {
                    let _ = reply.send(Ok(self.store.snapshot()));
                }
            }
        }
    }

    /// Calls the refresh endpoint directly on the transport.
    async fn request_tokens(&self, refresh_token: &str) -> Result<RefreshedTokens, ApiError> {
        let request = ApiRequest::new(HttpMethod::Post, self.refresh_url.as_str())
            .with_header("Accept", "application/json")
            .with_json_body(json!({ "refreshToken": refresh_token }))
            .without_refresh();

        let call = self.transport.execute(&request);
        let response = match self.timeout {
            Some(limit) => tokio::time::timeout(limit, call).await.map_err(|_| {
                ApiError::network(format!("token refresh timed out after {}s", limit.as_secs()))
            })??,
            None => call.await?,
        };

        if !response.is_success() {
            return Err(ApiError::auth_expired(format!(
                "token refresh rejected: {}",
                response.error_message()
            )));
        }

        let body = response.json_value()?;
        RefreshedTokens::from_auth_body(&body)
            .ok_or_else(|| ApiError::auth_expired("token refresh response carried no access token"))
    }

    /// Sends `request` once more with `access_token`.
    async fn replay(
        &self,
        mut request: ApiRequest,
        access_token: &str,
    ) -> Result<ApiResponse, ApiError> {
        request.retried = true;
        request.set_bearer(access_token);
        tracing::debug!(
            request_id = %request.id,
            method = %request.method,
            url = %request.url,
            "replaying request"
        );

        let response = self.transport.execute(&request).await?;
        if response.is_success() {
            Ok(response)
        } else {
            Err(response.to_error())
        }
    }
}

impl fmt::Debug for RefreshCoordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RefreshCoordinator")
            .field("refresh_url", &self.refresh_url)
            .field("timeout", &self.timeout)
            .field("refreshing", &self.is_refreshing())
            .field("pending_waiters", &self.pending_waiters())
            .finish_non_exhaustive()
    }
}
