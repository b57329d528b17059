//! In-memory fakes shared by the unit tests of this crate.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use docflow_domain::{
    ApiRequest, ApiResponse, AuthEvent, ClientSettings, RefreshedTokens, TokenPair,
};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::Notify;

use crate::auth::{AuthEventBus, TokenStore};
use crate::client::ApiClient;
use crate::ports::{HttpTransport, StorageError, TokenStorage, TransportError, TransportFuture};

pub const BASE_URL: &str = "http://api.test";

/// Plain map storage that never fails.
#[derive(Default)]
pub struct MapStorage {
    values: Mutex<HashMap<String, String>>,
}

impl MapStorage {
    pub fn insert(&self, key: &str, value: &str) {
        self.values.lock().insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.values.lock().get(key).cloned()
    }
}

impl TokenStorage for MapStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.value(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.insert(key, value);
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.values.lock().remove(key);
        Ok(())
    }
}

/// Map storage that can be switched into failure modes.
#[derive(Default)]
pub struct FlakyStorage {
    inner: MapStorage,
    fail_writes: AtomicBool,
    fail_reads: AtomicBool,
}

impl FlakyStorage {
    pub fn fail_writes(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
    }

    pub fn fail_everything(&self) {
        self.fail_writes.store(true, Ordering::SeqCst);
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    fn quota() -> StorageError {
        StorageError::Unavailable("quota exceeded".to_string())
    }
}

impl TokenStorage for FlakyStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(Self::quota());
        }
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::quota());
        }
        self.inner.set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(Self::quota());
        }
        self.inner.remove(key)
    }
}

/// Counts emissions of one event.
#[derive(Clone)]
pub struct EventCounter(Arc<AtomicUsize>);

impl EventCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

pub fn event_counter(events: &AuthEventBus, event: AuthEvent) -> EventCounter {
    let count = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&count);
    events.on(event, move || {
        seen.fetch_add(1, Ordering::SeqCst);
    });
    EventCounter(count)
}

/// Scripted backend.
///
/// Fixed routes answer with a canned reply. `/auth/refresh` answers with the
/// configured refresh reply, optionally after a gate is opened, and on
/// success starts accepting the new access token. Every other path is a
/// protected resource that echoes the URL and bearer token when the token is
/// accepted, and answers 401 otherwise.
pub struct FakeBackend {
    accepted_token: Mutex<Option<String>>,
    frozen: AtomicBool,
    refresh_reply: Mutex<(u16, Value)>,
    refresh_gate: Mutex<Option<Arc<Notify>>>,
    routes: Mutex<HashMap<String, (u16, Value)>>,
    offline_routes: Mutex<Vec<String>>,
    log: Mutex<Vec<ApiRequest>>,
}

impl FakeBackend {
    pub fn accepting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            accepted_token: Mutex::new(Some(token.to_string())),
            frozen: AtomicBool::new(false),
            refresh_reply: Mutex::new((
                200,
                json!({"accessToken": "A2", "refreshToken": "R2"}),
            )),
            refresh_gate: Mutex::new(None),
            routes: Mutex::new(HashMap::new()),
            offline_routes: Mutex::new(Vec::new()),
            log: Mutex::new(Vec::new()),
        })
    }

    /// Every protected call is rejected, even after a refresh.
    pub fn reject_all(&self) {
        *self.accepted_token.lock() = None;
        self.frozen.store(true, Ordering::SeqCst);
    }

    pub fn on_refresh(&self, status: u16, body: Value) {
        *self.refresh_reply.lock() = (status, body);
    }

    /// Makes the next refresh wait until the returned gate is notified.
    pub fn hold_refresh(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.refresh_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    pub fn route(&self, path: &str, status: u16, body: Value) {
        self.routes.lock().insert(path.to_string(), (status, body));
    }

    pub fn offline(&self, path: &str) {
        self.offline_routes.lock().push(path.to_string());
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.log.lock().clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.count(|request| request.url.ends_with("/auth/refresh"))
    }

    pub fn count(&self, predicate: impl Fn(&ApiRequest) -> bool) -> usize {
        self.log.lock().iter().filter(|request| predicate(request)).count()
    }

    fn path(url: &str) -> &str {
        url.strip_prefix(BASE_URL).unwrap_or(url)
    }
}

impl HttpTransport for FakeBackend {
    fn execute(&self, request: &ApiRequest) -> TransportFuture<'_> {
        self.log.lock().push(request.clone());
        let request = request.clone();

        Box::pin(async move {
            let path = Self::path(&request.url).to_string();

            if self.offline_routes.lock().iter().any(|p| *p == path) {
                return Err(TransportError::ConnectionFailed(format!("{path} unreachable")));
            }

            if path == "/auth/refresh" {
                let gate = self.refresh_gate.lock().take();
                if let Some(gate) = gate {
                    gate.notified().await;
                }
                let (status, body) = self.refresh_reply.lock().clone();
                if (200..300).contains(&status)
                    && !self.frozen.load(Ordering::SeqCst)
                    && let Some(tokens) = RefreshedTokens::from_auth_body(&body)
                {
                    *self.accepted_token.lock() = Some(tokens.access_token);
                }
                return Ok(ApiResponse::json(status, &body));
            }

            if let Some((status, body)) = self.routes.lock().get(&path).cloned() {
                return Ok(ApiResponse::json(status, &body));
            }

            let accepted = self.accepted_token.lock().clone();
            match request.bearer_token() {
                Some(token) if Some(token) == accepted.as_deref() => Ok(ApiResponse::json(
                    200,
                    &json!({"path": path, "token": token}),
                )),
                _ => Ok(ApiResponse::json(401, &json!({"message": "jwt expired"}))),
            }
        })
    }
}

/// A client wired to `backend` with an in-memory session.
pub struct Harness {
    pub backend: Arc<FakeBackend>,
    pub storage: Arc<MapStorage>,
    pub events: Arc<AuthEventBus>,
    pub client: Arc<ApiClient>,
}

impl Harness {
    pub fn new(backend: Arc<FakeBackend>, session: &TokenPair) -> Self {
        Self::with_settings(backend, session, ClientSettings::with_api_url(BASE_URL))
    }

    pub fn with_settings(
        backend: Arc<FakeBackend>,
        session: &TokenPair,
        settings: ClientSettings,
    ) -> Self {
        let storage = Arc::new(MapStorage::default());
        let events = Arc::new(AuthEventBus::new());
        let store = Arc::new(TokenStore::new(
            Arc::clone(&storage) as Arc<dyn TokenStorage>,
            Arc::clone(&events),
        ));
        store.set_tokens(session);
        let client = Arc::new(ApiClient::new(
            settings,
            Arc::clone(&backend) as Arc<dyn HttpTransport>,
            store,
            Arc::clone(&events),
        ));
        Self {
            backend,
            storage,
            events,
            client,
        }
    }

    pub fn store(&self) -> &TokenStore {
        self.client.token_store()
    }
}

/// Yields until `condition` holds, so spawned tasks can reach their await
/// points on the current-thread runtime.
pub async fn settle(condition: impl Fn() -> bool) {
    for _ in 0..10_000 {
        if condition() {
            return;
        }
        tokio::task::yield_now().await;
    }
    panic!("condition not reached");
}
