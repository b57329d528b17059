//! Composition root: wires settings, storage and transport into a client.

use std::sync::Arc;

use docflow_application::ports::{HttpTransport, TokenStorage, TransportError};
use docflow_application::{ApiClient, AuthEventBus, AuthService, TokenStore};
use docflow_domain::ClientSettings;

use crate::adapters::ReqwestTransport;
use crate::persistence::{FileTokenStorage, MemoryTokenStorage};

/// Errors raised while assembling a [`Session`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The HTTP client could not be built.
    #[error("could not create HTTP client: {0}")]
    Transport(#[from] TransportError),
}

/// A ready-to-use API client and auth service sharing one session.
#[derive(Debug, Clone)]
pub struct Session {
    client: Arc<ApiClient>,
    auth: AuthService,
}

impl Session {
    /// Opens the session persisted at `settings.token_file`, or an
    /// in-memory one when no file is configured.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn open(settings: ClientSettings) -> Result<Self, SessionError> {
        let storage: Arc<dyn TokenStorage> = match &settings.token_file {
            Some(path) => Arc::new(FileTokenStorage::new(path)),
            None => Arc::new(MemoryTokenStorage::new()),
        };
        Self::with_storage(settings, storage)
    }

    /// Opens a session over the given storage.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_storage(
        settings: ClientSettings,
        storage: Arc<dyn TokenStorage>,
    ) -> Result<Self, SessionError> {
        let transport: Arc<dyn HttpTransport> = Arc::new(ReqwestTransport::new(&settings)?);
        Ok(Self::assemble(settings, transport, storage))
    }

    /// Wires the parts together.
    #[must_use]
    pub fn assemble(
        settings: ClientSettings,
        transport: Arc<dyn HttpTransport>,
        storage: Arc<dyn TokenStorage>,
    ) -> Self {
        let events = Arc::new(AuthEventBus::new());
        let store = Arc::new(TokenStore::new(storage, Arc::clone(&events)));
        let client = Arc::new(ApiClient::new(settings, transport, store, events));
        let auth = AuthService::new(Arc::clone(&client));
        Self { client, auth }
    }

    /// The shared API client.
    #[must_use]
    pub const fn client(&self) -> &Arc<ApiClient> {
        &self.client
    }

    /// The auth service.
    #[must_use]
    pub const fn auth(&self) -> &AuthService {
        &self.auth
    }

    /// The auth event bus.
    #[must_use]
    pub fn events(&self) -> &AuthEventBus {
        self.client.events()
    }

    /// The token store.
    #[must_use]
    pub fn tokens(&self) -> &TokenStore {
        self.client.token_store()
    }
}
