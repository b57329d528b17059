//! Session token store.
//!
//! Single source of truth for the current bearer credentials. Durable
//! storage is the primary copy; an in-memory mirror takes over for the rest
//! of the process once durable storage fails.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use docflow_domain::{AuthEvent, TokenPair};
use parking_lot::RwLock;

use crate::auth::AuthEventBus;
use crate::ports::{StorageError, TokenStorage};

/// Storage key of the access token.
pub const ACCESS_TOKEN_KEY: &str = "accessToken";
/// Storage key of the refresh token.
pub const REFRESH_TOKEN_KEY: &str = "refreshToken";

/// Thread-safe holder of the current [`TokenPair`].
pub struct TokenStore {
    storage: Arc<dyn TokenStorage>,
    memory: RwLock<TokenPair>,
    degraded: AtomicBool,
    events: Arc<AuthEventBus>,
}

impl TokenStore {
    /// Creates a store over `storage`, loading any persisted session into
    /// the memory mirror.
    #[must_use]
    pub fn new(storage: Arc<dyn TokenStorage>, events: Arc<AuthEventBus>) -> Self {
        let store = Self {
            storage,
            memory: RwLock::new(TokenPair::default()),
            degraded: AtomicBool::new(false),
            events,
        };
        let persisted = TokenPair {
            access_token: store.read_durable(ACCESS_TOKEN_KEY),
            refresh_token: store.read_durable(REFRESH_TOKEN_KEY),
        };
        *store.memory.write() = persisted;
        store
    }

    /// Current access token, if any.
    #[must_use]
    pub fn access_token(&self) -> Option<String> {
        self.read(ACCESS_TOKEN_KEY, |pair| pair.access_token.clone())
    }

    /// Current refresh token, if any.
    #[must_use]
    pub fn refresh_token(&self) -> Option<String> {
        self.read(REFRESH_TOKEN_KEY, |pair| pair.refresh_token.clone())
    }

    /// Both tokens.
    #[must_use]
    pub fn snapshot(&self) -> TokenPair {
        TokenPair {
            access_token: self.access_token(),
            refresh_token: self.refresh_token(),
        }
    }

    /// Returns true if an access token is present.
    #[must_use]
    pub fn is_authenticated(&self) -> bool {
        self.access_token().is_some()
    }

    /// Returns true once durable storage has failed and the session lives in
    /// memory only.
    #[must_use]
    pub fn is_degraded(&self) -> bool {
        self.degraded.load(Ordering::Acquire)
    }

    /// Stores the non-empty fields of `pair`.
    ///
    /// A missing or empty field leaves the stored value untouched, so a
    /// refresh response without a rotated refresh token keeps the old one.
    pub fn set_tokens(&self, pair: &TokenPair) {
        let fields = [
            (ACCESS_TOKEN_KEY, pair.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, pair.refresh_token.as_deref()),
        ];

        let mut memory = self.memory.write();
        for (key, value) in fields {
            let Some(value) = value.filter(|v| !v.is_empty()) else {
                continue;
            };
            match key {
                ACCESS_TOKEN_KEY => memory.access_token = Some(value.to_string()),
                _ => memory.refresh_token = Some(value.to_string()),
            }
            if !self.is_degraded()
                && let Err(error) = self.storage.set(key, value)
            {
                self.degrade(&error);
            }
        }
    }

    /// Makes `pair` the whole session: present fields are stored and
    /// missing or empty ones removed. Emits no event.
    pub fn replace_tokens(&self, pair: &TokenPair) {
        let next = TokenPair {
            access_token: pair.access_token.clone().filter(|v| !v.is_empty()),
            refresh_token: pair.refresh_token.clone().filter(|v| !v.is_empty()),
        };

        let mut memory = self.memory.write();
        for (key, value) in [
            (ACCESS_TOKEN_KEY, next.access_token.as_deref()),
            (REFRESH_TOKEN_KEY, next.refresh_token.as_deref()),
        ] {
            let result = match value {
                Some(value) => self.storage.set(key, value),
                None => self.storage.remove(key),
            };
            if let Err(error) = result {
                self.degrade(&error);
            }
        }
        *memory = next;
    }

    /// Removes both tokens everywhere, then emits [`AuthEvent::Logout`].
    pub fn clear(&self) {
        *self.memory.write() = TokenPair::default();

        // Attempted even when degraded: a store that refused writes may
        // still accept removals.
        for key in [ACCESS_TOKEN_KEY, REFRESH_TOKEN_KEY] {
            if let Err(error) = self.storage.remove(key) {
                // The durable copy may still hold the old token; stop
                // reading from it.
                self.degrade(&error);
            }
        }

        tracing::debug!("session tokens cleared");
        self.events.emit(AuthEvent::Logout);
    }

    fn read(&self, key: &str, from_memory: impl Fn(&TokenPair) -> Option<String>) -> Option<String> {
        if !self.is_degraded() {
            match self.storage.get(key) {
                Ok(value) => return value.filter(|v| !v.is_empty()),
                Err(error) => self.degrade(&error),
            }
        }
        from_memory(&self.memory.read())
    }

    fn read_durable(&self, key: &str) -> Option<String> {
        match self.storage.get(key) {
            Ok(value) => value.filter(|v| !v.is_empty()),
            Err(error) => {
                self.degrade(&error);
                None
            }
        }
    }

    fn degrade(&self, error: &StorageError) {
        if !self.degraded.swap(true, Ordering::AcqRel) {
            tracing::warn!(%error, "token storage unavailable, keeping the session in memory only");
        }
    }
}

impl fmt::Debug for TokenStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let memory = self.memory.read();
        f.debug_struct("TokenStore")
            .field("has_access_token", &memory.access_token.is_some())
            .field("has_refresh_token", &memory.refresh_token.is_some())
            .field("degraded", &self.is_degraded())
            .finish_non_exhaustive()
    }
}
