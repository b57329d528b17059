//! Durable token storage port

/// Errors that can occur while reading or writing durable storage.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// Storage is disabled, blocked or full.
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization error.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// String key/value storage that survives process restarts.
///
/// The API is synchronous because the request interceptor reads from it on
/// every outgoing call and must never suspend.
pub trait TokenStorage: Send + Sync {
    /// Reads a value. A missing key is `Ok(None)`.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Writes a value, replacing any previous one.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removes a value. Removing a missing key is not an error.
    ///
    /// # Errors
    /// Returns an error if the storage cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}
