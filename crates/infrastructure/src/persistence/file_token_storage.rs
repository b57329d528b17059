//! File-backed token storage.
//!
//! The session lives in a single JSON file, by default
//! `<config dir>/docflow/session.json`:
//! ```json
//! {
//!   "entries": {
//!     "accessToken": "eyJhbGciOi...",
//!     "refreshToken": "eyJhbGciOi..."
//!   },
//!   "schema_version": 1,
//!   "updated_at": "2026-03-02T09:14:07Z"
//! }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use docflow_application::ports::{StorageError, TokenStorage};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::serialization::{from_json_bytes, to_json_stable_bytes};

const SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Default, Serialize, Deserialize)]
struct SessionFile {
    schema_version: u32,
    #[serde(default)]
    entries: BTreeMap<String, String>,
    #[serde(default)]
    updated_at: Option<DateTime<Utc>>,
}

/// `TokenStorage` persisted to a JSON file.
///
/// Every read goes to disk, so tokens written by another process are picked
/// up. Writes replace the file atomically through a sibling temp file.
#[derive(Debug)]
pub struct FileTokenStorage {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileTokenStorage {
    /// Creates a storage for `path`. Nothing is touched until first use.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// The session file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<SessionFile, StorageError> {
        let bytes = match fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(error) if error.kind() == io::ErrorKind::NotFound => {
                return Ok(SessionFile::default());
            }
            Err(error) => return Err(error.into()),
        };

        match from_json_bytes::<SessionFile>(&bytes) {
            Ok(file) if file.schema_version <= SCHEMA_VERSION => Ok(file),
            Ok(file) => Err(StorageError::Serialization(format!(
                "unsupported session file version {}",
                file.schema_version
            ))),
            Err(error) => {
                // A damaged file holds no usable session; the next write
                // replaces it.
                tracing::warn!(
                    path = %self.path.display(),
                    %error,
                    "ignoring unreadable session file"
                );
                Ok(SessionFile::default())
            }
        }
    }

    fn update(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>),
    ) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock();

        let mut file = self.load()?;
        change(&mut file.entries);
        file.schema_version = SCHEMA_VERSION;
        file.updated_at = Some(Utc::now());

        let bytes =
            to_json_stable_bytes(&file).map_err(|e| StorageError::Serialization(e.to_string()))?;

        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir)?;
        }
        let temp = self.path.with_extension("json.tmp");
        fs::write(&temp, bytes)?;
        fs::rename(&temp, &self.path)?;
        Ok(())
    }
}

impl TokenStorage for FileTokenStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.load()?.entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        if !self.path.exists() {
            return Ok(());
        }
        self.update(|entries| {
            entries.remove(key);
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn storage() -> (TempDir, FileTokenStorage) {
        let dir = TempDir::new().unwrap();
        let storage = FileTokenStorage::new(dir.path().join("docflow").join("session.json"));
        (dir, storage)
    }

    #[test]
    fn test_missing_file_reads_as_signed_out() {
        let (_dir, storage) = storage();
        assert_eq!(storage.get("accessToken").unwrap(), None);
    }

    #[test]
    fn test_values_survive_a_new_instance() {
        let (_dir, storage) = storage();
        storage.set("accessToken", "a").unwrap();
        storage.set("refreshToken", "r").unwrap();

        let reopened = FileTokenStorage::new(storage.path());

        assert_eq!(reopened.get("accessToken").unwrap().as_deref(), Some("a"));
        assert_eq!(reopened.get("refreshToken").unwrap().as_deref(), Some("r"));
    }

    #[test]
    fn test_file_layout() {
        let (_dir, storage) = storage();
        storage.set("refreshToken", "r").unwrap();
        storage.set("accessToken", "a").unwrap();

        let raw: serde_json::Value =
            serde_json::from_slice(&fs::read(storage.path()).unwrap()).unwrap();

        assert_eq!(raw["schema_version"], 1);
        assert_eq!(
            raw["entries"],
            serde_json::json!({"accessToken": "a", "refreshToken": "r"})
        );
        assert!(raw["updated_at"].is_string());
        assert!(!storage.path().with_extension("json.tmp").exists());
    }

    #[test]
    fn test_remove_deletes_only_that_key() {
        let (_dir, storage) = storage();
        storage.set("accessToken", "a").unwrap();
        storage.set("refreshToken", "r").unwrap();

        storage.remove("accessToken").unwrap();

        assert_eq!(storage.get("accessToken").unwrap(), None);
        assert_eq!(storage.get("refreshToken").unwrap().as_deref(), Some("r"));
    }

    #[test]
    fn test_remove_without_file_does_not_create_it() {
        let (_dir, storage) = storage();
        storage.remove("accessToken").unwrap();
        assert!(!storage.path().exists());
    }

    #[test]
    fn test_damaged_file_is_replaced_on_write() {
        let (_dir, storage) = storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(storage.path(), b"{ not json").unwrap();

        assert_eq!(storage.get("accessToken").unwrap(), None);
        storage.set("accessToken", "a").unwrap();
        assert_eq!(storage.get("accessToken").unwrap().as_deref(), Some("a"));
    }

    #[test]
    fn test_newer_schema_is_an_error() {
        let (_dir, storage) = storage();
        fs::create_dir_all(storage.path().parent().unwrap()).unwrap();
        fs::write(storage.path(), br#"{"schema_version": 9, "entries": {}}"#).unwrap();

        assert!(matches!(
            storage.get("accessToken"),
            Err(StorageError::Serialization(_))
        ));
    }

    #[test]
    fn test_unwritable_location_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, b"").unwrap();
        let storage = FileTokenStorage::new(blocker.join("session.json"));

        assert!(matches!(storage.set("accessToken", "a"), Err(StorageError::Io(_))));
    }
}
