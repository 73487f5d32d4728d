//! Snapshot persistence.
//!
//! The coordinator saves every successful snapshot before publishing it.
//! [`JsonFileStorage`] keeps one JSON file per server; [`MemoryStorage`] is
//! for tests and runs that don't need to survive a restart.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use tvhepg_api::BoxFuture;
use tvhepg_core::EpgSnapshot;

/// On-disk format version.
const FORMAT_VERSION: u32 = 1;

/// Errors from snapshot storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the backing file failed.
    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The snapshot could not be encoded.
    #[error("failed to encode snapshot: {0}")]
    Encode(#[source] serde_json::Error),

    /// The stored file is not a snapshot we understand.
    #[error("corrupt snapshot file {path}: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Where snapshots are persisted.
///
/// `save` is called with the latest snapshot after every successful fetch
/// and must be safe to repeat.
pub trait EpgStorage: Send + Sync {
    /// Persists the snapshot, replacing any previous one.
    fn save<'a>(&'a self, snapshot: &'a EpgSnapshot) -> BoxFuture<'a, StorageResult<()>>;

    /// Loads the last persisted snapshot, if any.
    fn load(&self) -> BoxFuture<'_, StorageResult<Option<EpgSnapshot>>>;
}

#[derive(Serialize, Deserialize)]
struct StoredSnapshot {
    version: u32,
    snapshot: EpgSnapshot,
}

/// Stores the snapshot as a JSON file.
///
/// Writes go to a temporary sibling file that is then renamed over the
/// target, so a crash mid-write leaves the previous snapshot intact.
#[derive(Debug, Clone)]
pub struct JsonFileStorage {
    path: PathBuf,
}

impl JsonFileStorage {
    /// Creates a storage backed by the given file.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Creates a storage for `server_id` inside `data_dir`.
    pub fn for_server(data_dir: impl AsRef<Path>, server_id: &str) -> Self {
        Self::new(data_dir.as_ref().join(format!("{}.json", server_id)))
    }

    /// Returns the backing file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    async fn write(&self, snapshot: &EpgSnapshot) -> StorageResult<()> {
        let stored = StoredSnapshot {
            version: FORMAT_VERSION,
            snapshot: snapshot.clone(),
        };
        let bytes = serde_json::to_vec(&stored).map_err(StorageError::Encode)?;

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| StorageError::io(parent, e))?;
        }

        let temp = self.temp_path();
        tokio::fs::write(&temp, &bytes)
            .await
            .map_err(|e| StorageError::io(&temp, e))?;
        tokio::fs::rename(&temp, &self.path)
            .await
            .map_err(|e| StorageError::io(&self.path, e))?;

        debug!(
            path = %self.path.display(),
            events = snapshot.len(),
            bytes = bytes.len(),
            "Saved EPG snapshot"
        );
        Ok(())
    }

    async fn read(&self) -> StorageResult<Option<EpgSnapshot>> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(StorageError::io(&self.path, e)),
        };

        let stored: StoredSnapshot =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Corrupt {
                path: self.path.clone(),
                source: e,
            })?;

        if stored.version != FORMAT_VERSION {
            warn!(
                path = %self.path.display(),
                version = stored.version,
                "Ignoring snapshot with unknown format version"
            );
            return Ok(None);
        }

        Ok(Some(stored.snapshot))
    }
}

impl EpgStorage for JsonFileStorage {
    fn save<'a>(&'a self, snapshot: &'a EpgSnapshot) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(self.write(snapshot))
    }

    fn load(&self) -> BoxFuture<'_, StorageResult<Option<EpgSnapshot>>> {
        Box::pin(self.read())
    }
}

/// Keeps the snapshot in memory.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    snapshot: RwLock<Option<EpgSnapshot>>,
    saves: AtomicUsize,
}

impl MemoryStorage {
    /// Creates an empty storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of completed saves.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl EpgStorage for MemoryStorage {
    fn save<'a>(&'a self, snapshot: &'a EpgSnapshot) -> BoxFuture<'a, StorageResult<()>> {
        Box::pin(async move {
            *self.snapshot.write().await = Some(snapshot.clone());
            self.saves.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }

    fn load(&self) -> BoxFuture<'_, StorageResult<Option<EpgSnapshot>>> {
        Box::pin(async move { Ok(self.snapshot.read().await.clone()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tvhepg_core::EpgEvent;

    fn snapshot(titles: &[&str]) -> EpgSnapshot {
        let events = titles
            .iter()
            .map(|t| serde_json::from_value::<EpgEvent>(json!({"title": t})).unwrap())
            .collect();
        EpgSnapshot::new(events)
    }

    #[tokio::test]
    async fn file_storage_load_missing_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::for_server(dir.path(), "tvh");

        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_storage_roundtrip_and_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::for_server(dir.path().join("nested"), "tvh");

        storage.save(&snapshot(&["a", "b"])).await.unwrap();
        let second = snapshot(&["c"]);
        storage.save(&second).await.unwrap();
        storage.save(&second).await.unwrap();

        let loaded = storage.load().await.unwrap().unwrap();
        assert_eq!(loaded, second);
        assert!(storage.path().ends_with("nested/tvh.json"));
        assert!(!storage.temp_path().exists());
    }

    #[tokio::test]
    async fn file_storage_reports_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::for_server(dir.path(), "tvh");
        std::fs::write(storage.path(), b"{not json").unwrap();

        let err = storage.load().await.unwrap_err();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[tokio::test]
    async fn file_storage_ignores_unknown_version() {
        let dir = tempfile::tempdir().unwrap();
        let storage = JsonFileStorage::for_server(dir.path(), "tvh");
        let body = json!({"version": 99, "snapshot": snapshot(&["x"])});
        std::fs::write(storage.path(), serde_json::to_vec(&body).unwrap()).unwrap();

        assert!(storage.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn file_storage_write_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        // A regular file where the parent directory should be.
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"").unwrap();
        let storage = JsonFileStorage::for_server(&blocker, "tvh");

        let err = storage.save(&snapshot(&["x"])).await.unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[tokio::test]
    async fn memory_storage_counts_saves() {
        let storage = MemoryStorage::new();
        assert!(storage.load().await.unwrap().is_none());

        let snap = snapshot(&["a"]);
        storage.save(&snap).await.unwrap();
        storage.save(&snap).await.unwrap();

        assert_eq!(storage.save_count(), 2);
        assert_eq!(storage.load().await.unwrap(), Some(snap));
    }
}
