//! Local file-based state storage backend.
//!
//! All records live in a single JSON file that is rewritten atomically on
//! every change.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::{ProviderError, Result, StateError};

use super::store::StateStore;
use super::types::{ResourceRecord, StateFile, STATE_VERSION};

/// Default state directory name.
pub const STATE_DIR: &str = ".hcloud-image";

/// State file name.
const STATE_FILE: &str = "state.json";

/// Local file-based state store.
#[derive(Debug)]
pub struct LocalStateStore {
    /// Base directory for state files.
    base_dir: PathBuf,
    /// Path to the state file.
    state_path: PathBuf,
}

impl LocalStateStore {
    /// Creates a new local state store below the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the current directory cannot be determined.
    pub fn new() -> Result<Self> {
        let base_dir = std::env::current_dir()?.join(STATE_DIR);
        Ok(Self::with_base_dir(base_dir))
    }

    /// Creates a new local state store with a custom base directory.
    #[must_use]
    pub fn with_base_dir(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        let state_path = base_dir.join(STATE_FILE);

        Self {
            base_dir,
            state_path,
        }
    }

    /// Returns the path of the state file.
    #[must_use]
    pub fn state_path(&self) -> &Path {
        &self.state_path
    }

    /// Ensures the state directory exists.
    async fn ensure_dir(&self) -> Result<()> {
        if !self.base_dir.exists() {
            debug!("Creating state directory: {}", self.base_dir.display());
            fs::create_dir_all(&self.base_dir).await.map_err(|e| {
                ProviderError::State(StateError::write(format!(
                    "Failed to create state directory: {e}"
                )))
            })?;
        }
        Ok(())
    }

    /// Reads the whole state file, or an empty one if it does not exist.
    async fn read_file(&self) -> Result<StateFile> {
        if !self.state_path.exists() {
            debug!("State file does not exist: {}", self.state_path.display());
            return Ok(StateFile::default());
        }

        let content = fs::read_to_string(&self.state_path).await.map_err(|e| {
            ProviderError::State(StateError::Corrupted {
                message: format!("Failed to read state file: {e}"),
            })
        })?;

        let file: StateFile = serde_json::from_str(&content).map_err(|e| {
            ProviderError::State(StateError::Corrupted {
                message: format!("Failed to parse state file: {e}"),
            })
        })?;

        if file.version != STATE_VERSION {
            return Err(ProviderError::State(StateError::VersionMismatch {
                expected: STATE_VERSION.to_string(),
                found: file.version,
            }));
        }

        Ok(file)
    }

    /// Writes the whole state file.
    async fn write_file(&self, file: &StateFile) -> Result<()> {
        self.ensure_dir().await?;

        let content = serde_json::to_string_pretty(file).map_err(|e| {
            ProviderError::State(StateError::serialization(format!(
                "Failed to serialize state: {e}"
            )))
        })?;

        // Write to a temporary file first, then rename for atomicity
        let temp_path = self.state_path.with_extension("tmp");

        let mut handle = fs::File::create(&temp_path).await.map_err(|e| {
            ProviderError::State(StateError::write(format!(
                "Failed to create temp state file: {e}"
            )))
        })?;

        handle.write_all(content.as_bytes()).await.map_err(|e| {
            ProviderError::State(StateError::write(format!("Failed to write state file: {e}")))
        })?;

        handle.sync_all().await.map_err(|e| {
            ProviderError::State(StateError::write(format!("Failed to sync state file: {e}")))
        })?;

        fs::rename(&temp_path, &self.state_path).await.map_err(|e| {
            ProviderError::State(StateError::write(format!(
                "Failed to rename state file: {e}"
            )))
        })?;

        debug!("State saved to {}", self.state_path.display());
        Ok(())
    }
}

#[async_trait]
impl StateStore for LocalStateStore {
    async fn load(&self, name: &str) -> Result<Option<ResourceRecord>> {
        let mut file = self.read_file().await?;
        Ok(file.resources.remove(name))
    }

    async fn save(&self, record: &ResourceRecord) -> Result<()> {
        let mut file = self.read_file().await?;

        info!("Saving state of {} (image {})", record.name, record.id);
        file.resources.insert(record.name.clone(), record.clone());

        self.write_file(&file).await
    }

    async fn remove(&self, name: &str) -> Result<bool> {
        let mut file = self.read_file().await?;

        if file.resources.remove(name).is_none() {
            debug!("No state recorded for {name}");
            return Ok(false);
        }

        info!("Removing state of {name}");
        self.write_file(&file).await?;
        Ok(true)
    }

    async fn list(&self) -> Result<Vec<ResourceRecord>> {
        let file = self.read_file().await?;
        Ok(file.resources.into_values().collect())
    }

    fn backend_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImageSpec;
    use crate::state::to_state;
    use tempfile::TempDir;

    fn create_test_store() -> (LocalStateStore, TempDir) {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = LocalStateStore::with_base_dir(temp_dir.path().join("state"));
        (store, temp_dir)
    }

    fn record(name: &str, id: &str) -> ResourceRecord {
        let spec = ImageSpec::new("token", "https://example.com/a.raw", "x86");
        ResourceRecord::new(id, name, to_state(&spec))
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let (store, _temp) = create_test_store();

        store.save(&record("talos", "42")).await.expect("Failed to save state");

        let loaded = store
            .load("talos")
            .await
            .expect("Failed to load state")
            .expect("State should exist");

        assert_eq!(loaded.id, "42");
        assert_eq!(loaded.state.inputs.architecture, "x86");
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let (store, _temp) = create_test_store();

        let result = store.load("talos").await.expect("Load should not fail");
        assert!(result.is_none());
    }

    #[tokio::test]
    async fn test_records_are_independent() {
        let (store, _temp) = create_test_store();

        store.save(&record("a", "1")).await.expect("save a");
        store.save(&record("b", "2")).await.expect("save b");
        store.save(&record("a", "3")).await.expect("overwrite a");

        let ids: Vec<_> = store
            .list()
            .await
            .expect("list")
            .into_iter()
            .map(|r| (r.name, r.id))
            .collect();

        assert_eq!(
            ids,
            vec![
                (String::from("a"), String::from("3")),
                (String::from("b"), String::from("2")),
            ]
        );
    }

    #[tokio::test]
    async fn test_remove() {
        let (store, _temp) = create_test_store();

        store.save(&record("talos", "42")).await.expect("save");

        assert!(store.remove("talos").await.expect("remove"));
        assert!(!store.remove("talos").await.expect("second remove"));
        assert!(store.load("talos").await.expect("load").is_none());
    }

    #[tokio::test]
    async fn test_version_mismatch() {
        let (store, _temp) = create_test_store();
        store.save(&record("talos", "42")).await.expect("save");

        let content = std::fs::read_to_string(store.state_path()).expect("read");
        let content = content.replace("\"1.0\"", "\"0.1\"");
        std::fs::write(store.state_path(), content).expect("write");

        let result = store.load("talos").await;
        assert!(matches!(
            result,
            Err(ProviderError::State(StateError::VersionMismatch { .. }))
        ));
    }

    #[tokio::test]
    async fn test_corrupted_file() {
        let (store, _temp) = create_test_store();
        store.save(&record("talos", "42")).await.expect("save");
        std::fs::write(store.state_path(), "not json").expect("write");

        let result = store.list().await;
        assert!(matches!(
            result,
            Err(ProviderError::State(StateError::Corrupted { .. }))
        ));
    }
}
