use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use pressroom_core::{StoreError, WorkingStore};
use serde_json::Value;
use tokio::fs;
use tracing::{debug, instrument};

/// Platform data directory for the store, e.g. `~/.local/share/pressroom`.
pub fn default_store_dir() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join("pressroom"))
}

/// Working store keeping one JSON file per key.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    /// Open (and create if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let root = root.into();
        fs::create_dir_all(&root).await.map_err(|e| {
            StoreError::Io(format!(
                "Failed to create store directory {}: {}",
                root.display(),
                e
            ))
        })?;
        debug!("Opened working store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Keys map straight to file names, so only `[A-Za-z0-9_-]` is allowed.
    fn key_path(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{}.json", key)))
    }
}

#[async_trait]
impl WorkingStore for JsonFileStore {
    #[instrument(skip(self), level = "debug")]
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        let path = self.key_path(key)?;
        match fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    #[instrument(skip(self, value), level = "debug")]
    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        let bytes = serde_json::to_vec_pretty(&value)?;

        // Write atomically via temp file
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, &bytes).await.map_err(|e| {
            StoreError::Io(format!(
                "Failed to write temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        fs::rename(&temp_path, &path).await.map_err(|e| {
            StoreError::Io(format!(
                "Failed to rename temp file to {}: {}",
                path.display(),
                e
            ))
        })?;

        debug!("Stored {} ({} bytes)", path.display(), bytes.len());
        Ok(())
    }

    #[instrument(skip(self), level = "debug")]
    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(StoreError::Io(format!(
                "Failed to delete {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pressroom_core::store::{self, AUTHORS_KEY, SETTINGS_KEY};
    use pressroom_core::{Author, ConnectionConfig};
    use serde_json::json;
    use tempfile::TempDir;

    async fn setup() -> (JsonFileStore, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(temp_dir.path().join("nested/store"))
            .await
            .unwrap();
        (store, temp_dir)
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let (store, _temp_dir) = setup().await;
        assert!(store.get("articles").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_get_delete() {
        let (store, _temp_dir) = setup().await;
        let value = json!([{"id": "1", "name": "Iris Rodríguez", "role": "Redacción"}]);

        store.put(AUTHORS_KEY, value.clone()).await.unwrap();
        assert_eq!(store.get(AUTHORS_KEY).await.unwrap(), Some(value));

        let on_disk = std::fs::read_to_string(store.root().join("authors.json")).unwrap();
        assert!(on_disk.contains("Iris Rodríguez"));
        assert!(!store.root().join("authors.json.tmp").exists());

        store.delete(AUTHORS_KEY).await.unwrap();
        assert!(store.get(AUTHORS_KEY).await.unwrap().is_none());
        store.delete(AUTHORS_KEY).await.unwrap();
    }

    #[tokio::test]
    async fn test_put_overwrites() {
        let (store, _temp_dir) = setup().await;
        store.put("articles", json!([1, 2, 3])).await.unwrap();
        store.put("articles", json!([])).await.unwrap();
        assert_eq!(store.get("articles").await.unwrap(), Some(json!([])));
    }

    #[tokio::test]
    async fn test_rejects_path_like_keys() {
        let (store, _temp_dir) = setup().await;
        for key in ["", "../escape", "a/b", "with space"] {
            let result = store.put(key, json!(null)).await;
            assert!(
                matches!(result, Err(StoreError::InvalidKey(_))),
                "key {:?} should be rejected",
                key
            );
        }
    }

    #[tokio::test]
    async fn test_corrupt_file_is_a_serialization_error() {
        let (store, _temp_dir) = setup().await;
        std::fs::write(store.root().join("authors.json"), b"{ not json").unwrap();
        assert!(matches!(
            store.get(AUTHORS_KEY).await,
            Err(StoreError::Serialization(_))
        ));
    }

    #[tokio::test]
    async fn test_typed_helpers_survive_reopen() {
        let (store, temp_dir) = setup().await;
        let authors = vec![Author {
            id: "5".to_string(),
            name: "Nerea F. Elena".to_string(),
            role: "Redacción".to_string(),
            image_url: None,
            extra: Default::default(),
        }];
        store::save_authors(&store, &authors).await.unwrap();
        store::save_config(
            &store,
            ConnectionConfig {
                access_token: "ghp_x".to_string(),
                repo_owner: "newsroom".to_string(),
                repo_name: "site".to_string(),
                file_path: "/public/data/db.json".to_string(),
                branch: "main".to_string(),
            },
        )
        .await
        .unwrap();

        let reopened = JsonFileStore::open(temp_dir.path().join("nested/store"))
            .await
            .unwrap();
        assert_eq!(store::load_authors(&reopened).await.unwrap(), authors);
        let config = store::load_config(&reopened).await.unwrap();
        assert_eq!(config.file_path, "public/data/db.json");
        assert!(reopened.get(SETTINGS_KEY).await.unwrap().is_some());
    }
}
