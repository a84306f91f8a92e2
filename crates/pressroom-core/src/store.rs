//! Local working copy of the dataset.
//!
//! The editing front end owns this store; the sync engine only reads the
//! collections on publish and overwrites them on retrieve.

use async_trait::async_trait;
use dashmap::DashMap;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::config::ConnectionConfig;
use crate::model::{Article, Author};

pub const ARTICLES_KEY: &str = "articles";
pub const AUTHORS_KEY: &str = "authors";
pub const SETTINGS_KEY: &str = "settings";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid key: {0}")]
    InvalidKey(String),
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Serialization(err.to_string())
    }
}

/// Key/value persistence for JSON documents.
#[async_trait]
pub trait WorkingStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Deleting a missing key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;
}

/// Read and deserialize `key`, `None` when absent.
pub async fn load<S, T>(store: &S, key: &str) -> Result<Option<T>, StoreError>
where
    S: WorkingStore + ?Sized,
    T: DeserializeOwned,
{
    match store.get(key).await? {
        Some(value) => Ok(Some(serde_json::from_value(value)?)),
        None => Ok(None),
    }
}

pub async fn save<S, T>(store: &S, key: &str, value: &T) -> Result<(), StoreError>
where
    S: WorkingStore + ?Sized,
    T: Serialize + Sync,
{
    let value = serde_json::to_value(value)?;
    store.put(key, value).await
}

pub async fn load_articles<S>(store: &S) -> Result<Vec<Article>, StoreError>
where
    S: WorkingStore + ?Sized,
{
    Ok(load(store, ARTICLES_KEY).await?.unwrap_or_default())
}

pub async fn save_articles<S>(store: &S, articles: &[Article]) -> Result<(), StoreError>
where
    S: WorkingStore + ?Sized,
{
    save(store, ARTICLES_KEY, &articles).await
}

pub async fn load_authors<S>(store: &S) -> Result<Vec<Author>, StoreError>
where
    S: WorkingStore + ?Sized,
{
    Ok(load(store, AUTHORS_KEY).await?.unwrap_or_default())
}

pub async fn save_authors<S>(store: &S, authors: &[Author]) -> Result<(), StoreError>
where
    S: WorkingStore + ?Sized,
{
    save(store, AUTHORS_KEY, &authors).await
}

/// Stored connection settings, normalized; defaults when none were saved.
pub async fn load_config<S>(store: &S) -> Result<ConnectionConfig, StoreError>
where
    S: WorkingStore + ?Sized,
{
    let config: Option<ConnectionConfig> = load(store, SETTINGS_KEY).await?;
    Ok(config.unwrap_or_default().normalized())
}

/// Normalize and persist connection settings, returning what was stored.
pub async fn save_config<S>(
    store: &S,
    config: ConnectionConfig,
) -> Result<ConnectionConfig, StoreError>
where
    S: WorkingStore + ?Sized,
{
    let config = config.normalized();
    save(store, SETTINGS_KEY, &config).await?;
    Ok(config)
}

/// In-process store, used by tests and embedders without a disk.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: DashMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WorkingStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        Ok(self.entries.get(key).map(|entry| entry.value().clone()))
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
