//! Test doubles shared by the unit tests of this crate.

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{Map, Value};

use crate::model::{Article, Author, BullfightResult, Category};
use crate::remote::{
    BranchInfo, Lookup, PutOutcome, PutReceipt, PutRequest, RemoteFileHandle, RemoteFiles,
    RepoId, RepoPermissions, RepositoryInfo, TreeEntry,
};
use crate::store::{MemoryStore, StoreError, WorkingStore};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    GetFile { path: String, reference: String },
    GetRepository,
    GetBranch(String),
    ListTree(String),
    PutFile(PutRequest),
}

/// Scripted `RemoteFiles` that records every call it receives.
pub struct RecordingRemote {
    file: Mutex<Lookup<RemoteFileHandle>>,
    repository: Mutex<Lookup<RepositoryInfo>>,
    branch: Mutex<Lookup<BranchInfo>>,
    tree: Mutex<Vec<TreeEntry>>,
    put: Mutex<PutOutcome>,
    calls: Mutex<Vec<Call>>,
}

impl Default for RecordingRemote {
    fn default() -> Self {
        Self::new()
    }
}

impl RecordingRemote {
    /// Writable repository, existing branch, no file yet.
    pub fn new() -> Self {
        Self {
            file: Mutex::new(Lookup::NotFound),
            repository: Mutex::new(Lookup::Found(repository(true))),
            branch: Mutex::new(Lookup::Found(BranchInfo {
                name: "main".to_string(),
                commit_sha: Some("c0ffee".to_string()),
            })),
            tree: Mutex::new(Vec::new()),
            put: Mutex::new(PutOutcome::Written(PutReceipt {
                content_sha: Some("new-blob-sha".to_string()),
                commit_sha: Some("new-commit-sha".to_string()),
            })),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_file(self, lookup: Lookup<RemoteFileHandle>) -> Self {
        *self.file.lock().unwrap() = lookup;
        self
    }

    pub fn with_repository(self, lookup: Lookup<RepositoryInfo>) -> Self {
        *self.repository.lock().unwrap() = lookup;
        self
    }

    pub fn with_branch(self, lookup: Lookup<BranchInfo>) -> Self {
        *self.branch.lock().unwrap() = lookup;
        self
    }

    pub fn with_tree(self, entries: Vec<TreeEntry>) -> Self {
        *self.tree.lock().unwrap() = entries;
        self
    }

    pub fn with_put(self, outcome: PutOutcome) -> Self {
        *self.put.lock().unwrap() = outcome;
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn puts(&self) -> Vec<PutRequest> {
        self.calls()
            .into_iter()
            .filter_map(|call| match call {
                Call::PutFile(request) => Some(request),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl RemoteFiles for RecordingRemote {
    async fn get_file(
        &self,
        _token: &str,
        _repo: &RepoId,
        path: &str,
        reference: &str,
    ) -> Lookup<RemoteFileHandle> {
        self.record(Call::GetFile {
            path: path.to_string(),
            reference: reference.to_string(),
        });
        self.file.lock().unwrap().clone()
    }

    async fn get_repository(&self, _token: &str, _repo: &RepoId) -> Lookup<RepositoryInfo> {
        self.record(Call::GetRepository);
        self.repository.lock().unwrap().clone()
    }

    async fn get_branch(&self, _token: &str, _repo: &RepoId, branch: &str) -> Lookup<BranchInfo> {
        self.record(Call::GetBranch(branch.to_string()));
        self.branch.lock().unwrap().clone()
    }

    async fn list_tree(&self, _token: &str, _repo: &RepoId, reference: &str) -> Vec<TreeEntry> {
        self.record(Call::ListTree(reference.to_string()));
        self.tree.lock().unwrap().clone()
    }

    async fn put_file(&self, _token: &str, _repo: &RepoId, request: PutRequest) -> PutOutcome {
        self.record(Call::PutFile(request));
        self.put.lock().unwrap().clone()
    }
}

pub fn repository(push: bool) -> RepositoryInfo {
    RepositoryInfo {
        full_name: "newsroom/site".to_string(),
        default_branch: Some("main".to_string()),
        permissions: Some(RepoPermissions {
            admin: false,
            push,
            pull: true,
        }),
    }
}

pub fn sample_authors() -> Vec<Author> {
    vec![
        Author {
            id: "1".to_string(),
            name: "Inés Sáez".to_string(),
            role: "Redacción".to_string(),
            image_url: None,
            extra: Map::new(),
        },
        Author {
            id: "2".to_string(),
            name: "Rubén Sánchez".to_string(),
            role: "Colaborador".to_string(),
            image_url: Some("https://example.org/ruben.png".to_string()),
            extra: Map::new(),
        },
    ]
}

pub fn sample_articles() -> Vec<Article> {
    vec![Article {
        id: "101".to_string(),
        title: "Tarde de viento en Ciudad Rodrigo 🐂".to_string(),
        summary: "Cuatro orejas y una ovación".to_string(),
        content: "<p>Crónica con acentos: ñ, á, ü</p>".to_string(),
        image_url: "https://example.org/cover.jpg".to_string(),
        content_images: Some(vec![]),
        category: Category::Cronicas,
        author_id: "1".to_string(),
        date: "2026-02-14T17:00:00.000Z".to_string(),
        is_published: true,
        bullfight_location: Some("Plaza Mayor".to_string()),
        bullfight_cattle: None,
        bullfight_summary: None,
        bullfight_results: Some(vec![BullfightResult {
            bullfighter: "El Mene".to_string(),
            result: "una oreja".to_string(),
        }]),
        extra: Map::new(),
    }]
}

/// `MemoryStore` whose writes to one key always fail.
pub struct FailingStore {
    inner: MemoryStore,
    failing_key: &'static str,
}

impl FailingStore {
    pub fn new(failing_key: &'static str) -> Self {
        Self {
            inner: MemoryStore::new(),
            failing_key,
        }
    }
}

#[async_trait]
impl WorkingStore for FailingStore {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError> {
        self.inner.get(key).await
    }

    async fn put(&self, key: &str, value: Value) -> Result<(), StoreError> {
        if key == self.failing_key {
            return Err(StoreError::Io(format!("disk full writing {}", key)));
        }
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.inner.delete(key).await
    }
}
