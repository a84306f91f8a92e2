use std::fmt;

use async_trait::async_trait;

/// `owner/name` coordinates of a repository.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl RepoId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// A file as read from the remote at a given ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteFileHandle {
    /// Concurrency token for the next write of this path.
    pub sha: String,
    /// Encoded payload, possibly wrapped with newlines.
    pub content: String,
    /// `base64`, or `none` when the file is too large to be inlined.
    pub encoding: String,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RepoPermissions {
    pub admin: bool,
    pub push: bool,
    pub pull: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryInfo {
    pub full_name: String,
    pub default_branch: Option<String>,
    /// Only reported for authenticated requests.
    pub permissions: Option<RepoPermissions>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchInfo {
    pub name: String,
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    /// A plain file.
    Blob,
    /// A directory.
    Tree,
    /// A submodule.
    Commit,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    pub path: String,
    pub kind: EntryKind,
}

/// Network failure or an unexpected HTTP status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportError {
    /// `None` when no response was received at all.
    pub status: Option<u16>,
    pub message: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        Self::new(None, message)
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.status {
            Some(status) => write!(f, "HTTP {}: {}", status, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for TransportError {}

/// Outcome of a read against the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<T> {
    Found(T),
    NotFound,
    /// 401 or 403.
    Denied { status: u16, message: String },
    Transport(TransportError),
}

/// A create-or-update of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PutRequest {
    pub path: String,
    pub branch: String,
    /// Base64 payload.
    pub content: String,
    pub message: String,
    /// `None` creates the file; `Some` updates it and fails if the remote
    /// has moved on from this sha.
    pub prior_sha: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PutReceipt {
    pub content_sha: Option<String>,
    pub commit_sha: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PutOutcome {
    Written(PutReceipt),
    /// The remote answered with a non-success status; `message` is its own
    /// explanation.
    Rejected { status: u16, message: String },
    Transport(TransportError),
}

/// File-hosting API used by the sync workflows.
///
/// The access token is passed per call; implementations hold no
/// credentials of their own.
#[async_trait]
pub trait RemoteFiles: Send + Sync {
    /// Read a file at `reference` (branch, tag or sha).
    async fn get_file(
        &self,
        token: &str,
        repo: &RepoId,
        path: &str,
        reference: &str,
    ) -> Lookup<RemoteFileHandle>;

    /// Repository metadata, including the caller's permissions.
    async fn get_repository(&self, token: &str, repo: &RepoId) -> Lookup<RepositoryInfo>;

    async fn get_branch(&self, token: &str, repo: &RepoId, branch: &str) -> Lookup<BranchInfo>;

    /// Recursive listing of `reference`.
    ///
    /// Discovery only: any failure yields an empty list.
    async fn list_tree(&self, token: &str, repo: &RepoId, reference: &str) -> Vec<TreeEntry>;

    async fn put_file(&self, token: &str, repo: &RepoId, request: PutRequest) -> PutOutcome;
}
