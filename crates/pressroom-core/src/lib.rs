//! Core types and sync orchestration for the pressroom publishing engine.
//!
//! This crate defines the pieces shared by every front end and backend:
//! - `RemoteFiles`: file-hosting API abstraction (GitHub contents API)
//! - `WorkingStore`: the local working copy of articles, authors and settings
//! - `codec`: lossless Unicode <-> base64 transcoding
//! - `LockManager`: one in-flight publish/retrieve per remote document
//! - `SyncEngine`: the verify / discover / publish / retrieve workflows

pub mod codec;
mod config;
mod diagnostic;
mod engine;
mod error;
mod lock;
mod model;
mod remote;
pub mod store;

#[cfg(test)]
mod testing;

pub use config::{ConnectionConfig, DEFAULT_BRANCH, DEFAULT_FILE_PATH};
pub use diagnostic::DiagnosticResult;
pub use engine::{
    FileState, PublishReceipt, RetrieveReport, SyncEngine, VerifyReport, VerifyWarning,
};
pub use error::SyncError;
pub use lock::{DocumentGuard, LockManager};
pub use model::{Article, Author, BullfightResult, Category, DocumentSnapshot, RemoteSnapshot};
pub use remote::{
    BranchInfo, EntryKind, Lookup, PutOutcome, PutReceipt, PutRequest, RemoteFileHandle,
    RemoteFiles, RepoId, RepoPermissions, RepositoryInfo, TransportError, TreeEntry,
};
pub use store::{MemoryStore, StoreError, WorkingStore};
