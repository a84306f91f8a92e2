//! Publish / retrieve orchestration.
//!
//! Each workflow is a short, strictly sequential series of remote calls.
//! Publish and retrieve hold the document lock for their whole run; verify
//! and discover are read-only and take no lock.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, SecondsFormat, SubsecRound, Utc};
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::codec;
use crate::config::ConnectionConfig;
use crate::error::SyncError;
use crate::lock::LockManager;
use crate::model::{DocumentSnapshot, RemoteSnapshot};
use crate::remote::{EntryKind, Lookup, PutOutcome, PutRequest, RemoteFiles};
use crate::store::{self, WorkingStore};

/// State of the target file seen during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileState {
    Present { sha: String },
    Absent,
}

/// Non-fatal findings of a verification run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyWarning {
    /// The token can read but not push; publishing will be refused.
    MissingWriteAccess,
    BranchMissing(String),
}

impl fmt::Display for VerifyWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VerifyWarning::MissingWriteAccess => write!(
                f,
                "Warning: the token has no write (push) permission, publishing will fail."
            ),
            VerifyWarning::BranchMissing(branch) => write!(
                f,
                "Warning: branch \"{}\" does not exist, publishing will fail.",
                branch
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifyReport {
    pub repository: String,
    pub can_push: bool,
    pub branch: String,
    pub branch_exists: bool,
    pub file_path: String,
    pub file: FileState,
    pub warnings: Vec<VerifyWarning>,
}

impl VerifyReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}

impl fmt::Display for VerifyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Connected to {}.", self.repository)?;
        match self.file {
            FileState::Present { .. } => write!(
                f,
                " File \"{}\" found on branch \"{}\".",
                self.file_path, self.branch
            )?,
            FileState::Absent => write!(
                f,
                " File \"{}\" does not exist yet, it will be created on first publish.",
                self.file_path
            )?,
        }
        for warning in &self.warnings {
            write!(f, " {}", warning)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReceipt {
    pub path: String,
    pub branch: String,
    /// `true` when the file did not exist before this publish.
    pub created: bool,
    pub commit_sha: Option<String>,
    pub last_updated: DateTime<Utc>,
    pub articles: usize,
    pub authors: usize,
}

impl fmt::Display for PublishReceipt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Site updated: {} {} {} articles and {} authors on branch \"{}\"",
            if self.created { "created" } else { "updated" },
            self.path,
            self.articles,
            self.authors,
            self.branch
        )?;
        if let Some(sha) = &self.commit_sha {
            write!(f, " (commit {})", short_sha(sha))?;
        }
        write!(f, ".")
    }
}

/// What a retrieve replaced locally. `None` means the remote document had
/// no such collection and the local one was left alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetrieveReport {
    pub path: String,
    pub branch: String,
    pub articles: Option<usize>,
    pub authors: Option<usize>,
    pub last_updated: Option<String>,
}

impl RetrieveReport {
    /// Whether the front end must reload its state.
    pub fn changed_anything(&self) -> bool {
        self.articles.is_some() || self.authors.is_some()
    }
}

impl fmt::Display for RetrieveReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut replaced = Vec::new();
        if let Some(n) = self.articles {
            replaced.push(format!("{} articles", n));
        }
        if let Some(n) = self.authors {
            replaced.push(format!("{} authors", n));
        }

        if replaced.is_empty() {
            write!(
                f,
                "Downloaded {} but it contained no articles or authors, nothing was replaced.",
                self.path
            )
        } else {
            write!(
                f,
                "Data downloaded from {}: replaced {}.",
                self.path,
                replaced.join(" and ")
            )
        }
    }
}

fn short_sha(sha: &str) -> &str {
    sha.get(..7).unwrap_or(sha)
}

fn default_commit_message(path: &str, at: DateTime<Utc>) -> String {
    let stamp = at.to_rfc3339_opts(SecondsFormat::Secs, true);
    format!("Update {}: {}", path, stamp)
}

/// Runs the four sync workflows for one configured document.
pub struct SyncEngine {
    config: ConnectionConfig,
    remote: Arc<dyn RemoteFiles>,
    store: Arc<dyn WorkingStore>,
    locks: Arc<LockManager>,
}

impl SyncEngine {
    /// `locks` should be shared by every engine in the process so that two
    /// engines pointed at the same document still exclude each other.
    pub fn new(
        config: ConnectionConfig,
        remote: Arc<dyn RemoteFiles>,
        store: Arc<dyn WorkingStore>,
        locks: Arc<LockManager>,
    ) -> Self {
        Self {
            config: config.normalized(),
            remote,
            store,
            locks,
        }
    }

    pub fn config(&self) -> &ConnectionConfig {
        &self.config
    }

    /// Check repository, permissions, branch and target file in turn.
    #[instrument(skip(self), level = "debug", fields(document = %self.config.document_key()))]
    pub async fn verify_connection(&self) -> Result<VerifyReport, SyncError> {
        self.config.require_credentials()?;

        let token = self.config.access_token.as_str();
        let repo = self.config.repo();
        let mut warnings = Vec::new();

        let repository = match self.remote.get_repository(token, &repo).await {
            Lookup::Found(info) => info,
            Lookup::NotFound => {
                let message = format!("repository {} not found", repo);
                return Err(SyncError::NotFound(message));
            }
            Lookup::Denied { status, message } => {
                let context = format!("cannot access repository {}", repo);
                return Err(SyncError::denied(status, &context, &message));
            }
            Lookup::Transport(err) => return Err(err.into()),
        };

        let can_push = repository.permissions.map(|p| p.push).unwrap_or(false);
        if !can_push {
            warn!("Token has no push permission on {}", repo);
            warnings.push(VerifyWarning::MissingWriteAccess);
        }

        let branch_exists = match self
            .remote
            .get_branch(token, &repo, &self.config.branch)
            .await
        {
            Lookup::Found(_) => true,
            Lookup::NotFound => {
                let branch = self.config.branch.clone();
                warn!("Branch {} not found in {}", branch, repo);
                warnings.push(VerifyWarning::BranchMissing(branch));
                false
            }
            Lookup::Denied { status, message } => {
                let context = format!("cannot read branch {}", self.config.branch);
                return Err(SyncError::denied(status, &context, &message));
            }
            Lookup::Transport(err) => return Err(err.into()),
        };

        let path = self.config.file_path.as_str();
        let file = match self
            .remote
            .get_file(token, &repo, path, &self.config.branch)
            .await
        {
            Lookup::Found(handle) => FileState::Present { sha: handle.sha },
            Lookup::NotFound => FileState::Absent,
            Lookup::Denied { status, message } => {
                let context = format!("cannot read {}", path);
                return Err(SyncError::denied(status, &context, &message));
            }
            Lookup::Transport(err) => return Err(err.into()),
        };

        let report = VerifyReport {
            repository: repository.full_name,
            can_push,
            branch: self.config.branch.clone(),
            branch_exists,
            file_path: path.to_string(),
            file,
            warnings,
        };
        info!(
            "Verified {} (push={}, branch_exists={}, warnings={})",
            report.repository,
            report.can_push,
            report.branch_exists,
            report.warnings.len()
        );
        Ok(report)
    }

    /// Candidate `.json` files on the configured branch, for the path picker.
    ///
    /// Never fails; missing credentials or remote errors give an empty list.
    #[instrument(skip(self), level = "debug")]
    pub async fn find_json_files(&self) -> Vec<String> {
        if self.config.require_credentials().is_err() {
            debug!("Skipping discovery, credentials incomplete");
            return Vec::new();
        }

        let entries = self
            .remote
            .list_tree(
                &self.config.access_token,
                &self.config.repo(),
                &self.config.branch,
            )
            .await;

        let files: Vec<String> = entries
            .into_iter()
            .filter(|entry| entry.kind == EntryKind::Blob && entry.path.ends_with(".json"))
            .map(|entry| entry.path)
            .collect();

        debug!("Discovered {} .json files", files.len());
        files
    }

    /// Push the local working copy to the remote document.
    pub async fn publish(&self) -> Result<PublishReceipt, SyncError> {
        self.publish_with_message(None).await
    }

    /// Like `publish`, with an explicit commit message.
    ///
    /// A concurrent remote edit between the read and the write makes the
    /// remote refuse the stale sha; that refusal is returned as-is and
    /// nothing is retried.
    #[instrument(skip(self), level = "debug", fields(document = %self.config.document_key()))]
    pub async fn publish_with_message(
        &self,
        message: Option<&str>,
    ) -> Result<PublishReceipt, SyncError> {
        self.config.ensure_json_target()?;
        self.config.require_credentials()?;

        let _guard = self.locks.acquire(&self.config.document_key()).await;

        let token = self.config.access_token.as_str();
        let repo = self.config.repo();
        let path = self.config.file_path.as_str();
        let branch = self.config.branch.as_str();

        let prior_sha = match self.remote.get_file(token, &repo, path, branch).await {
            Lookup::Found(handle) => Some(handle.sha),
            Lookup::NotFound => {
                // creating into a missing branch cannot succeed
                match self.remote.get_branch(token, &repo, branch).await {
                    Lookup::Found(_) => None,
                    Lookup::NotFound => {
                        return Err(SyncError::BranchMissing(branch.to_string()));
                    }
                    Lookup::Denied { status, message } => {
                        let context = format!("cannot read branch {}", branch);
                        return Err(SyncError::denied(status, &context, &message));
                    }
                    Lookup::Transport(err) => return Err(err.into()),
                }
            }
            Lookup::Denied { status, message } => {
                let context = format!("cannot read {}", path);
                return Err(SyncError::denied(status, &context, &message));
            }
            Lookup::Transport(err) => return Err(err.into()),
        };

        let articles = store::load_articles(self.store.as_ref()).await?;
        let authors = store::load_authors(self.store.as_ref()).await?;
        let stamped = Utc::now().trunc_subsecs(3);
        let snapshot = DocumentSnapshot::new(articles, authors, stamped);
        let text = snapshot
            .to_pretty_json()
            .map_err(|e| SyncError::Parse(format!("cannot serialize snapshot: {}", e)))?;

        let created = prior_sha.is_none();
        let message = match message {
            Some(message) => message.to_string(),
            None => default_commit_message(path, snapshot.last_updated),
        };
        let request = PutRequest {
            path: path.to_string(),
            branch: branch.to_string(),
            content: codec::encode(&text),
            message,
            prior_sha,
        };

        debug!(
            "Writing {} ({} bytes, create={})",
            path,
            text.len(),
            created
        );

        match self.remote.put_file(token, &repo, request).await {
            PutOutcome::Written(receipt) => {
                let receipt = PublishReceipt {
                    path: path.to_string(),
                    branch: branch.to_string(),
                    created,
                    commit_sha: receipt.commit_sha,
                    last_updated: snapshot.last_updated,
                    articles: snapshot.articles.len(),
                    authors: snapshot.authors.len(),
                };
                info!(
                    "Published {} to {}@{} ({} articles, {} authors)",
                    path, repo, branch, receipt.articles, receipt.authors
                );
                Ok(receipt)
            }
            PutOutcome::Rejected { status, message } => {
                warn!("Remote rejected write of {}: {} {}", path, status, message);
                Err(SyncError::Rejected { status, message })
            }
            PutOutcome::Transport(err) => Err(err.into()),
        }
    }

    /// Pull the remote document and overwrite the local collections it has.
    ///
    /// Nothing is written locally unless the whole document parses. The two
    /// collections are separate store writes; when the authors write fails
    /// after the articles were replaced, the previous articles are put back.
    #[instrument(skip(self), level = "debug", fields(document = %self.config.document_key()))]
    pub async fn retrieve(&self) -> Result<RetrieveReport, SyncError> {
        self.config.require_credentials()?;

        let _guard = self.locks.acquire(&self.config.document_key()).await;

        let repo = self.config.repo();
        let path = self.config.file_path.as_str();
        let branch = self.config.branch.as_str();

        let token = self.config.access_token.as_str();
        let handle = match self.remote.get_file(token, &repo, path, branch).await {
            Lookup::Found(handle) => handle,
            Lookup::NotFound => {
                let message = format!("{} does not exist on branch \"{}\"", path, branch);
                return Err(SyncError::NotFound(message));
            }
            Lookup::Denied { status, message } => {
                let context = format!("cannot read {}", path);
                return Err(SyncError::denied(status, &context, &message));
            }
            Lookup::Transport(err) => return Err(err.into()),
        };

        if !handle.encoding.eq_ignore_ascii_case("base64") {
            return Err(SyncError::Parse(format!(
                "{} is served with encoding \"{}\" (file too large for the contents API?)",
                path, handle.encoding
            )));
        }

        let text = codec::decode(&handle.content)?;
        let snapshot: RemoteSnapshot = serde_json::from_str(&text)
            .map_err(|e| SyncError::Parse(format!("{} is not a valid snapshot: {}", path, e)))?;

        let mut report = RetrieveReport {
            path: path.to_string(),
            branch: branch.to_string(),
            articles: None,
            authors: None,
            last_updated: snapshot.last_updated,
        };

        let previous_articles = match (&snapshot.articles, &snapshot.authors) {
            (Some(_), Some(_)) => self.store.get(store::ARTICLES_KEY).await?,
            _ => None,
        };

        if let Some(articles) = snapshot.articles {
            store::save_articles(self.store.as_ref(), &articles).await?;
            report.articles = Some(articles.len());
        }
        if let Some(authors) = snapshot.authors {
            if let Err(err) = store::save_authors(self.store.as_ref(), &authors).await {
                if report.articles.is_some() {
                    self.restore_articles(previous_articles).await;
                }
                return Err(err.into());
            }
            report.authors = Some(authors.len());
        }

        info!(
            "Retrieved {} from {}@{} (articles={:?}, authors={:?})",
            path, repo, branch, report.articles, report.authors
        );
        Ok(report)
    }

    /// Put the articles seen before a failed retrieve back in place.
    async fn restore_articles(&self, previous: Option<Value>) {
        let restored = match previous {
            Some(value) => self.store.put(store::ARTICLES_KEY, value).await,
            None => self.store.delete(store::ARTICLES_KEY).await,
        };
        if let Err(err) = restored {
            warn!(
                "Could not restore local articles after a failed retrieve: {}",
                err
            );
        }
    }
}
