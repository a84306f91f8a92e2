use serde::{Deserialize, Serialize};

use crate::error::SyncError;
use crate::remote::RepoId;

pub const DEFAULT_BRANCH: &str = "main";
pub const DEFAULT_FILE_PATH: &str = "public/data/db.json";

/// Where the snapshot lives and how to reach it.
///
/// Persisted by the settings front end under the `settings` store key.
/// Older records used `githubToken` / `repoBranch`, accepted as aliases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConnectionConfig {
    #[serde(default, alias = "githubToken")]
    pub access_token: String,
    #[serde(default)]
    pub repo_owner: String,
    #[serde(default)]
    pub repo_name: String,
    #[serde(default = "default_file_path")]
    pub file_path: String,
    #[serde(default = "default_branch", alias = "repoBranch")]
    pub branch: String,
}

fn default_file_path() -> String {
    DEFAULT_FILE_PATH.to_string()
}

fn default_branch() -> String {
    DEFAULT_BRANCH.to_string()
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            access_token: String::new(),
            repo_owner: String::new(),
            repo_name: String::new(),
            file_path: default_file_path(),
            branch: default_branch(),
        }
    }
}

impl ConnectionConfig {
    /// Trim every field, strip a leading `/` from the path and fall back to
    /// `main` for a blank branch.
    pub fn normalized(self) -> Self {
        let branch = self.branch.trim();
        Self {
            access_token: self.access_token.trim().to_string(),
            repo_owner: self.repo_owner.trim().to_string(),
            repo_name: self.repo_name.trim().to_string(),
            file_path: self.file_path.trim().trim_start_matches('/').to_string(),
            branch: if branch.is_empty() {
                default_branch()
            } else {
                branch.to_string()
            },
        }
    }

    /// Names of the required fields that are still empty.
    pub fn missing_fields(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.access_token.is_empty() {
            missing.push("access token");
        }
        if self.repo_owner.is_empty() {
            missing.push("repository owner");
        }
        if self.repo_name.is_empty() {
            missing.push("repository name");
        }
        missing
    }

    pub fn require_credentials(&self) -> Result<(), SyncError> {
        let missing = self.missing_fields();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(SyncError::ConfigMissing(missing.join(", ")))
        }
    }

    /// Only `.json` targets may be written, so a misconfigured path can never
    /// clobber the site's own sources.
    pub fn ensure_json_target(&self) -> Result<(), SyncError> {
        if self.file_path.ends_with(".json") {
            Ok(())
        } else {
            Err(SyncError::SecurityRejected(self.file_path.clone()))
        }
    }

    pub fn repo(&self) -> RepoId {
        RepoId::new(&self.repo_owner, &self.repo_name)
    }

    /// Identity of the remote document for the lock table.
    pub fn document_key(&self) -> String {
        format!(
            "{}/{}@{}:{}",
            self.repo_owner, self.repo_name, self.branch, self.file_path
        )
    }
}
