//! GitHub REST API v3 client wrapper.
//!
//! Token is passed per-call by the engine (read from the stored settings).
//! Only the contents, repository, branch and git tree endpoints are used.

use async_trait::async_trait;
use pressroom_core::{
    BranchInfo, EntryKind, Lookup, PutOutcome, PutReceipt, PutRequest, RemoteFileHandle,
    RemoteFiles, RepoId, RepoPermissions, RepositoryInfo, TransportError, TreeEntry,
};
use reqwest::header::{ACCEPT, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument, warn};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Soft cap on entries returned by a recursive tree listing.
pub const DEFAULT_TREE_LIMIT: usize = 10_000;

const GITHUB_MEDIA_TYPE: &str = "application/vnd.github+json";
const CLIENT_USER_AGENT: &str = concat!("pressroom/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct ContentsResponse {
    sha: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    encoding: String,
}

#[derive(Debug, Deserialize)]
struct PermissionsResponse {
    #[serde(default)]
    admin: bool,
    #[serde(default)]
    push: bool,
    #[serde(default)]
    pull: bool,
}

#[derive(Debug, Deserialize)]
struct RepositoryResponse {
    full_name: String,
    #[serde(default)]
    default_branch: Option<String>,
    #[serde(default)]
    permissions: Option<PermissionsResponse>,
}

#[derive(Debug, Deserialize)]
struct ShaRef {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct BranchResponse {
    name: String,
    #[serde(default)]
    commit: Option<ShaRef>,
}

#[derive(Debug, Deserialize)]
struct TreeItem {
    path: String,
    #[serde(rename = "type")]
    kind: String,
}

#[derive(Debug, Deserialize)]
struct TreeResponse {
    #[serde(default)]
    tree: Vec<TreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Debug, Serialize)]
struct PutBody<'a> {
    message: &'a str,
    content: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    sha: Option<&'a str>,
    branch: &'a str,
}

#[derive(Debug, Default, Deserialize)]
struct PutResponse {
    #[serde(default)]
    content: Option<ShaRef>,
    #[serde(default)]
    commit: Option<ShaRef>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

/// GitHub API client (stateless, token provided per-call).
#[derive(Debug, Clone)]
pub struct GitHubClient {
    http: Client,
    base_url: String,
    tree_limit: usize,
}

impl Default for GitHubClient {
    fn default() -> Self {
        Self::new()
    }
}

impl GitHubClient {
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_API_URL)
    }

    /// Point the client at another API root (GitHub Enterprise, tests).
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        Self {
            http: Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tree_limit: DEFAULT_TREE_LIMIT,
        }
    }

    pub fn with_tree_limit(mut self, limit: usize) -> Self {
        self.tree_limit = limit;
        self
    }

    fn repo_url(&self, repo: &RepoId) -> String {
        format!(
            "{}/repos/{}/{}",
            self.base_url,
            urlencoding::encode(&repo.owner),
            urlencoding::encode(&repo.name)
        )
    }

    fn contents_url(&self, repo: &RepoId, path: &str) -> String {
        format!("{}/contents/{}", self.repo_url(repo), encode_path(path))
    }

    fn request(&self, builder: RequestBuilder, token: &str) -> RequestBuilder {
        builder
            .bearer_auth(token)
            .header(ACCEPT, GITHUB_MEDIA_TYPE)
            .header(USER_AGENT, CLIENT_USER_AGENT)
    }
}

/// Percent-encode each segment of a slash-separated path.
fn encode_path(path: &str) -> String {
    path.split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// The `message` field of a GitHub error body, else the raw body.
async fn error_message(resp: Response) -> String {
    let status = resp.status();
    let body = resp.text().await.unwrap_or_default();
    match serde_json::from_str::<ErrorBody>(&body) {
        Ok(err) => err.message,
        Err(_) if !body.trim().is_empty() => body,
        Err(_) => status
            .canonical_reason()
            .unwrap_or("unknown error")
            .to_string(),
    }
}

/// Map a read response onto `Lookup`.
async fn lookup<T: DeserializeOwned>(sent: reqwest::Result<Response>) -> Lookup<T> {
    let resp = match sent {
        Ok(resp) => resp,
        Err(e) => return Lookup::Transport(TransportError::network(e.to_string())),
    };

    let status = resp.status();
    match status {
        StatusCode::OK => match resp.json::<T>().await {
            Ok(body) => Lookup::Found(body),
            Err(e) => Lookup::Transport(TransportError::new(
                Some(status.as_u16()),
                format!("malformed response body: {}", e),
            )),
        },
        StatusCode::NOT_FOUND => Lookup::NotFound,
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Lookup::Denied {
            status: status.as_u16(),
            message: error_message(resp).await,
        },
        _ => Lookup::Transport(TransportError::new(
            Some(status.as_u16()),
            error_message(resp).await,
        )),
    }
}

fn map_found<A, B>(lookup: Lookup<A>, f: impl FnOnce(A) -> B) -> Lookup<B> {
    match lookup {
        Lookup::Found(value) => Lookup::Found(f(value)),
        Lookup::NotFound => Lookup::NotFound,
        Lookup::Denied { status, message } => Lookup::Denied { status, message },
        Lookup::Transport(err) => Lookup::Transport(err),
    }
}

#[async_trait]
impl RemoteFiles for GitHubClient {
    #[instrument(skip(self, token), level = "debug", fields(repo = %repo))]
    async fn get_file(
        &self,
        token: &str,
        repo: &RepoId,
        path: &str,
        reference: &str,
    ) -> Lookup<RemoteFileHandle> {
        let url = self.contents_url(repo, path);
        let sent = self
            .request(self.http.get(&url), token)
            .query(&[("ref", reference)])
            .send()
            .await;

        let result = map_found(lookup::<ContentsResponse>(sent).await, |body| {
            RemoteFileHandle {
                sha: body.sha,
                content: body.content,
                encoding: body.encoding,
            }
        });
        if let Lookup::Found(handle) = &result {
            debug!("Got {}@{} (sha {})", path, reference, handle.sha);
        }
        result
    }

    #[instrument(skip(self, token), level = "debug", fields(repo = %repo))]
    async fn get_repository(&self, token: &str, repo: &RepoId) -> Lookup<RepositoryInfo> {
        let sent = self
            .request(self.http.get(self.repo_url(repo)), token)
            .send()
            .await;

        map_found(lookup::<RepositoryResponse>(sent).await, |body| {
            RepositoryInfo {
                full_name: body.full_name,
                default_branch: body.default_branch,
                permissions: body.permissions.map(|p| RepoPermissions {
                    admin: p.admin,
                    push: p.push,
                    pull: p.pull,
                }),
            }
        })
    }

    #[instrument(skip(self, token), level = "debug", fields(repo = %repo))]
    async fn get_branch(&self, token: &str, repo: &RepoId, branch: &str) -> Lookup<BranchInfo> {
        let url = format!("{}/branches/{}", self.repo_url(repo), encode_path(branch));
        let sent = self.request(self.http.get(&url), token).send().await;

        map_found(lookup::<BranchResponse>(sent).await, |body| BranchInfo {
            name: body.name,
            commit_sha: body.commit.map(|c| c.sha),
        })
    }

    #[instrument(skip(self, token), level = "debug", fields(repo = %repo))]
    async fn list_tree(&self, token: &str, repo: &RepoId, reference: &str) -> Vec<TreeEntry> {
        let url = format!(
            "{}/git/trees/{}",
            self.repo_url(repo),
            encode_path(reference)
        );
        let sent = self
            .request(self.http.get(&url), token)
            .query(&[("recursive", "1")])
            .send()
            .await;

        let tree = match lookup::<TreeResponse>(sent).await {
            Lookup::Found(tree) => tree,
            Lookup::NotFound => {
                debug!("No tree for {}@{}", repo, reference);
                return Vec::new();
            }
            Lookup::Denied { status, message } => {
                warn!("Tree listing denied ({}): {}", status, message);
                return Vec::new();
            }
            Lookup::Transport(err) => {
                warn!("Tree listing failed: {}", err);
                return Vec::new();
            }
        };

        if tree.truncated {
            warn!(
                "GitHub truncated the tree of {}@{}, some files are not listed",
                repo, reference
            );
        }

        let mut entries: Vec<TreeEntry> = tree
            .tree
            .into_iter()
            .filter_map(|item| {
                let kind = match item.kind.as_str() {
                    "blob" => EntryKind::Blob,
                    "tree" => EntryKind::Tree,
                    "commit" => EntryKind::Commit,
                    _ => return None,
                };
                Some(TreeEntry {
                    path: item.path,
                    kind,
                })
            })
            .collect();

        if entries.len() > self.tree_limit {
            warn!(
                limit = self.tree_limit,
                total = entries.len(),
                "Tree listing over soft limit, keeping the first entries only"
            );
            entries.truncate(self.tree_limit);
        }

        debug!("Listed {} tree entries", entries.len());
        entries
    }

    #[instrument(
        skip(self, token, request),
        level = "debug",
        fields(repo = %repo, path = %request.path, update = request.prior_sha.is_some())
    )]
    async fn put_file(&self, token: &str, repo: &RepoId, request: PutRequest) -> PutOutcome {
        let url = self.contents_url(repo, &request.path);
        let body = PutBody {
            message: &request.message,
            content: &request.content,
            sha: request.prior_sha.as_deref(),
            branch: &request.branch,
        };

        let resp = match self
            .request(self.http.put(&url), token)
            .json(&body)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => return PutOutcome::Transport(TransportError::network(e.to_string())),
        };

        let status = resp.status();
        if !status.is_success() {
            let message = error_message(resp).await;
            return PutOutcome::Rejected {
                status: status.as_u16(),
                message,
            };
        }

        let parsed = match resp.json::<PutResponse>().await {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!("Write succeeded but the response was unreadable: {}", e);
                PutResponse::default()
            }
        };

        debug!(
            "Wrote {} ({} base64 bytes, status {})",
            request.path,
            request.content.len(),
            status
        );
        PutOutcome::Written(PutReceipt {
            content_sha: parsed.content.map(|c| c.sha),
            commit_sha: parsed.commit.map(|c| c.sha),
        })
    }
}
