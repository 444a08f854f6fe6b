//! forge::github
//!
//! GitHub forge implementation using the Git Data REST API.
//!
//! # Design
//!
//! This module implements the `Forge` trait for GitHub. Every operation maps
//! to one REST call:
//!
//! | Operation | Endpoint |
//! |---|---|
//! | `get_ref` | `GET /repos/{o}/{r}/git/ref/heads/{branch}` |
//! | `get_commit` | `GET /repos/{o}/{r}/git/commits/{sha}` |
//! | `list_tree` | `GET /repos/{o}/{r}/git/trees/{sha}:{path}?recursive=1` |
//! | `create_tree` | `POST /repos/{o}/{r}/git/trees` |
//! | `create_commit` | `POST /repos/{o}/{r}/git/commits` |
//! | `update_ref` | `PATCH /repos/{o}/{r}/git/refs/heads/{branch}` |
//!
//! # Authentication
//!
//! A [`TokenProvider`] is consulted before every request. A 401 triggers one
//! retry with a freshly fetched token.
//!
//! # Transient Failures
//!
//! Network errors, rate limits, and 5xx responses are retried under the
//! configured [`RetryPolicy`] with exponential backoff. Conflicts and other
//! 4xx responses are returned immediately.
//!
//! # Example
//!
//! ```ignore
//! use article_sweep::forge::github::GitHubForge;
//! use article_sweep::auth::{EnvTokenProvider, TokenProvider};
//! use std::sync::Arc;
//!
//! let provider: Arc<dyn TokenProvider> = Arc::new(EnvTokenProvider::new("GITHUB_TOKEN"));
//! let forge = GitHubForge::new(provider, "octocat", "blog");
//! let head = forge.get_ref(&BranchName::new("main")?).await?;
//! ```
//!
//! [`TokenProvider`]: crate::auth::TokenProvider

use std::sync::Arc;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::retry::{delay_millis, RetryPolicy};
use super::traits::{
    CreateCommitRequest, CreateTreeRequest, Forge, ForgeError, UpdateRefRequest,
};
use crate::auth::TokenProvider;
use crate::core::config::Config;
use crate::core::objects::{BranchRef, Commit, ListedEntry, ObjectType, TreeEntry};
use crate::core::types::{BranchName, Oid};

/// Default GitHub API base URL.
const DEFAULT_API_BASE: &str = "https://api.github.com";

/// User-Agent header value for API requests.
const USER_AGENT_VALUE: &str = "article-sweep";

/// GitHub forge implementation.
pub struct GitHubForge {
    /// HTTP client for making requests
    client: Client,
    /// Token provider consulted per request
    token_provider: Arc<dyn TokenProvider>,
    /// Repository owner (user or organization)
    owner: String,
    /// Repository name
    repo: String,
    /// API base URL (configurable for GitHub Enterprise)
    api_base: String,
    /// Transport-level retry policy
    retry: RetryPolicy,
}

// Custom Debug to keep the provider out of output
impl std::fmt::Debug for GitHubForge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitHubForge")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("api_base", &self.api_base)
            .field("retry", &self.retry)
            .finish_non_exhaustive()
    }
}

impl GitHubForge {
    /// Create a GitHub forge for `owner/repo` on github.com.
    pub fn new(
        provider: Arc<dyn TokenProvider>,
        owner: impl Into<String>,
        repo: impl Into<String>,
    ) -> Self {
        Self {
            client: Client::new(),
            token_provider: provider,
            owner: owner.into(),
            repo: repo.into(),
            api_base: DEFAULT_API_BASE.to_string(),
            retry: RetryPolicy::default(),
        }
    }

    /// Create a forge from a resolved [`Config`].
    ///
    /// Takes the repository, API base, and transport retry policy from the
    /// config.
    pub fn from_config(config: &Config, provider: Arc<dyn TokenProvider>) -> Self {
        Self::new(provider, config.owner(), config.repo())
            .with_api_base(config.api_base())
            .with_retry(*config.transport_retry())
    }

    /// Create a GitHub forge from a remote URL.
    ///
    /// # Returns
    ///
    /// `Some(GitHubForge)` if URL is parseable, `None` otherwise.
    pub fn from_remote_url(url: &str, provider: Arc<dyn TokenProvider>) -> Option<Self> {
        let (owner, repo) = parse_github_url(url)?;
        Some(Self::new(provider, owner, repo))
    }

    /// Use a custom API base URL (e.g., `https://github.example.com/api/v3`).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    /// Replace the transport retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Get the repository owner.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Get the repository name.
    pub fn repo(&self) -> &str {
        &self.repo
    }

    /// Get the current bearer token from the provider.
    async fn get_bearer_token(&self) -> Result<String, ForgeError> {
        if !self.token_provider.is_authenticated() {
            return Err(ForgeError::AuthRequired);
        }
        self.token_provider
            .bearer_token()
            .await
            .map_err(|e| ForgeError::AuthFailed(e.to_string()))
    }

    /// Build common headers for API requests.
    async fn headers(&self) -> Result<HeaderMap, ForgeError> {
        let token = self.get_bearer_token().await?;
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token))
            .map_err(|_| ForgeError::AuthFailed("token is not a valid header value".into()))?;
        auth.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, auth);
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static("2022-11-28"),
        );
        Ok(headers)
    }

    /// Check if an error is an auth failure that might be resolved by a fresh token.
    fn is_retryable_auth_error(err: &ForgeError) -> bool {
        matches!(err, ForgeError::AuthFailed(msg) if msg == INVALID_TOKEN_MESSAGE)
    }

    /// Build URL for a repository endpoint.
    fn repo_url(&self, path: &str) -> String {
        format!(
            "{}/repos/{}/{}/{}",
            self.api_base, self.owner, self.repo, path
        )
    }

    /// Send a request with auth refresh and transient-failure backoff.
    ///
    /// `build` is called once per attempt with fresh headers.
    async fn execute<T, F>(&self, operation: &str, build: F) -> Result<T, ForgeError>
    where
        T: DeserializeOwned,
        F: Fn(&Client, HeaderMap) -> RequestBuilder,
    {
        let mut attempt = 1;
        let mut auth_retried = false;

        loop {
            debug!(operation, attempt, "sending GitHub request");
            let headers = self.headers().await?;
            let result = match build(&self.client, headers).send().await {
                Ok(response) => self.handle_response(response).await,
                Err(e) => Err(ForgeError::NetworkError(e.to_string())),
            };

            match result {
                Ok(value) => return Ok(value),
                Err(e) if Self::is_retryable_auth_error(&e) && !auth_retried => {
                    debug!(operation, "retrying with refreshed token");
                    auth_retried = true;
                }
                Err(e) if e.is_transient() && self.retry.allows_attempt(attempt + 1) => {
                    let delay = self.retry.delay_for(attempt);
                    warn!(
                        operation,
                        attempt,
                        delay_ms = delay_millis(delay),
                        error = %e,
                        "transient GitHub failure, backing off"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Handle API response, mapping errors appropriately.
    async fn handle_response<T: DeserializeOwned>(
        &self,
        response: Response,
    ) -> Result<T, ForgeError> {
        let status = response.status();

        if status.is_success() {
            response.json().await.map_err(|e| ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("Failed to parse response: {}", e),
            })
        } else {
            Err(self.handle_error_response(response, status).await)
        }
    }

    /// Map an error response from the API.
    async fn handle_error_response(&self, response: Response, status: StatusCode) -> ForgeError {
        // Extract headers before consuming the body.
        let headers = response.headers();
        let rate_limited = headers
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.trim() == "0");
        let required_permissions = headers
            .get("X-Accepted-GitHub-Permissions")
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let message = match response.json::<GitHubErrorResponse>().await {
            Ok(err) => err.message,
            Err(_) => "Unknown error".to_string(),
        };

        match status {
            StatusCode::UNAUTHORIZED => ForgeError::AuthFailed(INVALID_TOKEN_MESSAGE.into()),
            StatusCode::FORBIDDEN if rate_limited => ForgeError::RateLimited,
            StatusCode::FORBIDDEN => {
                let mut err_msg = format!("Permission denied: {}", message);
                if let Some(perms) = required_permissions.filter(|p| !p.is_empty()) {
                    err_msg.push_str(&format!(" [required: {}]", perms));
                }
                ForgeError::AuthFailed(err_msg)
            }
            StatusCode::NOT_FOUND => ForgeError::NotFound(message),
            StatusCode::UNPROCESSABLE_ENTITY if is_fast_forward_rejection(&message) => {
                ForgeError::Conflict(message)
            }
            StatusCode::TOO_MANY_REQUESTS => ForgeError::RateLimited,
            _ if status.is_server_error() => ForgeError::ApiError {
                status: status.as_u16(),
                message: format!("GitHub server error: {}", message),
            },
            _ => ForgeError::ApiError {
                status: status.as_u16(),
                message,
            },
        }
    }
}

const INVALID_TOKEN_MESSAGE: &str = "Invalid or expired token";

/// GitHub reports a rejected non-force ref update as a 422 with this text.
fn is_fast_forward_rejection(message: &str) -> bool {
    message.to_ascii_lowercase().contains("fast forward")
}

/// Parse a sha from a response body.
fn parse_oid(sha: String) -> Result<Oid, ForgeError> {
    Oid::new(sha).map_err(|e| ForgeError::ApiError {
        status: 200,
        message: format!("Malformed sha in response: {}", e),
    })
}

/// Escape the characters that cannot appear raw in a URL path segment.
///
/// Slashes are kept: they separate directories inside the `sha:path` tree-ish.
fn encode_tree_path(path: &str) -> String {
    let mut out = String::with_capacity(path.len());
    for c in path.chars() {
        match c {
            ' ' => out.push_str("%20"),
            '#' => out.push_str("%23"),
            '?' => out.push_str("%3F"),
            '%' => out.push_str("%25"),
            c => out.push(c),
        }
    }
    out
}

#[async_trait]
impl Forge for GitHubForge {
    fn name(&self) -> &'static str {
        "github"
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<BranchRef, ForgeError> {
        let url = self.repo_url(&format!("git/ref/{}", branch.ref_path()));

        let gh_ref: GitHubRef = self
            .execute("get_ref", |client, headers| client.get(&url).headers(headers))
            .await
            .map_err(|e| match e {
                ForgeError::NotFound(_) => ForgeError::NotFound(format!("branch '{}'", branch)),
                other => other,
            })?;

        Ok(BranchRef {
            name: branch.clone(),
            sha: parse_oid(gh_ref.object.sha)?,
        })
    }

    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError> {
        let url = self.repo_url(&format!("git/commits/{}", sha));

        let commit: GitHubCommit = self
            .execute("get_commit", |client, headers| {
                client.get(&url).headers(headers)
            })
            .await?;

        Ok(Commit {
            sha: parse_oid(commit.sha)?,
            tree_sha: parse_oid(commit.tree.sha)?,
            parent_shas: commit
                .parents
                .into_iter()
                .map(|p| parse_oid(p.sha))
                .collect::<Result<_, _>>()?,
        })
    }

    async fn list_tree(&self, commit: &Oid, path: &str) -> Result<Vec<ListedEntry>, ForgeError> {
        let path = path.trim_matches('/');
        let url = self.repo_url(&format!(
            "git/trees/{}:{}?recursive=1",
            commit,
            encode_tree_path(path)
        ));

        let tree: GitHubTree = self
            .execute("list_tree", |client, headers| {
                client.get(&url).headers(headers)
            })
            .await?;

        // A partial listing could hide matches; never resolve against one
        if tree.truncated {
            warn!(path, "GitHub truncated the recursive tree listing");
            return Err(ForgeError::ApiError {
                status: 200,
                message: format!("tree listing truncated for '{path}'"),
            });
        }

        Ok(tree
            .tree
            .into_iter()
            .map(|item| ListedEntry {
                path: if path.is_empty() {
                    item.path
                } else {
                    format!("{}/{}", path, item.path)
                },
                object_type: item.object_type,
                mode: item.mode,
            })
            .collect())
    }

    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError> {
        let url = self.repo_url("git/trees");
        let body = CreateTreeBody {
            base_tree: request.base_tree.as_str(),
            tree: &request.entries,
        };

        let created: GitHubObject = self
            .execute("create_tree", |client, headers| {
                client.post(&url).headers(headers).json(&body)
            })
            .await?;

        parse_oid(created.sha)
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        let url = self.repo_url("git/commits");
        let body = CreateCommitBody {
            message: &request.message,
            tree: request.tree.as_str(),
            parents: request.parents.iter().map(Oid::as_str).collect(),
        };

        let created: GitHubObject = self
            .execute("create_commit", |client, headers| {
                client.post(&url).headers(headers).json(&body)
            })
            .await?;

        parse_oid(created.sha)
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<BranchRef, ForgeError> {
        let url = self.repo_url(&format!("git/refs/{}", request.branch.ref_path()));
        let body = UpdateRefBody {
            sha: request.sha.as_str(),
            force: request.force,
        };

        let updated: GitHubRef = self
            .execute("update_ref", |client, headers| {
                client.patch(&url).headers(headers).json(&body)
            })
            .await?;

        Ok(BranchRef {
            name: request.branch,
            sha: parse_oid(updated.object.sha)?,
        })
    }
}

// --------------------------------------------------------------------------
// Wire formats
// --------------------------------------------------------------------------

/// Request body for creating a tree.
#[derive(Serialize)]
struct CreateTreeBody<'a> {
    base_tree: &'a str,
    tree: &'a [TreeEntry],
}

/// Request body for creating a commit.
#[derive(Serialize)]
struct CreateCommitBody<'a> {
    message: &'a str,
    tree: &'a str,
    parents: Vec<&'a str>,
}

/// Request body for moving a ref.
#[derive(Serialize)]
struct UpdateRefBody<'a> {
    sha: &'a str,
    force: bool,
}

/// GitHub error response format.
#[derive(Deserialize)]
struct GitHubErrorResponse {
    message: String,
}

/// Any object reference (`{sha}`).
#[derive(Deserialize)]
struct GitHubObject {
    sha: String,
}

/// Ref response format.
#[derive(Deserialize)]
struct GitHubRef {
    object: GitHubObject,
}

/// Commit response format.
#[derive(Deserialize)]
struct GitHubCommit {
    sha: String,
    tree: GitHubObject,
    #[serde(default)]
    parents: Vec<GitHubObject>,
}

/// Tree response format.
#[derive(Deserialize)]
struct GitHubTree {
    tree: Vec<GitHubTreeItem>,
    #[serde(default)]
    truncated: bool,
}

#[derive(Deserialize)]
struct GitHubTreeItem {
    path: String,
    #[serde(rename = "type")]
    object_type: ObjectType,
    mode: String,
}

// --------------------------------------------------------------------------
// URL Parsing
// --------------------------------------------------------------------------

/// Parse a GitHub remote URL to extract owner and repo.
///
/// Supports both SSH and HTTPS formats:
/// - `git@github.com:owner/repo.git`
/// - `https://github.com/owner/repo.git`
/// - `https://github.com/owner/repo`
///
/// # Returns
///
/// `Some((owner, repo))` if the URL is a valid GitHub URL, `None` otherwise.
///
/// # Example
///
/// ```
/// use article_sweep::forge::github::parse_github_url;
///
/// let (owner, repo) = parse_github_url("git@github.com:octocat/hello-world.git").unwrap();
/// assert_eq!(owner, "octocat");
/// assert_eq!(repo, "hello-world");
/// ```
pub fn parse_github_url(url: &str) -> Option<(String, String)> {
    // SSH format: git@github.com:owner/repo.git
    if let Some(rest) = url.strip_prefix("git@github.com:") {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    // HTTPS format: https://github.com/owner/repo.git
    if let Some(rest) = url
        .strip_prefix("https://github.com/")
        .or_else(|| url.strip_prefix("http://github.com/"))
    {
        let rest = rest.strip_suffix(".git").unwrap_or(rest);
        let parts: Vec<&str> = rest.splitn(2, '/').collect();
        if parts.len() == 2 && !parts[0].is_empty() && !parts[1].is_empty() {
            return Some((parts[0].to_string(), parts[1].to_string()));
        }
    }

    None
}
