//! core::config
//!
//! Configuration schema and loading.
//!
//! # Overview
//!
//! The deletion workflow targets exactly one repository and branch. That
//! target, together with the content layout and retry behavior, is carried
//! in a [`Config`] value handed to the workflow constructor; nothing is read
//! from global state once a `Config` exists.
//!
//! # Precedence
//!
//! 1. Default values
//! 2. Config file
//! 3. Builder overrides (`with_*` methods)
//!
//! # Config File Locations
//!
//! Searched in order:
//! 1. `$ARTICLE_SWEEP_CONFIG` if set
//! 2. `$XDG_CONFIG_HOME/article-sweep/config.toml`
//! 3. `~/.article-sweep/config.toml`
//!
//! # Example
//!
//! ```
//! use article_sweep::core::config::Config;
//!
//! let config = Config::parse(r#"
//!     [repository]
//!     remote = "git@github.com:octocat/blog.git"
//! "#).unwrap();
//!
//! assert_eq!(config.owner(), "octocat");
//! assert_eq!(config.repo(), "blog");
//! assert_eq!(config.branch().as_str(), "main");
//! assert_eq!(config.article_root(), "src/content/blog");
//! ```

pub mod schema;

pub use schema::ConfigFile;

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

use crate::core::types::BranchName;
use crate::forge::github::parse_github_url;
use crate::forge::RetryPolicy;

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV: &str = "ARTICLE_SWEEP_CONFIG";

const DEFAULT_API_BASE: &str = "https://api.github.com";
const DEFAULT_ARTICLE_ROOT: &str = "src/content/blog";
const DEFAULT_IMAGE_ROOT: &str = "public/images";
const DEFAULT_EXTENSIONS: [&str; 2] = ["md", "mdx"];
const DEFAULT_COMMIT_MESSAGE: &str = "Delete article: {slug}";
const DEFAULT_MAX_ATTEMPTS: u32 = 4;
const DEFAULT_INITIAL_BACKOFF_MS: u64 = 250;
const DEFAULT_MAX_BACKOFF_MS: u64 = 4000;
const DEFAULT_CONFLICT_RETRIES: u32 = 3;
const DEFAULT_TOKEN_ENV: &str = "GITHUB_TOKEN";
const DEFAULT_LOG_FILTER: &str = "info";

/// Errors from configuration operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config file '{path}': {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("invalid config value: {0}")]
    InvalidValue(String),

    #[error("no config file found (set $ARTICLE_SWEEP_CONFIG or create ~/.article-sweep/config.toml)")]
    NotFound,
}

/// Resolved configuration for one target repository.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    owner: String,
    repo: String,
    branch: BranchName,
    api_base: String,
    article_root: String,
    image_root: String,
    article_extensions: Vec<String>,
    commit_message: String,
    transport_retry: RetryPolicy,
    conflict_retries: u32,
    token_env: String,
    log_filter: String,
    source: Option<PathBuf>,
}

impl Config {
    /// Create a configuration with defaults for everything except the repository.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` if owner or repo is empty.
    pub fn new(owner: impl Into<String>, repo: impl Into<String>) -> Result<Self, ConfigError> {
        let owner = non_empty("repository.owner", owner.into())?;
        let repo = non_empty("repository.repo", repo.into())?;
        Ok(Self {
            owner,
            repo,
            branch: BranchName::default(),
            api_base: DEFAULT_API_BASE.to_string(),
            article_root: DEFAULT_ARTICLE_ROOT.to_string(),
            image_root: DEFAULT_IMAGE_ROOT.to_string(),
            article_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
            commit_message: DEFAULT_COMMIT_MESSAGE.to_string(),
            transport_retry: RetryPolicy::new(
                DEFAULT_MAX_ATTEMPTS,
                Duration::from_millis(DEFAULT_INITIAL_BACKOFF_MS),
                Duration::from_millis(DEFAULT_MAX_BACKOFF_MS),
            ),
            conflict_retries: DEFAULT_CONFLICT_RETRIES,
            token_env: DEFAULT_TOKEN_ENV.to_string(),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
            source: None,
        })
    }

    /// Load configuration from the default locations.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::NotFound` when no file exists, or a read,
    /// parse, or validation error for the first file found.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::locate().ok_or(ConfigError::NotFound)?;
        Self::from_path(&path)
    }

    /// Find the first existing config file in search order.
    pub fn locate() -> Option<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_ENV) {
            let path = PathBuf::from(path);
            if path.exists() {
                return Some(path);
            }
        }

        if let Ok(xdg_home) = std::env::var("XDG_CONFIG_HOME") {
            let path = PathBuf::from(xdg_home).join("article-sweep/config.toml");
            if path.exists() {
                return Some(path);
            }
        }

        dirs::home_dir()
            .map(|home| home.join(".article-sweep/config.toml"))
            .filter(|path| path.exists())
    }

    /// Load configuration from an explicit file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let file: ConfigFile = toml::from_str(&contents).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;

        let mut config = Self::from_file(file)?;
        config.source = Some(path.to_path_buf());
        Ok(config)
    }

    /// Parse configuration from a TOML string.
    pub fn parse(contents: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            path: PathBuf::from("<inline>"),
            message: e.to_string(),
        })?;
        Self::from_file(file)
    }

    /// Apply defaults and validation to a parsed file.
    pub fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        let repository = file.repository;
        let (owner, repo) = match (repository.owner, repository.repo, repository.remote) {
            (Some(owner), Some(repo), _) => (owner, repo),
            (None, None, Some(remote)) => parse_github_url(&remote).ok_or_else(|| {
                ConfigError::InvalidValue(format!("unrecognized GitHub remote '{remote}'"))
            })?,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "repository needs both 'owner' and 'repo', or a 'remote' URL".to_string(),
                ))
            }
        };

        let mut config = Self::new(owner, repo)?;

        if let Some(branch) = repository.branch {
            config = config.with_branch(&branch)?;
        }
        if let Some(api_base) = repository.api_base {
            config = config.with_api_base(api_base);
        }

        if let Some(content) = file.content {
            if let Some(root) = content.article_root {
                config = config.with_article_root(&root)?;
            }
            if let Some(root) = content.image_root {
                config = config.with_image_root(&root)?;
            }
            if let Some(extensions) = content.article_extensions {
                config = config.with_article_extensions(extensions)?;
            }
            if let Some(message) = content.commit_message {
                config.commit_message = non_empty("content.commit_message", message)?;
            }
        }

        if let Some(retry) = file.retry {
            let max_attempts = retry.max_attempts.unwrap_or(DEFAULT_MAX_ATTEMPTS);
            if max_attempts == 0 {
                return Err(ConfigError::InvalidValue(
                    "retry.max_attempts must be at least 1".to_string(),
                ));
            }
            let initial = retry
                .initial_backoff_ms
                .unwrap_or(DEFAULT_INITIAL_BACKOFF_MS);
            let max = retry.max_backoff_ms.unwrap_or(DEFAULT_MAX_BACKOFF_MS);
            if max < initial {
                return Err(ConfigError::InvalidValue(format!(
                    "retry.max_backoff_ms ({max}) is below retry.initial_backoff_ms ({initial})"
                )));
            }
            config.transport_retry = RetryPolicy::new(
                max_attempts,
                Duration::from_millis(initial),
                Duration::from_millis(max),
            );
            if let Some(conflict_retries) = retry.conflict_retries {
                config.conflict_retries = conflict_retries;
            }
        }

        if let Some(token_env) = file.auth.and_then(|a| a.token_env) {
            config.token_env = non_empty("auth.token_env", token_env)?;
        }
        if let Some(filter) = file.log.and_then(|l| l.filter) {
            config.log_filter = non_empty("log.filter", filter)?;
        }

        Ok(config)
    }

    // =========================================================================
    // Builder overrides
    // =========================================================================

    /// Target a different branch.
    pub fn with_branch(mut self, branch: &str) -> Result<Self, ConfigError> {
        self.branch = BranchName::new(branch)
            .map_err(|e| ConfigError::InvalidValue(format!("repository.branch: {e}")))?;
        Ok(self)
    }

    /// Use a different API base URL (GitHub Enterprise, test servers).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_article_root(mut self, root: &str) -> Result<Self, ConfigError> {
        self.article_root = normalize_root("content.article_root", root)?;
        Ok(self)
    }

    pub fn with_image_root(mut self, root: &str) -> Result<Self, ConfigError> {
        self.image_root = normalize_root("content.image_root", root)?;
        Ok(self)
    }

    /// Replace the article extension variants. Leading dots are stripped.
    pub fn with_article_extensions(
        mut self,
        extensions: impl IntoIterator<Item = impl Into<String>>,
    ) -> Result<Self, ConfigError> {
        let extensions: Vec<String> = extensions
            .into_iter()
            .map(|e| e.into().trim().trim_start_matches('.').to_string())
            .collect();
        if extensions.is_empty() || extensions.iter().any(|e| e.is_empty() || e.contains('/')) {
            return Err(ConfigError::InvalidValue(
                "content.article_extensions must list at least one plain extension".to_string(),
            ));
        }
        self.article_extensions = extensions;
        Ok(self)
    }

    pub fn with_transport_retry(mut self, policy: RetryPolicy) -> Self {
        self.transport_retry = policy;
        self
    }

    pub fn with_conflict_retries(mut self, retries: u32) -> Self {
        self.conflict_retries = retries;
        self
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn repo(&self) -> &str {
        &self.repo
    }

    pub fn branch(&self) -> &BranchName {
        &self.branch
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    pub fn article_root(&self) -> &str {
        &self.article_root
    }

    pub fn image_root(&self) -> &str {
        &self.image_root
    }

    pub fn article_extensions(&self) -> &[String] {
        &self.article_extensions
    }

    /// Retry policy for individual HTTP requests.
    pub fn transport_retry(&self) -> &RetryPolicy {
        &self.transport_retry
    }

    /// Number of whole-workflow restarts allowed after a branch conflict.
    pub fn conflict_retries(&self) -> u32 {
        self.conflict_retries
    }

    /// Backoff between whole-workflow restarts.
    ///
    /// Shares the transport delays; attempts are `conflict_retries + 1`.
    pub fn conflict_retry(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.conflict_retries.saturating_add(1),
            self.transport_retry.initial_backoff,
            self.transport_retry.max_backoff,
        )
    }

    pub fn token_env(&self) -> &str {
        &self.token_env
    }

    pub fn log_filter(&self) -> &str {
        &self.log_filter
    }

    /// The file this config was loaded from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// Render the commit message for an article.
    pub fn commit_message_for(&self, slug: &str) -> String {
        self.commit_message.replace("{slug}", slug)
    }
}

fn non_empty(key: &str, value: String) -> Result<String, ConfigError> {
    if value.trim().is_empty() {
        Err(ConfigError::InvalidValue(format!("{key} cannot be empty")))
    } else {
        Ok(value)
    }
}

/// Strip surrounding slashes and reject traversal.
fn normalize_root(key: &str, root: &str) -> Result<String, ConfigError> {
    let trimmed = root.trim().trim_matches('/');
    if trimmed.is_empty() {
        return Err(ConfigError::InvalidValue(format!("{key} cannot be empty")));
    }
    if trimmed
        .split('/')
        .any(|part| part.is_empty() || part == "." || part == "..")
    {
        return Err(ConfigError::InvalidValue(format!(
            "{key} '{root}' must be a plain relative path"
        )));
    }
    Ok(trimmed.to_string())
}
