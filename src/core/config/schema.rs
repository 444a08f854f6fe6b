//! core::config::schema
//!
//! On-disk configuration schema.
//!
//! Every field is optional so a file only needs to name what differs from
//! the defaults. Defaults and validation are applied when the file is
//! resolved into a [`Config`](super::Config).
//!
//! # Example
//!
//! ```toml
//! [repository]
//! owner = "octocat"
//! repo = "blog"
//! branch = "main"
//!
//! [content]
//! article_root = "src/content/blog"
//! image_root = "public/images"
//! article_extensions = ["md", "mdx"]
//! commit_message = "Delete article: {slug}"
//!
//! [retry]
//! max_attempts = 4
//! initial_backoff_ms = 250
//! max_backoff_ms = 4000
//! conflict_retries = 3
//!
//! [auth]
//! token_env = "GITHUB_TOKEN"
//!
//! [log]
//! filter = "info"
//! ```

use serde::{Deserialize, Serialize};

/// Top-level configuration file.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigFile {
    /// Target repository
    pub repository: RepositorySection,

    /// Content layout inside the repository
    pub content: Option<ContentSection>,

    /// Retry and backoff settings
    pub retry: Option<RetrySection>,

    /// Credential lookup
    pub auth: Option<AuthSection>,

    /// Logging defaults
    pub log: Option<LogSection>,
}

/// Repository identification.
///
/// Either `owner` + `repo` or a `remote` URL must be present.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RepositorySection {
    /// Repository owner (user or organization)
    pub owner: Option<String>,

    /// Repository name
    pub repo: Option<String>,

    /// Git remote URL (SSH or HTTPS) used when owner/repo are absent
    pub remote: Option<String>,

    /// Branch to delete from (default: "main")
    pub branch: Option<String>,

    /// API base URL (default: "https://api.github.com")
    pub api_base: Option<String>,
}

/// Where articles and their images live.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ContentSection {
    /// Directory holding article files (default: "src/content/blog")
    pub article_root: Option<String>,

    /// Directory holding per-article image directories (default: "public/images")
    pub image_root: Option<String>,

    /// Article file extensions, without dots (default: ["md", "mdx"])
    pub article_extensions: Option<Vec<String>>,

    /// Commit message template; `{slug}` is replaced with the identifier
    pub commit_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    /// Attempts per HTTP request, including the first (default: 4)
    pub max_attempts: Option<u32>,

    /// First backoff delay in milliseconds (default: 250)
    pub initial_backoff_ms: Option<u64>,

    /// Backoff ceiling in milliseconds (default: 4000)
    pub max_backoff_ms: Option<u64>,

    /// Whole-workflow restarts after a branch conflict (default: 3)
    pub conflict_retries: Option<u32>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct AuthSection {
    /// Environment variable holding the bearer token (default: "GITHUB_TOKEN")
    pub token_env: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSection {
    /// `tracing` filter directive (default: "info")
    pub filter: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_minimal() {
        let file: ConfigFile = toml::from_str(
            r#"
            [repository]
            owner = "octocat"
            repo = "blog"
            "#,
        )
        .unwrap();

        assert_eq!(file.repository.owner.as_deref(), Some("octocat"));
        assert_eq!(file.repository.repo.as_deref(), Some("blog"));
        assert!(file.content.is_none());
    }

    #[test]
    fn parse_full() {
        let file: ConfigFile = toml::from_str(
            r#"
            [repository]
            remote = "git@github.com:octocat/blog.git"
            branch = "publish"
            api_base = "https://github.example.com/api/v3"

            [content]
            article_root = "posts"
            image_root = "static/img"
            article_extensions = ["md"]
            commit_message = "Remove {slug}"

            [retry]
            max_attempts = 2
            initial_backoff_ms = 10
            max_backoff_ms = 100
            conflict_retries = 0

            [auth]
            token_env = "BLOG_TOKEN"

            [log]
            filter = "debug"
            "#,
        )
        .unwrap();

        let content = file.content.unwrap();
        assert_eq!(content.article_extensions, Some(vec!["md".to_string()]));
        assert_eq!(file.retry.unwrap().conflict_retries, Some(0));
        assert_eq!(file.auth.unwrap().token_env.as_deref(), Some("BLOG_TOKEN"));
    }

    #[test]
    fn unknown_keys_rejected() {
        let result: Result<ConfigFile, _> = toml::from_str(
            r#"
            [repository]
            owner = "octocat"
            reop = "typo"
            "#,
        );
        assert!(result.is_err());
    }
}
