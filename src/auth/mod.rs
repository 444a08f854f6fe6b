//! auth - bearer credentials for forge adapters
//!
//! Acquiring a token (OAuth flows, keychains) is the host application's
//! concern. This module only defines the [`TokenProvider`] seam the forge
//! calls before every request, plus two simple providers.
//!
//! # Security
//!
//! Tokens MUST never appear in logs, error messages, or `Debug` output.
//! Every provider here implements a redacting `Debug`.
//!
//! # Example
//!
//! ```
//! use article_sweep::auth::{StaticTokenProvider, TokenProvider};
//!
//! # tokio_test::block_on(async {
//! let provider = StaticTokenProvider::new("ghp_example");
//! assert_eq!(provider.bearer_token().await.unwrap(), "ghp_example");
//! assert!(!format!("{:?}", provider).contains("ghp_example"));
//! # });
//! ```

mod errors;

pub use errors::AuthError;

/// Trait for providing bearer tokens to forge adapters.
///
/// The forge calls [`bearer_token`](TokenProvider::bearer_token) for every
/// request, so implementations may rotate or refresh credentials freely.
/// After a 401 the forge asks once more before giving up.
#[async_trait::async_trait]
pub trait TokenProvider: Send + Sync {
    /// Returns a bearer token for the next request.
    ///
    /// # Errors
    ///
    /// - [`AuthError::NotAuthenticated`] if no credential exists
    /// - [`AuthError::InvalidToken`] if the stored credential is unusable
    /// - [`AuthError::ProviderFailed`] for backing-store failures
    async fn bearer_token(&self) -> Result<String, AuthError>;

    /// Check if a credential is available without fetching it.
    fn is_authenticated(&self) -> bool;
}

/// A provider that always returns the same token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl std::fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<redacted>")
            .finish()
    }
}

#[async_trait::async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        if self.token.trim().is_empty() {
            return Err(AuthError::NotAuthenticated("static token".to_string()));
        }
        Ok(self.token.clone())
    }

    fn is_authenticated(&self) -> bool {
        !self.token.trim().is_empty()
    }
}

/// A provider that reads the token from an environment variable on each call.
///
/// Reading per call lets a long-lived process pick up a rotated token.
#[derive(Debug, Clone)]
pub struct EnvTokenProvider {
    var: String,
}

impl EnvTokenProvider {
    /// Read from the named variable (e.g. `GITHUB_TOKEN`).
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }

    fn read(&self) -> Option<String> {
        std::env::var(&self.var)
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

#[async_trait::async_trait]
impl TokenProvider for EnvTokenProvider {
    async fn bearer_token(&self) -> Result<String, AuthError> {
        let token = self
            .read()
            .ok_or_else(|| AuthError::NotAuthenticated(self.var.clone()))?;
        if token.chars().any(|c| c.is_whitespace() || c.is_control()) {
            return Err(AuthError::InvalidToken(self.var.clone()));
        }
        Ok(token)
    }

    fn is_authenticated(&self) -> bool {
        self.read().is_some()
    }
}
