//! auth::errors
//!
//! Credential error types.
//!
//! # Design
//!
//! Error messages never contain token values. Variants carry only the
//! source name (an environment variable, a host) so failures stay
//! diagnosable without leaking secrets.
//!
//! # Example
//!
//! ```
//! use article_sweep::auth::AuthError;
//!
//! let err = AuthError::NotAuthenticated("GITHUB_TOKEN".to_string());
//! assert!(err.to_string().contains("GITHUB_TOKEN"));
//! ```

use thiserror::Error;

/// Errors from token providers.
#[derive(Debug, Error)]
pub enum AuthError {
    /// No credential is available from the named source.
    #[error("no credential available from '{0}'")]
    NotAuthenticated(String),

    /// A credential exists but is malformed.
    #[error("invalid credential from '{0}'")]
    InvalidToken(String),

    /// The provider's backing store or exchange failed.
    #[error("token provider failed: {0}")]
    ProviderFailed(String),
}

impl AuthError {
    /// Check if this error can only be fixed by supplying a new credential.
    pub fn needs_reauth(&self) -> bool {
        matches!(
            self,
            AuthError::NotAuthenticated(_) | AuthError::InvalidToken(_)
        )
    }
}
