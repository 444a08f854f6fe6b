//! engine::errors
//!
//! Error taxonomy of the deletion workflow.
//!
//! [`DeleteError`] says what went wrong; [`WorkflowError`] adds where it went
//! wrong (the stage), whether anything had been matched at that point, and
//! how many pipeline attempts were made.

use thiserror::Error;

use super::events::Stage;
use crate::core::types::TypeError;
use crate::forge::ForgeError;

/// Typed failure of a deletion.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DeleteError {
    /// The identifier was rejected before any network call.
    #[error("invalid article identifier: {0}")]
    InvalidIdentifier(String),

    /// Credential missing or rejected. Never retried.
    #[error("authentication error: {0}")]
    Auth(String),

    /// The target branch (or another required object) does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Non-2xx response from the service.
    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    /// The branch moved between read and update.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Transport failure after transient retries were exhausted.
    #[error("network error: {0}")]
    Network(String),
}

impl DeleteError {
    /// Whether restarting the whole pipeline from a fresh read may succeed.
    pub fn is_conflict(&self) -> bool {
        matches!(self, DeleteError::Conflict(_))
    }
}

impl From<ForgeError> for DeleteError {
    fn from(err: ForgeError) -> Self {
        match err {
            ForgeError::AuthRequired => DeleteError::Auth("authentication required".into()),
            ForgeError::AuthFailed(msg) => DeleteError::Auth(msg),
            ForgeError::NotFound(what) => DeleteError::NotFound(what),
            ForgeError::Conflict(msg) => DeleteError::Conflict(msg),
            ForgeError::RateLimited => DeleteError::Api {
                status: 429,
                message: "rate limit exceeded".into(),
            },
            ForgeError::ApiError { status, message } => DeleteError::Api { status, message },
            ForgeError::NetworkError(msg) => DeleteError::Network(msg),
        }
    }
}

impl From<TypeError> for DeleteError {
    fn from(err: TypeError) -> Self {
        DeleteError::InvalidIdentifier(err.to_string())
    }
}

/// Terminal failure of [`delete_article`](super::runner::ArticleDeleter::delete_article).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("deletion failed during {stage} (attempt {attempts}): {source}")]
pub struct WorkflowError {
    /// Stage that failed.
    pub stage: Stage,
    /// Number of matched paths, or `None` if resolution had not run.
    pub matched: Option<usize>,
    /// Pipeline attempts made, including the failing one.
    pub attempts: u32,
    pub source: DeleteError,
}

impl WorkflowError {
    pub fn new(stage: Stage, source: impl Into<DeleteError>) -> Self {
        Self {
            stage,
            matched: None,
            attempts: 1,
            source: source.into(),
        }
    }

    pub(crate) fn with_matched(mut self, matched: usize) -> Self {
        self.matched = Some(matched);
        self
    }

    pub(crate) fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    /// Whether resolution found something to delete before the failure.
    ///
    /// Distinguishes "the article was found but the commit pipeline failed"
    /// from failures that happened before matching.
    pub fn matched_anything(&self) -> bool {
        self.matched.is_some_and(|n| n > 0)
    }
}
