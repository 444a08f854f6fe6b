//! forge::traits
//!
//! Forge trait definition for the Git Data API of a remote hosting service.
//!
//! # Design
//!
//! The `Forge` trait is async because every operation is a network call.
//! It exposes the six low-level object operations a tree-mutation commit
//! needs: read the branch ref, read a commit, list a tree, create a tree,
//! create a commit, and move the ref. Only [`Forge::update_ref`] changes
//! what readers of the branch observe; trees and commits created before it
//! are unreachable until the ref moves.
//!
//! # Example
//!
//! ```ignore
//! use article_sweep::forge::{Forge, CreateTreeRequest};
//! use article_sweep::core::objects::TreeEntry;
//!
//! async fn drop_file(forge: &dyn Forge, branch: &BranchName) -> Result<Oid, ForgeError> {
//!     let head = forge.get_ref(branch).await?;
//!     let commit = forge.get_commit(&head.sha).await?;
//!     forge.create_tree(CreateTreeRequest {
//!         base_tree: commit.tree_sha,
//!         entries: vec![TreeEntry::deletion("docs/old.md")],
//!     }).await
//! }
//! ```

use async_trait::async_trait;
use thiserror::Error;

use crate::core::objects::{BranchRef, Commit, ListedEntry, TreeEntry};
use crate::core::types::{BranchName, Oid};

/// Errors from forge operations.
///
/// These error types map to common failure modes when interacting
/// with remote hosting services like GitHub.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ForgeError {
    /// Authentication is required but not available.
    #[error("authentication required")]
    AuthRequired,

    /// Authentication failed (invalid token, expired, insufficient permissions).
    #[error("authentication failed: {0}")]
    AuthFailed(String),

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The ref was not a fast-forward of its current value.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Rate limit exceeded.
    #[error("rate limited")]
    RateLimited,

    /// API returned an error.
    #[error("API error: {status} - {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Network or connection error.
    #[error("network error: {0}")]
    NetworkError(String),
}

impl ForgeError {
    /// Whether the transport may retry the same request after a backoff.
    ///
    /// Conflicts are never transient: the caller must re-read state.
    pub fn is_transient(&self) -> bool {
        match self {
            ForgeError::RateLimited | ForgeError::NetworkError(_) => true,
            ForgeError::ApiError { status, .. } => *status >= 500,
            _ => false,
        }
    }
}

/// Request to create a tree on top of a base tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateTreeRequest {
    /// Tree the entries are applied to
    pub base_tree: Oid,
    /// Entries to add, replace, or delete (`sha: None`)
    pub entries: Vec<TreeEntry>,
}

/// Request to create a commit object.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateCommitRequest {
    /// Commit message
    pub message: String,
    /// Root tree of the new commit
    pub tree: Oid,
    /// Parent commits (exactly one for linear history)
    pub parents: Vec<Oid>,
}

/// Request to move a branch ref.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateRefRequest {
    /// Branch to move
    pub branch: BranchName,
    /// Commit to point at
    pub sha: Oid,
    /// Allow non-fast-forward updates. The deletion workflow never sets this.
    pub force: bool,
}

/// The Forge trait for interacting with a remote Git object store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync` to allow use across async tasks.
///
/// # Error Handling
///
/// All methods return `Result<T, ForgeError>`. Callers should handle:
/// - `AuthRequired` / `AuthFailed`: Surface to the user, do not retry
/// - `NotFound`: Resource doesn't exist
/// - `Conflict`: Re-read state before trying again
/// - `RateLimited` / `NetworkError` / 5xx `ApiError`: transient
#[async_trait]
pub trait Forge: Send + Sync {
    /// Get the forge name (e.g., "github").
    fn name(&self) -> &'static str;

    /// Read the current commit of a branch.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    async fn get_ref(&self, branch: &BranchName) -> Result<BranchRef, ForgeError>;

    /// Read a commit object.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the commit does not exist
    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError>;

    /// Recursively list everything under `path` as of `commit`.
    ///
    /// Returned paths are full repository paths and include both blobs and
    /// sub-trees.
    ///
    /// # Errors
    ///
    /// - `NotFound` if `path` does not exist in that commit
    async fn list_tree(&self, commit: &Oid, path: &str) -> Result<Vec<ListedEntry>, ForgeError>;

    /// Create a tree by applying `entries` to `base_tree`.
    ///
    /// # Returns
    ///
    /// The sha of the new tree.
    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError>;

    /// Create a commit object.
    ///
    /// # Returns
    ///
    /// The sha of the new commit.
    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError>;

    /// Move a branch to a new commit.
    ///
    /// # Errors
    ///
    /// - `Conflict` if `force` is false and the move is not a fast-forward
    /// - `NotFound` if the branch does not exist
    async fn update_ref(&self, request: UpdateRefRequest) -> Result<BranchRef, ForgeError>;
}
