//! engine::scan
//!
//! Remote state reading.
//!
//! # Architecture
//!
//! The reader produces a [`RepoSnapshot`] containing:
//! - The branch ref (its sha is the optimistic-concurrency token)
//! - The base tree of the commit the ref points at
//! - Blob paths under the article root and the image root
//!
//! Both listings are pinned to the observed commit sha, not the branch name,
//! so they describe exactly the tree the deletion will be applied to. They
//! have no mutual dependency and run concurrently.
//!
//! # Invariants
//!
//! - Scan is read-only; it never mutates the remote
//! - A storage root that does not exist lists as empty

use tracing::debug;

use crate::core::config::Config;
use crate::core::objects::BranchRef;
use crate::core::types::{BranchName, Oid};
use crate::forge::{Forge, ForgeError};

/// Read-only snapshot of the branch at the start of an attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoSnapshot {
    /// The ref as observed. New commits are parented on `branch_ref.sha`.
    pub branch_ref: BranchRef,
    /// Tree of the observed commit.
    pub base_tree: Oid,
    /// Blob paths under the article root, in listing order.
    pub article_paths: Vec<String>,
    /// Blob paths under the image root, in listing order.
    pub image_paths: Vec<String>,
}

impl RepoSnapshot {
    /// Every candidate path: article listing first, then image listing.
    pub fn existing_paths(&self) -> Vec<String> {
        self.article_paths
            .iter()
            .chain(self.image_paths.iter())
            .cloned()
            .collect()
    }
}

/// Reads the branch state a deletion is planned against.
pub struct GitStateReader<'a> {
    forge: &'a dyn Forge,
    branch: &'a BranchName,
    article_root: &'a str,
    image_root: &'a str,
}

impl<'a> GitStateReader<'a> {
    pub fn new(
        forge: &'a dyn Forge,
        branch: &'a BranchName,
        article_root: &'a str,
        image_root: &'a str,
    ) -> Self {
        Self {
            forge,
            branch,
            article_root,
            image_root,
        }
    }

    /// Reader for the branch and storage roots named in `config`.
    pub fn from_config(forge: &'a dyn Forge, config: &'a Config) -> Self {
        Self::new(
            forge,
            config.branch(),
            config.article_root(),
            config.image_root(),
        )
    }

    /// Fetch the ref, its commit, and both listings.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the branch does not exist
    /// - Any other forge error aborts the read
    pub async fn read_state(&self) -> Result<RepoSnapshot, ForgeError> {
        let branch_ref = self.forge.get_ref(self.branch).await?;
        let commit = self.forge.get_commit(&branch_ref.sha).await?;

        let (article_paths, image_paths) = tokio::try_join!(
            self.list_blobs(&branch_ref.sha, self.article_root),
            self.list_blobs(&branch_ref.sha, self.image_root),
        )?;

        debug!(
            branch = %self.branch,
            head = %branch_ref.sha.short(7),
            articles = article_paths.len(),
            images = image_paths.len(),
            "read branch state"
        );

        Ok(RepoSnapshot {
            branch_ref,
            base_tree: commit.tree_sha,
            article_paths,
            image_paths,
        })
    }

    async fn list_blobs(&self, commit: &Oid, root: &str) -> Result<Vec<String>, ForgeError> {
        match self.forge.list_tree(commit, root).await {
            Ok(entries) => Ok(entries
                .into_iter()
                .filter(|e| e.is_blob())
                .map(|e| e.path)
                .collect()),
            Err(ForgeError::NotFound(_)) => {
                debug!(root, "storage root does not exist, treating as empty");
                Ok(Vec::new())
            }
            Err(e) => Err(e),
        }
    }
}
