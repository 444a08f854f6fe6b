//! engine::commit
//!
//! Creates the tree and commit objects for a deletion.
//!
//! Nothing created here is visible on the branch until
//! [`RefAdvancer`](super::advance::RefAdvancer) moves the ref. If the tree
//! cannot be created, no commit is attempted.

use tracing::debug;

use crate::core::objects::TreeEntry;
use crate::core::types::Oid;
use crate::forge::{CreateCommitRequest, CreateTreeRequest, Forge, ForgeError};

/// Wraps deletion entries into a commit parented on the observed head.
pub struct CommitComposer<'a> {
    forge: &'a dyn Forge,
}

impl<'a> CommitComposer<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Create a tree from `base_tree` minus `entries`, then a commit with a
    /// single parent.
    ///
    /// # Returns
    ///
    /// The sha of the new commit.
    pub async fn compose(
        &self,
        base_tree: &Oid,
        entries: Vec<TreeEntry>,
        parent: &Oid,
        message: &str,
    ) -> Result<Oid, ForgeError> {
        let entry_count = entries.len();
        let tree = self
            .forge
            .create_tree(CreateTreeRequest {
                base_tree: base_tree.clone(),
                entries,
            })
            .await?;
        debug!(tree = %tree.short(7), entries = entry_count, "created tree");

        let commit = self
            .forge
            .create_commit(CreateCommitRequest {
                message: message.to_string(),
                tree,
                parents: vec![parent.clone()],
            })
            .await?;
        debug!(commit = %commit.short(7), parent = %parent.short(7), "created commit");

        Ok(commit)
    }
}
