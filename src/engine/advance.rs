//! engine::advance
//!
//! Moves the branch to the deletion commit.
//!
//! # Invariants
//!
//! - This is the only call that makes a deletion visible
//! - The ref moves only if it still points at the sha observed at scan time
//!
//! The ref is re-read right before the update, and a moved branch fails
//! with `Conflict` without sending the update at all. The update itself is
//! sent with `force: false`, so the service rejects a move that slips in
//! between the re-read and the update.

use tracing::{debug, warn};

use super::errors::DeleteError;
use crate::core::objects::BranchRef;
use crate::core::types::{BranchName, Oid};
use crate::forge::{Forge, ForgeError, UpdateRefRequest};

/// Fast-forward-only ref updates.
pub struct RefAdvancer<'a> {
    forge: &'a dyn Forge,
}

impl<'a> RefAdvancer<'a> {
    pub fn new(forge: &'a dyn Forge) -> Self {
        Self { forge }
    }

    /// Point `branch` at `new_commit` if it still points at `expected_old`.
    ///
    /// # Errors
    ///
    /// - `DeleteError::Conflict` if the branch moved since it was read
    /// - Any other forge failure, converted
    pub async fn advance(
        &self,
        branch: &BranchName,
        new_commit: &Oid,
        expected_old: &Oid,
    ) -> Result<BranchRef, DeleteError> {
        let current = self.forge.get_ref(branch).await?;
        if &current.sha != expected_old {
            warn!(
                branch = %branch,
                expected = %expected_old.short(7),
                actual = %current.sha.short(7),
                "branch moved before update"
            );
            return Err(DeleteError::Conflict(format!(
                "branch '{}' moved from {} to {}",
                branch,
                expected_old.short(7),
                current.sha.short(7)
            )));
        }

        let updated = self
            .forge
            .update_ref(UpdateRefRequest {
                branch: branch.clone(),
                sha: new_commit.clone(),
                force: false,
            })
            .await
            .map_err(|e| match e {
                ForgeError::Conflict(msg) => DeleteError::Conflict(format!(
                    "branch '{}' was updated concurrently: {}",
                    branch, msg
                )),
                other => other.into(),
            })?;

        debug!(branch = %branch, head = %updated.sha.short(7), "advanced branch");
        Ok(updated)
    }
}
