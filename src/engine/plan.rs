//! engine::plan
//!
//! Turns matched paths into deletion entries for a new tree.
//!
//! Planning is pure: no I/O, deterministic for a given input. An empty
//! plan means there is nothing to commit and the runner stops before any
//! write.

use std::collections::HashSet;

use crate::core::objects::TreeEntry;

/// Deletion markers for `matched`, one per distinct path, in input order.
///
/// Every entry is a regular-file blob with `sha: None`.
pub fn build_entries(matched: &[String]) -> Vec<TreeEntry> {
    let mut seen = HashSet::new();
    matched
        .iter()
        .filter(|path| seen.insert(path.as_str()))
        .map(|path| TreeEntry::deletion(path.as_str()))
        .collect()
}

/// The tree mutation for one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeletionPlan {
    entries: Vec<TreeEntry>,
}

impl DeletionPlan {
    pub fn new(matched: &[String]) -> Self {
        Self {
            entries: build_entries(matched),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn entries(&self) -> &[TreeEntry] {
        &self.entries
    }

    /// Paths the plan removes, in order.
    pub fn paths(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.path.clone()).collect()
    }

    pub fn into_entries(self) -> Vec<TreeEntry> {
        self.entries
    }
}
