//! core::objects
//!
//! Snapshot types for remote Git objects.
//!
//! Every value here is a read-only snapshot fetched once per workflow run.
//! Nothing is mutated locally; a new tree or commit is always created
//! remotely and referred to by its returned [`Oid`].

use serde::{Deserialize, Serialize};

use super::types::{BranchName, Oid};

/// A branch reference as observed at a point in time.
///
/// The `sha` is the optimistic-concurrency token for a whole workflow run:
/// the branch may only be advanced if it still points here.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BranchRef {
    /// Branch name (without `refs/heads/`).
    pub name: BranchName,
    /// Commit the branch pointed at when read.
    pub sha: Oid,
}

/// A commit snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Commit {
    /// Commit sha.
    pub sha: Oid,
    /// Root tree of the commit.
    pub tree_sha: Oid,
    /// Parent commits in order.
    pub parent_shas: Vec<Oid>,
}

/// Git object kind for a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ObjectType {
    Blob,
    Tree,
    Commit,
}

impl std::fmt::Display for ObjectType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ObjectType::Blob => write!(f, "blob"),
            ObjectType::Tree => write!(f, "tree"),
            ObjectType::Commit => write!(f, "commit"),
        }
    }
}

/// Git file mode for a tree entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileMode {
    #[serde(rename = "100644")]
    Regular,
    #[serde(rename = "100755")]
    Executable,
    #[serde(rename = "040000")]
    Directory,
    #[serde(rename = "160000")]
    Submodule,
    #[serde(rename = "120000")]
    Symlink,
}

impl FileMode {
    /// The octal mode string used on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            FileMode::Regular => "100644",
            FileMode::Executable => "100755",
            FileMode::Directory => "040000",
            FileMode::Submodule => "160000",
            FileMode::Symlink => "120000",
        }
    }

    /// Parse a wire mode string.
    pub fn parse(mode: &str) -> Option<Self> {
        match mode {
            "100644" => Some(FileMode::Regular),
            "100755" => Some(FileMode::Executable),
            "040000" | "40000" => Some(FileMode::Directory),
            "160000" => Some(FileMode::Submodule),
            "120000" => Some(FileMode::Symlink),
            _ => None,
        }
    }
}

impl std::fmt::Display for FileMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// An entry submitted in a tree-creation request.
///
/// `sha: None` serializes as an explicit `null`, which the service treats
/// as a deletion marker when the tree is created against a base tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TreeEntry {
    pub path: String,
    pub mode: FileMode,
    #[serde(rename = "type")]
    pub object_type: ObjectType,
    pub sha: Option<Oid>,
}

impl TreeEntry {
    /// A deletion marker for a regular file at `path`.
    pub fn deletion(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            mode: FileMode::Regular,
            object_type: ObjectType::Blob,
            sha: None,
        }
    }

    /// Whether this entry removes its path from the base tree.
    pub fn is_deletion(&self) -> bool {
        self.sha.is_none()
    }
}

/// An entry returned by a recursive tree listing.
///
/// `path` is always the full repository path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListedEntry {
    pub path: String,
    pub object_type: ObjectType,
    pub mode: String,
}

impl ListedEntry {
    /// Whether the entry is a file (blob).
    pub fn is_blob(&self) -> bool {
        self.object_type == ObjectType::Blob
    }
}
