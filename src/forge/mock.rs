//! forge::mock
//!
//! Mock forge implementation for deterministic testing.
//!
//! # Design
//!
//! The mock forge is a small in-memory Git object store. Trees are flat
//! `path -> blob sha` maps, commits point at trees and parents, and branches
//! point at commits. It enforces the same rules the real service does:
//!
//! - A tree entry with `sha: None` removes an existing path; removing a path
//!   that is not in the base tree is rejected (422)
//! - A non-force ref update must be a fast-forward, otherwise `Conflict`
//!
//! Every call is recorded, any operation can be configured to fail, and
//! [`MockForge::race_next_updates`] simulates another writer publishing to
//! the branch just before a ref update lands.
//!
//! # Example
//!
//! ```
//! use article_sweep::forge::mock::MockForge;
//! use article_sweep::forge::Forge;
//! use article_sweep::core::types::BranchName;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::with_files("main", &["posts/hello.md", "img/hello/a.png"]);
//! let main = BranchName::new("main").unwrap();
//!
//! let head = forge.get_ref(&main).await.unwrap();
//! let listing = forge.list_tree(&head.sha, "img").await.unwrap();
//! assert!(listing.iter().any(|e| e.path == "img/hello/a.png"));
//! # });
//! ```

use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};

use super::traits::{
    CreateCommitRequest, CreateTreeRequest, Forge, ForgeError, UpdateRefRequest,
};
use crate::core::objects::{BranchRef, Commit, FileMode, ListedEntry, ObjectType, TreeEntry};
use crate::core::types::{BranchName, Oid};

/// Flat tree snapshot: full path -> blob sha.
type TreeFiles = BTreeMap<String, Oid>;

/// Mock forge for testing.
///
/// Thread-safe via internal `Arc<Mutex<...>>` wrapping.
#[derive(Debug, Clone)]
pub struct MockForge {
    /// Internal state shared across clones.
    inner: Arc<Mutex<MockForgeInner>>,
}

/// Internal mutable state.
#[derive(Debug, Default)]
struct MockForgeInner {
    trees: HashMap<Oid, TreeFiles>,
    commits: HashMap<Oid, MockCommit>,
    refs: HashMap<BranchName, Oid>,
    /// Counter mixed into object hashes so identical content still gets
    /// distinct commit ids.
    sequence: u64,
    /// Method to fail on (for testing error paths).
    fail_on: Option<FailOn>,
    /// Pending simulated concurrent publishes, consumed by `update_ref`.
    pending_races: u32,
    /// Recorded operations for verification.
    operations: Vec<MockOperation>,
}

#[derive(Debug, Clone)]
struct MockCommit {
    tree: Oid,
    parents: Vec<Oid>,
    message: String,
}

/// Configuration for which operation should fail.
#[derive(Debug, Clone)]
pub enum FailOn {
    GetRef(ForgeError),
    GetCommit(ForgeError),
    ListTree(ForgeError),
    CreateTree(ForgeError),
    CreateCommit(ForgeError),
    UpdateRef(ForgeError),
}

/// Recorded operation for test verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockOperation {
    GetRef {
        branch: String,
    },
    GetCommit {
        sha: Oid,
    },
    ListTree {
        commit: Oid,
        path: String,
    },
    CreateTree {
        base_tree: Oid,
        entries: Vec<TreeEntry>,
    },
    CreateCommit {
        message: String,
        tree: Oid,
        parents: Vec<Oid>,
    },
    UpdateRef {
        branch: String,
        sha: Oid,
        force: bool,
    },
}

impl MockOperation {
    /// Whether this operation writes to the remote.
    pub fn is_write(&self) -> bool {
        matches!(
            self,
            MockOperation::CreateTree { .. }
                | MockOperation::CreateCommit { .. }
                | MockOperation::UpdateRef { .. }
        )
    }
}

impl MockForge {
    /// Create a new empty mock forge (no branches).
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(MockForgeInner::default())),
        }
    }

    /// Create a mock forge whose `branch` has one commit containing `paths`.
    ///
    /// # Panics
    ///
    /// Panics if `branch` is not a valid branch name.
    pub fn with_files(branch: &str, paths: &[&str]) -> Self {
        let forge = Self::new();
        forge.push_files(branch, paths, "initial commit");
        forge
    }

    /// Configure the mock to fail on a specific operation.
    ///
    /// # Example
    ///
    /// ```
    /// use article_sweep::forge::mock::{MockForge, FailOn};
    /// use article_sweep::forge::ForgeError;
    ///
    /// let forge = MockForge::new()
    ///     .fail_on(FailOn::CreateTree(ForgeError::RateLimited));
    /// ```
    pub fn fail_on(self, fail_on: FailOn) -> Self {
        self.state().fail_on = Some(fail_on);
        self
    }

    /// Clear the failure configuration.
    pub fn clear_fail_on(&self) {
        self.state().fail_on = None;
    }

    /// Make the next `count` ref updates lose a race: just before each one is
    /// applied, another writer pushes a commit to the same branch.
    pub fn race_next_updates(&self, count: u32) {
        self.state().pending_races = count;
    }

    /// Commit `paths` on top of `branch`, as another writer would.
    ///
    /// Creates the branch if it does not exist. Returns the new head.
    ///
    /// # Panics
    ///
    /// Panics if `branch` is not a valid branch name.
    pub fn push_files(&self, branch: &str, paths: &[&str], message: &str) -> Oid {
        let branch = BranchName::new(branch).expect("valid branch name");
        let mut inner = self.state();
        inner.push_files(&branch, paths, message)
    }

    /// Current head of `branch`, if it exists.
    pub fn head(&self, branch: &str) -> Option<Oid> {
        let branch = BranchName::new(branch).ok()?;
        self.state().refs.get(&branch).cloned()
    }

    /// Sorted file paths at the head of `branch`.
    pub fn files(&self, branch: &str) -> Vec<String> {
        let inner = self.state();
        BranchName::new(branch)
            .ok()
            .and_then(|b| inner.refs.get(&b))
            .and_then(|sha| inner.commits.get(sha))
            .and_then(|c| inner.trees.get(&c.tree))
            .map(|files| files.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Message and parents of a commit (for test verification).
    pub fn commit_info(&self, sha: &Oid) -> Option<(String, Vec<Oid>)> {
        self.state()
            .commits
            .get(sha)
            .map(|c| (c.message.clone(), c.parents.clone()))
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<MockOperation> {
        self.state().operations.clone()
    }

    /// Number of recorded write operations.
    pub fn write_count(&self) -> usize {
        self.state()
            .operations
            .iter()
            .filter(|op| op.is_write())
            .count()
    }

    /// Clear recorded operations.
    pub fn clear_operations(&self) {
        self.state().operations.clear();
    }

    /// Lock the state, recovering from a poisoned lock.
    fn state(&self) -> MutexGuard<'_, MockForgeInner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Record an operation.
    fn record(&self, op: MockOperation) {
        self.state().operations.push(op);
    }

    /// Check if we should fail and return the error if so.
    fn check_fail(&self, expected: &str) -> Result<(), ForgeError> {
        let inner = self.state();
        let err = match &inner.fail_on {
            Some(FailOn::GetRef(e)) if expected == "get_ref" => e,
            Some(FailOn::GetCommit(e)) if expected == "get_commit" => e,
            Some(FailOn::ListTree(e)) if expected == "list_tree" => e,
            Some(FailOn::CreateTree(e)) if expected == "create_tree" => e,
            Some(FailOn::CreateCommit(e)) if expected == "create_commit" => e,
            Some(FailOn::UpdateRef(e)) if expected == "update_ref" => e,
            _ => return Ok(()),
        };
        Err(err.clone())
    }
}

impl Default for MockForge {
    fn default() -> Self {
        Self::new()
    }
}

impl MockForgeInner {
    fn next_oid(&mut self, kind: &str, content: &str) -> Oid {
        self.sequence += 1;
        let mut hasher = Sha256::new();
        hasher.update(kind.as_bytes());
        hasher.update(self.sequence.to_be_bytes());
        hasher.update(content.as_bytes());
        let digest = hex::encode(hasher.finalize());
        // 40 hex chars, like a SHA-1 object id
        Oid::new(&digest[..40]).unwrap_or_else(|_| unreachable!("hex digest is a valid oid"))
    }

    fn store_tree(&mut self, files: TreeFiles) -> Oid {
        let listing: String = files
            .iter()
            .map(|(path, sha)| format!("{path}={sha}\n"))
            .collect();
        let sha = self.next_oid("tree", &listing);
        self.trees.insert(sha.clone(), files);
        sha
    }

    fn store_commit(&mut self, tree: Oid, parents: Vec<Oid>, message: &str) -> Oid {
        let sha = self.next_oid("commit", &format!("{tree}{parents:?}{message}"));
        self.commits.insert(
            sha.clone(),
            MockCommit {
                tree,
                parents,
                message: message.to_string(),
            },
        );
        sha
    }

    fn head_files(&self, branch: &BranchName) -> TreeFiles {
        self.refs
            .get(branch)
            .and_then(|sha| self.commits.get(sha))
            .and_then(|c| self.trees.get(&c.tree))
            .cloned()
            .unwrap_or_default()
    }

    fn push_files(&mut self, branch: &BranchName, paths: &[&str], message: &str) -> Oid {
        let mut files = self.head_files(branch);
        for path in paths {
            let blob = self.next_oid("blob", path);
            files.insert(path.to_string(), blob);
        }
        let tree = self.store_tree(files);
        let parents = self.refs.get(branch).cloned().into_iter().collect();
        let commit = self.store_commit(tree, parents, message);
        self.refs.insert(branch.clone(), commit.clone());
        commit
    }

    /// Whether `ancestor` is reachable from `descendant` via parent links.
    fn is_ancestor(&self, ancestor: &Oid, descendant: &Oid) -> bool {
        let mut stack = vec![descendant.clone()];
        let mut seen = HashSet::new();
        while let Some(sha) = stack.pop() {
            if &sha == ancestor {
                return true;
            }
            if !seen.insert(sha.clone()) {
                continue;
            }
            if let Some(commit) = self.commits.get(&sha) {
                stack.extend(commit.parents.iter().cloned());
            }
        }
        false
    }
}

fn unprocessable(message: String) -> ForgeError {
    ForgeError::ApiError {
        status: 422,
        message,
    }
}

#[async_trait]
impl Forge for MockForge {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn get_ref(&self, branch: &BranchName) -> Result<BranchRef, ForgeError> {
        self.record(MockOperation::GetRef {
            branch: branch.to_string(),
        });
        self.check_fail("get_ref")?;

        let inner = self.state();
        let sha = inner
            .refs
            .get(branch)
            .cloned()
            .ok_or_else(|| ForgeError::NotFound(format!("branch '{}'", branch)))?;

        Ok(BranchRef {
            name: branch.clone(),
            sha,
        })
    }

    async fn get_commit(&self, sha: &Oid) -> Result<Commit, ForgeError> {
        self.record(MockOperation::GetCommit { sha: sha.clone() });
        self.check_fail("get_commit")?;

        let inner = self.state();
        let commit = inner
            .commits
            .get(sha)
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", sha)))?;

        Ok(Commit {
            sha: sha.clone(),
            tree_sha: commit.tree.clone(),
            parent_shas: commit.parents.clone(),
        })
    }

    async fn list_tree(&self, commit: &Oid, path: &str) -> Result<Vec<ListedEntry>, ForgeError> {
        self.record(MockOperation::ListTree {
            commit: commit.clone(),
            path: path.to_string(),
        });
        self.check_fail("list_tree")?;

        let inner = self.state();
        let files = inner
            .commits
            .get(commit)
            .and_then(|c| inner.trees.get(&c.tree))
            .ok_or_else(|| ForgeError::NotFound(format!("commit {}", commit)))?;

        // Empty root lists the whole tree
        let root = path.trim_matches('/');
        let prefix = if root.is_empty() {
            String::new()
        } else {
            format!("{root}/")
        };
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();

        for file in files.keys().filter(|f| f.starts_with(&prefix)) {
            // Intermediate directories below the listed root
            let components: Vec<&str> = file[prefix.len()..].split('/').collect();
            let mut dir = root.to_string();
            for component in &components[..components.len() - 1] {
                dir = if dir.is_empty() {
                    component.to_string()
                } else {
                    format!("{dir}/{component}")
                };
                if dirs.insert(dir.clone()) {
                    entries.push(ListedEntry {
                        path: dir.clone(),
                        object_type: ObjectType::Tree,
                        mode: FileMode::Directory.as_str().to_string(),
                    });
                }
            }
            entries.push(ListedEntry {
                path: file.clone(),
                object_type: ObjectType::Blob,
                mode: FileMode::Regular.as_str().to_string(),
            });
        }

        if entries.is_empty() {
            return Err(ForgeError::NotFound(format!("path '{}'", path)));
        }
        Ok(entries)
    }

    async fn create_tree(&self, request: CreateTreeRequest) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateTree {
            base_tree: request.base_tree.clone(),
            entries: request.entries.clone(),
        });
        self.check_fail("create_tree")?;

        let mut inner = self.state();
        let mut files = inner
            .trees
            .get(&request.base_tree)
            .cloned()
            .ok_or_else(|| unprocessable(format!("base_tree {} not found", request.base_tree)))?;

        let mut seen = BTreeSet::new();
        for entry in &request.entries {
            if !seen.insert(entry.path.as_str()) {
                return Err(unprocessable(format!("duplicate tree path '{}'", entry.path)));
            }
            match &entry.sha {
                None => {
                    if files.remove(&entry.path).is_none() {
                        return Err(unprocessable(format!(
                            "tree.path '{}' does not exist in base tree",
                            entry.path
                        )));
                    }
                }
                Some(sha) => {
                    files.insert(entry.path.clone(), sha.clone());
                }
            }
        }

        Ok(inner.store_tree(files))
    }

    async fn create_commit(&self, request: CreateCommitRequest) -> Result<Oid, ForgeError> {
        self.record(MockOperation::CreateCommit {
            message: request.message.clone(),
            tree: request.tree.clone(),
            parents: request.parents.clone(),
        });
        self.check_fail("create_commit")?;

        let mut inner = self.state();
        if !inner.trees.contains_key(&request.tree) {
            return Err(unprocessable(format!("tree {} not found", request.tree)));
        }
        if let Some(missing) = request
            .parents
            .iter()
            .find(|p| !inner.commits.contains_key(*p))
        {
            return Err(unprocessable(format!("parent {} not found", missing)));
        }

        Ok(inner.store_commit(request.tree, request.parents, &request.message))
    }

    async fn update_ref(&self, request: UpdateRefRequest) -> Result<BranchRef, ForgeError> {
        self.record(MockOperation::UpdateRef {
            branch: request.branch.to_string(),
            sha: request.sha.clone(),
            force: request.force,
        });
        self.check_fail("update_ref")?;

        let mut inner = self.state();
        if !inner.refs.contains_key(&request.branch) {
            return Err(ForgeError::NotFound(format!("branch '{}'", request.branch)));
        }
        if !inner.commits.contains_key(&request.sha) {
            return Err(unprocessable(format!("object {} not found", request.sha)));
        }

        if inner.pending_races > 0 {
            inner.pending_races -= 1;
            inner.push_files(&request.branch, &["concurrent/publish.md"], "concurrent publish");
        }

        let current = inner.refs.get(&request.branch).cloned();
        if let Some(current) = current {
            if !request.force && !inner.is_ancestor(&current, &request.sha) {
                return Err(ForgeError::Conflict("Update is not a fast forward".into()));
            }
        }

        inner
            .refs
            .insert(request.branch.clone(), request.sha.clone());
        Ok(BranchRef {
            name: request.branch,
            sha: request.sha,
        })
    }
}
