//! engine::runner
//!
//! The deletion workflow.
//!
//! # Lifecycle
//!
//! ```text
//! FetchState -> Resolve -> [nothing matched: Done] -> BuildTree -> Commit -> UpdateRef -> Done
//! ```
//!
//! Each attempt re-reads remote state. When the ref update fails with a
//! conflict, the whole pipeline restarts from `FetchState` after a backoff,
//! bounded by the configured conflict retries. Every other failure ends the
//! run immediately.
//!
//! The remote branch changes only at `UpdateRef`, so a failure or
//! cancellation at any earlier point leaves it untouched.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use article_sweep::core::config::Config;
//! use article_sweep::engine::ArticleDeleter;
//! use article_sweep::forge::mock::MockForge;
//!
//! # tokio_test::block_on(async {
//! let forge = MockForge::with_files(
//!     "main",
//!     &["src/content/blog/hello.md", "public/images/hello/cover.png"],
//! );
//! let config = Config::new("me", "blog").unwrap();
//! let deleter = ArticleDeleter::new(config, Arc::new(forge.clone()));
//!
//! let outcome = deleter.delete_article("Hello").await.unwrap();
//! assert_eq!(outcome.removed_count(), 2);
//! assert!(forge.files("main").is_empty());
//! # });
//! ```

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use super::advance::RefAdvancer;
use super::commit::CommitComposer;
use super::errors::{DeleteError, WorkflowError};
use super::events::{EventKind, NoopReporter, Stage, StageEvent, StageReporter};
use super::plan::DeletionPlan;
use super::resolve::PathResolver;
use super::scan::GitStateReader;
use crate::auth::EnvTokenProvider;
use crate::core::config::Config;
use crate::core::types::{ArticleSlug, Oid};
use crate::forge::github::GitHubForge;
use crate::forge::Forge;

/// Successful result of a deletion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DeleteOutcome {
    /// Identifier as the caller spelled it.
    pub slug: String,
    /// Paths removed from the branch, in resolution order.
    pub removed_paths: Vec<String>,
    /// The commit the branch now points at; `None` for a no-op.
    pub commit: Option<Oid>,
    /// Pipeline attempts made.
    pub attempts: u32,
}

impl DeleteOutcome {
    pub fn removed_count(&self) -> usize {
        self.removed_paths.len()
    }

    /// Whether nothing matched and nothing was written.
    pub fn is_noop(&self) -> bool {
        self.commit.is_none()
    }
}

/// Runs deletions against one configured repository branch.
pub struct ArticleDeleter {
    config: Config,
    forge: Arc<dyn Forge>,
    resolver: PathResolver,
    reporter: Arc<dyn StageReporter>,
}

impl ArticleDeleter {
    pub fn new(config: Config, forge: Arc<dyn Forge>) -> Self {
        let resolver = PathResolver::from_config(&config);
        Self {
            config,
            forge,
            resolver,
            reporter: Arc::new(NoopReporter),
        }
    }

    /// A deleter talking to GitHub with the token from the configured
    /// environment variable.
    pub fn github(config: Config) -> Self {
        let provider = Arc::new(EnvTokenProvider::new(config.token_env()));
        let forge = GitHubForge::from_config(&config, provider);
        Self::new(config, Arc::new(forge))
    }

    /// Send stage events to `reporter`.
    pub fn with_reporter(mut self, reporter: Arc<dyn StageReporter>) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Delete the article `identifier` and its image directory in a single
    /// commit.
    ///
    /// Returns a no-op outcome (zero removed paths, no commit) when nothing
    /// matches.
    ///
    /// # Errors
    ///
    /// A [`WorkflowError`] naming the failing stage. Conflicts are only
    /// returned after the conflict retry budget is spent.
    pub async fn delete_article(&self, identifier: &str) -> Result<DeleteOutcome, WorkflowError> {
        let slug = ArticleSlug::new(identifier).map_err(|e| {
            let err = WorkflowError::new(Stage::Resolve, e).with_attempts(0);
            self.emit(identifier, 0, EventKind::Failed {
                stage: err.stage,
                message: err.source.to_string(),
            });
            err
        })?;

        let policy = self.config.conflict_retry();
        let mut attempt = 1;
        loop {
            match self.attempt(&slug, attempt).await {
                Ok(outcome) => return Ok(outcome),
                Err(err) if err.source.is_conflict() && policy.allows_attempt(attempt + 1) => {
                    let delay = policy.delay_for(attempt);
                    self.emit(slug.as_str(), attempt, EventKind::Retrying {
                        delay,
                        reason: err.source.to_string(),
                    });
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => {
                    self.emit(slug.as_str(), attempt, EventKind::Failed {
                        stage: err.stage,
                        message: err.source.to_string(),
                    });
                    return Err(err);
                }
            }
        }
    }

    /// One pass of the pipeline against freshly read state.
    async fn attempt(&self, slug: &ArticleSlug, attempt: u32) -> Result<DeleteOutcome, WorkflowError> {
        let forge = self.forge.as_ref();
        let fail = |stage: Stage, matched: Option<usize>| {
            move |e: DeleteError| {
                let err = WorkflowError::new(stage, e).with_attempts(attempt);
                match matched {
                    Some(n) => err.with_matched(n),
                    None => err,
                }
            }
        };

        self.enter(slug, attempt, Stage::FetchState);
        let snapshot = GitStateReader::from_config(forge, &self.config)
            .read_state()
            .await
            .map_err(DeleteError::from)
            .map_err(fail(Stage::FetchState, None))?;

        self.enter(slug, attempt, Stage::Resolve);
        let matched = self.resolver.resolve(slug, &snapshot.existing_paths());
        debug!(slug = slug.as_str(), matched = matched.len(), "resolved paths");

        if matched.is_empty() {
            self.emit(slug.as_str(), attempt, EventKind::NothingToDelete);
            self.enter(slug, attempt, Stage::Done);
            info!(slug = slug.as_str(), "nothing to delete");
            return Ok(DeleteOutcome {
                slug: slug.to_string(),
                removed_paths: Vec::new(),
                commit: None,
                attempts: attempt,
            });
        }

        self.enter(slug, attempt, Stage::BuildTree);
        let plan = DeletionPlan::new(&matched);
        let removed_paths = plan.paths();
        let count = plan.len();

        self.enter(slug, attempt, Stage::Commit);
        let message = self.config.commit_message_for(slug.as_str());
        let commit = CommitComposer::new(forge)
            .compose(
                &snapshot.base_tree,
                plan.into_entries(),
                &snapshot.branch_ref.sha,
                &message,
            )
            .await
            .map_err(DeleteError::from)
            .map_err(fail(Stage::Commit, Some(count)))?;

        self.enter(slug, attempt, Stage::UpdateRef);
        RefAdvancer::new(forge)
            .advance(self.config.branch(), &commit, &snapshot.branch_ref.sha)
            .await
            .map_err(fail(Stage::UpdateRef, Some(count)))?;

        self.enter(slug, attempt, Stage::Done);
        self.emit(slug.as_str(), attempt, EventKind::Finished {
            removed: count,
            commit: commit.clone(),
        });
        info!(
            slug = slug.as_str(),
            removed = count,
            commit = %commit.short(7),
            "deleted article"
        );

        Ok(DeleteOutcome {
            slug: slug.to_string(),
            removed_paths,
            commit: Some(commit),
            attempts: attempt,
        })
    }

    fn enter(&self, slug: &ArticleSlug, attempt: u32, stage: Stage) {
        self.emit(slug.as_str(), attempt, EventKind::Entered { stage });
    }

    fn emit(&self, slug: &str, attempt: u32, kind: EventKind) {
        self.reporter.report(&StageEvent::new(slug, attempt, kind));
    }
}

/// Delete `identifier` from the repository described by `config`.
///
/// Convenience wrapper around [`ArticleDeleter`] for one-shot callers.
pub async fn delete_article(
    config: Config,
    forge: Arc<dyn Forge>,
    identifier: &str,
) -> Result<DeleteOutcome, WorkflowError> {
    ArticleDeleter::new(config, forge)
        .delete_article(identifier)
        .await
}
