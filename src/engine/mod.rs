//! engine
//!
//! Orchestrates the deletion lifecycle: Scan -> Resolve -> Plan -> Commit -> Advance.
//!
//! # Architecture
//!
//! Each stage is a small component with one job:
//!
//! 1. **Scan** ([`scan::GitStateReader`]): read the ref, its tree, and the
//!    storage listings
//! 2. **Resolve** ([`resolve::PathResolver`]): pick the stored paths that
//!    belong to the identifier
//! 3. **Plan** ([`plan::DeletionPlan`]): turn them into deletion markers
//! 4. **Commit** ([`commit::CommitComposer`]): create the tree and commit
//! 5. **Advance** ([`advance::RefAdvancer`]): fast-forward the branch
//!
//! [`runner::ArticleDeleter`] sequences them, emits [`events::StageEvent`]s,
//! and restarts from Scan when the branch moved underneath it.
//!
//! # Invariants
//!
//! - No write call is made when nothing matches
//! - The branch only changes at Advance; earlier failures leave it untouched
//! - New commits have exactly one parent: the head observed by Scan
//!
//! # Example
//!
//! ```ignore
//! use article_sweep::engine::{ArticleDeleter, TracingReporter};
//!
//! let deleter = ArticleDeleter::github(Config::load()?)
//!     .with_reporter(Arc::new(TracingReporter));
//! let outcome = deleter.delete_article("my-post").await?;
//! println!("removed {} paths", outcome.removed_count());
//! ```

pub mod advance;
pub mod commit;
pub mod errors;
pub mod events;
pub mod plan;
pub mod resolve;
pub mod runner;
pub mod scan;

pub use errors::{DeleteError, WorkflowError};
pub use events::{
    ChannelReporter, EventKind, NoopReporter, RecordingReporter, Stage, StageEvent, StageReporter,
    TracingReporter,
};
pub use runner::{delete_article, ArticleDeleter, DeleteOutcome};
