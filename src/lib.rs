//! article-sweep - atomic article removal for Git-backed content repositories
//!
//! Deletes a published article and its image directory from a repository
//! hosted on GitHub as one commit, using only the Git Data API: no clone, no
//! working tree.
//!
//! # Architecture
//!
//! The codebase follows a layered architecture:
//!
//! - [`engine`] - Orchestrates Scan → Resolve → Plan → Commit → Advance
//! - [`core`] - Domain types, Git object model, configuration
//! - [`forge`] - Git Data API abstraction (GitHub, in-memory mock)
//! - [`auth`] - Bearer token providers
//! - [`logging`] - Optional `tracing` subscriber setup for hosts
//!
//! # Correctness Invariants
//!
//! 1. Nothing is written when the identifier matches no stored path
//! 2. The branch moves only by fast-forward from the head that was read
//! 3. A failure before the ref update leaves the branch unchanged
//! 4. A branch that moved mid-run is re-read, never overwritten
//!
//! # Example
//!
//! ```ignore
//! use article_sweep::{core::config::Config, engine::ArticleDeleter};
//!
//! let deleter = ArticleDeleter::github(Config::load()?);
//! let outcome = deleter.delete_article("my-first-post").await?;
//! println!("removed {} paths", outcome.removed_count());
//! ```

pub mod auth;
pub mod core;
pub mod engine;
pub mod forge;
pub mod logging;

pub use engine::{delete_article, ArticleDeleter, DeleteError, DeleteOutcome, WorkflowError};
