//! forge
//!
//! Abstraction over the Git Data API of a remote hosting service.
//!
//! # Architecture
//!
//! The `Forge` trait defines the six object-level operations the deletion
//! workflow composes. The engine only ever talks to `dyn Forge`, so the
//! workflow runs unchanged against GitHub or the in-memory mock.
//!
//! - Forge adapters own transport concerns: auth headers, transient retry,
//!   and mapping HTTP statuses to [`ForgeError`]
//! - Forge adapters never decide what to delete or when to give up on a
//!   branch conflict; that belongs to the engine
//!
//! # Modules
//!
//! - `traits`: Core `Forge` trait and request types
//! - [`github`]: GitHub implementation over the REST Git Data endpoints
//! - [`mock`]: In-memory implementation for deterministic testing
//! - `retry`: Backoff policy shared by transport and workflow retries
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use article_sweep::auth::EnvTokenProvider;
//! use article_sweep::forge::{github::GitHubForge, Forge};
//!
//! let forge = GitHubForge::new(Arc::new(EnvTokenProvider::new("GITHUB_TOKEN")), "owner", "blog");
//! let head = forge.get_ref(&BranchName::new("main")?).await?;
//! println!("main is at {}", head.sha.short(7));
//! ```

pub mod github;
pub mod mock;
mod retry;
mod traits;

pub(crate) use retry::delay_millis;
pub use retry::RetryPolicy;
pub use traits::*;
