//! core
//!
//! Core domain types, the Git object model, and configuration.
//!
//! # Modules
//!
//! - [`types`] - Strong types: BranchName, Oid, ArticleSlug
//! - [`objects`] - Refs, commits, and tree entries as the Git Data API sees them
//! - [`config`] - Configuration schema and loading
//!
//! # Design Principles
//!
//! - Strong typing prevents invalid states at compile time
//! - Schemas are strict and self-describing
//! - Nothing here performs I/O except config loading

pub mod config;
pub mod objects;
pub mod types;
