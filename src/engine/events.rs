//! engine::events
//!
//! Stage-transition events emitted by the deletion workflow.
//!
//! # Architecture
//!
//! The runner never talks to a UI directly. At every transition it builds a
//! [`StageEvent`] and hands it to a [`StageReporter`]. Reporters are purely
//! informational: they cannot fail and cannot influence control flow.
//!
//! Provided subscribers:
//! - [`NoopReporter`]: discards everything (the default)
//! - [`TracingReporter`]: logs each event through `tracing`
//! - [`ChannelReporter`]: forwards events into a tokio channel for a UI task
//! - [`RecordingReporter`]: keeps events in memory for assertions
//!
//! Any `Fn(&StageEvent) + Send + Sync` closure is also a reporter.
//!
//! # Event order
//!
//! A successful run emits `Entered` for each stage in order:
//!
//! ```text
//! FetchState -> Resolve -> BuildTree -> Commit -> UpdateRef -> Done
//! ```
//!
//! followed by `Finished`. A run that matches nothing emits `FetchState`,
//! `Resolve`, `NothingToDelete`, `Done`. A branch conflict emits `Retrying`
//! and the sequence restarts at `FetchState` with the next attempt number.

use std::sync::Mutex;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::mpsc::UnboundedSender;
use tracing::{info, warn};

use crate::core::types::Oid;
use crate::forge::delay_millis;

/// A step of the deletion pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Reading the branch ref, its commit, and the storage listings.
    FetchState,
    /// Matching the identifier against listed paths.
    Resolve,
    /// Turning matched paths into deletion entries.
    BuildTree,
    /// Creating the new tree and commit objects.
    Commit,
    /// Moving the branch to the new commit.
    UpdateRef,
    /// Terminal stage.
    Done,
}

impl Stage {
    /// Every stage in pipeline order.
    pub const ALL: [Stage; 6] = [
        Stage::FetchState,
        Stage::Resolve,
        Stage::BuildTree,
        Stage::Commit,
        Stage::UpdateRef,
        Stage::Done,
    ];

    /// Stable machine-readable name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::FetchState => "fetch_state",
            Stage::Resolve => "resolve",
            Stage::BuildTree => "build_tree",
            Stage::Commit => "commit",
            Stage::UpdateRef => "update_ref",
            Stage::Done => "done",
        }
    }

    /// Human-readable progress line for a UI.
    pub fn description(&self) -> &'static str {
        match self {
            Stage::FetchState => "Fetching branch info",
            Stage::Resolve => "Scanning files",
            Stage::BuildTree => "Building tree",
            Stage::Commit => "Creating commit",
            Stage::UpdateRef => "Updating branch",
            Stage::Done => "Done",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happened at a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventKind {
    /// The workflow entered a stage.
    Entered { stage: Stage },
    /// Resolution found no stored path for the identifier.
    NothingToDelete,
    /// The branch moved; the pipeline restarts after `delay`.
    Retrying { delay: Duration, reason: String },
    /// The workflow stopped with an error in `stage`.
    Failed { stage: Stage, message: String },
    /// The branch now points at `commit`, which removed `removed` paths.
    Finished { removed: usize, commit: Oid },
}

/// A single stage notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StageEvent {
    /// Identifier being deleted, as the caller spelled it.
    pub slug: String,
    /// Pipeline attempt (1-based); increments after a branch conflict.
    pub attempt: u32,
    /// When the transition happened.
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: EventKind,
}

impl StageEvent {
    pub fn new(slug: impl Into<String>, attempt: u32, kind: EventKind) -> Self {
        Self {
            slug: slug.into(),
            attempt,
            at: Utc::now(),
            kind,
        }
    }

    /// The stage this event entered, if it is an `Entered` event.
    pub fn entered(&self) -> Option<Stage> {
        match self.kind {
            EventKind::Entered { stage } => Some(stage),
            _ => None,
        }
    }
}

/// Subscriber for stage events.
pub trait StageReporter: Send + Sync {
    fn report(&self, event: &StageEvent);
}

impl<F> StageReporter for F
where
    F: Fn(&StageEvent) + Send + Sync,
{
    fn report(&self, event: &StageEvent) {
        self(event)
    }
}

/// Discards all events.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopReporter;

impl StageReporter for NoopReporter {
    fn report(&self, _event: &StageEvent) {}
}

/// Logs events through `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl StageReporter for TracingReporter {
    fn report(&self, event: &StageEvent) {
        let slug = event.slug.as_str();
        let attempt = event.attempt;
        match &event.kind {
            EventKind::Entered { stage } => {
                info!(slug, attempt, stage = %stage, "{}", stage.description())
            }
            EventKind::NothingToDelete => info!(slug, attempt, "nothing to delete"),
            EventKind::Retrying { delay, reason } => warn!(
                slug,
                attempt,
                delay_ms = delay_millis(*delay),
                reason = reason.as_str(),
                "branch moved, restarting deletion"
            ),
            EventKind::Failed { stage, message } => {
                warn!(slug, attempt, stage = %stage, "deletion failed: {}", message)
            }
            EventKind::Finished { removed, commit } => info!(
                slug,
                attempt,
                removed = *removed,
                commit = %commit.short(7),
                "article deleted"
            ),
        }
    }
}

/// Forwards events into an unbounded tokio channel.
///
/// A dropped receiver is ignored; the workflow keeps running.
#[derive(Debug, Clone)]
pub struct ChannelReporter {
    tx: UnboundedSender<StageEvent>,
}

impl ChannelReporter {
    pub fn new(tx: UnboundedSender<StageEvent>) -> Self {
        Self { tx }
    }
}

impl StageReporter for ChannelReporter {
    fn report(&self, event: &StageEvent) {
        let _ = self.tx.send(event.clone());
    }
}

/// Keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<StageEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the events seen so far.
    pub fn events(&self) -> Vec<StageEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Entered stages in order, across all attempts.
    pub fn stages(&self) -> Vec<Stage> {
        self.events().iter().filter_map(StageEvent::entered).collect()
    }
}

impl StageReporter for RecordingReporter {
    fn report(&self, event: &StageEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
