// ABOUTME: Error types for deployment operations.
// ABOUTME: A DeployError names the stage, the cause and what rollback did about it.

use chrono::{DateTime, Utc};
use std::fmt;

use crate::cutover::CutoverError;
use crate::hooks::HookError;
use crate::preserve::PreserveError;
use crate::registry::{FetchError, RegistryError};
use crate::release::{MaterializeError, StoreError};
use crate::types::Version;

use super::Stage;

/// What went wrong.
#[derive(Debug, thiserror::Error)]
pub enum DeployFailure {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Preserve(#[from] PreserveError),

    #[error(transparent)]
    Materialize(#[from] MaterializeError),

    #[error(transparent)]
    Cutover(#[from] CutoverError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("migration failed: {0}")]
    Migration(String),

    #[error("health check failed: {0}")]
    HealthCheckFailed(String),

    #[error("no earlier release to roll back to")]
    RollbackUnavailable,

    #[error("no active release at {0}")]
    NoActiveRelease(String),

    #[error("deploy lock held by {holder} (pid {pid}) since {started_at}; use --break-lock to override")]
    LockHeld {
        holder: String,
        pid: u32,
        started_at: DateTime<Utc>,
    },

    #[error("deploy lock error: {0}")]
    Lock(String),

    #[error("required command '{0}' is not installed")]
    MissingDependency(String),

    #[error("cancelled")]
    Cancelled,

    #[error("background task failed: {0}")]
    Task(String),
}

/// Coarse classification of a [`DeployFailure`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployErrorKind {
    Registry,
    Transport,
    Archive,
    Scratch,
    Preserve,
    Materialize,
    Cutover,
    Hook,
    Store,
    Migration,
    HealthCheckFailed,
    RollbackUnavailable,
    NoActiveRelease,
    LockHeld,
    Lock,
    MissingDependency,
    Cancelled,
    Internal,
}

impl DeployFailure {
    pub fn kind(&self) -> DeployErrorKind {
        match self {
            DeployFailure::Registry(_) => DeployErrorKind::Registry,
            DeployFailure::Fetch(FetchError::Transport(_)) => DeployErrorKind::Transport,
            DeployFailure::Fetch(FetchError::Archive(_)) => DeployErrorKind::Archive,
            DeployFailure::Fetch(_) => DeployErrorKind::Scratch,
            DeployFailure::Preserve(_) => DeployErrorKind::Preserve,
            DeployFailure::Materialize(_) => DeployErrorKind::Materialize,
            DeployFailure::Cutover(_) => DeployErrorKind::Cutover,
            DeployFailure::Hook(_) => DeployErrorKind::Hook,
            DeployFailure::Store(_) => DeployErrorKind::Store,
            DeployFailure::Migration(_) => DeployErrorKind::Migration,
            DeployFailure::HealthCheckFailed(_) => DeployErrorKind::HealthCheckFailed,
            DeployFailure::RollbackUnavailable => DeployErrorKind::RollbackUnavailable,
            DeployFailure::NoActiveRelease(_) => DeployErrorKind::NoActiveRelease,
            DeployFailure::LockHeld { .. } => DeployErrorKind::LockHeld,
            DeployFailure::Lock(_) => DeployErrorKind::Lock,
            DeployFailure::MissingDependency(_) => DeployErrorKind::MissingDependency,
            DeployFailure::Cancelled => DeployErrorKind::Cancelled,
            DeployFailure::Task(_) => DeployErrorKind::Internal,
        }
    }
}

/// What the automatic rollback did after a post-cutover failure.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RollbackReport {
    /// The link points at `to` again. `discarded` is true when the failed
    /// release directory was removed.
    RolledBack { to: Version, discarded: bool },
    /// Nothing older to go back to; the link still points at the failed release.
    Unavailable,
    /// Rolling back failed as well.
    Failed(String),
}

impl fmt::Display for RollbackReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RollbackReport::RolledBack { to, discarded: true } => {
                write!(f, "rolled back to {to} and removed the failed release")
            }
            RollbackReport::RolledBack { to, discarded: false } => write!(f, "rolled back to {to}"),
            RollbackReport::Unavailable => f.write_str("no earlier release to roll back to"),
            RollbackReport::Failed(reason) => write!(f, "rollback failed: {reason}"),
        }
    }
}

/// A failed deploy step.
#[derive(Debug, thiserror::Error)]
#[error("{stage} failed: {cause}{}", rollback_suffix(.rollback))]
pub struct DeployError {
    pub stage: Stage,
    #[source]
    pub cause: DeployFailure,
    pub rollback: Option<RollbackReport>,
}

fn rollback_suffix(rollback: &Option<RollbackReport>) -> String {
    rollback
        .as_ref()
        .map(|r| format!(" ({r})"))
        .unwrap_or_default()
}

impl DeployError {
    pub fn new(stage: Stage, cause: impl Into<DeployFailure>) -> Self {
        Self {
            stage,
            cause: cause.into(),
            rollback: None,
        }
    }

    pub fn with_rollback(mut self, report: RollbackReport) -> Self {
        self.rollback = Some(report);
        self
    }

    pub fn kind(&self) -> DeployErrorKind {
        self.cause.kind()
    }

    /// True when the failure carries a rollback that restored an earlier release.
    pub fn rolled_back(&self) -> bool {
        matches!(self.rollback, Some(RollbackReport::RolledBack { .. }))
    }
}
