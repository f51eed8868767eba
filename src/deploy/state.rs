// ABOUTME: Deployment state marker types for the type state pattern.
// ABOUTME: Each state carries exactly the data that exists at that point of a deploy.

use std::path::PathBuf;

use crate::health::HealthStatus;
use crate::preserve::PreserveReport;
use crate::registry::ReleaseInfo;
use crate::release::Release;

/// Initial state: lock held, active release recorded.
/// Available actions: `resolve()`
#[derive(Debug, Clone, Copy, Default)]
pub struct Initialized;

/// Latest release metadata known.
/// Available actions: `fetch()`
#[derive(Debug, Clone)]
pub struct Resolved {
    pub(crate) info: ReleaseInfo,
}

/// Archive downloaded and extracted into scratch.
/// Available actions: `preserve()`
#[derive(Debug, Clone)]
pub struct Fetched {
    pub(crate) info: ReleaseInfo,
    pub(crate) extracted: PathBuf,
}

/// Preserved paths copied into the extracted tree.
/// Available actions: `materialize()`
#[derive(Debug, Clone)]
pub struct Preserved {
    pub(crate) info: ReleaseInfo,
    pub(crate) extracted: PathBuf,
    pub(crate) report: PreserveReport,
}

/// Release directory exists under the install root.
/// Available actions: `cut_over()`, `roll_back()`
#[derive(Debug, Clone)]
pub struct Materialized {
    pub(crate) release: Release,
    pub(crate) fresh: bool,
}

/// Install link points at the new release.
/// Available actions: `migrate()`, `health_check()`, `roll_back()`
#[derive(Debug, Clone)]
pub struct CutOver {
    pub(crate) release: Release,
    pub(crate) fresh: bool,
}

/// Health probe passed.
/// Available actions: `complete()`
#[derive(Debug, Clone)]
pub struct HealthChecked {
    pub(crate) release: Release,
    pub(crate) health: HealthStatus,
}

/// Deployment finished.
#[derive(Debug, Clone)]
pub struct Completed {
    pub(crate) release: Release,
}
