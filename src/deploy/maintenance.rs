// ABOUTME: Operations on an installed application that never touch the registry.
// ABOUTME: Manual rollback, status and on-demand cleanup of release directories.

use serde::Serialize;
use std::path::PathBuf;

use crate::config::Config;
use crate::cutover;
use crate::release::{PruneResult, Release, ReleaseStore};
use crate::types::Version;

use super::error::{DeployError, DeployFailure};
use super::lock::{DeployLock, LockInfo};
use super::stage::Stage;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RollbackOutcome {
    pub from: Version,
    pub to: Version,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub install_path: PathBuf,
    pub active: Option<Release>,
    pub installed_version: Option<Version>,
    pub releases: Vec<Release>,
    pub lock: Option<LockInfo>,
}

/// Local view of one application's install root.
pub struct Maintenance {
    store: ReleaseStore,
}

impl Maintenance {
    pub fn new(config: &Config) -> Self {
        Self {
            store: ReleaseStore::new(&config.install_dir, config.app_name.clone()),
        }
    }

    /// Point the install link at the newest release older than the active one.
    /// The newer release stays on disk.
    pub fn rollback(&self, break_lock: bool) -> Result<RollbackOutcome, DeployError> {
        let stage = Stage::RollingBack;
        let lock = DeployLock::acquire(&self.store.lock_path(), self.store.app(), break_lock)
            .map_err(|e| DeployError::new(stage, e))?;

        let active = self
            .store
            .active_release()
            .map_err(|e| DeployError::new(stage, e))?
            .ok_or_else(|| {
                DeployError::new(
                    stage,
                    DeployFailure::NoActiveRelease(self.store.install_path().display().to_string()),
                )
            })?;
        let target = self
            .store
            .previous_before(&active.version)
            .map_err(|e| DeployError::new(stage, e))?
            .ok_or_else(|| DeployError::new(stage, DeployFailure::RollbackUnavailable))?;

        cutover::rollback(&self.store.install_path(), &target.path)
            .map_err(|e| DeployError::new(stage, e))?;

        if let Err(e) = lock.release() {
            tracing::warn!("Failed to remove deploy lock: {}", e);
        }
        Ok(RollbackOutcome {
            from: active.version,
            to: target.version,
        })
    }

    /// What is installed right now.
    pub fn status(&self) -> Result<StatusReport, DeployError> {
        let stage = Stage::Init;
        Ok(StatusReport {
            install_path: self.store.install_path(),
            active: self
                .store
                .active_release()
                .map_err(|e| DeployError::new(stage, e))?,
            installed_version: self.store.installed_version(),
            releases: self.store.list().map_err(|e| DeployError::new(stage, e))?,
            lock: LockInfo::read(&self.store.lock_path()),
        })
    }

    /// Prune releases on demand, keeping `keep` plus the active release.
    pub fn cleanup(&self, keep: usize, break_lock: bool) -> Result<PruneResult, DeployError> {
        let stage = Stage::Cleaning;
        let lock = DeployLock::acquire(&self.store.lock_path(), self.store.app(), break_lock)
            .map_err(|e| DeployError::new(stage, e))?;
        let result = self
            .store
            .prune(keep, None)
            .map_err(|e| DeployError::new(stage, e))?;
        if let Err(e) = lock.release() {
            tracing::warn!("Failed to remove deploy lock: {}", e);
        }
        Ok(result)
    }
}
