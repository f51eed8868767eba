// ABOUTME: Deploy lock to prevent concurrent deployments into the same install root.
// ABOUTME: Uses atomic file creation with lock info stored in <install_root>/.slipway.lock.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use crate::types::AppName;

use super::DeployFailure;

/// Information about who holds a deploy lock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockInfo {
    /// Hostname of the machine that holds the lock.
    pub holder: String,
    /// Process ID of the lock holder.
    pub pid: u32,
    /// When the lock was acquired.
    pub started_at: DateTime<Utc>,
    /// Application being deployed.
    pub app: String,
}

impl LockInfo {
    /// Create new lock info for the current process.
    pub fn new(app: &AppName) -> Self {
        Self {
            holder: gethostname::gethostname().to_string_lossy().into_owned(),
            pid: std::process::id(),
            started_at: Utc::now(),
            app: app.to_string(),
        }
    }

    /// Check if this lock is stale (older than 1 hour).
    pub fn is_stale(&self) -> bool {
        let age = Utc::now() - self.started_at;
        age.num_hours() >= 1
    }

    /// Read the lock file at `path`, if present and well-formed.
    pub fn read(path: &Path) -> Option<Self> {
        let raw = fs::read_to_string(path).ok()?;
        serde_json::from_str(&raw).ok()
    }
}

/// A held deploy lock that releases on drop.
#[derive(Debug)]
pub struct DeployLock {
    path: PathBuf,
    released: bool,
}

impl DeployLock {
    /// Acquire the lock file at `path`.
    ///
    /// Creation uses `O_CREAT | O_EXCL`, so two processes cannot both succeed.
    /// Stale locks (>1 hour) and unreadable lock files are broken with a
    /// warning; `force` breaks a live lock too.
    pub fn acquire(path: &Path, app: &AppName, force: bool) -> Result<Self, DeployFailure> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                DeployFailure::Lock(format!("failed to create {}: {}", parent.display(), e))
            })?;
        }

        let lock_json = serde_json::to_string(&LockInfo::new(app))
            .map_err(|e| DeployFailure::Lock(format!("failed to serialize lock: {}", e)))?;

        match Self::try_create(path, &lock_json) {
            Ok(()) => return Ok(Self::held(path)),
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(DeployFailure::Lock(format!(
                    "failed to create {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        match LockInfo::read(path) {
            Some(existing) if force => {
                tracing::warn!(
                    "Breaking lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
            }
            Some(existing) if existing.is_stale() => {
                tracing::warn!(
                    "Auto-breaking stale lock held by {} (pid {}) since {}",
                    existing.holder,
                    existing.pid,
                    existing.started_at
                );
            }
            Some(existing) => {
                return Err(DeployFailure::LockHeld {
                    holder: existing.holder,
                    pid: existing.pid,
                    started_at: existing.started_at,
                });
            }
            None => tracing::warn!("Lock info unreadable, breaking lock"),
        }

        tracing::debug!("Removing stale/forced lock at {}", path.display());
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(DeployFailure::Lock(format!(
                    "failed to break lock {}: {}",
                    path.display(),
                    e
                )));
            }
        }

        Self::try_create(path, &lock_json).map_err(|e| match e.kind() {
            io::ErrorKind::AlreadyExists => {
                DeployFailure::Lock("lock acquired by another process during break".to_string())
            }
            _ => DeployFailure::Lock(format!("failed to create {}: {}", path.display(), e)),
        })?;

        Ok(Self::held(path))
    }

    fn held(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            released: false,
        }
    }

    fn try_create(path: &Path, contents: &str) -> io::Result<()> {
        let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
        file.write_all(contents.as_bytes())?;
        file.sync_all()
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Release the lock, reporting a failure to delete the lock file.
    pub fn release(mut self) -> io::Result<()> {
        self.released = true;
        match fs::remove_file(&self.path) {
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            other => other,
        }
    }
}

impl Drop for DeployLock {
    fn drop(&mut self) {
        if !self.released {
            let _ = fs::remove_file(&self.path);
        }
    }
}
