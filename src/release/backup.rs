// ABOUTME: Timestamped snapshots of the preserved paths of the outgoing release.
// ABOUTME: Written before a new release goes live; old snapshots are pruned by count.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::fsutil::{exists_no_follow, remove_path};
use crate::preserve::{PreserveError, preserve};
use crate::types::Version;

use super::store::{Release, ReleaseStore};

const MANIFEST_FILE: &str = "manifest.json";
const TIMESTAMP_FORMAT: &str = "%Y%m%dT%H%M%S%3fZ";

/// Record of one backup, also written as `manifest.json` inside it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackupManifest {
    pub path: PathBuf,
    pub version: Version,
    pub created_at: DateTime<Utc>,
    pub files: Vec<PathBuf>,
}

#[derive(Debug, thiserror::Error)]
pub enum BackupError {
    #[error("backup I/O on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Copy(#[from] PreserveError),

    #[error("failed to write backup manifest: {0}")]
    Manifest(#[from] serde_json::Error),
}

impl ReleaseStore {
    /// Snapshot `paths` of `release` into `backups/<app>-<tag>-<timestamp>`.
    ///
    /// Returns `None` when the release holds none of the paths.
    pub fn backup_preserved(
        &self,
        release: &Release,
        paths: &[PathBuf],
    ) -> Result<Option<BackupManifest>, BackupError> {
        let present: Vec<PathBuf> = paths
            .iter()
            .filter(|p| exists_no_follow(&release.path.join(p)))
            .cloned()
            .collect();
        if present.is_empty() {
            tracing::debug!("Nothing to back up in {}", release.path.display());
            return Ok(None);
        }

        let created_at = Utc::now();
        let dir = self.backups_dir().join(format!(
            "{}-{}-{}",
            self.app(),
            release.version,
            created_at.format(TIMESTAMP_FORMAT)
        ));
        fs::create_dir_all(&dir).map_err(|source| BackupError::Io {
            path: dir.clone(),
            source,
        })?;

        preserve(&release.path, &dir, &present)?;

        let manifest = BackupManifest {
            path: dir.clone(),
            version: release.version.clone(),
            created_at,
            files: present,
        };
        let manifest_path = dir.join(MANIFEST_FILE);
        fs::write(&manifest_path, serde_json::to_vec_pretty(&manifest)?).map_err(|source| {
            BackupError::Io {
                path: manifest_path,
                source,
            }
        })?;

        tracing::info!("Backed up preserved paths of {} to {}", release.version, dir.display());
        Ok(Some(manifest))
    }

    /// Backups of this application, oldest first.
    pub fn list_backups(&self) -> Result<Vec<PathBuf>, BackupError> {
        let dir = self.backups_dir();
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => return Err(BackupError::Io { path: dir, source }),
        };

        let prefix = format!("{}-", self.app());
        let mut backups: Vec<(String, PathBuf)> = entries
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
            .filter_map(|e| {
                let name = e.file_name().to_str()?.to_string();
                let rest = name.strip_prefix(&prefix)?;
                let (_, stamp) = rest.rsplit_once('-')?;
                Some((stamp.to_string(), e.path()))
            })
            .collect();

        // Fixed-width UTC stamps sort chronologically as strings.
        backups.sort();
        Ok(backups.into_iter().map(|(_, path)| path).collect())
    }

    /// Keep the `keep` newest backups and delete the rest.
    ///
    /// Deletion failures are logged and skipped. Returns the removed paths.
    pub fn prune_backups(&self, keep: usize) -> Result<Vec<PathBuf>, BackupError> {
        let backups = self.list_backups()?;
        let excess = backups.len().saturating_sub(keep);

        let mut removed = Vec::new();
        for path in backups.into_iter().take(excess) {
            match remove_path(&path) {
                Ok(()) => removed.push(path),
                Err(e) => tracing::warn!("Failed to remove backup {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }
}

/// Read the manifest stored inside a backup directory.
pub fn read_manifest(backup_dir: &Path) -> Option<BackupManifest> {
    let raw = fs::read(backup_dir.join(MANIFEST_FILE)).ok()?;
    serde_json::from_slice(&raw).ok()
}
