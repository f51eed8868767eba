// ABOUTME: Versioned release directories living side by side under the install root.
// ABOUTME: Materializes, lists, discards and prunes `<app>-<tag>` directories.

use serde::Serialize;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::cutover;
use crate::fsutil::{copy_tree, remove_path};
use crate::types::{AppName, Version, is_version_like};

use super::marker::{read_version_marker, write_version_marker};

/// Scratch directory for downloads and extraction, relative to the root.
pub const SCRATCH_DIR: &str = "temp";
/// Backup directory, relative to the root.
pub const BACKUPS_DIR: &str = "backups";
/// Lock file, relative to the root.
pub const LOCK_FILE: &str = ".slipway.lock";

/// A materialized release directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Release {
    pub version: Version,
    pub path: PathBuf,
}

/// Result of [`ReleaseStore::materialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Materialization {
    pub release: Release,
    /// True when the directory already existed and was left untouched.
    pub reused: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("release {0} is the active release and cannot be removed")]
    ReleaseActive(Version),
}

#[derive(Debug, thiserror::Error)]
pub enum MaterializeError {
    #[error("{} exists but is not a release directory", .0.display())]
    Occupied(PathBuf),

    #[error("failed to {op} {}: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// A release that could not be deleted during pruning.
#[derive(Debug)]
pub struct PruneFailure {
    pub release: Release,
    pub error: io::Error,
}

#[derive(Debug, Default)]
pub struct PruneResult {
    pub removed: Vec<Release>,
    pub failed: Vec<PruneFailure>,
}

/// Release directories for one application under one install root.
///
/// Layout:
/// ```text
/// <root>/<app>              symlink to the active release
/// <root>/<app>-<tag>/       one directory per release
/// <root>/temp/              scratch space
/// <root>/backups/           snapshots of preserved paths
/// ```
#[derive(Debug, Clone)]
pub struct ReleaseStore {
    root: PathBuf,
    app: AppName,
}

impl ReleaseStore {
    pub fn new(root: impl Into<PathBuf>, app: AppName) -> Self {
        Self {
            root: root.into(),
            app,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn app(&self) -> &AppName {
        &self.app
    }

    /// The symlink the application is served from.
    pub fn install_path(&self) -> PathBuf {
        self.root.join(self.app.as_str())
    }

    pub fn scratch_dir(&self) -> PathBuf {
        self.root.join(SCRATCH_DIR)
    }

    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    pub fn lock_path(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    pub fn release_path(&self, version: &Version) -> PathBuf {
        self.root.join(format!("{}-{}", self.app, version))
    }

    fn staging_path(&self, version: &Version) -> PathBuf {
        self.root.join(format!(".{}-{}.partial", self.app, version))
    }

    /// All release directories, oldest first by version precedence.
    ///
    /// Symlinks, hidden entries and siblings whose suffix does not look like a
    /// version (`app-organizer-v1`) are ignored.
    pub fn list(&self) -> Result<Vec<Release>, StoreError> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(StoreError::Io {
                    path: self.root.clone(),
                    source,
                });
            }
        };

        let prefix = format!("{}-", self.app);
        let mut releases = Vec::new();

        for entry in entries {
            let entry = entry.map_err(|source| StoreError::Io {
                path: self.root.clone(),
                source,
            })?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            if name.starts_with('.') {
                continue;
            }
            let Some(tag) = name.strip_prefix(&prefix) else {
                continue;
            };
            if !is_version_like(tag) {
                continue;
            }
            // DirEntry::file_type does not follow symlinks.
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            if let Ok(version) = Version::new(tag) {
                releases.push(Release {
                    version,
                    path: entry.path(),
                });
            }
        }

        releases.sort_by(|a, b| a.version.cmp(&b.version));
        Ok(releases)
    }

    /// The newest release strictly older than `version`.
    pub fn previous_before(&self, version: &Version) -> Result<Option<Release>, StoreError> {
        Ok(self
            .list()?
            .into_iter()
            .filter(|r| r.version < *version)
            .next_back())
    }

    /// The release the install link currently points at.
    pub fn active_release(&self) -> Result<Option<Release>, StoreError> {
        let install_path = self.install_path();
        let target =
            cutover::active_target(&install_path).map_err(|source| StoreError::Io {
                path: install_path.clone(),
                source,
            })?;
        let Some(target) = target else {
            return Ok(None);
        };

        let canonical = fs::canonicalize(&target).ok();
        Ok(self.list()?.into_iter().find(|r| {
            r.path == target || (canonical.is_some() && fs::canonicalize(&r.path).ok() == canonical)
        }))
    }

    /// Version recorded in the marker of whatever the install path holds.
    pub fn installed_version(&self) -> Option<Version> {
        read_version_marker(&self.install_path())
    }

    /// Turn an extracted tree into the release directory for `version`.
    ///
    /// The tree is copied into a hidden `.partial` directory and renamed into
    /// place, so a release directory is either complete or absent. An existing
    /// release directory is reused untouched.
    pub fn materialize(
        &self,
        extracted_root: &Path,
        version: &Version,
    ) -> Result<Materialization, MaterializeError> {
        let path = self.release_path(version);
        let release = Release {
            version: version.clone(),
            path: path.clone(),
        };

        match fs::symlink_metadata(&path) {
            Ok(meta) if meta.is_dir() => {
                tracing::info!("Release {} already on disk, reusing {}", version, path.display());
                return Ok(Materialization {
                    release,
                    reused: true,
                });
            }
            Ok(_) => return Err(MaterializeError::Occupied(path)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(source) => {
                return Err(MaterializeError::Io {
                    op: "inspect",
                    path,
                    source,
                });
            }
        }

        let staging = self.staging_path(version);
        remove_path(&staging).map_err(|source| MaterializeError::Io {
            op: "clear stale staging directory",
            path: staging.clone(),
            source,
        })?;

        let built = copy_tree(extracted_root, &staging)
            .map_err(|source| MaterializeError::Io {
                op: "copy release into",
                path: staging.clone(),
                source,
            })
            .and_then(|()| {
                write_version_marker(&staging, version).map_err(|source| MaterializeError::Io {
                    op: "write version marker in",
                    path: staging.clone(),
                    source,
                })
            })
            .and_then(|()| {
                fs::rename(&staging, &path).map_err(|source| MaterializeError::Io {
                    op: "move staging directory to",
                    path: path.clone(),
                    source,
                })
            });

        if let Err(e) = built {
            if let Err(cleanup) = remove_path(&staging) {
                tracing::warn!(
                    "Failed to remove staging directory {}: {}",
                    staging.display(),
                    cleanup
                );
            }
            return Err(e);
        }

        tracing::info!("Materialized {} at {}", version, path.display());
        Ok(Materialization {
            release,
            reused: false,
        })
    }

    /// Remove one release directory. The active release is refused.
    pub fn discard(&self, version: &Version) -> Result<(), StoreError> {
        if self
            .active_release()?
            .is_some_and(|active| active.version == *version)
        {
            return Err(StoreError::ReleaseActive(version.clone()));
        }

        let path = self.release_path(version);
        remove_path(&path).map_err(|source| StoreError::Io { path, source })?;
        tracing::info!("Removed release {}", version);
        Ok(())
    }

    /// Delete all but the `keep` newest releases.
    ///
    /// `exclude` and the active release survive regardless of `keep`. A
    /// release that fails to delete is reported in the result and does not
    /// stop the others.
    pub fn prune(&self, keep: usize, exclude: Option<&Version>) -> Result<PruneResult, StoreError> {
        let releases = self.list()?;
        let active = self.active_release()?.map(|r| r.version);
        let cutoff = releases.len().saturating_sub(keep);

        let mut result = PruneResult::default();
        for (index, release) in releases.into_iter().enumerate() {
            let protected = index >= cutoff
                || exclude == Some(&release.version)
                || active.as_ref() == Some(&release.version);
            if protected {
                continue;
            }

            match remove_path(&release.path) {
                Ok(()) => {
                    tracing::info!("Pruned release {}", release.version);
                    result.removed.push(release);
                }
                Err(error) => {
                    tracing::warn!("Failed to prune {}: {}", release.path.display(), error);
                    result.failed.push(PruneFailure { release, error });
                }
            }
        }

        Ok(result)
    }
}
