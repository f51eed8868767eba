// ABOUTME: Resolves the latest release and turns its archive into an extracted tree.
// ABOUTME: Owns the scratch directory lifecycle for a single deploy.

use std::io;
use std::path::{Path, PathBuf};

use super::archive::{ArchiveError, extract_archive, locate_app_root};
use super::{RegistryError, ReleaseInfo, ReleaseSource, TransportError};
use crate::types::{AppName, RepoRef, is_version_like};

#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Archive(#[from] ArchiveError),

    #[error("scratch directory {}: {source}", path.display())]
    Scratch {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("scratch directory {} overlaps the install path {}", scratch.display(), install.display())]
    UnsafeScratch { scratch: PathBuf, install: PathBuf },

    #[error("extraction task failed: {0}")]
    Join(String),
}

/// Talks to a [`ReleaseSource`] on behalf of one application.
#[derive(Debug)]
pub struct ArtifactFetcher<S> {
    source: S,
    repo: RepoRef,
    app: AppName,
    token: Option<String>,
}

impl<S: ReleaseSource> ArtifactFetcher<S> {
    pub fn new(source: S, repo: RepoRef, app: AppName, token: Option<String>) -> Self {
        Self {
            source,
            repo,
            app,
            token,
        }
    }

    pub fn repo(&self) -> &RepoRef {
        &self.repo
    }

    pub async fn resolve_latest(&self) -> Result<ReleaseInfo, RegistryError> {
        let info = self
            .source
            .latest_release(&self.repo, self.token.as_deref())
            .await?;
        // Release directories are only recognised for version-like tags.
        if !is_version_like(info.version.as_str()) {
            return Err(RegistryError::MalformedMetadata(format!(
                "tag_name {:?} does not look like a version (expected e.g. v1.2.3)",
                info.version.as_str()
            )));
        }
        tracing::info!("Latest release of {} is {}", self.repo, info.version);
        Ok(info)
    }

    /// Download `info` into `scratch_dir`, extract it and return the app root.
    ///
    /// The scratch directory is wiped first. It must not be, or contain, the
    /// live install path.
    pub async fn download_and_extract(
        &self,
        info: &ReleaseInfo,
        scratch_dir: &Path,
        install_path: &Path,
    ) -> Result<PathBuf, FetchError> {
        if install_path.starts_with(scratch_dir) {
            return Err(FetchError::UnsafeScratch {
                scratch: scratch_dir.to_path_buf(),
                install: install_path.to_path_buf(),
            });
        }

        reset_scratch(scratch_dir).await?;

        let bytes = self
            .source
            .download(&info.download_url, self.token.as_deref())
            .await?;

        let archive = scratch_dir.join(&info.asset_name);
        tokio::fs::write(&archive, &bytes)
            .await
            .map_err(|source| FetchError::Scratch {
                path: archive.clone(),
                source,
            })?;
        tracing::info!("Downloaded {} ({} bytes)", info.asset_name, bytes.len());

        let dest = scratch_dir.to_path_buf();
        let app = self.app.to_string();
        tokio::task::spawn_blocking(move || {
            extract_archive(&archive, &dest)?;
            locate_app_root(&dest, &app)
        })
        .await
        .map_err(|e| FetchError::Join(e.to_string()))?
        .map_err(FetchError::from)
    }
}

async fn reset_scratch(dir: &Path) -> Result<(), FetchError> {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(source) => {
            return Err(FetchError::Scratch {
                path: dir.to_path_buf(),
                source,
            });
        }
    }
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| FetchError::Scratch {
            path: dir.to_path_buf(),
            source,
        })
}

/// Remove the scratch directory. Absent is fine.
pub(crate) async fn remove_scratch(dir: &Path) -> io::Result<()> {
    match tokio::fs::remove_dir_all(dir).await {
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        other => other,
    }
}
