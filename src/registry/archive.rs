// ABOUTME: ZIP extraction and application-root discovery inside the extracted tree.
// ABOUTME: Blocking I/O; callers run it on the blocking thread pool.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("{} is not a readable ZIP archive: {reason}", path.display())]
    Open { path: PathBuf, reason: String },

    #[error("failed to extract {}: {reason}", path.display())]
    Extract { path: PathBuf, reason: String },

    #[error("no directory containing '{app}' found in {}", dir.display())]
    RootNotFound { dir: PathBuf, app: String },

    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Unpack the ZIP at `archive` into `dest`.
///
/// Entries whose names would escape `dest` are rejected by the zip crate.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<(), ArchiveError> {
    let file = File::open(archive).map_err(|e| ArchiveError::Open {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;
    let mut zip = zip::ZipArchive::new(file).map_err(|e| ArchiveError::Open {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })?;

    tracing::debug!("Extracting {} entries from {}", zip.len(), archive.display());
    zip.extract(dest).map_err(|e| ArchiveError::Extract {
        path: archive.to_path_buf(),
        reason: e.to_string(),
    })
}

/// The first directory in `dir`, by name, whose name contains `app`.
pub fn locate_app_root(dir: &Path, app: &str) -> Result<PathBuf, ArchiveError> {
    let entries = fs::read_dir(dir).map_err(|source| ArchiveError::Io {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|e| e.file_type().is_ok_and(|t| t.is_dir()))
        .filter(|e| e.file_name().to_string_lossy().contains(app))
        .map(|e| e.path())
        .collect();
    candidates.sort();

    candidates
        .into_iter()
        .next()
        .ok_or_else(|| ArchiveError::RootNotFound {
            dir: dir.to_path_buf(),
            app: app.to_string(),
        })
}
