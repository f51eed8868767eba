// ABOUTME: Carries stateful files from the active release into a new release tree.
// ABOUTME: Copy-only: the source release is never modified.

use std::path::{Path, PathBuf};

use crate::fsutil::{copy_tree, exists_no_follow, remove_path};

#[derive(Debug, thiserror::Error)]
pub enum PreserveError {
    #[error("failed to remove {} before preserving: {source}", path.display())]
    Remove {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to copy {} into the new release: {source}", path.display())]
    Copy {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// What [`preserve`] did with each configured path.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PreserveReport {
    /// Paths copied from the source release.
    pub copied: Vec<PathBuf>,
    /// Paths absent from the source release.
    pub skipped: Vec<PathBuf>,
}

/// Copy each relative path in `paths` from `source_root` to `dest_root`.
///
/// A path missing at the source is skipped. Anything already at the
/// destination (a template shipped in the archive, say) is replaced.
pub fn preserve(
    source_root: &Path,
    dest_root: &Path,
    paths: &[PathBuf],
) -> Result<PreserveReport, PreserveError> {
    let mut report = PreserveReport::default();

    for relative in paths {
        let source = source_root.join(relative);
        let dest = dest_root.join(relative);

        if !exists_no_follow(&source) {
            tracing::debug!("Nothing to preserve at {}", source.display());
            report.skipped.push(relative.clone());
            continue;
        }

        remove_path(&dest).map_err(|source| PreserveError::Remove {
            path: relative.clone(),
            source,
        })?;

        copy_tree(&source, &dest).map_err(|source| PreserveError::Copy {
            path: relative.clone(),
            source,
        })?;

        tracing::info!("Preserved {}", relative.display());
        report.copied.push(relative.clone());
    }

    Ok(report)
}
