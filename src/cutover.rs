// ABOUTME: Atomic switch of the install symlink between release directories.
// ABOUTME: Builds a staging link beside the install path and renames it into place.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum CutoverError {
    /// The install path is a real file or directory, not a link we manage.
    #[error(
        "{} exists and is not a symlink; refusing to replace it (move it aside to switch to symlinked releases)",
        .0.display()
    )]
    UnexpectedInstallState(PathBuf),

    #[error("release directory {} does not exist", .0.display())]
    MissingTarget(PathBuf),

    #[error("{op} {} failed: {source}", path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

fn io_err<'a>(op: &'static str, path: &'a Path) -> impl FnOnce(io::Error) -> CutoverError + 'a {
    move |source| CutoverError::Io {
        op,
        path: path.to_path_buf(),
        source,
    }
}

/// Point `install_path` at `target`.
///
/// An existing symlink is replaced, never its target. A real file or
/// directory at `install_path` fails with
/// [`CutoverError::UnexpectedInstallState`] and is left alone.
///
/// The new link is created under a temporary name and `rename(2)`d over the
/// old one, so observers see either the old release or the new one. Without an
/// atomic rename this would be unlink followed by symlink, leaving a short gap
/// where the install path does not exist.
pub fn swap(install_path: &Path, target: &Path) -> Result<(), CutoverError> {
    if !target.is_dir() {
        return Err(CutoverError::MissingTarget(target.to_path_buf()));
    }

    match fs::symlink_metadata(install_path) {
        Ok(meta) if meta.file_type().is_symlink() => {}
        Ok(_) => {
            return Err(CutoverError::UnexpectedInstallState(
                install_path.to_path_buf(),
            ));
        }
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err("inspect", install_path)(e)),
    }

    let staging = staging_link(install_path);

    // Leftover from an interrupted swap. remove_file refuses directories.
    match fs::remove_file(&staging) {
        Ok(()) => tracing::debug!("Removed stale staging link {}", staging.display()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(io_err("remove stale", &staging)(e)),
    }

    symlink(target, &staging).map_err(io_err("create link", &staging))?;

    if let Err(e) = fs::rename(&staging, install_path) {
        let _ = fs::remove_file(&staging);
        return Err(io_err("rename link over", install_path)(e));
    }

    tracing::info!("{} -> {}", install_path.display(), target.display());
    Ok(())
}

/// Point `install_path` back at a previous release. Same procedure as [`swap`].
pub fn rollback(install_path: &Path, previous: &Path) -> Result<(), CutoverError> {
    tracing::warn!("Rolling back {} to {}", install_path.display(), previous.display());
    swap(install_path, previous)
}

/// Where the install link points, if it is a link.
///
/// Relative link targets are resolved against the link's directory.
pub fn active_target(install_path: &Path) -> io::Result<Option<PathBuf>> {
    match fs::symlink_metadata(install_path) {
        Ok(meta) if meta.file_type().is_symlink() => {
            let target = fs::read_link(install_path)?;
            if target.is_absolute() {
                Ok(Some(target))
            } else {
                let parent = install_path.parent().unwrap_or_else(|| Path::new("."));
                Ok(Some(parent.join(target)))
            }
        }
        Ok(_) => Ok(None),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

fn staging_link(install_path: &Path) -> PathBuf {
    let name = install_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    install_path.with_file_name(format!(".{name}.next"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn staging_link_is_hidden_sibling() {
        assert_eq!(
            staging_link(Path::new("/srv/app")),
            PathBuf::from("/srv/.app.next")
        );
    }

    #[test]
    fn active_target_resolves_relative_links() {
        let root = tempfile::tempdir().unwrap();
        fs::create_dir(root.path().join("app-v1")).unwrap();
        symlink("app-v1", root.path().join("app")).unwrap();

        assert_eq!(
            active_target(&root.path().join("app")).unwrap(),
            Some(root.path().join("app-v1"))
        );
        assert_eq!(active_target(&root.path().join("missing")).unwrap(), None);
    }
}
