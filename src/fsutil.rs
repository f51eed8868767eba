// ABOUTME: Filesystem helpers shared by preservation, materialization and backups.
// ABOUTME: Recursive copy that keeps symlinks, permissions and empty directories.

use std::fs;
use std::io;
use std::os::unix::fs::symlink;
use std::path::Path;

/// Copy `src` (file, directory or symlink) to `dst`.
///
/// Directories are walked recursively and recreated even when empty. Symlinks
/// are recreated as links, never followed. Missing parents of `dst` are created.
pub(crate) fn copy_tree(src: &Path, dst: &Path) -> io::Result<()> {
    let meta = fs::symlink_metadata(src)?;
    let file_type = meta.file_type();

    if let Some(parent) = dst.parent() {
        fs::create_dir_all(parent)?;
    }

    if file_type.is_symlink() {
        let target = fs::read_link(src)?;
        symlink(target, dst)
    } else if file_type.is_dir() {
        fs::create_dir_all(dst)?;
        for entry in fs::read_dir(src)? {
            let entry = entry?;
            copy_tree(&entry.path(), &dst.join(entry.file_name()))?;
        }
        // Applied last so read-only directories can still be filled.
        fs::set_permissions(dst, meta.permissions())
    } else {
        fs::copy(src, dst).map(|_| ())
    }
}

/// Remove whatever is at `path` without following symlinks. Absent paths are fine.
pub(crate) fn remove_path(path: &Path) -> io::Result<()> {
    match fs::symlink_metadata(path) {
        Ok(meta) if meta.is_dir() => fs::remove_dir_all(path),
        Ok(_) => fs::remove_file(path),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

/// Whether anything (including a dangling symlink) exists at `path`.
pub(crate) fn exists_no_follow(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}
