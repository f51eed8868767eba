// ABOUTME: The version marker file stored at the root of each release.
// ABOUTME: Lets the deployer read which version an install path holds.

use std::fs;
use std::io;
use std::path::Path;

use crate::types::Version;

/// File name of the marker inside a release root.
pub const VERSION_MARKER: &str = "version.txt";

/// Read the marker under `release_root`.
///
/// Missing, unreadable or invalid markers all yield `None`; a deploy without a
/// marker simply proceeds.
pub fn read_version_marker(release_root: &Path) -> Option<Version> {
    let raw = fs::read_to_string(release_root.join(VERSION_MARKER)).ok()?;
    let tag = raw.trim();
    match Version::new(tag) {
        Ok(version) => Some(version),
        Err(e) => {
            tracing::warn!(
                "Ignoring invalid version marker in {}: {}",
                release_root.display(),
                e
            );
            None
        }
    }
}

pub fn write_version_marker(release_root: &Path, version: &Version) -> io::Result<()> {
    fs::write(
        release_root.join(VERSION_MARKER),
        format!("{}\n", version.as_str()),
    )
}
