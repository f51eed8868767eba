// ABOUTME: Release directories, version markers and preserved-path backups.
// ABOUTME: Everything the deployer keeps on disk under the install root.

mod backup;
mod marker;
mod store;

pub use backup::{BackupError, BackupManifest, read_manifest};
pub use marker::{VERSION_MARKER, read_version_marker, write_version_marker};
pub use store::{
    BACKUPS_DIR, LOCK_FILE, MaterializeError, Materialization, PruneFailure, PruneResult, Release,
    ReleaseStore, SCRATCH_DIR, StoreError,
};
