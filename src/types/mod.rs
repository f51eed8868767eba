// ABOUTME: Validated domain types shared across the deployer.
// ABOUTME: Version tags with their ordering, repository references and app names.

mod app_name;
mod repo_ref;
mod version;

pub use app_name::{AppName, AppNameError};
pub use repo_ref::{RepoRef, RepoRefError};
pub use version::{Version, VersionError, compare_versions, is_version_like};
