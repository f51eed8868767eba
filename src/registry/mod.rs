// ABOUTME: Release registry access: resolve the latest release and fetch its archive.
// ABOUTME: The ReleaseSource trait is the seam; GithubClient is the HTTP implementation.

mod archive;
mod fetcher;
mod github;

pub use archive::{ArchiveError, extract_archive, locate_app_root};
pub use fetcher::{ArtifactFetcher, FetchError};
pub(crate) use fetcher::remove_scratch;
pub use github::{DEFAULT_API_URL, GithubClient, parse_release};

use async_trait::async_trait;
use bytes::Bytes;

use crate::types::{RepoRef, Version};

/// Metadata of the release to install.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseInfo {
    pub version: Version,
    pub download_url: String,
    pub asset_name: String,
}

/// Errors from querying release metadata.
#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("no published release found")]
    NotFound,

    #[error("registry rejected the credentials (check the GitHub token)")]
    Unauthorized,

    #[error("release metadata is malformed: {0}")]
    MalformedMetadata(String),

    #[error("registry returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("registry request failed: {0}")]
    Transport(String),
}

/// Errors from downloading an asset.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("download of {url} failed with status {status}")]
    DownloadFailed { url: String, status: u16 },

    #[error("download request failed: {0}")]
    Request(String),
}

/// Where releases come from.
#[async_trait]
pub trait ReleaseSource: Send + Sync {
    /// Metadata of the newest published release of `repo`.
    async fn latest_release(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> Result<ReleaseInfo, RegistryError>;

    /// Raw bytes of a release asset.
    async fn download(&self, url: &str, token: Option<&str>) -> Result<Bytes, TransportError>;
}
