// ABOUTME: GitHub REST implementation of ReleaseSource.
// ABOUTME: Maps HTTP statuses onto RegistryError and validates the release payload.

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::Deserialize;

use super::{RegistryError, ReleaseInfo, ReleaseSource, TransportError};
use crate::types::{RepoRef, Version};

pub const DEFAULT_API_URL: &str = "https://api.github.com";

const USER_AGENT: &str = concat!("slipway/", env!("CARGO_PKG_VERSION"));
const ACCEPT: &str = "application/vnd.github+json";
const RATE_LIMIT_WARN_BELOW: u32 = 10;

// Every field optional so a missing one becomes MalformedMetadata, not a
// serde error.
#[derive(Debug, Deserialize)]
struct GithubRelease {
    tag_name: Option<String>,
    #[serde(default)]
    assets: Vec<GithubAsset>,
}

#[derive(Debug, Deserialize)]
struct GithubAsset {
    name: Option<String>,
    browser_download_url: Option<String>,
}

/// Client for `GET /repos/{owner}/{repo}/releases/latest`.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
}

impl GithubClient {
    pub fn new(api_url: impl Into<String>) -> Result<Self, RegistryError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| RegistryError::Transport(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn authorized(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
        match token {
            Some(token) if !token.is_empty() => request.bearer_auth(token),
            _ => request,
        }
    }

    fn rate_limit_remaining(response: &Response) -> Option<u32> {
        response
            .headers()
            .get("x-ratelimit-remaining")?
            .to_str()
            .ok()?
            .parse()
            .ok()
    }
}

#[async_trait]
impl ReleaseSource for GithubClient {
    async fn latest_release(
        &self,
        repo: &RepoRef,
        token: Option<&str>,
    ) -> Result<ReleaseInfo, RegistryError> {
        let url = format!(
            "{}/repos/{}/{}/releases/latest",
            self.api_url,
            repo.owner(),
            repo.name()
        );
        tracing::debug!("Querying {}", url);

        let request = self.http.get(&url).header(reqwest::header::ACCEPT, ACCEPT);
        let response = Self::authorized(request, token)
            .send()
            .await
            .map_err(|e| RegistryError::Transport(e.to_string()))?;

        let remaining = Self::rate_limit_remaining(&response);
        if let Some(remaining) = remaining
            && remaining < RATE_LIMIT_WARN_BELOW
        {
            tracing::warn!("GitHub rate limit low: {remaining} requests remaining");
        }

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(match status {
                StatusCode::NOT_FOUND => RegistryError::NotFound,
                StatusCode::FORBIDDEN if remaining == Some(0) => RegistryError::Api {
                    status: status.as_u16(),
                    message: "rate limit exceeded".to_string(),
                },
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => RegistryError::Unauthorized,
                _ => RegistryError::Api {
                    status: status.as_u16(),
                    message,
                },
            });
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| RegistryError::Transport(format!("failed to read response: {e}")))?;
        parse_release(&body)
    }

    async fn download(&self, url: &str, token: Option<&str>) -> Result<Bytes, TransportError> {
        tracing::debug!("Downloading {}", url);

        // Asset URLs redirect to a CDN; ask for the binary, not the JSON description.
        let request = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT, "application/octet-stream");
        let response = Self::authorized(request, token)
            .send()
            .await
            .map_err(|e| TransportError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError::DownloadFailed {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        response
            .bytes()
            .await
            .map_err(|e| TransportError::Request(format!("failed to read body: {e}")))
    }
}

/// Extract tag and first asset from a `releases/latest` payload.
pub fn parse_release(body: &[u8]) -> Result<ReleaseInfo, RegistryError> {
    let release: GithubRelease = serde_json::from_slice(body)
        .map_err(|e| RegistryError::MalformedMetadata(format!("invalid JSON: {e}")))?;

    let tag = release
        .tag_name
        .filter(|t| !t.is_empty())
        .ok_or_else(|| RegistryError::MalformedMetadata("missing tag_name".to_string()))?;
    let version = Version::new(&tag)
        .map_err(|e| RegistryError::MalformedMetadata(format!("tag_name {tag:?}: {e}")))?;

    let asset = release
        .assets
        .into_iter()
        .next()
        .ok_or_else(|| RegistryError::MalformedMetadata("release has no assets".to_string()))?;
    let download_url = asset
        .browser_download_url
        .filter(|u| !u.is_empty())
        .ok_or_else(|| {
            RegistryError::MalformedMetadata("asset is missing browser_download_url".to_string())
        })?;
    let asset_name = asset
        .name
        .filter(|n| !n.is_empty())
        .ok_or_else(|| RegistryError::MalformedMetadata("asset is missing name".to_string()))?;

    // The asset name becomes a file name in the scratch directory.
    if asset_name.contains('/') || asset_name.contains('\\') || asset_name == ".." {
        return Err(RegistryError::MalformedMetadata(format!(
            "asset name {asset_name:?} is not a plain file name"
        )));
    }

    Ok(ReleaseInfo {
        version,
        download_url,
        asset_name,
    })
}
