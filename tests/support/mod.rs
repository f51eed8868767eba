// ABOUTME: Test support utilities.
// ABOUTME: Builds release archives in memory and serves them from a fake ReleaseSource.

use async_trait::async_trait;
use bytes::Bytes;
use slipway::registry::{RegistryError, ReleaseInfo, ReleaseSource, TransportError};
use slipway::types::{RepoRef, Version};
use std::io::{Cursor, Write};
use std::sync::Once;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

static TRACING_INIT: Once = Once::new();

/// Initialize tracing for tests. Safe to call multiple times.
#[allow(dead_code)]
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::from_default_env().add_directive("slipway=debug".parse().unwrap());
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init()
            .ok();
    });
}

/// Zip `files` (path, contents) in memory.
#[allow(dead_code)]
pub fn zip_archive(files: &[(&str, &str)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default();
    for (path, contents) in files {
        writer.start_file(*path, options).unwrap();
        writer.write_all(contents.as_bytes()).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// A release archive shaped like a GitHub source zip: one top-level
/// `<app>-<tag>/` directory.
#[allow(dead_code)]
pub fn app_archive(app: &str, tag: &str) -> Vec<u8> {
    let root = format!("{app}-{}", tag.trim_start_matches('v'));
    zip_archive(&[
        (&format!("{root}/index.php"), &format!("<?php echo '{tag}';")),
        (&format!("{root}/.env"), "APP_KEY=template"),
        (&format!("{root}/storage/app/.gitignore"), "*"),
    ])
}

/// In-memory registry publishing one release at a time.
#[allow(dead_code)]
#[derive(Clone, Default)]
pub struct FakeSource {
    release: Arc<Mutex<Option<(ReleaseInfo, Vec<u8>)>>>,
    pub resolves: Arc<AtomicUsize>,
    pub downloads: Arc<AtomicUsize>,
}

#[allow(dead_code)]
impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `tag` for `app` with a generated archive.
    pub fn publishing(app: &str, tag: &str) -> Self {
        let source = Self::new();
        source.publish(app, tag);
        source
    }

    pub fn publish(&self, app: &str, tag: &str) {
        self.publish_archive(tag, app_archive(app, tag));
    }

    pub fn publish_archive(&self, tag: &str, archive: Vec<u8>) {
        let info = ReleaseInfo {
            version: Version::new(tag).unwrap(),
            download_url: format!("https://example.test/{tag}.zip"),
            asset_name: format!("{tag}.zip"),
        };
        *self.release.lock().unwrap() = Some((info, archive));
    }

    pub fn resolve_count(&self) -> usize {
        self.resolves.load(Ordering::SeqCst)
    }

    pub fn download_count(&self) -> usize {
        self.downloads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ReleaseSource for FakeSource {
    async fn latest_release(
        &self,
        _repo: &RepoRef,
        _token: Option<&str>,
    ) -> Result<ReleaseInfo, RegistryError> {
        self.resolves.fetch_add(1, Ordering::SeqCst);
        self.release
            .lock()
            .unwrap()
            .as_ref()
            .map(|(info, _)| info.clone())
            .ok_or(RegistryError::NotFound)
    }

    async fn download(&self, url: &str, _token: Option<&str>) -> Result<Bytes, TransportError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        match self.release.lock().unwrap().as_ref() {
            Some((info, archive)) if info.download_url == url => Ok(Bytes::from(archive.clone())),
            _ => Err(TransportError::DownloadFailed {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}
