// ABOUTME: Configuration types and parsing for slipway.yml.
// ABOUTME: Merges the file, SLIPWAY_* environment and CLI overrides into one Config.

mod env_value;
mod healthcheck;
mod hooks;
mod init;
mod permissions;

pub use env_value::EnvValue;
pub use healthcheck::HealthcheckConfig;
pub use hooks::HooksConfig;
pub use init::init_config;
pub use permissions::PermissionsConfig;
pub(crate) use permissions::shell_quote;

use crate::error::{Error, Result};
use crate::registry::DEFAULT_API_URL;
use crate::types::{AppName, RepoRef};
use serde::Deserialize;
use std::path::{Component, Path, PathBuf};

pub const CONFIG_FILENAME: &str = "slipway.yml";
pub const CONFIG_FILENAME_ALT: &str = "slipway.yaml";

pub const DEFAULT_KEEP_RELEASES: usize = 2;

/// Preserved when `preserve:` is not set.
pub const DEFAULT_PRESERVE: &[&str] = &[".env", "storage/app", "storage/logs", "public/storage"];

/// `slipway.yml` as written. Every field is optional so that env vars and
/// flags can supply the rest.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub repo: Option<String>,

    #[serde(default)]
    pub app_name: Option<String>,

    #[serde(default)]
    pub install_dir: Option<PathBuf>,

    #[serde(default)]
    pub github_token: Option<EnvValue>,

    #[serde(default)]
    pub api_url: Option<String>,

    #[serde(default)]
    pub keep_releases: Option<usize>,

    #[serde(default)]
    pub preserve: Option<Vec<PathBuf>>,

    /// Commands that must be on PATH before a deploy starts.
    #[serde(default)]
    pub requires: Vec<String>,

    #[serde(default)]
    pub hooks: HooksConfig,

    #[serde(default)]
    pub healthcheck: HealthcheckConfig,

    #[serde(default)]
    pub migrations: MigrationsConfig,

    #[serde(default)]
    pub permissions: PermissionsConfig,

    #[serde(default)]
    pub backups: BackupsConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MigrationsConfig {
    /// e.g. `php artisan migrate --force`. Unset means no migration step.
    #[serde(default)]
    pub command: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BackupsConfig {
    #[serde(default = "default_backups_enabled")]
    pub enabled: bool,

    #[serde(default = "default_backups_keep")]
    pub keep: usize,
}

fn default_backups_enabled() -> bool {
    true
}

fn default_backups_keep() -> usize {
    5
}

impl Default for BackupsConfig {
    fn default() -> Self {
        Self {
            enabled: default_backups_enabled(),
            keep: default_backups_keep(),
        }
    }
}

impl ConfigFile {
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(Error::from)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => Error::ConfigNotFound(path.to_path_buf()),
            _ => Error::Io(e),
        })?;
        Self::from_yaml(&content)
    }

    /// Load `slipway.yml` (or `.yaml`) from `dir` if present.
    pub fn discover(dir: &Path) -> Result<Option<Self>> {
        for path in [dir.join(CONFIG_FILENAME), dir.join(CONFIG_FILENAME_ALT)] {
            if path.is_file() {
                tracing::debug!("Using configuration {}", path.display());
                return Self::load(&path).map(Some);
            }
        }
        Ok(None)
    }
}

/// Values that take precedence over the file, from env vars or flags.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Overrides {
    pub repo: Option<String>,
    pub app_name: Option<String>,
    pub install_dir: Option<PathBuf>,
    pub web_user: Option<String>,
    pub github_token: Option<String>,
    pub api_url: Option<String>,
    pub keep_releases: Option<usize>,
}

impl Overrides {
    /// Read `SLIPWAY_REPO`, `SLIPWAY_APP_NAME`, `SLIPWAY_INSTALL_DIR`,
    /// `SLIPWAY_WEB_USER`, `SLIPWAY_GITHUB_TOKEN`, `SLIPWAY_API_URL` and
    /// `SLIPWAY_KEEP_RELEASES`. Empty values count as unset.
    pub fn from_env() -> Result<Self> {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.is_empty())
        }

        let keep_releases = match var("SLIPWAY_KEEP_RELEASES") {
            Some(raw) => Some(raw.parse().map_err(|_| {
                Error::InvalidConfig(format!(
                    "SLIPWAY_KEEP_RELEASES must be a non-negative integer, got {raw:?}"
                ))
            })?),
            None => None,
        };

        Ok(Self {
            repo: var("SLIPWAY_REPO"),
            app_name: var("SLIPWAY_APP_NAME"),
            install_dir: var("SLIPWAY_INSTALL_DIR").map(PathBuf::from),
            web_user: var("SLIPWAY_WEB_USER"),
            github_token: var("SLIPWAY_GITHUB_TOKEN"),
            api_url: var("SLIPWAY_API_URL"),
            keep_releases,
        })
    }

    /// Layer `higher` on top of `self`; set fields in `higher` win.
    pub fn merge(self, higher: Overrides) -> Overrides {
        Overrides {
            repo: higher.repo.or(self.repo),
            app_name: higher.app_name.or(self.app_name),
            install_dir: higher.install_dir.or(self.install_dir),
            web_user: higher.web_user.or(self.web_user),
            github_token: higher.github_token.or(self.github_token),
            api_url: higher.api_url.or(self.api_url),
            keep_releases: higher.keep_releases.or(self.keep_releases),
        }
    }
}

/// Fully resolved settings handed to the deployer.
#[derive(Debug, Clone)]
pub struct Config {
    pub repo: RepoRef,
    pub app_name: AppName,
    /// Absolute directory holding the install link and the releases.
    pub install_dir: PathBuf,
    pub github_token: Option<String>,
    pub api_url: String,
    pub keep_releases: usize,
    pub preserve: Vec<PathBuf>,
    pub requires: Vec<String>,
    pub hooks: HooksConfig,
    pub healthcheck: HealthcheckConfig,
    pub migrations: MigrationsConfig,
    pub permissions: PermissionsConfig,
    pub backups: BackupsConfig,
}

impl Config {
    /// Combine `file` and `overrides`. A relative install dir is taken
    /// relative to `base_dir`.
    pub fn resolve(file: ConfigFile, overrides: Overrides, base_dir: &Path) -> Result<Self> {
        let repo_raw = overrides
            .repo
            .or(file.repo)
            .ok_or(Error::MissingSetting("repo"))?;
        let repo = RepoRef::parse(&repo_raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let app_raw = overrides
            .app_name
            .or(file.app_name)
            .unwrap_or_else(|| repo.name().to_string());
        let app_name = AppName::new(&app_raw).map_err(|e| Error::InvalidConfig(e.to_string()))?;

        let install_dir = overrides
            .install_dir
            .or(file.install_dir)
            .ok_or(Error::MissingSetting("install_dir"))?;
        let install_dir = if install_dir.is_absolute() {
            install_dir
        } else {
            base_dir.join(install_dir)
        };

        let github_token = match overrides.github_token {
            Some(token) => Some(token),
            None => file.github_token.as_ref().map(EnvValue::resolve).transpose()?,
        }
        .filter(|t| !t.is_empty());

        let api_url = overrides
            .api_url
            .or(file.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());

        let preserve = file
            .preserve
            .unwrap_or_else(|| DEFAULT_PRESERVE.iter().map(PathBuf::from).collect());
        for path in &preserve {
            validate_preserve_path(path)?;
        }

        let mut permissions = file.permissions;
        if let Some(user) = overrides.web_user {
            permissions.web_user = user;
        }

        Ok(Config {
            repo,
            app_name,
            install_dir,
            github_token,
            api_url,
            keep_releases: overrides
                .keep_releases
                .or(file.keep_releases)
                .unwrap_or(DEFAULT_KEEP_RELEASES),
            preserve,
            requires: file.requires,
            hooks: file.hooks,
            healthcheck: file.healthcheck,
            migrations: file.migrations,
            permissions,
            backups: file.backups,
        })
    }
}

fn validate_preserve_path(path: &Path) -> Result<()> {
    if path.as_os_str().is_empty() {
        return Err(Error::InvalidConfig("preserve entries cannot be empty".to_string()));
    }
    let escapes = path
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        return Err(Error::InvalidConfig(format!(
            "preserve entry {} must be relative to the release root without '..'",
            path.display()
        )));
    }
    // "." or "./." would name the release root itself.
    if !path.components().any(|c| matches!(c, Component::Normal(_))) {
        return Err(Error::InvalidConfig(format!(
            "preserve entry {} must name a path inside the release",
            path.display()
        )));
    }
    Ok(())
}
