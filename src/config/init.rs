// ABOUTME: Config scaffolding for new deployments.
// ABOUTME: Writes a commented slipway.yml template.

use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::types::{AppName, RepoRef};

use super::CONFIG_FILENAME;

/// Write `slipway.yml` into `dir`. Returns the path written.
pub fn init_config(
    dir: &Path,
    repo: Option<&str>,
    install_dir: Option<&Path>,
    force: bool,
) -> Result<PathBuf> {
    let config_path = dir.join(CONFIG_FILENAME);

    if config_path.exists() && !force {
        return Err(Error::AlreadyExists(config_path));
    }

    let repo = RepoRef::parse(repo.unwrap_or("owner/my-app"))
        .map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let app = AppName::new(repo.name()).map_err(|e| Error::InvalidConfig(e.to_string()))?;
    let install_dir = install_dir.unwrap_or(Path::new("/var/www"));

    std::fs::write(&config_path, template_yaml(&repo, &app, install_dir))?;
    Ok(config_path)
}

fn template_yaml(repo: &RepoRef, app: &AppName, install_dir: &Path) -> String {
    format!(
        r#"repo: {repo}
app_name: {app}
install_dir: {}

# Token for private repositories or higher rate limits.
# github_token:
#   env: GITHUB_TOKEN

keep_releases: 2

preserve:
  - .env
  - storage/app
  - storage/logs
  - public/storage

requires:
  - php

hooks:
  before_deploy: []
  after_deploy:
    - php artisan config:cache
    - php artisan route:cache
    - php artisan view:cache
  after_success: []

healthcheck:
  command: php artisan --version
  timeout: 60s

# migrations:
#   command: php artisan migrate --force

permissions:
  web_user: www-data
  writable:
    - storage
    - bootstrap/cache

backups:
  enabled: true
  keep: 5
"#,
        install_dir.display()
    )
}
