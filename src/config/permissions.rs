// ABOUTME: Ownership and mode fixes applied to a freshly materialized release.
// ABOUTME: Builds the shell commands; the deploy step runs them through the CommandRunner.

use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
pub struct PermissionsConfig {
    /// Set to false to leave ownership and modes as extracted.
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Owner of the release when slipway runs as root.
    #[serde(default = "default_web_user")]
    pub web_user: String,

    #[serde(default = "default_mode")]
    pub mode: String,

    /// Release-relative directories the web user must be able to write.
    #[serde(default = "default_writable")]
    pub writable: Vec<PathBuf>,

    #[serde(default = "default_writable_mode")]
    pub writable_mode: String,
}

fn default_enabled() -> bool {
    true
}

fn default_web_user() -> String {
    "www-data".to_string()
}

fn default_mode() -> String {
    "755".to_string()
}

fn default_writable() -> Vec<PathBuf> {
    vec![PathBuf::from("storage"), PathBuf::from("bootstrap/cache")]
}

fn default_writable_mode() -> String {
    "775".to_string()
}

impl Default for PermissionsConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            web_user: default_web_user(),
            mode: default_mode(),
            writable: default_writable(),
            writable_mode: default_writable_mode(),
        }
    }
}

impl PermissionsConfig {
    /// `chown` for the release. Only run when root and the user exists.
    pub fn chown_command(&self, release: &Path) -> String {
        format!(
            "chown -R {user}:{user} {}",
            shell_quote(&release.display().to_string()),
            user = shell_quote(&self.web_user)
        )
    }

    /// Probe whether the web user exists.
    pub fn user_exists_command(&self) -> String {
        format!("id -u {} >/dev/null 2>&1", shell_quote(&self.web_user))
    }

    /// `chmod` commands for the release tree and then its writable dirs.
    /// Missing writable dirs are tolerated.
    pub fn chmod_commands(&self, release: &Path) -> Vec<String> {
        let mut commands = vec![format!(
            "chmod -R {} {}",
            shell_quote(&self.mode),
            shell_quote(&release.display().to_string())
        )];

        let writable: Vec<String> = self
            .writable
            .iter()
            .map(|dir| shell_quote(&release.join(dir).display().to_string()))
            .collect();
        if !writable.is_empty() {
            commands.push(format!(
                "chmod -R {} {} 2>/dev/null || true",
                shell_quote(&self.writable_mode),
                writable.join(" ")
            ));
        }
        commands
    }
}

/// Single-quote `s` for `sh -c`.
pub(crate) fn shell_quote(s: &str) -> String {
    if !s.is_empty()
        && s
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "-_./:=@%+".contains(c))
    {
        return s.to_string();
    }
    format!("'{}'", s.replace('\'', "'\\''"))
}
