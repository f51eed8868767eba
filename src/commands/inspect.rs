// ABOUTME: Read-only commands: release listing and status.
// ABOUTME: Human text by default, one JSON document with --json.

use slipway::config::Config;
use slipway::deploy::Maintenance;
use slipway::error::Result;
use slipway::output::Output;
use std::fmt::Write;

pub fn releases(config: Config, output: Output) -> Result<()> {
    let status = Maintenance::new(&config).status()?;

    let mut text = String::new();
    if status.releases.is_empty() {
        text.push_str("No releases installed");
    }
    for release in status.releases.iter().rev() {
        let marker = if status.active.as_ref() == Some(release) {
            "*"
        } else {
            " "
        };
        let _ = writeln!(text, "{marker} {}  {}", release.version, release.path.display());
    }

    output.data(text.trim_end(), &status.releases);
    Ok(())
}

pub fn status(config: Config, output: Output) -> Result<()> {
    let status = Maintenance::new(&config).status()?;

    let mut text = String::new();
    let _ = writeln!(text, "App:       {}", config.app_name);
    let _ = writeln!(text, "Install:   {}", status.install_path.display());
    match &status.active {
        Some(active) => {
            let _ = writeln!(text, "Active:    {} ({})", active.version, active.path.display());
        }
        None => {
            let _ = writeln!(text, "Active:    none");
        }
    }
    if let Some(installed) = &status.installed_version
        && status.active.as_ref().map(|a| &a.version) != Some(installed)
    {
        let _ = writeln!(text, "Marker:    {installed}");
    }
    let _ = writeln!(text, "Releases:  {}", status.releases.len());
    if let Some(lock) = &status.lock {
        let _ = writeln!(
            text,
            "Locked:    by {} (pid {}) since {}",
            lock.holder, lock.pid, lock.started_at
        );
    }

    output.data(text.trim_end(), &status);
    Ok(())
}
