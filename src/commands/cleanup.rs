// ABOUTME: Cleanup command implementation.
// ABOUTME: Prunes old releases outside of a deploy.

use slipway::config::Config;
use slipway::deploy::Maintenance;
use slipway::error::Result;
use slipway::output::Output;

pub fn cleanup(config: Config, break_lock: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    let keep = config.keep_releases;
    output.progress(&format!(
        "Cleaning up {} (keeping {} release(s) plus the active one)",
        config.app_name, keep
    ));

    let result = Maintenance::new(&config).cleanup(keep, break_lock)?;

    for release in &result.removed {
        output.progress(&format!("  → Removed {}", release.version));
    }
    for failure in &result.failed {
        output.warning(&format!(
            "Failed to remove {}: {}",
            failure.release.path.display(),
            failure.error
        ));
    }

    output.success(&format!("Removed {} release(s)", result.removed.len()));
    Ok(())
}
