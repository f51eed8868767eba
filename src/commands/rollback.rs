// ABOUTME: Rollback command implementation.
// ABOUTME: Points the install link at the release before the active one.

use slipway::config::Config;
use slipway::deploy::Maintenance;
use slipway::error::Result;
use slipway::output::Output;

pub fn rollback(config: Config, break_lock: bool, mut output: Output) -> Result<()> {
    output.start_timer();
    output.progress(&format!("Rolling back {}", config.app_name));

    let outcome = Maintenance::new(&config).rollback(break_lock)?;

    output.progress(&format!(
        "  → {} kept on disk; redeploy with --force to return to it",
        outcome.from
    ));
    output.success(&format!("Rolled back from {} to {}", outcome.from, outcome.to));
    Ok(())
}
