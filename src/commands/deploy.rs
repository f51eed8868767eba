// ABOUTME: Deploy command implementation.
// ABOUTME: Wires the real registry, shell runner and prompts into the orchestrator.

use slipway::config::Config;
use slipway::deploy::{CancelFlag, DeployOptions, DeployOutcome, Orchestrator};
use slipway::diagnostics::Diagnostics;
use slipway::error::Result;
use slipway::output::Output;
use slipway::runner::ShellRunner;

use super::{confirmer, github_client};

/// Deploy the latest release of the configured repository.
pub async fn deploy(
    config: Config,
    options: DeployOptions,
    mut output: Output,
    cancel: CancelFlag,
) -> Result<()> {
    output.start_timer();
    let mut diag = Diagnostics::default();

    output.progress(&format!(
        "Deploying {} from {} into {}",
        config.app_name,
        config.repo,
        config.install_dir.display()
    ));

    let runner = ShellRunner;
    let confirm = confirmer();
    let orchestrator = Orchestrator::new(&config, github_client(&config)?, &runner, confirm.as_ref())
        .with_cancel(cancel);

    let result = orchestrator.deploy(&options, &output, &mut diag).await;

    // Emit collected warnings
    for warning in diag.warnings() {
        output.warning(&warning.message);
    }

    match result? {
        DeployOutcome::UpToDate { version } => {
            output.success(&format!("Already running the latest version ({version})"));
        }
        DeployOutcome::Deployed(report) => {
            if !report.pruned.is_empty() {
                output.progress(&format!("  → Removed {} old release(s)", report.pruned.len()));
            }
            output.success(&format!("New version {} is now live", report.version));
        }
    }
    Ok(())
}
