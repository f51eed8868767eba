// ABOUTME: Command module aggregator for the slipway CLI.
// ABOUTME: Shared config loading and the interactive Confirm implementation.

mod cleanup;
mod deploy;
mod inspect;
mod rollback;

pub use cleanup::cleanup;
pub use deploy::deploy;
pub use inspect::{releases, status};
pub use rollback::rollback;

use slipway::config::{Config, ConfigFile, Overrides};
use slipway::deploy::{AssumeDefault, Confirm, DeployError, Stage};
use slipway::error::{Error, Result};
use slipway::registry::GithubClient;
use std::env;
use std::io::IsTerminal;
use std::path::Path;

/// Whether a human can answer prompts.
pub fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

/// Asks on the terminal; falls back to the default if the prompt fails.
pub struct PromptConfirm;

impl Confirm for PromptConfirm {
    fn confirm(&self, prompt: &str, default: bool) -> bool {
        dialoguer::Confirm::new()
            .with_prompt(prompt)
            .default(default)
            .interact()
            .unwrap_or(default)
    }
}

pub fn confirmer() -> Box<dyn Confirm> {
    if interactive() {
        Box::new(PromptConfirm)
    } else {
        Box::new(AssumeDefault)
    }
}

pub fn github_client(config: &Config) -> Result<GithubClient> {
    GithubClient::new(&config.api_url).map_err(|e| Error::Deploy(DeployError::new(Stage::Init, e)))
}

/// Build the effective configuration: file, then `SLIPWAY_*`, then flags.
///
/// With `prompt` set and a terminal attached, a missing repository or
/// install directory is asked for instead of failing.
pub fn load_config(config_path: Option<&Path>, flags: Overrides, prompt: bool) -> Result<Config> {
    let cwd = env::current_dir()?;
    let file = match config_path {
        Some(path) => ConfigFile::load(path)?,
        None => ConfigFile::discover(&cwd)?.unwrap_or_default(),
    };
    let mut overrides = Overrides::from_env()?.merge(flags);

    if prompt && interactive() {
        if overrides.repo.is_none() && file.repo.is_none() {
            overrides.repo = Some(ask("GitHub repository (owner/repo)", None)?);
        }
        if overrides.install_dir.is_none() && file.install_dir.is_none() {
            let default = cwd.display().to_string();
            overrides.install_dir = Some(ask("Installation directory", Some(default))?.into());
        }
    }

    Config::resolve(file, overrides, &cwd)
}

fn ask(prompt: &str, default: Option<String>) -> Result<String> {
    let mut input = dialoguer::Input::<String>::new().with_prompt(prompt);
    if let Some(default) = default {
        input = input.default(default);
    }
    input
        .interact_text()
        .map_err(|e| Error::InvalidConfig(format!("failed to read {prompt}: {e}")))
}
