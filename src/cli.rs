// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Args, Parser, Subcommand};
use slipway::config::Overrides;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slipway")]
#[command(about = "Zero-downtime deployment of GitHub release archives")]
#[command(version)]
pub struct Cli {
    /// Show debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Only print the final result
    #[arg(short, long, global = true, conflicts_with = "json")]
    pub quiet: bool,

    /// Print JSON lines instead of text
    #[arg(long, global = true)]
    pub json: bool,

    /// Path to slipway.yml (default: ./slipway.yml if present)
    #[arg(short, long, global = true, value_name = "FILE")]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Where and what to deploy. Overrides slipway.yml and SLIPWAY_* variables.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// GitHub repository (owner/repo)
    #[arg(long, value_name = "OWNER/REPO")]
    pub repo: Option<String>,

    /// Application name (default: repository name)
    #[arg(long)]
    pub app_name: Option<String>,

    /// Directory holding the install link and releases
    #[arg(long, value_name = "DIR")]
    pub install_dir: Option<PathBuf>,

    /// Web server user that should own the release
    #[arg(long)]
    pub web_user: Option<String>,

    /// GitHub token for private repos
    #[arg(long, value_name = "TOKEN")]
    pub github_token: Option<String>,

    /// GitHub API base URL
    #[arg(long, value_name = "URL", hide = true)]
    pub api_url: Option<String>,
}

impl TargetArgs {
    pub fn overrides(&self, keep_releases: Option<usize>) -> Overrides {
        Overrides {
            repo: self.repo.clone(),
            app_name: self.app_name.clone(),
            install_dir: self.install_dir.clone(),
            web_user: self.web_user.clone(),
            github_token: self.github_token.clone(),
            api_url: self.api_url.clone(),
            keep_releases,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Deploy the latest release
    Deploy {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of old releases to keep
        #[arg(long, value_name = "N")]
        keep_releases: Option<usize>,

        /// Skip database migrations
        #[arg(long)]
        skip_migrations: bool,

        /// Clean up old releases without asking
        #[arg(long)]
        auto_cleanup: bool,

        /// Deploy even if the latest version is already installed
        #[arg(long)]
        force: bool,

        /// Answer yes to migration and cleanup prompts
        #[arg(short, long)]
        yes: bool,

        /// Break an existing deploy lock
        #[arg(long)]
        break_lock: bool,
    },

    /// Switch back to the release before the active one
    Rollback {
        #[command(flatten)]
        target: TargetArgs,

        /// Break an existing deploy lock
        #[arg(long)]
        break_lock: bool,
    },

    /// List installed releases
    Releases {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Remove old releases
    Cleanup {
        #[command(flatten)]
        target: TargetArgs,

        /// Number of old releases to keep
        #[arg(long, value_name = "N")]
        keep_releases: Option<usize>,

        /// Break an existing deploy lock
        #[arg(long)]
        break_lock: bool,
    },

    /// Show the active release and any deploy lock
    Status {
        #[command(flatten)]
        target: TargetArgs,
    },

    /// Initialize a new slipway.yml configuration file
    Init {
        /// GitHub repository (owner/repo)
        #[arg(long, value_name = "OWNER/REPO")]
        repo: Option<String>,

        /// Directory holding the install link and releases
        #[arg(long, value_name = "DIR")]
        install_dir: Option<PathBuf>,

        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },
}
