//! CLI command definitions.
//!
//! This module defines all CLI commands and their arguments using clap.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Declarative uploads of custom images to Hetzner Cloud.
#[derive(Parser, Debug)]
#[command(name = "hcloud-image")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to the resource file.
    #[arg(short, long, global = true, env = "HCLOUD_IMAGE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit logs as JSON.
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Output format (text, json).
    #[arg(long, global = true, default_value = "text")]
    pub output: OutputFormat,

    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Commands,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Validate the resource file.
    Validate {
        /// Show warnings too, not just errors.
        #[arg(short, long)]
        warnings: bool,
    },

    /// Refresh the image and show what apply would change.
    Plan,

    /// Create, update or replace the image to match the resource file.
    Apply {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Refresh the recorded state from the remote image.
    Refresh,

    /// Delete the image and its recorded state.
    Destroy {
        /// Skip confirmation prompt.
        #[arg(short, long)]
        yes: bool,
    },

    /// Remove temporary servers and keys left behind by interrupted uploads.
    Cleanup,

    /// Inspect or edit recorded state.
    State {
        /// State subcommand.
        #[command(subcommand)]
        command: StateCommands,
    },
}

/// State management subcommands.
#[derive(Subcommand, Debug)]
pub enum StateCommands {
    /// Show recorded state.
    Show,

    /// Forget a resource without deleting its image.
    Rm {
        /// Resource name (defaults to the one in the resource file).
        name: Option<String>,
    },
}

/// Output format options.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text output.
    #[default]
    Text,
    /// JSON output for scripting.
    Json,
}

impl Cli {
    /// Parses CLI arguments from the command line.
    #[must_use]
    pub fn parse_args() -> Self {
        Self::parse()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_apply() {
        let cli = Cli::try_parse_from(["hcloud-image", "--output", "json", "apply", "--yes"])
            .expect("valid args");

        assert_eq!(cli.output, OutputFormat::Json);
        assert!(matches!(cli.command, Commands::Apply { yes: true }));
    }

    #[test]
    fn test_parse_state_rm() {
        let cli = Cli::try_parse_from(["hcloud-image", "state", "rm", "talos"]).expect("valid args");

        assert!(matches!(
            cli.command,
            Commands::State { command: StateCommands::Rm { name: Some(ref n) } } if n == "talos"
        ));
    }
}
