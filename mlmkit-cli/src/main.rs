//! mlmkit CLI: launch MLM pretraining runs and check sweep documents.

mod commands;

use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// mlmkit: masked-language-model pretraining launcher
#[derive(Parser, Debug)]
#[command(name = "mlmkit", version, about, long_about = None)]
pub(crate) struct Cli {
    /// Model to pretrain (bert-base, nezha-base, macbert-base, bert-large, nezha-large, macbert-large)
    model_name: Option<String>,

    /// Print the trainer commands instead of running them
    #[arg(long)]
    dry_run: bool,

    /// With --dry-run, print the plan as JSON
    #[arg(long, requires = "dry_run")]
    json: bool,

    /// Workspace directory
    #[arg(short, long, default_value = ".", global = true)]
    workspace: PathBuf,

    /// Configuration file path
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Subcommand
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum Commands {
    /// Print the hyperparameter profile of every model
    Profiles {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Inspect sweep documents
    Sweep {
        #[command(subcommand)]
        action: SweepAction,
    },
    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum SweepAction {
    /// Parse and check a sweep document
    Validate {
        /// Path to the sweep YAML
        path: PathBuf,
    },
    /// Summarize a sweep document (credentials are masked)
    Show {
        /// Path to the sweep YAML
        path: PathBuf,
        /// Print the normalized document instead of a summary
        #[arg(long)]
        yaml: bool,
    },
}

#[derive(clap::Subcommand, Debug)]
pub(crate) enum ConfigAction {
    /// Create default configuration file
    Init,
    /// Show current configuration
    Show,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file if present
    let _ = dotenvy::dotenv();

    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 if cli.quiet => "error",
        0 => "info",
        1 => "debug",
        _ => "trace",
    };

    // Human-readable layer for stderr
    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_filter(EnvFilter::new(filter));

    // JSON file layer for structured logging
    let log_dir = directories::ProjectDirs::from("dev", "mlmkit", "mlmkit")
        .map(|d| d.data_dir().join("logs"))
        .unwrap_or_else(|| PathBuf::from("."));
    let _ = std::fs::create_dir_all(&log_dir);
    let file_appender = tracing_appender::rolling::daily(&log_dir, "mlmkit.log");
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_filter(EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(json_layer)
        .init();

    let workspace = cli
        .workspace
        .canonicalize()
        .unwrap_or_else(|_| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")));

    if let Some(command) = cli.command {
        return commands::handle_command(command, &workspace, cli.config.as_deref()).await;
    }

    let Some(model_name) = cli.model_name else {
        anyhow::bail!(
            "no model given; pass one of: {}",
            mlmkit_core::ModelName::names().join(", ")
        );
    };

    let result = commands::run_model(
        &model_name,
        &workspace,
        cli.config.as_deref(),
        cli.dry_run,
        cli.json,
    )
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(err) => {
            tracing::error!(error = %err, "Run failed");
            let code = err.exit_code();
            drop(guard);
            eprintln!("Error: {err}");
            std::process::exit(code);
        }
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
    fn test_positional_model() {
        let cli = Cli::try_parse_from(["mlmkit", "bert-base"]).unwrap();
        assert_eq!(cli.model_name.as_deref(), Some("bert-base"));
        assert!(!cli.dry_run);
        assert!(cli.command.is_none());
    }

    #[test]
    fn test_dry_run_json() {
        let cli = Cli::try_parse_from(["mlmkit", "--dry-run", "--json", "nezha-large"]).unwrap();
        assert!(cli.dry_run);
        assert!(cli.json);
    }

    #[test]
    fn test_json_requires_dry_run() {
        assert!(Cli::try_parse_from(["mlmkit", "--json", "nezha-large"]).is_err());
    }

    #[test]
    fn test_sweep_subcommand() {
        let cli = Cli::try_parse_from(["mlmkit", "-v", "sweep", "validate", "configs/sweep.yaml"])
            .unwrap();
        assert_eq!(cli.verbose, 1);
        assert!(matches!(
            cli.command,
            Some(Commands::Sweep {
                action: SweepAction::Validate { .. }
            })
        ));
    }
}
