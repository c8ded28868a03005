//! CLI argument parsing and command dispatch

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::{Parser, Subcommand};

use aggregit::defaults::DEFAULT_GIT_TIMEOUT;
use aggregit::output::OutputConfig;

use crate::commands::{self, Context};

/// Aggregit - Aggregate content from git repositories, remote files and
/// local directories into one destination tree
#[derive(Parser, Debug)]
#[command(name = "aggregit")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Path to the configuration file (defaults to ./aggregit.yaml)
    #[arg(short, long, global = true, value_name = "PATH", env = "AGGREGIT_CONFIG")]
    config: Option<PathBuf>,

    /// Timeout in seconds for every git invocation
    #[arg(
        long,
        global = true,
        value_name = "SECONDS",
        default_value_t = DEFAULT_GIT_TIMEOUT.as_secs()
    )]
    git_timeout: u64,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace); RUST_LOG takes precedence
    #[arg(
        long,
        global = true,
        value_name = "LEVEL",
        default_value = "warn",
        value_parser = ["off", "error", "warn", "info", "debug", "trace"]
    )]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Copy every active source into the destination tree
    Build(commands::build::BuildArgs),
    /// Create or update the sparse working copy of each git source
    Checkout(commands::checkout::CheckoutArgs),
    /// Pull each git source from its remote
    Pull(commands::pull::PullArgs),
    /// Push each git source to its remote
    Push(commands::push::PushArgs),
    /// Commit all changes in each git source
    Commit(commands::commit::CommitArgs),
    /// Checkout, then pull or push whatever is out of sync
    Prepare(commands::prepare::PrepareArgs),
    /// Commit, pull and push each git source
    Sync(commands::sync::SyncArgs),
    /// Check that every source is ready for a build
    Verify(commands::verify::VerifyArgs),
    /// Show the sync status of each git source
    Status(commands::status::StatusArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        init_logging(&self.log_level);
        let ctx = Context {
            config: self.config,
            git_timeout: Duration::from_secs(self.git_timeout),
            output: OutputConfig::from_env_and_flag(&self.color),
        };

        match self.command {
            Commands::Build(args) => commands::build::execute(&ctx, args),
            Commands::Checkout(args) => commands::checkout::execute(&ctx, args),
            Commands::Pull(args) => commands::pull::execute(&ctx, args),
            Commands::Push(args) => commands::push::execute(&ctx, args),
            Commands::Commit(args) => commands::commit::execute(&ctx, args),
            Commands::Prepare(args) => commands::prepare::execute(&ctx, args),
            Commands::Sync(args) => commands::sync::execute(&ctx, args),
            Commands::Verify(args) => commands::verify::execute(&ctx, args),
            Commands::Status(args) => commands::status::execute(&ctx, args),
        }
    }
}

/// Log to stderr at `level`, unless `RUST_LOG` says otherwise.
fn init_logging(level: &str) {
    let mut builder = env_logger::Builder::new();
    builder
        .filter_level(level.parse().unwrap_or(log::LevelFilter::Warn))
        .format_timestamp(None)
        .target(env_logger::Target::Stderr);
    if let Ok(filters) = std::env::var("RUST_LOG") {
        builder.parse_filters(&filters);
    }
    // a second initialisation (tests) keeps the first logger
    let _ = builder.try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from([
            "aggregit",
            "pull",
            "--source",
            "docs",
            "--git-timeout",
            "10",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(cli.git_timeout, 10);
        assert_eq!(cli.log_level, "debug");
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        assert!(Cli::try_parse_from(["aggregit", "status", "--log-level", "loud"]).is_err());
    }
}
