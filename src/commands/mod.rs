//! # CLI Command Implementations
//!
//! Each subcommand of the `aggregit` command-line tool lives in its own
//! file and contains:
//! - An `Args` struct that defines the command-specific arguments and
//!   options, derived using `clap`.
//! - An `execute` function that takes the shared [`Context`] and the parsed
//!   `Args`, calls into the `aggregit` library and prints the outcome.
//!
//! This module holds what the commands share: configuration loading, the
//! `--source` filter and the printing of repository operation results.

pub mod build;
pub mod checkout;
pub mod commit;
pub mod prepare;
pub mod pull;
pub mod push;
pub mod status;
pub mod sync;
pub mod verify;

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use clap::Args;
use console::style;

use aggregit::config::{self, ResolvedConfig};
use aggregit::defaults::CONFIG_FILE_NAME;
use aggregit::operations::{OperationResult, RepoOpsOptions, RepositoryOperations};
use aggregit::output::OutputConfig;
use aggregit::repository::DefaultGitOperations;
use aggregit::source::{PullStrategy, PushStrategy, Source};
use aggregit::suggestions;

/// Settings given before the subcommand.
#[derive(Debug)]
pub struct Context {
    pub config: Option<PathBuf>,
    pub git_timeout: Duration,
    pub output: OutputConfig,
}

/// Restrict a command to some sources.
#[derive(Args, Debug, Default)]
pub struct SourceFilter {
    /// Only act on the named source (repeatable)
    #[arg(short, long = "source", value_name = "NAME")]
    pub sources: Vec<String>,
}

impl SourceFilter {
    /// Keep the selected sources, in their original order.
    pub fn apply(&self, sources: Vec<Source>) -> Result<Vec<Source>> {
        if self.sources.is_empty() {
            return Ok(sources);
        }
        let known: Vec<&str> = sources.iter().map(|s| s.name.as_str()).collect();
        if let Some(unknown) = self.sources.iter().find(|n| !known.contains(&n.as_str())) {
            return Err(suggestions::unknown_source(unknown, &known));
        }
        Ok(sources
            .into_iter()
            .filter(|s| self.sources.contains(&s.name))
            .collect())
    }
}

/// Options shared by commands that run pull and/or push.
#[derive(Args, Debug, Default)]
pub struct StrategyArgs {
    /// Pull strategy for every source, overriding the configuration
    #[arg(long, value_name = "STRATEGY", value_enum)]
    pub pull_strategy: Option<PullStrategy>,

    /// Push strategy for every source, overriding the configuration
    #[arg(long, value_name = "STRATEGY", value_enum)]
    pub push_strategy: Option<PushStrategy>,
}

/// Options shared by every repository operation command.
#[derive(Args, Debug, Default)]
pub struct RepoArgs {
    #[command(flatten)]
    pub filter: SourceFilter,

    /// Print the git commands that would change history instead of running them
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Process sources in parallel
    #[arg(long)]
    pub parallel: bool,
}

/// A loaded configuration and the git implementation used to resolve it.
pub struct Loaded {
    pub config: ResolvedConfig,
    pub git: DefaultGitOperations,
}

/// Locate, parse and resolve the configuration file.
pub fn load(ctx: &Context) -> Result<Loaded> {
    let path = ctx
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILE_NAME));
    if !path.exists() {
        return Err(suggestions::config_not_found(&path));
    }

    let git = DefaultGitOperations::new(ctx.git_timeout);
    let config = config::from_file(&path)?.resolve(&git)?;
    log::debug!(
        "Loaded {} source(s) from {}",
        config.sources.len(),
        path.display()
    );
    Ok(Loaded { config, git })
}

/// Run one repository operation over the filtered sources and print it.
pub fn run_operation<F>(
    ctx: &Context,
    args: &RepoArgs,
    options: RepoOpsOptions,
    op: F,
) -> Result<()>
where
    F: FnOnce(
        &RepositoryOperations<'_>,
        &[Source],
    ) -> aggregit::error::Result<Vec<OperationResult>>,
{
    let loaded = load(ctx)?;
    let sources = args.filter.apply(loaded.config.sources)?;
    let options = RepoOpsOptions {
        dry_run: args.dry_run,
        parallel: args.parallel,
        ..options
    };
    let ops = RepositoryOperations::new(&loaded.git, &loaded.config.workspace, options);
    let results = op(&ops, &sources)?;
    report_results(&ctx.output, &results)
}

/// Print operation results; fails when any of them failed.
pub fn report_results(output: &OutputConfig, results: &[OperationResult]) -> Result<()> {
    if results.is_empty() {
        println!("No git sources to process.");
        return Ok(());
    }

    for result in results {
        let marker = if result.success {
            output.ok()
        } else {
            output.failed()
        };
        println!(
            "{} {} {}: {}",
            marker,
            style(&result.source).bold(),
            style(format!("({})", result.operation)).dim(),
            result.message
        );
        if let Some(error) = &result.error {
            for line in error.lines().map(str::trim).filter(|l| !l.is_empty()) {
                println!("     {}", style(line).dim());
            }
        }
    }

    let failed = results.iter().filter(|r| !r.success).count();
    if failed > 0 {
        anyhow::bail!("{} of {} operation(s) failed", failed, results.len());
    }
    Ok(())
}
