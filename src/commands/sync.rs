//! Sync command implementation
//!
//! Commit, pull and push for each selected git source, stopping at the
//! first step that fails for that source.

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;

use super::{run_operation, Context, RepoArgs, StrategyArgs};

/// Arguments for the sync command
#[derive(Args, Debug)]
pub struct SyncArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub strategies: StrategyArgs,

    /// Commit message (defaults to "Update aggregated content")
    #[arg(short, long, value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Execute the sync command
pub fn execute(ctx: &Context, args: SyncArgs) -> Result<()> {
    let options = RepoOpsOptions {
        pull_strategy: args.strategies.pull_strategy,
        push_strategy: args.strategies.push_strategy,
        commit_message: args.message,
        ..Default::default()
    };
    run_operation(ctx, &args.repo, options, |ops, sources| ops.sync(sources))
}
