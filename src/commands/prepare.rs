//! Prepare command implementation
//!
//! Gets every selected git source ready for a build: checkout, then pull
//! when the copy is behind, then push when it is ahead.

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;

use super::{run_operation, Context, RepoArgs, StrategyArgs};

/// Arguments for the prepare command
#[derive(Args, Debug)]
pub struct PrepareArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    #[command(flatten)]
    pub strategies: StrategyArgs,
}

/// Execute the prepare command
pub fn execute(ctx: &Context, args: PrepareArgs) -> Result<()> {
    let options = RepoOpsOptions {
        pull_strategy: args.strategies.pull_strategy,
        push_strategy: args.strategies.push_strategy,
        ..Default::default()
    };
    run_operation(ctx, &args.repo, options, |ops, sources| ops.prepare(sources))
}
