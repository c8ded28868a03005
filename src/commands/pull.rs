//! Pull command implementation
//!
//! Pulls each selected git source. Working copies with uncommitted changes
//! are left alone, and a diverged copy is only pulled with an explicit
//! rebase or merge strategy.

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;
use aggregit::source::PullStrategy;

use super::{run_operation, Context, RepoArgs};

/// Arguments for the pull command
#[derive(Args, Debug)]
pub struct PullArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Pull strategy for every source, overriding the configuration
    #[arg(long, value_name = "STRATEGY", value_enum)]
    pub pull_strategy: Option<PullStrategy>,
}

/// Execute the pull command
pub fn execute(ctx: &Context, args: PullArgs) -> Result<()> {
    let options = RepoOpsOptions {
        pull_strategy: args.pull_strategy,
        ..Default::default()
    };
    run_operation(ctx, &args.repo, options, |ops, sources| ops.pull(sources))
}
