//! Push command implementation

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;
use aggregit::source::PushStrategy;

use super::{run_operation, Context, RepoArgs};

/// Arguments for the push command
#[derive(Args, Debug)]
pub struct PushArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Push strategy for every source, overriding the configuration
    #[arg(long, value_name = "STRATEGY", value_enum)]
    pub push_strategy: Option<PushStrategy>,
}

/// Execute the push command
pub fn execute(ctx: &Context, args: PushArgs) -> Result<()> {
    let options = RepoOpsOptions {
        push_strategy: args.push_strategy,
        ..Default::default()
    };
    run_operation(ctx, &args.repo, options, |ops, sources| ops.push(sources))
}
