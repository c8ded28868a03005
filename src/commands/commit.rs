//! Commit command implementation
//!
//! Stages everything in each selected git source and commits it. A source
//! with nothing to commit counts as a success.

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;

use super::{run_operation, Context, RepoArgs};

/// Arguments for the commit command
#[derive(Args, Debug)]
pub struct CommitArgs {
    #[command(flatten)]
    pub repo: RepoArgs,

    /// Commit message (defaults to "Update aggregated content")
    #[arg(short, long, value_name = "MESSAGE")]
    pub message: Option<String>,
}

/// Execute the commit command
pub fn execute(ctx: &Context, args: CommitArgs) -> Result<()> {
    let options = RepoOpsOptions {
        commit_message: args.message,
        ..Default::default()
    };
    run_operation(ctx, &args.repo, options, |ops, sources| ops.commit(sources))
}
