//! Checkout command implementation
//!
//! Creates the working copy of every selected git source if needed, makes
//! its sparse-checkout rules match the configured include/exclude lists,
//! fetches the tracked branch and switches to it.

use anyhow::Result;
use clap::Args;

use aggregit::operations::RepoOpsOptions;

use super::{run_operation, Context, RepoArgs};

/// Arguments for the checkout command
#[derive(Args, Debug)]
pub struct CheckoutArgs {
    #[command(flatten)]
    pub repo: RepoArgs,
}

/// Execute the checkout command
pub fn execute(ctx: &Context, args: CheckoutArgs) -> Result<()> {
    run_operation(ctx, &args.repo, RepoOpsOptions::default(), |ops, sources| {
        ops.checkout(sources)
    })
}
