//! Status command implementation
//!
//! Prints the sync status of every selected git source.

use std::collections::BTreeMap;

use anyhow::Result;
use clap::Args;
use console::style;

use aggregit::output::styled_status;
use aggregit::status::sync_status;

use super::{load, Context, SourceFilter};

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(flatten)]
    pub filter: SourceFilter,

    /// Print `{name: status}` as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the status command
pub fn execute(ctx: &Context, args: StatusArgs) -> Result<()> {
    let loaded = load(ctx)?;
    let sources = args.filter.apply(loaded.config.sources)?;

    let mut statuses = BTreeMap::new();
    for source in &sources {
        let Some(repo) = source.as_git() else {
            continue;
        };
        let status = sync_status(&loaded.git, &repo.working_path);
        if !args.json {
            println!(
                "{:<24} {:<12} {} {}",
                style(&source.name).bold(),
                styled_status(status),
                repo.branch,
                style(repo.working_path.display()).dim()
            );
        }
        statuses.insert(source.name.clone(), status);
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&statuses)?);
    } else if statuses.is_empty() {
        println!("No git sources configured.");
    }
    Ok(())
}
