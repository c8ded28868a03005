//! Verify command implementation
//!
//! Reports, without changing anything, whether every selected source is
//! ready for a build. Each issue comes with a command that fixes it. The
//! command fails when any source is not ready.

use anyhow::Result;
use clap::Args;
use console::style;

use aggregit::output::{styled_status, OutputConfig};
use aggregit::source::VerifyToggles;
use aggregit::verify::{verify, ReadinessReport};
use aggregit::web::HttpFetcher;

use super::{load, Context, SourceFilter};

/// Arguments for the verify command
#[derive(Args, Debug)]
pub struct VerifyArgs {
    #[command(flatten)]
    pub filter: SourceFilter,

    /// Print the report as JSON
    #[arg(long)]
    pub json: bool,

    /// Do not report missing working copies or directories
    #[arg(long)]
    pub ignore_missing: bool,

    /// Do not report working copies behind their remote
    #[arg(long)]
    pub ignore_behind: bool,

    /// Do not report working copies with unpushed commits
    #[arg(long)]
    pub ignore_ahead: bool,

    /// Do not report uncommitted changes
    #[arg(long)]
    pub ignore_dirty: bool,

    /// Do not report working copies that diverged from their remote
    #[arg(long)]
    pub ignore_conflicted: bool,

    /// Skip sparse-checkout checks
    #[arg(long)]
    pub ignore_sparse: bool,

    /// Skip the reachability probe of web sources
    #[arg(long)]
    pub ignore_remote_availability: bool,

    /// Do not report empty local directories
    #[arg(long)]
    pub ignore_empty: bool,
}

impl VerifyArgs {
    fn toggles(&self) -> VerifyToggles {
        VerifyToggles {
            ignore_missing: self.ignore_missing,
            ignore_behind: self.ignore_behind,
            ignore_ahead: self.ignore_ahead,
            ignore_dirty: self.ignore_dirty,
            ignore_conflicted: self.ignore_conflicted,
            ignore_sparse: self.ignore_sparse,
            ignore_remote_availability: self.ignore_remote_availability,
            ignore_empty: self.ignore_empty,
        }
    }
}

/// Execute the verify command
pub fn execute(ctx: &Context, args: VerifyArgs) -> Result<()> {
    let loaded = load(ctx)?;
    let sources = args.filter.apply(loaded.config.sources)?;
    let fetcher = HttpFetcher::with_default_timeout()?;
    let report = verify(&sources, &loaded.git, &fetcher, args.toggles());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&ctx.output, &report);
    }

    if !report.is_ready {
        anyhow::bail!(
            "{} issue(s) found; sources are not ready",
            report.issue_count()
        );
    }
    Ok(())
}

/// Print a readiness report, one block per source.
pub fn print_report(output: &OutputConfig, report: &ReadinessReport) {
    for source in &report.sources {
        let marker = if source.ready {
            output.ok()
        } else {
            output.failed()
        };
        match source.status {
            Some(status) => println!(
                "{} {} [{}] {}",
                marker,
                style(&source.name).bold(),
                source.kind,
                styled_status(status)
            ),
            None => println!("{} {} [{}]", marker, style(&source.name).bold(), source.kind),
        }
        for issue in &source.issues {
            println!("     {}", issue.message);
            println!("       {} {}", style("fix:").dim(), issue.suggestion);
        }
    }
    if report.is_ready {
        println!("{} All sources ready", output.ok());
    }
}
