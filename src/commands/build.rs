//! Build command implementation
//!
//! Copies every active source, in `order`, into the destination tree:
//! 1. Optionally verify readiness and stop before touching anything
//! 2. Download web sources
//! 3. Walk, filter, remap and copy each source per its update strategy
//! 4. Fail when two sources produced the same destination path, unless
//!    `--allow-collisions` is given

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context as _, Result};
use clap::Args;
use console::style;

use aggregit::output::OutputConfig;
use aggregit::phases::{execute_build, BuildOptions, BuildResult};
use aggregit::registry::FileRegistry;
use aggregit::source::VerifyToggles;
use aggregit::verify::verify;
use aggregit::web::HttpFetcher;

use super::verify::print_report;
use super::{load, Context, SourceFilter};

/// Arguments for the build command
#[derive(Args, Debug)]
pub struct BuildArgs {
    #[command(flatten)]
    pub filter: SourceFilter,

    /// Destination directory, overriding `destination:` in the configuration
    #[arg(short, long, value_name = "PATH")]
    pub destination: Option<PathBuf>,

    /// Let later sources overwrite files produced by earlier ones
    #[arg(long)]
    pub allow_collisions: bool,

    /// Refuse to build unless every source passes verification
    #[arg(long)]
    pub verify: bool,

    /// Print the build result as JSON
    #[arg(long)]
    pub json: bool,
}

/// Execute the build command
pub fn execute(ctx: &Context, args: BuildArgs) -> Result<()> {
    let start_time = Instant::now();
    let loaded = load(ctx)?;
    let destination = args
        .destination
        .or(loaded.config.destination)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No destination configured\n\n\
                 hint: Add 'destination:' to the configuration file\n\
                 hint: Or pass --destination <PATH>"
            )
        })?;
    let sources = args.filter.apply(loaded.config.sources)?;
    let fetcher = HttpFetcher::with_default_timeout().context("Failed to set up HTTP client")?;

    if args.verify {
        let report = verify(&sources, &loaded.git, &fetcher, VerifyToggles::default());
        if !report.is_ready {
            print_report(&ctx.output, &report);
            anyhow::bail!("Sources are not ready; build not started");
        }
    }

    let options = BuildOptions {
        enforce_collisions: !args.allow_collisions,
        ..BuildOptions::new(&destination)
    };
    let registry = FileRegistry::new();
    let result = execute_build(&sources, &registry, &loaded.git, &fetcher, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&ctx.output, &result);
        if result.success {
            println!(
                "{} Built {} in {:.2}s",
                ctx.output.ok(),
                destination.display(),
                start_time.elapsed().as_secs_f64()
            );
        }
    }

    if !result.success {
        anyhow::bail!("Build failed with {} error(s)", result.errors.len());
    }
    Ok(())
}

fn print_result(output: &OutputConfig, result: &BuildResult) {
    println!(
        "   {} copied, {} updated, {} overwritten, {} skipped",
        result.files_copied, result.files_updated, result.files_overwritten, result.files_skipped
    );

    if let Some(collisions) = &result.collisions {
        println!();
        println!("{}", style("Collisions:").bold());
        for (destination, mappings) in collisions {
            println!("  {}", destination);
            for mapping in mappings {
                println!(
                    "    <- {} ({})",
                    mapping.source_path,
                    style(&mapping.owning_source).cyan()
                );
            }
        }
    }

    if !result.warnings.is_empty() {
        println!();
        for warning in &result.warnings {
            println!("{} {}", output.warning(), warning);
        }
    }
    if !result.errors.is_empty() {
        println!();
        for error in &result.errors {
            println!("{} {}", output.failed(), error);
        }
    }
}
