//! Phase 2: Copy
//!
//! Walks one source's materialized root and writes every included file
//! into the destination tree.
//!
//! For each file the path relative to the root is filtered with
//! [`should_include`], translated with [`remap`] and registered in the
//! build's [`FileRegistry`] before anything is written. An existing
//! destination file is then handled according to the source's
//! [`UpdateStrategy`]. A failure on one file is recorded and the walk goes
//! on with the next.

use std::fs;
use std::path::{Component, Path};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, trace};
use walkdir::WalkDir;

use super::BuildResult;
use crate::error::{Error, Result};
use crate::path::{remap, should_include, to_slash};
use crate::registry::FileRegistry;
use crate::repository::GitOperations;
use crate::source::{MissingTimestamp, Source, SourceKind, UpdateStrategy};

/// What happened to a single file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileOutcome {
    Copied,
    Updated,
    /// Rewritten over a file another source produced in this build
    Overwritten,
    Skipped,
}

/// Shared state the copy phase needs for every source.
pub struct CopyContext<'a> {
    pub destination: &'a Path,
    pub registry: &'a FileRegistry,
    /// Used for commit timestamps of `if-newer` git sources
    pub git: &'a dyn GitOperations,
}

/// Copy every included file of `source` into the destination, recording
/// counts, errors and warnings in `result`.
pub fn execute(source: &Source, ctx: &CopyContext<'_>, result: &mut BuildResult) {
    let root = source.materialized_root();
    let options = &source.options;

    if options.update_strategy == UpdateStrategy::Prompt {
        result.warnings.push(format!(
            "{}: update strategy 'prompt' needs a terminal; existing files are kept",
            source.name
        ));
    }

    let walker = WalkDir::new(root)
        .follow_links(true)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || e.file_name() != ".git");

    for entry in walker {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                result.errors.push(format!("{}: {}", source.name, e));
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }
        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        let relative = to_slash(relative);

        if !should_include(
            &relative,
            &options.include,
            &options.exclude,
            options.exclude_by_default,
        ) {
            trace!("{}: {} not included", source.name, relative);
            continue;
        }

        let destination_path = remap(&relative, &options.remap);
        match copy_file(source, ctx, entry.path(), &relative, &destination_path) {
            Ok(outcome) => {
                trace!("{}: {} -> {} ({:?})", source.name, relative, destination_path, outcome);
                match outcome {
                    FileOutcome::Copied => result.files_copied += 1,
                    FileOutcome::Updated => result.files_updated += 1,
                    FileOutcome::Overwritten => result.files_overwritten += 1,
                    FileOutcome::Skipped => result.files_skipped += 1,
                }
            }
            Err(e) => {
                debug!("{}: failed on {}: {:?}", source.name, relative, e);
                result
                    .errors
                    .push(format!("{}: {}: {}", source.name, relative, e));
            }
        }
    }
}

/// Register one mapping and materialize it in the destination.
pub fn copy_file(
    source: &Source,
    ctx: &CopyContext<'_>,
    from: &Path,
    relative: &str,
    destination_path: &str,
) -> Result<FileOutcome> {
    let destination_path = normalize_destination(destination_path)?;
    let destination_path = destination_path.as_str();

    let claimed = ctx.registry.claimed_by_other(destination_path, &source.name)?;
    ctx.registry.register(relative, destination_path, &source.name)?;

    let to = ctx.destination.join(destination_path);
    if !to.exists() {
        write_file(from, &to)?;
        return Ok(FileOutcome::Copied);
    }

    let rewrite = match source.options.update_strategy {
        UpdateStrategy::Always => true,
        UpdateStrategy::IfDifferent => !same_content(from, &to)?,
        // a fallback mtime is the download time for web sources, so
        // identical content is never rewritten
        UpdateStrategy::IfNewer => {
            source_timestamp(source, ctx.git, from, relative)? > modified(&to)?
                && !same_content(from, &to)?
        }
        UpdateStrategy::Never | UpdateStrategy::Prompt => false,
    };

    if !rewrite {
        return Ok(FileOutcome::Skipped);
    }
    write_file(from, &to)?;
    Ok(if claimed {
        FileOutcome::Overwritten
    } else {
        FileOutcome::Updated
    })
}

/// Remapped paths must stay inside the destination tree. `.` components
/// are dropped so `./a.md` and `a.md` register as the same destination.
fn normalize_destination(destination_path: &str) -> Result<String> {
    let mut parts = Vec::new();
    for component in Path::new(destination_path).components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy()),
            Component::CurDir => {}
            _ => return Err(leaves_destination(destination_path)),
        }
    }
    if parts.is_empty() {
        return Err(leaves_destination(destination_path));
    }
    Ok(parts.join("/"))
}

fn leaves_destination(destination_path: &str) -> Error {
    Error::Validation {
        message: format!("destination path '{}' leaves the destination tree", destination_path),
    }
}

fn write_file(from: &Path, to: &Path) -> Result<()> {
    if let Some(parent) = to.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    fs::copy(from, to).map_err(|e| Error::fs(to, e))?;
    Ok(())
}

fn same_content(a: &Path, b: &Path) -> Result<bool> {
    let len_a = fs::metadata(a).map_err(|e| Error::fs(a, e))?.len();
    let len_b = fs::metadata(b).map_err(|e| Error::fs(b, e))?.len();
    if len_a != len_b {
        return Ok(false);
    }
    let content_a = fs::read(a).map_err(|e| Error::fs(a, e))?;
    let content_b = fs::read(b).map_err(|e| Error::fs(b, e))?;
    Ok(content_a == content_b)
}

fn modified(path: &Path) -> Result<SystemTime> {
    fs::metadata(path)
        .and_then(|m| m.modified())
        .map_err(|e| Error::fs(path, e))
}

/// The time a source file last changed.
///
/// Git sources use the last commit touching the file; local sources use
/// the filesystem. Web sources have no timestamp of their own. When no
/// native timestamp exists the source's [`MissingTimestamp`] policy decides
/// between the filesystem mtime and an error.
fn source_timestamp(
    source: &Source,
    git: &dyn GitOperations,
    file: &Path,
    relative: &str,
) -> Result<SystemTime> {
    let native = match &source.kind {
        SourceKind::Local(_) => return modified(file),
        SourceKind::Web(_) => None,
        SourceKind::Git(repo) => match git.last_commit_time(&repo.working_path, relative) {
            Ok(seconds) => seconds
                .map(|s| UNIX_EPOCH + Duration::from_secs(u64::try_from(s).unwrap_or(0))),
            Err(e) => {
                debug!("{}: no commit time for {}: {}", source.name, relative, e);
                None
            }
        },
    };

    match (native, source.options.missing_timestamp) {
        (Some(time), _) => Ok(time),
        (None, MissingTimestamp::Fallback) => modified(file),
        (None, MissingTimestamp::Error) => Err(Error::Validation {
            message: format!(
                "no {} timestamp for {} (missingTimestamp: error)",
                source.kind_name(),
                relative
            ),
        }),
    }
}
