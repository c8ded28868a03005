//! # Error Suggestions
//!
//! Helpers for messages that tell the user what went wrong AND how to fix
//! it: translations of raw `git` failures into actionable text, remedial
//! commands attached to readiness issues, and CLI-level errors with
//! `hint:` lines.

use std::path::Path;

/// Generate an error for when the configuration file is not found.
pub fn config_not_found(path: &Path) -> anyhow::Error {
    anyhow::anyhow!(
        "Configuration file not found: {path}\n\n\
         hint: Create an aggregit.yaml file in your project root\n\
         hint: Use -c/--config to specify a different path\n\
         hint: Set AGGREGIT_CONFIG environment variable",
        path = path.display()
    )
}

/// Generate an error for a `--source` filter naming no configured source.
pub fn unknown_source(name: &str, known: &[&str]) -> anyhow::Error {
    let did_you_mean = find_similar(name, known)
        .map(|s| format!("\nhint: Did you mean '{s}'?"))
        .unwrap_or_default();

    anyhow::anyhow!(
        "Unknown source: {name}{did_you_mean}\n\n\
         Configured sources are: {sources}",
        sources = known.join(", ")
    )
}

/// Translate a failed `git pull` into an actionable message.
///
/// Distinguishes branches that diverged (nothing was changed locally) from
/// a merge that stopped on conflicts (the working tree needs attention).
pub fn pull_failure(stderr: &str) -> String {
    if is_merge_conflict(stderr) {
        "Pull stopped on merge conflicts. Resolve the conflicted files, then commit \
         (or run 'git merge --abort' / 'git rebase --abort' to undo)"
            .to_string()
    } else if is_divergent(stderr) {
        diverged_branches()
    } else {
        format!("Pull failed: {}", first_line(stderr))
    }
}

/// Translate a failed `git push` into an actionable message.
pub fn push_failure(stderr: &str) -> String {
    if is_non_fast_forward(stderr) {
        push_rejected()
    } else {
        format!("Push failed: {}", first_line(stderr))
    }
}

/// Local and remote both have commits the other lacks.
pub fn diverged_branches() -> String {
    "Local and remote branches have diverged and cannot be fast-forwarded. \
     Retry with --pull-strategy rebase or --pull-strategy merge"
        .to_string()
}

/// The remote has commits a plain push would discard.
pub fn push_rejected() -> String {
    "Push rejected because the remote has commits you don't have. \
     Pull first, or retry with --push-strategy force-with-lease"
        .to_string()
}

fn is_divergent(stderr: &str) -> bool {
    stderr.contains("divergent branches")
        || stderr.contains("Not possible to fast-forward")
        || stderr.contains("have diverged")
}

fn is_merge_conflict(stderr: &str) -> bool {
    stderr.contains("CONFLICT")
        || stderr.contains("Automatic merge failed")
        || stderr.contains("could not apply")
}

fn is_non_fast_forward(stderr: &str) -> bool {
    stderr.contains("non-fast-forward")
        || stderr.contains("fetch first")
        || stderr.contains("[rejected]")
}

fn first_line(text: &str) -> &str {
    text.lines()
        .map(str::trim)
        .find(|l| !l.is_empty())
        .unwrap_or("unknown error")
}

/// `aggregit <command> --source <name>`
pub fn aggregit_command(command: &str, source: &str) -> String {
    format!("aggregit {command} --source {source}")
}

/// `git -C <dir> <args>`
pub fn git_command(dir: &Path, args: &str) -> String {
    format!("git -C {} {}", dir.display(), args)
}

/// Find a similar string from a list of candidates using edit distance.
///
/// Returns Some(candidate) if a close match is found (edit distance <= 2).
fn find_similar<'a>(input: &str, candidates: &[&'a str]) -> Option<&'a str> {
    candidates
        .iter()
        .filter_map(|&candidate| {
            let distance = edit_distance(input, candidate);
            if distance <= 2 && distance < input.len() {
                Some((candidate, distance))
            } else {
                None
            }
        })
        .min_by_key(|(_, distance)| *distance)
        .map(|(candidate, _)| candidate)
}

/// Calculate the Levenshtein edit distance between two strings.
fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0usize; b.len() + 1];
    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            current[j + 1] = (previous[j + 1] + 1)
                .min(current[j] + 1)
                .min(previous[j] + cost);
        }
        std::mem::swap(&mut previous, &mut current);
    }
    previous[b.len()]
}
