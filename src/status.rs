//! Sync-state classification of a working copy.
//!
//! A single `git status --branch --porcelain` call tells us everything:
//! the first line is the branch header (`## main...origin/main [ahead 1]`)
//! and every further line is an uncommitted change.

use std::fmt;
use std::path::Path;

use log::{debug, warn};
use serde::Serialize;

use crate::repository::GitOperations;

/// Relationship of a working copy to its tracked remote branch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Current,
    Ahead,
    Behind,
    /// Both ahead and behind: local and remote have diverged
    Conflicted,
    /// Uncommitted changes in the working tree
    Dirty,
    /// No working copy exists yet
    Missing,
    /// Classification failed; never fatal
    Unknown,
}

impl SyncStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SyncStatus::Current => "current",
            SyncStatus::Ahead => "ahead",
            SyncStatus::Behind => "behind",
            SyncStatus::Conflicted => "conflicted",
            SyncStatus::Dirty => "dirty",
            SyncStatus::Missing => "missing",
            SyncStatus::Unknown => "unknown",
        }
    }
}

impl fmt::Display for SyncStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify the output of `git status --branch --porcelain`.
///
/// Tracking information on the header line takes precedence over local
/// changes: a copy that is both behind and dirty is reported as behind.
pub fn classify(output: &str) -> SyncStatus {
    let mut lines = output.lines();
    let header = lines.next().unwrap_or("");
    let tracking = tracking_info(header);
    let ahead = tracking.contains("ahead");
    let behind = tracking.contains("behind");

    match (ahead, behind) {
        (true, true) => SyncStatus::Conflicted,
        (true, false) => SyncStatus::Ahead,
        (false, true) => SyncStatus::Behind,
        (false, false) => {
            if lines.any(|line| !line.trim().is_empty()) {
                SyncStatus::Dirty
            } else {
                SyncStatus::Current
            }
        }
    }
}

/// The bracketed tracking part of a `## branch...upstream [ahead 1]`
/// header, so a branch named `ahead-of-time` isn't misread.
fn tracking_info(header: &str) -> &str {
    if !header.starts_with("##") {
        return "";
    }
    match (header.rfind('['), header.rfind(']')) {
        (Some(open), Some(close)) if open < close => &header[open + 1..close],
        _ => "",
    }
}

/// Determine the sync status of the working copy at `dir`.
///
/// Never fails: a missing working copy is [`SyncStatus::Missing`] and any
/// subprocess error is logged and reported as [`SyncStatus::Unknown`].
pub fn sync_status(git: &dyn GitOperations, dir: &Path) -> SyncStatus {
    if !dir.join(".git").exists() {
        return SyncStatus::Missing;
    }
    match git.status(dir) {
        Ok(output) => {
            let status = classify(&output);
            debug!("{} is {}", dir.display(), status);
            status
        }
        Err(e) => {
            warn!("Could not determine sync status of {}", dir.display());
            debug!("status failure for {}: {:?}", dir.display(), e);
            SyncStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::mock::MockGitOperations;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_classify_current() {
        assert_eq!(classify("## main...origin/main\n"), SyncStatus::Current);
        assert_eq!(classify(""), SyncStatus::Current);
    }

    #[test]
    fn test_classify_ahead_and_behind() {
        assert_eq!(classify("## main...origin/main [ahead 2]\n"), SyncStatus::Ahead);
        assert_eq!(classify("## main...origin/main [behind 3]\n"), SyncStatus::Behind);
        assert_eq!(
            classify("## main...origin/main [ahead 1, behind 4]\n"),
            SyncStatus::Conflicted
        );
    }

    #[test]
    fn test_classify_dirty() {
        let output = "## main...origin/main\n M docs/intro.md\n?? notes.txt\n";
        assert_eq!(classify(output), SyncStatus::Dirty);
    }

    #[test]
    fn test_tracking_beats_local_changes() {
        let output = "## main...origin/main [behind 1]\n M docs/intro.md\n";
        assert_eq!(classify(output), SyncStatus::Behind);
    }

    #[test]
    fn test_branch_name_is_not_tracking_info() {
        assert_eq!(
            classify("## ahead-of-behind...origin/ahead-of-behind\n"),
            SyncStatus::Current
        );
    }

    #[test]
    fn test_sync_status_missing_without_git_dir() {
        let temp = TempDir::new().unwrap();
        let git = MockGitOperations::new();
        assert_eq!(sync_status(&git, temp.path()), SyncStatus::Missing);
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_sync_status_unknown_on_failure() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let git = MockGitOperations::new().fail("status", "fatal: not a git repository");
        assert_eq!(sync_status(&git, temp.path()), SyncStatus::Unknown);
    }

    #[test]
    fn test_sync_status_classifies_output() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        let git = MockGitOperations::new().respond("status", "## main...origin/main [ahead 1]\n");
        assert_eq!(sync_status(&git, temp.path()), SyncStatus::Ahead);
    }
}
