//! # Repository Operations
//!
//! Checkout, pull, push and commit across every active git source, plus
//! the two compositions built from them:
//!
//! - `prepare`: checkout, then pull if the copy is behind (or diverged),
//!   then push if it is ahead
//! - `sync`: commit, then pull, then push
//!
//! Each operation consults the sync state first and refuses to touch a
//! working copy it could damage. A failure is recorded in that source's
//! [`OperationResult`] and the run moves on to the next source; the only
//! error returned for a whole run is an infrastructural one such as an
//! uncreatable workspace directory. Cancellation is checked before each
//! source: sources already processed keep their results and every source
//! after it gets a failed "Cancelled" result.
//!
//! Sources may be processed in parallel with rayon. Each source only
//! touches its own working copy, and results always come back in source
//! order.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, info, warn};
use rayon::prelude::*;
use serde::Serialize;

use crate::cancel::CancelToken;
use crate::defaults::DEFAULT_COMMIT_MESSAGE;
use crate::error::{Error, Result};
use crate::repository::GitOperations;
use crate::source::{GitSource, PullStrategy, PushStrategy, Source};
use crate::sparse::{self, compose_rules, ReconcileOutcome};
use crate::status::{sync_status, SyncStatus};
use crate::suggestions;

/// Run-wide settings for repository operations.
#[derive(Debug, Clone, Default)]
pub struct RepoOpsOptions {
    /// Log the pull/push/commit that would run instead of running it
    pub dry_run: bool,
    /// Overrides every source's configured pull strategy
    pub pull_strategy: Option<PullStrategy>,
    /// Overrides every source's configured push strategy
    pub push_strategy: Option<PushStrategy>,
    /// Process sources concurrently
    pub parallel: bool,
    pub commit_message: Option<String>,
}

/// Outcome of one operation on one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OperationResult {
    pub operation: &'static str,
    pub source: String,
    pub locator: String,
    pub working_path: PathBuf,
    pub success: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl OperationResult {
    fn ok(
        operation: &'static str,
        source: &Source,
        git: &GitSource,
        message: impl Into<String>,
    ) -> Self {
        Self {
            operation,
            source: source.name.clone(),
            locator: git.url.clone(),
            working_path: git.working_path.clone(),
            success: true,
            message: message.into(),
            error: None,
        }
    }

    fn failed(
        operation: &'static str,
        source: &Source,
        git: &GitSource,
        message: impl Into<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            success: false,
            error,
            ..Self::ok(operation, source, git, message)
        }
    }
}

/// True when every result succeeded.
pub fn all_succeeded(results: &[OperationResult]) -> bool {
    results.iter().all(|r| r.success)
}

/// Drives git operations for a set of sources.
pub struct RepositoryOperations<'a> {
    git: &'a dyn GitOperations,
    workspace: PathBuf,
    options: RepoOpsOptions,
    cancel: CancelToken,
}

impl<'a> RepositoryOperations<'a> {
    pub fn new(
        git: &'a dyn GitOperations,
        workspace: impl Into<PathBuf>,
        options: RepoOpsOptions,
    ) -> Self {
        Self {
            git,
            workspace: workspace.into(),
            options,
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn checkout(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "checkout", |s, g| vec![self.checkout_one(s, g)])
    }

    pub fn pull(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "pull", |s, g| vec![self.pull_one(s, g)])
    }

    pub fn push(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "push", |s, g| vec![self.push_one(s, g)])
    }

    pub fn commit(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "commit", |s, g| vec![self.commit_one(s, g)])
    }

    /// Checkout, then pull when behind or diverged, then push when ahead.
    pub fn prepare(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "prepare", |s, g| self.prepare_one(s, g))
    }

    /// Commit, pull, push; stops at the first failure of each source.
    pub fn sync(&self, sources: &[Source]) -> Result<Vec<OperationResult>> {
        self.run_each(sources, "sync", |s, g| {
            let mut results = Vec::with_capacity(3);
            let steps: [fn(&Self, &Source, &GitSource) -> OperationResult; 3] =
                [Self::commit_one, Self::pull_one, Self::push_one];
            for step in steps {
                let result = step(self, s, g);
                let success = result.success;
                results.push(result);
                if !success {
                    break;
                }
            }
            results
        })
    }

    fn ensure_workspace(&self) -> Result<()> {
        fs::create_dir_all(&self.workspace).map_err(|e| Error::fs(&self.workspace, e))
    }

    /// Apply `op` to every active git source, sequentially or in parallel.
    ///
    /// A source reached after cancellation is not touched and reports a
    /// failed `operation` result instead.
    fn run_each<F>(
        &self,
        sources: &[Source],
        operation: &'static str,
        op: F,
    ) -> Result<Vec<OperationResult>>
    where
        F: Fn(&Source, &GitSource) -> Vec<OperationResult> + Sync,
    {
        self.ensure_workspace()?;

        let targets: Vec<(&Source, &GitSource)> = sources
            .iter()
            .filter(|s| s.options.active)
            .filter_map(|s| s.as_git().map(|g| (s, g)))
            .collect();

        let run = |&(source, git): &(&Source, &GitSource)| -> Vec<OperationResult> {
            match self.cancel.check() {
                Ok(()) => op(source, git),
                Err(e) => {
                    debug!("{}: {} skipped, run cancelled", source.name, operation);
                    vec![OperationResult::failed(
                        operation,
                        source,
                        git,
                        "Cancelled",
                        Some(e.to_string()),
                    )]
                }
            }
        };

        let batches: Vec<Vec<OperationResult>> = if self.options.parallel {
            targets.par_iter().map(run).collect()
        } else {
            targets.iter().map(run).collect()
        };
        Ok(batches.into_iter().flatten().collect())
    }

    fn checkout_one(&self, source: &Source, git: &GitSource) -> OperationResult {
        const OP: &str = "checkout";
        if source.options.requests_nothing() {
            debug!("{}: excludes everything and includes nothing, skipping", source.name);
            return OperationResult::ok(OP, source, git, "Nothing requested");
        }
        match self.try_checkout(source, git) {
            Ok(message) => OperationResult::ok(OP, source, git, message),
            Err(e) => {
                warn!("{}: checkout failed: {}", source.name, e);
                OperationResult::failed(OP, source, git, "Checkout failed", Some(e.to_string()))
            }
        }
    }

    fn try_checkout(&self, source: &Source, git: &GitSource) -> Result<String> {
        let dir = git.working_path.as_path();
        fs::create_dir_all(dir).map_err(|e| Error::fs(dir, e))?;

        if !dir.join(".git").exists() {
            info!("{}: initializing working copy at {}", source.name, dir.display());
            self.git.init(dir)?;
            self.git.add_origin(dir, &git.url)?;
        }

        self.git.enable_sparse_checkout(dir)?;
        let rules = compose_rules(
            &source.options.include,
            &source.options.exclude,
            source.options.exclude_by_default,
        );
        if let ReconcileOutcome::Updated(strategy) = sparse::reconcile(self.git, dir, &rules)? {
            debug!("{}: sparse rules written via {:?}", source.name, strategy);
        }

        self.git.fetch_branch(dir, &git.branch)?;
        if !self.git.local_branch_exists(dir, &git.branch)? {
            self.git.create_tracking_branch(dir, &git.branch)?;
        }

        // an unborn HEAD cannot be resolved; treat it as being on no branch
        let current = self.git.current_branch(dir).ok();
        if current.as_deref() == Some(git.branch.as_str()) {
            Ok(format!("Already on {}", git.branch))
        } else {
            self.git.checkout(dir, &git.branch)?;
            Ok(format!("Checked out {}", git.branch))
        }
    }

    fn pull_one(&self, source: &Source, git: &GitSource) -> OperationResult {
        const OP: &str = "pull";
        let dir = git.working_path.as_path();
        let strategy = self.options.pull_strategy.unwrap_or(source.options.pull_strategy);

        match sync_status(self.git, dir) {
            SyncStatus::Missing => {
                return OperationResult::failed(OP, source, git, missing_message(source), None)
            }
            SyncStatus::Dirty => {
                return OperationResult::failed(
                    OP,
                    source,
                    git,
                    "Working copy has uncommitted changes; commit or stash them first",
                    None,
                )
            }
            SyncStatus::Conflicted if strategy == PullStrategy::FfOnly => {
                return OperationResult::failed(
                    OP,
                    source,
                    git,
                    suggestions::diverged_branches(),
                    None,
                )
            }
            _ => {}
        }

        if self.options.dry_run {
            return dry_run(OP, source, git, dir, &format!("pull {}", strategy.flag()));
        }

        match self.git.pull(dir, strategy.flag()) {
            Ok(output) => {
                let message = if output.contains("Already up to date") {
                    "Already up to date".to_string()
                } else {
                    format!("Pulled {}", git.branch)
                };
                OperationResult::ok(OP, source, git, message)
            }
            Err(Error::Git { message: stderr, .. }) => {
                debug!("{}: pull failed: {}", source.name, stderr);
                OperationResult::failed(
                    OP,
                    source,
                    git,
                    suggestions::pull_failure(&stderr),
                    Some(stderr),
                )
            }
            Err(e) => OperationResult::failed(OP, source, git, "Pull failed", Some(e.to_string())),
        }
    }

    fn push_one(&self, source: &Source, git: &GitSource) -> OperationResult {
        const OP: &str = "push";
        let dir = git.working_path.as_path();
        let strategy = self.options.push_strategy.unwrap_or(source.options.push_strategy);

        match sync_status(self.git, dir) {
            SyncStatus::Current => return OperationResult::ok(OP, source, git, "Nothing to push"),
            SyncStatus::Missing => {
                return OperationResult::failed(OP, source, git, missing_message(source), None)
            }
            SyncStatus::Dirty => {
                return OperationResult::failed(
                    OP,
                    source,
                    git,
                    "Working copy has uncommitted changes; commit them before pushing",
                    None,
                )
            }
            SyncStatus::Conflicted if strategy == PushStrategy::NoForce => {
                return OperationResult::failed(
                    OP,
                    source,
                    git,
                    suggestions::push_rejected(),
                    None,
                )
            }
            _ => {}
        }

        if self.options.dry_run {
            let args = match strategy.flag() {
                Some(flag) => format!("push {}", flag),
                None => "push".to_string(),
            };
            return dry_run(OP, source, git, dir, &args);
        }

        match self.git.push(dir, strategy.flag()) {
            Ok(_) => OperationResult::ok(OP, source, git, format!("Pushed {}", git.branch)),
            Err(Error::Git { message: stderr, .. }) => {
                debug!("{}: push failed: {}", source.name, stderr);
                OperationResult::failed(
                    OP,
                    source,
                    git,
                    suggestions::push_failure(&stderr),
                    Some(stderr),
                )
            }
            Err(e) => OperationResult::failed(OP, source, git, "Push failed", Some(e.to_string())),
        }
    }

    fn commit_one(&self, source: &Source, git: &GitSource) -> OperationResult {
        const OP: &str = "commit";
        let dir = git.working_path.as_path();
        if !dir.join(".git").exists() {
            return OperationResult::failed(OP, source, git, missing_message(source), None);
        }

        let message = self
            .options
            .commit_message
            .as_deref()
            .unwrap_or(DEFAULT_COMMIT_MESSAGE);
        if self.options.dry_run {
            return dry_run(OP, source, git, dir, &format!("commit -m {:?}", message));
        }

        let committed = self
            .git
            .add_all(dir)
            .and_then(|()| self.git.commit(dir, message));
        match committed {
            Ok(_) => OperationResult::ok(OP, source, git, "Committed changes"),
            Err(Error::Git { message: output, .. }) if output.contains("nothing to commit") => {
                OperationResult::ok(OP, source, git, "Nothing to commit")
            }
            Err(e) => {
                warn!("{}: commit failed: {}", source.name, e);
                OperationResult::failed(OP, source, git, "Commit failed", Some(e.to_string()))
            }
        }
    }

    fn prepare_one(&self, source: &Source, git: &GitSource) -> Vec<OperationResult> {
        let checkout = self.checkout_one(source, git);
        if !checkout.success || source.options.requests_nothing() {
            return vec![checkout];
        }
        let mut results = vec![checkout];

        let dir = git.working_path.as_path();
        if matches!(
            sync_status(self.git, dir),
            SyncStatus::Behind | SyncStatus::Conflicted
        ) {
            let pull = self.pull_one(source, git);
            let pulled = pull.success;
            results.push(pull);
            if !pulled {
                return results;
            }
        }

        // a dry-run pull changed nothing, so the copy may still look behind
        if sync_status(self.git, dir) == SyncStatus::Ahead {
            results.push(self.push_one(source, git));
        }
        results
    }
}

fn missing_message(source: &Source) -> String {
    format!(
        "Working copy is missing; run '{}'",
        suggestions::aggregit_command("checkout", &source.name)
    )
}

fn dry_run(
    op: &'static str,
    source: &Source,
    git: &GitSource,
    dir: &Path,
    args: &str,
) -> OperationResult {
    let command = suggestions::git_command(dir, args);
    info!("[dry-run] {}", command);
    OperationResult::ok(op, source, git, format!("Would run: {}", command))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::mock::MockGitOperations;
    use crate::source::{SourceKind, SourceOptions};
    use tempfile::TempDir;

    const CURRENT: &str = "## main...origin/main\n";
    const AHEAD: &str = "## main...origin/main [ahead 1]\n";
    const BEHIND: &str = "## main...origin/main [behind 2]\n";
    const DIVERGED: &str = "## main...origin/main [ahead 1, behind 2]\n";
    const DIRTY: &str = "## main...origin/main\n M docs/intro.md\n";

    fn git_source(root: &Path, name: &str, with_git_dir: bool) -> Source {
        let working_path = root.join("git").join(name);
        if with_git_dir {
            fs::create_dir_all(working_path.join(".git")).unwrap();
        }
        Source {
            name: name.to_string(),
            order: 0,
            kind: SourceKind::Git(GitSource {
                url: format!("https://example.com/{}.git", name),
                working_path,
                branch: "main".to_string(),
            }),
            options: SourceOptions::default(),
        }
    }

    fn ops<'a>(
        git: &'a MockGitOperations,
        root: &Path,
        options: RepoOpsOptions,
    ) -> RepositoryOperations<'a> {
        RepositoryOperations::new(git, root, options)
    }

    #[test]
    fn test_checkout_initializes_new_working_copy() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", false);
        let git = MockGitOperations::new()
            .fail("sparse-checkout list", "not a sparse checkout")
            .fail("rev-parse --abbrev-ref HEAD", "unborn HEAD");

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .checkout(&[source])
            .unwrap();

        assert!(results[0].success, "{:?}", results[0]);
        assert_eq!(
            git.calls(),
            vec![
                "init",
                "remote add origin https://example.com/docs.git",
                "config core.sparseCheckout true",
                "sparse-checkout list",
                "sparse-checkout set /*",
                "fetch main",
                "branch --list main",
                "branch --track main",
                "rev-parse --abbrev-ref HEAD",
                "checkout main",
            ]
        );
    }

    #[test]
    fn test_checkout_existing_copy_on_branch_is_quiet() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new()
            .respond("sparse-checkout list", "/*")
            .respond("branch --list main", "* main")
            .respond("rev-parse --abbrev-ref HEAD", "main");

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .checkout(&[source])
            .unwrap();

        assert!(results[0].success);
        assert_eq!(results[0].message, "Already on main");
        assert!(!git.called("init"));
        assert!(!git.called("sparse-checkout set"));
        assert!(!git.called("branch --track"));
        assert!(!git.called("checkout"));
    }

    #[test]
    fn test_checkout_nothing_requested_is_noop() {
        let temp = TempDir::new().unwrap();
        let mut source = git_source(temp.path(), "docs", false);
        source.options.exclude_by_default = true;
        let git = MockGitOperations::new();

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .checkout(&[source])
            .unwrap();
        assert!(results[0].success);
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_checkout_failure_is_reported_not_thrown() {
        let temp = TempDir::new().unwrap();
        let sources = vec![
            git_source(temp.path(), "docs", true),
            git_source(temp.path(), "blog", true),
        ];
        let git = MockGitOperations::new()
            .fail("fetch main", "fatal: couldn't find remote ref main")
            .respond("branch --list main", "* main")
            .respond("rev-parse --abbrev-ref HEAD", "main");

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .checkout(&sources)
            .unwrap();
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(|r| !r.success));
        assert!(results[0].error.as_deref().unwrap().contains("couldn't find remote ref"));
    }

    #[test]
    fn test_pull_refuses_dirty_copy() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", DIRTY);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .pull(&[source])
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("uncommitted changes"));
        assert!(!git.called("pull"));
    }

    #[test]
    fn test_pull_missing_copy_fails() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", false);
        let git = MockGitOperations::new();

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .pull(&[source])
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("aggregit checkout --source docs"));
    }

    #[test]
    fn test_pull_cli_strategy_overrides_source() {
        let temp = TempDir::new().unwrap();
        let mut source = git_source(temp.path(), "docs", true);
        source.options.pull_strategy = PullStrategy::Merge;
        let git = MockGitOperations::new().respond("status", BEHIND);
        let options = RepoOpsOptions {
            pull_strategy: Some(PullStrategy::Rebase),
            ..Default::default()
        };

        let results = ops(&git, temp.path(), options).pull(&[source]).unwrap();
        assert!(results[0].success);
        assert!(git.called("pull --rebase"));
        assert!(!git.called("pull --no-rebase"));
    }

    #[test]
    fn test_pull_diverged_with_ff_only_is_refused() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", DIVERGED);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .pull(&[source])
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("diverged"));
        assert!(!git.called("pull"));
    }

    #[test]
    fn test_pull_translates_conflicts() {
        let temp = TempDir::new().unwrap();
        let mut source = git_source(temp.path(), "docs", true);
        source.options.pull_strategy = PullStrategy::Merge;
        let git = MockGitOperations::new()
            .respond("status", DIVERGED)
            .fail("pull --no-rebase", "CONFLICT (content): Merge conflict in a.md");

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .pull(&[source])
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("merge conflicts"));
        assert!(results[0].error.as_deref().unwrap().contains("CONFLICT"));
    }

    #[test]
    fn test_pull_dry_run_does_not_execute() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", BEHIND);
        let options = RepoOpsOptions {
            dry_run: true,
            ..Default::default()
        };

        let results = ops(&git, temp.path(), options).pull(&[source]).unwrap();
        assert!(results[0].success);
        assert!(results[0].message.contains("pull --ff-only"));
        assert_eq!(git.calls(), vec!["status"]);
    }

    #[test]
    fn test_push_current_is_noop() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", CURRENT);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .push(&[source])
            .unwrap();
        assert!(results[0].success);
        assert_eq!(results[0].message, "Nothing to push");
        assert!(!git.called("push"));
    }

    #[test]
    fn test_push_dirty_is_refused() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", DIRTY);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .push(&[source])
            .unwrap();
        assert!(!results[0].success);
        assert!(!git.called("push"));
    }

    #[test]
    fn test_push_with_lease_and_rejection_message() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new()
            .respond("status", AHEAD)
            .fail("push", " ! [rejected] main -> main (fetch first)");

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .push(&[source.clone()])
            .unwrap();
        assert!(!results[0].success);
        assert!(results[0].message.contains("force-with-lease"));

        let git = MockGitOperations::new().respond("status", DIVERGED);
        let options = RepoOpsOptions {
            push_strategy: Some(PushStrategy::ForceWithLease),
            ..Default::default()
        };
        let results = ops(&git, temp.path(), options).push(&[source]).unwrap();
        assert!(results[0].success);
        assert!(git.called("push --force-with-lease"));
    }

    #[test]
    fn test_commit_nothing_to_commit_is_success() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().fail(
            "commit -m Update aggregated content",
            "\nOn branch main\nnothing to commit, working tree clean",
        );

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .commit(&[source])
            .unwrap();
        assert!(results[0].success);
        assert_eq!(results[0].message, "Nothing to commit");
        assert_eq!(git.calls(), vec!["add .", "commit -m Update aggregated content"]);
    }

    #[test]
    fn test_commit_uses_supplied_message() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new();
        let options = RepoOpsOptions {
            commit_message: Some("Refresh docs".to_string()),
            ..Default::default()
        };

        let results = ops(&git, temp.path(), options).commit(&[source]).unwrap();
        assert!(results[0].success);
        assert!(git.called("commit -m Refresh docs"));
    }

    #[test]
    fn test_prepare_pulls_when_behind_and_pushes_when_ahead() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new()
            .respond("sparse-checkout list", "/*")
            .respond("branch --list main", "* main")
            .respond("rev-parse --abbrev-ref HEAD", "main")
            .respond("status", BEHIND)
            .respond("status", BEHIND)
            .respond("status", AHEAD);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .prepare(&[source])
            .unwrap();

        let operations: Vec<_> = results.iter().map(|r| r.operation).collect();
        assert_eq!(operations, vec!["checkout", "pull", "push"]);
        assert!(all_succeeded(&results));
    }

    #[test]
    fn test_prepare_current_copy_only_checks_out() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new()
            .respond("sparse-checkout list", "/*")
            .respond("branch --list main", "* main")
            .respond("rev-parse --abbrev-ref HEAD", "main")
            .respond("status", CURRENT);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .prepare(&[source])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(!git.called("pull"));
        assert!(!git.called("push"));
    }

    #[test]
    fn test_sync_stops_after_failed_pull() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new().respond("status", DIRTY);

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .sync(&[source])
            .unwrap();
        let operations: Vec<_> = results.iter().map(|r| r.operation).collect();
        assert_eq!(operations, vec!["commit", "pull"]);
        assert!(!all_succeeded(&results));
    }

    #[test]
    fn test_non_git_and_inactive_sources_are_skipped() {
        let temp = TempDir::new().unwrap();
        let mut inactive = git_source(temp.path(), "docs", true);
        inactive.options.active = false;
        let local = Source {
            name: "notes".to_string(),
            order: 0,
            kind: SourceKind::Local(crate::source::LocalSource {
                path: temp.path().join("notes"),
            }),
            options: SourceOptions::default(),
        };
        let git = MockGitOperations::new();

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .pull(&[inactive, local])
            .unwrap();
        assert!(results.is_empty());
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_parallel_results_keep_source_order() {
        let temp = TempDir::new().unwrap();
        let sources: Vec<_> = ["a", "b", "c", "d", "e"]
            .iter()
            .map(|name| git_source(temp.path(), name, true))
            .collect();
        let git = MockGitOperations::new().respond("status", CURRENT);
        let options = RepoOpsOptions {
            parallel: true,
            ..Default::default()
        };

        let results = ops(&git, temp.path(), options).push(&sources).unwrap();
        let names: Vec<_> = results.iter().map(|r| r.source.as_str()).collect();
        assert_eq!(names, vec!["a", "b", "c", "d", "e"]);
    }

    #[test]
    fn test_cancelled_run_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let source = git_source(temp.path(), "docs", true);
        let git = MockGitOperations::new();
        let cancel = CancelToken::new();
        cancel.cancel();

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .with_cancel(cancel)
            .pull(&[source])
            .unwrap();
        assert_eq!(results.len(), 1);
        assert!(!results[0].success);
        assert_eq!(results[0].message, "Cancelled");
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_cancelled_mid_run_keeps_completed_results() {
        let temp = TempDir::new().unwrap();
        let sources = vec![
            git_source(temp.path(), "a", true),
            git_source(temp.path(), "b", true),
        ];
        let cancel = CancelToken::new();
        let git = MockGitOperations::new()
            .respond("status", AHEAD)
            .cancel_on("push", cancel.clone());

        let results = ops(&git, temp.path(), RepoOpsOptions::default())
            .with_cancel(cancel)
            .push(&sources)
            .unwrap();

        assert_eq!(git.calls().iter().filter(|c| c.starts_with("push")).count(), 1);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].source, "a");
        assert!(results[0].success, "{:?}", results[0]);
        assert_eq!(results[1].source, "b");
        assert!(!results[1].success);
        assert_eq!(results[1].error.as_deref(), Some("Operation cancelled"));
    }

    #[test]
    fn test_uncreatable_workspace_is_fatal() {
        let temp = TempDir::new().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "not a directory").unwrap();
        let git = MockGitOperations::new();

        let err = ops(&git, &blocker.join("ws"), RepoOpsOptions::default())
            .pull(&[])
            .unwrap_err();
        assert!(matches!(err, Error::FileSystem { .. }));
    }
}
