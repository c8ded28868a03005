//! # Git Operations Seam
//!
//! Everything aggregit asks of a working copy goes through the
//! [`GitOperations`] trait. The rest of the engine (the sparse-checkout
//! reconciler, the sync-state classifier, the repository orchestrator, the
//! copy engine's timestamp lookup and the readiness verifier) only ever
//! sees `&dyn GitOperations`.
//!
//! [`DefaultGitOperations`] implements the trait on top of the system `git`
//! binary (see [`crate::git`]). Tests substitute scripted mocks so every
//! decision path can be exercised without a real repository.

use std::path::Path;
use std::time::Duration;

use crate::defaults::DEFAULT_GIT_TIMEOUT;
use crate::error::{Error, Result};
use crate::git::{parse_commit_time, parse_rules, parse_symref_head, run_git};

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// `git init`
    fn init(&self, dir: &Path) -> Result<()>;

    /// `git remote add origin <url>`
    fn add_origin(&self, dir: &Path, url: &str) -> Result<()>;

    /// `git config core.sparseCheckout true`
    fn enable_sparse_checkout(&self, dir: &Path) -> Result<()>;

    /// `git sparse-checkout list`
    fn sparse_checkout_list(&self, dir: &Path) -> Result<Vec<String>>;

    /// `git sparse-checkout set --no-cone <rules...>`
    fn sparse_checkout_set(&self, dir: &Path, rules: &[String]) -> Result<()>;

    /// Shallow fetch of a single branch into `refs/remotes/origin/<branch>`.
    fn fetch_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Whether a local branch with this name exists.
    fn local_branch_exists(&self, dir: &Path, branch: &str) -> Result<bool>;

    /// `git branch --track <branch> origin/<branch>`
    fn create_tracking_branch(&self, dir: &Path, branch: &str) -> Result<()>;

    /// `git rev-parse --abbrev-ref HEAD`
    fn current_branch(&self, dir: &Path) -> Result<String>;

    /// `git checkout <branch>`
    fn checkout(&self, dir: &Path, branch: &str) -> Result<()>;

    /// Raw output of `git status --branch --porcelain`.
    fn status(&self, dir: &Path) -> Result<String>;

    /// `git pull <flag>`
    fn pull(&self, dir: &Path, flag: &str) -> Result<String>;

    /// `git push [flag]`
    fn push(&self, dir: &Path, flag: Option<&str>) -> Result<String>;

    /// `git add .`
    fn add_all(&self, dir: &Path) -> Result<()>;

    /// `git commit -m <message>`
    fn commit(&self, dir: &Path, message: &str) -> Result<String>;

    /// Default branch of a remote, via `git ls-remote --symref <url> HEAD`.
    fn default_branch(&self, url: &str) -> Result<String>;

    /// Commit time (seconds since the epoch) of the last commit touching
    /// `file`, or `None` when the file has no history.
    fn last_commit_time(&self, dir: &Path, file: &str) -> Result<Option<i64>>;

    /// `git config --get <key>`; `None` when the key is unset.
    fn config_get(&self, dir: &Path, key: &str) -> Result<Option<String>>;
}

/// The default implementation of `GitOperations`, which runs the system
/// `git` command with a per-invocation timeout.
#[derive(Debug, Clone)]
pub struct DefaultGitOperations {
    timeout: Duration,
}

impl DefaultGitOperations {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    fn run(&self, dir: &Path, args: &[&str]) -> Result<String> {
        run_git(Some(dir), args, self.timeout)
    }
}

impl Default for DefaultGitOperations {
    fn default() -> Self {
        Self::new(DEFAULT_GIT_TIMEOUT)
    }
}

impl GitOperations for DefaultGitOperations {
    fn init(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["init"]).map(drop)
    }

    fn add_origin(&self, dir: &Path, url: &str) -> Result<()> {
        self.run(dir, &["remote", "add", "origin", url]).map(drop)
    }

    fn enable_sparse_checkout(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["config", "core.sparseCheckout", "true"])
            .map(drop)
    }

    fn sparse_checkout_list(&self, dir: &Path) -> Result<Vec<String>> {
        let output = self.run(dir, &["sparse-checkout", "list"])?;
        Ok(parse_rules(&output))
    }

    fn sparse_checkout_set(&self, dir: &Path, rules: &[String]) -> Result<()> {
        let mut args = vec!["sparse-checkout", "set", "--no-cone"];
        args.extend(rules.iter().map(String::as_str));
        self.run(dir, &args).map(drop)
    }

    fn fetch_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let refspec = format!("{branch}:refs/remotes/origin/{branch}");
        self.run(dir, &["fetch", "--depth", "1", "origin", &refspec])
            .map(drop)
    }

    fn local_branch_exists(&self, dir: &Path, branch: &str) -> Result<bool> {
        let output = self.run(dir, &["branch", "--list", branch])?;
        Ok(!output.trim().is_empty())
    }

    fn create_tracking_branch(&self, dir: &Path, branch: &str) -> Result<()> {
        let upstream = format!("origin/{branch}");
        self.run(dir, &["branch", "--track", branch, &upstream])
            .map(drop)
    }

    fn current_branch(&self, dir: &Path) -> Result<String> {
        let output = self.run(dir, &["rev-parse", "--abbrev-ref", "HEAD"])?;
        Ok(output.trim().to_string())
    }

    fn checkout(&self, dir: &Path, branch: &str) -> Result<()> {
        self.run(dir, &["checkout", branch]).map(drop)
    }

    fn status(&self, dir: &Path) -> Result<String> {
        self.run(dir, &["status", "--branch", "--porcelain"])
    }

    fn pull(&self, dir: &Path, flag: &str) -> Result<String> {
        self.run(dir, &["pull", flag])
    }

    fn push(&self, dir: &Path, flag: Option<&str>) -> Result<String> {
        match flag {
            Some(flag) => self.run(dir, &["push", flag]),
            None => self.run(dir, &["push"]),
        }
    }

    fn add_all(&self, dir: &Path) -> Result<()> {
        self.run(dir, &["add", "."]).map(drop)
    }

    fn commit(&self, dir: &Path, message: &str) -> Result<String> {
        self.run(dir, &["commit", "-m", message])
    }

    fn default_branch(&self, url: &str) -> Result<String> {
        let output = run_git(None, &["ls-remote", "--symref", url, "HEAD"], self.timeout)?;
        parse_symref_head(&output).ok_or_else(|| Error::Git {
            command: format!("ls-remote --symref {url} HEAD"),
            message: "remote did not report a default branch".to_string(),
        })
    }

    fn last_commit_time(&self, dir: &Path, file: &str) -> Result<Option<i64>> {
        let output = self.run(dir, &["log", "-1", "--format=%ct", "--", file])?;
        Ok(parse_commit_time(&output))
    }

    fn config_get(&self, dir: &Path, key: &str) -> Result<Option<String>> {
        match self.run(dir, &["config", "--get", key]) {
            Ok(value) => Ok(Some(value.trim().to_string())),
            // `git config --get` exits 1 without output for an unset key
            Err(Error::Git { message, .. }) if message.is_empty() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
