//! # Readiness Verification
//!
//! Checks, without changing anything, whether every active source is in a
//! state a build can safely consume:
//!
//! - git: the working copy exists, its sync status is clean, sparse
//!   checkout is enabled with a rule file matching the configuration
//! - web: the URL answers a `HEAD` request
//! - local: the directory exists and is not empty
//!
//! Every failed check yields an [`Issue`] with a remedial command. A check
//! can be ignored through [`VerifyToggles`], globally or per source. Once a
//! blocking issue is found (nothing to inspect, or an unclassifiable
//! working copy) the remaining checks of that source are skipped.

use std::fs;
use std::path::Path;

use log::debug;
use serde::Serialize;

use crate::defaults::SPARSE_RULE_FILE;
use crate::repository::GitOperations;
use crate::source::{GitSource, LocalSource, Source, SourceKind, VerifyToggles, WebSource};
use crate::sparse::{self, compose_rules};
use crate::status::{sync_status, SyncStatus};
use crate::suggestions::{aggregit_command, git_command};
use crate::web::RemoteFetcher;

/// A failed check and how to fix it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Issue {
    pub message: String,
    pub suggestion: String,
}

impl Issue {
    fn new(message: impl Into<String>, suggestion: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            suggestion: suggestion.into(),
        }
    }
}

/// Verification outcome for one source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceReport {
    pub name: String,
    pub kind: &'static str,
    pub ready: bool,
    /// Only for git sources
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SyncStatus>,
    pub issues: Vec<Issue>,
}

/// Verification outcome for every active source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadinessReport {
    pub sources: Vec<SourceReport>,
    pub is_ready: bool,
}

impl ReadinessReport {
    pub fn issue_count(&self) -> usize {
        self.sources.iter().map(|s| s.issues.len()).sum()
    }
}

/// Verify every active source. `global` toggles apply on top of each
/// source's own.
pub fn verify(
    sources: &[Source],
    git: &dyn GitOperations,
    fetcher: &dyn RemoteFetcher,
    global: VerifyToggles,
) -> ReadinessReport {
    let reports: Vec<SourceReport> = sources
        .iter()
        .filter(|s| s.options.active)
        .map(|source| verify_source(source, git, fetcher, global))
        .collect();
    let is_ready = reports.iter().all(|r| r.ready);
    ReadinessReport {
        sources: reports,
        is_ready,
    }
}

fn verify_source(
    source: &Source,
    git: &dyn GitOperations,
    fetcher: &dyn RemoteFetcher,
    global: VerifyToggles,
) -> SourceReport {
    let toggles = source.options.verify.union(global);
    let mut issues = Vec::new();
    let status = match &source.kind {
        SourceKind::Git(repo) => verify_git(source, repo, git, toggles, &mut issues),
        SourceKind::Web(web) => {
            verify_web(web, fetcher, toggles, &mut issues);
            None
        }
        SourceKind::Local(local) => {
            verify_local(local, toggles, &mut issues);
            None
        }
    };
    debug!("{}: {} issue(s)", source.name, issues.len());
    SourceReport {
        name: source.name.clone(),
        kind: source.kind_name(),
        ready: issues.is_empty(),
        status,
        issues,
    }
}

fn verify_git(
    source: &Source,
    repo: &GitSource,
    git: &dyn GitOperations,
    toggles: VerifyToggles,
    issues: &mut Vec<Issue>,
) -> Option<SyncStatus> {
    let dir = repo.working_path.as_path();
    let checkout = aggregit_command("checkout", &source.name);

    // checkout never creates a copy for a source that asks for nothing
    if source.options.requests_nothing() {
        return None;
    }

    let status = sync_status(git, dir);
    match status {
        SyncStatus::Missing => {
            if !toggles.ignore_missing {
                issues.push(Issue::new(
                    format!("Working copy is missing at {}", dir.display()),
                    checkout,
                ));
            }
            return Some(status);
        }
        SyncStatus::Unknown => {
            issues.push(Issue::new(
                "Could not determine sync status",
                git_command(dir, "status --branch --porcelain"),
            ));
            return Some(status);
        }
        SyncStatus::Behind if !toggles.ignore_behind => issues.push(Issue::new(
            "Working copy is behind its remote",
            aggregit_command("pull", &source.name),
        )),
        SyncStatus::Ahead if !toggles.ignore_ahead => issues.push(Issue::new(
            "Working copy has unpushed commits",
            aggregit_command("push", &source.name),
        )),
        SyncStatus::Conflicted if !toggles.ignore_conflicted => issues.push(Issue::new(
            "Working copy and remote have diverged",
            format!(
                "{} --pull-strategy rebase",
                aggregit_command("pull", &source.name)
            ),
        )),
        SyncStatus::Dirty if !toggles.ignore_dirty => issues.push(Issue::new(
            "Working copy has uncommitted changes",
            aggregit_command("commit", &source.name),
        )),
        _ => {}
    }

    if !toggles.ignore_sparse {
        verify_sparse(source, dir, git, &checkout, issues);
    }
    Some(status)
}

fn verify_sparse(
    source: &Source,
    dir: &Path,
    git: &dyn GitOperations,
    checkout: &str,
    issues: &mut Vec<Issue>,
) {
    match git.config_get(dir, "core.sparseCheckout") {
        Ok(Some(value)) if value == "true" => {}
        Ok(_) => issues.push(Issue::new("Sparse checkout is not enabled", checkout)),
        Err(e) => {
            debug!("{}: reading core.sparseCheckout failed: {:?}", source.name, e);
            issues.push(Issue::new(
                "Could not read sparse checkout setting",
                git_command(dir, "config --get core.sparseCheckout"),
            ));
        }
    }

    let rule_file = dir.join(SPARSE_RULE_FILE);
    if !rule_file.is_file() {
        issues.push(Issue::new("Sparse-checkout rule file is missing", checkout));
        return;
    }

    let options = &source.options;
    let rules = match sparse::read_rules(git, dir) {
        Ok(rules) => rules,
        Err(e) => {
            issues.push(Issue::new(
                format!("Could not read sparse-checkout rules: {}", e),
                checkout,
            ));
            return;
        }
    };
    if options.exclude_by_default && !rules.iter().any(|r| !r.starts_with('!')) {
        issues.push(Issue::new(
            "Sparse-checkout rules include nothing but the source excludes by default",
            checkout,
        ));
        return;
    }
    if rules != compose_rules(&options.include, &options.exclude, options.exclude_by_default) {
        issues.push(Issue::new(
            "Sparse-checkout rules differ from the configured include/exclude lists",
            checkout,
        ));
    }
}

fn verify_web(
    web: &WebSource,
    fetcher: &dyn RemoteFetcher,
    toggles: VerifyToggles,
    issues: &mut Vec<Issue>,
) {
    if toggles.ignore_remote_availability {
        return;
    }
    if let Err(e) = fetcher.probe(&web.url) {
        debug!("probe failed: {:?}", e);
        issues.push(Issue::new(
            format!("Remote file is not reachable: {}", e),
            format!("curl -I {}", web.url),
        ));
    }
}

fn verify_local(local: &LocalSource, toggles: VerifyToggles, issues: &mut Vec<Issue>) {
    let path = local.path.as_path();
    if !path.is_dir() {
        if !toggles.ignore_missing {
            issues.push(Issue::new(
                format!("Directory does not exist: {}", path.display()),
                format!("mkdir -p {}", path.display()),
            ));
        }
        return;
    }
    let empty = fs::read_dir(path)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true);
    if empty && !toggles.ignore_empty {
        issues.push(Issue::new(
            format!("Directory is empty: {}", path.display()),
            "Add content or set 'ignoreEmpty: true' for this source",
        ));
    }
}
