//! # Sources
//!
//! Resolved, immutable descriptions of the units of content aggregit pulls
//! together. A [`Source`] is produced by [`crate::config::Config::resolve`] once per
//! run and never mutated afterwards.
//!
//! The three kinds of source form a closed sum type ([`SourceKind`]), so
//! every consumer (pattern matching, copy engine, verifier) matches on it
//! exhaustively.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// A single source of content, fully resolved.
#[derive(Debug, Clone)]
pub struct Source {
    /// Unique display name
    pub name: String,
    /// Processing order; ties keep configuration order
    pub order: i64,
    /// Kind-specific locator
    pub kind: SourceKind,
    /// Options after applying global defaults
    pub options: SourceOptions,
}

/// Kind-specific part of a [`Source`].
#[derive(Debug, Clone)]
pub enum SourceKind {
    Git(GitSource),
    Web(WebSource),
    Local(LocalSource),
}

/// A version-controlled repository with a sparse working copy.
#[derive(Debug, Clone)]
pub struct GitSource {
    pub url: String,
    /// Working copy location
    pub working_path: PathBuf,
    /// The single branch tracked for this run
    pub branch: String,
}

/// A single remote file fetched over HTTP.
#[derive(Debug, Clone)]
pub struct WebSource {
    pub url: String,
    /// Directory the file is downloaded into before it is copied
    pub download_root: PathBuf,
}

/// A directory on the local filesystem.
#[derive(Debug, Clone)]
pub struct LocalSource {
    pub path: PathBuf,
}

impl Source {
    /// The directory the copy engine walks for this source.
    pub fn materialized_root(&self) -> &std::path::Path {
        match &self.kind {
            SourceKind::Git(git) => &git.working_path,
            SourceKind::Web(web) => &web.download_root,
            SourceKind::Local(local) => &local.path,
        }
    }

    /// The remote URL or local path identifying this source.
    pub fn locator(&self) -> String {
        match &self.kind {
            SourceKind::Git(git) => git.url.clone(),
            SourceKind::Web(web) => web.url.clone(),
            SourceKind::Local(local) => local.path.display().to_string(),
        }
    }

    pub fn kind_name(&self) -> &'static str {
        match &self.kind {
            SourceKind::Git(_) => "git",
            SourceKind::Web(_) => "web",
            SourceKind::Local(_) => "local",
        }
    }

    pub fn as_git(&self) -> Option<&GitSource> {
        match &self.kind {
            SourceKind::Git(git) => Some(git),
            _ => None,
        }
    }
}

/// Per-source options after default resolution.
#[derive(Debug, Clone)]
pub struct SourceOptions {
    pub active: bool,
    pub collision_strategy: CollisionStrategy,
    pub update_strategy: UpdateStrategy,
    pub include: Vec<String>,
    pub exclude: Vec<String>,
    pub exclude_by_default: bool,
    pub remap: Vec<Remapping>,
    pub missing_timestamp: MissingTimestamp,
    pub pull_strategy: PullStrategy,
    pub push_strategy: PushStrategy,
    pub verify: VerifyToggles,
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self {
            active: true,
            collision_strategy: CollisionStrategy::default(),
            update_strategy: UpdateStrategy::default(),
            include: Vec::new(),
            exclude: Vec::new(),
            exclude_by_default: false,
            remap: Vec::new(),
            missing_timestamp: MissingTimestamp::default(),
            pull_strategy: PullStrategy::default(),
            push_strategy: PushStrategy::default(),
            verify: VerifyToggles::default(),
        }
    }
}

impl SourceOptions {
    /// True when the source asks for nothing at all: nothing is included by
    /// default and no include pattern was given.
    pub fn requests_nothing(&self) -> bool {
        self.exclude_by_default && self.include.is_empty()
    }
}

/// What to do when two sources produce the same destination path.
///
/// `fail` is the only strategy; the enum leaves room for alternatives such
/// as an order-based winner.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CollisionStrategy {
    #[default]
    Fail,
}

/// Policy for overwriting an existing destination file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum UpdateStrategy {
    Always,
    #[default]
    IfDifferent,
    IfNewer,
    Never,
    /// Interactive confirmation; unattended runs treat it as `never`
    Prompt,
}

/// What `if-newer` does when a source file has no native timestamp.
///
/// Web sources never have one and are downloaded again on every build, so
/// under `fallback` their files always look newer; `if-newer` then only
/// rewrites files whose content changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MissingTimestamp {
    /// Use the materialized file's filesystem mtime
    #[default]
    Fallback,
    /// Record a per-file error
    Error,
}

/// How `pull` reconciles local and remote history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PullStrategy {
    #[default]
    FfOnly,
    Rebase,
    Merge,
}

impl PullStrategy {
    pub fn flag(self) -> &'static str {
        match self {
            PullStrategy::FfOnly => "--ff-only",
            PullStrategy::Rebase => "--rebase",
            PullStrategy::Merge => "--no-rebase",
        }
    }
}

/// Whether `push` may overwrite remote history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum PushStrategy {
    #[default]
    NoForce,
    ForceWithLease,
    Force,
}

impl PushStrategy {
    pub fn flag(self) -> Option<&'static str> {
        match self {
            PushStrategy::NoForce => None,
            PushStrategy::ForceWithLease => Some("--force-with-lease"),
            PushStrategy::Force => Some("--force"),
        }
    }
}

/// Readiness checks a source may opt out of.
///
/// Not every toggle applies to every kind: `ignore_remote_availability` is
/// only read for web sources and `ignore_empty` only for local ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct VerifyToggles {
    pub ignore_missing: bool,
    pub ignore_behind: bool,
    pub ignore_ahead: bool,
    pub ignore_dirty: bool,
    pub ignore_conflicted: bool,
    pub ignore_sparse: bool,
    pub ignore_remote_availability: bool,
    pub ignore_empty: bool,
}

impl VerifyToggles {
    /// Combine with another set of toggles; a check is ignored if either
    /// side ignores it.
    pub fn union(self, other: VerifyToggles) -> VerifyToggles {
        VerifyToggles {
            ignore_missing: self.ignore_missing || other.ignore_missing,
            ignore_behind: self.ignore_behind || other.ignore_behind,
            ignore_ahead: self.ignore_ahead || other.ignore_ahead,
            ignore_dirty: self.ignore_dirty || other.ignore_dirty,
            ignore_conflicted: self.ignore_conflicted || other.ignore_conflicted,
            ignore_sparse: self.ignore_sparse || other.ignore_sparse,
            ignore_remote_availability: self.ignore_remote_availability
                || other.ignore_remote_availability,
            ignore_empty: self.ignore_empty || other.ignore_empty,
        }
    }
}

/// A rule translating a source-relative path into a destination-relative one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remapping {
    pub source: String,
    pub target: String,
}

impl Remapping {
    pub fn new(source: impl Into<String>, target: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}

impl fmt::Display for Source {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}: {})", self.name, self.kind_name(), self.locator())
    }
}
