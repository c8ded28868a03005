//! # Configuration Schema and Resolution
//!
//! This module defines the YAML configuration file read by aggregit and
//! turns it into the immutable [`Source`] list the engine works on.
//!
//! ## Layout
//!
//! ```yaml
//! workspace: .aggregit
//! destination: public/content
//! defaults:
//!   updateStrategy: if-different
//!   exclude: ["*.psd"]
//! sources:
//!   - type: git
//!     name: handbook
//!     url: https://example.com/org/handbook.git
//!     order: 10
//!     options:
//!       excludeByDefault: true
//!       include: ["docs/**"]
//!       remap:
//!         - { source: "docs/", target: "handbook/" }
//!   - type: local
//!     localPath: ../shared
//! ```
//!
//! ## Resolution
//!
//! Every per-source option falls back to `defaults`, then to the built-in
//! default. Verification toggles are combined: a check ignored either
//! globally or for the source is ignored. Relative paths are resolved
//! against the directory containing the configuration file. A git source
//! without a `branch` gets one discovered exactly once, here; after
//! resolution nothing about a source changes for the rest of the run.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde::Deserialize;

use crate::defaults::{default_workspace_root, FALLBACK_BRANCH};
use crate::error::{Error, Result};
use crate::repository::GitOperations;
use crate::source::{
    CollisionStrategy, GitSource, LocalSource, MissingTimestamp, PullStrategy, PushStrategy,
    Remapping, Source, SourceKind, SourceOptions, UpdateStrategy, VerifyToggles, WebSource,
};

/// The configuration file as written by the user.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigFile {
    /// Where git working copies and web downloads are kept
    #[serde(default)]
    pub workspace: Option<PathBuf>,
    /// Destination tree for builds
    #[serde(default)]
    pub destination: Option<PathBuf>,
    /// Global defaults for every per-source option
    #[serde(default)]
    pub defaults: RawOptions,
    #[serde(default)]
    pub sources: Vec<RawSource>,
}

/// Source kind tag of a configured source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceType {
    Git,
    Web,
    Local,
}

/// One entry of `sources:` before validation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSource {
    #[serde(rename = "type")]
    pub kind: SourceType,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default, alias = "path")]
    pub local_path: Option<PathBuf>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
    #[serde(default)]
    pub options: RawOptions,
}

/// Options as written; every field is optional so defaults can fill gaps.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawOptions {
    pub active: Option<bool>,
    pub collision_strategy: Option<CollisionStrategy>,
    pub update_strategy: Option<UpdateStrategy>,
    pub include: Option<Vec<String>>,
    pub exclude: Option<Vec<String>>,
    pub exclude_by_default: Option<bool>,
    pub remap: Option<Vec<Remapping>>,
    pub missing_timestamp: Option<MissingTimestamp>,
    pub pull_strategy: Option<PullStrategy>,
    pub push_strategy: Option<PushStrategy>,
    pub verify: Option<VerifyToggles>,
}

impl RawOptions {
    /// Apply `self` over `defaults` over the built-in defaults.
    pub fn resolve(&self, defaults: &RawOptions) -> SourceOptions {
        let builtin = SourceOptions::default();
        let verify = self
            .verify
            .unwrap_or_default()
            .union(defaults.verify.unwrap_or_default());

        SourceOptions {
            active: self.active.or(defaults.active).unwrap_or(builtin.active),
            collision_strategy: self
                .collision_strategy
                .or(defaults.collision_strategy)
                .unwrap_or(builtin.collision_strategy),
            update_strategy: self
                .update_strategy
                .or(defaults.update_strategy)
                .unwrap_or(builtin.update_strategy),
            include: self
                .include
                .clone()
                .or_else(|| defaults.include.clone())
                .unwrap_or(builtin.include),
            exclude: self
                .exclude
                .clone()
                .or_else(|| defaults.exclude.clone())
                .unwrap_or(builtin.exclude),
            exclude_by_default: self
                .exclude_by_default
                .or(defaults.exclude_by_default)
                .unwrap_or(builtin.exclude_by_default),
            remap: self
                .remap
                .clone()
                .or_else(|| defaults.remap.clone())
                .unwrap_or(builtin.remap),
            missing_timestamp: self
                .missing_timestamp
                .or(defaults.missing_timestamp)
                .unwrap_or(builtin.missing_timestamp),
            pull_strategy: self
                .pull_strategy
                .or(defaults.pull_strategy)
                .unwrap_or(builtin.pull_strategy),
            push_strategy: self
                .push_strategy
                .or(defaults.push_strategy)
                .unwrap_or(builtin.push_strategy),
            verify,
        }
    }
}

/// A parsed configuration together with the directory it came from.
#[derive(Debug, Clone)]
pub struct Config {
    pub file: ConfigFile,
    /// Base for relative paths
    pub base_dir: PathBuf,
}

/// A configuration ready for the engine.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub workspace: PathBuf,
    pub destination: Option<PathBuf>,
    /// Sorted by `order`; ties keep configuration order
    pub sources: Vec<Source>,
}

/// Parse YAML text into a [`ConfigFile`].
pub fn parse(yaml: &str) -> Result<ConfigFile> {
    if yaml.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(yaml).map_err(|e| Error::Config {
        message: e.to_string(),
        hint: Some("Check the field names and values against the documented schema".to_string()),
    })
}

/// Read and parse a configuration file.
pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Config> {
    let path = path.as_ref();
    let content = fs::read_to_string(path).map_err(|e| Error::Config {
        message: format!("cannot read {}: {}", path.display(), e),
        hint: None,
    })?;
    let file = parse(&content)?;
    let base_dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));
    Ok(Config { file, base_dir })
}

impl Config {
    pub fn new(file: ConfigFile, base_dir: impl Into<PathBuf>) -> Self {
        Self {
            file,
            base_dir: base_dir.into(),
        }
    }

    fn absolutize(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir.join(path)
        }
    }

    /// Validate every source and resolve defaults, paths and branches.
    ///
    /// `git` is only used to discover the branch of git sources that don't
    /// name one.
    pub fn resolve(&self, git: &dyn GitOperations) -> Result<ResolvedConfig> {
        let workspace = self
            .file
            .workspace
            .as_deref()
            .map(|p| self.absolutize(p))
            .unwrap_or_else(default_workspace_root);
        let destination = self.file.destination.as_deref().map(|p| self.absolutize(p));

        let mut names = HashSet::new();
        let mut sources = Vec::with_capacity(self.file.sources.len());
        for (index, raw) in self.file.sources.iter().enumerate() {
            let source = self.resolve_source(index, raw, &workspace, git)?;
            if !names.insert(source.name.clone()) {
                return Err(Error::Config {
                    message: format!("duplicate source name '{}'", source.name),
                    hint: Some("Give each source a unique 'name:'".to_string()),
                });
            }
            sources.push(source);
        }
        // stable: equal orders keep configuration order
        sources.sort_by_key(|s| s.order);

        Ok(ResolvedConfig {
            workspace,
            destination,
            sources,
        })
    }

    fn resolve_source(
        &self,
        index: usize,
        raw: &RawSource,
        workspace: &Path,
        git: &dyn GitOperations,
    ) -> Result<Source> {
        let at = |message: String| Error::config(format!("sources[{}]: {}", index, message));

        let url = raw.url.as_deref().map(str::trim).filter(|u| !u.is_empty());
        let name = raw
            .name
            .clone()
            .or_else(|| url.and_then(name_from_locator))
            .or_else(|| {
                raw.local_path
                    .as_deref()
                    .and_then(|p| name_from_locator(&p.to_string_lossy()))
            })
            .unwrap_or_else(|| format!("source-{}", index));

        let kind = match raw.kind {
            SourceType::Git => {
                let url = url.ok_or_else(|| Error::Config {
                    message: format!("sources[{}]: git source '{}' has no url", index, name),
                    hint: Some("Add 'url:' with the repository's clone URL".to_string()),
                })?;
                let working_path = raw
                    .local_path
                    .as_deref()
                    .map(|p| self.absolutize(p))
                    .unwrap_or_else(|| workspace.join("git").join(&name));
                let branch = match &raw.branch {
                    Some(branch) => branch.clone(),
                    None => discover_branch(git, url, &working_path),
                };
                SourceKind::Git(GitSource {
                    url: url.to_string(),
                    working_path,
                    branch,
                })
            }
            SourceType::Web => {
                let url = url.ok_or_else(|| at(format!("web source '{}' has no url", name)))?;
                if raw.local_path.is_some() {
                    return Err(at(format!("web source '{}' cannot have a localPath", name)));
                }
                url::Url::parse(url)
                    .map_err(|e| at(format!("web source '{}' has an invalid url: {}", name, e)))?;
                SourceKind::Web(WebSource {
                    url: url.to_string(),
                    download_root: workspace.join("web").join(&name),
                })
            }
            SourceType::Local => {
                let path = raw
                    .local_path
                    .as_deref()
                    .ok_or_else(|| at(format!("local source '{}' has no localPath", name)))?;
                SourceKind::Local(LocalSource {
                    path: self.absolutize(path),
                })
            }
        };

        if raw.branch.is_some() && raw.kind != SourceType::Git {
            return Err(at(format!("only git sources can set 'branch' ('{}')", name)));
        }

        Ok(Source {
            name,
            order: raw.order.unwrap_or(0),
            kind,
            options: raw.options.resolve(&self.file.defaults),
        })
    }
}

/// Derive a source name from the last segment of a URL or path.
fn name_from_locator(locator: &str) -> Option<String> {
    let last = locator
        .trim_end_matches('/')
        .rsplit(['/', '\\', ':'])
        .next()?;
    let last = last.strip_suffix(".git").unwrap_or(last);
    (!last.is_empty() && last != "." && last != "..").then(|| last.to_string())
}

/// Pick the branch for a git source without an explicit one: the branch an
/// existing working copy is on, else the remote's default branch, else
/// [`FALLBACK_BRANCH`].
fn discover_branch(git: &dyn GitOperations, url: &str, working_path: &Path) -> String {
    if working_path.join(".git").exists() {
        if let Ok(branch) = git.current_branch(working_path) {
            if !branch.is_empty() && branch != "HEAD" {
                debug!("Using checked-out branch '{}' for {}", branch, url);
                return branch;
            }
        }
    }
    match git.default_branch(url) {
        Ok(branch) => branch,
        Err(e) => {
            warn!(
                "Could not discover default branch of {}, assuming '{}'",
                url, FALLBACK_BRANCH
            );
            debug!("branch discovery failure: {:?}", e);
            FALLBACK_BRANCH.to_string()
        }
    }
}
