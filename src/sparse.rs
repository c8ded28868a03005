//! Sparse-checkout rules
//!
//! A git source's working copy materializes only the files its
//! include/exclude lists ask for. [`compose_rules`] turns those lists into
//! the ordered, gitignore-style rule list git understands, and
//! [`reconcile`] brings a working copy's rules in line with it.
//!
//! Reading and writing rules each go through an ordered chain of
//! strategies. The `git sparse-checkout` subcommand is tried first; the
//! rule file under `.git/info` is the fallback, because a freshly
//! initialized working copy does not always answer the subcommand.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::{debug, info};

use crate::defaults::SPARSE_RULE_FILE;
use crate::error::{Error, Result};
use crate::git::parse_rules;
use crate::repository::GitOperations;

/// Compose the ordered sparse-checkout rules for a source.
///
/// Later rules refine earlier ones, so the order is significant:
/// `/*` first when everything is included by default, then every include
/// pattern verbatim, then every exclude pattern negated with `!`.
pub fn compose_rules(
    include: &[String],
    exclude: &[String],
    exclude_by_default: bool,
) -> Vec<String> {
    let mut rules = Vec::with_capacity(include.len() + exclude.len() + 1);
    if !exclude_by_default {
        rules.push("/*".to_string());
    }
    rules.extend(include.iter().cloned());
    rules.extend(exclude.iter().map(|pattern| format!("!{}", pattern)));
    rules
}

/// Ways of reading the current rule set, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReadStrategy {
    /// `git sparse-checkout list`
    Query,
    /// `.git/info/sparse-checkout`
    RuleFile,
}

/// Ways of writing a rule set, tried in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteStrategy {
    /// `git sparse-checkout set --no-cone`
    Command,
    /// Overwrite `.git/info/sparse-checkout`
    RuleFile,
}

pub const READ_CHAIN: [ReadStrategy; 2] = [ReadStrategy::Query, ReadStrategy::RuleFile];
pub const WRITE_CHAIN: [WriteStrategy; 2] = [WriteStrategy::Command, WriteStrategy::RuleFile];

impl ReadStrategy {
    pub fn read(self, git: &dyn GitOperations, dir: &Path) -> Result<Vec<String>> {
        match self {
            ReadStrategy::Query => git.sparse_checkout_list(dir),
            ReadStrategy::RuleFile => read_rule_file(dir),
        }
    }
}

impl WriteStrategy {
    pub fn write(self, git: &dyn GitOperations, dir: &Path, rules: &[String]) -> Result<()> {
        match self {
            WriteStrategy::Command => git.sparse_checkout_set(dir, rules),
            WriteStrategy::RuleFile => write_rule_file(dir, rules),
        }
    }
}

/// What [`reconcile`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    /// The working copy already had exactly the desired rules
    Unchanged,
    /// The rules were rewritten with the given strategy
    Updated(WriteStrategy),
}

/// Read the working copy's current rules, trying each strategy in order.
pub fn read_rules(git: &dyn GitOperations, dir: &Path) -> Result<Vec<String>> {
    read_rules_with(git, dir, &READ_CHAIN)
}

pub fn read_rules_with(
    git: &dyn GitOperations,
    dir: &Path,
    chain: &[ReadStrategy],
) -> Result<Vec<String>> {
    let mut last_error = None;
    for strategy in chain {
        match strategy.read(git, dir) {
            Ok(rules) => return Ok(rules),
            Err(e) => {
                debug!("Reading sparse rules via {:?} failed: {}", strategy, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::Validation {
        message: "no sparse-checkout read strategy configured".to_string(),
    }))
}

/// Bring the working copy's rules in line with `desired`.
///
/// Nothing is written when the current rules already match. Otherwise each
/// write strategy is tried in order and the first success wins.
pub fn reconcile(
    git: &dyn GitOperations,
    dir: &Path,
    desired: &[String],
) -> Result<ReconcileOutcome> {
    reconcile_with(git, dir, desired, &READ_CHAIN, &WRITE_CHAIN)
}

pub fn reconcile_with(
    git: &dyn GitOperations,
    dir: &Path,
    desired: &[String],
    read_chain: &[ReadStrategy],
    write_chain: &[WriteStrategy],
) -> Result<ReconcileOutcome> {
    let current = match read_rules_with(git, dir, read_chain) {
        Ok(rules) => rules,
        Err(e) => {
            debug!("No readable sparse rules in {}: {}", dir.display(), e);
            Vec::new()
        }
    };

    if current == desired {
        debug!("Sparse rules in {} already up to date", dir.display());
        return Ok(ReconcileOutcome::Unchanged);
    }

    let mut last_error = None;
    for strategy in write_chain {
        match strategy.write(git, dir, desired) {
            Ok(()) => {
                info!(
                    "Updated sparse rules in {} via {:?} ({} rules)",
                    dir.display(),
                    strategy,
                    desired.len()
                );
                return Ok(ReconcileOutcome::Updated(*strategy));
            }
            Err(e) => {
                debug!("Writing sparse rules via {:?} failed: {}", strategy, e);
                last_error = Some(e);
            }
        }
    }
    Err(last_error.unwrap_or_else(|| Error::Validation {
        message: "no sparse-checkout write strategy configured".to_string(),
    }))
}

/// Read the rule file; a missing file is an empty rule set.
pub fn read_rule_file(dir: &Path) -> Result<Vec<String>> {
    let path = dir.join(SPARSE_RULE_FILE);
    match fs::read_to_string(&path) {
        Ok(content) => Ok(parse_rules(&content)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
        Err(e) => Err(Error::fs(path, e)),
    }
}

pub fn write_rule_file(dir: &Path, rules: &[String]) -> Result<()> {
    let path = dir.join(SPARSE_RULE_FILE);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|e| Error::fs(parent, e))?;
    }
    let mut content = rules.join("\n");
    content.push('\n');
    fs::write(&path, content).map_err(|e| Error::fs(&path, e))
}
