//! Path matching and remapping
//!
//! [`should_include`] decides whether a source-relative path takes part in a
//! build. It is pure and shares its pattern semantics with the sparse-checkout
//! rules written by [`crate::sparse`], so the files a working copy
//! materializes are the files the copy engine accepts:
//!
//! - `*` matches any run of characters except `/`, `?` one non-`/` character
//! - `**` matches across `/`, and `dir/**` matches everything under `dir`
//! - a pattern without `/` (such as `*.md`) matches the file name at any depth
//! - a pattern without wildcards matches itself or anything below it
//!
//! [`remap`] translates a source-relative path into a destination-relative
//! one using an ordered list of [`Remapping`] rules.

use std::path::Path;

use glob::{MatchOptions, Pattern};
use log::debug;
use regex::Regex;

use crate::source::Remapping;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// Decide whether `path` is included.
///
/// Exclude patterns always win. When `exclude_by_default` is false every
/// path that is not excluded is included; otherwise a path must match at
/// least one include pattern.
pub fn should_include(
    path: &str,
    includes: &[String],
    excludes: &[String],
    exclude_by_default: bool,
) -> bool {
    if excludes.iter().any(|pattern| pattern_matches(pattern, path)) {
        return false;
    }
    if !exclude_by_default {
        return true;
    }
    includes.iter().any(|pattern| pattern_matches(pattern, path))
}

/// Match a single pattern against a `/`-separated relative path.
///
/// Patterns that fail to parse are compared for exact equality.
pub fn pattern_matches(pattern: &str, path: &str) -> bool {
    let pattern = pattern.strip_prefix('/').unwrap_or(pattern);
    if pattern.is_empty() {
        return false;
    }

    if !has_wildcard(pattern) {
        return is_under(pattern.trim_end_matches('/'), path);
    }

    // `dir/**` with a literal prefix is a plain subtree match
    if let Some(prefix) = pattern.strip_suffix("/**") {
        if !has_wildcard(prefix) {
            return is_under(prefix, path);
        }
    }

    let compiled = match Pattern::new(pattern.trim_end_matches('/')) {
        Ok(compiled) => compiled,
        Err(e) => {
            debug!("Pattern '{}' is not a valid glob ({}), using exact match", pattern, e);
            return pattern == path;
        }
    };

    if !pattern.contains('/') {
        let file_name = path.rsplit('/').next().unwrap_or(path);
        return compiled.matches_with(file_name, MATCH_OPTIONS)
            || compiled.matches_with(path, MATCH_OPTIONS);
    }

    compiled.matches_with(path, MATCH_OPTIONS)
}

fn has_wildcard(pattern: &str) -> bool {
    pattern.contains(['*', '?', '['])
}

fn is_under(prefix: &str, path: &str) -> bool {
    path == prefix
        || path
            .strip_prefix(prefix)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// Translate a source-relative path using the first matching rule.
///
/// Rules are tried in order:
/// - exact string equality replaces the whole path;
/// - a source ending in `/` replaces that directory prefix;
/// - a source containing `*` is matched as a wildcard pattern and `$1`,
///   `$2`, ... in the target are replaced by the captured text.
///
/// A path no rule matches is returned unchanged.
pub fn remap(path: &str, rules: &[Remapping]) -> String {
    for rule in rules {
        if rule.source == path {
            return rule.target.clone();
        }

        if rule.source.ends_with('/') {
            if let Some(rest) = path.strip_prefix(rule.source.as_str()) {
                return join_target(&rule.target, rest);
            }
            continue;
        }

        if rule.source.contains('*') {
            match wildcard_regex(&rule.source) {
                Ok(regex) => {
                    if let Some(result) = regex_rename(&regex, &rule.target, path) {
                        return result;
                    }
                }
                Err(e) => debug!("Skipping remapping '{}': {}", rule.source, e),
            }
        }
    }
    path.to_string()
}

fn join_target(target: &str, rest: &str) -> String {
    if target.is_empty() {
        rest.to_string()
    } else if target.ends_with('/') {
        format!("{}{}", target, rest)
    } else {
        format!("{}/{}", target, rest)
    }
}

/// Convert a wildcard pattern into an anchored regex with one capture group
/// per wildcard. `**` captures across `/`, `*` does not.
fn wildcard_regex(pattern: &str) -> Result<Regex, regex::Error> {
    let mut expr = String::from("^");
    let mut rest = pattern;
    while !rest.is_empty() {
        if let Some(tail) = rest.strip_prefix("**") {
            expr.push_str("(.*)");
            rest = tail;
        } else if let Some(tail) = rest.strip_prefix('*') {
            expr.push_str("([^/]*)");
            rest = tail;
        } else {
            let next = rest.find('*').unwrap_or(rest.len());
            expr.push_str(&regex::escape(&rest[..next]));
            rest = &rest[next..];
        }
    }
    expr.push('$');
    Regex::new(&expr)
}

/// Expand `$1`, `$2`, ... in `replacement` with the captures of `regex`
/// against `path`. Returns `None` when the regex does not match.
fn regex_rename(regex: &Regex, replacement: &str, path: &str) -> Option<String> {
    let captures = regex.captures(path)?;
    let mut result = String::new();
    let mut chars = replacement.chars().peekable();

    while let Some(ch) = chars.next() {
        if ch == '$' {
            if let Some(digit) = chars.peek().and_then(|c| c.to_digit(10)) {
                chars.next();
                if let Some(capture) = captures.get(digit as usize) {
                    result.push_str(capture.as_str());
                }
                continue;
            }
        }
        result.push(ch);
    }

    Some(result)
}

/// Render a relative path with `/` separators on every platform.
pub fn to_slash(path: &Path) -> String {
    path.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}
