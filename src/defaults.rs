//! Default values for aggregit configuration.
//!
//! This module provides centralized default values used across the engine
//! and the CLI, ensuring consistency and avoiding duplication.

use std::path::PathBuf;
use std::time::Duration;

/// Name of the configuration file looked up in the current directory.
pub const CONFIG_FILE_NAME: &str = "aggregit.yaml";

/// Upper bound for a single `git` invocation.
pub const DEFAULT_GIT_TIMEOUT: Duration = Duration::from_secs(300);

/// Upper bound for a single HTTP request made for a web source.
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Commit message used by `commit` and `sync` when none is supplied.
pub const DEFAULT_COMMIT_MESSAGE: &str = "Update aggregated content";

/// Branch assumed when a remote's default branch cannot be discovered.
pub const FALLBACK_BRANCH: &str = "main";

/// Location of the sparse-checkout rule file inside a working copy.
pub const SPARSE_RULE_FILE: &str = ".git/info/sparse-checkout";

/// Returns the default workspace root directory.
///
/// Uses the platform-appropriate cache directory:
/// - Linux: `~/.cache/aggregit` (XDG Base Directory)
/// - macOS: `~/Library/Caches/aggregit`
/// - Windows: `{FOLDERID_LocalAppData}\aggregit`
///
/// Falls back to `.aggregit` in the current directory if the platform
/// cache directory cannot be determined.
///
/// The `workspace` key of the configuration file overrides this.
pub fn default_workspace_root() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("aggregit"))
        .unwrap_or_else(|| PathBuf::from(".aggregit"))
}
