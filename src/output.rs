//! # Output Configuration
//!
//! Controls how the CLI presents results: whether colors and emoji are
//! used, and the markers printed in front of per-source lines.
//!
//! ## Respecting User Preferences
//!
//! - `--color=never|always|auto` - CLI flag for color control
//! - `NO_COLOR` - Disables colors when set (per https://no-color.org/)
//! - `CLICOLOR=0` - Disables colors
//! - `CLICOLOR_FORCE=1` - Forces colors even in non-TTY
//! - `TERM=dumb` - Disables colors for dumb terminals

use std::env;

use console::{style, StyledObject};

use crate::status::SyncStatus;

/// Output configuration for controlling colors and emojis.
#[derive(Debug, Clone, Copy)]
pub struct OutputConfig {
    pub use_color: bool,
}

impl OutputConfig {
    /// Create an output configuration from environment and CLI flag.
    ///
    /// `always` forces colors on (overriding `NO_COLOR`), `never` forces
    /// them off and anything else detects support from the environment.
    /// The decision is also applied to `console`'s global switch so that
    /// styled text follows it.
    pub fn from_env_and_flag(color_flag: &str) -> Self {
        let use_color = match color_flag.to_lowercase().as_str() {
            "always" => true,
            "never" => false,
            _ => Self::detect_color_support(),
        };
        console::set_colors_enabled(use_color);
        console::set_colors_enabled_stderr(use_color);
        Self { use_color }
    }

    fn detect_color_support() -> bool {
        if env::var_os("NO_COLOR").is_some() {
            return false;
        }
        if env::var("CLICOLOR").is_ok_and(|v| v == "0") {
            return false;
        }
        if env::var("CLICOLOR_FORCE").is_ok_and(|v| v != "0" && !v.is_empty()) {
            return true;
        }
        if env::var("TERM").is_ok_and(|v| v == "dumb") {
            return false;
        }
        console::Term::stdout().features().colors_supported()
    }

    /// Marker for a successful line.
    pub fn ok(&self) -> &'static str {
        emoji(self, "✅", "[ok]")
    }

    /// Marker for a failed line.
    pub fn failed(&self) -> &'static str {
        emoji(self, "❌", "[FAILED]")
    }

    /// Marker for a warning line.
    pub fn warning(&self) -> &'static str {
        emoji(self, "⚠️ ", "[warn]")
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self::from_env_and_flag("auto")
    }
}

/// Returns the emoji when colors are enabled, the plain text otherwise.
pub fn emoji<'a>(config: &OutputConfig, emoji_str: &'a str, plain: &'a str) -> &'a str {
    if config.use_color {
        emoji_str
    } else {
        plain
    }
}

/// A sync status colored by how much attention it needs.
pub fn styled_status(status: SyncStatus) -> StyledObject<&'static str> {
    let text = style(status.as_str());
    match status {
        SyncStatus::Current => text.green(),
        SyncStatus::Ahead | SyncStatus::Behind => text.yellow(),
        SyncStatus::Conflicted | SyncStatus::Dirty => text.red(),
        SyncStatus::Missing | SyncStatus::Unknown => text.red().bold(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_flags() {
        assert!(OutputConfig::from_env_and_flag("always").use_color);
        assert!(!OutputConfig::from_env_and_flag("never").use_color);
    }

    #[test]
    fn test_markers_follow_color_setting() {
        let plain = OutputConfig { use_color: false };
        assert_eq!(plain.ok(), "[ok]");
        assert_eq!(plain.failed(), "[FAILED]");
        let fancy = OutputConfig { use_color: true };
        assert_eq!(fancy.ok(), "✅");
    }

    #[test]
    fn test_styled_status_text() {
        let text = styled_status(SyncStatus::Behind).to_string();
        assert_eq!(console::strip_ansi_codes(&text), "behind");
    }
}
