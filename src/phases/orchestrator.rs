//! Orchestrator for the complete build
//!
//! Coordinates the phases for every active source, strictly in `order`,
//! and consults the registry for collisions once all of them are done so
//! a collision report always names every contributing source.

use std::fs;

use log::{debug, info, warn};

use super::copy::CopyContext;
use super::{phase1, phase2, BuildOptions, BuildResult};
use crate::error::{Error, Result};
use crate::registry::FileRegistry;
use crate::repository::GitOperations;
use crate::source::Source;
use crate::web::RemoteFetcher;

/// Execute a complete build of `sources` into `options.destination`.
///
/// The registry is cleared first; it holds exactly this build's mappings
/// afterwards. Sources are expected sorted by `order`; inactive ones are
/// skipped, and so are sources whose options request nothing (they are
/// never checked out either). A source that cannot be materialized is recorded as an error
/// and the build continues with the next one. Cancellation stops the build
/// between two sources and is recorded as an error.
pub fn execute_build(
    sources: &[Source],
    registry: &FileRegistry,
    git: &dyn GitOperations,
    fetcher: &dyn RemoteFetcher,
    options: &BuildOptions,
) -> Result<BuildResult> {
    registry.clear()?;
    fs::create_dir_all(&options.destination).map_err(|e| Error::fs(&options.destination, e))?;

    let ctx = CopyContext {
        destination: &options.destination,
        registry,
        git,
    };
    let mut result = BuildResult::default();

    for source in sources.iter().filter(|s| s.options.active) {
        if let Err(e) = options.cancel.check() {
            warn!("Build cancelled before {}", source.name);
            result.errors.push(e.to_string());
            break;
        }
        if source.options.requests_nothing() {
            debug!("{}: excludes everything and includes nothing, skipping", source.name);
            continue;
        }
        info!("Building {} ({})", source.name, source.kind_name());

        // Phase 1: Materialization
        if let Err(e) = phase1::execute(source, fetcher) {
            warn!("{}: {}", source.name, e);
            result.errors.push(format!("{}: {}", source.name, e));
            continue;
        }

        // Phase 2: Copy
        phase2::execute(source, &ctx, &mut result);
    }

    // Phase 3: Collision check
    let collisions = registry.collisions()?;
    if !collisions.is_empty() {
        for (destination, mappings) in &collisions {
            let owners: Vec<&str> = mappings.iter().map(|m| m.owning_source.as_str()).collect();
            let line = format!(
                "{} is produced by more than one source: {}",
                destination,
                owners.join(", ")
            );
            if options.enforce_collisions {
                result.errors.push(format!("Collision: {}", line));
            } else {
                result.warnings.push(line);
            }
        }
        result.collisions = Some(collisions);
    }

    result.success = result.errors.is_empty();
    info!(
        "Build finished: {} copied, {} updated, {} overwritten, {} skipped, {} errors",
        result.files_copied,
        result.files_updated,
        result.files_overwritten,
        result.files_skipped,
        result.errors.len()
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancel::CancelToken;
    use crate::repository::mock::MockGitOperations;
    use crate::source::{GitSource, LocalSource, SourceKind, SourceOptions, WebSource};
    use crate::web::mock::MockFetcher;
    use std::path::Path;
    use tempfile::TempDir;

    fn local(root: &Path, name: &str, order: i64) -> Source {
        Source {
            name: name.to_string(),
            order,
            kind: SourceKind::Local(LocalSource {
                path: root.join(name),
            }),
            options: SourceOptions::default(),
        }
    }

    fn write(root: &Path, relative: &str, content: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_collision_fails_build_when_enforced() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/readme.md", "docs");
        write(temp.path(), "blog/readme.md", "blog");
        write(temp.path(), "blog/post.md", "post");
        let sources = vec![local(temp.path(), "docs", 1), local(temp.path(), "blog", 2)];
        let options = BuildOptions::new(temp.path().join("out"));

        let result = execute_build(
            &sources,
            &FileRegistry::new(),
            &MockGitOperations::new(),
            &MockFetcher::default(),
            &options,
        )
        .unwrap();

        assert!(!result.success);
        let collisions = result.collisions.unwrap();
        assert_eq!(collisions.len(), 1);
        assert_eq!(collisions["readme.md"].len(), 2);
    }

    #[test]
    fn test_later_source_wins_without_enforcement() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/readme.md", "docs");
        write(temp.path(), "blog/readme.md", "blog");
        let sources = vec![local(temp.path(), "docs", 1), local(temp.path(), "blog", 2)];
        let options = BuildOptions {
            enforce_collisions: false,
            ..BuildOptions::new(temp.path().join("out"))
        };

        let result = execute_build(
            &sources,
            &FileRegistry::new(),
            &MockGitOperations::new(),
            &MockFetcher::default(),
            &options,
        )
        .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.warnings.len(), 1);
        assert!(result.collisions.is_some());
        assert_eq!(
            fs::read_to_string(temp.path().join("out/readme.md")).unwrap(),
            "blog"
        );
    }

    #[test]
    fn test_missing_source_is_recorded_and_build_continues() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/a.md", "a");
        let sources = vec![local(temp.path(), "absent", 1), local(temp.path(), "docs", 2)];

        let result = execute_build(
            &sources,
            &FileRegistry::new(),
            &MockGitOperations::new(),
            &MockFetcher::default(),
            &BuildOptions::new(temp.path().join("out")),
        )
        .unwrap();

        assert!(!result.success);
        assert_eq!(result.errors.len(), 1);
        assert!(result.errors[0].starts_with("absent:"));
        assert_eq!(result.files_copied, 1);
    }

    #[test]
    fn test_web_source_and_inactive_source() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/a.md", "a");
        let mut inactive = local(temp.path(), "docs", 1);
        inactive.options.active = false;
        let web = Source {
            name: "changelog".to_string(),
            order: 2,
            kind: SourceKind::Web(WebSource {
                url: "https://example.com/CHANGELOG.md".to_string(),
                download_root: temp.path().join("ws/web/changelog"),
            }),
            options: SourceOptions::default(),
        };
        let fetcher = MockFetcher::default().with("https://example.com/CHANGELOG.md", "# v1");

        let result = execute_build(
            &[inactive, web],
            &FileRegistry::new(),
            &MockGitOperations::new(),
            &fetcher,
            &BuildOptions::new(temp.path().join("out")),
        )
        .unwrap();

        assert!(result.success);
        assert_eq!(result.files_copied, 1);
        assert!(temp.path().join("out/CHANGELOG.md").is_file());
        assert!(!temp.path().join("out/a.md").exists());
    }

    #[test]
    fn test_source_requesting_nothing_contributes_nothing() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/a.md", "a");
        let options = SourceOptions {
            exclude_by_default: true,
            ..SourceOptions::default()
        };
        let empty_git = Source {
            name: "handbook".to_string(),
            order: 1,
            kind: SourceKind::Git(GitSource {
                url: "https://example.com/handbook.git".to_string(),
                working_path: temp.path().join("ws/git/handbook"),
                branch: "main".to_string(),
            }),
            options,
        };
        let git = MockGitOperations::new();

        let result = execute_build(
            &[empty_git, local(temp.path(), "docs", 2)],
            &FileRegistry::new(),
            &git,
            &MockFetcher::default(),
            &BuildOptions::new(temp.path().join("out")),
        )
        .unwrap();

        assert!(result.success, "{:?}", result.errors);
        assert_eq!(result.files_copied, 1);
        assert!(git.calls().is_empty());
    }

    #[test]
    fn test_registry_is_cleared_between_builds() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/a.md", "a");
        let registry = FileRegistry::new();
        registry.register("a.md", "a.md", "stale").unwrap();

        let result = execute_build(
            &[local(temp.path(), "docs", 1)],
            &registry,
            &MockGitOperations::new(),
            &MockFetcher::default(),
            &BuildOptions::new(temp.path().join("out")),
        )
        .unwrap();

        assert!(result.success);
        assert!(result.collisions.is_none());
        assert_eq!(registry.get("a.md").unwrap()[0].owning_source, "docs");
    }

    #[test]
    fn test_cancelled_build() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "docs/a.md", "a");
        let cancel = CancelToken::new();
        cancel.cancel();
        let options = BuildOptions {
            cancel,
            ..BuildOptions::new(temp.path().join("out"))
        };

        let result = execute_build(
            &[local(temp.path(), "docs", 1)],
            &FileRegistry::new(),
            &MockGitOperations::new(),
            &MockFetcher::default(),
            &options,
        )
        .unwrap();
        assert!(!result.success);
        assert_eq!(result.errors, vec!["Operation cancelled".to_string()]);
        assert!(!temp.path().join("out/a.md").exists());
    }
}
