//! # Aggregit Library
//!
//! This library aggregates content from git repositories, remote files and
//! local directories into a single destination tree. It is designed to be
//! used by the `aggregit` command-line tool but can also be embedded by
//! static-site generators and documentation assemblers.
//!
//! ## Quick Example
//!
//! ```
//! use aggregit::path::{remap, should_include};
//! use aggregit::source::Remapping;
//! use aggregit::sparse::compose_rules;
//!
//! let include = vec!["docs/**".to_string()];
//! let exclude = vec!["*.psd".to_string()];
//!
//! assert!(should_include("docs/guide/intro.md", &include, &exclude, true));
//! assert!(!should_include("docs/logo.psd", &include, &exclude, true));
//! assert!(!should_include("src/main.rs", &include, &exclude, true));
//!
//! // the same lists drive the sparse checkout of a git source
//! assert_eq!(compose_rules(&include, &exclude, true), vec!["docs/**", "!*.psd"]);
//!
//! let rules = vec![Remapping::new("docs/", "handbook/")];
//! assert_eq!(remap("docs/guide/intro.md", &rules), "handbook/guide/intro.md");
//! ```
//!
//! ## Core Concepts
//!
//! - **Sources (`source`, `config`)**: the `git`, `web` and `local` units of
//!   content, resolved once from `aggregit.yaml` and immutable afterwards.
//! - **Matching (`path`)**: include/exclude patterns and path remapping.
//! - **Working copies (`git`, `repository`, `sparse`, `status`)**: a
//!   mockable `GitOperations` seam, sparse-checkout reconciliation and sync
//!   state classification.
//! - **Repository operations (`operations`)**: checkout, pull, push,
//!   commit and their compositions across all git sources.
//! - **Builds (`phases`, `registry`, `web`)**: materializing sources and
//!   copying them into the destination while tracking collisions.
//! - **Readiness (`verify`)**: read-only checks that gate a build.
//!
//! ## Execution Flow
//!
//! 1.  **Prepare**: check out git sources and bring them in sync with their
//!     remotes (`operations`).
//! 2.  **Verify**: optionally refuse to build while a source is not ready
//!     (`verify`).
//! 3.  **Build**: walk every active source in `order`, filter, remap and
//!     write its files, then report destinations produced by more than one
//!     source (`phases::orchestrator`).

pub mod cancel;
pub mod config;
pub mod defaults;
pub mod error;
pub mod git;
pub mod operations;
pub mod output;
pub mod path;
pub mod phases;
pub mod registry;
pub mod repository;
pub mod source;
pub mod sparse;
pub mod status;
pub mod suggestions;
pub mod verify;
pub mod web;

#[cfg(test)]
mod path_proptest;
