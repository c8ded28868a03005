//! The build pipeline.
//!
//! ## Overview
//!
//! A build turns every active source into files under one destination
//! tree. It runs in three phases:
//! 1. Materialization - Make each source's files available on disk
//!    (download web sources; git and local sources already are)
//! 2. Copy - Walk each source in `order`, filter and remap its paths,
//!    register every mapping and write files per the update strategy
//! 3. Collision check - Once all sources are done, report every
//!    destination path that more than one source produced
//!
//! Per-file and per-source failures are collected into the
//! [`BuildResult`]; only an unusable destination or a poisoned registry
//! abort the build with an error.

use std::path::PathBuf;

use serde::Serialize;

use crate::cancel::CancelToken;
use crate::registry::CollisionMap;

pub mod copy;
pub mod materialize;
pub mod orchestrator;

pub use copy as phase2;
pub use materialize as phase1;
pub use orchestrator::execute_build;

/// Everything the presentation layer needs to know about a build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BuildResult {
    /// Files written to a destination that did not exist
    pub files_copied: usize,
    /// Existing destination files rewritten by the same source
    pub files_updated: usize,
    /// Existing destination files left alone by the update strategy
    pub files_skipped: usize,
    /// Destination files rewritten after another source produced them
    pub files_overwritten: usize,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub collisions: Option<CollisionMap>,
    pub success: bool,
}

impl BuildResult {
    pub fn files_written(&self) -> usize {
        self.files_copied + self.files_updated + self.files_overwritten
    }
}

/// Settings for one build.
#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub destination: PathBuf,
    /// Fail the build when two sources produce the same destination path
    pub enforce_collisions: bool,
    pub cancel: CancelToken,
}

impl BuildOptions {
    pub fn new(destination: impl Into<PathBuf>) -> Self {
        Self {
            destination: destination.into(),
            enforce_collisions: true,
            cancel: CancelToken::new(),
        }
    }
}
