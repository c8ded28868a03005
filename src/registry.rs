//! File mapping registry and collision detection
//!
//! One [`FileRegistry`] exists per build. Every file the copy engine decides
//! to materialize is registered under its destination path; after all
//! sources have been processed, [`FileRegistry::collisions`] reports every
//! destination that more than one source contributed to, listing all of
//! the contributors.
//!
//! The registry is the only state shared between sources, so it sits
//! behind a mutex and can be handed to parallel workers by reference.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;

use crate::error::{Error, Result};

/// One source file destined for one destination path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMapping {
    /// Path relative to the owning source's materialized root
    #[serde(rename = "sourcePath")]
    pub source_path: String,
    /// Path relative to the destination tree
    #[serde(skip)]
    pub destination_path: String,
    /// Name of the source that produced the file
    #[serde(rename = "sourceName")]
    pub owning_source: String,
}

/// Destination path → every mapping that targets it.
pub type CollisionMap = BTreeMap<String, Vec<FileMapping>>;

/// Registry of destination paths for a single build.
#[derive(Debug, Clone, Default)]
pub struct FileRegistry {
    mappings: Arc<Mutex<BTreeMap<String, Vec<FileMapping>>>>,
}

impl FileRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, BTreeMap<String, Vec<FileMapping>>>> {
        self.mappings.lock().map_err(|_| Error::Validation {
            message: "file registry lock poisoned".to_string(),
        })
    }

    /// Record that `owning_source` maps `source_path` to `destination_path`.
    ///
    /// Registering the exact same mapping twice keeps a single entry.
    pub fn register(
        &self,
        source_path: &str,
        destination_path: &str,
        owning_source: &str,
    ) -> Result<()> {
        let mapping = FileMapping {
            source_path: source_path.to_string(),
            destination_path: destination_path.to_string(),
            owning_source: owning_source.to_string(),
        };
        let mut mappings = self.lock()?;
        let entries = mappings.entry(destination_path.to_string()).or_default();
        if !entries.contains(&mapping) {
            entries.push(mapping);
        }
        Ok(())
    }

    /// Forget every mapping. Called at the start of each build.
    pub fn clear(&self) -> Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Mappings registered for one destination, in registration order.
    pub fn get(&self, destination_path: &str) -> Result<Vec<FileMapping>> {
        Ok(self
            .lock()?
            .get(destination_path)
            .cloned()
            .unwrap_or_default())
    }

    /// Whether a source other than `source` already registered `destination_path`.
    pub fn claimed_by_other(&self, destination_path: &str, source: &str) -> Result<bool> {
        Ok(self
            .lock()?
            .get(destination_path)
            .is_some_and(|entries| entries.iter().any(|m| m.owning_source != source)))
    }

    /// Every destination that two or more distinct sources contributed to.
    ///
    /// Several files of one source remapped onto the same destination are
    /// not a collision; the source's own walk order decides the content.
    pub fn collisions(&self) -> Result<CollisionMap> {
        Ok(self
            .lock()?
            .iter()
            .filter(|(_, entries)| {
                let owners: BTreeSet<&str> =
                    entries.iter().map(|m| m.owning_source.as_str()).collect();
                owners.len() > 1
            })
            .map(|(dest, entries)| (dest.clone(), entries.clone()))
            .collect())
    }

    /// Number of distinct destination paths.
    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.lock()?.is_empty())
    }
}
