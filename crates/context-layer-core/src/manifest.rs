//! Manifest store
//!
//! The manifest is the only persisted state: documented systems, the pending
//! candidate queue, the directory hierarchy between systems, and derived
//! coverage. It is read in full, mutated in memory and rewritten in full.
//! There is no locking; concurrent writers race and the last one wins.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::paths;

/// Schema version written into new manifests.
pub const MANIFEST_VERSION: &str = "1.0";

/// Errors from manifest persistence.
#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("Manifest I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed manifest {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize manifest: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("No manifest at {0}; initialize the project first")]
    NotInitialized(PathBuf),
}

pub type Result<T> = std::result::Result<T, ManifestError>;

/// Lifecycle of a documented system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SystemStatus {
    /// Documentation reflects the current source
    Active,
    /// Source changed since the codemap was last refreshed
    Stale,
    /// The documentation-root file was deleted
    PendingDeletion,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemEntry {
    pub agents_md_path: String,
    pub status: SystemStatus,
    pub file_count: usize,
    pub codemap_updated: Option<DateTime<Utc>>,
    pub curator_updated: Option<DateTime<Utc>>,
    pub tokens: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSystem {
    pub path: String,
    pub detected_at: DateTime<Utc>,
    pub reason: String,
    pub score: i32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coverage {
    pub total_directories: usize,
    /// Always `systems.len()`; recomputed, never set by hand
    pub documented_systems: usize,
    pub percentage: u32,
}

impl Coverage {
    /// `round(100 * documented / total)`, or 0 when `total` is 0.
    pub fn percentage_of(documented: usize, total: usize) -> u32 {
        if total == 0 {
            return 0;
        }
        let rounded = (200 * documented + total) / (2 * total);
        u32::try_from(rounded).unwrap_or(u32::MAX)
    }
}

/// Bookkeeping for an external deduplication pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Synthesis {
    pub last_run: Option<DateTime<Utc>>,
    pub facts_deduped: u64,
    pub parent_nodes_created: u64,
}

/// Persisted coverage state. Field order is the on-disk key order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Manifest {
    pub version: String,
    pub repo: String,
    pub created: DateTime<Utc>,
    pub last_full_build: Option<DateTime<Utc>>,
    pub last_synthesis: Option<DateTime<Utc>>,
    pub coverage: Coverage,
    pub systems: BTreeMap<String, SystemEntry>,
    pub pending: Vec<PendingSystem>,
    pub hierarchy: BTreeMap<String, Vec<String>>,
    pub synthesis: Synthesis,
}

impl Manifest {
    /// Empty manifest for the project at `repo`.
    pub fn new(repo: impl Into<String>) -> Self {
        Self {
            version: MANIFEST_VERSION.to_string(),
            repo: repo.into(),
            created: Utc::now(),
            last_full_build: None,
            last_synthesis: None,
            coverage: Coverage::default(),
            systems: BTreeMap::new(),
            pending: Vec::new(),
            hierarchy: BTreeMap::new(),
            synthesis: Synthesis::default(),
        }
    }

    /// Recompute `documentedSystems` and `percentage`.
    pub fn recompute_coverage(&mut self) {
        self.coverage.documented_systems = self.systems.len();
        self.coverage.percentage =
            Coverage::percentage_of(self.coverage.documented_systems, self.coverage.total_directories);
    }

    pub fn set_total_directories(&mut self, total: usize) {
        self.coverage.total_directories = total;
        self.recompute_coverage();
    }

    /// Register (or re-register) a documented system as active.
    pub fn add_system(&mut self, path: &str, agents_md_path: &str, file_count: usize) {
        let now = Utc::now();
        self.systems.insert(
            path.to_string(),
            SystemEntry {
                agents_md_path: agents_md_path.to_string(),
                status: SystemStatus::Active,
                file_count,
                codemap_updated: Some(now),
                curator_updated: Some(now),
                tokens: 0,
            },
        );
        self.recompute_coverage();
    }

    pub fn remove_system(&mut self, path: &str) -> Option<SystemEntry> {
        let removed = self.systems.remove(path);
        self.recompute_coverage();
        removed
    }

    /// Queue a candidate. Returns `false` when `path` is already pending.
    pub fn add_pending(&mut self, path: &str, reason: &str, score: i32) -> bool {
        if self.is_pending(path) {
            return false;
        }
        self.pending.push(PendingSystem {
            path: path.to_string(),
            detected_at: Utc::now(),
            reason: reason.to_string(),
            score,
        });
        true
    }

    /// Returns `true` when an entry was removed.
    pub fn remove_pending(&mut self, path: &str) -> bool {
        let before = self.pending.len();
        self.pending.retain(|p| p.path != path);
        self.pending.len() != before
    }

    pub fn is_pending(&self, path: &str) -> bool {
        self.pending.iter().any(|p| p.path == path)
    }

    /// Rebuild `hierarchy` from directory containment: each system's parent
    /// is its nearest ancestor that is also a system.
    pub fn rebuild_hierarchy(&mut self) {
        let mut hierarchy: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for path in self.systems.keys() {
            let parent = paths::ancestors(path)
                .into_iter()
                .find(|dir| self.systems.contains_key(*dir));
            if let Some(parent) = parent {
                hierarchy
                    .entry(parent.to_string())
                    .or_default()
                    .push(path.clone());
            }
        }
        self.hierarchy = hierarchy;
    }

    /// Mark tracked systems among `paths` as stale. Returns how many changed.
    pub fn mark_stale<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) -> usize {
        self.set_status(paths, SystemStatus::Stale, |s| s == SystemStatus::Active)
    }

    /// Mark tracked systems among `paths` as pending deletion.
    pub fn mark_pending_deletion<'a>(&mut self, paths: impl IntoIterator<Item = &'a str>) -> usize {
        self.set_status(paths, SystemStatus::PendingDeletion, |s| {
            s != SystemStatus::PendingDeletion
        })
    }

    fn set_status<'a>(
        &mut self,
        paths: impl IntoIterator<Item = &'a str>,
        status: SystemStatus,
        applies: impl Fn(SystemStatus) -> bool,
    ) -> usize {
        let mut changed = 0;
        for path in paths {
            if let Some(entry) = self.systems.get_mut(path) {
                if applies(entry.status) {
                    entry.status = status;
                    changed += 1;
                }
            }
        }
        changed
    }

    /// Record a codemap refresh for a tracked system. Returns `false` when
    /// the path is not tracked.
    pub fn record_refresh(&mut self, path: &str, tokens: usize) -> bool {
        let Some(entry) = self.systems.get_mut(path) else {
            return false;
        };
        entry.status = SystemStatus::Active;
        entry.codemap_updated = Some(Utc::now());
        entry.tokens = tokens;
        true
    }

    /// Remove every system pending deletion; returns their paths.
    pub fn prune_deleted(&mut self) -> Vec<String> {
        let doomed: Vec<String> = self
            .systems
            .iter()
            .filter(|(_, e)| e.status == SystemStatus::PendingDeletion)
            .map(|(p, _)| p.clone())
            .collect();
        for path in &doomed {
            self.systems.remove(path);
        }
        if !doomed.is_empty() {
            self.rebuild_hierarchy();
        }
        self.recompute_coverage();
        doomed
    }

    pub fn stale_systems(&self) -> Vec<&str> {
        self.systems
            .iter()
            .filter(|(_, e)| e.status == SystemStatus::Stale)
            .map(|(p, _)| p.as_str())
            .collect()
    }
}

/// Reads and writes the manifest file.
#[derive(Debug, Clone)]
pub struct ManifestStore {
    path: PathBuf,
}

impl ManifestStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.is_file()
    }

    /// Load the manifest; `None` when the file does not exist.
    ///
    /// Unparsable content is an error, never replaced by a fresh manifest.
    pub fn load(&self) -> Result<Option<Manifest>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("No manifest at {:?}", self.path);
                return Ok(None);
            }
            Err(source) => {
                return Err(ManifestError::Io {
                    path: self.path.clone(),
                    source,
                })
            }
        };

        let manifest: Manifest =
            serde_json::from_reader(BufReader::new(file)).map_err(|source| ManifestError::Parse {
                path: self.path.clone(),
                source,
            })?;
        debug!(
            "Loaded manifest with {} system(s) from {:?}",
            manifest.systems.len(),
            self.path
        );
        Ok(Some(manifest))
    }

    /// Load the manifest, treating absence as an error.
    pub fn load_required(&self) -> Result<Manifest> {
        self.load()?
            .ok_or_else(|| ManifestError::NotInitialized(self.path.clone()))
    }

    /// Recompute coverage and rewrite the whole file.
    pub fn save(&self, manifest: &mut Manifest) -> Result<()> {
        manifest.recompute_coverage();

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| self.io_error(source))?;
        }
        let file = File::create(&self.path).map_err(|source| self.io_error(source))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, manifest)?;
        writer.flush().map_err(|source| self.io_error(source))?;

        info!(
            "Saved manifest ({} system(s), {}% coverage) to {:?}",
            manifest.systems.len(),
            manifest.coverage.percentage,
            self.path
        );
        Ok(())
    }

    /// Write a fresh, empty manifest for `repo`.
    pub fn create(&self, repo: impl Into<String>) -> Result<Manifest> {
        let mut manifest = Manifest::new(repo);
        self.save(&mut manifest)?;
        Ok(manifest)
    }

    /// Load, apply `mutate`, save, and return the saved manifest.
    pub fn update<F>(&self, mutate: F) -> Result<Manifest>
    where
        F: FnOnce(&mut Manifest),
    {
        let mut manifest = self.load_required()?;
        mutate(&mut manifest);
        self.save(&mut manifest)?;
        Ok(manifest)
    }

    fn io_error(&self, source: std::io::Error) -> ManifestError {
        ManifestError::Io {
            path: self.path.clone(),
            source,
        }
    }
}
