//! Change severity analysis
//!
//! Classifies a diff into `none`, `minor` or `major` and derives the
//! documentation-bearing directories it touches.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use context_layer_config::ChangeThresholds;

use crate::git::ChangeSet;
use crate::paths;

/// Severity of a diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    None,
    Minor,
    Major,
}

impl ChangeType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ChangeType::None => "none",
            ChangeType::Minor => "minor",
            ChangeType::Major => "major",
        }
    }
}

impl std::fmt::Display for ChangeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of analyzing one diff. Derived fresh each run, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeAnalysis {
    #[serde(rename = "type")]
    pub change_type: ChangeType,
    /// Every ancestor directory of every changed file (root excluded)
    pub affected_systems: BTreeSet<String>,
    /// Directories whose documentation-root file was deleted, in diff order
    pub deleted_systems: Vec<String>,
    pub changed_files: Vec<String>,
    pub added_files: Vec<String>,
    pub deleted_files: Vec<String>,
}

impl ChangeAnalysis {
    pub fn is_major(&self) -> bool {
        self.change_type == ChangeType::Major
    }
}

/// Classify a diff.
///
/// `changed_files` is the name-only list, `changes` the status-tagged one.
/// A deleted documentation-root file at the project root is reported as
/// system `"."`.
pub fn analyze_changes(
    changed_files: &[String],
    changes: &ChangeSet,
    thresholds: &ChangeThresholds,
    root_file: &str,
) -> ChangeAnalysis {
    let affected_systems: BTreeSet<String> = changed_files
        .iter()
        .flat_map(|f| paths::ancestors(f))
        .map(str::to_string)
        .collect();

    let mut deleted_systems: Vec<String> = Vec::new();
    for file in &changes.deleted {
        if paths::file_name(file) != root_file {
            continue;
        }
        let system = paths::parent(file).unwrap_or(".").to_string();
        if !deleted_systems.contains(&system) {
            deleted_systems.push(system);
        }
    }

    let change_type = if changed_files.is_empty() {
        ChangeType::None
    } else if changes.added.len() > thresholds.max_added
        || changes.deleted.len() > thresholds.max_deleted
        || changed_files.len() > thresholds.max_changed
        || !deleted_systems.is_empty()
    {
        ChangeType::Major
    } else {
        ChangeType::Minor
    };

    ChangeAnalysis {
        change_type,
        affected_systems,
        deleted_systems,
        changed_files: changed_files.to_vec(),
        added_files: changes.added.clone(),
        deleted_files: changes.deleted.clone(),
    }
}
