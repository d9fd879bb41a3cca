//! System discovery
//!
//! Two entry points share the scorer:
//!
//! - `detect_new_systems` follows the ancestry of changed files, stopping at
//!   directories that already carry a documentation-root file.
//! - `find_all_systems` walks the whole tree to a bounded depth for a
//!   complete inventory and ignores existing documentation.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, info};
use walkdir::{DirEntry, WalkDir};

use crate::heuristics::{SystemCandidate, SystemScorer};
use crate::paths;

/// Finds capturable systems under a project root.
#[derive(Debug, Clone)]
pub struct SystemDiscovery {
    scorer: SystemScorer,
    root_file: String,
    max_depth: usize,
}

impl SystemDiscovery {
    pub fn new(scorer: SystemScorer, root_file: impl Into<String>, max_depth: usize) -> Self {
        Self {
            scorer,
            root_file: root_file.into(),
            max_depth,
        }
    }

    pub fn scorer(&self) -> &SystemScorer {
        &self.scorer
    }

    fn root(&self) -> &Path {
        self.scorer.root()
    }

    fn is_documented(&self, rel_dir: &str) -> bool {
        paths::resolve(self.root(), rel_dir)
            .join(&self.root_file)
            .is_file()
    }

    /// Capturable, undocumented systems touched by `changed_files`.
    ///
    /// Each ancestor directory is evaluated at most once across all files.
    /// Only the deepest candidates survive; output is ranked by score.
    pub fn detect_new_systems(&self, changed_files: &[String]) -> Vec<SystemCandidate> {
        let mut visited: HashSet<&str> = HashSet::new();
        let mut candidates = Vec::new();

        for file in changed_files {
            for dir in paths::ancestors(file) {
                if !visited.insert(dir) {
                    break;
                }
                if self.is_documented(dir) {
                    debug!("{:?} already documented; stopping ancestry walk", dir);
                    break;
                }
                if let Some(candidate) = self.scorer.evaluate(dir) {
                    if candidate.should_capture {
                        candidates.push(candidate);
                    }
                }
            }
        }

        let mut systems = retain_deepest(candidates);
        rank(&mut systems);
        info!(
            "Detected {} new system(s) from {} changed file(s)",
            systems.len(),
            changed_files.len()
        );
        systems
    }

    /// Every capturable directory down to the configured depth.
    ///
    /// Directories are listed down to `max_depth` levels below the root, so
    /// the deepest scored directory sits at `max_depth + 1`. Hidden and
    /// skip-listed directories are not descended into. Nested systems are
    /// all reported.
    pub fn find_all_systems(&self) -> Vec<SystemCandidate> {
        let root = self.root().to_path_buf();
        let mut systems: Vec<SystemCandidate> = WalkDir::new(&root)
            .min_depth(1)
            .max_depth(self.max_depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_descend(e))
            .filter_map(|entry| match entry {
                Ok(e) => Some(e),
                Err(e) => {
                    debug!("Skipping unreadable entry: {}", e);
                    None
                }
            })
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| paths::relative_to(&root, e.path()))
            .filter_map(|rel| self.scorer.evaluate(&rel))
            .filter(|c| c.should_capture)
            .collect();

        rank(&mut systems);
        info!("Full scan found {} system(s) under {:?}", systems.len(), root);
        systems
    }

    /// Directories below the root that already hold a documentation-root
    /// file, sorted. Same traversal bounds as `find_all_systems`.
    pub fn documented_directories(&self) -> Vec<String> {
        let root = self.root().to_path_buf();
        WalkDir::new(&root)
            .min_depth(1)
            .max_depth(self.max_depth + 1)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| self.should_descend(e))
            .filter_map(|entry| entry.ok())
            .filter(|e| e.file_type().is_dir())
            .filter_map(|e| paths::relative_to(&root, e.path()))
            .filter(|rel| self.is_documented(rel))
            .collect()
    }

    fn should_descend(&self, entry: &DirEntry) -> bool {
        if !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        !name.starts_with('.') && !self.scorer.config().skip_dirs.iter().any(|s| *s == name)
    }
}

/// Drop every candidate that is a strict ancestor of another candidate.
///
/// Given `a`, `a/b` and `a/b/c`, only `a/b/c` remains. Input order is
/// preserved among survivors.
pub fn retain_deepest(candidates: Vec<SystemCandidate>) -> Vec<SystemCandidate> {
    let all_paths: Vec<String> = candidates.iter().map(|c| c.path.clone()).collect();
    candidates
        .into_iter()
        .filter(|c| !all_paths.iter().any(|p| paths::is_strict_ancestor(&c.path, p)))
        .collect()
}

/// Score descending, then path ascending.
fn rank(candidates: &mut [SystemCandidate]) {
    candidates.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.path.cmp(&b.path)));
}

#[cfg(test)]
mod tests {
    use super::*;
    use context_layer_config::HeuristicsConfig;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn candidate(path: &str, score: i32) -> SystemCandidate {
        SystemCandidate {
            path: path.to_string(),
            score,
            reasons: Vec::new(),
            skip_reasons: Vec::new(),
            file_count: 3,
            should_capture: true,
        }
    }

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, "").unwrap();
    }

    fn discovery(root: &Path) -> SystemDiscovery {
        SystemDiscovery::new(
            SystemScorer::new(root, HeuristicsConfig::default()),
            "AGENTS.md",
            5,
        )
    }

    /// A capturable directory: canonical name plus an entry point.
    fn system(root: &Path, dir: &str) {
        for name in ["index.ts", "a.ts", "b.ts"] {
            touch(root, &format!("{dir}/{name}"));
        }
    }

    #[test]
    fn test_retain_deepest() {
        let kept = retain_deepest(vec![
            candidate("a", 1),
            candidate("a/b", 1),
            candidate("a/b/c", 1),
        ]);
        assert_eq!(kept, vec![candidate("a/b/c", 1)]);
    }

    #[test]
    fn test_retain_deepest_ignores_name_prefixes() {
        let kept = retain_deepest(vec![candidate("api", 1), candidate("api-v2", 1)]);
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_rank_ties_by_path() {
        let mut list = vec![candidate("z", 5), candidate("a", 5), candidate("m", 9)];
        rank(&mut list);
        let order: Vec<_> = list.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(order, vec!["m", "a", "z"]);
    }

    #[test]
    fn test_detect_keeps_deepest_capturable() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "src/api");
        system(root, "src/api/auth");

        let found = discovery(root).detect_new_systems(&["src/api/auth/a.ts".to_string()]);

        let found_paths: Vec<_> = found.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(found_paths, vec!["src/api/auth"]);
    }

    #[test]
    fn test_detect_stops_at_documented_ancestor() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "src/core");
        touch(root, "src/core/engine/AGENTS.md");
        system(root, "src/core/engine");

        let found = discovery(root).detect_new_systems(&["src/core/engine/a.ts".to_string()]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_detect_ignores_skip_listed_paths() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "node_modules/api");

        let found = discovery(root).detect_new_systems(&["node_modules/api/a.ts".to_string()]);
        assert!(found.is_empty());
    }

    #[test]
    fn test_find_all_reports_nested_and_documented() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "src/api");
        system(root, "src/api/auth");
        system(root, "server");
        touch(root, "server/AGENTS.md");
        system(root, ".hidden/core");
        system(root, "dist/core");
        touch(root, "src/misc/one.ts");

        let found = discovery(root).find_all_systems();
        let mut found_paths: Vec<_> = found.iter().map(|c| c.path.as_str()).collect();
        found_paths.sort();

        assert_eq!(found_paths, vec!["server", "src/api", "src/api/auth"]);
    }

    #[test]
    fn test_documented_directories() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        touch(root, "AGENTS.md");
        touch(root, "src/AGENTS.md");
        touch(root, "src/api/AGENTS.md");
        touch(root, "node_modules/pkg/AGENTS.md");
        touch(root, "lib/readme.md");

        assert_eq!(discovery(root).documented_directories(), vec!["src", "src/api"]);
    }

    #[test]
    fn test_find_all_respects_depth() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "a/b/c/api");

        let shallow = SystemDiscovery::new(
            SystemScorer::new(root, HeuristicsConfig::default()),
            "AGENTS.md",
            2,
        );
        assert!(shallow.find_all_systems().is_empty());
        assert_eq!(discovery(root).find_all_systems().len(), 1);
    }

    #[test]
    fn test_find_all_scores_one_level_below_depth() {
        let temp = TempDir::new().unwrap();
        let root = temp.path();
        system(root, "a/b/c/d/e/api");
        system(root, "z/y/x/w/v/u/api");
        touch(root, "a/b/c/d/e/AGENTS.md");
        touch(root, "z/y/x/w/v/u/api/AGENTS.md");

        let d = discovery(root);
        let found: Vec<_> = d.find_all_systems().into_iter().map(|c| c.path).collect();
        assert_eq!(found, vec!["a/b/c/d/e/api"]);
        assert_eq!(d.documented_directories(), vec!["a/b/c/d/e"]);
    }
}
