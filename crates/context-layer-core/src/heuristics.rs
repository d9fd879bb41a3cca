//! System candidate scoring
//!
//! Decides whether a directory is a cohesive unit worth its own
//! documentation file. Scoring is additive over independent signals; the
//! presentation and data-only checks both penalize the score and record a
//! skip reason, and any skip reason blocks capture regardless of score.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::debug;

use context_layer_config::HeuristicsConfig;

use crate::paths;

/// A scored directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemCandidate {
    /// Directory relative to the project root
    pub path: String,
    pub score: i32,
    /// Signals that contributed to the score, in evaluation order
    pub reasons: Vec<String>,
    /// Conditions that block capture, in evaluation order
    pub skip_reasons: Vec<String>,
    /// Qualifying source files directly inside the directory
    pub file_count: usize,
    pub should_capture: bool,
}

/// Scores directories under one project root.
#[derive(Debug, Clone)]
pub struct SystemScorer {
    root: PathBuf,
    config: HeuristicsConfig,
}

impl SystemScorer {
    pub fn new(root: impl Into<PathBuf>, config: HeuristicsConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &HeuristicsConfig {
        &self.config
    }

    /// Whether any segment of `rel_dir` is an infrastructure directory.
    pub fn is_skipped(&self, rel_dir: &str) -> bool {
        rel_dir
            .split('/')
            .any(|seg| self.config.skip_dirs.iter().any(|s| s == seg))
    }

    /// Evaluate `rel_dir` (relative to the root).
    ///
    /// Returns `None` for skip-listed paths (without touching the
    /// filesystem), unreadable directories, and directories with too few
    /// qualifying source files.
    pub fn evaluate(&self, rel_dir: &str) -> Option<SystemCandidate> {
        if self.is_skipped(rel_dir) {
            debug!("Skipping infrastructure directory {:?}", rel_dir);
            return None;
        }

        let dir = paths::resolve(&self.root, rel_dir);
        let entries = match std::fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                debug!("Cannot read {:?}: {}", dir, e);
                return None;
            }
        };

        let mut files: Vec<String> = entries
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
            .map(|entry| entry.file_name().to_string_lossy().into_owned())
            .collect();
        files.sort();

        self.score_files(rel_dir, &files)
    }

    /// Score a directory from the names of the files directly inside it.
    pub fn score_files(&self, rel_dir: &str, file_names: &[String]) -> Option<SystemCandidate> {
        if self.is_skipped(rel_dir) {
            return None;
        }

        let sources: Vec<&str> = file_names
            .iter()
            .map(String::as_str)
            .filter(|name| self.is_source_file(name))
            .collect();
        if sources.len() < self.config.min_source_files {
            return None;
        }

        let c = &self.config;
        let dir_name = paths::file_name(rel_dir).to_lowercase();
        let mut score = 0;
        let mut reasons = Vec::new();
        let mut skip_reasons = Vec::new();

        if contains(&c.presentation_dirs, &dir_name) {
            score -= c.presentation_penalty;
            skip_reasons.push(format!("presentation-only directory ({dir_name})"));
        }
        if contains(&c.data_only_dirs, &dir_name) {
            score -= c.data_only_penalty;
            skip_reasons.push(format!("data-only directory ({dir_name})"));
        }

        if contains(&c.canonical_dirs, &dir_name) {
            score += c.canonical_dir_bonus;
            reasons.push(format!("canonical system name ({dir_name})"));
        }

        let pattern_files = sources
            .iter()
            .filter(|name| self.has_architectural_role(name))
            .count();
        if pattern_files >= 2 {
            score += c.multi_pattern_bonus;
            reasons.push(format!("{pattern_files} architectural-role files"));
        } else if pattern_files == 1 {
            score += c.single_pattern_bonus;
            reasons.push("1 architectural-role file".to_string());
        }

        if sources.len() >= c.large_dir_files {
            score += c.large_dir_bonus;
            reasons.push(format!("{}+ source files", c.large_dir_files));
        } else if sources.len() >= c.medium_dir_files {
            score += c.medium_dir_bonus;
            reasons.push(format!("{}+ source files", c.medium_dir_files));
        }

        if let Some(entry) = sources.iter().find(|name| c.entry_points.iter().any(|e| e == *name)) {
            score += c.entry_point_bonus;
            reasons.push(format!("entry point ({entry})"));
        }

        let should_capture = score >= c.capture_threshold && skip_reasons.is_empty();

        Some(SystemCandidate {
            path: rel_dir.to_string(),
            score,
            reasons,
            skip_reasons,
            file_count: sources.len(),
            should_capture,
        })
    }

    fn is_source_file(&self, name: &str) -> bool {
        let Some((_, ext)) = name.rsplit_once('.') else {
            return false;
        };
        self.config.source_extensions.iter().any(|e| e == ext)
            && !self
                .config
                .file_exclude_patterns
                .iter()
                .any(|p| name.contains(p.as_str()))
    }

    /// Whether any word of the file stem names a role: `userService.ts`,
    /// `user.service.ts` and `user_handlers.py` match; `restore.ts` does not.
    fn has_architectural_role(&self, name: &str) -> bool {
        let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
        stem_words(stem).iter().any(|word| {
            self.config.architectural_patterns.iter().any(|p| {
                word.eq_ignore_ascii_case(p)
                    || word
                        .strip_suffix('s')
                        .is_some_and(|singular| singular.eq_ignore_ascii_case(p))
            })
        })
    }
}

/// Split a file stem into words at separators, digits and case changes.
///
/// `HTTPClient` yields `["HTTP", "Client"]`; `user.service` yields
/// `["user", "service"]`.
fn stem_words(stem: &str) -> Vec<&str> {
    let chars: Vec<(usize, char)> = stem.char_indices().collect();
    let mut words = Vec::new();
    let mut start: Option<usize> = None;

    for (i, &(pos, c)) in chars.iter().enumerate() {
        if !c.is_alphabetic() {
            if let Some(s) = start.take() {
                words.push(&stem[s..pos]);
            }
            continue;
        }
        if let Some(s) = start {
            let prev = chars[i - 1].1;
            let next_lower = chars.get(i + 1).is_some_and(|&(_, n)| n.is_lowercase());
            let boundary = c.is_uppercase()
                && (prev.is_lowercase() || (prev.is_uppercase() && next_lower));
            if boundary {
                words.push(&stem[s..pos]);
                start = Some(pos);
            }
        } else {
            start = Some(pos);
        }
    }
    if let Some(s) = start {
        words.push(&stem[s..]);
    }
    words
}

fn contains(list: &[String], name: &str) -> bool {
    list.iter().any(|item| item.eq_ignore_ascii_case(name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn scorer() -> SystemScorer {
        SystemScorer::new("/unused", HeuristicsConfig::default())
    }

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_skip_list_matches_exact_segments() {
        let s = scorer();
        assert!(s.is_skipped("node_modules/pkg"));
        assert!(s.is_skipped("web/dist"));
        assert!(!s.is_skipped("web/distribution"));
        assert!(s.score_files("a/build", &names(&["a.ts", "b.ts", "c.ts"])).is_none());
    }

    #[test]
    fn test_too_few_source_files() {
        let files = names(&["a.ts", "b.ts", "a.test.ts", "README.md", "mock.ts"]);
        assert!(scorer().score_files("src/thing", &files).is_none());
    }

    #[test]
    fn test_canonical_directory_with_roles() {
        let files = names(&[
            "index.ts",
            "userService.ts",
            "authController.ts",
            "helpers.ts",
            "format.ts",
        ]);
        let candidate = scorer().score_files("src/api", &files).unwrap();

        // canonical +5, roles +4, medium tier +1, entry point +2
        assert_eq!(candidate.score, 12);
        assert_eq!(candidate.file_count, 5);
        assert!(candidate.should_capture);
        assert!(candidate.skip_reasons.is_empty());
        assert_eq!(candidate.reasons.len(), 4);
    }

    #[test]
    fn test_below_threshold_not_captured() {
        let files = names(&["a.ts", "b.ts", "c.ts"]);
        let candidate = scorer().score_files("src/misc", &files).unwrap();
        assert_eq!(candidate.score, 0);
        assert!(!candidate.should_capture);
    }

    #[test]
    fn test_presentation_never_captured() {
        let files: Vec<String> = (0..10)
            .map(|i| format!("themeManager{i}.ts"))
            .chain(["index.ts".to_string()])
            .collect();
        let candidate = scorer().score_files("ui/styles", &files).unwrap();

        assert_eq!(candidate.file_count, 11);
        assert!(!candidate.should_capture);

        // Clearing the penalty still leaves the skip reason in force.
        let mut config = HeuristicsConfig::default();
        config.presentation_penalty = 0;
        let lenient = SystemScorer::new("/unused", config)
            .score_files("ui/styles", &files)
            .unwrap();
        assert!(lenient.score >= 4);
        assert!(!lenient.should_capture);
        assert_eq!(candidate.skip_reasons, vec!["presentation-only directory (styles)"]);
    }

    #[test]
    fn test_data_only_penalty() {
        let files = names(&["user.ts", "order.ts", "item.ts"]);
        let candidate = scorer().score_files("src/models", &files).unwrap();
        assert_eq!(candidate.score, -3);
        assert!(!candidate.should_capture);
    }

    #[test]
    fn test_adding_role_file_never_decreases_score() {
        let s = scorer();
        let mut files = names(&["a.ts", "b.ts", "c.ts"]);
        let mut previous = s.score_files("src/feature", &files).unwrap().score;
        for i in 0..8 {
            files.push(format!("feature{i}Store.ts"));
            let score = s.score_files("src/feature", &files).unwrap().score;
            assert!(score >= previous, "score dropped from {previous} to {score}");
            previous = score;
        }
    }

    #[test]
    fn test_single_role_file() {
        let files = names(&["sessionManager.py", "util.py", "db.py"]);
        let candidate = scorer().score_files("app/session", &files).unwrap();
        assert_eq!(candidate.score, 2);
        assert_eq!(candidate.reasons, vec!["1 architectural-role file"]);
    }

    #[test]
    fn test_role_matches_whole_words() {
        let s = scorer();
        assert!(s.has_architectural_role("userService.ts"));
        assert!(s.has_architectural_role("user.service.ts"));
        assert!(s.has_architectural_role("user_handlers.py"));
        assert!(s.has_architectural_role("HTTPClient.swift"));
        assert!(s.has_architectural_role("store.ts"));
        assert!(!s.has_architectural_role("restore.ts"));
        assert!(!s.has_architectural_role("enginery.rs"));

        let files = names(&["restore.ts", "user.service.ts", "db.ts"]);
        let candidate = s.score_files("app/session", &files).unwrap();
        assert_eq!(candidate.reasons, vec!["1 architectural-role file"]);
    }

    #[test]
    fn test_stem_words() {
        assert_eq!(stem_words("HTTPClient"), vec!["HTTP", "Client"]);
        assert_eq!(stem_words("user.service"), vec!["user", "service"]);
        assert_eq!(stem_words("themeManager0"), vec!["theme", "Manager"]);
        assert_eq!(stem_words("__init__"), vec!["init"]);
        assert!(stem_words("42").is_empty());
    }

    #[test]
    fn test_evaluate_reads_directory() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("src/engine");
        std::fs::create_dir_all(dir.join("nested")).unwrap();
        for name in ["mod.rs", "planner.rs", "executor.rs", "nested.rs"] {
            std::fs::write(dir.join(name), "").unwrap();
        }
        std::fs::write(dir.join("nested/deep.rs"), "").unwrap();

        let s = SystemScorer::new(temp.path(), HeuristicsConfig::default());
        let candidate = s.evaluate("src/engine").unwrap();

        assert_eq!(candidate.path, "src/engine");
        assert_eq!(candidate.file_count, 4);
        assert!(candidate.should_capture);
        assert!(s.evaluate("src/missing").is_none());
    }

    #[test]
    fn test_candidate_serializes_camel_case() {
        let files = names(&["a.ts", "b.ts", "c.ts"]);
        let candidate = scorer().score_files("x", &files).unwrap();
        let json = serde_json::to_value(&candidate).unwrap();
        assert_eq!(json["fileCount"], 3);
        assert_eq!(json["shouldCapture"], false);
        assert!(json["skipReasons"].is_array());
    }
}
