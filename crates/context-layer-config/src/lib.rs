//! Context Layer Configuration Management
//!
//! Provides configuration loading with support for:
//! - Global config: `~/.context-layer/config.toml`
//! - Local config: `.context-layer/config.toml` (in the project root)
//! - Programmatic overrides via `ConfigOverrides`
//!
//! Configuration is merged in order: global → local → overrides.
//!
//! Every scoring weight and change threshold used by the core lives here so
//! that the policy can be tuned per repository without code changes.

mod error;
mod loader;
mod logging;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use logging::init_logging;

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Root configuration for Context Layer.
///
/// Represents the fully merged configuration from all sources.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct LayerConfig {
    /// Where the manifest and local config live
    pub storage: StorageConfig,

    /// Documentation file naming
    pub documents: DocumentConfig,

    /// Codemap file discovery
    pub codemap: CodemapConfig,

    /// System candidate scoring policy
    pub heuristics: HeuristicsConfig,

    /// Change severity thresholds
    pub changes: ChangeThresholds,

    /// Full-tree discovery bounds
    pub discovery: DiscoveryConfig,

    /// Version-control subprocess settings
    pub git: GitConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Storage configuration for persisted state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageConfig {
    /// State directory (default: `.context-layer`)
    pub state_dir: PathBuf,

    /// Manifest file name inside the state directory
    pub manifest_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            state_dir: PathBuf::from(".context-layer"),
            manifest_file: "manifest.json".to_string(),
        }
    }
}

/// Documentation file naming.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DocumentConfig {
    /// Fixed-name documentation-root file per system directory
    pub root_file: String,

    /// Secondary alias pointing at the root file (symlink where supported)
    pub alias_file: Option<String>,
}

impl Default for DocumentConfig {
    fn default() -> Self {
        Self {
            root_file: "AGENTS.md".to_string(),
            alias_file: Some("CLAUDE.md".to_string()),
        }
    }
}

/// Codemap source file discovery.
///
/// # Example TOML
///
/// ```toml
/// [codemap]
/// max_depth = 3
/// extensions = ["ts", "tsx", "py"]
/// exclude_patterns = ["test", "fixtures"]
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CodemapConfig {
    /// Directory levels walked below the system directory (the system itself is level 1)
    pub max_depth: usize,

    /// Source extensions included in a codemap (without the dot)
    pub extensions: Vec<String>,

    /// Entry names containing any of these fragments are skipped
    pub exclude_patterns: Vec<String>,
}

impl Default for CodemapConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            extensions: strings(&["ts", "tsx", "js", "jsx", "swift", "py", "rs", "go"]),
            exclude_patterns: strings(&[
                "test",
                "Test",
                "__tests__",
                "spec",
                ".d.ts",
                "_generated",
                "node_modules",
            ]),
        }
    }
}

/// Scoring policy for system candidates.
///
/// Weights are additive; penalties are subtracted. A candidate is captured
/// when its score reaches `capture_threshold` and it carries no skip reason.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct HeuristicsConfig {
    /// Minimum score for `should_capture`
    pub capture_threshold: i32,

    /// Directories with fewer qualifying source files are disqualified
    pub min_source_files: usize,

    /// Bonus when the directory name is a canonical system name
    pub canonical_dir_bonus: i32,

    /// Bonus for two or more architectural-role files
    pub multi_pattern_bonus: i32,

    /// Bonus for exactly one architectural-role file
    pub single_pattern_bonus: i32,

    /// File count for the large tier
    pub large_dir_files: usize,

    /// Bonus for the large tier
    pub large_dir_bonus: i32,

    /// File count for the medium tier
    pub medium_dir_files: usize,

    /// Bonus for the medium tier
    pub medium_dir_bonus: i32,

    /// Bonus when an entry-point file is present
    pub entry_point_bonus: i32,

    /// Penalty for presentation-only directory names
    pub presentation_penalty: i32,

    /// Penalty for data-only directory names
    pub data_only_penalty: i32,

    /// Infrastructure directory names; any matching path segment disqualifies
    pub skip_dirs: Vec<String>,

    /// Theming, asset and style groupings
    pub presentation_dirs: Vec<String>,

    /// Pure type and model groupings
    pub data_only_dirs: Vec<String>,

    /// Directory names that usually hold a cohesive system
    pub canonical_dirs: Vec<String>,

    /// Architectural-role fragments matched against file stems (case-insensitive)
    pub architectural_patterns: Vec<String>,

    /// Language-idiomatic entry-point file names
    pub entry_points: Vec<String>,

    /// Extensions counted as source files (without the dot)
    pub source_extensions: Vec<String>,

    /// File-name fragments that disqualify a file from the count
    pub file_exclude_patterns: Vec<String>,
}

impl Default for HeuristicsConfig {
    fn default() -> Self {
        Self {
            capture_threshold: 4,
            min_source_files: 3,
            canonical_dir_bonus: 5,
            multi_pattern_bonus: 4,
            single_pattern_bonus: 2,
            large_dir_files: 8,
            large_dir_bonus: 2,
            medium_dir_files: 5,
            medium_dir_bonus: 1,
            entry_point_bonus: 2,
            presentation_penalty: 5,
            data_only_penalty: 3,
            skip_dirs: strings(&[
                "node_modules",
                ".git",
                ".context-layer",
                ".claude",
                "dist",
                "build",
                "out",
                "target",
                "vendor",
                "__pycache__",
                ".venv",
                "venv",
                "coverage",
                ".next",
                "Pods",
                "DerivedData",
            ]),
            presentation_dirs: strings(&[
                "theme", "themes", "style", "styles", "css", "assets", "images", "icons", "fonts",
            ]),
            data_only_dirs: strings(&["types", "typings", "models", "dto", "dtos", "entities"]),
            canonical_dirs: strings(&[
                "api",
                "auth",
                "core",
                "engine",
                "services",
                "server",
                "client",
                "handlers",
                "controllers",
                "providers",
                "repositories",
                "store",
                "storage",
                "middleware",
                "pipeline",
                "scheduler",
                "runtime",
                "networking",
            ]),
            architectural_patterns: strings(&[
                "service",
                "manager",
                "engine",
                "controller",
                "provider",
                "repository",
                "store",
                "handler",
                "client",
                "router",
                "coordinator",
                "processor",
            ]),
            entry_points: strings(&[
                "index.ts",
                "index.tsx",
                "index.js",
                "mod.rs",
                "lib.rs",
                "main.rs",
                "__init__.py",
                "main.py",
                "main.go",
                "main.swift",
            ]),
            source_extensions: strings(&[
                "ts", "tsx", "js", "jsx", "swift", "py", "go", "rs", "java", "kt",
            ]),
            file_exclude_patterns: strings(&[
                "test", "Test", "spec", "mock", "Mock", "generated", "_generated", ".d.ts",
            ]),
        }
    }
}

/// Change severity thresholds.
///
/// A diff is `major` when any count strictly exceeds its threshold.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChangeThresholds {
    pub max_added: usize,
    pub max_deleted: usize,
    pub max_changed: usize,
}

impl Default for ChangeThresholds {
    fn default() -> Self {
        Self {
            max_added: 5,
            max_deleted: 5,
            max_changed: 15,
        }
    }
}

/// Full-tree discovery bounds.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Deepest level listed below the project root; the directories found
    /// there are still scored
    pub max_depth: usize,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self { max_depth: 5 }
    }
}

/// Version-control subprocess settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GitConfig {
    /// Subprocess timeout in seconds
    pub timeout_secs: u64,

    /// Revision diffed against
    pub base_ref: String,

    /// Revision used when `base_ref` does not resolve (e.g. first commit)
    pub fallback_ref: String,
}

impl Default for GitConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 10,
            base_ref: "HEAD~1".to_string(),
            fallback_ref: "HEAD".to_string(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: LogFormat,

    /// Log file path (optional)
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            file: None,
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable text format
    #[default]
    Text,
    /// JSON structured logging
    Json,
}

/// Programmatic overrides for configuration values.
///
/// Applied over file-based config by the invoking layer.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    /// Override state directory
    pub state_dir: Option<PathBuf>,

    /// Override documentation-root file name
    pub root_file: Option<String>,

    /// Override capture threshold
    pub capture_threshold: Option<i32>,

    /// Override git subprocess timeout
    pub git_timeout_secs: Option<u64>,

    /// Override log level
    pub log_level: Option<String>,
}

impl LayerConfig {
    /// Apply overrides to this configuration.
    pub fn apply_overrides(&mut self, overrides: &ConfigOverrides) {
        if let Some(ref dir) = overrides.state_dir {
            self.storage.state_dir = dir.clone();
        }

        if let Some(ref name) = overrides.root_file {
            self.documents.root_file = name.clone();
        }

        if let Some(threshold) = overrides.capture_threshold {
            self.heuristics.capture_threshold = threshold;
        }

        if let Some(secs) = overrides.git_timeout_secs {
            self.git.timeout_secs = secs;
        }

        if let Some(ref level) = overrides.log_level {
            self.logging.level = level.clone();
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.documents.root_file.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "documents.root_file",
                "must not be empty",
            ));
        }
        if self.storage.manifest_file.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "storage.manifest_file",
                "must not be empty",
            ));
        }
        if self.codemap.max_depth == 0 {
            return Err(ConfigError::invalid_value(
                "codemap.max_depth",
                "must be at least 1",
            ));
        }
        if self.git.timeout_secs == 0 {
            return Err(ConfigError::invalid_value(
                "git.timeout_secs",
                "must be greater than zero",
            ));
        }
        self.heuristics.validate()
    }

    /// Get the effective state directory for a project.
    pub fn state_dir(&self, project_root: &Path) -> PathBuf {
        if self.storage.state_dir.is_absolute() {
            self.storage.state_dir.clone()
        } else {
            project_root.join(&self.storage.state_dir)
        }
    }

    /// Get the manifest file path for a project.
    pub fn manifest_path(&self, project_root: &Path) -> PathBuf {
        self.state_dir(project_root)
            .join(&self.storage.manifest_file)
    }
}

impl HeuristicsConfig {
    /// Reject policies whose tiers overlap or cannot disqualify anything.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_source_files == 0 {
            return Err(ConfigError::invalid_value(
                "heuristics.min_source_files",
                "must be at least 1",
            ));
        }
        if self.medium_dir_files >= self.large_dir_files {
            return Err(ConfigError::ValidationError(format!(
                "heuristics.medium_dir_files ({}) must be below heuristics.large_dir_files ({})",
                self.medium_dir_files, self.large_dir_files
            )));
        }
        let weights = [
            ("canonical_dir_bonus", self.canonical_dir_bonus),
            ("multi_pattern_bonus", self.multi_pattern_bonus),
            ("single_pattern_bonus", self.single_pattern_bonus),
            ("large_dir_bonus", self.large_dir_bonus),
            ("medium_dir_bonus", self.medium_dir_bonus),
            ("entry_point_bonus", self.entry_point_bonus),
            ("presentation_penalty", self.presentation_penalty),
            ("data_only_penalty", self.data_only_penalty),
        ];
        if let Some((key, _)) = weights.iter().find(|(_, w)| *w < 0) {
            return Err(ConfigError::invalid_value(
                format!("heuristics.{key}"),
                "weights are magnitudes and must not be negative",
            ));
        }
        Ok(())
    }
}

fn strings(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}
