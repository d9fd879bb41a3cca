//! Configuration loader with inheritance support.
//!
//! Loads configuration from multiple sources and merges them:
//! 1. Global config: `~/.context-layer/config.toml`
//! 2. Local config: `.context-layer/config.toml` (in the project root)
//! 3. Programmatic overrides
//!
//! Later sources override earlier ones.

use crate::error::ConfigError;
use crate::{
    ChangeThresholds, CodemapConfig, ConfigOverrides, DiscoveryConfig, DocumentConfig, GitConfig,
    HeuristicsConfig, LayerConfig, LoggingConfig, StorageConfig,
};
use std::path::{Path, PathBuf};
use tracing::{debug, trace};

/// Configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Global configuration directory name.
const GLOBAL_CONFIG_DIR: &str = ".context-layer";

/// Configuration loader with caching and inheritance support.
#[derive(Debug, Clone)]
pub struct ConfigLoader {
    /// Global config directory (e.g., `~/.context-layer`)
    global_config_dir: Option<PathBuf>,

    /// Cached global config
    global_config: Option<LayerConfig>,
}

impl Default for ConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigLoader {
    /// Create a new configuration loader.
    ///
    /// Automatically detects the global config directory (`~/.context-layer`).
    pub fn new() -> Self {
        let global_config_dir = dirs::home_dir().map(|h| h.join(GLOBAL_CONFIG_DIR));

        Self {
            global_config_dir,
            global_config: None,
        }
    }

    /// Create a loader with a custom global config directory.
    ///
    /// Useful for testing.
    pub fn with_global_dir(global_dir: impl Into<PathBuf>) -> Self {
        Self {
            global_config_dir: Some(global_dir.into()),
            global_config: None,
        }
    }

    /// Get the global config file path.
    pub fn global_config_path(&self) -> Option<PathBuf> {
        self.global_config_dir
            .as_ref()
            .map(|d| d.join(CONFIG_FILE_NAME))
    }

    /// Get the local config file path for a project.
    ///
    /// The local config always lives in the default state directory so that
    /// it can itself relocate `storage.state_dir`.
    pub fn local_config_path(&self, project_root: &Path) -> PathBuf {
        project_root
            .join(StorageConfig::default().state_dir)
            .join(CONFIG_FILE_NAME)
    }

    /// Load configuration for a project with optional overrides.
    ///
    /// Merges config in order: global → local → overrides, then validates.
    pub fn load(
        &mut self,
        project_root: &Path,
        overrides: Option<&ConfigOverrides>,
    ) -> Result<LayerConfig, ConfigError> {
        let mut config = LayerConfig::default();

        if let Some(global_config) = self.load_global()? {
            config = merge_configs(config, global_config);
        }

        if let Some(local_config) = self.load_local(project_root)? {
            config = merge_configs(config, local_config);
        }

        if let Some(ovr) = overrides {
            config.apply_overrides(ovr);
        }

        config.validate()?;
        Ok(config)
    }

    /// Load only the global configuration.
    pub fn load_global(&mut self) -> Result<Option<LayerConfig>, ConfigError> {
        if let Some(ref config) = self.global_config {
            return Ok(Some(config.clone()));
        }

        let Some(global_path) = self.global_config_path() else {
            debug!("No home directory found, skipping global config");
            return Ok(None);
        };

        if !global_path.exists() {
            trace!("Global config not found at {:?}", global_path);
            return Ok(None);
        }

        debug!("Loading global config from {:?}", global_path);
        let config = load_config_file(&global_path)?;

        self.global_config = Some(config.clone());

        Ok(Some(config))
    }

    /// Load only the local configuration for a project.
    pub fn load_local(&self, project_root: &Path) -> Result<Option<LayerConfig>, ConfigError> {
        let local_path = self.local_config_path(project_root);

        if !local_path.exists() {
            trace!("Local config not found at {:?}", local_path);
            return Ok(None);
        }

        debug!("Loading local config from {:?}", local_path);
        load_config_file(&local_path).map(Some)
    }

    /// Save configuration to the local config file for a project.
    pub fn save_local(&self, project_root: &Path, config: &LayerConfig) -> Result<(), ConfigError> {
        let local_path = self.local_config_path(project_root);
        save_config_file(&local_path, config)
    }

    /// Initialize local configuration for a project.
    ///
    /// Creates `.context-layer/config.toml` with default configuration.
    /// An existing file is left untouched.
    pub fn init_local(&self, project_root: &Path) -> Result<PathBuf, ConfigError> {
        let config_path = self.local_config_path(project_root);
        if !config_path.exists() {
            save_config_file(&config_path, &LayerConfig::default())?;
        }

        Ok(config_path)
    }

    /// Clear cached global configuration.
    ///
    /// Forces reload on next `load_global()` call.
    pub fn clear_cache(&mut self) {
        self.global_config = None;
    }
}

/// Load a configuration file from disk.
fn load_config_file(path: &Path) -> Result<LayerConfig, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;

    toml::from_str(&content).map_err(|e| ConfigError::parse_toml(path, e))
}

/// Save a configuration file to disk.
fn save_config_file(path: &Path, config: &LayerConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        if !parent.exists() {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
    }

    let content = toml::to_string_pretty(config)?;
    std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
}

/// Take `overlay` when it differs from the default, otherwise keep `base`.
fn pick<T: PartialEq>(base: T, overlay: T, default: T) -> T {
    if overlay != default {
        overlay
    } else {
        base
    }
}

/// Overlay entries extend base entries, preserving order and skipping duplicates.
fn extend_list(base: Vec<String>, overlay: Vec<String>, default: &[String]) -> Vec<String> {
    if overlay.as_slice() == default {
        return base;
    }
    let mut merged = base;
    for item in overlay {
        if !merged.contains(&item) {
            merged.push(item);
        }
    }
    merged
}

/// Merge two configurations, with `overlay` taking precedence.
///
/// This performs a field-by-field merge, allowing partial configs.
fn merge_configs(base: LayerConfig, overlay: LayerConfig) -> LayerConfig {
    LayerConfig {
        storage: merge_storage(base.storage, overlay.storage),
        documents: merge_documents(base.documents, overlay.documents),
        codemap: merge_codemap(base.codemap, overlay.codemap),
        heuristics: merge_heuristics(base.heuristics, overlay.heuristics),
        changes: merge_changes(base.changes, overlay.changes),
        discovery: DiscoveryConfig {
            max_depth: pick(
                base.discovery.max_depth,
                overlay.discovery.max_depth,
                DiscoveryConfig::default().max_depth,
            ),
        },
        git: merge_git(base.git, overlay.git),
        logging: merge_logging(base.logging, overlay.logging),
    }
}

fn merge_storage(base: StorageConfig, overlay: StorageConfig) -> StorageConfig {
    let default = StorageConfig::default();
    StorageConfig {
        state_dir: pick(base.state_dir, overlay.state_dir, default.state_dir),
        manifest_file: pick(
            base.manifest_file,
            overlay.manifest_file,
            default.manifest_file,
        ),
    }
}

fn merge_documents(base: DocumentConfig, overlay: DocumentConfig) -> DocumentConfig {
    let default = DocumentConfig::default();
    DocumentConfig {
        root_file: pick(base.root_file, overlay.root_file, default.root_file),
        // `None` in an overlay disables the alias.
        alias_file: pick(base.alias_file, overlay.alias_file, default.alias_file),
    }
}

fn merge_codemap(base: CodemapConfig, overlay: CodemapConfig) -> CodemapConfig {
    let default = CodemapConfig::default();
    CodemapConfig {
        max_depth: pick(base.max_depth, overlay.max_depth, default.max_depth),
        extensions: extend_list(base.extensions, overlay.extensions, &default.extensions),
        exclude_patterns: extend_list(
            base.exclude_patterns,
            overlay.exclude_patterns,
            &default.exclude_patterns,
        ),
    }
}

fn merge_heuristics(base: HeuristicsConfig, overlay: HeuristicsConfig) -> HeuristicsConfig {
    let d = HeuristicsConfig::default();
    HeuristicsConfig {
        capture_threshold: pick(
            base.capture_threshold,
            overlay.capture_threshold,
            d.capture_threshold,
        ),
        min_source_files: pick(
            base.min_source_files,
            overlay.min_source_files,
            d.min_source_files,
        ),
        canonical_dir_bonus: pick(
            base.canonical_dir_bonus,
            overlay.canonical_dir_bonus,
            d.canonical_dir_bonus,
        ),
        multi_pattern_bonus: pick(
            base.multi_pattern_bonus,
            overlay.multi_pattern_bonus,
            d.multi_pattern_bonus,
        ),
        single_pattern_bonus: pick(
            base.single_pattern_bonus,
            overlay.single_pattern_bonus,
            d.single_pattern_bonus,
        ),
        large_dir_files: pick(
            base.large_dir_files,
            overlay.large_dir_files,
            d.large_dir_files,
        ),
        large_dir_bonus: pick(
            base.large_dir_bonus,
            overlay.large_dir_bonus,
            d.large_dir_bonus,
        ),
        medium_dir_files: pick(
            base.medium_dir_files,
            overlay.medium_dir_files,
            d.medium_dir_files,
        ),
        medium_dir_bonus: pick(
            base.medium_dir_bonus,
            overlay.medium_dir_bonus,
            d.medium_dir_bonus,
        ),
        entry_point_bonus: pick(
            base.entry_point_bonus,
            overlay.entry_point_bonus,
            d.entry_point_bonus,
        ),
        presentation_penalty: pick(
            base.presentation_penalty,
            overlay.presentation_penalty,
            d.presentation_penalty,
        ),
        data_only_penalty: pick(
            base.data_only_penalty,
            overlay.data_only_penalty,
            d.data_only_penalty,
        ),
        skip_dirs: extend_list(base.skip_dirs, overlay.skip_dirs, &d.skip_dirs),
        presentation_dirs: extend_list(
            base.presentation_dirs,
            overlay.presentation_dirs,
            &d.presentation_dirs,
        ),
        data_only_dirs: extend_list(base.data_only_dirs, overlay.data_only_dirs, &d.data_only_dirs),
        canonical_dirs: extend_list(base.canonical_dirs, overlay.canonical_dirs, &d.canonical_dirs),
        architectural_patterns: extend_list(
            base.architectural_patterns,
            overlay.architectural_patterns,
            &d.architectural_patterns,
        ),
        entry_points: extend_list(base.entry_points, overlay.entry_points, &d.entry_points),
        source_extensions: extend_list(
            base.source_extensions,
            overlay.source_extensions,
            &d.source_extensions,
        ),
        file_exclude_patterns: extend_list(
            base.file_exclude_patterns,
            overlay.file_exclude_patterns,
            &d.file_exclude_patterns,
        ),
    }
}

fn merge_changes(base: ChangeThresholds, overlay: ChangeThresholds) -> ChangeThresholds {
    let default = ChangeThresholds::default();
    ChangeThresholds {
        max_added: pick(base.max_added, overlay.max_added, default.max_added),
        max_deleted: pick(base.max_deleted, overlay.max_deleted, default.max_deleted),
        max_changed: pick(base.max_changed, overlay.max_changed, default.max_changed),
    }
}

fn merge_git(base: GitConfig, overlay: GitConfig) -> GitConfig {
    let default = GitConfig::default();
    GitConfig {
        timeout_secs: pick(base.timeout_secs, overlay.timeout_secs, default.timeout_secs),
        base_ref: pick(base.base_ref, overlay.base_ref, default.base_ref),
        fallback_ref: pick(base.fallback_ref, overlay.fallback_ref, default.fallback_ref),
    }
}

fn merge_logging(base: LoggingConfig, overlay: LoggingConfig) -> LoggingConfig {
    let default = LoggingConfig::default();
    LoggingConfig {
        level: pick(base.level, overlay.level, default.level),
        format: pick(base.format, overlay.format, default.format),
        file: overlay.file.or(base.file),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn create_local_config(content: &str, root: &Path) -> PathBuf {
        let config_dir = root.join(".context-layer");
        std::fs::create_dir_all(&config_dir).unwrap();
        let path = config_dir.join("config.toml");
        std::fs::write(&path, content).unwrap();
        path
    }

    fn create_global_config(content: &str, global_dir: &Path) {
        std::fs::create_dir_all(global_dir).unwrap();
        std::fs::write(global_dir.join("config.toml"), content).unwrap();
    }

    #[test]
    fn test_load_default_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config, LayerConfig::default());
    }

    #[test]
    fn test_load_local_config() {
        let temp = TempDir::new().unwrap();
        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        create_local_config(
            r#"
            [documents]
            root_file = "SYSTEM.md"

            [heuristics]
            capture_threshold = 6
            "#,
            temp.path(),
        );

        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.documents.root_file, "SYSTEM.md");
        assert_eq!(config.heuristics.capture_threshold, 6);
        assert_eq!(config.heuristics.canonical_dir_bonus, 5);
    }

    #[test]
    fn test_local_overrides_global() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");

        create_global_config(
            r#"
            [logging]
            level = "debug"

            [changes]
            max_added = 10
            "#,
            &global_dir,
        );

        create_local_config(
            r#"
            [changes]
            max_added = 3
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(&global_dir);
        let config = loader.load(temp.path(), None).unwrap();

        assert_eq!(config.changes.max_added, 3);
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_overrides_win() {
        let temp = TempDir::new().unwrap();

        create_local_config(
            r#"
            [git]
            timeout_secs = 30
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let overrides = ConfigOverrides {
            git_timeout_secs: Some(2),
            log_level: Some("trace".to_string()),
            ..Default::default()
        };

        let config = loader.load(temp.path(), Some(&overrides)).unwrap();

        assert_eq!(config.git.timeout_secs, 2);
        assert_eq!(config.logging.level, "trace");
    }

    #[test]
    fn test_load_rejects_invalid_policy() {
        let temp = TempDir::new().unwrap();
        create_local_config(
            r#"
            [heuristics]
            medium_dir_files = 12
            "#,
            temp.path(),
        );

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        assert!(loader.load(temp.path(), None).is_err());
    }

    #[test]
    fn test_load_reports_parse_error_path() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[heuristics\ncapture_threshold = ", temp.path());

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let err = loader.load(temp.path(), None).unwrap_err();

        assert!(matches!(err, ConfigError::ParseToml { .. }));
        assert!(err.to_string().contains(&path.display().to_string()));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let mut config = LayerConfig::default();
        config.heuristics.entry_point_bonus = 3;
        config.logging.level = "warn".to_string();

        loader.save_local(temp.path(), &config).unwrap();

        let mut loader = ConfigLoader::with_global_dir(temp.path().join("global"));
        let loaded = loader.load(temp.path(), None).unwrap();

        assert_eq!(loaded.heuristics.entry_point_bonus, 3);
        assert_eq!(loaded.logging.level, "warn");
    }

    #[test]
    fn test_init_local_creates_config() {
        let temp = TempDir::new().unwrap();
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        let config_path = loader.init_local(temp.path()).unwrap();

        assert!(config_path.exists());
        assert!(config_path.ends_with(".context-layer/config.toml"));

        let content = std::fs::read_to_string(&config_path).unwrap();
        let parsed: LayerConfig = toml::from_str(&content).unwrap();
        assert_eq!(parsed, LayerConfig::default());
    }

    #[test]
    fn test_init_local_keeps_existing() {
        let temp = TempDir::new().unwrap();
        let path = create_local_config("[discovery]\nmax_depth = 2\n", temp.path());
        let loader = ConfigLoader::with_global_dir(temp.path().join("global"));

        loader.init_local(temp.path()).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(content.contains("max_depth = 2"));
    }

    #[test]
    fn test_skip_dirs_merge_extends() {
        let base = HeuristicsConfig::default();
        let overlay = HeuristicsConfig {
            skip_dirs: vec!["generated".to_string(), "node_modules".to_string()],
            ..Default::default()
        };

        let merged = merge_heuristics(base, overlay);

        assert!(merged.skip_dirs.contains(&"generated".to_string()));
        assert!(merged.skip_dirs.contains(&".git".to_string()));
        assert_eq!(
            merged
                .skip_dirs
                .iter()
                .filter(|d| d.as_str() == "node_modules")
                .count(),
            1
        );
    }

    #[test]
    fn test_alias_can_be_disabled() {
        let base = DocumentConfig::default();
        let overlay = DocumentConfig {
            alias_file: None,
            ..Default::default()
        };

        let merged = merge_documents(base, overlay);
        assert_eq!(merged.alias_file, None);
    }

    #[test]
    fn test_cache_clearing() {
        let temp = TempDir::new().unwrap();
        let global_dir = temp.path().join("global");
        create_global_config("[logging]\nlevel = \"debug\"\n", &global_dir);

        let mut loader = ConfigLoader::with_global_dir(&global_dir);

        let _ = loader.load_global().unwrap();
        assert!(loader.global_config.is_some());

        loader.clear_cache();
        assert!(loader.global_config.is_none());
    }
}
