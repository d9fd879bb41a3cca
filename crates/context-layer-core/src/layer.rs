//! Maintenance facade
//!
//! `ContextLayer` ties the components to one project root and one
//! configuration: it reads the diff, analyzes it, discovers systems,
//! refreshes codemaps and keeps the manifest in step.

use std::collections::{BTreeSet, HashSet};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info, warn};

use context_layer_config::{ConfigError, ConfigLoader, ConfigOverrides, LayerConfig};

use crate::changes::{analyze_changes, ChangeAnalysis, ChangeType};
use crate::codemap::CodemapGenerator;
use crate::document::{self, DocumentError, InstallOutcome};
use crate::git::{ChangeSet, GitClient};
use crate::heuristics::{SystemCandidate, SystemScorer};
use crate::manifest::{Coverage, Manifest, ManifestError, ManifestStore, PendingSystem};
use crate::paths;
use crate::systems::SystemDiscovery;

/// Files and directories that mark a project root.
pub const ROOT_MARKERS: &[&str] = &[".git", "package.json", "Cargo.toml", "go.mod", "pyproject.toml"];

#[derive(Debug, Error)]
pub enum LayerError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error(transparent)]
    Document(#[from] DocumentError),

    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, LayerError>;

/// Next step suggested by an analysis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    /// New systems were found and should be documented
    DocumentNewSystems,
    /// Nothing changed
    None,
    /// Small change; curated content may need a light check
    ReviewMinor,
    /// Large change; documentation needs review
    ReviewMajor,
}

impl Recommendation {
    pub fn from_analysis(change_type: ChangeType, new_systems: usize) -> Self {
        if new_systems > 0 {
            return Recommendation::DocumentNewSystems;
        }
        match change_type {
            ChangeType::None => Recommendation::None,
            ChangeType::Minor => Recommendation::ReviewMinor,
            ChangeType::Major => Recommendation::ReviewMajor,
        }
    }
}

/// Analysis of one diff plus the systems it introduced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub change_type: ChangeType,
    pub new_systems: Vec<SystemCandidate>,
    pub affected_systems: Vec<String>,
    pub deleted_systems: Vec<String>,
    pub recommendation: Recommendation,
}

impl AnalysisReport {
    pub fn new(analysis: &ChangeAnalysis, new_systems: Vec<SystemCandidate>) -> Self {
        Self {
            change_type: analysis.change_type,
            recommendation: Recommendation::from_analysis(analysis.change_type, new_systems.len()),
            new_systems,
            affected_systems: analysis.affected_systems.iter().cloned().collect(),
            deleted_systems: analysis.deleted_systems.clone(),
        }
    }
}

/// Snapshot of the manifest for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusSummary {
    pub coverage: Coverage,
    pub last_full_build: Option<DateTime<Utc>>,
    pub last_synthesis: Option<DateTime<Utc>>,
    pub documented_systems: usize,
    pub pending: Vec<PendingSystem>,
    pub stale_systems: Vec<String>,
}

impl From<&Manifest> for StatusSummary {
    fn from(manifest: &Manifest) -> Self {
        Self {
            coverage: manifest.coverage.clone(),
            last_full_build: manifest.last_full_build,
            last_synthesis: manifest.last_synthesis,
            documented_systems: manifest.systems.len(),
            pending: manifest.pending.clone(),
            stale_systems: manifest
                .stale_systems()
                .into_iter()
                .map(str::to_string)
                .collect(),
        }
    }
}

/// Walk upward from `start` to the first directory holding a root marker.
/// Falls back to `start` itself.
pub fn find_project_root(start: &Path) -> PathBuf {
    start
        .ancestors()
        .find(|dir| ROOT_MARKERS.iter().any(|m| dir.join(m).exists()))
        .unwrap_or(start)
        .to_path_buf()
}

/// Incremental documentation maintenance for one project.
pub struct ContextLayer {
    root: PathBuf,
    config: LayerConfig,
    store: ManifestStore,
    git: GitClient,
}

impl ContextLayer {
    pub fn new(root: impl Into<PathBuf>, config: LayerConfig) -> Self {
        let root = root.into();
        let store = ManifestStore::new(config.manifest_path(&root));
        let git = GitClient::new(&root, config.git.clone());
        Self {
            root,
            config,
            store,
            git,
        }
    }

    /// Detect the project root above `start` and load its configuration.
    pub fn open(start: &Path, overrides: Option<&ConfigOverrides>) -> Result<Self> {
        let root = find_project_root(start);
        let config = ConfigLoader::new().load(&root, overrides)?;
        debug!("Opened project at {:?}", root);
        Ok(Self::new(root, config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn store(&self) -> &ManifestStore {
        &self.store
    }

    pub fn is_initialized(&self) -> bool {
        self.store.exists()
    }

    // ========================================================================
    // Initialization
    // ========================================================================

    /// Create the state directory and an empty manifest.
    ///
    /// Returns `false` without touching anything when already initialized.
    pub fn init(&self) -> Result<bool> {
        if self.is_initialized() {
            info!("Already initialized: {:?}", self.store.path());
            return Ok(false);
        }

        self.store.create(self.root.to_string_lossy())?;
        if let Err(e) = self.ignore_state_dir() {
            warn!("Could not update .gitignore: {}", e);
        }
        info!("Initialized context layer at {:?}", self.root);
        Ok(true)
    }

    fn ignore_state_dir(&self) -> std::io::Result<()> {
        let path = self.root.join(".gitignore");
        let state_dir = self.config.storage.state_dir.to_string_lossy();
        let mut content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(e),
        };
        let already_ignored = content.lines().any(|line| {
            let entry = line.trim().trim_start_matches('/').trim_end_matches('/');
            entry == state_dir.trim_end_matches('/')
        });
        if already_ignored {
            return Ok(());
        }
        content.push_str(&format!("\n# Context Layer\n{state_dir}/\n"));
        std::fs::write(&path, content)
    }

    // ========================================================================
    // Components
    // ========================================================================

    pub fn generator(&self) -> CodemapGenerator<'static> {
        CodemapGenerator::new(self.config.codemap.clone())
    }

    pub fn scorer(&self) -> SystemScorer {
        SystemScorer::new(&self.root, self.config.heuristics.clone())
    }

    pub fn discovery(&self) -> SystemDiscovery {
        SystemDiscovery::new(
            self.scorer(),
            self.config.documents.root_file.clone(),
            self.config.discovery.max_depth,
        )
    }

    /// Codemap block for a directory relative to the root.
    pub fn generate_codemap(&self, rel_dir: &str) -> String {
        self.generator().generate(&paths::resolve(&self.root, rel_dir))
    }

    // ========================================================================
    // Change analysis
    // ========================================================================

    /// Changed paths and status-tagged changes of the last commit.
    pub fn read_diff(&self) -> (Vec<String>, ChangeSet) {
        (self.git.changed_files(), self.git.change_set())
    }

    /// Analyze an explicit diff.
    pub fn analyze_diff(&self, changed_files: &[String], changes: &ChangeSet) -> AnalysisReport {
        let analysis = analyze_changes(
            changed_files,
            changes,
            &self.config.changes,
            &self.config.documents.root_file,
        );
        let new_systems = self.discovery().detect_new_systems(changed_files);
        let report = AnalysisReport::new(&analysis, new_systems);
        info!(
            "Change analysis: {} ({} affected, {} deleted, {} new)",
            report.change_type,
            report.affected_systems.len(),
            report.deleted_systems.len(),
            report.new_systems.len()
        );
        report
    }

    /// Analyze the last commit.
    pub fn analyze(&self) -> AnalysisReport {
        let (changed_files, changes) = self.read_diff();
        self.analyze_diff(&changed_files, &changes)
    }

    /// Record a report in the manifest: affected systems go stale, deleted
    /// ones await deletion, new systems are queued as pending.
    pub fn record_report(&self, report: &AnalysisReport) -> Result<Manifest> {
        let manifest = self.store.update(|m| {
            let stale = m.mark_stale(report.affected_systems.iter().map(String::as_str));
            let deleted = m.mark_pending_deletion(report.deleted_systems.iter().map(String::as_str));
            let mut queued = 0;
            for candidate in &report.new_systems {
                if m.systems.contains_key(&candidate.path) {
                    continue;
                }
                if m.add_pending(&candidate.path, &candidate.reasons.join(", "), candidate.score) {
                    queued += 1;
                }
            }
            debug!("Recorded report: {} stale, {} deleted, {} queued", stale, deleted, queued);
        })?;
        Ok(manifest)
    }

    // ========================================================================
    // Documentation maintenance
    // ========================================================================

    fn doc_path(&self, rel_dir: &str) -> PathBuf {
        paths::resolve(&self.root, rel_dir).join(&self.config.documents.root_file)
    }

    fn agents_md_path(&self, rel_dir: &str) -> String {
        if rel_dir.is_empty() || rel_dir == "." {
            self.config.documents.root_file.clone()
        } else {
            format!("{}/{}", rel_dir, self.config.documents.root_file)
        }
    }

    /// Regenerate and merge the codemap of `rel_dir`; returns the outcome and
    /// the document's token estimate.
    fn install(&self, rel_dir: &str) -> Result<(InstallOutcome, usize)> {
        let codemap = self.generate_codemap(rel_dir);
        let doc_path = self.doc_path(rel_dir);
        let outcome = document::install_codemap(
            &doc_path,
            &codemap,
            self.config.documents.alias_file.as_deref(),
        )?;
        let content = std::fs::read_to_string(&doc_path).map_err(|source| LayerError::Io {
            path: doc_path.clone(),
            source,
        })?;
        Ok((outcome, document::count_tokens(&content)))
    }

    /// Documented directories covering any of `changed_files`, each once,
    /// nearest first per file.
    pub fn covering_documents(&self, changed_files: &[String]) -> Vec<String> {
        let mut seen = HashSet::new();
        changed_files
            .iter()
            .flat_map(|f| {
                document::find_covering_documents(&self.root, f, &self.config.documents.root_file)
            })
            .filter(|dir| seen.insert(dir.clone()))
            .collect()
    }

    /// Refresh the codemap of every documented directory covering a changed
    /// file. Tracked systems are marked active with fresh token counts.
    pub fn refresh_codemaps(&self, changed_files: &[String]) -> Result<Vec<String>> {
        let dirs = self.covering_documents(changed_files);
        let mut refreshed = Vec::new();
        let mut tokens = Vec::new();

        for dir in &dirs {
            let (outcome, count) = self.install(dir)?;
            if outcome != InstallOutcome::Unchanged {
                refreshed.push(dir.clone());
            }
            tokens.push((dir.clone(), count));
        }

        if self.is_initialized() && !tokens.is_empty() {
            self.store.update(|m| {
                for (dir, count) in &tokens {
                    m.record_refresh(dir, *count);
                }
            })?;
        }

        info!(
            "Refreshed {} of {} covering codemap(s)",
            refreshed.len(),
            dirs.len()
        );
        Ok(refreshed)
    }

    /// Document one system: install its codemap, register it, drop it from
    /// the pending queue and rebuild the hierarchy.
    ///
    /// The project root is tracked as `"."`.
    pub fn document_system(&self, rel_dir: &str) -> Result<InstallOutcome> {
        let rel_dir = match paths::normalize(rel_dir) {
            root if root.is_empty() => ".".to_string(),
            dir => dir,
        };
        let mut manifest = self.store.load_required()?;

        let (outcome, tokens) = self.install(&rel_dir)?;
        let file_count = self
            .scorer()
            .evaluate(&rel_dir)
            .map(|c| c.file_count)
            .unwrap_or_else(|| {
                self.generator()
                    .source_files(&paths::resolve(&self.root, &rel_dir))
                    .len()
            });

        manifest.add_system(&rel_dir, &self.agents_md_path(&rel_dir), file_count);
        manifest.record_refresh(&rel_dir, tokens);
        manifest.remove_pending(&rel_dir);
        manifest.rebuild_hierarchy();
        self.store.save(&mut manifest)?;

        info!("Documented system {:?} ({:?})", rel_dir, outcome);
        Ok(outcome)
    }

    /// Document every pending system; returns the documented paths.
    pub fn build_pending(&self) -> Result<Vec<String>> {
        let pending: Vec<String> = self
            .store
            .load_required()?
            .pending
            .into_iter()
            .map(|p| p.path)
            .collect();
        for path in &pending {
            self.document_system(path)?;
        }
        Ok(pending)
    }

    /// Register documentation-root files that exist on disk but are not yet
    /// tracked. Returns the newly registered directories.
    pub fn register_existing(&self) -> Result<Vec<String>> {
        let documented = self.discovery().documented_directories();
        let generator = self.generator();
        let mut registered = Vec::new();
        self.store.update(|m| {
            for dir in documented {
                if m.systems.contains_key(&dir) {
                    continue;
                }
                let count = generator
                    .source_files(&paths::resolve(&self.root, &dir))
                    .len();
                m.add_system(&dir, &self.agents_md_path(&dir), count);
                m.remove_pending(&dir);
                registered.push(dir);
            }
            m.rebuild_hierarchy();
        })?;
        info!("Registered {} existing document(s)", registered.len());
        Ok(registered)
    }

    /// Full-tree inventory. Updates `totalDirectories` and `lastFullBuild`,
    /// and queues undocumented systems as pending.
    pub fn full_scan(&self) -> Result<Vec<SystemCandidate>> {
        let candidates = self.discovery().find_all_systems();
        let mut manifest = self.store.load_required()?;

        let mut inventory: BTreeSet<&str> = candidates.iter().map(|c| c.path.as_str()).collect();
        inventory.extend(manifest.systems.keys().map(String::as_str));
        let total = inventory.len();

        for candidate in &candidates {
            if manifest.systems.contains_key(&candidate.path) || self.doc_path(&candidate.path).is_file() {
                continue;
            }
            manifest.add_pending(&candidate.path, &candidate.reasons.join(", "), candidate.score);
        }
        manifest.set_total_directories(total);
        manifest.last_full_build = Some(Utc::now());
        self.store.save(&mut manifest)?;

        info!(
            "Full scan: {} system(s), {}% documented",
            candidates.len(),
            manifest.coverage.percentage
        );
        Ok(candidates)
    }

    /// Drop systems pending deletion from the manifest.
    pub fn prune_deleted(&self) -> Result<Vec<String>> {
        let mut pruned = Vec::new();
        self.store.update(|m| pruned = m.prune_deleted())?;
        Ok(pruned)
    }

    /// Manifest snapshot; `None` when the project is not initialized.
    pub fn status(&self) -> Result<Option<StatusSummary>> {
        Ok(self.store.load()?.as_ref().map(StatusSummary::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    #[test]
    fn test_recommendation() {
        assert_eq!(
            Recommendation::from_analysis(ChangeType::None, 1),
            Recommendation::DocumentNewSystems
        );
        assert_eq!(Recommendation::from_analysis(ChangeType::None, 0), Recommendation::None);
        assert_eq!(
            Recommendation::from_analysis(ChangeType::Minor, 0),
            Recommendation::ReviewMinor
        );
        assert_eq!(
            Recommendation::from_analysis(ChangeType::Major, 0),
            Recommendation::ReviewMajor
        );
    }

    #[test]
    fn test_find_project_root() {
        let temp = TempDir::new().unwrap();
        let root = temp.path().join("project");
        let nested = root.join("src/deep");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(root.join("Cargo.toml"), "").unwrap();

        assert_eq!(find_project_root(&nested), root);
    }

    #[test]
    fn test_init_is_idempotent_and_ignores_state_dir() {
        let temp = TempDir::new().unwrap();
        let layer = ContextLayer::new(temp.path(), LayerConfig::default());

        assert!(layer.init().unwrap());
        assert!(!layer.init().unwrap());
        assert!(layer.is_initialized());

        let gitignore = std::fs::read_to_string(temp.path().join(".gitignore")).unwrap();
        assert_eq!(gitignore.matches(".context-layer/").count(), 1);

        let status = layer.status().unwrap().unwrap();
        assert_eq!(status.documented_systems, 0);
        assert_eq!(status.coverage.percentage, 0);
    }

    #[test]
    fn test_gitignore_matches_whole_entries() {
        let temp = TempDir::new().unwrap();
        let gitignore = temp.path().join(".gitignore");
        std::fs::write(&gitignore, ".context-layer-old/\n").unwrap();

        let layer = ContextLayer::new(temp.path(), LayerConfig::default());
        layer.init().unwrap();
        let content = std::fs::read_to_string(&gitignore).unwrap();
        assert_eq!(
            content,
            ".context-layer-old/\n\n# Context Layer\n.context-layer/\n"
        );

        let other = TempDir::new().unwrap();
        std::fs::write(other.path().join(".gitignore"), "/.context-layer\n").unwrap();
        ContextLayer::new(other.path(), LayerConfig::default())
            .init()
            .unwrap();
        let content = std::fs::read_to_string(other.path().join(".gitignore")).unwrap();
        assert_eq!(content, "/.context-layer\n");
    }

    #[test]
    fn test_document_project_root() {
        let temp = TempDir::new().unwrap();
        for name in ["index.ts", "appService.ts", "appController.ts"] {
            std::fs::write(temp.path().join(name), "export const x = 1;\n").unwrap();
        }
        let layer = ContextLayer::new(temp.path(), LayerConfig::default());
        layer.init().unwrap();

        layer.document_system("").unwrap();
        let manifest = layer.store().load_required().unwrap();
        assert_eq!(manifest.systems["."].agents_md_path, "AGENTS.md");
        assert!(!manifest.systems.contains_key(""));
        assert!(temp.path().join("AGENTS.md").is_file());

        layer.document_system("./").unwrap();
        assert_eq!(layer.store().load_required().unwrap().systems.len(), 1);
    }

    #[test]
    fn test_status_uninitialized() {
        let temp = TempDir::new().unwrap();
        let layer = ContextLayer::new(temp.path(), LayerConfig::default());
        assert!(layer.status().unwrap().is_none());
        assert!(matches!(
            layer.document_system("src"),
            Err(LayerError::Manifest(ManifestError::NotInitialized(_)))
        ));
    }

    #[test]
    fn test_report_serializes_camel_case() {
        let analysis = analyze_changes(
            &[],
            &ChangeSet::new(),
            &Default::default(),
            "AGENTS.md",
        );
        let report = AnalysisReport::new(&analysis, Vec::new());
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["changeType"], "none");
        assert_eq!(json["recommendation"], "none");
        assert!(json["newSystems"].as_array().unwrap().is_empty());
    }
}
