//! Context Layer Core - Incremental codemaps for per-directory documentation
//!
//! This crate provides the core functionality for keeping documentation in
//! step with source:
//! - Tree-sitter signature extraction for TypeScript, JavaScript, Python,
//!   Rust, Go and Swift
//! - Codemap rendering and idempotent merging into documentation files
//! - Diff severity analysis and system candidate scoring
//! - A persistent manifest tracking documentation coverage and staleness

pub mod changes;
pub mod codemap;
pub mod document;
pub mod git;
pub mod heuristics;
pub mod languages;
pub mod layer;
pub mod manifest;
pub mod parser;
pub mod paths;
pub mod signature;
pub mod systems;

// Extraction re-exports
pub use languages::{ExtractorRegistry, SignatureExtractor};
pub use parser::{ParserError, ParsingSession, SupportedLanguage};
pub use signature::{FileCodemap, Signature, SignatureKind};

// Codemap and document re-exports
pub use codemap::{format_codemap, CodemapGenerator, CODEMAP_END, CODEMAP_HEADING, CODEMAP_START};
pub use document::{
    count_tokens, find_covering_documents, install_codemap, merge_codemap, DocumentError,
    InstallOutcome,
};

// Change analysis re-exports
pub use changes::{analyze_changes, ChangeAnalysis, ChangeType};
pub use git::{ChangeSet, GitClient};

// Discovery re-exports
pub use heuristics::{SystemCandidate, SystemScorer};
pub use systems::{retain_deepest, SystemDiscovery};

// Manifest re-exports
pub use manifest::{
    Coverage, Manifest, ManifestError, ManifestStore, PendingSystem, SystemEntry, SystemStatus,
    Synthesis, MANIFEST_VERSION,
};

// Facade re-exports
pub use layer::{
    find_project_root, AnalysisReport, ContextLayer, LayerError, Recommendation, StatusSummary,
};
