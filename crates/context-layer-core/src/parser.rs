//! Tree-Sitter Parsing Session
//!
//! Holds the grammars that loaded successfully in this process and routes
//! each parse to the signature extractor registered for its language.
//!
//! ## Supported Languages
//!
//! - TypeScript (.ts, .tsx)
//! - JavaScript (.js, .jsx, .mjs, .cjs)
//! - Python (.py)
//! - Rust (.rs)
//! - Go (.go)
//! - Swift (.swift)

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::{debug, info, warn};
use tree_sitter::{Language, Parser, Tree};

use crate::languages::ExtractorRegistry;
use crate::signature::{FileCodemap, Signature};

// ============================================================================
// Supported Languages
// ============================================================================

/// Supported programming languages for signature extraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SupportedLanguage {
    TypeScript,
    Tsx,
    JavaScript,
    Python,
    Rust,
    Go,
    Swift,
}

impl SupportedLanguage {
    /// Every language the session attempts to load.
    pub const ALL: [SupportedLanguage; 7] = [
        SupportedLanguage::TypeScript,
        SupportedLanguage::Tsx,
        SupportedLanguage::JavaScript,
        SupportedLanguage::Python,
        SupportedLanguage::Rust,
        SupportedLanguage::Go,
        SupportedLanguage::Swift,
    ];

    /// Language tag used to key the extractor registry.
    pub fn as_str(&self) -> &'static str {
        match self {
            SupportedLanguage::TypeScript => "typescript",
            SupportedLanguage::Tsx => "typescript", // TSX shares the TypeScript extractor
            SupportedLanguage::JavaScript => "javascript",
            SupportedLanguage::Python => "python",
            SupportedLanguage::Rust => "rust",
            SupportedLanguage::Go => "go",
            SupportedLanguage::Swift => "swift",
        }
    }

    /// Get the tree-sitter Language for this language.
    pub fn tree_sitter_language(&self) -> Language {
        match self {
            SupportedLanguage::TypeScript => tree_sitter_typescript::LANGUAGE_TYPESCRIPT.into(),
            SupportedLanguage::Tsx => tree_sitter_typescript::LANGUAGE_TSX.into(),
            SupportedLanguage::JavaScript => tree_sitter_javascript::LANGUAGE.into(),
            SupportedLanguage::Python => tree_sitter_python::LANGUAGE.into(),
            SupportedLanguage::Rust => tree_sitter_rust::LANGUAGE.into(),
            SupportedLanguage::Go => tree_sitter_go::LANGUAGE.into(),
            SupportedLanguage::Swift => tree_sitter_swift::LANGUAGE.into(),
        }
    }

    /// Detect language from file extension.
    ///
    /// Returns `None` if the extension is not recognized.
    pub fn from_extension(ext: &str) -> Option<Self> {
        get_extension_map()
            .get(ext.to_lowercase().as_str())
            .copied()
    }

    /// Detect language from file path.
    ///
    /// Returns `None` if the file extension is not recognized.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

impl std::fmt::Display for SupportedLanguage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Static extension to language mapping.
static EXTENSION_MAP: OnceLock<HashMap<&'static str, SupportedLanguage>> = OnceLock::new();

fn get_extension_map() -> &'static HashMap<&'static str, SupportedLanguage> {
    EXTENSION_MAP.get_or_init(|| {
        let mut map = HashMap::new();
        // TypeScript
        map.insert("ts", SupportedLanguage::TypeScript);
        map.insert("mts", SupportedLanguage::TypeScript);
        map.insert("tsx", SupportedLanguage::Tsx);
        // JavaScript (the grammar includes JSX)
        map.insert("js", SupportedLanguage::JavaScript);
        map.insert("jsx", SupportedLanguage::JavaScript);
        map.insert("mjs", SupportedLanguage::JavaScript);
        map.insert("cjs", SupportedLanguage::JavaScript);
        // Python
        map.insert("py", SupportedLanguage::Python);
        // Rust
        map.insert("rs", SupportedLanguage::Rust);
        // Go
        map.insert("go", SupportedLanguage::Go);
        // Swift
        map.insert("swift", SupportedLanguage::Swift);
        map
    })
}

// ============================================================================
// Parser Errors
// ============================================================================

/// Errors that can occur during parsing.
#[derive(Debug, Error)]
pub enum ParserError {
    /// Failed to set language
    #[error("Failed to set language {language}: {reason}")]
    LanguageSet {
        language: SupportedLanguage,
        reason: String,
    },

    /// Grammar did not load in this session
    #[error("Grammar unavailable: {0}")]
    GrammarUnavailable(SupportedLanguage),

    /// Failed to parse source code
    #[error("Failed to parse source code")]
    ParseFailed,

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// Parsing Session
// ============================================================================

static GLOBAL_SESSION: OnceLock<ParsingSession> = OnceLock::new();

/// Grammar handles and extractors for one process.
///
/// Each grammar loads independently; a grammar that fails to load is simply
/// absent, and extraction for that language yields no signatures.
pub struct ParsingSession {
    grammars: HashMap<SupportedLanguage, Language>,
    registry: ExtractorRegistry,
}

impl std::fmt::Debug for ParsingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParsingSession")
            .field("languages", &self.available_languages())
            .field("extractors", &self.registry.languages())
            .finish()
    }
}

impl Default for ParsingSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ParsingSession {
    /// Load every supported grammar, keeping the ones that succeed.
    pub fn new() -> Self {
        Self::with_languages(&SupportedLanguage::ALL)
    }

    /// Load only the given grammars.
    pub fn with_languages(languages: &[SupportedLanguage]) -> Self {
        let mut grammars = HashMap::new();
        for &language in languages {
            match load_grammar(language) {
                Ok(grammar) => {
                    grammars.insert(language, grammar);
                }
                Err(e) => warn!("Skipping {:?} grammar: {}", language, e),
            }
        }

        let session = Self {
            grammars,
            registry: ExtractorRegistry::with_defaults(),
        };
        info!(
            "Parsing session ready with {} grammar(s)",
            session.grammars.len()
        );
        session
    }

    /// Process-wide session, initialized on first use.
    ///
    /// Concurrent first calls block on a single initialization.
    pub fn global() -> &'static ParsingSession {
        GLOBAL_SESSION.get_or_init(ParsingSession::new)
    }

    /// Whether the grammar for `language` loaded.
    pub fn is_available(&self, language: SupportedLanguage) -> bool {
        self.grammars.contains_key(&language)
    }

    /// Loaded languages in a stable order.
    pub fn available_languages(&self) -> Vec<SupportedLanguage> {
        let mut languages: Vec<_> = self.grammars.keys().copied().collect();
        languages.sort();
        languages
    }

    /// Parse source code into a syntax tree.
    ///
    /// A fresh `Parser` is created per call so the session can be shared
    /// across threads.
    pub fn parse(&self, language: SupportedLanguage, source: &str) -> Result<Tree> {
        let grammar = self
            .grammars
            .get(&language)
            .ok_or(ParserError::GrammarUnavailable(language))?;

        let mut parser = Parser::new();
        parser
            .set_language(grammar)
            .map_err(|e| ParserError::LanguageSet {
                language,
                reason: e.to_string(),
            })?;

        parser.parse(source, None).ok_or(ParserError::ParseFailed)
    }

    /// Extract signatures from `source`.
    ///
    /// Missing grammars, missing extractors and parse failures all yield an
    /// empty list.
    pub fn extract(&self, language: SupportedLanguage, source: &str) -> Vec<Signature> {
        let Some(extractor) = self.registry.get(language.as_str()) else {
            debug!("No extractor registered for {}", language);
            return Vec::new();
        };

        match self.parse(language, source) {
            Ok(tree) => extractor.extract(&tree, source),
            Err(e) => {
                debug!("Extraction skipped for {:?}: {}", language, e);
                Vec::new()
            }
        }
    }

    /// Read and extract one file.
    ///
    /// `display_path` is recorded in the returned codemap. Returns `Ok(None)`
    /// for files whose extension maps to no supported language.
    pub fn extract_file(&self, path: &Path, display_path: &str) -> Result<Option<FileCodemap>> {
        let Some(language) = SupportedLanguage::from_path(path) else {
            return Ok(None);
        };

        let source = std::fs::read_to_string(path)?;
        Ok(Some(FileCodemap {
            path: display_path.to_string(),
            language: language.as_str().to_string(),
            signatures: self.extract(language, &source),
        }))
    }
}

fn load_grammar(language: SupportedLanguage) -> Result<Language> {
    let grammar = language.tree_sitter_language();
    // Load into a throwaway parser so ABI mismatches surface at load time.
    let mut parser = Parser::new();
    parser
        .set_language(&grammar)
        .map_err(|e| ParserError::LanguageSet {
            language,
            reason: e.to_string(),
        })?;
    Ok(grammar)
}
