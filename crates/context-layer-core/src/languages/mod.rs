//! Per-language signature extractors.
//!
//! Each extractor walks a parsed syntax tree and returns the declarations it
//! considers part of a file's API surface. Extractors are registered by
//! language tag; callers never branch on language themselves.

mod go;
mod python;
mod rust;
mod swift;
mod typescript;

pub use go::GoExtractor;
pub use python::PythonExtractor;
pub use rust::RustExtractor;
pub use swift::SwiftExtractor;
pub use typescript::EcmaScriptExtractor;

use std::collections::HashMap;

use tree_sitter::{Node, Tree};

use crate::signature::Signature;

/// Contract shared by all language extractors: `syntax tree → signatures`.
pub trait SignatureExtractor: Send + Sync {
    /// Registry key, matching `SupportedLanguage::as_str`.
    fn language(&self) -> &'static str;

    /// Extract declarations in source order.
    fn extract(&self, tree: &Tree, source: &str) -> Vec<Signature>;
}

/// Language tag → extractor lookup.
#[derive(Default)]
pub struct ExtractorRegistry {
    extractors: HashMap<&'static str, Box<dyn SignatureExtractor>>,
}

impl ExtractorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every built-in extractor.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(EcmaScriptExtractor::typescript()));
        registry.register(Box::new(EcmaScriptExtractor::javascript()));
        registry.register(Box::new(PythonExtractor));
        registry.register(Box::new(RustExtractor));
        registry.register(Box::new(GoExtractor));
        registry.register(Box::new(SwiftExtractor));
        registry
    }

    /// Register an extractor, replacing any previous one for the same tag.
    pub fn register(&mut self, extractor: Box<dyn SignatureExtractor>) {
        self.extractors.insert(extractor.language(), extractor);
    }

    pub fn get(&self, language: &str) -> Option<&dyn SignatureExtractor> {
        self.extractors.get(language).map(|e| e.as_ref())
    }

    /// Registered tags, sorted.
    pub fn languages(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.extractors.keys().copied().collect();
        tags.sort_unstable();
        tags
    }
}

// ============================================================================
// Shared tree helpers
// ============================================================================

pub(crate) fn node_text<'a>(node: Node, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

pub(crate) fn field_text<'a>(node: Node, field: &str, source: &'a str) -> Option<&'a str> {
    node.child_by_field_name(field)
        .map(|n| node_text(n, source))
        .filter(|t| !t.is_empty())
}

pub(crate) fn children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.children(&mut cursor).collect()
}

pub(crate) fn named_children(node: Node) -> Vec<Node> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub(crate) fn has_child_kind(node: Node, kind: &str) -> bool {
    children(node).iter().any(|c| c.kind() == kind)
}
