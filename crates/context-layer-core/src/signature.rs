//! Normalized declaration records produced by the language extractors.

use serde::{Deserialize, Serialize};

/// Category of an extracted declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SignatureKind {
    Function,
    Class,
    Interface,
    Type,
    Enum,
    Struct,
    Protocol,
    Trait,
    Variable,
}

impl SignatureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureKind::Function => "function",
            SignatureKind::Class => "class",
            SignatureKind::Interface => "interface",
            SignatureKind::Type => "type",
            SignatureKind::Enum => "enum",
            SignatureKind::Struct => "struct",
            SignatureKind::Protocol => "protocol",
            SignatureKind::Trait => "trait",
            SignatureKind::Variable => "variable",
        }
    }
}

impl std::fmt::Display for SignatureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A single top-level (or shallow-nested) declaration.
///
/// `signature` is rebuilt from structural fields, never copied verbatim from
/// the source, so it is stable across whitespace-only edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature {
    pub name: String,
    pub kind: SignatureKind,
    pub signature: String,
    pub exported: bool,
}

impl Signature {
    pub fn new(
        name: impl Into<String>,
        kind: SignatureKind,
        signature: impl Into<String>,
        exported: bool,
    ) -> Self {
        Self {
            name: name.into(),
            kind,
            signature: signature.into(),
            exported,
        }
    }
}

/// Signatures extracted from one source file, in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileCodemap {
    /// Path relative to the directory the codemap was generated for
    pub path: String,
    /// Language tag of the extractor that produced the signatures
    pub language: String,
    pub signatures: Vec<Signature>,
}

impl FileCodemap {
    /// Signatures that appear in rendered output.
    pub fn exported(&self) -> impl Iterator<Item = &Signature> {
        self.signatures.iter().filter(|s| s.exported)
    }

    pub fn has_exported(&self) -> bool {
        self.signatures.iter().any(|s| s.exported)
    }
}

/// Collapse whitespace runs to single spaces and drop padding inside
/// brackets and before commas.
///
/// `fn f( a:  i32 ,b: u8 )` and `fn f(a: i32, b: u8)` both normalize to
/// `fn f(a: i32, b: u8)`.
pub fn normalize_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut pending_space = false;

    for ch in text.chars() {
        if ch.is_whitespace() {
            pending_space = !out.is_empty();
            continue;
        }
        if pending_space {
            let after_open = matches!(out.chars().last(), Some('(' | '['));
            let before_close = matches!(ch, ')' | ']' | ',');
            if !after_open && !before_close {
                out.push(' ');
            }
            pending_space = false;
        }
        out.push(ch);
        if ch == ',' {
            pending_space = true;
        }
    }

    out
}
