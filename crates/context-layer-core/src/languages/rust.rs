//! Rust extractor.
//!
//! Items at the crate level and inside inline `mod` blocks. Only a bare `pub`
//! marks an item exported; restricted visibility such as `pub(crate)` is kept
//! but flagged. `impl` blocks are skipped.

use tree_sitter::{Node, Tree};

use super::{children, field_text, named_children, node_text, SignatureExtractor};
use crate::signature::{normalize_whitespace, Signature, SignatureKind};

pub struct RustExtractor;

impl SignatureExtractor for RustExtractor {
    fn language(&self) -> &'static str {
        "rust"
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<Signature> {
        let mut signatures = Vec::new();
        for node in named_children(tree.root_node()) {
            visit(node, source, 0, true, &mut signatures);
        }
        signatures
    }
}

/// `parent_public` is false inside a non-`pub` module, which hides its items.
fn visit(node: Node, source: &str, depth: usize, parent_public: bool, out: &mut Vec<Signature>) {
    let visibility = visibility(node, source);
    let exported = parent_public && visibility == Some("pub");

    let keyword = match node.kind() {
        "function_item" | "function_signature_item" => {
            if let Some((name, rendered)) = render_function(node, source, visibility) {
                out.push(Signature::new(name, SignatureKind::Function, rendered, exported));
            }
            return;
        }
        "mod_item" => {
            if depth == 0 {
                if let Some(body) = node.child_by_field_name("body") {
                    for item in named_children(body) {
                        visit(item, source, depth + 1, exported, out);
                    }
                }
            }
            return;
        }
        "struct_item" => ("struct", SignatureKind::Struct),
        "enum_item" => ("enum", SignatureKind::Enum),
        "trait_item" => ("trait", SignatureKind::Trait),
        "type_item" => ("type", SignatureKind::Type),
        _ => return,
    };

    let Some(name) = field_text(node, "name", source) else {
        return;
    };
    let mut sig = String::new();
    if let Some(vis) = visibility {
        sig.push_str(vis);
        sig.push(' ');
    }
    sig.push_str(keyword.0);
    sig.push(' ');
    sig.push_str(name);
    if let Some(type_params) = field_text(node, "type_parameters", source) {
        sig.push_str(type_params);
    }
    out.push(Signature::new(
        name,
        keyword.1,
        normalize_whitespace(&sig),
        exported,
    ));
}

fn render_function(
    node: Node,
    source: &str,
    visibility: Option<&str>,
) -> Option<(String, String)> {
    let name = field_text(node, "name", source)?;
    let mut sig = String::new();
    if let Some(vis) = visibility {
        sig.push_str(vis);
        sig.push(' ');
    }
    if let Some(modifiers) = children(node)
        .into_iter()
        .find(|c| c.kind() == "function_modifiers")
    {
        sig.push_str(node_text(modifiers, source));
        sig.push(' ');
    }
    sig.push_str("fn ");
    sig.push_str(name);
    if let Some(type_params) = field_text(node, "type_parameters", source) {
        sig.push_str(type_params);
    }
    sig.push_str(field_text(node, "parameters", source).unwrap_or("()"));
    if let Some(return_type) = field_text(node, "return_type", source) {
        sig.push_str(" -> ");
        sig.push_str(return_type);
    }
    Some((name.to_string(), normalize_whitespace(&sig)))
}

fn visibility<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    children(node)
        .into_iter()
        .find(|c| c.kind() == "visibility_modifier")
        .map(|v| node_text(v, source))
}

#[cfg(test)]
mod tests {
    use crate::parser::{ParsingSession, SupportedLanguage};
    use crate::signature::SignatureKind;
    use pretty_assertions::assert_eq;

    fn rendered(source: &str) -> Vec<(String, bool)> {
        ParsingSession::global()
            .extract(SupportedLanguage::Rust, source)
            .into_iter()
            .map(|s| (s.signature, s.exported))
            .collect()
    }

    #[test]
    fn test_items_and_visibility() {
        let source = r#"
pub struct Manifest<T> { inner: T }
pub(crate) enum Status { Active }
trait Hidden {}
pub type Result<T> = std::result::Result<T, Error>;

pub async fn load(path: &Path) -> Result<Manifest> {
    todo!()
}

fn helper() {}

impl Manifest<u8> {
    pub fn method(&self) {}
}
"#;
        assert_eq!(
            rendered(source),
            vec![
                ("pub struct Manifest<T>".to_string(), true),
                ("pub(crate) enum Status".to_string(), false),
                ("trait Hidden".to_string(), false),
                ("pub type Result<T>".to_string(), true),
                (
                    "pub async fn load(path: &Path) -> Result<Manifest>".to_string(),
                    true
                ),
                ("fn helper()".to_string(), false),
            ]
        );
    }

    #[test]
    fn test_inline_module_one_level() {
        let source = r#"
pub mod api {
    pub fn serve() {}
    pub mod nested {
        pub fn too_deep() {}
    }
}
mod private {
    pub fn hidden() {}
}
"#;
        let sigs = ParsingSession::global().extract(SupportedLanguage::Rust, source);
        let names: Vec<_> = sigs.iter().map(|s| (s.name.as_str(), s.exported)).collect();
        assert_eq!(names, vec![("serve", true), ("hidden", false)]);
        assert_eq!(sigs[0].kind, SignatureKind::Function);
    }
}
