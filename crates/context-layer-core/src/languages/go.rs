//! Go extractor.
//!
//! Package-level functions, methods and type specs. An identifier is exported
//! when its first letter is uppercase; lowercase declarations are kept but
//! flagged.

use tree_sitter::{Node, Tree};

use super::{field_text, named_children, SignatureExtractor};
use crate::signature::{normalize_whitespace, Signature, SignatureKind};

pub struct GoExtractor;

impl SignatureExtractor for GoExtractor {
    fn language(&self) -> &'static str {
        "go"
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<Signature> {
        let mut signatures = Vec::new();
        for node in named_children(tree.root_node()) {
            match node.kind() {
                "function_declaration" | "method_declaration" => {
                    if let Some(sig) = render_func(node, source) {
                        signatures.push(sig);
                    }
                }
                "type_declaration" => {
                    for spec in named_children(node) {
                        if let Some(sig) = render_type_spec(spec, source) {
                            signatures.push(sig);
                        }
                    }
                }
                _ => {}
            }
        }
        signatures
    }
}

fn is_exported(name: &str) -> bool {
    name.chars().next().is_some_and(char::is_uppercase)
}

fn render_func(node: Node, source: &str) -> Option<Signature> {
    let name = field_text(node, "name", source)?;
    let mut sig = String::from("func ");
    if let Some(receiver) = field_text(node, "receiver", source) {
        sig.push_str(receiver);
        sig.push(' ');
    }
    sig.push_str(name);
    if let Some(type_params) = field_text(node, "type_parameters", source) {
        sig.push_str(type_params);
    }
    sig.push_str(field_text(node, "parameters", source).unwrap_or("()"));
    if let Some(result) = field_text(node, "result", source) {
        sig.push(' ');
        sig.push_str(result);
    }
    Some(Signature::new(
        name,
        SignatureKind::Function,
        normalize_whitespace(&sig),
        is_exported(name),
    ))
}

fn render_type_spec(spec: Node, source: &str) -> Option<Signature> {
    if !matches!(spec.kind(), "type_spec" | "type_alias") {
        return None;
    }
    let name = field_text(spec, "name", source)?;
    let (kind, sig) = match spec.child_by_field_name("type").map(|t| t.kind()) {
        Some("struct_type") => (SignatureKind::Struct, format!("type {name} struct")),
        Some("interface_type") => (SignatureKind::Interface, format!("type {name} interface")),
        _ => (SignatureKind::Type, format!("type {name}")),
    };
    Some(Signature::new(name, kind, sig, is_exported(name)))
}
