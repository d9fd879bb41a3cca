//! Python extractor.
//!
//! Module-level classes and functions plus one level of class members.
//! Leading-underscore names are private and dropped, except `__init__`,
//! which is kept but flagged unexported.

use tree_sitter::{Node, Tree};

use super::{field_text, has_child_kind, named_children, SignatureExtractor};
use crate::signature::{normalize_whitespace, Signature, SignatureKind};

const CONSTRUCTOR: &str = "__init__";

pub struct PythonExtractor;

impl SignatureExtractor for PythonExtractor {
    fn language(&self) -> &'static str {
        "python"
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<Signature> {
        let mut signatures = Vec::new();
        for node in named_children(tree.root_node()) {
            visit(node, source, 0, &mut signatures);
        }
        signatures
    }
}

fn visit(node: Node, source: &str, depth: usize, out: &mut Vec<Signature>) {
    let node = unwrap_decorated(node);
    match node.kind() {
        "class_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            if name.starts_with('_') {
                return;
            }
            out.push(Signature::new(
                name,
                SignatureKind::Class,
                format!("class {name}"),
                true,
            ));
            if depth == 0 {
                if let Some(body) = node.child_by_field_name("body") {
                    for member in named_children(body) {
                        visit(member, source, depth + 1, out);
                    }
                }
            }
        }
        "function_definition" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            if name.starts_with('_') && name != CONSTRUCTOR {
                return;
            }
            let mut sig = String::new();
            if has_child_kind(node, "async") {
                sig.push_str("async ");
            }
            sig.push_str("def ");
            sig.push_str(name);
            sig.push_str(field_text(node, "parameters", source).unwrap_or("()"));
            if let Some(return_type) = field_text(node, "return_type", source) {
                sig.push_str(" -> ");
                sig.push_str(return_type);
            }
            out.push(Signature::new(
                name,
                SignatureKind::Function,
                normalize_whitespace(&sig),
                !name.starts_with('_'),
            ));
        }
        _ => {}
    }
}

fn unwrap_decorated(node: Node) -> Node {
    if node.kind() == "decorated_definition" {
        node.child_by_field_name("definition").unwrap_or(node)
    } else {
        node
    }
}
