//! Swift extractor.
//!
//! Top-level types, protocols, functions and type aliases, plus the direct
//! members of type, protocol and extension bodies. `private` and
//! `fileprivate` declarations are dropped along with their members.

use tree_sitter::{Node, Tree};

use super::{children, field_text, named_children, node_text, SignatureExtractor};
use crate::signature::{normalize_whitespace, Signature, SignatureKind};

pub struct SwiftExtractor;

impl SignatureExtractor for SwiftExtractor {
    fn language(&self) -> &'static str {
        "swift"
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
    if is_private(node, source) {
        return;
    }

    match node.kind() {
        // tree-sitter-swift folds class, struct, actor, enum and extension
        // into `class_declaration`, distinguished by the keyword.
        "class_declaration" => {
            let keyword = declaration_keyword(node, source);
            if keyword != "extension" {
                let Some(name) = declaration_name(node, source) else {
                    return;
                };
                let kind = match keyword {
                    "struct" => SignatureKind::Struct,
                    "enum" => SignatureKind::Enum,
                    _ => SignatureKind::Class,
                };
                out.push(Signature::new(
                    name,
                    kind,
                    format!("{keyword} {name}"),
                    true,
                ));
            }
            visit_body(node, source, depth, out);
        }
        "protocol_declaration" => {
            let Some(name) = declaration_name(node, source) else {
                return;
            };
            out.push(Signature::new(
                name,
                SignatureKind::Protocol,
                format!("protocol {name}"),
                true,
            ));
            visit_body(node, source, depth, out);
        }
        "typealias_declaration" => {
            if let Some(name) = declaration_name(node, source) {
                out.push(Signature::new(
                    name,
                    SignatureKind::Type,
                    format!("typealias {name}"),
                    true,
                ));
            }
        }
        "function_declaration" | "protocol_function_declaration" => {
            if let Some(sig) = render_function(node, source) {
                out.push(sig);
            }
        }
        _ => {}
    }
}

fn visit_body(node: Node, source: &str, depth: usize, out: &mut Vec<Signature>) {
    if depth > 0 {
        return;
    }
    let body = node
        .child_by_field_name("body")
        .or_else(|| {
            children(node)
                .into_iter()
                .find(|c| c.kind().ends_with("_body"))
        });
    if let Some(body) = body {
        for member in named_children(body) {
            visit(member, source, depth + 1, out);
        }
    }
}

fn render_function(node: Node, source: &str) -> Option<Signature> {
    let name_node = node.child_by_field_name("name").or_else(|| {
        children(node)
            .into_iter()
            .find(|c| c.kind() == "simple_identifier")
    })?;
    let name = node_text(name_node, source);
    if name.is_empty() {
        return None;
    }

    // Everything between the name and the body: generics, parameters,
    // effects and the return clause.
    let end = node
        .child_by_field_name("body")
        .map(|b| b.start_byte())
        .unwrap_or_else(|| node.end_byte());
    let tail = source.get(name_node.end_byte()..end).unwrap_or("");

    Some(Signature::new(
        name,
        SignatureKind::Function,
        normalize_whitespace(&format!("func {name}{tail}")),
        true,
    ))
}

fn declaration_keyword<'a>(node: Node, source: &'a str) -> &'a str {
    if let Some(kind) = field_text(node, "declaration_kind", source) {
        return kind;
    }
    children(node)
        .into_iter()
        .map(|c| c.kind())
        .find(|k| matches!(*k, "class" | "struct" | "enum" | "actor" | "extension"))
        .unwrap_or("class")
}

fn declaration_name<'a>(node: Node, source: &'a str) -> Option<&'a str> {
    field_text(node, "name", source).or_else(|| {
        children(node)
            .into_iter()
            .find(|c| matches!(c.kind(), "type_identifier" | "simple_identifier"))
            .map(|c| node_text(c, source))
            .filter(|t| !t.is_empty())
    })
}

fn is_private(node: Node, source: &str) -> bool {
    children(node)
        .into_iter()
        .filter(|c| c.kind() == "modifiers")
        .flat_map(named_children)
        .filter(|m| m.kind() == "visibility_modifier")
        .any(|m| matches!(node_text(m, source).trim(), "private" | "fileprivate"))
}
