//! TypeScript and JavaScript extractor.
//!
//! Visibility comes from explicit `export` markers. Declarations without one
//! are kept but flagged unexported.

use tree_sitter::{Node, Tree};

use super::{children, field_text, has_child_kind, named_children, node_text, SignatureExtractor};
use crate::signature::{normalize_whitespace, Signature, SignatureKind};

/// Extractor for the ECMAScript family; one instance per registry tag.
pub struct EcmaScriptExtractor {
    tag: &'static str,
}

impl EcmaScriptExtractor {
    pub fn typescript() -> Self {
        Self { tag: "typescript" }
    }

    pub fn javascript() -> Self {
        Self { tag: "javascript" }
    }
}

impl SignatureExtractor for EcmaScriptExtractor {
    fn language(&self) -> &'static str {
        self.tag
    }

    fn extract(&self, tree: &Tree, source: &str) -> Vec<Signature> {
        let mut signatures = Vec::new();
        for node in named_children(tree.root_node()) {
            if node.kind() == "export_statement" {
                if let Some(declaration) = node.child_by_field_name("declaration") {
                    extract_declaration(declaration, source, true, &mut signatures);
                }
            } else {
                extract_declaration(node, source, false, &mut signatures);
            }
        }
        signatures
    }
}

fn extract_declaration(node: Node, source: &str, exported: bool, out: &mut Vec<Signature>) {
    match node.kind() {
        "function_declaration" | "generator_function_declaration" | "function_signature" => {
            let Some(name) = field_text(node, "name", source) else {
                return;
            };
            let mut sig = String::new();
            if has_child_kind(node, "async") {
                sig.push_str("async ");
            }
            sig.push_str("function ");
            if node.kind() == "generator_function_declaration" {
                sig.push('*');
            }
            sig.push_str(name);
            if let Some(type_params) = field_text(node, "type_parameters", source) {
                sig.push_str(type_params);
            }
            sig.push_str(field_text(node, "parameters", source).unwrap_or("()"));
            if let Some(return_type) = field_text(node, "return_type", source) {
                sig.push_str(return_type);
            }
            out.push(Signature::new(
                name,
                SignatureKind::Function,
                normalize_whitespace(&sig),
                exported,
            ));
        }
        "class_declaration" | "abstract_class_declaration" => {
            if let Some(name) = field_text(node, "name", source) {
                let prefix = if node.kind() == "abstract_class_declaration" {
                    "abstract class"
                } else {
                    "class"
                };
                out.push(Signature::new(
                    name,
                    SignatureKind::Class,
                    format!("{prefix} {name}"),
                    exported,
                ));
            }
        }
        "interface_declaration" => {
            push_named(node, source, SignatureKind::Interface, "interface", exported, out);
        }
        "type_alias_declaration" => {
            push_named(node, source, SignatureKind::Type, "type", exported, out);
        }
        "enum_declaration" => {
            push_named(node, source, SignatureKind::Enum, "enum", exported, out);
        }
        "lexical_declaration" | "variable_declaration" => {
            let keyword = children(node)
                .first()
                .map(|c| node_text(*c, source))
                .filter(|k| matches!(*k, "const" | "let" | "var"))
                .unwrap_or("const");
            for declarator in named_children(node) {
                if declarator.kind() != "variable_declarator" {
                    continue;
                }
                let Some(name) = field_text(declarator, "name", source) else {
                    continue;
                };
                let is_function = declarator
                    .child_by_field_name("value")
                    .is_some_and(|v| {
                        matches!(
                            v.kind(),
                            "arrow_function" | "function" | "function_expression"
                        )
                    });
                let kind = if is_function {
                    SignatureKind::Function
                } else {
                    SignatureKind::Variable
                };
                out.push(Signature::new(
                    name,
                    kind,
                    format!("{keyword} {name}"),
                    exported,
                ));
            }
        }
        _ => {}
    }
}

fn push_named(
    node: Node,
    source: &str,
    kind: SignatureKind,
    keyword: &str,
    exported: bool,
    out: &mut Vec<Signature>,
) {
    if let Some(name) = field_text(node, "name", source) {
        out.push(Signature::new(
            name,
            kind,
            format!("{keyword} {name}"),
            exported,
        ));
    }
}
