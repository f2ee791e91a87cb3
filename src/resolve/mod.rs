use crate::config::Config;
use crate::registry::extract;
use crate::registry::tree::{LocSpan, RegistryTree, ROOT_MARKER};
use crate::syntax::{self, SyntaxIndex};
use crate::util;
use serde::Serialize;
use std::path::PathBuf;
use tree_sitter::Node;

pub mod graph;

use graph::AliasGraph;

/// Reserved words that can never be a resolvable member name.
static JS_KEYWORDS: &[&str] = &[
    "await", "break", "case", "catch", "class", "const", "continue", "debugger", "default",
    "delete", "do", "else", "enum", "export", "extends", "false", "finally", "for", "function",
    "if", "import", "in", "instanceof", "let", "new", "null", "return", "static", "super",
    "switch", "this", "throw", "true", "try", "typeof", "var", "void", "while", "with", "yield",
];

/// A resolved definition: where the member is declared and its source
/// text.
#[derive(Debug, Clone, Serialize)]
pub struct Definition {
    pub path: String,
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<LocSpan>,
    pub text: String,
}

/// Per-query resolver over a shared registry tree snapshot. Stateless
/// between calls; every query parses its own document and builds its
/// own alias graphs.
pub struct Resolver<'a> {
    workspace_root: PathBuf,
    tree: &'a RegistryTree,
}

impl<'a> Resolver<'a> {
    pub fn new(workspace_root: PathBuf, tree: &'a RegistryTree) -> Self {
        Self {
            workspace_root,
            tree,
        }
    }

    /// Resolve `reference_name` as used near `line_number` (1-based) in
    /// `document_text` to its definition. Every failure mode returns
    /// None; the resolver never errors.
    pub fn resolve(
        &self,
        document_text: &str,
        reference_name: &str,
        line_number: u32,
    ) -> Option<Definition> {
        let config = Config::get();
        if !is_valid_reference_name(reference_name, config.max_reference_length) {
            return None;
        }

        let index = SyntaxIndex::parse(document_text).ok()?;
        if index.has_errors() {
            return None;
        }

        let root_argument = extract::find_root_argument(
            &index,
            &[extract::CONTROLLER_PROPERTY, "applyRoutes"],
        )?;

        let chain = find_reference_chain(
            &index,
            reference_name,
            line_number,
            config.proximity_lines,
        )?;

        let assignments = relevant_assignments(&index);
        let mut full_graph = AliasGraph::new();
        for (name, rhs_text) in &assignments {
            let mut parts = syntax::expression_chain_parts(rhs_text);
            if parts.is_empty() && !rhs_text.trim().is_empty() {
                parts = vec![rhs_text.trim().to_string()];
            }
            full_graph.add_assignment(name, &parts);
        }
        full_graph.add_chain(&chain);

        let mut chain_graph = AliasGraph::new();
        chain_graph.add_chain(&chain);
        let next_hop = chain_graph
            .outgoing(reference_name)
            .first()
            .map(|hop| hop.to_string())?;

        let path = full_graph.first_path_through(reference_name, &next_hop, &root_argument)?;

        let canonical: Vec<&str> = path
            .iter()
            .filter(|(_, is_assignment_target)| !is_assignment_target)
            .map(|(name, _)| name.as_str())
            .collect();
        if canonical.len() < config.min_canonical_hops {
            return None;
        }

        // The trace walks reference -> root, the tree is indexed
        // root -> leaf; reverse and graft the synthetic root marker
        // onto the file's local root parameter name.
        let mut lookup: Vec<&str> = canonical.into_iter().rev().collect();
        if let Some(head) = lookup.first_mut() {
            if *head == root_argument {
                *head = ROOT_MARKER;
            }
        }

        let node = self.tree.get_node(&lookup)?;
        let content = util::read_to_string(&self.workspace_root.join(&node.path)).ok()?;
        let text = util::slice_bytes(&content, node.start, node.end)?;
        Some(Definition {
            path: node.path.clone(),
            name: node.name.clone(),
            start: node.start,
            end: node.end,
            loc: node.loc,
            text,
        })
    }
}

fn is_valid_reference_name(name: &str, max_length: usize) -> bool {
    !name.is_empty() && name.len() < max_length && !JS_KEYWORDS.contains(&name)
}

/// The access chain nearest the query line whose terminal segment is
/// the reference name. Candidates come from member/subscript chains,
/// call-expression callees, and `handler:` property values; ties on
/// line distance keep the first candidate in document order.
fn find_reference_chain(
    index: &SyntaxIndex<'_>,
    reference_name: &str,
    line_number: u32,
    proximity_lines: u32,
) -> Option<Vec<String>> {
    let mut best: Option<Vec<String>> = None;
    let mut best_distance = u32::MAX;

    let mut consider = |parts: Vec<String>, line: u32| {
        if parts.last().map(String::as_str) != Some(reference_name) {
            return;
        }
        let distance = line.abs_diff(line_number);
        if distance <= proximity_lines && distance < best_distance {
            best_distance = distance;
            best = Some(parts);
        }
    };

    for node in syntax::descendants(index.root()) {
        match node.kind() {
            "member_expression" | "subscript_expression" => {
                let parts = syntax::access_chain_parts(node, index.source());
                consider(parts, syntax::span(node).start_line);
            }
            "call_expression" => {
                if let Some(callee) = node.child_by_field_name("function") {
                    if syntax::is_access_chain_node(callee.kind()) {
                        let parts = syntax::access_chain_parts(callee, index.source());
                        consider(parts, syntax::span(node).start_line);
                    }
                }
            }
            "pair" => {
                if let Some(parts) = handler_property_chain(index, node) {
                    consider(parts, syntax::span(node).start_line);
                }
            }
            _ => {}
        }
    }
    best
}

fn handler_property_chain(index: &SyntaxIndex<'_>, pair: Node<'_>) -> Option<Vec<String>> {
    let key = pair.child_by_field_name("key")?;
    if key.kind() != "property_identifier" || syntax::node_text(key, index.source()) != "handler" {
        return None;
    }
    let value = pair.child_by_field_name("value")?;
    if !syntax::is_access_chain_node(value.kind()) {
        return None;
    }
    Some(syntax::access_chain_parts(value, index.source()))
}

/// Local declarations worth tracing: identifiers that are the object of
/// some member access elsewhere in the file, bound by a non-function
/// initializer. Returned in document order, later declarations
/// overriding earlier ones.
fn relevant_assignments(index: &SyntaxIndex<'_>) -> Vec<(String, String)> {
    let mut relevant: Vec<String> = Vec::new();
    for node in syntax::descendants(index.root()) {
        if !syntax::is_access_chain_node(node.kind()) {
            continue;
        }
        let Some(object) = node.child_by_field_name("object") else {
            continue;
        };
        if object.kind() == "identifier" {
            let name = syntax::node_text(object, index.source());
            if !relevant.contains(&name) {
                relevant.push(name);
            }
        }
    }

    let mut assignments: Vec<(String, String)> = Vec::new();
    for node in syntax::descendants(index.root()) {
        if node.kind() != "variable_declarator" {
            continue;
        }
        let Some(id) = node.child_by_field_name("name") else {
            continue;
        };
        if id.kind() != "identifier" {
            continue;
        }
        let name = syntax::node_text(id, index.source());
        if !relevant.contains(&name) {
            continue;
        }
        let Some(value) = node.child_by_field_name("value") else {
            continue;
        };
        if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
            continue;
        }
        let rhs_text = syntax::node_text(value, index.source());
        assignments.retain(|(existing, _)| *existing != name);
        assignments.push((name, rhs_text));
    }
    assignments
}
