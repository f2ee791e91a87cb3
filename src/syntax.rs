use anyhow::{Result, anyhow};
use tree_sitter::{Node, Parser, Tree};

/// Line/column plus byte span for a syntax node. Lines are 1-based,
/// columns 0-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start_line: u32,
    pub start_col: u32,
    pub end_line: u32,
    pub end_col: u32,
    pub start_byte: usize,
    pub end_byte: usize,
}

/// One parse of a JavaScript source file. Every structural query in the
/// crate goes through this wrapper instead of raw text.
pub struct SyntaxIndex<'a> {
    tree: Tree,
    source: &'a str,
}

impl<'a> SyntaxIndex<'a> {
    pub fn parse(source: &'a str) -> Result<Self> {
        let mut parser = Parser::new();
        let language = tree_sitter_javascript::LANGUAGE;
        parser.set_language(&language.into())?;
        let tree = parser
            .parse(source, None)
            .ok_or_else(|| anyhow!("parser produced no tree"))?;
        Ok(Self { tree, source })
    }

    pub fn root(&self) -> Node<'_> {
        self.tree.root_node()
    }

    pub fn source(&self) -> &str {
        self.source
    }

    /// True when the parse contains ERROR or missing nodes anywhere.
    pub fn has_errors(&self) -> bool {
        self.tree.root_node().has_error()
    }

    pub fn span(&self, node: Node<'_>) -> Span {
        span(node)
    }
}

pub fn span(node: Node<'_>) -> Span {
    let start = node.start_position();
    let end = node.end_position();
    Span {
        start_line: start.row as u32 + 1,
        start_col: start.column as u32,
        end_line: end.row as u32 + 1,
        end_col: end.column as u32,
        start_byte: node.start_byte(),
        end_byte: node.end_byte(),
    }
}

pub fn node_text(node: Node<'_>, source: &str) -> String {
    node.utf8_text(source.as_bytes())
        .unwrap_or_default()
        .to_string()
}

/// Collect every named descendant of `root`, root included, in
/// document order. Candidate selection tie-breaks on first occurrence,
/// so the order matters.
pub fn descendants<'t>(root: Node<'t>) -> Vec<Node<'t>> {
    let mut out = Vec::new();
    let mut stack = vec![root];
    while let Some(node) = stack.pop() {
        out.push(node);
        let mut cursor = node.walk();
        let children: Vec<_> = node.named_children(&mut cursor).collect();
        for child in children.into_iter().rev() {
            stack.push(child);
        }
    }
    out
}

pub fn named_children<'t>(node: Node<'t>) -> Vec<Node<'t>> {
    let mut cursor = node.walk();
    node.named_children(&mut cursor).collect()
}

pub fn unquote_string_literal(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    for quote in ['"', '\'', '`'] {
        if trimmed.len() >= 2 && trimmed.starts_with(quote) && trimmed.ends_with(quote) {
            return Some(trimmed[1..trimmed.len() - 1].to_string());
        }
    }
    None
}

/// Extract the string value of a `string` node, rejecting template
/// strings and anything with interpolation.
pub fn string_literal_value(node: Node<'_>, source: &str) -> Option<String> {
    if node.kind() != "string" {
        return None;
    }
    unquote_string_literal(&node_text(node, source))
}

pub fn is_access_chain_node(kind: &str) -> bool {
    kind == "member_expression" || kind == "subscript_expression"
}

/// Flatten a dotted/bracket access chain into ordered segment strings.
/// `root.plugins["core-services"].Foo` becomes
/// `[root, plugins, core-services, Foo]`. Literal subscripts are
/// normalized into the same segment space as identifier properties;
/// computed subscripts contribute nothing. A lone identifier yields one
/// segment.
pub fn access_chain_parts(node: Node<'_>, source: &str) -> Vec<String> {
    let mut parts = Vec::new();
    collect_chain_parts(node, source, &mut parts);
    parts
}

fn collect_chain_parts(node: Node<'_>, source: &str, parts: &mut Vec<String>) {
    match node.kind() {
        "identifier" => parts.push(node_text(node, source)),
        "member_expression" => {
            if let Some(object) = node.child_by_field_name("object") {
                collect_chain_base(object, source, parts);
            }
            if let Some(property) = node.child_by_field_name("property") {
                if property.kind() == "property_identifier" {
                    parts.push(node_text(property, source));
                }
            }
        }
        "subscript_expression" => {
            if let Some(object) = node.child_by_field_name("object") {
                collect_chain_base(object, source, parts);
            }
            if let Some(index) = node.child_by_field_name("index") {
                match index.kind() {
                    "string" => {
                        if let Some(value) = string_literal_value(index, source) {
                            parts.push(value);
                        }
                    }
                    "number" => parts.push(node_text(index, source)),
                    _ => {}
                }
            }
        }
        _ => {}
    }
}

fn collect_chain_base(node: Node<'_>, source: &str, parts: &mut Vec<String>) {
    match node.kind() {
        "identifier" => parts.push(node_text(node, source)),
        "member_expression" | "subscript_expression" => {
            collect_chain_parts(node, source, parts);
        }
        _ => {}
    }
}

/// Parse a snippet of expression text and return its outermost access
/// chain, or the lone identifier when no chain is present. Used when
/// tracing the right-hand side of a local assignment.
pub fn expression_chain_parts(code: &str) -> Vec<String> {
    let index = match SyntaxIndex::parse(code) {
        Ok(value) => value,
        Err(_) => return Vec::new(),
    };
    let mut chain = Vec::new();
    let mut lone_identifier = None;
    for node in descendants(index.root()) {
        if is_access_chain_node(node.kind()) && !is_chain_member(node) {
            let parts = access_chain_parts(node, index.source());
            if !parts.is_empty() {
                chain = parts;
            }
        } else if node.kind() == "identifier" && lone_identifier.is_none() {
            lone_identifier = Some(node_text(node, index.source()));
        }
    }
    if chain.is_empty() {
        match lone_identifier {
            Some(name) => vec![name],
            None => Vec::new(),
        }
    } else {
        chain
    }
}

/// True when the node is the object of an enclosing access chain, i.e.
/// not the outermost link.
fn is_chain_member(node: Node<'_>) -> bool {
    node.parent()
        .map(|parent| is_access_chain_node(parent.kind()))
        .unwrap_or(false)
}
