use crate::registry::category::{CategoryKind, CategorySpec};
use crate::registry::tree::{LocPoint, LocSpan, PLUGINS_SEGMENT, RegistryNode, RegistryTree, ROOT_MARKER};
use crate::syntax::{self, SyntaxIndex};
use tree_sitter::Node;

/// Sentinel identifier the convention assigns category factories onto:
/// `internals.controller = (server) => {...}`.
pub const NAMESPACE_IDENT: &str = "internals";

/// Property name carrying the factory for every non-model category.
pub const CONTROLLER_PROPERTY: &str = "controller";

/// Property name carrying a model factory.
pub const MODEL_PROPERTY: &str = "Model";

/// Extract one file's category subtree, or None when the file does not
/// match the category's convention. Structural mismatches are never
/// errors; the caller just skips the file.
pub fn extract_category(
    index: &SyntaxIndex<'_>,
    spec: &CategorySpec,
    file_path: &str,
) -> Option<RegistryTree> {
    if index.has_errors() {
        return None;
    }
    match spec.kind {
        CategoryKind::Model => extract_model(index, spec, file_path),
        _ => extract_member_category(index, spec, file_path),
    }
}

/// The local parameter name bound to the injected root object, taken
/// from the file's namespace assignments. The last matching assignment
/// wins, mirroring how the file would behave at load time.
pub fn find_root_argument(index: &SyntaxIndex<'_>, properties: &[&str]) -> Option<String> {
    let mut argument_name = None;
    for node in syntax::descendants(index.root()) {
        if node.kind() != "assignment_expression" {
            continue;
        }
        let Some(function) = namespace_assignment_rhs(index, node, properties) else {
            continue;
        };
        if let Some(param) = function_param_name(index, function) {
            argument_name = Some(param);
        }
    }
    argument_name
}

fn extract_member_category(
    index: &SyntaxIndex<'_>,
    spec: &CategorySpec,
    file_path: &str,
) -> Option<RegistryTree> {
    find_root_argument(index, &[CONTROLLER_PROPERTY])?;
    let members = find_returned_members(index, &[CONTROLLER_PROPERTY])?;

    let name_property = spec.name_property?;
    let name_node = members
        .iter()
        .find(|(key, _)| key == name_property)
        .map(|(_, node)| *node)?;
    let declared_name = syntax::string_literal_value(name_node, index.source())?;

    let mut tree = RegistryTree::new();
    for (member_name, value_node) in &members {
        if member_name == name_property {
            continue;
        }
        let node = registry_node(index, file_path, member_name, *value_node);
        let path = [
            ROOT_MARKER,
            PLUGINS_SEGMENT,
            spec.marker,
            declared_name.as_str(),
            member_name.as_str(),
        ];
        tree.add_node(&path, node).ok()?;
    }
    if tree.is_empty() {
        return None;
    }
    Some(tree)
}

fn extract_model(
    index: &SyntaxIndex<'_>,
    spec: &CategorySpec,
    file_path: &str,
) -> Option<RegistryTree> {
    let function = find_namespace_function(index, &[MODEL_PROPERTY])?;
    function_param_name(index, function)?;
    let block = statement_block(function)?;
    let return_stmt = find_return_statement(block)?;
    let argument = return_argument(return_stmt)?;

    let call = match argument.kind() {
        "call_expression" => argument,
        "identifier" => {
            let name = syntax::node_text(argument, index.source());
            local_call_expression(index, &name)?
        }
        _ => return None,
    };
    let model_name = model_name_from_call(index, call)?;

    let span = syntax::span(return_stmt);
    let node = RegistryNode {
        path: file_path.to_string(),
        name: model_name.clone(),
        start: span.start_byte,
        end: span.end_byte,
        loc: Some(loc_span(span)),
    };
    let mut tree = RegistryTree::new();
    let path = [ROOT_MARKER, PLUGINS_SEGMENT, spec.marker, model_name.as_str()];
    tree.add_node(&path, node).ok()?;
    Some(tree)
}

fn registry_node(
    index: &SyntaxIndex<'_>,
    file_path: &str,
    member_name: &str,
    value_node: Node<'_>,
) -> RegistryNode {
    let span = index.span(value_node);
    RegistryNode {
        path: file_path.to_string(),
        name: member_name.to_string(),
        start: span.start_byte,
        end: span.end_byte,
        loc: Some(loc_span(span)),
    }
}

fn loc_span(span: crate::syntax::Span) -> LocSpan {
    LocSpan {
        start: LocPoint {
            line: span.start_line,
            column: span.start_col,
        },
        end: LocPoint {
            line: span.end_line,
            column: span.end_col,
        },
    }
}

/// The member map of the object a category factory returns. Properties
/// arrive in declaration order; duplicate keys keep the last value,
/// matching object literal semantics.
fn find_returned_members<'t>(
    index: &'t SyntaxIndex<'_>,
    properties: &[&str],
) -> Option<Vec<(String, Node<'t>)>> {
    let function = find_namespace_function(index, properties)?;

    // Expression-bodied arrow returning the object directly.
    if let Some(object) = expression_body_object(function) {
        let entries = object_member_entries(index, object, None);
        return if entries.is_empty() { None } else { Some(entries) };
    }

    let block = statement_block(function)?;
    let return_stmt = find_return_statement(block)?;
    let argument = return_argument(return_stmt)?;

    let entries = match argument.kind() {
        "object" => object_member_entries(index, argument, Some(block)),
        "identifier" => {
            let name = syntax::node_text(argument, index.source());
            let object = local_object_literal(index, block, &name)?;
            object_member_entries(index, object, Some(block))
        }
        _ => return None,
    };
    if entries.is_empty() { None } else { Some(entries) }
}

/// Last namespace-assigned factory function in the file, so redefinition
/// behaves the way the file would at load time.
fn find_namespace_function<'t>(
    index: &'t SyntaxIndex<'_>,
    properties: &[&str],
) -> Option<Node<'t>> {
    let mut found = None;
    for node in syntax::descendants(index.root()) {
        if node.kind() != "assignment_expression" {
            continue;
        }
        if let Some(function) = namespace_assignment_rhs(index, node, properties) {
            found = Some(function);
        }
    }
    found
}

/// Match `internals.<prop> = <fn>` and return the function node when
/// the right-hand side is a single-parameter arrow or function
/// expression.
fn namespace_assignment_rhs<'t>(
    index: &SyntaxIndex<'_>,
    assignment: Node<'t>,
    properties: &[&str],
) -> Option<Node<'t>> {
    let left = assignment.child_by_field_name("left")?;
    if left.kind() != "member_expression" {
        return None;
    }
    let object = left.child_by_field_name("object")?;
    if object.kind() != "identifier" || syntax::node_text(object, index.source()) != NAMESPACE_IDENT
    {
        return None;
    }
    let property = left.child_by_field_name("property")?;
    if property.kind() != "property_identifier" {
        return None;
    }
    let property_name = syntax::node_text(property, index.source());
    if !properties.iter().any(|candidate| *candidate == property_name) {
        return None;
    }
    let right = assignment.child_by_field_name("right")?;
    match right.kind() {
        "arrow_function" | "function_expression" | "function" => Some(right),
        _ => None,
    }
}

fn function_param_name(index: &SyntaxIndex<'_>, function: Node<'_>) -> Option<String> {
    // Parenthesis-free arrow parameter.
    if let Some(param) = function.child_by_field_name("parameter") {
        if param.kind() == "identifier" {
            return Some(syntax::node_text(param, index.source()));
        }
        return None;
    }
    let params = function.child_by_field_name("parameters")?;
    let first = syntax::named_children(params).into_iter().next()?;
    if first.kind() != "identifier" {
        return None;
    }
    Some(syntax::node_text(first, index.source()))
}

/// Object literal body of an expression-bodied arrow, unwrapping the
/// parenthesization `(server) => ({...})`.
fn expression_body_object(function: Node<'_>) -> Option<Node<'_>> {
    if function.kind() != "arrow_function" {
        return None;
    }
    let body = function.child_by_field_name("body")?;
    match body.kind() {
        "object" => Some(body),
        "parenthesized_expression" => {
            let inner = syntax::named_children(body).into_iter().next()?;
            (inner.kind() == "object").then_some(inner)
        }
        _ => None,
    }
}

fn statement_block(function: Node<'_>) -> Option<Node<'_>> {
    let body = function.child_by_field_name("body")?;
    (body.kind() == "statement_block").then_some(body)
}

/// First top-level return statement of a block. Nested function bodies
/// are intentionally not searched.
fn find_return_statement(block: Node<'_>) -> Option<Node<'_>> {
    syntax::named_children(block)
        .into_iter()
        .find(|node| node.kind() == "return_statement")
}

fn return_argument(return_stmt: Node<'_>) -> Option<Node<'_>> {
    let argument = syntax::named_children(return_stmt).into_iter().next()?;
    match argument.kind() {
        "parenthesized_expression" => syntax::named_children(argument).into_iter().next(),
        _ => Some(argument),
    }
}

/// Flatten an object literal into (member name, value node) entries.
/// Spread elements are expanded by resolving the spread source to a
/// local object literal in `scope`; bare identifier values naming a
/// function declared elsewhere in the file resolve to that function's
/// node.
fn object_member_entries<'t>(
    index: &'t SyntaxIndex<'_>,
    object: Node<'t>,
    scope: Option<Node<'t>>,
) -> Vec<(String, Node<'t>)> {
    let mut entries: Vec<(String, Node<'t>)> = Vec::new();
    let mut push = |key: String, value: Node<'t>| {
        entries.retain(|(existing, _)| *existing != key);
        entries.push((key, value));
    };

    for child in syntax::named_children(object) {
        match child.kind() {
            "pair" => {
                let Some(key_node) = child.child_by_field_name("key") else {
                    continue;
                };
                let Some(key) = property_key_name(index, key_node) else {
                    continue;
                };
                let Some(value) = child.child_by_field_name("value") else {
                    continue;
                };
                let value = resolve_identifier_value(index, value);
                push(key, value);
            }
            "method_definition" => {
                let Some(name_node) = child.child_by_field_name("name") else {
                    continue;
                };
                let Some(key) = property_key_name(index, name_node) else {
                    continue;
                };
                push(key, child);
            }
            "shorthand_property_identifier" => {
                let key = syntax::node_text(child, index.source());
                if key.is_empty() {
                    continue;
                }
                let value = resolve_identifier_value(index, child);
                push(key, value);
            }
            "spread_element" => {
                let Some(argument) = syntax::named_children(child).into_iter().next() else {
                    continue;
                };
                if argument.kind() != "identifier" {
                    continue;
                }
                let Some(scope) = scope else { continue };
                let name = syntax::node_text(argument, index.source());
                if let Some(source_object) = local_object_literal(index, scope, &name) {
                    for (key, value) in object_member_entries(index, source_object, Some(scope)) {
                        push(key, value);
                    }
                }
            }
            _ => {}
        }
    }
    entries
}

fn property_key_name(index: &SyntaxIndex<'_>, key_node: Node<'_>) -> Option<String> {
    match key_node.kind() {
        "property_identifier" => Some(syntax::node_text(key_node, index.source())),
        "string" => syntax::string_literal_value(key_node, index.source()),
        "number" => Some(syntax::node_text(key_node, index.source())),
        _ => None,
    }
}

/// A bare identifier value pointing at a function declared elsewhere in
/// the file resolves to that function's node; anything else stays put.
fn resolve_identifier_value<'t>(index: &'t SyntaxIndex<'_>, value: Node<'t>) -> Node<'t> {
    let kind = value.kind();
    if kind != "identifier" && kind != "shorthand_property_identifier" {
        return value;
    }
    let name = syntax::node_text(value, index.source());
    local_function_node(index, &name).unwrap_or(value)
}

/// Variable bound to an object literal inside `scope`.
fn local_object_literal<'t>(
    index: &'t SyntaxIndex<'_>,
    scope: Node<'t>,
    name: &str,
) -> Option<Node<'t>> {
    for node in syntax::descendants(scope) {
        if node.kind() != "variable_declarator" {
            continue;
        }
        let Some(id) = node.child_by_field_name("name") else {
            continue;
        };
        if id.kind() != "identifier" || syntax::node_text(id, index.source()) != name {
            continue;
        }
        let Some(value) = node.child_by_field_name("value") else {
            continue;
        };
        if value.kind() == "object" {
            return Some(value);
        }
    }
    None
}

/// Function declaration (or variable bound to a function/arrow) named
/// `name`, searched across the whole file.
fn local_function_node<'t>(index: &'t SyntaxIndex<'_>, name: &str) -> Option<Node<'t>> {
    for node in syntax::descendants(index.root()) {
        match node.kind() {
            "function_declaration" | "generator_function_declaration" => {
                let Some(id) = node.child_by_field_name("name") else {
                    continue;
                };
                if syntax::node_text(id, index.source()) == name {
                    return Some(node);
                }
            }
            "variable_declarator" => {
                let Some(id) = node.child_by_field_name("name") else {
                    continue;
                };
                if id.kind() != "identifier" || syntax::node_text(id, index.source()) != name {
                    continue;
                }
                let Some(value) = node.child_by_field_name("value") else {
                    continue;
                };
                if matches!(value.kind(), "arrow_function" | "function_expression" | "function") {
                    return Some(value);
                }
            }
            _ => {}
        }
    }
    None
}

/// Call expression bound to a local variable, for models returned via
/// an intermediate `const user = server.models.define(...)`.
fn local_call_expression<'t>(index: &'t SyntaxIndex<'_>, name: &str) -> Option<Node<'t>> {
    let mut found = None;
    for node in syntax::descendants(index.root()) {
        if node.kind() != "variable_declarator" {
            continue;
        }
        let Some(id) = node.child_by_field_name("name") else {
            continue;
        };
        if id.kind() != "identifier" || syntax::node_text(id, index.source()) != name {
            continue;
        }
        let Some(value) = node.child_by_field_name("value") else {
            continue;
        };
        if value.kind() == "call_expression" {
            found = Some(value);
        }
    }
    found
}

/// `<recv>.model("Name", ...)` / `<recv>.define("Name", ...)` with a
/// string-literal first argument.
fn model_name_from_call(index: &SyntaxIndex<'_>, call: Node<'_>) -> Option<String> {
    let callee = call.child_by_field_name("function")?;
    if callee.kind() != "member_expression" {
        return None;
    }
    let object = callee.child_by_field_name("object")?;
    if object.kind() != "identifier" {
        return None;
    }
    let property = callee.child_by_field_name("property")?;
    if property.kind() != "property_identifier" {
        return None;
    }
    let method = syntax::node_text(property, index.source());
    if method != "model" && method != "define" {
        return None;
    }
    let arguments = call.child_by_field_name("arguments")?;
    let first = syntax::named_children(arguments).into_iter().next()?;
    syntax::string_literal_value(first, index.source())
}
