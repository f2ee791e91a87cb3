use anyhow::{Result, bail};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::BTreeMap;

/// Synthetic first segment of every canonical path. Files alias the
/// injected root object under arbitrary parameter names; lookups rename
/// that parameter back to this marker.
pub const ROOT_MARKER: &str = "server";

/// Segment under the root that holds every category subtree.
pub const PLUGINS_SEGMENT: &str = "plugins";

/// One declaration site: the defining file and the byte range of the
/// member's value. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryNode {
    pub path: String,
    pub name: String,
    pub start: usize,
    pub end: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub loc: Option<LocSpan>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocSpan {
    pub start: LocPoint,
    pub end: LocPoint,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocPoint {
    pub line: u32,
    pub column: u32,
}

/// Ordered trie keyed by path segments; leaves carry one RegistryNode.
#[derive(Debug, Clone, PartialEq)]
pub enum RegistryTree {
    Branch(BTreeMap<String, RegistryTree>),
    Leaf(RegistryNode),
}

impl Default for RegistryTree {
    fn default() -> Self {
        RegistryTree::Branch(BTreeMap::new())
    }
}

impl RegistryTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        match self {
            RegistryTree::Branch(children) => children.is_empty(),
            RegistryTree::Leaf(_) => false,
        }
    }

    /// Add a node at `path`, creating intermediate branches as needed.
    /// The final segment is replaced wholesale; an intermediate segment
    /// that lands on a leaf replaces that leaf with a fresh branch.
    /// Last write wins in both cases.
    pub fn add_node(&mut self, path: &[&str], node: RegistryNode) -> Result<()> {
        if path.is_empty() {
            bail!("path cannot be empty");
        }
        let children = match self {
            RegistryTree::Branch(children) => children,
            RegistryTree::Leaf(_) => {
                *self = RegistryTree::Branch(BTreeMap::new());
                match self {
                    RegistryTree::Branch(children) => children,
                    RegistryTree::Leaf(_) => unreachable!(),
                }
            }
        };
        let (current, rest) = (path[0], &path[1..]);
        if rest.is_empty() {
            children.insert(current.to_string(), RegistryTree::Leaf(node));
            return Ok(());
        }
        let child = children
            .entry(current.to_string())
            .or_insert_with(RegistryTree::new);
        child.add_node(rest, node)
    }

    pub fn get_node(&self, path: &[&str]) -> Option<&RegistryNode> {
        if path.is_empty() {
            return match self {
                RegistryTree::Leaf(node) => Some(node),
                RegistryTree::Branch(_) => None,
            };
        }
        match self {
            RegistryTree::Branch(children) => {
                children.get(path[0]).and_then(|child| child.get_node(&path[1..]))
            }
            RegistryTree::Leaf(_) => None,
        }
    }

    /// Structural union. Branches combine recursively; whenever the
    /// existing child and the incoming child disagree in kind, or the
    /// existing child is a leaf, the incoming subtree replaces it.
    /// Newest write wins.
    pub fn merge(&mut self, other: RegistryTree) {
        let RegistryTree::Branch(incoming) = other else {
            *self = other;
            return;
        };
        let children = match self {
            RegistryTree::Branch(children) => children,
            RegistryTree::Leaf(_) => {
                *self = RegistryTree::Branch(BTreeMap::new());
                match self {
                    RegistryTree::Branch(children) => children,
                    RegistryTree::Leaf(_) => unreachable!(),
                }
            }
        };
        for (key, incoming_child) in incoming {
            match children.get_mut(&key) {
                Some(existing @ RegistryTree::Branch(_)) => existing.merge(incoming_child),
                Some(existing) => *existing = incoming_child,
                None => {
                    children.insert(key, incoming_child);
                }
            }
        }
    }

    /// Rebind one branch key at a fixed depth. Depth 0 renames a child
    /// of this tree's root. Returns true when a rebind happened. Used
    /// to graft the synthetic root marker onto whatever parameter name
    /// a file uses for the injected root object.
    pub fn change_key_at_level(&mut self, depth: usize, old_key: &str, new_key: &str) -> bool {
        let RegistryTree::Branch(children) = self else {
            return false;
        };
        if depth == 0 {
            if old_key == new_key {
                return children.contains_key(old_key);
            }
            match children.remove(old_key) {
                Some(subtree) => {
                    children.insert(new_key.to_string(), subtree);
                    true
                }
                None => false,
            }
        } else {
            let mut changed = false;
            for child in children.values_mut() {
                changed |= child.change_key_at_level(depth - 1, old_key, new_key);
            }
            changed
        }
    }

    /// Nested tagged form used by the persisted cache: every node
    /// carries `__type__` of `branch` or `leaf`, leaf fields flattened
    /// beside the tag.
    pub fn to_json(&self) -> Value {
        match self {
            RegistryTree::Leaf(node) => {
                let mut map = Map::new();
                map.insert("__type__".to_string(), json!("leaf"));
                if let Value::Object(fields) = serde_json::to_value(node).unwrap_or(Value::Null) {
                    for (key, value) in fields {
                        map.insert(key, value);
                    }
                }
                Value::Object(map)
            }
            RegistryTree::Branch(children) => {
                let mut map = Map::new();
                map.insert("__type__".to_string(), json!("branch"));
                for (key, child) in children {
                    map.insert(key.clone(), child.to_json());
                }
                Value::Object(map)
            }
        }
    }

    pub fn from_json(value: &Value) -> Result<RegistryTree> {
        let Value::Object(map) = value else {
            bail!("registry tree node must be an object");
        };
        let tag = map.get("__type__").and_then(Value::as_str).unwrap_or("branch");
        if tag == "leaf" {
            let mut fields = map.clone();
            fields.remove("__type__");
            let node: RegistryNode = serde_json::from_value(Value::Object(fields))?;
            return Ok(RegistryTree::Leaf(node));
        }
        if tag != "branch" {
            bail!("unknown registry tree tag: {tag}");
        }
        let mut children = BTreeMap::new();
        for (key, child) in map {
            if key == "__type__" {
                continue;
            }
            children.insert(key.clone(), RegistryTree::from_json(child)?);
        }
        Ok(RegistryTree::Branch(children))
    }

    /// Total number of leaves.
    pub fn leaf_count(&self) -> usize {
        match self {
            RegistryTree::Leaf(_) => 1,
            RegistryTree::Branch(children) => {
                children.values().map(RegistryTree::leaf_count).sum()
            }
        }
    }
}
