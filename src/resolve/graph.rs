use std::collections::HashMap;

/// Vertex names that never enter the graph. Model subtrees resolve
/// through a shorter path shape than the canonical five hops and are
/// excluded from alias tracing.
const BLACKLISTED_VERTICES: &[&str] = &["core-models"];

/// Per-query directed alias graph. A vertex is an identifier or
/// property-name string; an edge `u -> v` means "u resolves to v".
/// Vertices live in an arena and edges are adjacency lists over integer
/// ids; nothing survives the query that built the graph.
#[derive(Debug, Default)]
pub struct AliasGraph {
    names: Vec<String>,
    ids: HashMap<String, u32>,
    outgoing: Vec<Vec<u32>>,
    assignment_target: Vec<bool>,
}

impl AliasGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn intern(&mut self, name: &str) -> Option<u32> {
        if BLACKLISTED_VERTICES.contains(&name) {
            return None;
        }
        if let Some(&id) = self.ids.get(name) {
            return Some(id);
        }
        let id = self.names.len() as u32;
        self.names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        self.outgoing.push(Vec::new());
        self.assignment_target.push(false);
        Some(id)
    }

    fn add_edge(&mut self, source: &str, target: &str) {
        let Some(source_id) = self.intern(source) else {
            return;
        };
        let Some(target_id) = self.intern(target) else {
            return;
        };
        let edges = &mut self.outgoing[source_id as usize];
        if !edges.contains(&target_id) {
            edges.push(target_id);
        }
    }

    /// Chain `a.b.c` contributes vertices for every segment and edges
    /// rightmost to leftmost: `c -> b`, `b -> a`. Chains with fewer
    /// than two segments contribute nothing.
    pub fn add_chain(&mut self, parts: &[String]) {
        if parts.len() < 2 {
            return;
        }
        for part in parts {
            self.intern(part);
        }
        for window in parts.windows(2).rev() {
            self.add_edge(&window[1], &window[0]);
        }
    }

    /// Local declaration `name = <rhs>`. The bound identifier is
    /// flagged as an assignment target; a multi-segment right-hand side
    /// contributes its chain and an edge from the name to the chain's
    /// last segment, a single segment becomes a direct alias edge.
    pub fn add_assignment(&mut self, name: &str, rhs_parts: &[String]) {
        let Some(id) = self.intern(name) else {
            return;
        };
        self.assignment_target[id as usize] = true;
        match rhs_parts {
            [] => {}
            [single] => self.add_edge(name, single),
            _ => {
                self.add_chain(rhs_parts);
                if let Some(last) = rhs_parts.last() {
                    self.add_edge(name, last);
                }
            }
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.ids.contains_key(name)
    }

    pub fn is_assignment_target(&self, name: &str) -> bool {
        self.ids
            .get(name)
            .map(|&id| self.assignment_target[id as usize])
            .unwrap_or(false)
    }

    /// Names reachable over one outgoing edge, in insertion order.
    pub fn outgoing(&self, name: &str) -> Vec<&str> {
        let Some(&id) = self.ids.get(name) else {
            return Vec::new();
        };
        self.outgoing[id as usize]
            .iter()
            .map(|&target| self.names[target as usize].as_str())
            .collect()
    }

    /// First simple path from `source` to `target` that passes through
    /// `through`, found by depth-first search with visited-set
    /// backtracking. Each step carries the vertex name and its
    /// assignment-target flag.
    pub fn first_path_through(
        &self,
        source: &str,
        through: &str,
        target: &str,
    ) -> Option<Vec<(String, bool)>> {
        let source_id = *self.ids.get(source)?;
        let through_id = *self.ids.get(through)?;
        let target_id = *self.ids.get(target)?;

        let mut visited = vec![false; self.names.len()];
        let mut path = vec![source_id];
        visited[source_id as usize] = true;
        if self.dfs(source_id, through_id, target_id, &mut visited, &mut path) {
            Some(
                path.into_iter()
                    .map(|id| {
                        (
                            self.names[id as usize].clone(),
                            self.assignment_target[id as usize],
                        )
                    })
                    .collect(),
            )
        } else {
            None
        }
    }

    fn dfs(
        &self,
        current: u32,
        through: u32,
        target: u32,
        visited: &mut [bool],
        path: &mut Vec<u32>,
    ) -> bool {
        if current == target {
            return path.contains(&through);
        }
        for &next in &self.outgoing[current as usize] {
            if visited[next as usize] {
                continue;
            }
            visited[next as usize] = true;
            path.push(next);
            if self.dfs(next, through, target, visited, path) {
                return true;
            }
            path.pop();
            visited[next as usize] = false;
        }
        false
    }
}
