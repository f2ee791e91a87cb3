use ridx::resolve::graph::AliasGraph;

fn parts(segments: &[&str]) -> Vec<String> {
    segments.iter().map(|s| s.to_string()).collect()
}

#[test]
fn chain_edges_point_rightmost_to_leftmost() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["server", "plugins", "core-services", "EldService"]));

    assert_eq!(graph.outgoing("EldService"), vec!["core-services"]);
    assert_eq!(graph.outgoing("core-services"), vec!["plugins"]);
    assert_eq!(graph.outgoing("plugins"), vec!["server"]);
    assert!(graph.outgoing("server").is_empty());
}

#[test]
fn single_segment_chain_contributes_nothing() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["alone"]));
    assert!(!graph.contains("alone"));
}

#[test]
fn assignment_flags_target_and_links_to_terminal() {
    let mut graph = AliasGraph::new();
    graph.add_assignment(
        "eldService",
        &parts(&["server", "plugins", "core-services", "EldService"]),
    );

    assert!(graph.is_assignment_target("eldService"));
    assert!(!graph.is_assignment_target("EldService"));
    assert_eq!(graph.outgoing("eldService"), vec!["EldService"]);
    assert_eq!(graph.outgoing("EldService"), vec!["core-services"]);
}

#[test]
fn single_segment_assignment_is_direct_alias() {
    let mut graph = AliasGraph::new();
    graph.add_assignment("alias", &parts(&["original"]));
    assert!(graph.is_assignment_target("alias"));
    assert_eq!(graph.outgoing("alias"), vec!["original"]);
}

#[test]
fn blacklisted_vertex_never_enters_graph() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["server", "plugins", "core-models", "user"]));

    assert!(!graph.contains("core-models"));
    // Edges touching the missing vertex are dropped; the rest stay.
    assert!(graph.outgoing("user").is_empty());
    assert_eq!(graph.outgoing("plugins"), vec!["server"]);
}

#[test]
fn duplicate_edges_collapse() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["a", "b"]));
    graph.add_chain(&parts(&["a", "b"]));
    assert_eq!(graph.outgoing("b"), vec!["a"]);
}

#[test]
fn path_through_required_waypoint() {
    let mut graph = AliasGraph::new();
    graph.add_assignment(
        "eldService",
        &parts(&["server", "plugins", "core-services", "EldService"]),
    );
    graph.add_chain(&parts(&["eldService", "checkEldPermission"]));

    let path = graph
        .first_path_through("checkEldPermission", "eldService", "server")
        .unwrap();
    let names: Vec<&str> = path.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "checkEldPermission",
            "eldService",
            "EldService",
            "core-services",
            "plugins",
            "server",
        ]
    );

    let flags: Vec<bool> = path.iter().map(|(_, target)| *target).collect();
    assert_eq!(flags, vec![false, true, false, false, false, false]);
}

#[test]
fn path_missing_waypoint_fails() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["a", "b"]));
    graph.add_chain(&parts(&["b", "c"]));
    // c -> b -> a exists, but "detour" is not on it.
    graph.add_chain(&parts(&["a", "detour"]));
    assert!(graph.first_path_through("c", "detour", "a").is_none());
    assert!(graph.first_path_through("c", "b", "a").is_some());
}

#[test]
fn path_with_unknown_endpoint_fails() {
    let mut graph = AliasGraph::new();
    graph.add_chain(&parts(&["a", "b"]));
    assert!(graph.first_path_through("b", "a", "nowhere").is_none());
    assert!(graph.first_path_through("nowhere", "b", "a").is_none());
}
