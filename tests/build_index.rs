use ridx::cache;
use ridx::registry::IndexBuilder;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const ELD_SERVICE: &str = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    return {
        serviceName: 'EldService',
        checkEldPermission: async (userId) => {
            return server.plugins['core-models'].user.findByPk(userId);
        },
        listEldEvents: () => [],
    };
};

module.exports = internals.controller;
"#;

const ELD_CONTROLLER: &str = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    const eldService = server.plugins['core-services'].EldService;

    return {
        controllerName: 'EldController',
        getPermission: async (request) => {
            return eldService.checkEldPermission(request.params.userId);
        },
    };
};
"#;

const USER_MODEL: &str = r#"
'use strict';

const internals = {};

internals.Model = (sequelize) => {

    return sequelize.define('user', {
        name: { type: 'STRING' },
    });
};
"#;

const BROKEN_SERVICE: &str = "internals.controller = (server) => { return {{{";

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn seed_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    let root = dir.path();
    write_file(root, "lib/modules/eld/eld-service.js", ELD_SERVICE);
    write_file(root, "lib/modules/eld/eld-controller.js", ELD_CONTROLLER);
    write_file(root, "lib/modules/user/user-model.js", USER_MODEL);
    write_file(root, "lib/modules/bad/broken-service.js", BROKEN_SERVICE);
    write_file(root, "lib/util/helpers.js", "module.exports = {};");
    write_file(root, "node_modules/pkg/fake-service.js", ELD_SERVICE);
    dir
}

#[test]
fn full_build_indexes_matching_files() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();

    // Two service members, one controller member, one model.
    assert_eq!(result.tree.leaf_count(), 4);
    assert!(
        result
            .tree
            .get_node(&["server", "plugins", "core-services", "EldService", "checkEldPermission"])
            .is_some()
    );
    assert!(
        result
            .tree
            .get_node(&["server", "plugins", "core-controller", "EldController", "getPermission"])
            .is_some()
    );
    assert!(
        result
            .tree
            .get_node(&["server", "plugins", "core-models", "user"])
            .is_some()
    );

    assert_eq!(result.stats.files_scanned, 4);
    assert_eq!(result.stats.files_indexed, 3);
    assert_eq!(result.stats.files_skipped, 1);
    assert_eq!(result.stats.parse_warnings, 1);

    // Hashes are keyed by normalized relative path; node_modules is
    // never scanned.
    assert!(result.file_hashes.contains_key("lib/modules/eld/eld-service.js"));
    assert!(result.file_hashes.contains_key("lib/modules/bad/broken-service.js"));
    assert!(!result.file_hashes.keys().any(|key| key.contains("node_modules")));
}

#[test]
fn resolved_node_spans_slice_the_source() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();

    let node = result
        .tree
        .get_node(&["server", "plugins", "core-services", "EldService", "checkEldPermission"])
        .unwrap();
    let content = fs::read_to_string(dir.path().join(&node.path)).unwrap();
    let text = &content[node.start..node.end];
    assert!(text.contains("findByPk"));
}

#[test]
fn partial_build_merges_updated_member() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let mut result = builder.build_full().unwrap();
    let old_hash = result.file_hashes["lib/modules/eld/eld-service.js"].clone();

    let updated = ELD_SERVICE.replace(
        "listEldEvents: () => [],",
        "listEldEvents: () => [],\n        revokeEld: async () => true,",
    );
    write_file(dir.path(), "lib/modules/eld/eld-service.js", &updated);

    let partial = builder
        .build_partial(Path::new("lib/modules/eld/eld-service.js"))
        .unwrap()
        .unwrap();
    assert_eq!(partial.rel_path, "lib/modules/eld/eld-service.js");
    assert_ne!(partial.hash, old_hash);

    result.tree.merge(partial.tree);
    assert!(
        result
            .tree
            .get_node(&["server", "plugins", "core-services", "EldService", "revokeEld"])
            .is_some()
    );
    // Untouched categories survive the merge.
    assert!(
        result
            .tree
            .get_node(&["server", "plugins", "core-models", "user"])
            .is_some()
    );
}

#[test]
fn partial_build_ignores_unmatched_files() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    assert!(
        builder
            .build_partial(Path::new("lib/util/helpers.js"))
            .unwrap()
            .is_none()
    );
    assert!(
        builder
            .build_partial(Path::new("lib/modules/bad/broken-service.js"))
            .unwrap()
            .is_none()
    );
}

#[test]
fn cache_round_trip() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();

    cache::store(builder.workspace_root(), &result.tree, &result.file_hashes).unwrap();
    assert!(cache::cache_path(builder.workspace_root()).is_file());

    let restored = cache::load(builder.workspace_root()).unwrap();
    assert_eq!(restored.tree, result.tree);
    assert_eq!(restored.files, result.file_hashes);
}

#[test]
fn corrupt_cache_loads_as_none() {
    let dir = seed_workspace();
    let cache_file = cache::cache_path(dir.path());
    fs::create_dir_all(cache_file.parent().unwrap()).unwrap();
    fs::write(&cache_file, "not json").unwrap();
    assert!(cache::load(dir.path()).is_none());
}
