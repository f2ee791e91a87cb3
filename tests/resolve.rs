use ridx::registry::IndexBuilder;
use ridx::resolve::Resolver;
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
"#;

const OTHER_SERVICE: &str = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    return {
        serviceName: 'OtherService',
        checkEldPermission: async () => {
            return 'other';
        },
    };
};
"#;

const ELD_CONTROLLER: &str = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    const eldService = server.plugins['core-services'].EldService;

    return {
        controllerName: 'EldController',
        getPermission: async (request) => {
            const result = eldService.checkEldPermission(request.params.userId);
            return result;
        },
    };
};
"#;

fn write_file(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn line_of(text: &str, needle: &str) -> u32 {
    text.lines()
        .position(|line| line.contains(needle))
        .map(|idx| idx as u32 + 1)
        .unwrap()
}

fn seed_workspace() -> TempDir {
    let dir = TempDir::new().unwrap();
    write_file(dir.path(), "lib/modules/eld/eld-service.js", ELD_SERVICE);
    write_file(dir.path(), "lib/modules/eld/eld-controller.js", ELD_CONTROLLER);
    write_file(dir.path(), "lib/modules/other/other-service.js", OTHER_SERVICE);
    dir
}

#[test]
fn reference_resolves_to_service_member() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let line = line_of(ELD_CONTROLLER, "eldService.checkEldPermission(");
    let definition = resolver
        .resolve(ELD_CONTROLLER, "checkEldPermission", line)
        .unwrap();

    assert_eq!(definition.path, "lib/modules/eld/eld-service.js");
    assert_eq!(definition.name, "checkEldPermission");
    assert!(definition.text.contains("findByPk"));
    assert!(definition.text.starts_with("async (userId)"));

    let loc = definition.loc.unwrap();
    assert_eq!(loc.start.line, line_of(ELD_SERVICE, "checkEldPermission:"));
}

#[test]
fn resolution_is_deterministic() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let line = line_of(ELD_CONTROLLER, "eldService.checkEldPermission(");
    let first = resolver
        .resolve(ELD_CONTROLLER, "checkEldPermission", line)
        .unwrap();
    let second = resolver
        .resolve(ELD_CONTROLLER, "checkEldPermission", line)
        .unwrap();
    assert_eq!(first.path, second.path);
    assert_eq!(first.start, second.start);
    assert_eq!(first.end, second.end);
}

#[test]
fn reference_outside_proximity_window_fails() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let line = line_of(ELD_CONTROLLER, "eldService.checkEldPermission(");
    assert!(
        resolver
            .resolve(ELD_CONTROLLER, "checkEldPermission", line + 40)
            .is_none()
    );
}

#[test]
fn keywords_and_oversized_names_are_rejected() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    assert!(resolver.resolve(ELD_CONTROLLER, "return", 10).is_none());
    assert!(resolver.resolve(ELD_CONTROLLER, "", 10).is_none());
    let oversized = "a".repeat(64);
    assert!(resolver.resolve(ELD_CONTROLLER, &oversized, 10).is_none());
}

#[test]
fn unregistered_member_fails() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let document = ELD_CONTROLLER.replace("checkEldPermission", "noSuchMember");
    let line = line_of(&document, "eldService.noSuchMember(");
    assert!(resolver.resolve(&document, "noSuchMember", line).is_none());
}

#[test]
fn document_without_root_factory_fails() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let document = r#"
const eldService = { checkEldPermission: () => {} };
eldService.checkEldPermission(1);
"#;
    let line = line_of(document, "eldService.checkEldPermission(1)");
    assert!(resolver.resolve(document, "checkEldPermission", line).is_none());
}

#[test]
fn alias_trace_survives_intermediate_binding() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    // The service is reached through two local bindings instead of one.
    let document = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    const services = server.plugins['core-services'];
    const eldService = services.EldService;

    return {
        controllerName: 'AliasedController',
        getPermission: async (request) => {
            return eldService.checkEldPermission(request.params.userId);
        },
    };
};
"#;
    let line = line_of(document, "eldService.checkEldPermission(");
    let definition = resolver
        .resolve(document, "checkEldPermission", line)
        .unwrap();
    assert_eq!(definition.path, "lib/modules/eld/eld-service.js");
    assert_eq!(definition.name, "checkEldPermission");
}

#[test]
fn nearest_same_named_reference_wins() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    // The same member name is reached through two different services;
    // the candidate nearest the query line decides which one.
    let document = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    const eldService = server.plugins['core-services'].EldService;
    const otherService = server.plugins['core-services'].OtherService;

    return {
        controllerName: 'TwoRefsController',
        getPermission: async (request) => {
            return eldService.checkEldPermission(request.params.userId);
        },
        getOther: async (request) => {
            return otherService.checkEldPermission(request.params.userId);
        },
    };
};
"#;
    let near_eld = line_of(document, "eldService.checkEldPermission(");
    let near_other = line_of(document, "otherService.checkEldPermission(");

    let definition = resolver
        .resolve(document, "checkEldPermission", near_eld)
        .unwrap();
    assert_eq!(definition.path, "lib/modules/eld/eld-service.js");

    let definition = resolver
        .resolve(document, "checkEldPermission", near_other)
        .unwrap();
    assert_eq!(definition.path, "lib/modules/other/other-service.js");
}

#[test]
fn short_alias_chain_fails() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    // A chain that skips the category segment traces to fewer
    // canonical segments than a registered member ever produces.
    let document = r#"
'use strict';

const internals = {};

internals.controller = (server) => {

    return {
        controllerName: 'ShortController',
        getPermission: async () => {
            return server.plugins.checkEldPermission();
        },
    };
};
"#;
    let line = line_of(document, "server.plugins.checkEldPermission(");
    assert!(resolver.resolve(document, "checkEldPermission", line).is_none());
}

#[test]
fn handler_property_reference_resolves() {
    let dir = seed_workspace();
    let builder = IndexBuilder::new(dir.path().to_path_buf());
    let result = builder.build_full().unwrap();
    let resolver = Resolver::new(builder.workspace_root().to_path_buf(), &result.tree);

    let document = r#"
'use strict';

const internals = {};

internals.applyRoutes = (server) => {

    const eldService = server.plugins['core-services'].EldService;

    server.route({
        method: 'GET',
        path: '/eld/permission',
        handler: eldService.checkEldPermission,
    });
};
"#;
    let line = line_of(document, "handler: eldService.checkEldPermission");
    let definition = resolver
        .resolve(document, "checkEldPermission", line)
        .unwrap();
    assert_eq!(definition.path, "lib/modules/eld/eld-service.js");
}
