/// The five convention categories and how their files declare
/// themselves. `marker` is the key the application registers the
/// category under on the root object's plugins map; `suffix` is the
/// file-name convention used for globbing; `name_property` is the
/// member whose string literal names the category instance (models
/// derive their name from the model-construction call instead).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CategoryKind {
    Service,
    Controller,
    Config,
    Model,
    UtilityFunction,
}

#[derive(Debug, Clone, Copy)]
pub struct CategorySpec {
    pub kind: CategoryKind,
    pub marker: &'static str,
    pub suffix: &'static str,
    pub name_property: Option<&'static str>,
}

static CATEGORY_SPECS: &[CategorySpec] = &[
    CategorySpec {
        kind: CategoryKind::Config,
        marker: "core-config",
        suffix: "config",
        name_property: Some("configurationName"),
    },
    CategorySpec {
        kind: CategoryKind::Service,
        marker: "core-services",
        suffix: "service",
        name_property: Some("serviceName"),
    },
    CategorySpec {
        kind: CategoryKind::Controller,
        marker: "core-controller",
        suffix: "controller",
        name_property: Some("controllerName"),
    },
    CategorySpec {
        kind: CategoryKind::Model,
        marker: "core-models",
        suffix: "model",
        name_property: None,
    },
    CategorySpec {
        kind: CategoryKind::UtilityFunction,
        marker: "core-utility-functions",
        suffix: "function",
        name_property: Some("UtilityName"),
    },
];

pub fn category_specs() -> &'static [CategorySpec] {
    CATEGORY_SPECS
}

/// Category for a file name like `user-service.js`, matched on the
/// `-<suffix>` tail of the stem.
pub fn category_for_file_name(file_name: &str) -> Option<&'static CategorySpec> {
    let stem = file_name.strip_suffix(".js")?;
    CATEGORY_SPECS
        .iter()
        .find(|spec| stem.ends_with(&format!("-{}", spec.suffix)))
}
