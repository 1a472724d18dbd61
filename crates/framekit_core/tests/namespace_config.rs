use framekit_core::{
    init_logging, init_logging_from_config, logging_status, method, method_set, noop_constructor,
    ClassMetadata, ConfigSource, Framework, FrameworkConfig, FrameworkError, MethodSet,
    LoggingError, NamespaceEntry, NamespaceError,
};
use serde_json::{json, Map, Value};

struct FixedSource;

impl ConfigSource for FixedSource {
    fn bundle_config(&self, bundle_id: &str) -> Option<Map<String, Value>> {
        let mut config = Map::new();
        config.insert("source".to_string(), json!(format!("fixed:{bundle_id}")));
        Some(config)
    }
}

fn recording_start() -> MethodSet {
    method_set([(
        "start",
        method(|instance, _| {
            let source = instance.get("source").cloned().unwrap_or(Value::Null);
            instance.set("started_with", source);
            Ok(Value::Null)
        }),
    )])
}

#[test]
fn config_document_drives_debug_mode_and_overrides() {
    let config = FrameworkConfig::from_json_str(
        r#"{ "debug": true, "bundles": { "layers": { "source": "json" } } }"#,
    )
    .unwrap();
    let mut framework = Framework::with_config(config).unwrap();
    assert!(framework.is_debug());

    framework
        .bundle_cls(Some("layers"), "app.Layers")
        .unwrap()
        .methods(None, recording_start())
        .unwrap();
    let id = framework.start_bundle("layers", None).unwrap();
    assert_eq!(
        framework.instance(id).unwrap().get("started_with"),
        Some(&json!("json"))
    );
}

#[test]
fn replaced_config_source_is_consulted_on_start() {
    let mut framework = Framework::new().unwrap();
    framework.set_config_source(Box::new(FixedSource));
    framework
        .bundle_cls(Some("layers"), "app.Layers")
        .unwrap()
        .methods(None, recording_start())
        .unwrap();

    let id = framework.start_bundle("layers", None).unwrap();
    assert_eq!(
        framework.instance(id).unwrap().get("started_with"),
        Some(&json!("fixed:layers"))
    );
}

#[test]
fn installed_bundles_are_listed_under_bundle_branch() {
    let mut framework = Framework::new().unwrap();
    framework.bundle_cls(Some("map"), "app.Map").unwrap();
    framework.bundle_cls(Some("search"), "app.Search").unwrap();

    assert_eq!(
        framework.namespace().children("framekit.bundles"),
        vec!["map".to_string(), "search".to_string()]
    );
    assert_eq!(framework.namespace().children("app"), vec!["Map", "Search"]);
}

#[test]
fn bundle_ids_must_form_valid_paths() {
    let mut framework = Framework::new().unwrap();
    let err = framework
        .bundle_cls(Some("bad id"), "app.Bad")
        .err()
        .unwrap();
    assert!(matches!(
        err,
        FrameworkError::Namespace(NamespaceError::InvalidPath(_))
    ));
    assert!(framework.bundles().definition("bad id").is_none());
    assert!(!framework.classes().contains("app.Bad"));
}

#[test]
fn lookup_path_falls_back_to_registry_classes() {
    let mut framework = Framework::new().unwrap();
    framework
        .classes_mut()
        .define(
            "direct.Declared",
            noop_constructor(),
            MethodSet::new(),
            ClassMetadata::new(),
        )
        .unwrap();

    assert!(framework.namespace().get("direct.Declared").is_none());
    assert_eq!(
        framework.lookup_path("direct.Declared"),
        Some(NamespaceEntry::Class("direct.Declared".to_string()))
    );
    assert!(framework.lookup_path("direct.Missing").is_none());
}

#[test]
fn installed_class_bundle_uses_declared_metadata() {
    let mut framework = Framework::new().unwrap();
    framework
        .cls(
            Some("app.Declared"),
            Some(noop_constructor()),
            recording_start(),
            ClassMetadata::new()
                .with_protocol("proto.Declared")
                .with_manifest("Bundle-Identifier", json!("declared")),
        )
        .unwrap();
    framework
        .install_bundle_class("declared", "app.Declared")
        .unwrap();

    let definition = framework.bundles().definition("declared").unwrap();
    assert_eq!(definition.metadata().bundle_identifier(), Some("declared"));
    assert!(definition.metadata().has_protocol("proto.Declared"));
    framework.start_bundle("declared", None).unwrap();
}

#[test]
fn globals_replace_previous_values() {
    let mut framework = Framework::new().unwrap();
    assert_eq!(framework.set_global("sandbox", json!("first")).unwrap(), None);
    assert_eq!(
        framework.set_global("sandbox", json!("second")).unwrap(),
        Some(json!("first"))
    );
    assert_eq!(
        framework.lookup_path("framekit.globals.sandbox"),
        Some(NamespaceEntry::Value(json!("second")))
    );
}

#[test]
fn logging_initializes_once_from_config() {
    let temp = tempfile::tempdir().unwrap();
    let dir = temp.path().join("logs");
    let config = FrameworkConfig::from_json_str(&format!(
        r#"{{ "debug": true, "log_level": "info", "log_dir": {} }}"#,
        json!(dir.to_string_lossy())
    ))
    .unwrap();

    let settings = init_logging_from_config(&config, temp.path()).unwrap();
    assert_eq!(settings.level, "debug");
    assert_eq!(settings.log_dir, dir);
    assert_eq!(logging_status(), Some(("debug", dir.clone())));
    assert!(dir.is_dir());

    init_logging("debug", &dir.to_string_lossy()).unwrap();
    let err = init_logging("info", &dir.to_string_lossy()).unwrap_err();
    assert!(matches!(err, LoggingError::AlreadyActive { .. }));
    let other = temp.path().join("other");
    let err = init_logging("debug", &other.to_string_lossy()).unwrap_err();
    assert!(matches!(err, LoggingError::AlreadyActive { .. }));
}
