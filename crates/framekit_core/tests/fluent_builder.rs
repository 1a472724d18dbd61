use framekit_core::{
    method, method_set, Archetype, ClassMetadata, Framework, FrameworkConfig, FrameworkError,
    InstanceState, MethodSet, NamespaceEntry, BUNDLE_PROTOCOL, EVENT_PROTOCOL,
    INSTANCE_OPAQUE_ID_PROPERTY, REQUEST_PROTOCOL,
};
use serde_json::{json, Map, Value};

fn lifecycle_methods() -> MethodSet {
    method_set([
        (
            "start",
            method(|instance, _| {
                let zoom = instance.get("zoom").cloned().unwrap_or(Value::Null);
                instance.set("started_zoom", zoom);
                Ok(Value::Null)
            }),
        ),
        (
            "stop",
            method(|instance, _| {
                instance.set("stopped", Value::Bool(true));
                Ok(json!("bye"))
            }),
        ),
    ])
}

fn map_config() -> FrameworkConfig {
    let mut overrides = Map::new();
    overrides.insert("zoom".to_string(), json!(4));
    FrameworkConfig::default().with_bundle("map", overrides)
}

#[test]
fn bundle_cls_start_applies_config_and_stop_delegates() {
    let mut framework = Framework::with_config(map_config()).unwrap();
    let mut bundle = framework.bundle_cls(Some("map"), "app.MapBundle").unwrap();
    bundle.methods(None, lifecycle_methods()).unwrap();
    bundle.loc("EN", json!({ "title": "Map" }));

    let id = bundle.start(Some("map-1")).unwrap();
    assert_eq!(bundle.stop().unwrap(), json!("bye"));

    let instance = framework.instance(id).unwrap();
    assert_eq!(instance.get("started_zoom"), Some(&json!(4)));
    assert_eq!(instance.get(INSTANCE_OPAQUE_ID_PROPERTY), Some(&json!("map-1")));
    assert_eq!(instance.get("stopped"), Some(&json!(true)));
    assert!(instance.implements(BUNDLE_PROTOCOL));
    assert!(instance.implements(Archetype::Bundle.base_class()));
    assert_eq!(
        framework.bundles().instance_state(id),
        Some(InstanceState::Stopped)
    );
    assert_eq!(
        framework.localization_for("map", "en"),
        Some(&json!({ "title": "Map" }))
    );
}

#[test]
fn bundle_cls_installs_and_publishes_bundle() {
    let mut framework = Framework::new().unwrap();
    framework.bundle_cls(Some("search"), "app.SearchBundle").unwrap();

    let definition = framework.bundles().definition("search").unwrap();
    assert_eq!(definition.metadata().bundle_identifier(), Some("search"));
    assert!(definition.metadata().has_protocol(BUNDLE_PROTOCOL));
    assert_eq!(
        framework.lookup_path("framekit.bundles.search"),
        Some(NamespaceEntry::Bundle("search".to_string()))
    );
    assert_eq!(
        framework.lookup_path("app.SearchBundle"),
        Some(NamespaceEntry::Class("app.SearchBundle".to_string()))
    );
}

#[test]
fn bundle_cls_without_id_generates_one() {
    let mut framework = Framework::new().unwrap();
    let first = framework
        .bundle_cls(None, "app.First")
        .unwrap()
        .bundle_id()
        .to_string();
    let second = framework
        .bundle_cls(Some(""), "app.Second")
        .unwrap()
        .bundle_id()
        .to_string();

    assert_eq!(first, "__bundle_1");
    assert_eq!(second, "__bundle_2");
}

#[test]
fn each_start_creates_a_new_current_instance() {
    let mut framework = Framework::new().unwrap();
    framework
        .bundle_cls(Some("map"), "app.MapBundle")
        .unwrap()
        .methods(None, lifecycle_methods())
        .unwrap();

    let first = framework.start_bundle("map", None).unwrap();
    let second = framework.start_bundle("map", None).unwrap();
    assert!(second > first);
    assert_eq!(framework.current_instance("map"), Some(second));

    assert!(framework.destroy_instance(second).is_some());
    assert_eq!(framework.current_instance("map"), None);
    let err = framework.stop_bundle("map").unwrap_err();
    assert_eq!(err, FrameworkError::NotStarted("map".to_string()));
}

#[test]
fn start_without_start_method_reports_missing_method() {
    let mut framework = Framework::new().unwrap();
    framework.bundle_cls(Some("bare"), "app.BareBundle").unwrap();

    let err = framework.start_bundle("bare", None).unwrap_err();
    assert!(matches!(err, FrameworkError::Class(_)));
    assert_eq!(framework.current_instance("bare"), None);
    assert_eq!(framework.bundles().instance_count(), 0);
}

#[test]
fn event_cls_tags_protocol_and_name() {
    let mut framework = Framework::new().unwrap();
    let mut spec = framework
        .event_cls("MapMovedEvent", None, MethodSet::new())
        .unwrap();
    assert_eq!(spec.name(), "framekit.event.registry.MapMovedEvent");

    let mut event = spec.create(&[]).unwrap();
    assert!(event.implements(EVENT_PROTOCOL));
    assert_eq!(event.call("get_name", &[]).unwrap(), json!("MapMovedEvent"));
}

#[test]
fn request_cls_tags_protocol_and_name() {
    let mut framework = Framework::new().unwrap();
    let mut request = framework
        .request_cls("SearchRequest", None, MethodSet::new())
        .unwrap()
        .create(&[])
        .unwrap();

    assert!(request.implements(REQUEST_PROTOCOL));
    assert_eq!(request.call("get_name", &[]).unwrap(), json!("SearchRequest"));
    assert_eq!(
        request.class_name(),
        "framekit.request.registry.SearchRequest"
    );
}

#[test]
fn requests_dispatch_to_handlers_and_chain() {
    let mut framework = Framework::new().unwrap();
    let mut spec = framework
        .cls(Some("app.Service"), None, MethodSet::new(), ClassMetadata::new())
        .unwrap();
    spec.requests(method_set([(
        "SearchRequest",
        method(|_, args| {
            let term = args.first().and_then(Value::as_str).unwrap_or_default();
            Ok(json!(format!("results for {term}")))
        }),
    )]))
    .unwrap()
    .category(
        Some("info"),
        method_set([("describe", method(|_, _| Ok(json!("service"))))]),
    )
    .unwrap();

    let mut service = spec.create(&[]).unwrap();
    assert_eq!(
        service
            .dispatch_request("SearchRequest", json!("parks"))
            .unwrap(),
        json!("results for parks")
    );
    assert_eq!(
        service.dispatch_request("Unmapped", Value::Null).unwrap(),
        Value::Null
    );
    assert_eq!(service.call("describe", &[]).unwrap(), json!("service"));
}

#[test]
fn archetype_builders_extend_their_base_class() {
    let mut framework = Framework::new().unwrap();
    framework.extension_cls("app.Extension").unwrap();
    framework.flyout_cls("app.Flyout").unwrap();
    framework.tile_cls("app.Tile").unwrap();
    framework.view_cls("app.View").unwrap();

    for (class_name, archetype) in [
        ("app.Extension", Archetype::Extension),
        ("app.Flyout", Archetype::Flyout),
        ("app.Tile", Archetype::Tile),
        ("app.View", Archetype::View),
    ] {
        let entry = framework.classes().lookup(class_name).unwrap();
        assert_eq!(entry.superclasses(), [archetype.base_class().to_string()]);
        let metadata = framework.classes_mut().metadata(class_name).unwrap();
        assert!(metadata.has_protocol(archetype.base_class()));
    }
}

#[test]
fn purge_removes_classes_and_published_paths() {
    let mut framework = Framework::new().unwrap();
    framework
        .cls(Some("app.one.Widget"), None, MethodSet::new(), ClassMetadata::new())
        .unwrap();
    framework
        .cls(Some("app.two.Widget"), None, MethodSet::new(), ClassMetadata::new())
        .unwrap();
    framework
        .cls(Some("other.Widget"), None, MethodSet::new(), ClassMetadata::new())
        .unwrap();

    assert_eq!(framework.purge("app"), 2);
    assert!(framework.lookup_path("app.one.Widget").is_none());
    assert!(framework.classes().lookup("app.two.Widget").is_none());
    assert!(framework.lookup_path("other.Widget").is_some());
}
