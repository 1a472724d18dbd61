use framekit_core::{
    class_bundle_builder, fixed_builder, method, method_set, noop_constructor, BundleBuilder,
    BundleDefinition, BundleError, BundleFactory, BundleState, ClassError, ClassMetadata,
    Instance, InstanceId, InstanceState, MethodSet, Runtime,
};
use serde_json::{json, Map};
use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

fn named_factory(name: &'static str) -> Arc<dyn BundleFactory> {
    Arc::new(move |_runtime: &mut Runtime| -> Result<Option<Instance>, ClassError> {
        let mut properties = Map::new();
        properties.insert("name".to_string(), json!(name));
        Ok(Some(Instance::bare(properties)))
    })
}

fn installed_map() -> Runtime {
    let mut runtime = Runtime::new();
    runtime
        .install("map", fixed_builder(named_factory("mapInstance")), ClassMetadata::new())
        .unwrap();
    runtime
}

#[test]
fn map_bundle_issues_sequential_identities() {
    let mut runtime = installed_map();
    runtime.create_bundle("map").unwrap();

    let (first, instance) = runtime.create_instance("map").unwrap();
    assert_eq!(first.get(), 1);
    assert_eq!(instance.get("name"), Some(&json!("mapInstance")));
    instance.set("zoom", json!(5));

    let (second, instance) = runtime.create_instance("map").unwrap();
    assert_eq!(second.get(), 2);
    assert!(instance.get("zoom").is_none());

    let bundles = runtime.bundles();
    assert_eq!(bundles.instances_of("map"), vec![first, second]);
    assert_eq!(bundles.instance(first).unwrap().get("zoom"), Some(&json!(5)));
    let record = bundles.record(second).unwrap();
    assert_eq!(record.bundle_id, "map");
    assert_eq!(record.state, InstanceState::Created);
}

#[test]
fn unknown_bundle_is_undefined_definition() {
    let mut runtime = installed_map();

    let err = runtime.create_bundle("unknown").err().unwrap();
    assert_eq!(err, BundleError::UndefinedBundleDefinition("unknown".to_string()));
    let err = runtime.create_instance("unknown").err().unwrap();
    assert_eq!(err, BundleError::UndefinedBundleDefinition("unknown".to_string()));
    assert_eq!(runtime.bundles().bundle_state("unknown"), BundleState::Uninstalled);
    assert_eq!(runtime.bundles().bundle_ids(), vec!["map".to_string()]);
}

#[test]
fn create_bundle_materializes_once() {
    let calls = Rc::new(Cell::new(0u32));
    let counter = calls.clone();
    let builder: BundleBuilder = Arc::new(
        move |_definition: &BundleDefinition,
              _runtime: &mut Runtime|
              -> Result<Arc<dyn BundleFactory>, ClassError> {
            counter.set(counter.get() + 1);
            Ok(named_factory("mapInstance"))
        },
    );

    let mut runtime = Runtime::new();
    runtime.install("map", builder, ClassMetadata::new()).unwrap();

    let first = runtime.create_bundle("map").unwrap();
    let second = runtime.create_bundle("map").unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(calls.get(), 1);
    assert_eq!(runtime.bundles().bundle_state("map"), BundleState::Created);
}

#[test]
fn reinstall_keeps_cached_factory() {
    let mut runtime = installed_map();
    runtime.create_bundle("map").unwrap();
    let (before, _) = runtime.create_instance("map").unwrap();

    runtime
        .install("map", fixed_builder(named_factory("replaced")), ClassMetadata::new())
        .unwrap();
    assert_eq!(runtime.bundles().definition("map").unwrap().install_count(), 2);
    assert!(runtime.bundles().instance(before).is_some());

    let (_, instance) = runtime.create_instance("map").unwrap();
    assert_eq!(instance.get("name"), Some(&json!("mapInstance")));
}

#[test]
fn failed_materialization_is_not_cached() {
    let mut runtime = Runtime::new();
    runtime
        .install(
            "layers",
            class_bundle_builder("app.LayerBundle"),
            ClassMetadata::new(),
        )
        .unwrap();

    let err = runtime.create_bundle("layers").err().unwrap();
    assert_eq!(
        err,
        BundleError::Class(ClassError::UndefinedClass("app.LayerBundle".to_string()))
    );
    assert_eq!(runtime.bundles().bundle_state("layers"), BundleState::Installed);

    runtime
        .classes_mut()
        .define(
            "app.LayerBundle",
            noop_constructor(),
            method_set([("kind", method(|_, _| Ok(json!("layers"))))]),
            ClassMetadata::new(),
        )
        .unwrap();
    runtime.create_bundle("layers").unwrap();
    let (_, instance) = runtime.create_instance("layers").unwrap();
    assert_eq!(instance.call("kind", &[]).unwrap(), json!("layers"));
}

#[test]
fn destroy_is_idempotent_and_identities_are_not_reused() {
    let mut runtime = installed_map();
    runtime.create_bundle("map").unwrap();

    let (first, _) = runtime.create_instance("map").unwrap();
    assert!(runtime.destroy_instance(first).is_some());
    assert!(runtime.destroy_instance(first).is_none());
    let never_issued: InstanceId = serde_json::from_value(json!(99)).unwrap();
    assert!(runtime.destroy_instance(never_issued).is_none());

    let (next, _) = runtime.create_instance("map").unwrap();
    assert_ne!(next, first);
    assert!(next > first);
    assert_eq!(runtime.bundles().instance_count(), 1);
}

#[test]
fn factory_may_define_classes_while_creating() {
    let factory: Arc<dyn BundleFactory> = Arc::new(
        |runtime: &mut Runtime| -> Result<Option<Instance>, ClassError> {
            if !runtime.classes().contains("app.Lazy") {
                runtime.classes_mut().define(
                    "app.Lazy",
                    noop_constructor(),
                    MethodSet::new(),
                    ClassMetadata::new().with_protocol("proto.Lazy"),
                )?;
            }
            runtime.instantiate("app.Lazy", &[]).map(Some)
        },
    );
    let mut runtime = Runtime::new();
    runtime
        .install("lazy", fixed_builder(factory), ClassMetadata::new())
        .unwrap();
    runtime.create_bundle("lazy").unwrap();

    let (_, instance) = runtime.create_instance("lazy").unwrap();
    assert!(instance.implements("proto.Lazy"));
    assert!(runtime.classes().contains("app.Lazy"));
}

#[test]
fn factory_may_create_instances_of_another_bundle() {
    let outer: Arc<dyn BundleFactory> = Arc::new(
        |runtime: &mut Runtime| -> Result<Option<Instance>, ClassError> {
            runtime.install("inner", fixed_builder(named_factory("inner")), ClassMetadata::new())?;
            runtime.create_bundle("inner")?;
            let (inner_id, _) = runtime.create_instance("inner")?;
            let mut properties = Map::new();
            properties.insert("inner_id".to_string(), json!(inner_id.get()));
            Ok(Some(Instance::bare(properties)))
        },
    );
    let mut runtime = Runtime::new();
    runtime
        .install("outer", fixed_builder(outer), ClassMetadata::new())
        .unwrap();
    runtime.create_bundle("outer").unwrap();

    let (outer_id, instance) = runtime.create_instance("outer").unwrap();
    assert_eq!(instance.get("inner_id"), Some(&json!(1)));
    assert_eq!(outer_id.get(), 2);
    assert_eq!(runtime.bundles().instances_of("inner").len(), 1);
    assert_eq!(
        runtime.bundles().bundle_ids(),
        vec!["inner".to_string(), "outer".to_string()]
    );
}
