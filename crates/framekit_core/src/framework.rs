//! Framework facade: one process-scoped service object.
//!
//! # Responsibility
//! - Own the runtime (class registry plus bundle manager), namespace,
//!   configuration source and localization side-table.
//! - Hand out fluent builder handles for every declaration shortcut.
//! - Orchestrate bundle start/stop on top of the lifecycle manager.
//!
//! # Invariants
//! - Class names and bundle ids published here are valid dotted paths.
//! - Errors are returned to the caller; nothing is logged and swallowed.
//! - The facade remembers one current instance per started bundle id.
//! - `stop` runs only on an instance in the started state.

use crate::builder::archetype::{
    define_base_archetypes, Archetype, BuilderSerials, ANONYMOUS_CLASS_PREFIX, BUNDLE_PROTOCOL,
    EVENT_CLASS_PREFIX, EVENT_PROTOCOL, REQUEST_CLASS_PREFIX, REQUEST_PROTOCOL,
};
use crate::builder::bundle_spec::BundleSpec;
use crate::builder::spec::{cls, ClassSpec};
use crate::bundle::factory::{class_bundle_builder, BundleBuilder, BundleFactory};
use crate::bundle::manager::{BundleError, BundleManager, InstanceId, InstanceState};
use crate::class::entry::{
    method, method_set, noop_constructor, ClassMetadata, Constructor, MethodSet,
    MANIFEST_BUNDLE_IDENTIFIER,
};
use crate::class::instance::Instance;
use crate::class::registry::{ClassError, ClassRegistry};
use crate::config::{ConfigError, ConfigSource, FrameworkConfig};
use crate::localization::LocalizationRegistry;
use crate::namespace::{split_path, Namespace, NamespaceEntry, NamespaceError};
use crate::runtime::Runtime;
use log::{log, Level};
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

/// Namespace branch under which installed bundles are published.
pub const BUNDLE_NAMESPACE: &str = "framekit.bundles";
/// Namespace branch holding named globals such as sandboxes.
pub const GLOBAL_NAMESPACE: &str = "framekit.globals";
/// Instance property receiving the opaque id passed to `start`.
pub const INSTANCE_OPAQUE_ID_PROPERTY: &str = "instance_opaque_id";
/// Lifecycle method invoked by `start_bundle`.
pub const START_METHOD: &str = "start";
/// Lifecycle method invoked by `stop_bundle`.
pub const STOP_METHOD: &str = "stop";

const EVENT_CATEGORY: &str = "___event";
const REQUEST_CATEGORY: &str = "___request";

/// Facade errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameworkError {
    Class(ClassError),
    Bundle(BundleError),
    Namespace(NamespaceError),
    Config(ConfigError),
    /// `stop_bundle` without a running instance for the bundle id.
    NotStarted(String),
}

impl Display for FrameworkError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Class(err) => write!(f, "{err}"),
            Self::Bundle(err) => write!(f, "{err}"),
            Self::Namespace(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::NotStarted(id) => write!(f, "bundle {id} has no started instance"),
        }
    }
}

impl Error for FrameworkError {}

impl From<ClassError> for FrameworkError {
    fn from(value: ClassError) -> Self {
        Self::Class(value)
    }
}

impl From<BundleError> for FrameworkError {
    fn from(value: BundleError) -> Self {
        match value {
            BundleError::Class(err) => Self::Class(err),
            other => Self::Bundle(other),
        }
    }
}

impl From<NamespaceError> for FrameworkError {
    fn from(value: NamespaceError) -> Self {
        Self::Namespace(value)
    }
}

impl From<ConfigError> for FrameworkError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value)
    }
}

pub type FrameworkResult<T> = Result<T, FrameworkError>;

/// Class registry, bundle lifecycle and addressing in one service object.
pub struct Framework {
    runtime: Runtime,
    namespace: Namespace,
    config: Box<dyn ConfigSource>,
    localization: LocalizationRegistry,
    current_instances: BTreeMap<String, InstanceId>,
    serials: BuilderSerials,
    debug: bool,
}

impl Framework {
    /// Creates a framework with default configuration.
    pub fn new() -> FrameworkResult<Self> {
        Self::with_config(FrameworkConfig::default())
    }

    /// Creates a framework and predefines the base archetypes.
    pub fn with_config(config: FrameworkConfig) -> FrameworkResult<Self> {
        let mut framework = Self {
            runtime: Runtime::new(),
            namespace: Namespace::new(),
            debug: config.debug,
            config: Box::new(config),
            localization: LocalizationRegistry::new(),
            current_instances: BTreeMap::new(),
            serials: BuilderSerials::default(),
        };
        define_base_archetypes(framework.runtime.classes_mut())?;
        for archetype in Archetype::ALL {
            framework.publish_class(archetype.base_class())?;
        }
        Ok(framework)
    }

    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    pub fn runtime_mut(&mut self) -> &mut Runtime {
        &mut self.runtime
    }

    pub fn classes(&self) -> &ClassRegistry {
        self.runtime.classes()
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        self.runtime.classes_mut()
    }

    pub fn bundles(&self) -> &BundleManager {
        self.runtime.bundles()
    }

    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    pub fn localization(&self) -> &LocalizationRegistry {
        &self.localization
    }

    pub fn is_debug(&self) -> bool {
        self.debug
    }

    /// Raises lifecycle diagnostics from `debug` to `info` level.
    pub fn set_debug_mode(&mut self, debug: bool) {
        self.debug = debug;
    }

    /// Replaces the configuration collaborator consulted by `start_bundle`.
    pub fn set_config_source(&mut self, source: Box<dyn ConfigSource>) {
        self.config = source;
    }

    /// Declares or reuses a class; a blank name generates `framekit._.<n>`.
    pub fn cls(
        &mut self,
        class_name: Option<&str>,
        constructor: Option<Constructor>,
        methods: MethodSet,
        metadata: ClassMetadata,
    ) -> FrameworkResult<ClassSpec<'_>> {
        let class_name = match class_name.map(str::trim).filter(|name| !name.is_empty()) {
            Some(name) => name.to_string(),
            None => format!(
                "{ANONYMOUS_CLASS_PREFIX}{}",
                self.serials.next("Class")
            ),
        };
        split_path(&class_name)?;
        let spec = cls(
            &mut self.runtime,
            &class_name,
            constructor,
            methods,
            metadata,
        )?;
        self.namespace
            .set(&class_name, NamespaceEntry::Class(class_name.clone()))?;
        Ok(spec)
    }

    /// Declares an event class tagged with the event protocol.
    pub fn event_cls(
        &mut self,
        event_name: &str,
        constructor: Option<Constructor>,
        methods: MethodSet,
    ) -> FrameworkResult<ClassSpec<'_>> {
        self.named_message_cls(
            event_name,
            EVENT_CLASS_PREFIX,
            EVENT_PROTOCOL,
            EVENT_CATEGORY,
            constructor,
            methods,
        )
    }

    /// Declares a request class tagged with the request protocol.
    pub fn request_cls(
        &mut self,
        request_name: &str,
        constructor: Option<Constructor>,
        methods: MethodSet,
    ) -> FrameworkResult<ClassSpec<'_>> {
        self.named_message_cls(
            request_name,
            REQUEST_CLASS_PREFIX,
            REQUEST_PROTOCOL,
            REQUEST_CATEGORY,
            constructor,
            methods,
        )
    }

    pub fn extension_cls(&mut self, class_name: &str) -> FrameworkResult<ClassSpec<'_>> {
        self.archetype_cls(class_name, Archetype::Extension)
    }

    pub fn flyout_cls(&mut self, class_name: &str) -> FrameworkResult<ClassSpec<'_>> {
        self.archetype_cls(class_name, Archetype::Flyout)
    }

    pub fn tile_cls(&mut self, class_name: &str) -> FrameworkResult<ClassSpec<'_>> {
        self.archetype_cls(class_name, Archetype::Tile)
    }

    pub fn view_cls(&mut self, class_name: &str) -> FrameworkResult<ClassSpec<'_>> {
        self.archetype_cls(class_name, Archetype::View)
    }

    /// Defines a bundle class, installs it and returns a handle with
    /// `start`/`stop` conveniences. A blank bundle id generates
    /// `__bundle_<n>`.
    pub fn bundle_cls(
        &mut self,
        bundle_id: Option<&str>,
        class_name: &str,
    ) -> FrameworkResult<BundleSpec<'_>> {
        let class_name = class_name.trim();
        if class_name.is_empty() {
            return Err(ClassError::InvalidArgument("class name").into());
        }
        let bundle_id = match bundle_id.map(str::trim).filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => format!("__bundle_{}", self.serials.next("Bundle")),
        };
        split_path(&bundle_path(&bundle_id))?;

        let base = Archetype::Bundle.base_class();
        let metadata = ClassMetadata::new()
            .with_protocol(BUNDLE_PROTOCOL)
            .with_protocol(base)
            .with_manifest(MANIFEST_BUNDLE_IDENTIFIER, Value::from(bundle_id.as_str()));
        let update = method_set([("update", method(|_, _| Ok(Value::Null)))]);
        self.cls(Some(class_name), Some(noop_constructor()), update, metadata)?
            .extend([base])?;

        let declared = self
            .runtime
            .classes()
            .lookup(class_name)
            .map(|entry| entry.metadata().clone())
            .unwrap_or_default();
        self.install(&bundle_id, class_bundle_builder(class_name), declared)?;
        Ok(BundleSpec::new(self, class_name, bundle_id))
    }

    /// Installs a bundle backed by an already declared class.
    pub fn install_bundle_class(&mut self, bundle_id: &str, class_name: &str) -> FrameworkResult<()> {
        let metadata = self.runtime.classes_mut().metadata(class_name)?;
        self.install(bundle_id, class_bundle_builder(class_name.trim()), metadata)
    }

    /// Installs a bundle definition and publishes it in the namespace.
    pub fn install(
        &mut self,
        bundle_id: &str,
        builder: BundleBuilder,
        metadata: ClassMetadata,
    ) -> FrameworkResult<()> {
        let bundle_id = bundle_id.trim();
        let path = bundle_path(bundle_id);
        if !bundle_id.is_empty() {
            split_path(&path)?;
        }
        self.runtime.install(bundle_id, builder, metadata)?;
        self.namespace
            .set(&path, NamespaceEntry::Bundle(bundle_id.to_string()))?;
        Ok(())
    }

    pub fn create_bundle(&mut self, bundle_id: &str) -> FrameworkResult<Arc<dyn BundleFactory>> {
        Ok(self.runtime.create_bundle(bundle_id)?)
    }

    pub fn create_instance(
        &mut self,
        bundle_id: &str,
    ) -> FrameworkResult<(InstanceId, &mut Instance)> {
        Ok(self.runtime.create_instance(bundle_id)?)
    }

    /// Destroys one instance; unknown ids are ignored.
    pub fn destroy_instance(&mut self, id: InstanceId) -> Option<Instance> {
        self.current_instances.retain(|_, current| *current != id);
        self.runtime.destroy_instance(id)
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.runtime.bundles().instance(id)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.runtime.bundles_mut().instance_mut(id)
    }

    /// Instance most recently started for `bundle_id`.
    pub fn current_instance(&self, bundle_id: &str) -> Option<InstanceId> {
        self.current_instances.get(bundle_id.trim()).copied()
    }

    /// Creates the bundle if needed, creates an instance, applies
    /// configuration overrides and invokes its `start` method.
    ///
    /// An instance whose `start` fails is destroyed before the error is
    /// returned.
    pub fn start_bundle(
        &mut self,
        bundle_id: &str,
        instance_opaque_id: Option<&str>,
    ) -> FrameworkResult<InstanceId> {
        let bundle_id = bundle_id.trim();
        if self.runtime.bundles().factory(bundle_id).is_none() {
            self.runtime.create_bundle(bundle_id)?;
        }

        let (id, instance) = self.runtime.create_instance(bundle_id)?;
        if let Some(overrides) = self.config.bundle_config(bundle_id) {
            instance.apply_properties(&overrides);
        }
        if let Some(opaque) = instance_opaque_id {
            instance.set(INSTANCE_OPAQUE_ID_PROPERTY, Value::from(opaque));
        }
        if let Err(err) = instance.call(START_METHOD, &[]) {
            self.runtime.destroy_instance(id);
            return Err(err.into());
        }
        self.runtime.bundles_mut().mark_started(id)?;
        self.current_instances.insert(bundle_id.to_string(), id);

        log!(
            self.lifecycle_level(),
            "event=bundle_start module=framework status=ok bundle_id={} instance_id={}",
            bundle_id,
            id
        );
        Ok(id)
    }

    /// Invokes `stop` on the bundle's current instance.
    ///
    /// # Errors
    /// - `FrameworkError::NotStarted` when there is no current instance or it
    ///   is not in the started state; `stop` is not invoked then.
    pub fn stop_bundle(&mut self, bundle_id: &str) -> FrameworkResult<Value> {
        let bundle_id = bundle_id.trim();
        let id = self
            .current_instances
            .get(bundle_id)
            .copied()
            .ok_or_else(|| FrameworkError::NotStarted(bundle_id.to_string()))?;
        if self.runtime.bundles().instance_state(id) != Some(InstanceState::Started) {
            return Err(FrameworkError::NotStarted(bundle_id.to_string()));
        }
        let instance = self
            .runtime
            .bundles_mut()
            .instance_mut(id)
            .ok_or_else(|| FrameworkError::NotStarted(bundle_id.to_string()))?;
        let result = instance.call(STOP_METHOD, &[])?;
        self.runtime.bundles_mut().mark_stopped(id)?;

        log!(
            self.lifecycle_level(),
            "event=bundle_stop module=framework status=ok bundle_id={} instance_id={}",
            bundle_id,
            id
        );
        Ok(result)
    }

    pub fn register_localization(&mut self, bundle_id: &str, lang: &str, table: Value) {
        self.localization.register(bundle_id, lang, table);
    }

    pub fn localization_for(&self, bundle_id: &str, lang: &str) -> Option<&Value> {
        self.localization.get(bundle_id, lang)
    }

    /// Publishes a named global value, e.g. a sandbox.
    pub fn set_global(&mut self, name: &str, value: Value) -> FrameworkResult<Option<Value>> {
        let previous = self
            .namespace
            .set(&global_path(name), NamespaceEntry::Value(value))?;
        Ok(match previous {
            Some(NamespaceEntry::Value(value)) => Some(value),
            _ => None,
        })
    }

    pub fn global(&self, name: &str) -> Option<&Value> {
        match self.namespace.get(&global_path(name))? {
            NamespaceEntry::Value(value) => Some(value),
            _ => None,
        }
    }

    /// Resolves a dotted path to a published entry, falling back to the
    /// class registry for classes declared directly on it.
    pub fn lookup_path(&self, path: &str) -> Option<NamespaceEntry> {
        if let Some(entry) = self.namespace.get(path) {
            return Some(entry.clone());
        }
        let path = path.trim();
        self.runtime
            .classes()
            .contains(path)
            .then(|| NamespaceEntry::Class(path.to_string()))
    }

    /// Removes every class and namespace entry under `prefix`, returning the
    /// number of removed classes.
    pub fn purge(&mut self, prefix: &str) -> usize {
        let classes = self.runtime.classes_mut().purge(prefix);
        let published = self.namespace.purge(prefix);
        log!(
            self.lifecycle_level(),
            "event=purge module=framework status=ok prefix={} classes={} entries={}",
            prefix.trim(),
            classes,
            published
        );
        classes
    }

    fn named_message_cls(
        &mut self,
        message_name: &str,
        prefix: &str,
        protocol: &str,
        category: &str,
        constructor: Option<Constructor>,
        methods: MethodSet,
    ) -> FrameworkResult<ClassSpec<'_>> {
        let message_name = message_name.trim();
        if message_name.is_empty() {
            return Err(ClassError::InvalidArgument("message name").into());
        }
        let class_name = format!("{prefix}{message_name}");
        let name_value = Value::from(message_name);
        let get_name = method_set([(
            "get_name",
            method(move |_, _| Ok(name_value.clone())),
        )]);

        let mut spec = self.cls(
            Some(&class_name),
            constructor,
            methods,
            ClassMetadata::new().with_protocol(protocol),
        )?;
        spec.category(Some(category), get_name)?;
        Ok(spec)
    }

    fn archetype_cls(
        &mut self,
        class_name: &str,
        archetype: Archetype,
    ) -> FrameworkResult<ClassSpec<'_>> {
        if class_name.trim().is_empty() {
            return Err(ClassError::InvalidArgument("class name").into());
        }
        let mut spec = self.cls(Some(class_name), None, MethodSet::new(), ClassMetadata::new())?;
        spec.extend([archetype.base_class()])?;
        Ok(spec)
    }

    fn publish_class(&mut self, class_name: &str) -> FrameworkResult<()> {
        self.namespace
            .set(class_name, NamespaceEntry::Class(class_name.to_string()))?;
        Ok(())
    }

    fn lifecycle_level(&self) -> Level {
        if self.debug {
            Level::Info
        } else {
            Level::Debug
        }
    }
}

fn bundle_path(bundle_id: &str) -> String {
    format!("{BUNDLE_NAMESPACE}.{bundle_id}")
}

fn global_path(name: &str) -> String {
    format!("{GLOBAL_NAMESPACE}.{}", name.trim())
}
