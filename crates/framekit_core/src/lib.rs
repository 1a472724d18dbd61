//! Core runtime for FrameKit.
//! Class registry, bundle lifecycle and namespace addressing live here.

pub mod builder;
pub mod bundle;
pub mod class;
pub mod config;
pub mod framework;
pub mod localization;
pub mod logging;
pub mod namespace;
pub mod runtime;

pub use builder::archetype::{
    Archetype, ANONYMOUS_CLASS_PREFIX, BUNDLE_PROTOCOL, EVENT_CLASS_PREFIX, EVENT_PROTOCOL,
    REQUEST_CLASS_PREFIX, REQUEST_PROTOCOL,
};
pub use builder::bundle_spec::BundleSpec;
pub use builder::spec::{cls, ClassSpec, EVENT_LOOKUP_METHOD, REQUEST_LOOKUP_METHOD};
pub use bundle::factory::{
    class_bundle_builder, fixed_builder, BundleBuilder, BundleFactory, ClassBundleFactory,
};
pub use bundle::manager::{
    BundleDefinition, BundleError, BundleManager, BundleState, InstanceId, InstanceRecord,
    InstanceState,
};
pub use class::entry::{
    constructor, method, method_set, noop_constructor, Category, ClassEntry, ClassMetadata,
    Constructor, Method, MethodSet, MANIFEST_BUNDLE_IDENTIFIER,
};
pub use class::instance::{Instance, EVENT_DISPATCH_METHOD, REQUEST_DISPATCH_METHOD};
pub use class::registry::{ClassError, ClassRegistry};
pub use class::resolve::{resolve_prototype, ResolvedPrototype};
pub use config::{ConfigError, ConfigSource, FrameworkConfig};
pub use framework::{
    Framework, FrameworkError, FrameworkResult, BUNDLE_NAMESPACE, INSTANCE_OPAQUE_ID_PROPERTY,
};
pub use localization::LocalizationRegistry;
pub use logging::{
    default_log_level, init_logging, init_logging_from_config, logging_status, LogSettings,
    LoggingError,
};
pub use namespace::{Namespace, NamespaceEntry, NamespaceError};
pub use runtime::Runtime;

/// Minimal health-check API for early integration.
pub fn ping() -> &'static str {
    "pong"
}

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
