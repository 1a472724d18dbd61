//! Bundle builders and materialized bundle factories.

use crate::bundle::manager::BundleDefinition;
use crate::class::instance::Instance;
use crate::class::registry::ClassError;
use crate::runtime::Runtime;
use std::sync::Arc;

/// Materialized bundle: produces instances on demand.
///
/// `Ok(None)` means the factory produced no instance; the runtime reports it
/// as an instance creation failure. The factory may call back into the
/// runtime, including installing and instantiating other bundles.
pub trait BundleFactory {
    fn create(&self, runtime: &mut Runtime) -> Result<Option<Instance>, ClassError>;
}

impl<F> BundleFactory for F
where
    F: Fn(&mut Runtime) -> Result<Option<Instance>, ClassError>,
{
    fn create(&self, runtime: &mut Runtime) -> Result<Option<Instance>, ClassError> {
        self(runtime)
    }
}

/// Materializer invoked by `Runtime::create_bundle` until a factory is cached.
pub type BundleBuilder =
    Arc<dyn Fn(&BundleDefinition, &mut Runtime) -> Result<Arc<dyn BundleFactory>, ClassError>>;

/// Factory whose instances are fresh instantiations of one class.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassBundleFactory {
    class_name: String,
}

impl ClassBundleFactory {
    pub fn new(class_name: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
        }
    }

    pub fn class_name(&self) -> &str {
        &self.class_name
    }
}

impl BundleFactory for ClassBundleFactory {
    fn create(&self, runtime: &mut Runtime) -> Result<Option<Instance>, ClassError> {
        runtime.instantiate(&self.class_name, &[]).map(Some)
    }
}

/// Builder materializing a [`ClassBundleFactory`] for `class_name`.
///
/// The class is resolved at materialization so a missing ancestry surfaces
/// from `create_bundle` rather than from the first instance.
pub fn class_bundle_builder(class_name: impl Into<String>) -> BundleBuilder {
    let class_name = class_name.into();
    Arc::new(
        move |_definition: &BundleDefinition,
              runtime: &mut Runtime|
              -> Result<Arc<dyn BundleFactory>, ClassError> {
            runtime.classes_mut().resolve(&class_name)?;
            let factory: Arc<dyn BundleFactory> =
                Arc::new(ClassBundleFactory::new(class_name.clone()));
            Ok(factory)
        },
    )
}

/// Builder returning `factory` unchanged.
pub fn fixed_builder(factory: Arc<dyn BundleFactory>) -> BundleBuilder {
    Arc::new(
        move |_definition: &BundleDefinition,
              _runtime: &mut Runtime|
              -> Result<Arc<dyn BundleFactory>, ClassError> { Ok(factory.clone()) },
    )
}
