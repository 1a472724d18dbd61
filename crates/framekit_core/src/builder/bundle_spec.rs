//! Chainable handle for installed bundle classes.

use crate::builder::spec::ClassSpec;
use crate::bundle::manager::InstanceId;
use crate::class::entry::{ClassMetadata, MethodSet};
use crate::class::registry::ClassError;
use crate::framework::{Framework, FrameworkResult};
use serde_json::Value;

/// Handle returned by `Framework::bundle_cls`.
///
/// Chains class declarations like [`ClassSpec`] and adds the bundle
/// conveniences `start`, `stop` and `loc`.
pub struct BundleSpec<'a> {
    framework: &'a mut Framework,
    class_name: String,
    bundle_id: String,
}

impl<'a> BundleSpec<'a> {
    pub(crate) fn new(
        framework: &'a mut Framework,
        class_name: impl Into<String>,
        bundle_id: impl Into<String>,
    ) -> Self {
        Self {
            framework,
            class_name: class_name.into(),
            bundle_id: bundle_id.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn category(
        &mut self,
        label: Option<&str>,
        methods: MethodSet,
    ) -> Result<&mut Self, ClassError> {
        self.spec().category(label, methods)?;
        Ok(self)
    }

    pub fn methods(
        &mut self,
        label: Option<&str>,
        methods: MethodSet,
    ) -> Result<&mut Self, ClassError> {
        self.category(label, methods)
    }

    pub fn extend<I, S>(&mut self, superclasses: I) -> Result<&mut Self, ClassError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.spec().extend(superclasses)?;
        Ok(self)
    }

    pub fn events(&mut self, handlers: MethodSet) -> Result<&mut Self, ClassError> {
        self.spec().events(handlers)?;
        Ok(self)
    }

    pub fn requests(&mut self, handlers: MethodSet) -> Result<&mut Self, ClassError> {
        self.spec().requests(handlers)?;
        Ok(self)
    }

    pub fn metadata(&mut self) -> Result<ClassMetadata, ClassError> {
        self.spec().metadata()
    }

    /// Registers a localization table under this bundle's id.
    pub fn loc(&mut self, lang: &str, table: Value) -> &mut Self {
        self.framework
            .register_localization(&self.bundle_id, lang, table);
        self
    }

    /// Creates the bundle on first use, creates and configures an instance,
    /// then invokes its `start` method.
    pub fn start(&mut self, instance_opaque_id: Option<&str>) -> FrameworkResult<InstanceId> {
        self.framework
            .start_bundle(&self.bundle_id, instance_opaque_id)
    }

    /// Invokes `stop` on the instance started last for this bundle.
    pub fn stop(&mut self) -> FrameworkResult<Value> {
        self.framework.stop_bundle(&self.bundle_id)
    }

    fn spec(&mut self) -> ClassSpec<'_> {
        ClassSpec::new(self.framework.runtime_mut(), self.class_name.clone())
    }
}
