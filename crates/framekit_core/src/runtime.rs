//! Shared runtime handed to constructors, bundle builders and factories.
//!
//! # Responsibility
//! - Own the class registry and the bundle lifecycle manager together.
//! - Invoke user code (constructors, builders, factories) with the whole
//!   runtime, so that code may define classes, install bundles and create
//!   instances while it runs.
//!
//! # Invariants
//! - No registry or manager borrow is held while user code runs; builders,
//!   factories and prototypes are cloned out first.
//! - Instance identities are issued when the instance is stored, after its
//!   factory returns. Instances created re-entrantly receive lower ids than
//!   the instance whose factory created them.
//! - The first factory cached for a bundle id wins; a builder that ran
//!   re-entrantly for the same id does not replace it.
//!
//! # See also
//! - `crate::class::registry` for definitions and resolution.
//! - `crate::bundle::manager` for bundle bookkeeping and instance states.

use crate::bundle::factory::{BundleBuilder, BundleFactory};
use crate::bundle::manager::{normalize_bundle_id, BundleError, BundleManager, InstanceId};
use crate::class::entry::ClassMetadata;
use crate::class::instance::Instance;
use crate::class::registry::{ClassError, ClassRegistry};
use log::debug;
use serde_json::Value;
use std::sync::Arc;

#[derive(Default)]
pub struct Runtime {
    classes: ClassRegistry,
    bundles: BundleManager,
}

impl Runtime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn classes(&self) -> &ClassRegistry {
        &self.classes
    }

    pub fn classes_mut(&mut self) -> &mut ClassRegistry {
        &mut self.classes
    }

    pub fn bundles(&self) -> &BundleManager {
        &self.bundles
    }

    pub fn bundles_mut(&mut self) -> &mut BundleManager {
        &mut self.bundles
    }

    /// Creates a new instance of `name`.
    ///
    /// Every constructor in the lineage runs once, root first, with the same
    /// `args`. Methods are the resolved prototype at the moment of the call;
    /// constructors that change the registry do not affect this instance.
    ///
    /// # Errors
    /// - Any resolution error from `ClassRegistry::resolve`.
    /// - The first constructor error; later constructors do not run.
    pub fn instantiate(&mut self, name: &str, args: &[Value]) -> Result<Instance, ClassError> {
        let prototype = self.classes.resolve(name)?;
        let mut instance = Instance::new(prototype.clone());
        for (_, constructor) in prototype.constructors() {
            constructor(&mut instance, args, self)?;
        }
        debug!(
            "event=class_instantiate module=class status=ok class={} constructors={}",
            prototype.name(),
            prototype.constructors().len()
        );
        Ok(instance)
    }

    /// Installs or re-installs one bundle definition.
    pub fn install(
        &mut self,
        bundle_id: &str,
        builder: BundleBuilder,
        metadata: ClassMetadata,
    ) -> Result<(), BundleError> {
        self.bundles.install(bundle_id, builder, metadata)
    }

    /// Materializes the bundle factory once and returns the cached one after.
    ///
    /// A failing builder caches nothing; the next call retries.
    ///
    /// # Errors
    /// - `BundleError::UndefinedBundleDefinition` when nothing is installed.
    /// - `BundleError::Class` when the builder fails.
    pub fn create_bundle(&mut self, bundle_id: &str) -> Result<Arc<dyn BundleFactory>, BundleError> {
        let bundle_id = normalize_bundle_id(bundle_id)?;
        let definition = self
            .bundles
            .definition(&bundle_id)
            .cloned()
            .ok_or_else(|| BundleError::UndefinedBundleDefinition(bundle_id.clone()))?;
        if let Some(cached) = self.bundles.factory(&bundle_id) {
            return Ok(cached);
        }

        let builder = definition.builder();
        let factory = builder(&definition, self).map_err(|err| {
            debug!(
                "event=bundle_create module=bundle status=error bundle_id={} error={}",
                bundle_id, err
            );
            BundleError::from(err)
        })?;
        Ok(self.bundles.cache_factory(bundle_id, factory))
    }

    /// Asks the cached factory for a new instance and takes ownership of it.
    ///
    /// # Errors
    /// - `BundleError::UndefinedBundleDefinition` when nothing is installed.
    /// - `BundleError::BundleNotCreated` when `create_bundle` has not run.
    /// - `BundleError::InstanceCreationError` when the factory yields nothing.
    /// - `BundleError::Class` when the factory fails.
    pub fn create_instance(
        &mut self,
        bundle_id: &str,
    ) -> Result<(InstanceId, &mut Instance), BundleError> {
        let bundle_id = normalize_bundle_id(bundle_id)?;
        if self.bundles.definition(&bundle_id).is_none() {
            return Err(BundleError::UndefinedBundleDefinition(bundle_id));
        }
        let factory = self
            .bundles
            .factory(&bundle_id)
            .ok_or_else(|| BundleError::BundleNotCreated(bundle_id.clone()))?;

        let instance = factory
            .create(self)?
            .ok_or_else(|| BundleError::InstanceCreationError(bundle_id.clone()))?;
        Ok(self.bundles.store_instance(bundle_id, instance))
    }

    /// Removes one live instance; unknown ids are ignored.
    pub fn destroy_instance(&mut self, id: InstanceId) -> Option<Instance> {
        self.bundles.destroy_instance(id)
    }
}
