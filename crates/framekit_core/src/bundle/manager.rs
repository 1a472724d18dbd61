//! Bundle lifecycle bookkeeping.
//!
//! # Responsibility
//! - Track installed bundle definitions and their materialized factories.
//! - Issue instance identities and own live instances until destroyed.
//!
//! # Invariants
//! - Instance identities increase monotonically and are never reissued.
//! - The first factory cached for a bundle id is kept.
//! - Re-installing overwrites builder and metadata only; a cached factory
//!   and live instances are left untouched.
//! - `destroy_instance` on an unknown id is a no-op.
//!
//! # See also
//! - `crate::runtime::Runtime` invokes builders and factories, then hands
//!   their results back here.

use crate::bundle::factory::{BundleBuilder, BundleFactory};
use crate::class::entry::ClassMetadata;
use crate::class::instance::Instance;
use crate::class::registry::ClassError;
use log::debug;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// Globally unique, never reused instance identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InstanceId(u64);

impl InstanceId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl Display for InstanceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Per-bundle-id lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BundleState {
    Uninstalled,
    Installed,
    /// Installed and materialized into a cached factory.
    Created,
}

/// Per-instance lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceState {
    Created,
    Started,
    Stopped,
}

/// Installed bundle declaration.
#[derive(Clone)]
pub struct BundleDefinition {
    bundle_id: String,
    metadata: ClassMetadata,
    builder: BundleBuilder,
    install_count: u32,
}

impl BundleDefinition {
    pub fn bundle_id(&self) -> &str {
        &self.bundle_id
    }

    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    /// Number of times this bundle id has been installed.
    pub fn install_count(&self) -> u32 {
        self.install_count
    }

    pub(crate) fn builder(&self) -> BundleBuilder {
        self.builder.clone()
    }
}

impl Debug for BundleDefinition {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BundleDefinition")
            .field("bundle_id", &self.bundle_id)
            .field("metadata", &self.metadata)
            .field("install_count", &self.install_count)
            .finish()
    }
}

/// Live instance owned by the manager.
#[derive(Debug)]
pub struct InstanceRecord {
    pub bundle_id: String,
    pub state: InstanceState,
    pub instance: Instance,
}

/// Bundle lifecycle errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BundleError {
    /// A required identifier was empty; carries the argument name.
    InvalidArgument(&'static str),
    UndefinedBundleDefinition(String),
    BundleNotCreated(String),
    InstanceCreationError(String),
    UnknownInstance(InstanceId),
    InvalidTransition {
        instance: InstanceId,
        from: InstanceState,
        to: InstanceState,
    },
    Class(ClassError),
}

impl Display for BundleError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(name) => write!(f, "invalid argument: {name} must not be empty"),
            Self::UndefinedBundleDefinition(id) => write!(
                f,
                "no definition for bundle {id}; check spelling and that the bundle is installed"
            ),
            Self::BundleNotCreated(id) => {
                write!(f, "bundle {id} is installed but has not been created")
            }
            Self::InstanceCreationError(id) => write!(
                f,
                "bundle {id} factory did not return an instance"
            ),
            Self::UnknownInstance(id) => write!(f, "bundle instance not found: {id}"),
            Self::InvalidTransition { instance, from, to } => write!(
                f,
                "bundle instance {instance} cannot move from {from:?} to {to:?}"
            ),
            Self::Class(err) => write!(f, "{err}"),
        }
    }
}

impl Error for BundleError {}

impl From<ClassError> for BundleError {
    fn from(value: ClassError) -> Self {
        Self::Class(value)
    }
}

impl From<BundleError> for ClassError {
    fn from(value: BundleError) -> Self {
        match value {
            BundleError::Class(err) => err,
            other => ClassError::Bundle(other.to_string()),
        }
    }
}

/// Bundle definitions, factories and live instances.
#[derive(Default)]
pub struct BundleManager {
    serial: u64,
    definitions: BTreeMap<String, BundleDefinition>,
    bundles: BTreeMap<String, Arc<dyn BundleFactory>>,
    instances: BTreeMap<InstanceId, InstanceRecord>,
}

impl BundleManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installs or re-installs one bundle definition.
    ///
    /// # Errors
    /// - `BundleError::InvalidArgument` when `bundle_id` is blank.
    pub fn install(
        &mut self,
        bundle_id: &str,
        builder: BundleBuilder,
        metadata: ClassMetadata,
    ) -> Result<(), BundleError> {
        let bundle_id = normalize_bundle_id(bundle_id)?;
        match self.definitions.get_mut(bundle_id.as_str()) {
            Some(existing) => {
                existing.builder = builder;
                existing.metadata = metadata;
                existing.install_count += 1;
                debug!(
                    "event=bundle_install module=bundle status=ok bundle_id={} reinstall=true count={}",
                    bundle_id, existing.install_count
                );
            }
            None => {
                debug!(
                    "event=bundle_install module=bundle status=ok bundle_id={} reinstall=false",
                    bundle_id
                );
                self.definitions.insert(
                    bundle_id.clone(),
                    BundleDefinition {
                        bundle_id,
                        metadata,
                        builder,
                        install_count: 1,
                    },
                );
            }
        }
        Ok(())
    }

    /// Caches `factory` for `bundle_id` unless one is already cached, and
    /// returns the cached factory.
    pub(crate) fn cache_factory(
        &mut self,
        bundle_id: String,
        factory: Arc<dyn BundleFactory>,
    ) -> Arc<dyn BundleFactory> {
        if let Some(cached) = self.bundles.get(bundle_id.as_str()) {
            return cached.clone();
        }
        debug!(
            "event=bundle_create module=bundle status=ok bundle_id={}",
            bundle_id
        );
        self.bundles.insert(bundle_id, factory.clone());
        factory
    }

    /// Issues the next identity for `instance` and takes ownership of it.
    pub(crate) fn store_instance(
        &mut self,
        bundle_id: String,
        instance: Instance,
    ) -> (InstanceId, &mut Instance) {
        let id = self.next_instance_id();
        debug!(
            "event=instance_create module=bundle status=ok bundle_id={} instance_id={}",
            bundle_id, id
        );
        let record = self.instances.entry(id).or_insert(InstanceRecord {
            bundle_id,
            state: InstanceState::Created,
            instance,
        });
        (id, &mut record.instance)
    }

    /// Removes one live instance; unknown ids are ignored.
    pub fn destroy_instance(&mut self, id: InstanceId) -> Option<Instance> {
        let record = self.instances.remove(&id)?;
        debug!(
            "event=instance_destroy module=bundle status=ok bundle_id={} instance_id={}",
            record.bundle_id, id
        );
        Some(record.instance)
    }

    /// Records that an instance was started by its orchestrator.
    pub fn mark_started(&mut self, id: InstanceId) -> Result<(), BundleError> {
        self.transition(id, InstanceState::Started)
    }

    /// Records that an instance was stopped by its orchestrator.
    pub fn mark_stopped(&mut self, id: InstanceId) -> Result<(), BundleError> {
        self.transition(id, InstanceState::Stopped)
    }

    pub fn bundle_state(&self, bundle_id: &str) -> BundleState {
        let bundle_id = bundle_id.trim();
        if self.bundles.contains_key(bundle_id) {
            BundleState::Created
        } else if self.definitions.contains_key(bundle_id) {
            BundleState::Installed
        } else {
            BundleState::Uninstalled
        }
    }

    pub fn definition(&self, bundle_id: &str) -> Option<&BundleDefinition> {
        self.definitions.get(bundle_id.trim())
    }

    pub fn factory(&self, bundle_id: &str) -> Option<Arc<dyn BundleFactory>> {
        self.bundles.get(bundle_id.trim()).cloned()
    }

    /// Returns sorted installed bundle ids.
    pub fn bundle_ids(&self) -> Vec<String> {
        self.definitions.keys().cloned().collect()
    }

    pub fn instance(&self, id: InstanceId) -> Option<&Instance> {
        self.instances.get(&id).map(|record| &record.instance)
    }

    pub fn instance_mut(&mut self, id: InstanceId) -> Option<&mut Instance> {
        self.instances.get_mut(&id).map(|record| &mut record.instance)
    }

    pub fn record(&self, id: InstanceId) -> Option<&InstanceRecord> {
        self.instances.get(&id)
    }

    pub fn instance_state(&self, id: InstanceId) -> Option<InstanceState> {
        self.instances.get(&id).map(|record| record.state)
    }

    /// Live instance ids of one bundle, oldest first.
    pub fn instances_of(&self, bundle_id: &str) -> Vec<InstanceId> {
        let bundle_id = bundle_id.trim();
        self.instances
            .iter()
            .filter(|(_, record)| record.bundle_id == bundle_id)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn instance_count(&self) -> usize {
        self.instances.len()
    }

    fn transition(&mut self, id: InstanceId, to: InstanceState) -> Result<(), BundleError> {
        let record = self
            .instances
            .get_mut(&id)
            .ok_or(BundleError::UnknownInstance(id))?;
        let allowed = matches!(
            (record.state, to),
            (InstanceState::Created, InstanceState::Started)
                | (InstanceState::Stopped, InstanceState::Started)
                | (InstanceState::Started, InstanceState::Stopped)
        );
        if !allowed {
            return Err(BundleError::InvalidTransition {
                instance: id,
                from: record.state,
                to,
            });
        }
        record.state = to;
        debug!(
            "event=instance_state module=bundle status=ok instance_id={} state={:?}",
            id, to
        );
        Ok(())
    }

    fn next_instance_id(&mut self) -> InstanceId {
        self.serial += 1;
        InstanceId(self.serial)
    }
}

pub(crate) fn normalize_bundle_id(value: &str) -> Result<String, BundleError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(BundleError::InvalidArgument("bundle id"));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::{BundleError, BundleManager, BundleState, InstanceState};
    use crate::bundle::factory::{fixed_builder, BundleFactory};
    use crate::class::entry::ClassMetadata;
    use crate::class::instance::Instance;
    use crate::class::registry::ClassError;
    use crate::runtime::Runtime;
    use serde_json::{json, Map};
    use std::sync::Arc;

    fn named_factory(name: &'static str) -> Arc<dyn BundleFactory> {
        Arc::new(move |_runtime: &mut Runtime| -> Result<Option<Instance>, ClassError> {
            let mut properties = Map::new();
            properties.insert("name".to_string(), json!(name));
            Ok(Some(Instance::bare(properties)))
        })
    }

    #[test]
    fn install_rejects_blank_bundle_id() {
        let mut manager = BundleManager::new();
        let err = manager
            .install(" ", fixed_builder(named_factory("x")), ClassMetadata::new())
            .expect_err("blank bundle id must fail");
        assert_eq!(err, BundleError::InvalidArgument("bundle id"));
    }

    #[test]
    fn reinstall_overwrites_metadata_and_counts() {
        let mut manager = BundleManager::new();
        manager
            .install("map", fixed_builder(named_factory("m")), ClassMetadata::new())
            .expect("install");
        manager
            .install(
                "map",
                fixed_builder(named_factory("m")),
                ClassMetadata::new().with_protocol("proto.Map"),
            )
            .expect("reinstall");

        let definition = manager.definition("map").expect("definition");
        assert_eq!(definition.install_count(), 2);
        assert!(definition.metadata().has_protocol("proto.Map"));
        assert_eq!(manager.bundle_state("map"), BundleState::Installed);
        assert_eq!(manager.bundle_ids(), vec!["map".to_string()]);
    }

    #[test]
    fn first_cached_factory_wins() {
        let mut manager = BundleManager::new();
        let first = named_factory("first");
        let cached = manager.cache_factory("map".to_string(), first.clone());
        let again = manager.cache_factory("map".to_string(), named_factory("second"));

        assert!(Arc::ptr_eq(&cached, &first));
        assert!(Arc::ptr_eq(&again, &first));
    }

    #[test]
    fn state_transitions_are_validated() {
        let mut manager = BundleManager::new();
        let (id, _) = manager.store_instance("map".to_string(), Instance::bare(Map::new()));

        let err = manager.mark_stopped(id).expect_err("cannot stop before start");
        assert!(matches!(err, BundleError::InvalidTransition { .. }));

        manager.mark_started(id).expect("start");
        manager.mark_stopped(id).expect("stop");
        manager.mark_started(id).expect("restart");
        assert_eq!(manager.instance_state(id), Some(InstanceState::Started));

        manager.destroy_instance(id);
        let err = manager.mark_stopped(id).expect_err("destroyed instance");
        assert_eq!(err, BundleError::UnknownInstance(id));
    }

    #[test]
    fn lifecycle_errors_convert_into_class_errors() {
        let wrapped = ClassError::UndefinedClass("demo.A".to_string());
        assert_eq!(ClassError::from(BundleError::Class(wrapped.clone())), wrapped);

        let converted = ClassError::from(BundleError::UndefinedBundleDefinition("x".to_string()));
        assert!(matches!(converted, ClassError::Bundle(_)));
    }
}
