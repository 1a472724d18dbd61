//! Class entry model: constructors, categories, metadata.
//!
//! # Responsibility
//! - Define the stored shape of one named class.
//! - Provide closure wrappers used when declaring methods and constructors.
//!
//! # Invariants
//! - Category labels are unique within one entry; re-applying a label keeps
//!   its original application slot.
//! - `superclasses` holds names only, in declaration order.

use crate::class::instance::Instance;
use crate::class::registry::ClassError;
use crate::runtime::Runtime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// Manifest key carrying the bundle identifier.
pub const MANIFEST_BUNDLE_IDENTIFIER: &str = "Bundle-Identifier";

/// Label used for the method set passed directly to `define`.
pub const PROTOTYPE_CATEGORY: &str = "___prototype";

/// Callable method shared by every instance of a resolved class.
///
/// `Value::Null` is the absent result.
pub type Method = Arc<dyn Fn(&mut Instance, &[Value]) -> Result<Value, ClassError>>;

/// Constructor invoked once per class in the ancestry during instantiation.
///
/// Receives the runtime so constructors may declare classes, install bundles
/// or create instances while the outer instantiation is in flight.
pub type Constructor =
    Arc<dyn Fn(&mut Instance, &[Value], &mut Runtime) -> Result<(), ClassError>>;

/// Method-name to implementation mapping contributed by one category.
pub type MethodSet = BTreeMap<String, Method>;

/// Wraps a closure as a [`Method`].
pub fn method<F>(f: F) -> Method
where
    F: Fn(&mut Instance, &[Value]) -> Result<Value, ClassError> + 'static,
{
    Arc::new(f)
}

/// Wraps a closure as a [`Constructor`].
pub fn constructor<F>(f: F) -> Constructor
where
    F: Fn(&mut Instance, &[Value], &mut Runtime) -> Result<(), ClassError> + 'static,
{
    Arc::new(f)
}

/// Constructor that does nothing.
pub fn noop_constructor() -> Constructor {
    constructor(|_, _, _| Ok(()))
}

/// Builds a [`MethodSet`] from `(name, method)` pairs.
pub fn method_set<I, S>(methods: I) -> MethodSet
where
    I: IntoIterator<Item = (S, Method)>,
    S: Into<String>,
{
    methods
        .into_iter()
        .map(|(name, method)| (name.into(), method))
        .collect()
}

/// Declarative class metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassMetadata {
    /// Capability tags checked by membership.
    #[serde(rename = "protocol")]
    pub protocols: BTreeSet<String>,
    /// Free-form manifest entries, e.g. `Bundle-Identifier`.
    pub manifest: Map<String, Value>,
    /// Superclass names applied as inheritance edges at define time.
    pub extend: Vec<String>,
}

impl ClassMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds one protocol tag.
    pub fn with_protocol(mut self, protocol: impl Into<String>) -> Self {
        self.protocols.insert(protocol.into());
        self
    }

    /// Adds one manifest entry.
    pub fn with_manifest(mut self, key: impl Into<String>, value: Value) -> Self {
        self.manifest.insert(key.into(), value);
        self
    }

    /// Adds one superclass edge.
    pub fn with_extend(mut self, superclass: impl Into<String>) -> Self {
        self.extend.push(superclass.into());
        self
    }

    pub fn has_protocol(&self, protocol: &str) -> bool {
        self.protocols.contains(protocol)
    }

    /// Returns the manifest bundle identifier, if declared.
    pub fn bundle_identifier(&self) -> Option<&str> {
        self.manifest
            .get(MANIFEST_BUNDLE_IDENTIFIER)
            .and_then(Value::as_str)
    }
}

/// One labelled method contribution.
#[derive(Clone)]
pub struct Category {
    pub label: String,
    pub methods: MethodSet,
}

impl Debug for Category {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Category")
            .field("label", &self.label)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Stored definition of one named class.
#[derive(Clone)]
pub struct ClassEntry {
    pub(crate) name: String,
    pub(crate) constructor: Constructor,
    pub(crate) categories: Vec<Category>,
    pub(crate) superclasses: Vec<String>,
    pub(crate) metadata: ClassMetadata,
    pub(crate) revision: u64,
}

impl ClassEntry {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn constructor(&self) -> &Constructor {
        &self.constructor
    }

    /// Categories in application order.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Superclass names in declaration order.
    pub fn superclasses(&self) -> &[String] {
        &self.superclasses
    }

    /// Metadata declared on this entry only, without inherited values.
    pub fn metadata(&self) -> &ClassMetadata {
        &self.metadata
    }

    /// Revision stamp; changes whenever this entry is mutated.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    pub fn category(&self, label: &str) -> Option<&Category> {
        self.categories.iter().find(|category| category.label == label)
    }

    /// Applies a category, replacing an existing one with the same label in
    /// place.
    pub(crate) fn apply_category(&mut self, label: String, methods: MethodSet) {
        match self
            .categories
            .iter_mut()
            .find(|category| category.label == label)
        {
            Some(existing) => existing.methods = methods,
            None => self.categories.push(Category { label, methods }),
        }
    }

    pub(crate) fn add_superclass(&mut self, superclass: String) {
        self.superclasses.push(superclass);
    }
}

impl Debug for ClassEntry {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("categories", &self.categories)
            .field("superclasses", &self.superclasses)
            .field("metadata", &self.metadata)
            .field("revision", &self.revision)
            .finish()
    }
}
