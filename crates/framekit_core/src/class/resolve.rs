//! Pure flattening of a class entry and its ancestry.
//!
//! # Responsibility
//! - Compose inherited and own categories into one immutable method table.
//! - Accumulate protocol tags and manifest entries across the ancestry.
//! - Produce the root-to-leaf constructor order with each ancestor once.
//!
//! # Invariants
//! - Own categories override every inherited method of the same name.
//! - Among superclass edges the last-declared edge wins.
//! - Diamond ancestors are visited once; cycles are rejected.
//! - Scratch state is owned by one `Resolution` value per call.

use crate::class::entry::{ClassEntry, ClassMetadata, Constructor, Method, MethodSet};
use crate::class::registry::ClassError;
use serde_json::{Map, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::{Debug, Formatter};

/// Flattened, immutable view of one class at resolution time.
#[derive(Clone)]
pub struct ResolvedPrototype {
    name: String,
    methods: MethodSet,
    constructors: Vec<(String, Constructor)>,
    protocols: BTreeSet<String>,
    manifest: Map<String, Value>,
    lineage: Vec<(String, u64)>,
}

impl ResolvedPrototype {
    /// Prototype with no methods, used for plain property-bag instances.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            methods: MethodSet::new(),
            constructors: Vec::new(),
            protocols: BTreeSet::new(),
            manifest: Map::new(),
            lineage: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&Method> {
        self.methods.get(name)
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.methods.contains_key(name)
    }

    /// Sorted names of every resolved method.
    pub fn method_names(&self) -> Vec<&str> {
        self.methods.keys().map(String::as_str).collect()
    }

    /// Constructors in invocation order: root first, this class last.
    pub fn constructors(&self) -> &[(String, Constructor)] {
        &self.constructors
    }

    /// Ancestor names in constructor order, excluding this class.
    pub fn ancestors(&self) -> Vec<&str> {
        self.constructors
            .iter()
            .map(|(name, _)| name.as_str())
            .filter(|name| *name != self.name)
            .collect()
    }

    pub fn protocols(&self) -> &BTreeSet<String> {
        &self.protocols
    }

    pub fn implements(&self, protocol: &str) -> bool {
        self.protocols.contains(protocol)
    }

    pub fn manifest(&self) -> &Map<String, Value> {
        &self.manifest
    }

    /// Resolved metadata; `extend` lists the linearized ancestors.
    pub fn metadata(&self) -> ClassMetadata {
        ClassMetadata {
            protocols: self.protocols.clone(),
            manifest: self.manifest.clone(),
            extend: self.ancestors().into_iter().map(str::to_string).collect(),
        }
    }

    /// Returns true while every class this prototype was built from still has
    /// the revision observed at resolution time.
    pub(crate) fn is_current(&self, entries: &BTreeMap<String, ClassEntry>) -> bool {
        self.lineage.iter().all(|(name, revision)| {
            entries
                .get(name)
                .is_some_and(|entry| entry.revision == *revision)
        })
    }
}

impl Debug for ResolvedPrototype {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedPrototype")
            .field("name", &self.name)
            .field("methods", &self.method_names())
            .field("constructors", &self.ancestors())
            .field("protocols", &self.protocols)
            .field("manifest", &self.manifest)
            .finish()
    }
}

/// Resolves `name` against `entries` without touching any cache.
pub fn resolve_prototype(
    entries: &BTreeMap<String, ClassEntry>,
    name: &str,
) -> Result<ResolvedPrototype, ClassError> {
    let mut resolution = Resolution {
        entries,
        flattened: BTreeMap::new(),
        visiting: Vec::new(),
        order: Vec::new(),
    };
    resolution.visit(name, None)?;

    let Some(flat) = resolution.flattened.remove(name) else {
        return Err(ClassError::UndefinedClass(name.to_string()));
    };
    let order = resolution.order;

    Ok(ResolvedPrototype {
        name: name.to_string(),
        methods: flat.methods,
        constructors: order
            .iter()
            .map(|entry| (entry.name.clone(), entry.constructor.clone()))
            .collect(),
        protocols: flat.protocols,
        manifest: flat.manifest,
        lineage: order
            .iter()
            .map(|entry| (entry.name.clone(), entry.revision))
            .collect(),
    })
}

#[derive(Default)]
struct Flattened {
    methods: MethodSet,
    protocols: BTreeSet<String>,
    manifest: Map<String, Value>,
}

impl Flattened {
    fn absorb(&mut self, parent: &Flattened) {
        for (name, method) in &parent.methods {
            self.methods.insert(name.clone(), method.clone());
        }
        self.protocols.extend(parent.protocols.iter().cloned());
        for (key, value) in &parent.manifest {
            self.manifest.insert(key.clone(), value.clone());
        }
    }

    fn apply_own(&mut self, entry: &ClassEntry) {
        for category in &entry.categories {
            for (name, method) in &category.methods {
                self.methods.insert(name.clone(), method.clone());
            }
        }
        self.protocols
            .extend(entry.metadata.protocols.iter().cloned());
        for (key, value) in &entry.metadata.manifest {
            self.manifest.insert(key.clone(), value.clone());
        }
    }
}

struct Resolution<'a> {
    entries: &'a BTreeMap<String, ClassEntry>,
    flattened: BTreeMap<&'a str, Flattened>,
    visiting: Vec<&'a str>,
    order: Vec<&'a ClassEntry>,
}

impl<'a> Resolution<'a> {
    fn visit(&mut self, name: &str, requested_by: Option<&str>) -> Result<(), ClassError> {
        if self.flattened.contains_key(name) {
            return Ok(());
        }
        if self.visiting.iter().any(|visiting| *visiting == name) {
            return Err(ClassError::CyclicInheritance(name.to_string()));
        }
        let entries = self.entries;
        let Some(entry) = entries.get(name) else {
            return Err(match requested_by {
                Some(class) => ClassError::MissingSuperclass {
                    class: class.to_string(),
                    superclass: name.to_string(),
                },
                None => ClassError::UndefinedClass(name.to_string()),
            });
        };

        self.visiting.push(entry.name.as_str());
        let mut flat = Flattened::default();
        for superclass in &entry.superclasses {
            self.visit(superclass, Some(entry.name.as_str()))?;
            if let Some(parent) = self.flattened.get(superclass.as_str()) {
                flat.absorb(parent);
            }
        }
        flat.apply_own(entry);
        self.visiting.pop();

        self.flattened.insert(entry.name.as_str(), flat);
        self.order.push(entry);
        Ok(())
    }
}
