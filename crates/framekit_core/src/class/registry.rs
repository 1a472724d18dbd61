//! Class registry: define, compose, extend, resolve.
//!
//! # Responsibility
//! - Own every class entry keyed by fully-qualified dotted name.
//! - Cache one resolved prototype per entry.
//!
//! # Invariants
//! - `extend` never checks that the superclass exists.
//! - Every mutation bumps only the mutated entry's revision; a cached
//!   prototype is served only while all revisions it was built from match.
//!
//! # See also
//! - `crate::runtime::Runtime::instantiate` runs the resolved constructors.

use crate::class::entry::{
    Category, ClassEntry, ClassMetadata, Constructor, MethodSet, PROTOTYPE_CATEGORY,
};
use crate::class::resolve::{resolve_prototype, ResolvedPrototype};
use log::debug;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;

const AUTO_CATEGORY_PREFIX: &str = "__category";

/// Class registry errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassError {
    /// A required identifier was empty; carries the argument name.
    InvalidArgument(&'static str),
    UndefinedClass(String),
    MissingSuperclass { class: String, superclass: String },
    CyclicInheritance(String),
    MissingMethod { class: String, method: String },
    Constructor { class: String, message: String },
    /// A bundle lifecycle call made from a constructor or factory failed.
    Bundle(String),
}

impl ClassError {
    /// Convenience for constructors signalling a failure.
    pub fn constructor(class: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Constructor {
            class: class.into(),
            message: message.into(),
        }
    }
}

impl Display for ClassError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidArgument(name) => write!(f, "invalid argument: {name} must not be empty"),
            Self::UndefinedClass(name) => write!(f, "class is not defined: {name}"),
            Self::MissingSuperclass { class, superclass } => {
                write!(f, "class {class} extends undefined superclass {superclass}")
            }
            Self::CyclicInheritance(name) => {
                write!(f, "inheritance cycle detected at class {name}")
            }
            Self::MissingMethod { class, method } => {
                write!(f, "method {method} is not defined for class {class}")
            }
            Self::Constructor { class, message } => {
                write!(f, "constructor of {class} failed: {message}")
            }
            Self::Bundle(message) => write!(f, "bundle lifecycle call failed: {message}"),
        }
    }
}

impl Error for ClassError {}

/// In-process class registry.
#[derive(Default)]
pub struct ClassRegistry {
    entries: BTreeMap<String, ClassEntry>,
    resolved: BTreeMap<String, Arc<ResolvedPrototype>>,
    revision: u64,
    category_serial: u64,
}

impl ClassRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.entries.contains_key(name.trim())
    }

    /// Returns sorted class names.
    pub fn class_names(&self) -> Vec<String> {
        self.entries.keys().cloned().collect()
    }

    /// Creates or fully replaces one class entry.
    ///
    /// `methods` becomes the entry's first category. `metadata.extend` is
    /// applied as the initial superclass edges. Categories and edges attached
    /// to a previous definition are not carried over.
    ///
    /// # Errors
    /// - `ClassError::InvalidArgument` when `name` is blank.
    pub fn define(
        &mut self,
        name: &str,
        constructor: Constructor,
        methods: MethodSet,
        metadata: ClassMetadata,
    ) -> Result<&ClassEntry, ClassError> {
        let name = normalize_name(name, "class name")?;
        let mut categories = Vec::new();
        if !methods.is_empty() {
            categories.push(Category {
                label: PROTOTYPE_CATEGORY.to_string(),
                methods,
            });
        }
        let entry = ClassEntry {
            name: name.clone(),
            constructor,
            categories,
            superclasses: metadata.extend.clone(),
            metadata,
            revision: self.next_revision(),
        };
        let redefined = self.entries.insert(name.clone(), entry).is_some();
        self.resolved.remove(name.as_str());
        debug!(
            "event=class_define module=class status=ok name={} redefined={}",
            name, redefined
        );
        self.entry(name.as_str())
    }

    /// Applies one category to a defined class.
    ///
    /// A blank or absent label gets a generated unique label. A label already
    /// used on this class is replaced in its original application slot.
    ///
    /// # Errors
    /// - `ClassError::InvalidArgument` when `name` is blank.
    /// - `ClassError::UndefinedClass` when `name` was never defined.
    pub fn category(
        &mut self,
        name: &str,
        label: Option<&str>,
        methods: MethodSet,
    ) -> Result<&ClassEntry, ClassError> {
        let name = normalize_name(name, "class name")?;
        let label = match label.map(str::trim).filter(|value| !value.is_empty()) {
            Some(value) => value.to_string(),
            None => self.next_category_label(),
        };
        let revision = self.next_revision();
        let entry = self
            .entries
            .get_mut(name.as_str())
            .ok_or_else(|| ClassError::UndefinedClass(name.clone()))?;
        entry.apply_category(label.clone(), methods);
        entry.revision = revision;
        self.resolved.remove(name.as_str());
        debug!(
            "event=class_category module=class status=ok name={} label={}",
            name, label
        );
        self.entry(name.as_str())
    }

    /// Appends inheritance edges to a defined class.
    ///
    /// Superclasses are stored by name and may be defined later.
    ///
    /// # Errors
    /// - `ClassError::InvalidArgument` when `name`, the list, or any
    ///   superclass name is blank.
    /// - `ClassError::UndefinedClass` when `name` was never defined.
    pub fn extend<I, S>(&mut self, name: &str, superclasses: I) -> Result<&ClassEntry, ClassError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let name = normalize_name(name, "class name")?;
        let superclasses = superclasses
            .into_iter()
            .map(|superclass| normalize_name(superclass.as_ref(), "superclass name"))
            .collect::<Result<Vec<_>, _>>()?;
        if superclasses.is_empty() {
            return Err(ClassError::InvalidArgument("superclass list"));
        }
        if !self.entries.contains_key(name.as_str()) {
            return Err(ClassError::UndefinedClass(name));
        }

        let revision = self.next_revision();
        if let Some(entry) = self.entries.get_mut(name.as_str()) {
            for superclass in &superclasses {
                entry.add_superclass(superclass.clone());
            }
            entry.revision = revision;
        }
        self.resolved.remove(name.as_str());
        debug!(
            "event=class_extend module=class status=ok name={} superclasses={}",
            name,
            superclasses.join(",")
        );
        self.entry(name.as_str())
    }

    /// Returns one entry; never fails.
    pub fn lookup(&self, name: &str) -> Option<&ClassEntry> {
        self.entries.get(name.trim())
    }

    /// Returns the flattened prototype, resolving it when the cache is empty
    /// or stale.
    ///
    /// # Errors
    /// - `ClassError::UndefinedClass` when `name` itself is not defined.
    /// - `ClassError::MissingSuperclass` when any ancestor is not defined.
    /// - `ClassError::CyclicInheritance` when the ancestry loops.
    pub fn resolve(&mut self, name: &str) -> Result<Arc<ResolvedPrototype>, ClassError> {
        let name = normalize_name(name, "class name")?;
        if let Some(cached) = self.resolved.get(name.as_str()) {
            if cached.is_current(&self.entries) {
                return Ok(cached.clone());
            }
        }

        let prototype = Arc::new(resolve_prototype(&self.entries, name.as_str())?);
        self.resolved.insert(name, prototype.clone());
        Ok(prototype)
    }

    /// Resolved metadata: protocol union and merged manifest.
    pub fn metadata(&mut self, name: &str) -> Result<ClassMetadata, ClassError> {
        Ok(self.resolve(name)?.metadata())
    }

    /// Names of classes whose resolved protocols contain `protocol`.
    ///
    /// Classes that currently fail to resolve are skipped.
    pub fn classes_with_protocol(&mut self, protocol: &str) -> Vec<String> {
        let names = self.class_names();
        names
            .into_iter()
            .filter(|name| {
                self.resolve(name)
                    .map(|prototype| prototype.implements(protocol))
                    .unwrap_or(false)
            })
            .collect()
    }

    /// Removes every class named `prefix` or nested under `prefix.`.
    ///
    /// Returns the number of removed classes.
    pub fn purge(&mut self, prefix: &str) -> usize {
        let prefix = prefix.trim();
        if prefix.is_empty() {
            return 0;
        }
        let nested = format!("{prefix}.");
        let doomed: Vec<String> = self
            .entries
            .keys()
            .filter(|name| name.as_str() == prefix || name.starts_with(nested.as_str()))
            .cloned()
            .collect();
        for name in &doomed {
            self.entries.remove(name.as_str());
            self.resolved.remove(name.as_str());
        }
        if !doomed.is_empty() {
            debug!(
                "event=class_purge module=class status=ok prefix={} removed={}",
                prefix,
                doomed.len()
            );
        }
        doomed.len()
    }

    fn entry(&self, name: &str) -> Result<&ClassEntry, ClassError> {
        self.entries
            .get(name)
            .ok_or_else(|| ClassError::UndefinedClass(name.to_string()))
    }

    fn next_revision(&mut self) -> u64 {
        self.revision += 1;
        self.revision
    }

    fn next_category_label(&mut self) -> String {
        self.category_serial += 1;
        format!("{AUTO_CATEGORY_PREFIX}_{}", self.category_serial)
    }
}

fn normalize_name(value: &str, argument: &'static str) -> Result<String, ClassError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ClassError::InvalidArgument(argument));
    }
    Ok(trimmed.to_string())
}
