//! Chainable class declaration handle.
//!
//! # Responsibility
//! - Wrap one class name and forward chained declarations to the runtime's
//!   class registry.
//! - Provide the `events`/`requests` name-dispatch sugar over `category`.
//!
//! # Invariants
//! - Every chained call returns the same handle.
//! - Dispatch on an unmapped name yields `Value::Null`, never an error.

use crate::class::entry::{
    method, noop_constructor, ClassEntry, ClassMetadata, Constructor, Method, MethodSet,
};
use crate::class::instance::{Instance, EVENT_DISPATCH_METHOD, REQUEST_DISPATCH_METHOD};
use crate::class::registry::ClassError;
use crate::runtime::Runtime;
use serde_json::Value;
use std::sync::Arc;

/// Category label holding the event handler table.
pub const EVENTS_CATEGORY: &str = "___events";
/// Category label holding the request handler table.
pub const REQUESTS_CATEGORY: &str = "___requests";
/// Method answering whether an event name has a handler.
pub const EVENT_LOOKUP_METHOD: &str = "handles_event";
/// Method answering whether a request name has a handler.
pub const REQUEST_LOOKUP_METHOD: &str = "handles_request";

/// Fluent handle over one class entry.
pub struct ClassSpec<'a> {
    runtime: &'a mut Runtime,
    class_name: String,
}

impl<'a> ClassSpec<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, class_name: impl Into<String>) -> Self {
        Self {
            runtime,
            class_name: class_name.into(),
        }
    }

    pub fn name(&self) -> &str {
        &self.class_name
    }

    pub fn entry(&self) -> Option<&ClassEntry> {
        self.runtime.classes().lookup(&self.class_name)
    }

    /// Adds a category; `None` generates a unique label.
    pub fn category(
        &mut self,
        label: Option<&str>,
        methods: MethodSet,
    ) -> Result<&mut Self, ClassError> {
        self.runtime.classes_mut().category(&self.class_name, label, methods)?;
        Ok(self)
    }

    /// Alias of [`ClassSpec::category`].
    pub fn methods(
        &mut self,
        label: Option<&str>,
        methods: MethodSet,
    ) -> Result<&mut Self, ClassError> {
        self.category(label, methods)
    }

    /// Adds inheritance edges; the superclasses may be defined later.
    pub fn extend<I, S>(&mut self, superclasses: I) -> Result<&mut Self, ClassError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.runtime.classes_mut().extend(&self.class_name, superclasses)?;
        Ok(self)
    }

    /// Installs an event handler table with `on_event` dispatch.
    pub fn events(&mut self, handlers: MethodSet) -> Result<&mut Self, ClassError> {
        let methods = dispatch_category(handlers, EVENT_DISPATCH_METHOD, EVENT_LOOKUP_METHOD);
        self.category(Some(EVENTS_CATEGORY), methods)
    }

    /// Installs a request handler table with `on_request` dispatch.
    pub fn requests(&mut self, handlers: MethodSet) -> Result<&mut Self, ClassError> {
        let methods =
            dispatch_category(handlers, REQUEST_DISPATCH_METHOD, REQUEST_LOOKUP_METHOD);
        self.category(Some(REQUESTS_CATEGORY), methods)
    }

    /// Resolved metadata of the wrapped class.
    pub fn metadata(&mut self) -> Result<ClassMetadata, ClassError> {
        self.runtime.classes_mut().metadata(&self.class_name)
    }

    /// Instantiates the wrapped class.
    pub fn create(&mut self, args: &[Value]) -> Result<Instance, ClassError> {
        self.runtime.instantiate(&self.class_name, args)
    }
}

/// Declares (or reuses) a class and returns its handle.
///
/// An existing class is reused untouched when no constructor is supplied;
/// otherwise the class is (re)defined.
pub fn cls<'a>(
    runtime: &'a mut Runtime,
    class_name: &str,
    constructor: Option<Constructor>,
    methods: MethodSet,
    metadata: ClassMetadata,
) -> Result<ClassSpec<'a>, ClassError> {
    let class_name = class_name.trim();
    let reuse = constructor.is_none() && runtime.classes().contains(class_name);
    if !reuse {
        runtime.classes_mut().define(
            class_name,
            constructor.unwrap_or_else(noop_constructor),
            methods,
            metadata,
        )?;
    }
    Ok(ClassSpec::new(runtime, class_name))
}

fn dispatch_category(handlers: MethodSet, dispatch_name: &str, lookup_name: &str) -> MethodSet {
    let handlers = Arc::new(handlers);
    let mut methods = MethodSet::new();
    methods.insert(dispatch_name.to_string(), dispatcher(handlers.clone()));
    methods.insert(lookup_name.to_string(), lookup(handlers));
    methods
}

fn dispatcher(handlers: Arc<MethodSet>) -> Method {
    method(move |instance, args| {
        let Some(name) = args.first().and_then(Value::as_str) else {
            return Ok(Value::Null);
        };
        match handlers.get(name) {
            Some(handler) => handler(instance, &args[1..]),
            None => Ok(Value::Null),
        }
    })
}

fn lookup(handlers: Arc<MethodSet>) -> Method {
    method(move |_, args| {
        let mapped = args
            .first()
            .and_then(Value::as_str)
            .is_some_and(|name| handlers.contains_key(name));
        Ok(Value::Bool(mapped))
    })
}
