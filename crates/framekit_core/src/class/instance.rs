//! Live objects produced from resolved classes.
//!
//! # Responsibility
//! - Carry the resolved method table and per-instance properties.
//! - Dispatch method calls by name.
//!
//! # Invariants
//! - The method table is a shared immutable snapshot; later registry
//!   mutations never change an existing instance's behavior.
//! - Calling an unknown method fails at call time with `MissingMethod`.

use crate::class::registry::ClassError;
use crate::class::resolve::ResolvedPrototype;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use std::sync::Arc;

/// Method name dispatching to the `events` handler table.
pub const EVENT_DISPATCH_METHOD: &str = "on_event";
/// Method name dispatching to the `requests` handler table.
pub const REQUEST_DISPATCH_METHOD: &str = "on_request";

/// One live object: resolved prototype plus its own properties.
#[derive(Debug, Clone)]
pub struct Instance {
    prototype: Arc<ResolvedPrototype>,
    properties: Map<String, Value>,
}

impl Instance {
    pub(crate) fn new(prototype: Arc<ResolvedPrototype>) -> Self {
        Self {
            prototype,
            properties: Map::new(),
        }
    }

    /// Creates a method-less instance carrying only `properties`.
    pub fn bare(properties: Map<String, Value>) -> Self {
        Self {
            prototype: Arc::new(ResolvedPrototype::empty("")),
            properties,
        }
    }

    /// Fully-qualified name of the instantiated class; empty for bare objects.
    pub fn class_name(&self) -> &str {
        self.prototype.name()
    }

    pub fn prototype(&self) -> &Arc<ResolvedPrototype> {
        &self.prototype
    }

    pub fn has_method(&self, name: &str) -> bool {
        self.prototype.has_method(name)
    }

    /// Invokes a resolved method with `self` as receiver.
    ///
    /// # Errors
    /// - `ClassError::MissingMethod` when the class does not resolve `name`.
    /// - Any error returned by the method body.
    pub fn call(&mut self, name: &str, args: &[Value]) -> Result<Value, ClassError> {
        let Some(method) = self.prototype.method(name).cloned() else {
            return Err(ClassError::MissingMethod {
                class: self.class_name().to_string(),
                method: name.to_string(),
            });
        };
        method(self, args)
    }

    /// Dispatches a named event through the `events` handler table.
    ///
    /// Returns `Value::Null` when no handler is mapped for `event`.
    pub fn dispatch_event(&mut self, event: &str, payload: Value) -> Result<Value, ClassError> {
        self.call(EVENT_DISPATCH_METHOD, &[Value::from(event), payload])
    }

    /// Dispatches a named request through the `requests` handler table.
    ///
    /// Returns `Value::Null` when no handler is mapped for `request`.
    pub fn dispatch_request(
        &mut self,
        request: &str,
        payload: Value,
    ) -> Result<Value, ClassError> {
        self.call(REQUEST_DISPATCH_METHOD, &[Value::from(request), payload])
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.properties.get(key)
    }

    /// Sets one property and returns the previous value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) -> Option<Value> {
        self.properties.insert(key.into(), value)
    }

    pub fn properties(&self) -> &Map<String, Value> {
        &self.properties
    }

    /// Shallow-merges `overrides` into the instance properties.
    pub fn apply_properties(&mut self, overrides: &Map<String, Value>) {
        for (key, value) in overrides {
            self.properties.insert(key.clone(), value.clone());
        }
    }

    pub fn protocols(&self) -> &BTreeSet<String> {
        self.prototype.protocols()
    }

    /// Protocol membership check; no structural verification is performed.
    pub fn implements(&self, protocol: &str) -> bool {
        self.prototype.implements(protocol)
    }

    pub fn manifest(&self) -> &Map<String, Value> {
        self.prototype.manifest()
    }
}
