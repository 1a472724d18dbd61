//! Dynamic class composition.
//!
//! # Responsibility
//! - Store named class entries built from ordered method categories.
//! - Record inheritance edges by name and flatten them lazily on resolve.
//! - Hand out immutable prototypes that `crate::runtime` instantiates.
//!
//! # Invariants
//! - Superclass edges stay names until `resolve` is requested.
//! - A failed resolve never populates the prototype cache.
//! - Resolution scratch state lives on the call stack, never on the registry.

pub mod entry;
pub mod instance;
pub mod registry;
pub mod resolve;
