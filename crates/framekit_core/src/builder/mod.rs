//! Fluent class and bundle declaration API.
//!
//! # Responsibility
//! - Offer chainable handles over class entries.
//! - Provide the specialized declarations (event, request, extension,
//!   bundle, flyout, tile, view) on top of `cls`.
//!
//! # See also
//! - `crate::framework` for the entry points that hand out these handles.

pub mod archetype;
pub mod bundle_spec;
pub mod spec;
