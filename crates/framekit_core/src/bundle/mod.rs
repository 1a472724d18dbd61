//! Bundle lifecycle contracts.
//!
//! This module defines how bundles are installed, materialized into
//! factories and turned into live instances. Starting and stopping instances
//! is orchestrated by the framework facade; the manager only records the
//! resulting states.

pub mod factory;
pub mod manager;
