//! Predefined base archetypes and builder name serials.

use crate::class::entry::{noop_constructor, ClassMetadata, MethodSet};
use crate::class::registry::{ClassError, ClassRegistry};
use std::collections::BTreeMap;

/// Prefix of classes declared through `event_cls`.
pub const EVENT_CLASS_PREFIX: &str = "framekit.event.registry.";
/// Prefix of classes declared through `request_cls`.
pub const REQUEST_CLASS_PREFIX: &str = "framekit.request.registry.";
/// Prefix of classes declared through `cls` without a name.
pub const ANONYMOUS_CLASS_PREFIX: &str = "framekit._.";

/// Protocol tag carried by event classes.
pub const EVENT_PROTOCOL: &str = "framekit.event.Event";
/// Protocol tag carried by request classes.
pub const REQUEST_PROTOCOL: &str = "framekit.request.Request";
/// Protocol tag carried by bundle classes.
pub const BUNDLE_PROTOCOL: &str = "framekit.bundle.Bundle";

/// Fixed set of base classes the specialized builders extend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Archetype {
    Extension,
    Bundle,
    Tile,
    Flyout,
    View,
}

impl Archetype {
    pub const ALL: [Archetype; 5] = [
        Archetype::Extension,
        Archetype::Bundle,
        Archetype::Tile,
        Archetype::Flyout,
        Archetype::View,
    ];

    /// Fully-qualified name of the base class.
    pub fn base_class(self) -> &'static str {
        match self {
            Self::Extension => "framekit.userinterface.extension.EnhancedExtension",
            Self::Bundle => "framekit.bundle.extension.ExtensionBundle",
            Self::Tile => "framekit.userinterface.extension.EnhancedTile",
            Self::Flyout => "framekit.userinterface.extension.EnhancedFlyout",
            Self::View => "framekit.userinterface.extension.EnhancedView",
        }
    }
}

/// Defines every archetype base class that is not defined yet.
///
/// Each base is an empty class tagged with its own name. Collaborators may
/// redefine them with real behavior at any time.
pub fn define_base_archetypes(classes: &mut ClassRegistry) -> Result<(), ClassError> {
    for archetype in Archetype::ALL {
        let name = archetype.base_class();
        if classes.contains(name) {
            continue;
        }
        classes.define(
            name,
            noop_constructor(),
            MethodSet::new(),
            ClassMetadata::new().with_protocol(name),
        )?;
    }
    Ok(())
}

/// Per-kind counters used to generate class names, bundle ids and labels.
#[derive(Debug, Default)]
pub struct BuilderSerials {
    counters: BTreeMap<&'static str, u64>,
}

impl BuilderSerials {
    pub fn next(&mut self, kind: &'static str) -> u64 {
        let counter = self.counters.entry(kind).or_insert(0);
        *counter += 1;
        *counter
    }
}
