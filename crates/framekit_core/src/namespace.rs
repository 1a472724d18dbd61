//! Dotted-path namespace container.
//!
//! # Responsibility
//! - Address classes, bundles and named values by dotted paths.
//! - Support subtree listing and purging by package prefix.
//!
//! # Invariants
//! - Paths are non-empty dot-separated segments without whitespace.
//! - Removing the last entry under a branch prunes the empty branch.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

static PATH_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^.\s]+(\.[^.\s]+)*$").expect("valid namespace path regex"));

/// Value published at one namespace path.
#[derive(Debug, Clone, PartialEq)]
pub enum NamespaceEntry {
    /// Fully-qualified class name in the class registry.
    Class(String),
    /// Bundle identifier in the bundle manager.
    Bundle(String),
    /// Free-form named value, e.g. a sandbox handle.
    Value(Value),
}

/// Namespace errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceError {
    InvalidPath(String),
}

impl Display for NamespaceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPath(value) => write!(f, "namespace path is invalid: `{value}`"),
        }
    }
}

impl Error for NamespaceError {}

#[derive(Debug, Default)]
struct Node {
    entry: Option<NamespaceEntry>,
    children: BTreeMap<String, Node>,
}

impl Node {
    fn is_empty(&self) -> bool {
        self.entry.is_none() && self.children.is_empty()
    }

    fn count_entries(&self) -> usize {
        usize::from(self.entry.is_some())
            + self
                .children
                .values()
                .map(Node::count_entries)
                .sum::<usize>()
    }

    fn collect_paths(&self, prefix: &str, out: &mut Vec<String>) {
        for (segment, child) in &self.children {
            let path = if prefix.is_empty() {
                segment.clone()
            } else {
                format!("{prefix}.{segment}")
            };
            if child.entry.is_some() {
                out.push(path.clone());
            }
            child.collect_paths(&path, out);
        }
    }

    fn remove_at(&mut self, segments: &[&str]) -> Option<NamespaceEntry> {
        let (head, rest) = segments.split_first()?;
        let child = self.children.get_mut(*head)?;
        let removed = if rest.is_empty() {
            child.entry.take()
        } else {
            child.remove_at(rest)
        };
        if child.is_empty() {
            self.children.remove(*head);
        }
        removed
    }
}

/// Tree of dotted paths.
#[derive(Debug, Default)]
pub struct Namespace {
    root: Node,
}

impl Namespace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes `entry` at `path`, returning the entry it replaced.
    pub fn set(
        &mut self,
        path: &str,
        entry: NamespaceEntry,
    ) -> Result<Option<NamespaceEntry>, NamespaceError> {
        let segments = split_path(path)?;
        let mut node = &mut self.root;
        for segment in segments {
            node = node.children.entry(segment.to_string()).or_default();
        }
        Ok(node.entry.replace(entry))
    }

    /// Returns the entry at `path`; invalid paths resolve to nothing.
    pub fn get(&self, path: &str) -> Option<&NamespaceEntry> {
        self.node(path)?.entry.as_ref()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.get(path).is_some()
    }

    /// Removes the entry at `path`, keeping nested entries.
    pub fn remove(&mut self, path: &str) -> Option<NamespaceEntry> {
        let segments = split_path(path).ok()?;
        self.root.remove_at(&segments)
    }

    /// Immediate child segment names under `path`; blank means the root.
    pub fn children(&self, path: &str) -> Vec<String> {
        let node = if path.trim().is_empty() {
            Some(&self.root)
        } else {
            self.node(path)
        };
        node.map(|node| node.children.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Every path holding an entry, sorted.
    pub fn paths(&self) -> Vec<String> {
        let mut out = Vec::new();
        self.root.collect_paths("", &mut out);
        out
    }

    /// Removes `prefix` and its whole subtree, returning the removed entry
    /// count.
    pub fn purge(&mut self, prefix: &str) -> usize {
        let Ok(segments) = split_path(prefix) else {
            return 0;
        };
        let Some((last, parents)) = segments.split_last() else {
            return 0;
        };
        let mut node = &mut self.root;
        for segment in parents {
            match node.children.get_mut(*segment) {
                Some(child) => node = child,
                None => return 0,
            }
        }
        node.children
            .remove(*last)
            .map(|subtree| subtree.count_entries())
            .unwrap_or(0)
    }

    fn node(&self, path: &str) -> Option<&Node> {
        let segments = split_path(path).ok()?;
        let mut node = &self.root;
        for segment in segments {
            node = node.children.get(segment)?;
        }
        Some(node)
    }
}

/// Validates and splits a dotted path.
pub fn split_path(path: &str) -> Result<Vec<&str>, NamespaceError> {
    let trimmed = path.trim();
    if !PATH_RE.is_match(trimmed) {
        return Err(NamespaceError::InvalidPath(path.to_string()));
    }
    Ok(trimmed.split('.').collect())
}

#[cfg(test)]
mod tests {
    use super::{split_path, Namespace, NamespaceEntry, NamespaceError};
    use serde_json::json;

    #[test]
    fn split_path_rejects_malformed_paths() {
        for bad in ["", "  ", ".a", "a.", "a..b", "a b.c"] {
            let err = split_path(bad).expect_err("malformed path must fail");
            assert!(matches!(err, NamespaceError::InvalidPath(_)));
        }
        assert_eq!(
            split_path(" framekit.bundle.map ").expect("valid path"),
            vec!["framekit", "bundle", "map"]
        );
    }

    #[test]
    fn set_get_and_replace() {
        let mut namespace = Namespace::new();
        let previous = namespace
            .set("framekit.sandbox", NamespaceEntry::Value(json!("first")))
            .expect("set");
        assert!(previous.is_none());
        let previous = namespace
            .set("framekit.sandbox", NamespaceEntry::Value(json!("second")))
            .expect("replace");
        assert_eq!(previous, Some(NamespaceEntry::Value(json!("first"))));
        assert_eq!(
            namespace.get("framekit.sandbox"),
            Some(&NamespaceEntry::Value(json!("second")))
        );
        assert!(namespace.get("framekit").is_none());
    }

    #[test]
    fn remove_prunes_empty_branches_but_keeps_nested_entries() {
        let mut namespace = Namespace::new();
        namespace
            .set("a.b", NamespaceEntry::Class("a.b".to_string()))
            .expect("set a.b");
        namespace
            .set("a.b.c", NamespaceEntry::Class("a.b.c".to_string()))
            .expect("set a.b.c");

        assert!(namespace.remove("a.b").is_some());
        assert!(namespace.contains("a.b.c"));
        assert!(namespace.remove("a.b.c").is_some());
        assert!(namespace.children("").is_empty());
    }

    #[test]
    fn purge_removes_subtree_and_counts_entries() {
        let mut namespace = Namespace::new();
        for path in ["pkg.one", "pkg.two", "pkg.two.three", "other.one"] {
            namespace
                .set(path, NamespaceEntry::Class(path.to_string()))
                .expect("set");
        }
        assert_eq!(namespace.purge("pkg"), 3);
        assert_eq!(namespace.paths(), vec!["other.one".to_string()]);
        assert_eq!(namespace.purge("missing.branch"), 0);
    }
}
