//! Localization side-table keyed by bundle id.

use serde_json::Value;
use std::collections::BTreeMap;

/// Per-bundle, per-language message tables.
#[derive(Debug, Default)]
pub struct LocalizationRegistry {
    tables: BTreeMap<String, BTreeMap<String, Value>>,
}

impl LocalizationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers (or replaces) the table for `bundle_id` and `lang`.
    pub fn register(&mut self, bundle_id: &str, lang: &str, table: Value) {
        self.tables
            .entry(bundle_id.trim().to_string())
            .or_default()
            .insert(lang.trim().to_ascii_lowercase(), table);
    }

    pub fn get(&self, bundle_id: &str, lang: &str) -> Option<&Value> {
        self.tables
            .get(bundle_id.trim())?
            .get(lang.trim().to_ascii_lowercase().as_str())
    }

    /// Sorted languages registered for one bundle.
    pub fn languages(&self, bundle_id: &str) -> Vec<String> {
        self.tables
            .get(bundle_id.trim())
            .map(|tables| tables.keys().cloned().collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::LocalizationRegistry;
    use serde_json::json;

    #[test]
    fn registers_tables_per_language() {
        let mut registry = LocalizationRegistry::new();
        registry.register("layerlist", "EN", json!({ "title": "Layers" }));
        registry.register("layerlist", "fi", json!({ "title": "Tasot" }));

        assert_eq!(
            registry.get("layerlist", "en"),
            Some(&json!({ "title": "Layers" }))
        );
        assert_eq!(registry.languages("layerlist"), vec!["en", "fi"]);
        assert!(registry.get("search", "en").is_none());
    }
}
