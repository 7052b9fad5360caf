/*
 * registry.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Identifier registry for numbered entities.
 */

//! Identifier registry.
//!
//! Every figure, table and equation declaration is registered in document
//! order. The first declaration of a raw key keeps it; each reuse gets the
//! next free suffix:
//!
//! ```
//! use docxref_core::document::EntityKind;
//! use docxref_core::registry::Registry;
//!
//! let mut registry = Registry::new();
//! let keys: Vec<String> = (0..4)
//!     .map(|_| registry.register("fig:x", EntityKind::Figure))
//!     .collect();
//! assert_eq!(keys, ["fig:x", "fig:x_1", "fig:x_2", "fig:x_3"]);
//! ```
//!
//! A registry belongs to exactly one compilation; it is never shared.

use rustc_hash::{FxHashMap, FxHashSet};

use crate::document::{DocPosition, EntityKind};

/// One entry of the registration log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub raw_key: String,
    pub unique_key: String,
    pub kind: EntityKind,
    pub position: Option<DocPosition>,
}

#[derive(Debug, Default)]
pub struct Registry {
    log: Vec<Registration>,
    /// Last suffix handed out per raw key.
    suffixes: FxHashMap<String, usize>,
    taken: FxHashSet<String>,
    by_unique_key: FxHashMap<String, usize>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a declaration and return its unique key. Never fails.
    pub fn register(&mut self, raw_key: &str, kind: EntityKind) -> String {
        self.register_entry(raw_key, kind, None)
    }

    /// Register a declaration found at `position`.
    pub fn register_at(&mut self, raw_key: &str, kind: EntityKind, position: DocPosition) -> String {
        self.register_entry(raw_key, kind, Some(position))
    }

    fn register_entry(
        &mut self,
        raw_key: &str,
        kind: EntityKind,
        position: Option<DocPosition>,
    ) -> String {
        let unique_key = if self.taken.contains(raw_key) {
            self.next_suffixed(raw_key)
        } else {
            raw_key.to_string()
        };

        tracing::trace!(raw_key, unique_key = %unique_key, "Registered entity");

        self.taken.insert(unique_key.clone());
        self.by_unique_key.insert(unique_key.clone(), self.log.len());
        self.log.push(Registration {
            raw_key: raw_key.to_string(),
            unique_key: unique_key.clone(),
            kind,
            position,
        });
        unique_key
    }

    // An explicitly declared `fig:x_1` occupies that suffix; skip past it.
    fn next_suffixed(&mut self, raw_key: &str) -> String {
        let n = self.suffixes.entry(raw_key.to_string()).or_insert(0);
        loop {
            *n += 1;
            let candidate = format!("{}_{}", raw_key, n);
            if !self.taken.contains(&candidate) {
                return candidate;
            }
        }
    }

    /// The registration log in first-seen order.
    pub fn entries(&self) -> &[Registration] {
        &self.log
    }

    pub fn get(&self, unique_key: &str) -> Option<&Registration> {
        self.by_unique_key.get(unique_key).map(|&i| &self.log[i])
    }

    pub fn contains(&self, unique_key: &str) -> bool {
        self.by_unique_key.contains_key(unique_key)
    }

    pub fn len(&self) -> usize {
        self.log.len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_first_registration_keeps_raw_key() {
        let mut registry = Registry::new();
        assert_eq!(registry.register("fig:a", EntityKind::Figure), "fig:a");
        assert_eq!(registry.register("tbl:a", EntityKind::Table), "tbl:a");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_suffixes_are_per_raw_key() {
        let mut registry = Registry::new();
        registry.register("fig:a", EntityKind::Figure);
        registry.register("tbl:t", EntityKind::Table);
        assert_eq!(registry.register("fig:a", EntityKind::Figure), "fig:a_1");
        assert_eq!(registry.register("tbl:t", EntityKind::Table), "tbl:t_1");
        assert_eq!(registry.register("fig:a", EntityKind::Figure), "fig:a_2");
    }

    #[test]
    fn test_explicit_suffix_is_skipped() {
        let mut registry = Registry::new();
        registry.register("fig:x_1", EntityKind::Figure);
        registry.register("fig:x", EntityKind::Figure);
        assert_eq!(registry.register("fig:x", EntityKind::Figure), "fig:x_2");
    }

    #[test]
    fn test_log_records_raw_key_and_position() {
        let mut registry = Registry::new();
        registry.register_at("eq:s", EntityKind::Equation, DocPosition::new(0, 3, 0));
        registry.register_at("eq:s", EntityKind::Equation, DocPosition::new(1, 0, 0));
        let entry = registry.get("eq:s_1").unwrap();
        assert_eq!(entry.raw_key, "eq:s");
        assert_eq!(entry.position, Some(DocPosition::new(1, 0, 0)));
        assert!(!registry.contains("eq:s_2"));
    }

    fn raw_keys() -> impl Strategy<Value = Vec<String>> {
        prop::collection::vec(
            prop_oneof![Just("fig:a"), Just("fig:b"), Just("tbl:a"), Just("fig:a_1")]
                .prop_map(String::from),
            0..40,
        )
    }

    proptest! {
        #[test]
        fn test_unique_keys_never_collide(keys in raw_keys()) {
            let mut registry = Registry::new();
            let mut seen = FxHashSet::default();
            for key in &keys {
                let unique = registry.register(key, EntityKind::Figure);
                prop_assert!(unique.starts_with(key.as_str()));
                prop_assert!(seen.insert(unique));
            }
            prop_assert_eq!(registry.len(), keys.len());
        }

        #[test]
        fn test_repeated_key_suffix_sequence(n in 1usize..20) {
            let mut registry = Registry::new();
            for i in 0..n {
                let unique = registry.register("fig:x", EntityKind::Figure);
                let expected = if i == 0 { "fig:x".to_string() } else { format!("fig:x_{}", i) };
                prop_assert_eq!(unique, expected);
            }
        }
    }
}
