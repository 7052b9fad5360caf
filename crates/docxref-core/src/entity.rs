/*
 * entity.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Registered entities of one compilation.
 */

//! Registered entities of one compilation.

use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::document::{DocPosition, EntityKind};
use crate::field::Anchor;
use crate::numbering::{EntityNumber, ScopeId};

/// A numbered figure, table or equation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Entity {
    pub raw_key: String,
    pub unique_key: String,
    pub kind: EntityKind,
    pub caption: String,
    pub position: DocPosition,
    pub number: EntityNumber,
    /// Assigned by the anchor synthesizer.
    pub anchor: Option<Anchor>,
}

impl Entity {
    pub fn scope(&self) -> ScopeId {
        self.number.scope
    }

    pub fn sequence_index(&self) -> u32 {
        self.number.sequence_index
    }

    pub fn anchor_name(&self) -> Option<&str> {
        self.anchor.as_ref().map(|a| a.name.as_str())
    }
}

/// Entities in document order, indexed by unique key.
///
/// After anchor synthesis this doubles as the `unique_key -> anchor` side
/// table the resolver reads.
#[derive(Debug, Clone, Default, Serialize)]
pub struct EntityTable {
    entities: Vec<Entity>,
    #[serde(skip)]
    by_key: FxHashMap<String, usize>,
}

impl EntityTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, entity: Entity) {
        self.by_key.insert(entity.unique_key.clone(), self.entities.len());
        self.entities.push(entity);
    }

    pub fn get(&self, unique_key: &str) -> Option<&Entity> {
        self.by_key.get(unique_key).map(|&i| &self.entities[i])
    }

    pub fn anchor_name(&self, unique_key: &str) -> Option<&str> {
        self.get(unique_key).and_then(Entity::anchor_name)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, Entity> {
        self.entities.iter_mut()
    }

    pub fn as_slice(&self) -> &[Entity] {
        &self.entities
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

impl<'a> IntoIterator for &'a EntityTable {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
