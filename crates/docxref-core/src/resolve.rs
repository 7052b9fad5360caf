/*
 * resolve.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Reference resolution.
 */

//! Reference resolution.
//!
//! Each in-text reference becomes a short run of fields: the label as a
//! literal followed by a `REF` field to the target's anchor (or the `REF`
//! alone for number-only references). The caption text never appears at a
//! reference site.
//!
//! A reference to an unknown key becomes a visible broken-reference marker
//! and an X-2-1 diagnostic; no field is ever emitted for it.

use docxref_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use rustc_hash::FxHashMap;
use serde::Serialize;

use crate::config::Labels;
use crate::document::{DisplayMode, DocPosition};
use crate::entity::EntityTable;
use crate::field::FieldExpr;

/// A reference marker found in the intermediate documents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reference {
    pub target: String,
    pub position: DocPosition,
    pub display: DisplayMode,
    pub location: Option<SourceLocation>,
}

/// What a reference site renders as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedRef {
    pub position: DocPosition,
    pub target: String,
    pub fields: Vec<FieldExpr>,
}

impl ResolvedRef {
    pub fn is_broken(&self) -> bool {
        self.fields
            .iter()
            .any(|f| matches!(f, FieldExpr::BrokenRef { .. }))
    }
}

/// Resolved references keyed by position, plus a diagnostic per dangling one.
#[derive(Debug, Default)]
pub struct Resolution {
    by_position: FxHashMap<DocPosition, ResolvedRef>,
    order: Vec<DocPosition>,
    pub dangling: Vec<DiagnosticMessage>,
}

impl Resolution {
    pub fn get(&self, position: &DocPosition) -> Option<&ResolvedRef> {
        self.by_position.get(position)
    }

    /// Resolved references in ascending document order.
    pub fn iter(&self) -> impl Iterator<Item = &ResolvedRef> {
        self.order.iter().filter_map(|p| self.by_position.get(p))
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}

pub struct Resolver<'a> {
    entities: &'a EntityTable,
    labels: &'a Labels,
}

impl<'a> Resolver<'a> {
    pub fn new(entities: &'a EntityTable, labels: &'a Labels) -> Self {
        Self { entities, labels }
    }

    /// Resolve every reference, in ascending document order.
    pub fn resolve(&self, references: &[Reference]) -> Resolution {
        let mut ordered: Vec<&Reference> = references.iter().collect();
        ordered.sort_by_key(|r| r.position);

        let mut resolution = Resolution::default();
        for reference in ordered {
            let fields = match self.fields_for(reference) {
                Some(fields) => fields,
                None => {
                    tracing::warn!(target_key = %reference.target, "Unresolved cross-reference");
                    resolution.dangling.push(self.dangling(reference));
                    vec![FieldExpr::BrokenRef {
                        target: reference.target.clone(),
                    }]
                }
            };
            resolution.order.push(reference.position);
            resolution.by_position.insert(
                reference.position,
                ResolvedRef {
                    position: reference.position,
                    target: reference.target.clone(),
                    fields,
                },
            );
        }

        tracing::debug!(
            references = resolution.len(),
            dangling = resolution.dangling.len(),
            "Resolved references"
        );
        resolution
    }

    fn fields_for(&self, reference: &Reference) -> Option<Vec<FieldExpr>> {
        let entity = self.entities.get(&reference.target)?;
        let anchor = entity.anchor_name()?;
        let field = FieldExpr::Ref {
            anchor: anchor.to_string(),
            target: entity.unique_key.clone(),
            cached: entity.number.display(),
        };
        Some(match reference.display {
            DisplayMode::NumberOnly => vec![field],
            DisplayMode::LabelAndNumber => vec![
                FieldExpr::literal(format!("{} ", self.labels.label_for(entity.kind))),
                field,
            ],
        })
    }

    fn dangling(&self, reference: &Reference) -> DiagnosticMessage {
        let mut builder = DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-2-1")
            .problem(format!(
                "No figure, table or equation is declared with key `{}`",
                reference.target
            ))
            .add_info(format!(
                "The reference renders as `[??{}]`",
                reference.target
            ));
        if let Some(similar) = self.similar_key(&reference.target) {
            builder = builder.add_hint(format!("Did you mean `{}`?", similar));
        }
        if let Some(location) = &reference.location {
            builder = builder.with_location(location.clone());
        }
        builder.build()
    }

    // Same name under another kind prefix, e.g. `tbl:x` when only `fig:x` exists.
    fn similar_key(&self, target: &str) -> Option<&str> {
        let name = target.split_once(':').map_or(target, |(_, name)| name);
        self.entities
            .iter()
            .map(|e| e.unique_key.as_str())
            .find(|key| key.split_once(':').is_some_and(|(_, n)| n == name))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AnchorPolicy, NumberingPolicy};
    use crate::anchor::AnchorSynthesizer;
    use crate::document::EntityKind;
    use crate::entity::Entity;
    use crate::field::cached_text;
    use crate::numbering::Numbering;

    fn table() -> EntityTable {
        let mut numbering = Numbering::new(NumberingPolicy::RestartPerChapter);
        let mut table = EntityTable::new();
        numbering.start_chapter();
        numbering.start_chapter();
        numbering.next(EntityKind::Figure);
        table.push(Entity {
            raw_key: "fig:x".to_string(),
            unique_key: "fig:x".to_string(),
            kind: EntityKind::Figure,
            caption: "Long caption text".to_string(),
            position: DocPosition::new(0, 1, 0),
            number: numbering.next(EntityKind::Figure),
            anchor: None,
        });
        let labels = Labels::default();
        AnchorSynthesizer::new(AnchorPolicy::Semantic, NumberingPolicy::RestartPerChapter, &labels)
            .assign(&mut table)
            .unwrap();
        table
    }

    fn reference(target: &str, block: usize, display: DisplayMode) -> Reference {
        Reference {
            target: target.to_string(),
            position: DocPosition::new(0, block, 0),
            display,
            location: None,
        }
    }

    #[test]
    fn test_label_and_number_never_includes_caption() {
        let table = table();
        let labels = Labels::default();
        let resolution = Resolver::new(&table, &labels)
            .resolve(&[reference("fig:x", 4, DisplayMode::LabelAndNumber)]);
        let resolved = resolution.iter().next().unwrap();
        assert_eq!(cached_text(&resolved.fields), "Figure 2-2");
        assert!(!cached_text(&resolved.fields).contains("caption"));
        assert!(matches!(&resolved.fields[1], FieldExpr::Ref { anchor, .. } if anchor == "_Reffig_x"));
    }

    #[test]
    fn test_number_only() {
        let table = table();
        let labels = Labels::default();
        let resolution =
            Resolver::new(&table, &labels).resolve(&[reference("fig:x", 4, DisplayMode::NumberOnly)]);
        let resolved = resolution.get(&DocPosition::new(0, 4, 0)).unwrap();
        assert_eq!(resolved.fields.len(), 1);
        assert_eq!(cached_text(&resolved.fields), "2-2");
    }

    #[test]
    fn test_dangling_reference_gets_marker_and_diagnostic() {
        let table = table();
        let labels = Labels::default();
        let resolution = Resolver::new(&table, &labels)
            .resolve(&[reference("tbl:x", 2, DisplayMode::LabelAndNumber)]);
        let resolved = resolution.iter().next().unwrap();
        assert!(resolved.is_broken());
        assert_eq!(cached_text(&resolved.fields), "[??tbl:x]");
        assert_eq!(resolution.dangling.len(), 1);
        let diag = &resolution.dangling[0];
        assert_eq!(diag.code.as_deref(), Some("X-2-1"));
        assert_eq!(diag.hints[0].as_str(), "Did you mean `fig:x`?");
    }

    #[test]
    fn test_resolution_order_is_ascending() {
        let table = table();
        let labels = Labels::default();
        let resolution = Resolver::new(&table, &labels).resolve(&[
            reference("fig:x", 9, DisplayMode::LabelAndNumber),
            reference("fig:x", 3, DisplayMode::NumberOnly),
        ]);
        let blocks: Vec<usize> = resolution.iter().map(|r| r.position.block).collect();
        assert_eq!(blocks, [3, 9]);
    }
}
