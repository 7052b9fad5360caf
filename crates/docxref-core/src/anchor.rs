/*
 * anchor.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Anchor names and caption number fields.
 */

//! Anchor synthesis.
//!
//! Gives every registered entity a package-unique anchor (bookmark) name and
//! builds its caption as a [`Caption`]: the label literal, the anchored number
//! fields, then the caption text. The anchor spans every field that
//! contributes to the number, so a reference to it renders `2-1` and not just
//! `1`.
//!
//! Two entities whose keys normalize to the same anchor name abort the
//! compilation (X-1-1).

use std::hash::{Hash, Hasher};

use docxref_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use rustc_hash::{FxHashMap, FxHasher};

use crate::config::{AnchorPolicy, Labels, NumberingPolicy};
use crate::entity::{Entity, EntityTable};
use crate::error::{Result, XrefError};
use crate::field::{Anchor, Caption, FieldExpr, seq_identifier};
use crate::numbering::ScopeId;

/// Prefix Word reserves for cross-reference bookmarks.
pub const ANCHOR_PREFIX: &str = "_Ref";

/// Longest bookmark name Word accepts.
pub const BOOKMARK_NAME_LIMIT: usize = 40;

/// Hex digits of the key hash kept at the end of a shortened name.
const SHORTENED_HASH_DIGITS: usize = 8;

fn key_hash(unique_key: &str) -> u64 {
    let mut hasher = FxHasher::default();
    unique_key.hash(&mut hasher);
    hasher.finish()
}

/// `_Ref` + unique key with everything outside `[A-Za-z0-9_]` replaced by
/// `_`. Names over the bookmark length limit keep their head plus `_` and a
/// hash of the full key, so `key` and `key_1` stay apart. The flag is set
/// when shortened.
pub fn semantic_anchor_name(unique_key: &str) -> (String, bool) {
    let mut name = String::with_capacity(ANCHOR_PREFIX.len() + unique_key.len());
    name.push_str(ANCHOR_PREFIX);
    name.extend(unique_key.chars().map(|c| {
        if c.is_ascii_alphanumeric() || c == '_' {
            c
        } else {
            '_'
        }
    }));
    if name.len() > BOOKMARK_NAME_LIMIT {
        name.truncate(BOOKMARK_NAME_LIMIT - SHORTENED_HASH_DIGITS - 1);
        let digest = key_hash(unique_key) & 0xffff_ffff;
        name.push_str(&format!("_{:08x}", digest));
        (name, true)
    } else {
        (name, false)
    }
}

/// `_Ref` + nine digits derived from the unique key.
pub fn word_native_anchor_name(unique_key: &str) -> String {
    let id = 100_000_000 + key_hash(unique_key) % 900_000_000;
    format!("{}{}", ANCHOR_PREFIX, id)
}

pub struct AnchorSynthesizer<'a> {
    policy: AnchorPolicy,
    numbering: NumberingPolicy,
    labels: &'a Labels,
}

impl<'a> AnchorSynthesizer<'a> {
    pub fn new(policy: AnchorPolicy, numbering: NumberingPolicy, labels: &'a Labels) -> Self {
        Self {
            policy,
            numbering,
            labels,
        }
    }

    /// Name every entity's anchor and number the anchor ids in document
    /// order. Returns warnings for shortened names.
    ///
    /// # Errors
    ///
    /// [`XrefError::AnchorCollision`] when two entities get the same name.
    pub fn assign(&self, table: &mut EntityTable) -> Result<Vec<DiagnosticMessage>> {
        let mut warnings = Vec::new();
        let mut owners: FxHashMap<String, String> = FxHashMap::default();

        for (id, entity) in table.iter_mut().enumerate() {
            let name = match self.policy {
                AnchorPolicy::Semantic => {
                    let (name, shortened) = semantic_anchor_name(&entity.unique_key);
                    if shortened {
                        warnings.push(
                            DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-1-2")
                                .problem(format!(
                                    "The anchor for `{}` was shortened to `{}`",
                                    entity.unique_key, name
                                ))
                                .build(),
                        );
                    }
                    name
                }
                AnchorPolicy::WordNative => word_native_anchor_name(&entity.unique_key),
            };

            // Word matches bookmark names case-insensitively.
            let folded = name.to_ascii_lowercase();
            if let Some(owner) = owners.get(&folded) {
                return Err(XrefError::anchor_collision(collision(owner, &entity.unique_key, &name)));
            }
            owners.insert(folded, entity.unique_key.clone());

            tracing::trace!(key = %entity.unique_key, anchor = %name, "Assigned anchor");
            entity.anchor = Some(Anchor {
                name,
                id: id as u32,
            });
        }

        tracing::debug!(anchors = table.len(), "Synthesized anchors");
        Ok(warnings)
    }

    /// Build the caption of an entity. `None` before [`Self::assign`] ran.
    pub fn caption(&self, entity: &Entity) -> Option<Caption> {
        let anchor = entity.anchor.clone()?;
        let label = self.labels.label_for(entity.kind);
        let seq = |chapter_scoped: bool, restart: bool| FieldExpr::Seq {
            identifier: seq_identifier(entity.kind).to_string(),
            restart,
            chapter_scoped,
            cached: entity.number.sequence_index,
        };

        let number = match (self.numbering, entity.number.scope) {
            (NumberingPolicy::RestartPerChapter, ScopeId::Chapter { section, .. }) => vec![
                FieldExpr::ChapterNumber {
                    section,
                    cached: entity.number.scope.chapter_label().unwrap_or_default(),
                },
                FieldExpr::literal("-"),
                seq(true, entity.number.restarts),
            ],
            _ => vec![seq(false, false)],
        };

        let suffix = if entity.caption.trim().is_empty() {
            Vec::new()
        } else {
            vec![FieldExpr::literal(format!(": {}", entity.caption))]
        };

        Some(Caption {
            prefix: vec![FieldExpr::literal(format!("{} ", label))],
            anchor,
            number,
            suffix,
        })
    }
}

fn collision(first: &str, second: &str, name: &str) -> DiagnosticMessage {
    DiagnosticMessageBuilder::from_code(DiagnosticKind::Error, "X-1-1")
        .problem(format!("`{}` and `{}` both map to anchor `{}`", first, second, name))
        .add_hint("Rename one of the keys so they differ in letters or digits?")
        .build()
}
