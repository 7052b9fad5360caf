/*
 * field.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Format-independent field expressions.
 */

//! Format-independent field expressions.
//!
//! Captions and reference sites are assembled as sequences of [`FieldExpr`].
//! Each writer has exactly one serializer for the type: the Word writer turns
//! fields into complex field runs the word processor evaluates, the HTML
//! writer prints their cached values.
//!
//! Every field carries the value the engine computed for it, so a package
//! reads correctly even before the word processor recomputes anything.

use serde::Serialize;

use crate::document::{EntityKind, Section};

/// Name of the heading style the chapter field looks up.
pub fn chapter_style(section: Section) -> &'static str {
    match section {
        Section::Main => "Heading 1",
        Section::Appendix => "Appendix",
    }
}

/// Sequence identifier of a kind. Fixed per kind so display labels never
/// merge two kinds into one Word counter.
pub fn seq_identifier(kind: EntityKind) -> &'static str {
    match kind {
        EntityKind::Figure => "Figure",
        EntityKind::Table => "Table",
        EntityKind::Equation => "Equation",
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum FieldExpr {
    /// Plain text.
    Literal(String),
    /// The number of the enclosing chapter heading.
    ChapterNumber { section: Section, cached: String },
    /// The next value of a named sequence.
    Seq {
        identifier: String,
        /// Reset the sequence to 1 here.
        restart: bool,
        /// Reset at every chapter heading.
        chapter_scoped: bool,
        cached: u32,
    },
    /// The rendered number found at an anchor.
    Ref {
        anchor: String,
        target: String,
        cached: String,
    },
    /// A reference whose target does not exist; rendered as a visible marker.
    BrokenRef { target: String },
}

impl FieldExpr {
    pub fn literal(text: impl Into<String>) -> Self {
        FieldExpr::Literal(text.into())
    }

    /// Field instruction text, or `None` for literals and broken markers.
    pub fn instruction(&self) -> Option<String> {
        match self {
            FieldExpr::Literal(_) | FieldExpr::BrokenRef { .. } => None,
            FieldExpr::ChapterNumber { section, .. } => Some(format!(
                r#" STYLEREF \s "{}" \n "#,
                chapter_style(*section)
            )),
            FieldExpr::Seq {
                identifier,
                restart,
                chapter_scoped,
                ..
            } => {
                let mut instr = format!(r" SEQ {} \* ARABIC", identifier);
                if *restart {
                    instr.push_str(r" \r 1");
                }
                if *chapter_scoped {
                    instr.push_str(r" \s 1");
                }
                instr.push(' ');
                Some(instr)
            }
            FieldExpr::Ref { anchor, .. } => Some(format!(r" REF {} \h ", anchor)),
        }
    }

    /// Text shown before (or without) recompute.
    pub fn cached_text(&self) -> String {
        match self {
            FieldExpr::Literal(text) => text.clone(),
            FieldExpr::ChapterNumber { cached, .. } => cached.clone(),
            FieldExpr::Seq { cached, .. } => cached.to_string(),
            FieldExpr::Ref { cached, .. } => cached.clone(),
            FieldExpr::BrokenRef { target } => broken_marker(target),
        }
    }

    pub fn is_field(&self) -> bool {
        self.instruction().is_some()
    }

    /// Fields that contribute to a caption number.
    pub fn is_number_field(&self) -> bool {
        matches!(self, FieldExpr::ChapterNumber { .. } | FieldExpr::Seq { .. })
    }
}

/// Visible text of a broken reference.
pub fn broken_marker(target: &str) -> String {
    format!("[??{}]", target)
}

/// Concatenated cached text of a run of fields.
pub fn cached_text(fields: &[FieldExpr]) -> String {
    fields.iter().map(FieldExpr::cached_text).collect()
}

/// Named anchor wrapping a caption number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Anchor {
    pub name: String,
    /// Package-wide id pairing the open and close delimiters.
    pub id: u32,
}

/// A synthesized caption: `prefix`, then `number` inside the anchor, then
/// `suffix`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Caption {
    pub prefix: Vec<FieldExpr>,
    pub anchor: Anchor,
    pub number: Vec<FieldExpr>,
    pub suffix: Vec<FieldExpr>,
}

impl Caption {
    /// The rendered number (`2-1`).
    pub fn number_text(&self) -> String {
        cached_text(&self.number)
    }

    /// The whole caption line as displayed.
    pub fn text(&self) -> String {
        format!(
            "{}{}{}",
            cached_text(&self.prefix),
            self.number_text(),
            cached_text(&self.suffix)
        )
    }

    /// Every field and literal in display order.
    pub fn parts(&self) -> impl Iterator<Item = &FieldExpr> {
        self.prefix
            .iter()
            .chain(self.number.iter())
            .chain(self.suffix.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_instructions() {
        let first = FieldExpr::Seq {
            identifier: "Figure".to_string(),
            restart: true,
            chapter_scoped: true,
            cached: 1,
        };
        assert_eq!(first.instruction().unwrap(), r" SEQ Figure \* ARABIC \r 1 \s 1 ");

        let continuous = FieldExpr::Seq {
            identifier: "Table".to_string(),
            restart: false,
            chapter_scoped: false,
            cached: 7,
        };
        assert_eq!(continuous.instruction().unwrap(), r" SEQ Table \* ARABIC ");
        assert_eq!(continuous.cached_text(), "7");
    }

    #[test]
    fn test_chapter_and_ref_instructions() {
        let chapter = FieldExpr::ChapterNumber {
            section: Section::Appendix,
            cached: "B".to_string(),
        };
        assert_eq!(chapter.instruction().unwrap(), r#" STYLEREF \s "Appendix" \n "#);

        let reference = FieldExpr::Ref {
            anchor: "_Reffig_x".to_string(),
            target: "fig:x".to_string(),
            cached: "1-2".to_string(),
        };
        assert_eq!(reference.instruction().unwrap(), r" REF _Reffig_x \h ");
    }

    #[test]
    fn test_broken_ref_is_not_a_field() {
        let broken = FieldExpr::BrokenRef {
            target: "fig:missing".to_string(),
        };
        assert!(!broken.is_field());
        assert_eq!(broken.cached_text(), "[??fig:missing]");
    }

    #[test]
    fn test_seq_identifier_is_per_kind() {
        let ids: Vec<&str> = EntityKind::ALL.into_iter().map(seq_identifier).collect();
        assert_eq!(ids, ["Figure", "Table", "Equation"]);
    }

    #[test]
    fn test_caption_text() {
        let caption = Caption {
            prefix: vec![FieldExpr::literal("Figure ")],
            anchor: Anchor {
                name: "_Reffig_x".to_string(),
                id: 0,
            },
            number: vec![
                FieldExpr::ChapterNumber {
                    section: Section::Main,
                    cached: "2".to_string(),
                },
                FieldExpr::literal("-"),
                FieldExpr::Seq {
                    identifier: "Figure".to_string(),
                    restart: false,
                    chapter_scoped: true,
                    cached: 3,
                },
            ],
            suffix: vec![FieldExpr::literal(": Overview")],
        };
        assert_eq!(caption.number_text(), "2-3");
        assert_eq!(caption.text(), "Figure 2-3: Overview");
        assert_eq!(caption.parts().filter(|p| p.is_number_field()).count(), 2);
    }
}
