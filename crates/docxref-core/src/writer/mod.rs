/*
 * writer/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output writers.
 */

//! Output writers.
//!
//! The compile pipeline assembles one [`RenderedDocument`] per compilation:
//! headings, paragraphs and entity blocks with their captions and resolved
//! references already in place. Each output format has one
//! [`DocumentWriter`] that serializes it; writers never number or resolve
//! anything themselves.
//!
//! - [`docx`] - WordprocessingML package (all parts)
//! - [`wordml`] - the `word/document.xml` body
//! - [`html`] - standalone XHTML

pub mod docx;
pub mod html;
pub mod wordml;

use serde::Serialize;

use crate::document::{EntityBody, Section};
use crate::error::Result;
use crate::field::Caption;
use crate::format::OutputFormat;
use crate::resolve::ResolvedRef;

pub use docx::DocxWriter;
pub use html::HtmlWriter;

/// Inline content after resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RenderedRun {
    Text { text: String },
    Reference(ResolvedRef),
}

impl RenderedRun {
    pub fn text(text: impl Into<String>) -> Self {
        RenderedRun::Text { text: text.into() }
    }

    /// Text as shown before any recompute.
    pub fn display_text(&self) -> String {
        match self {
            RenderedRun::Text { text } => text.clone(),
            RenderedRun::Reference(r) => crate::field::cached_text(&r.fields),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum RenderedBlock {
    Heading {
        level: u8,
        section: Section,
        /// Chapter number of level-1 headings (`2`, `B`).
        number: Option<String>,
        /// Stable id for links (`sec-3`).
        id: String,
        runs: Vec<RenderedRun>,
    },
    Paragraph {
        runs: Vec<RenderedRun>,
    },
    Entity {
        key: String,
        body: EntityBody,
        caption: Caption,
    },
}

/// A fully numbered and resolved document, ready for any writer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RenderedDocument {
    pub title: Option<String>,
    pub toc: bool,
    pub blocks: Vec<RenderedBlock>,
}

impl RenderedDocument {
    /// Caption text of every entity, in document order.
    pub fn captions(&self) -> impl Iterator<Item = (&str, String)> {
        self.blocks.iter().filter_map(|b| match b {
            RenderedBlock::Entity { key, caption, .. } => Some((key.as_str(), caption.text())),
            _ => None,
        })
    }

    /// Visible text of every paragraph, in document order.
    pub fn paragraph_texts(&self) -> impl Iterator<Item = String> + '_ {
        self.blocks.iter().filter_map(|b| match b {
            RenderedBlock::Paragraph { runs } => {
                Some(runs.iter().map(RenderedRun::display_text).collect())
            }
            _ => None,
        })
    }
}

/// Serializes a [`RenderedDocument`] into one output format.
pub trait DocumentWriter: Send + Sync {
    fn format(&self) -> OutputFormat;

    /// The bytes of the finished artifact.
    fn write(&self, document: &RenderedDocument) -> Result<Vec<u8>>;
}

/// The writer for a format.
pub fn writer_for(format: OutputFormat) -> Box<dyn DocumentWriter> {
    match format {
        OutputFormat::Docx => Box::new(DocxWriter::new()),
        OutputFormat::Html => Box::new(HtmlWriter::new()),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::document::{DocPosition, TableData};
    use crate::field::{Anchor, FieldExpr};

    pub fn caption(label: &str, anchor: &str, id: u32, chapter: &str, seq: u32, text: &str) -> Caption {
        Caption {
            prefix: vec![FieldExpr::literal(format!("{} ", label))],
            anchor: Anchor {
                name: anchor.to_string(),
                id,
            },
            number: vec![
                FieldExpr::ChapterNumber {
                    section: Section::Main,
                    cached: chapter.to_string(),
                },
                FieldExpr::literal("-"),
                FieldExpr::Seq {
                    identifier: label.to_string(),
                    restart: seq == 1,
                    chapter_scoped: true,
                    cached: seq,
                },
            ],
            suffix: vec![FieldExpr::literal(format!(": {}", text))],
        }
    }

    /// One chapter with a figure, a table and a paragraph referencing both
    /// plus a missing key.
    pub fn document() -> RenderedDocument {
        let reference = |target: &str, anchor: &str, label: &str, block: usize| {
            RenderedRun::Reference(ResolvedRef {
                position: DocPosition::new(0, block, 1),
                target: target.to_string(),
                fields: vec![
                    FieldExpr::literal(format!("{} ", label)),
                    FieldExpr::Ref {
                        anchor: anchor.to_string(),
                        target: target.to_string(),
                        cached: "1-1".to_string(),
                    },
                ],
            })
        };
        RenderedDocument {
            title: Some("Report".to_string()),
            toc: true,
            blocks: vec![
                RenderedBlock::Heading {
                    level: 1,
                    section: Section::Main,
                    number: Some("1".to_string()),
                    id: "sec-1".to_string(),
                    runs: vec![RenderedRun::text("Intro")],
                },
                RenderedBlock::Entity {
                    key: "fig:a".to_string(),
                    body: EntityBody::Figure {
                        path: "a.png".to_string(),
                    },
                    caption: caption("Figure", "_Reffig_a", 0, "1", 1, "First"),
                },
                RenderedBlock::Entity {
                    key: "tbl:t".to_string(),
                    body: EntityBody::Table(TableData {
                        columns: vec!["Name".to_string(), "Value".to_string()],
                        rows: vec![vec!["a".to_string(), "1".to_string()]],
                    }),
                    caption: caption("Table", "_Reftbl_t", 1, "1", 1, "Values"),
                },
                RenderedBlock::Paragraph {
                    runs: vec![
                        RenderedRun::text("Reference to figure: "),
                        reference("fig:a", "_Reffig_a", "Figure", 3),
                        RenderedRun::text(" and "),
                        reference("tbl:t", "_Reftbl_t", "Table", 3),
                        RenderedRun::text(" but not "),
                        RenderedRun::Reference(ResolvedRef {
                            position: DocPosition::new(0, 3, 5),
                            target: "fig:missing".to_string(),
                            fields: vec![FieldExpr::BrokenRef {
                                target: "fig:missing".to_string(),
                            }],
                        }),
                    ],
                },
            ],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paragraph_text_keeps_run_order() {
        let doc = fixtures::document();
        let texts: Vec<String> = doc.paragraph_texts().collect();
        assert_eq!(
            texts,
            ["Reference to figure: Figure 1-1 and Table 1-1 but not [??fig:missing]"]
        );
    }

    #[test]
    fn test_captions() {
        let doc = fixtures::document();
        let captions: Vec<(&str, String)> = doc.captions().collect();
        assert_eq!(captions[0], ("fig:a", "Figure 1-1: First".to_string()));
        assert_eq!(captions[1], ("tbl:t", "Table 1-1: Values".to_string()));
    }

    #[test]
    fn test_writer_for_matches_format() {
        for format in [OutputFormat::Docx, OutputFormat::Html] {
            assert_eq!(writer_for(format).format(), format);
        }
    }
}
