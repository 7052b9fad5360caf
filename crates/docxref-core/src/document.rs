/*
 * document.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Intermediate documents handed to the numbering engine.
 */

//! Intermediate documents handed to the numbering engine.
//!
//! An upstream renderer (or the Markdown reader in [`crate::reader`])
//! turns each authoring source file into an [`IntermediateDocument`]: an
//! ordered list of blocks carrying entity declarations, reference markers
//! and scope boundaries. The engine never looks at the authoring syntax.
//!
//! The model round-trips through JSON so an external renderer can hand a
//! pre-built document sequence to `docxref render doc.json`.

use serde::{Deserialize, Serialize};

/// Which part of the document a block belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    #[default]
    Main,
    Appendix,
}

/// The kind of a numbered entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EntityKind {
    Figure,
    Table,
    Equation,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [EntityKind::Figure, EntityKind::Table, EntityKind::Equation];

    /// Key prefix authors use for this kind (`fig`, `tbl`, `eq`).
    pub fn key_prefix(&self) -> &'static str {
        match self {
            EntityKind::Figure => "fig",
            EntityKind::Table => "tbl",
            EntityKind::Equation => "eq",
        }
    }

    /// Kind named by the prefix of a key such as `fig:overview`.
    pub fn from_key(key: &str) -> Option<Self> {
        let (prefix, rest) = key.split_once(':')?;
        if rest.is_empty() {
            return None;
        }
        Self::ALL.into_iter().find(|k| k.key_prefix() == prefix)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Figure => "figure",
            EntityKind::Table => "table",
            EntityKind::Equation => "equation",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Byte range in the authoring source a block or marker came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextSpan {
    pub start: usize,
    pub end: usize,
}

impl TextSpan {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// Ordering key of a block or inline in the compiled document.
///
/// Compared field by field: file index, then block index, then inline offset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DocPosition {
    pub file: usize,
    pub block: usize,
    pub inline: usize,
}

impl DocPosition {
    pub fn new(file: usize, block: usize, inline: usize) -> Self {
        Self {
            file,
            block,
            inline,
        }
    }
}

/// How a reference renders at the citation site.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum DisplayMode {
    /// `1-2`
    NumberOnly,
    /// `Figure 1-2`
    #[default]
    LabelAndNumber,
}

/// One in-text reference marker as written by the author.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RefMarker {
    /// Key of the target entity (`fig:x`, or a suffixed reuse key `fig:x_1`).
    pub target: String,
    #[serde(default)]
    pub display: DisplayMode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
}

/// Inline content of headings and paragraphs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "kebab-case")]
pub enum Inline {
    Text(String),
    Reference(RefMarker),
}

/// Tabular payload of a table entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct TableData {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// What a numbered entity displays above or below its caption.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EntityBody {
    /// Image placeholder; image embedding is left to the layout engine.
    Figure { path: String },
    Table(TableData),
    /// TeX source, written verbatim.
    Equation { tex: String },
}

impl EntityBody {
    pub fn kind(&self) -> EntityKind {
        match self {
            EntityBody::Figure { .. } => EntityKind::Figure,
            EntityBody::Table(_) => EntityKind::Table,
            EntityBody::Equation { .. } => EntityKind::Equation,
        }
    }
}

/// A numbered entity declaration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityDecl {
    /// Author-supplied key, including its kind prefix.
    pub raw_key: String,
    pub caption: String,
    pub body: EntityBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub span: Option<TextSpan>,
}

impl EntityDecl {
    pub fn kind(&self) -> EntityKind {
        self.body.kind()
    }
}

/// A block of an intermediate document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Block {
    /// A heading; level 1 starts a new chapter.
    Heading { level: u8, inlines: Vec<Inline> },
    Paragraph { inlines: Vec<Inline> },
    Entity(EntityDecl),
    /// Everything after this marker belongs to the appendix.
    AppendixStart,
}

/// One source file after upstream rendering.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntermediateDocument {
    /// Name used in diagnostics (usually a project-relative path).
    pub source: String,
    #[serde(default)]
    pub section: Section,
    pub blocks: Vec<Block>,
}

impl IntermediateDocument {
    pub fn new(source: impl Into<String>, section: Section) -> Self {
        Self {
            source: source.into(),
            section,
            blocks: Vec::new(),
        }
    }

    pub fn push(&mut self, block: Block) -> &mut Self {
        self.blocks.push(block);
        self
    }

    /// Every entity declaration, in document order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityDecl> {
        self.blocks.iter().filter_map(|b| match b {
            Block::Entity(decl) => Some(decl),
            _ => None,
        })
    }
}

/// Helpers for building documents in code and tests.
pub mod build {
    use super::*;

    pub fn text(s: &str) -> Inline {
        Inline::Text(s.to_string())
    }

    pub fn reference(target: &str) -> Inline {
        Inline::Reference(RefMarker {
            target: target.to_string(),
            display: DisplayMode::LabelAndNumber,
            span: None,
        })
    }

    pub fn number_reference(target: &str) -> Inline {
        Inline::Reference(RefMarker {
            target: target.to_string(),
            display: DisplayMode::NumberOnly,
            span: None,
        })
    }

    pub fn chapter(title: &str) -> Block {
        Block::Heading {
            level: 1,
            inlines: vec![text(title)],
        }
    }

    pub fn paragraph(inlines: Vec<Inline>) -> Block {
        Block::Paragraph { inlines }
    }

    pub fn figure(key: &str, caption: &str) -> Block {
        Block::Entity(EntityDecl {
            raw_key: key.to_string(),
            caption: caption.to_string(),
            body: EntityBody::Figure {
                path: format!("{}.png", key.trim_start_matches("fig:")),
            },
            span: None,
        })
    }

    pub fn table(key: &str, caption: &str) -> Block {
        Block::Entity(EntityDecl {
            raw_key: key.to_string(),
            caption: caption.to_string(),
            body: EntityBody::Table(TableData {
                columns: vec!["Name".to_string(), "Value".to_string()],
                rows: vec![vec!["a".to_string(), "1".to_string()]],
            }),
            span: None,
        })
    }

    pub fn equation(key: &str, tex: &str) -> Block {
        Block::Entity(EntityDecl {
            raw_key: key.to_string(),
            caption: String::new(),
            body: EntityBody::Equation {
                tex: tex.to_string(),
            },
            span: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::build::*;
    use super::*;

    #[test]
    fn test_kind_from_key() {
        assert_eq!(EntityKind::from_key("fig:x"), Some(EntityKind::Figure));
        assert_eq!(EntityKind::from_key("tbl:test_table_1"), Some(EntityKind::Table));
        assert_eq!(EntityKind::from_key("eq:stress"), Some(EntityKind::Equation));
        assert_eq!(EntityKind::from_key("sec:intro"), None);
        assert_eq!(EntityKind::from_key("fig:"), None);
        assert_eq!(EntityKind::from_key("figure"), None);
    }

    #[test]
    fn test_doc_position_ordering() {
        let a = DocPosition::new(0, 5, 9);
        let b = DocPosition::new(1, 0, 0);
        let c = DocPosition::new(1, 0, 2);
        assert!(a < b);
        assert!(b < c);
    }

    #[test]
    fn test_json_shape() {
        let mut doc = IntermediateDocument::new("00-main/intro.md", Section::Main);
        doc.push(chapter("Intro"))
            .push(figure("fig:x", "An overview"))
            .push(paragraph(vec![text("See "), reference("fig:x")]));

        let json = serde_json::to_value(&doc).unwrap();
        assert_eq!(json["section"], "main");
        assert_eq!(json["blocks"][0]["type"], "heading");
        assert_eq!(json["blocks"][1]["type"], "entity");
        assert_eq!(json["blocks"][1]["body"]["type"], "figure");
        assert_eq!(json["blocks"][2]["inlines"][1]["type"], "reference");
        assert_eq!(json["blocks"][2]["inlines"][1]["value"]["target"], "fig:x");

        let back: IntermediateDocument = serde_json::from_value(json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn test_json_defaults() {
        let doc: IntermediateDocument = serde_json::from_str(
            r#"{"source": "a.md", "blocks": [
                {"type": "paragraph", "inlines": [{"type": "reference", "value": {"target": "tbl:t"}}]}
            ]}"#,
        )
        .unwrap();
        assert_eq!(doc.section, Section::Main);
        let Block::Paragraph { inlines } = &doc.blocks[0] else {
            panic!("expected paragraph");
        };
        let Inline::Reference(marker) = &inlines[0] else {
            panic!("expected reference");
        };
        assert_eq!(marker.display, DisplayMode::LabelAndNumber);
    }
}
