/*
 * reader/markdown.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Line-based reader for the Markdown authoring subset.
 */

//! Line-based reader for the Markdown authoring subset.
//!
//! Recognized blocks:
//!
//! | Source                                    | Block                    |
//! |-------------------------------------------|--------------------------|
//! | `# Title`                                 | heading (level = `#`s)   |
//! | `![Caption](path.png){#fig:key}`          | figure entity            |
//! | pipe table + `Table: Caption {#tbl:key}`  | table entity             |
//! | `$$ tex $$ {#eq:key}`                     | equation entity          |
//! | `{{__name__}}{tbl:...}`                   | configured table entity  |
//! | `\appendix`                               | appendix boundary        |
//!
//! Everything else is paragraph text, split on blank lines. Inside
//! paragraphs and headings, `@fig:key`, `[@key]`, `[-@key]` and
//! `[@a; @b]` become reference markers.

use docxref_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation};
use hashlink::LinkedHashMap;
use once_cell::sync::Lazy;
use regex::Regex;

use super::table::{expand_table, parse_placeholder};
use crate::config::TableSpec;
use crate::document::{
    Block, DisplayMode, EntityBody, EntityDecl, Inline, IntermediateDocument, RefMarker, Section,
    TableData, TextSpan,
};

static HEADING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(#{1,6})[ \t]+(.*?)[ \t]*(?:\{[^}]*\})?[ \t]*$").unwrap());
static FIGURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*!\[(?P<caption>[^\]]*)\]\((?P<path>[^)\s]+)\)[ \t]*\{#(?P<key>fig:[^}\s]+)[^}]*\}[ \t]*$").unwrap()
});
static EQUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\$\$(?P<tex>.+?)\$\$[ \t]*\{#(?P<key>eq:[^}\s]+)\}[ \t]*$").unwrap());
static EQUATION_CLOSE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[ \t]*\$\$[ \t]*(?:\{#(?P<key>eq:[^}\s]+)\})?[ \t]*$").unwrap());
static TABLE_CAPTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[ \t]*(?:Table)?:[ \t]*(?P<caption>.*?)[ \t]*\{#(?P<key>tbl:[^}\s]+)\}[ \t]*$").unwrap()
});
static TABLE_SEPARATOR: Lazy<Regex> = Lazy::new(|| Regex::new(r"^:?-+:?$").unwrap());
static REFERENCE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\[(?P<group>-?@[^\[\]]+)\]|@(?P<bare>(?:fig|tbl|eq):\w[\w\-.:]*)").unwrap()
});

fn captures<'t>(re: &Regex, text: &'t str) -> Option<regex::Captures<'t>> {
    re.captures(text)
}

/// A document and the warnings found while reading it.
#[derive(Debug, Clone)]
pub struct ReadOutput {
    pub document: IntermediateDocument,
    pub diagnostics: Vec<DiagnosticMessage>,
}

/// Reads Markdown sources against the project's configured tables.
pub struct MarkdownReader<'a> {
    tables: &'a LinkedHashMap<String, TableSpec>,
}

impl<'a> MarkdownReader<'a> {
    pub fn new(tables: &'a LinkedHashMap<String, TableSpec>) -> Self {
        Self { tables }
    }

    /// Read one source file. `source` names it in diagnostics.
    pub fn read(&self, source: &str, content: &str, section: Section) -> ReadOutput {
        let mut lines = Vec::new();
        let mut offset = 0;
        for raw in content.split_inclusive('\n') {
            lines.push(Line {
                offset,
                text: raw.trim_end_matches(['\n', '\r']),
            });
            offset += raw.len();
        }

        let mut state = ReadState {
            reader: self,
            lines: &lines,
            document: IntermediateDocument::new(source, section),
            diagnostics: Vec::new(),
            paragraph: Vec::new(),
        };
        state.run();
        tracing::debug!(
            source,
            blocks = state.document.blocks.len(),
            "Read Markdown source"
        );
        ReadOutput {
            document: state.document,
            diagnostics: state.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Line<'t> {
    offset: usize,
    text: &'t str,
}

impl Line<'_> {
    fn end(&self) -> usize {
        self.offset + self.text.len()
    }
}

struct ReadState<'r, 't> {
    reader: &'r MarkdownReader<'r>,
    lines: &'r [Line<'t>],
    document: IntermediateDocument,
    diagnostics: Vec<DiagnosticMessage>,
    paragraph: Vec<Line<'t>>,
}

impl<'t> ReadState<'_, 't> {
    fn run(&mut self) {
        let mut i = 0;
        while i < self.lines.len() {
            i = self.step(i);
        }
        self.flush_paragraph();
    }

    /// Consume the block starting at line `i`; returns the next line index.
    fn step(&mut self, i: usize) -> usize {
        let line = self.lines[i];
        let trimmed = line.text.trim();

        if trimmed.is_empty() {
            self.flush_paragraph();
            return i + 1;
        }
        if trimmed == "\\appendix" {
            self.flush_paragraph();
            self.document.push(Block::AppendixStart);
            return i + 1;
        }
        if trimmed.starts_with("```") {
            return self.code_block(i);
        }
        if let Some(caps) = captures(&HEADING, line.text) {
            self.flush_paragraph();
            let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
            let mut inlines = Vec::new();
            if let Some(title) = caps.get(2) {
                parse_inlines(title.as_str(), line.offset + title.start(), &mut inlines);
            }
            self.document.push(Block::Heading { level, inlines });
            return i + 1;
        }
        if let Some(caps) = captures(&FIGURE, line.text) {
            self.flush_paragraph();
            self.push_entity(
                &caps["key"],
                &caps["caption"],
                EntityBody::Figure {
                    path: caps["path"].to_string(),
                },
                TextSpan::new(line.offset, line.end()),
            );
            return i + 1;
        }
        if let Some(placeholder) = parse_placeholder(line.text) {
            self.flush_paragraph();
            let span = TextSpan::new(line.offset, line.end());
            match self.reader.tables.get(&placeholder.name) {
                Some(spec) => {
                    let data = expand_table(spec, placeholder.annotation.as_ref());
                    self.push_entity(
                        &format!("tbl:{}", placeholder.name),
                        &spec.caption,
                        EntityBody::Table(data),
                        span,
                    );
                }
                None => {
                    self.unknown_table(&placeholder.name, span);
                    self.document.push(Block::Paragraph {
                        inlines: vec![Inline::Text(trimmed.to_string())],
                    });
                }
            }
            return i + 1;
        }
        if let Some(caps) = captures(&EQUATION, line.text) {
            self.flush_paragraph();
            self.push_entity(
                &caps["key"],
                "",
                EntityBody::Equation {
                    tex: caps["tex"].trim().to_string(),
                },
                TextSpan::new(line.offset, line.end()),
            );
            return i + 1;
        }
        if trimmed == "$$" {
            if let Some(next) = self.display_equation(i) {
                return next;
            }
        }
        if trimmed.starts_with('|') {
            if let Some(next) = self.table(i, None) {
                return next;
            }
        }
        if let Some(caps) = captures(&TABLE_CAPTION, line.text) {
            // Caption written above the table.
            if let Some(start) = self.next_non_blank(i + 1) {
                if self.lines[start].text.trim_start().starts_with('|') {
                    let caption = (caps["caption"].to_string(), caps["key"].to_string(), line);
                    if let Some(next) = self.table(start, Some(caption)) {
                        return next;
                    }
                }
            }
        }

        self.paragraph.push(line);
        i + 1
    }

    fn next_non_blank(&self, from: usize) -> Option<usize> {
        (from..self.lines.len()).find(|&j| !self.lines[j].text.trim().is_empty())
    }

    fn code_block(&mut self, i: usize) -> usize {
        self.flush_paragraph();
        let close = (i + 1..self.lines.len()).find(|&j| self.lines[j].text.trim().starts_with("```"));
        let end = close.unwrap_or(self.lines.len() - 1);
        let text: Vec<&str> = self.lines[i..=end].iter().map(|l| l.text).collect();
        self.document.push(Block::Paragraph {
            inlines: vec![Inline::Text(text.join("\n"))],
        });
        end + 1
    }

    /// `$$` on its own line, TeX lines, then `$$ {#eq:key}`.
    fn display_equation(&mut self, i: usize) -> Option<usize> {
        let close = (i + 1..self.lines.len()).find(|&j| captures(&EQUATION_CLOSE, self.lines[j].text).is_some())?;
        let caps = captures(&EQUATION_CLOSE, self.lines[close].text)?;
        let key = caps.name("key")?.as_str();
        self.flush_paragraph();
        let tex: Vec<&str> = self.lines[i + 1..close].iter().map(|l| l.text.trim()).collect();
        let span = TextSpan::new(self.lines[i].offset, self.lines[close].end());
        self.push_entity(
            key,
            "",
            EntityBody::Equation {
                tex: tex.join("\n"),
            },
            span,
        );
        Some(close + 1)
    }

    /// A pipe table starting at `start`. Without a caption above, the next
    /// non-blank line must be the caption.
    fn table(&mut self, start: usize, above: Option<(String, String, Line<'t>)>) -> Option<usize> {
        let mut end = start;
        while end < self.lines.len() && self.lines[end].text.trim_start().starts_with('|') {
            end += 1;
        }
        let data = parse_pipe_table(&self.lines[start..end])?;

        let (caption, key, span_start, next) = match above {
            Some((caption, key, line)) => (caption, key, line.offset, end),
            None => {
                let after = self.next_non_blank(end)?;
                let caps = captures(&TABLE_CAPTION, self.lines[after].text)?;
                (
                    caps["caption"].to_string(),
                    caps["key"].to_string(),
                    self.lines[start].offset,
                    after + 1,
                )
            }
        };
        self.flush_paragraph();
        let span_end = self.lines[next - 1].end();
        self.push_entity(&key, &caption, EntityBody::Table(data), TextSpan::new(span_start, span_end));
        Some(next)
    }

    fn push_entity(&mut self, key: &str, caption: &str, body: EntityBody, span: TextSpan) {
        self.document.push(Block::Entity(EntityDecl {
            raw_key: key.to_string(),
            caption: caption.trim().to_string(),
            body,
            span: Some(span),
        }));
    }

    fn unknown_table(&mut self, name: &str, span: TextSpan) {
        let mut builder = DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-5-1")
            .problem(format!("No table named `{}` is configured", name))
            .with_location(SourceLocation::new(
                self.document.source.clone(),
                span.start,
                span.end,
            ));
        let known: Vec<&str> = self.reader.tables.keys().map(String::as_str).collect();
        if !known.is_empty() {
            builder = builder.add_info(format!("Configured tables: {}", known.join(", ")));
        }
        self.diagnostics.push(
            builder
                .add_hint(format!("Is `{}` defined under `tables:` in docxref.yml?", name))
                .build(),
        );
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let mut inlines = Vec::new();
        for (n, line) in self.paragraph.drain(..).enumerate() {
            if n > 0 {
                push_text(&mut inlines, " ");
            }
            let lead = line.text.len() - line.text.trim_start().len();
            parse_inlines(line.text.trim(), line.offset + lead, &mut inlines);
        }
        self.document.push(Block::Paragraph { inlines });
    }
}

fn split_row(line: &str) -> Vec<String> {
    let inner = line.trim();
    let inner = inner.strip_prefix('|').unwrap_or(inner);
    let inner = inner.strip_suffix('|').unwrap_or(inner);
    inner.split('|').map(|c| c.trim().to_string()).collect()
}

/// Header row, separator row, then body rows.
fn parse_pipe_table(lines: &[Line<'_>]) -> Option<TableData> {
    let (header, rest) = lines.split_first()?;
    let (separator, body) = rest.split_first()?;
    if !split_row(separator.text).iter().all(|c| TABLE_SEPARATOR.is_match(c)) {
        return None;
    }
    let columns = split_row(header.text);
    let rows = body
        .iter()
        .map(|l| {
            let mut row = split_row(l.text);
            row.resize(columns.len(), String::new());
            row
        })
        .collect();
    Some(TableData { columns, rows })
}

fn push_text(inlines: &mut Vec<Inline>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(Inline::Text(last)) = inlines.last_mut() {
        last.push_str(text);
    } else {
        inlines.push(Inline::Text(text.to_string()));
    }
}

fn is_key(key: &str) -> bool {
    key.contains(':')
        && key.chars().next().is_some_and(char::is_alphanumeric)
        && key
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '.' | ':'))
}

/// Markers of a bracketed group such as `@fig:a; -@tbl:b`. `None` when any
/// item is not a cross-reference (a citation like `[@smith, p. 3]`).
fn group_markers(group: &str, base: usize) -> Option<Vec<RefMarker>> {
    let mut markers = Vec::new();
    let mut at = 0;
    for item in group.split(';') {
        let lead = item.len() - item.trim_start().len();
        let trimmed = item.trim();
        let (display, rest) = match trimmed.strip_prefix('-') {
            Some(rest) => (DisplayMode::NumberOnly, rest),
            None => (DisplayMode::LabelAndNumber, trimmed),
        };
        let key = rest.strip_prefix('@')?;
        if !is_key(key) {
            return None;
        }
        let start = base + at + lead;
        markers.push(RefMarker {
            target: key.to_string(),
            display,
            span: Some(TextSpan::new(start, start + trimmed.len())),
        });
        at += item.len() + 1;
    }
    Some(markers)
}

/// Split `text` (starting at byte `base` of the source) into text and
/// reference inlines.
pub(crate) fn parse_inlines(text: &str, base: usize, inlines: &mut Vec<Inline>) {
    let re = &*REFERENCE;
    let mut last = 0;
    for caps in re.captures_iter(text) {
        let Some(whole) = caps.get(0) else { continue };
        if let Some(group) = caps.name("group") {
            let Some(markers) = group_markers(group.as_str(), base + group.start()) else {
                continue;
            };
            push_text(inlines, &text[last..whole.start()]);
            for (n, marker) in markers.into_iter().enumerate() {
                if n > 0 {
                    push_text(inlines, "; ");
                }
                inlines.push(Inline::Reference(marker));
            }
            last = whole.end();
        } else if let Some(bare) = caps.name("bare") {
            // Skip e-mail addresses and the like.
            if text[..whole.start()].chars().next_back().is_some_and(char::is_alphanumeric) {
                continue;
            }
            let key = bare.as_str().trim_end_matches(['.', ':', '-']);
            let end = bare.start() + key.len();
            push_text(inlines, &text[last..whole.start()]);
            inlines.push(Inline::Reference(RefMarker {
                target: key.to_string(),
                display: DisplayMode::LabelAndNumber,
                span: Some(TextSpan::new(base + whole.start(), base + end)),
            }));
            last = end;
        }
    }
    push_text(inlines, &text[last..]);
}
