/*
 * validate/docx.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Bookmark and field checks for WordprocessingML packages.
 */

//! Bookmark and field checks for WordprocessingML packages.
//!
//! [`scan_document`] walks `word/document.xml` once in document order and
//! records every bookmark and every field (complex `w:fldChar` sequences and
//! `w:fldSimple`) together with the paragraph it sits in and its position in
//! the walk. The checks then only compare positions.

use std::collections::BTreeMap;

use docxref_ooxml::{WalkEvent, XmlElement};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Serialize;

use super::{CheckKind, ValidationIssue, ValidationReport};
use crate::entity::EntityTable;
use crate::error::Result;
use crate::package::{DOCUMENT_PART, Package};

/// A bookmark as found in the document part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BookmarkRecord {
    pub id: String,
    pub name: String,
    /// Paragraph the start delimiter sits in (0 = outside any paragraph).
    pub paragraph: usize,
    pub start: usize,
    /// Walk position of the matching end delimiter.
    pub end: Option<usize>,
}

/// A field as found in the document part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldRecord {
    pub instruction: String,
    /// Text between the separator and the end (the cached result).
    pub result: String,
    pub paragraph: usize,
    pub begin: usize,
    pub end: Option<usize>,
    /// `w:fldSimple` rather than a `w:fldChar` sequence.
    pub simple: bool,
}

impl FieldRecord {
    /// `SEQ`, `REF`, `STYLEREF`, `TOC`, …
    pub fn keyword(&self) -> String {
        self.instruction
            .split_whitespace()
            .next()
            .unwrap_or_default()
            .to_ascii_uppercase()
    }

    /// Bookmark a `REF`/`PAGEREF` field points at.
    pub fn target(&self) -> Option<&str> {
        match self.keyword().as_str() {
            "REF" | "PAGEREF" => self.instruction.split_whitespace().nth(1),
            _ => None,
        }
    }

    /// Whether the field lies strictly between two walk positions.
    fn inside(&self, start: usize, end: usize) -> bool {
        self.begin > start && self.end.is_some_and(|e| e < end)
    }
}

/// Everything [`scan_document`] found.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PackageScan {
    pub bookmarks: Vec<BookmarkRecord>,
    pub fields: Vec<FieldRecord>,
    /// Ids of bookmark ends without a start.
    pub orphan_ends: Vec<String>,
    /// Broken field delimiter sequences.
    pub field_errors: Vec<String>,
    pub paragraphs: usize,
}

impl PackageScan {
    pub fn bookmark_names(&self) -> FxHashSet<&str> {
        self.bookmarks.iter().map(|b| b.name.as_str()).collect()
    }

    pub fn fields_in_paragraph(&self, paragraph: usize) -> impl Iterator<Item = &FieldRecord> {
        self.fields.iter().filter(move |f| f.paragraph == paragraph)
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Phase {
    Instruction,
    Result,
}

#[derive(Default)]
struct Scanner {
    scan: PackageScan,
    order: usize,
    paragraph: usize,
    /// Enclosing paragraphs (text boxes nest paragraphs).
    outer_paragraphs: Vec<usize>,
    open_bookmarks: FxHashMap<String, usize>,
    /// Open complex fields: index into `scan.fields` and phase.
    complex: Vec<(usize, Phase)>,
    simple: Vec<usize>,
    in_instr: bool,
    in_text: bool,
}

impl Scanner {
    fn enter(&mut self, e: &XmlElement) {
        match (e.prefix.as_deref(), e.name.as_str()) {
            (Some("w"), "p") => {
                self.outer_paragraphs.push(self.paragraph);
                self.scan.paragraphs += 1;
                self.paragraph = self.scan.paragraphs;
            }
            (Some("w"), "bookmarkStart") => {
                let id = e.get_attribute("id").unwrap_or_default().to_string();
                let name = e.get_attribute("name").unwrap_or_default().to_string();
                if let Some(previous) = self.open_bookmarks.insert(id.clone(), self.scan.bookmarks.len()) {
                    tracing::debug!(id = %id, previous, "Bookmark id reopened before close");
                }
                self.scan.bookmarks.push(BookmarkRecord {
                    id,
                    name,
                    paragraph: self.paragraph,
                    start: self.order,
                    end: None,
                });
            }
            (Some("w"), "bookmarkEnd") => {
                let id = e.get_attribute("id").unwrap_or_default().to_string();
                match self.open_bookmarks.remove(&id) {
                    Some(index) => self.scan.bookmarks[index].end = Some(self.order),
                    None => self.scan.orphan_ends.push(id),
                }
            }
            (Some("w"), "fldChar") => self.fld_char(e.get_attribute("fldCharType").unwrap_or_default()),
            (Some("w"), "instrText") => self.in_instr = true,
            (Some("w"), "t") => self.in_text = true,
            (Some("w"), "fldSimple") => {
                self.simple.push(self.scan.fields.len());
                self.scan.fields.push(FieldRecord {
                    instruction: e.get_attribute("instr").unwrap_or_default().to_string(),
                    result: String::new(),
                    paragraph: self.paragraph,
                    begin: self.order,
                    end: None,
                    simple: true,
                });
            }
            _ => {}
        }
    }

    fn leave(&mut self, e: &XmlElement) {
        match (e.prefix.as_deref(), e.name.as_str()) {
            (Some("w"), "p") => self.paragraph = self.outer_paragraphs.pop().unwrap_or_default(),
            (Some("w"), "instrText") => self.in_instr = false,
            (Some("w"), "t") => self.in_text = false,
            (Some("w"), "fldSimple") => {
                if let Some(index) = self.simple.pop() {
                    self.scan.fields[index].end = Some(self.order);
                }
            }
            _ => {}
        }
    }

    fn text(&mut self, text: &str) {
        if self.in_instr {
            match self.complex.last() {
                Some(&(index, Phase::Instruction)) => self.scan.fields[index].instruction.push_str(text),
                _ => self
                    .scan
                    .field_errors
                    .push(format!("Field instruction `{}` outside a field", text.trim())),
            }
        } else if self.in_text {
            if let Some(&(index, Phase::Result)) = self.complex.last() {
                self.scan.fields[index].result.push_str(text);
            } else if let Some(&index) = self.simple.last() {
                self.scan.fields[index].result.push_str(text);
            }
        }
    }

    fn fld_char(&mut self, kind: &str) {
        match kind {
            "begin" => {
                self.complex.push((self.scan.fields.len(), Phase::Instruction));
                self.scan.fields.push(FieldRecord {
                    instruction: String::new(),
                    result: String::new(),
                    paragraph: self.paragraph,
                    begin: self.order,
                    end: None,
                    simple: false,
                });
            }
            "separate" => match self.complex.last_mut() {
                Some((_, phase @ Phase::Instruction)) => *phase = Phase::Result,
                Some((index, Phase::Result)) => {
                    let instr = self.scan.fields[*index].instruction.trim().to_string();
                    self.scan
                        .field_errors
                        .push(format!("Field `{}` has more than one separator", instr));
                }
                None => self
                    .scan
                    .field_errors
                    .push("Field separator without a field begin".to_string()),
            },
            "end" => match self.complex.pop() {
                Some((index, _)) => self.scan.fields[index].end = Some(self.order),
                None => self
                    .scan
                    .field_errors
                    .push("Field end without a field begin".to_string()),
            },
            other => self
                .scan
                .field_errors
                .push(format!("Unknown field delimiter type `{}`", other)),
        }
    }

    fn finish(mut self) -> PackageScan {
        for (index, _) in self.complex.drain(..) {
            let field = &self.scan.fields[index];
            self.scan.field_errors.push(format!(
                "Field `{}` begins but never ends",
                field.instruction.trim()
            ));
        }
        self.scan
    }
}

/// Walk the document part and record its bookmarks and fields.
pub fn scan_document(root: &XmlElement) -> PackageScan {
    let mut scanner = Scanner::default();
    root.walk(&mut |event| {
        scanner.order += 1;
        match event {
            WalkEvent::Enter(e) => scanner.enter(e),
            WalkEvent::Leave(e) => scanner.leave(e),
            WalkEvent::Text(text, _) => scanner.text(text),
        }
    });
    scanner.finish()
}

/// Validate a package. With an entity table every entity must own exactly
/// one anchor and that anchor must cover the caption number fields; without
/// one, coverage is checked for every `_Ref` bookmark sharing a paragraph
/// with a `SEQ` field.
pub fn validate_package(
    package: &Package,
    entities: Option<&EntityTable>,
) -> Result<(PackageScan, ValidationReport)> {
    let document = docxref_ooxml::parse_bytes(package.require(DOCUMENT_PART)?)?;
    let scan = scan_document(&document.root);
    let report = validate_scan(&scan, entities);
    tracing::debug!(
        bookmarks = scan.bookmarks.len(),
        fields = scan.fields.len(),
        issues = report.len(),
        "Validated package"
    );
    Ok((scan, report))
}

/// Run every check over a finished scan.
pub fn validate_scan(scan: &PackageScan, entities: Option<&EntityTable>) -> ValidationReport {
    let mut report = ValidationReport::new();

    for bookmark in scan.bookmarks.iter().filter(|b| b.end.is_none()) {
        report.push(ValidationIssue::new(
            CheckKind::UnmatchedAnchorOpen,
            format!(
                "Anchor `{}` (id {}) opens but never closes",
                bookmark.name, bookmark.id
            ),
        ));
    }

    for id in &scan.orphan_ends {
        report.push(ValidationIssue::new(
            CheckKind::UnmatchedAnchorClose,
            format!("Anchor end with id {} has no matching start", id),
        ));
    }

    // Word compares bookmark names without regard to ASCII case.
    let mut declared: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for bookmark in &scan.bookmarks {
        declared
            .entry(bookmark.name.to_ascii_lowercase())
            .or_default()
            .push(bookmark.name.as_str());
    }
    for names in declared.values().filter(|n| n.len() > 1) {
        let problem = if names.iter().all(|n| *n == names[0]) {
            format!("Anchor `{}` is declared {} times", names[0], names.len())
        } else {
            format!(
                "Anchors {} differ only in letter case and name one bookmark",
                names.iter().map(|n| format!("`{}`", n)).collect::<Vec<_>>().join(", ")
            )
        };
        report.push(ValidationIssue::new(CheckKind::DuplicateAnchor, problem));
    }

    for field in &scan.fields {
        if let Some(target) = field.target() {
            if !declared.contains_key(&target.to_ascii_lowercase()) {
                report.push(ValidationIssue::new(
                    CheckKind::MissingReferenceTarget,
                    format!(
                        "Field `{}` targets anchor `{}`, which does not exist",
                        field.instruction.trim(),
                        target
                    ),
                ));
            }
        }
    }

    let coverage_targets: Vec<&BookmarkRecord> = match entities {
        Some(table) => {
            let mut targets = Vec::new();
            for entity in table {
                let Some(anchor) = entity.anchor_name() else {
                    report.push(ValidationIssue::new(
                        CheckKind::EntityWithoutAnchor,
                        format!("`{}` was never given an anchor", entity.unique_key),
                    ));
                    continue;
                };
                let found: Vec<&BookmarkRecord> =
                    scan.bookmarks.iter().filter(|b| b.name == anchor).collect();
                match found.len() {
                    0 => report.push(ValidationIssue::new(
                        CheckKind::EntityWithoutAnchor,
                        format!("`{}` has no anchor `{}` in the package", entity.unique_key, anchor),
                    )),
                    1 => targets.push(found[0]),
                    n => report.push(ValidationIssue::new(
                        CheckKind::EntityMultipleAnchors,
                        format!("`{}` has {} anchors named `{}`", entity.unique_key, n, anchor),
                    )),
                }
            }
            targets
        }
        None => scan
            .bookmarks
            .iter()
            .filter(|b| {
                b.name.starts_with(crate::anchor::ANCHOR_PREFIX)
                    && scan
                        .fields_in_paragraph(b.paragraph)
                        .any(|f| f.keyword() == "SEQ")
            })
            .collect(),
    };

    for bookmark in coverage_targets {
        if let Some(problem) = coverage_problem(scan, bookmark) {
            report.push(ValidationIssue::new(CheckKind::AnchorCoverage, problem));
        }
    }

    for error in &scan.field_errors {
        report.push(ValidationIssue::new(CheckKind::UnbalancedField, error.clone()));
    }

    report
}

fn coverage_problem(scan: &PackageScan, bookmark: &BookmarkRecord) -> Option<String> {
    // An unclosed anchor is already reported on its own.
    let end = bookmark.end?;
    let number_fields: Vec<&FieldRecord> = scan
        .fields_in_paragraph(bookmark.paragraph)
        .filter(|f| matches!(f.keyword().as_str(), "SEQ" | "STYLEREF"))
        .collect();

    let outside: Vec<String> = number_fields
        .iter()
        .filter(|f| !f.inside(bookmark.start, end))
        .map(|f| f.keyword())
        .collect();
    if !outside.is_empty() {
        return Some(format!(
            "Anchor `{}` leaves {} outside",
            bookmark.name,
            outside.join(", ")
        ));
    }

    if !number_fields
        .iter()
        .any(|f| f.keyword() == "SEQ" && f.inside(bookmark.start, end))
    {
        return Some(format!("Anchor `{}` encloses no SEQ field", bookmark.name));
    }
    None
}
