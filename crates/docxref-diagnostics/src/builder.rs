/*
 * builder.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Builder API for diagnostic messages.
 */

//! Builder API for diagnostic messages.
//!
//! The builder mirrors the tidyverse message structure: a title from the
//! constructor (`error`, `warning`, `info`), then `.problem()`, details via
//! `.add_detail()` / `.add_info()` / `.add_note()`, and `.add_hint()`.

use crate::diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
use crate::source::SourceLocation;

/// Builder for [`DiagnosticMessage`].
///
/// ```
/// use docxref_diagnostics::DiagnosticMessageBuilder;
///
/// let error = DiagnosticMessageBuilder::error("Anchor Name Collision")
///     .with_code("X-1-1")
///     .problem("Two keys map to the same anchor `_Reffig_a_b`")
///     .add_detail("`fig:a-b` normalizes to `_Reffig_a_b`")
///     .add_detail("`fig:a_b` normalizes to `_Reffig_a_b`")
///     .add_hint("Rename one of the figures?")
///     .build();
///
/// assert_eq!(error.code.as_deref(), Some("X-1-1"));
/// assert_eq!(error.details.len(), 2);
/// ```
#[derive(Debug, Clone)]
pub struct DiagnosticMessageBuilder {
    kind: DiagnosticKind,
    title: String,
    code: Option<String>,
    problem: Option<MessageContent>,
    details: Vec<DetailItem>,
    hints: Vec<MessageContent>,
    location: Option<SourceLocation>,
}

impl DiagnosticMessageBuilder {
    /// Create a new builder with the specified kind and title.
    pub fn new(kind: DiagnosticKind, title: impl Into<String>) -> Self {
        Self {
            kind,
            title: title.into(),
            code: None,
            problem: None,
            details: Vec::new(),
            hints: Vec::new(),
            location: None,
        }
    }

    pub fn error(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Error, title)
    }

    pub fn warning(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Warning, title)
    }

    pub fn info(title: impl Into<String>) -> Self {
        Self::new(DiagnosticKind::Info, title)
    }

    /// Start from a catalog entry: the title comes from the catalog and the
    /// code is set. Unknown codes keep the code as the title.
    pub fn from_code(kind: DiagnosticKind, code: &str) -> Self {
        let title = crate::catalog::get_error_info(code)
            .map(|info| info.title.clone())
            .unwrap_or_else(|| code.to_string());
        Self::new(kind, title).with_code(code)
    }

    /// Set the catalog code (`X-<subsystem>-<number>`).
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// Set the problem statement.
    pub fn problem(mut self, stmt: impl Into<MessageContent>) -> Self {
        self.problem = Some(stmt.into());
        self
    }

    /// Add an error detail (✖ bullet).
    pub fn add_detail(mut self, detail: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Error,
            content: detail.into(),
        });
        self
    }

    /// Add an info detail (ℹ bullet).
    pub fn add_info(mut self, info: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Info,
            content: info.into(),
        });
        self
    }

    /// Add a note detail (plain bullet).
    pub fn add_note(mut self, note: impl Into<MessageContent>) -> Self {
        self.details.push(DetailItem {
            kind: DetailKind::Note,
            content: note.into(),
        });
        self
    }

    /// Add a hint for fixing the problem.
    pub fn add_hint(mut self, hint: impl Into<MessageContent>) -> Self {
        self.hints.push(hint.into());
        self
    }

    /// Attach a source location.
    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = Some(location);
        self
    }

    /// Build the diagnostic message.
    pub fn build(self) -> DiagnosticMessage {
        DiagnosticMessage {
            code: self.code,
            title: self.title,
            kind: self.kind,
            problem: self.problem,
            details: self.details,
            hints: self.hints,
            location: self.location,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_details_keep_order() {
        let msg = DiagnosticMessageBuilder::warning("Mixed")
            .add_detail("first")
            .add_info("second")
            .add_note("third")
            .build();
        let kinds: Vec<_> = msg.details.iter().map(|d| d.kind).collect();
        assert_eq!(kinds, vec![DetailKind::Error, DetailKind::Info, DetailKind::Note]);
    }

    #[test]
    fn test_from_code_uses_catalog_title() {
        let msg = DiagnosticMessageBuilder::from_code(DiagnosticKind::Error, "X-3-7").build();
        assert_eq!(msg.title, "Incomplete Anchor Coverage");
        assert_eq!(msg.code.as_deref(), Some("X-3-7"));
    }

    #[test]
    fn test_from_code_unknown() {
        let msg = DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-77-1").build();
        assert_eq!(msg.title, "X-77-1");
    }

    #[test]
    fn test_with_location() {
        let msg = DiagnosticMessageBuilder::error("x")
            .with_location(SourceLocation::new("b.md", 0, 3))
            .build();
        assert_eq!(msg.location.unwrap().file, "b.md");
    }
}
