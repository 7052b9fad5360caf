/*
 * validate/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Field and anchor validation.
 */

//! Field and anchor validation.
//!
//! The validator inspects a finished artifact without changing it and
//! reports every problem as a [`ValidationIssue`]. Each check is independent:
//! one broken anchor does not hide a broken field elsewhere.
//!
//! Whether an issue stops the compilation is a property of its
//! [`CheckKind`]: structural defects are [`Severity::Fatal`], author mistakes
//! such as dangling references are [`Severity::Recoverable`].
//!
//! - [`docx`] checks a WordprocessingML package (bookmarks and fields)
//! - [`html`] checks an HTML artifact (ids and fragment links)

pub mod docx;
pub mod html;

use docxref_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use serde::Serialize;

pub use docx::{BookmarkRecord, FieldRecord, PackageScan, scan_document, validate_package, validate_scan};
pub use html::validate_html;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Severity {
    Recoverable,
    Fatal,
}

/// What a validation issue is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum CheckKind {
    AnchorShortened,
    DanglingReference,
    UnknownReferencePrefix,
    UnmatchedAnchorOpen,
    UnmatchedAnchorClose,
    DuplicateAnchor,
    MissingReferenceTarget,
    EntityWithoutAnchor,
    EntityMultipleAnchors,
    AnchorCoverage,
    UnbalancedField,
    RecomputeUnavailable,
    RecomputeFailed,
    RecomputeTimedOut,
    UnknownTablePlaceholder,
    EntityBeforeChapter,
}

impl CheckKind {
    /// Catalog code of diagnostics raised by this check.
    pub fn code(&self) -> &'static str {
        match self {
            CheckKind::AnchorShortened => "X-1-2",
            CheckKind::DanglingReference => "X-2-1",
            CheckKind::UnknownReferencePrefix => "X-2-2",
            CheckKind::UnmatchedAnchorOpen => "X-3-1",
            CheckKind::UnmatchedAnchorClose => "X-3-2",
            CheckKind::DuplicateAnchor => "X-3-3",
            CheckKind::MissingReferenceTarget => "X-3-4",
            CheckKind::EntityWithoutAnchor => "X-3-5",
            CheckKind::EntityMultipleAnchors => "X-3-6",
            CheckKind::AnchorCoverage => "X-3-7",
            CheckKind::UnbalancedField => "X-3-8",
            CheckKind::RecomputeUnavailable => "X-4-1",
            CheckKind::RecomputeFailed => "X-4-2",
            CheckKind::RecomputeTimedOut => "X-4-3",
            CheckKind::UnknownTablePlaceholder => "X-5-1",
            CheckKind::EntityBeforeChapter => "X-5-2",
        }
    }

    pub fn from_code(code: &str) -> Option<Self> {
        use CheckKind::*;
        [
            AnchorShortened,
            DanglingReference,
            UnknownReferencePrefix,
            UnmatchedAnchorOpen,
            UnmatchedAnchorClose,
            DuplicateAnchor,
            MissingReferenceTarget,
            EntityWithoutAnchor,
            EntityMultipleAnchors,
            AnchorCoverage,
            UnbalancedField,
            RecomputeUnavailable,
            RecomputeFailed,
            RecomputeTimedOut,
            UnknownTablePlaceholder,
            EntityBeforeChapter,
        ]
        .into_iter()
        .find(|k| k.code() == code)
    }

    pub fn severity(&self) -> Severity {
        match self {
            CheckKind::UnmatchedAnchorOpen
            | CheckKind::UnmatchedAnchorClose
            | CheckKind::DuplicateAnchor
            | CheckKind::MissingReferenceTarget
            | CheckKind::EntityWithoutAnchor
            | CheckKind::EntityMultipleAnchors
            | CheckKind::AnchorCoverage
            | CheckKind::UnbalancedField => Severity::Fatal,
            _ => Severity::Recoverable,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValidationIssue {
    pub check: CheckKind,
    pub severity: Severity,
    pub diagnostic: DiagnosticMessage,
}

impl ValidationIssue {
    /// An issue whose diagnostic comes from the catalog entry of `check`.
    pub fn new(check: CheckKind, problem: impl Into<String>) -> Self {
        let severity = check.severity();
        let kind = match severity {
            Severity::Fatal => DiagnosticKind::Error,
            Severity::Recoverable => DiagnosticKind::Warning,
        };
        let diagnostic = DiagnosticMessageBuilder::from_code(kind, check.code())
            .problem(problem.into())
            .build();
        Self {
            check,
            severity,
            diagnostic,
        }
    }

    /// Wrap an existing diagnostic; the check comes from its code.
    pub fn from_diagnostic(diagnostic: DiagnosticMessage) -> Option<Self> {
        let check = CheckKind::from_code(diagnostic.code.as_deref()?)?;
        Some(Self {
            check,
            severity: check.severity(),
            diagnostic,
        })
    }

    pub fn is_fatal(&self) -> bool {
        self.severity == Severity::Fatal
    }
}

/// Every issue found in one compilation or inspection.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, issue: ValidationIssue) {
        self.issues.push(issue);
    }

    /// Add a diagnostic with a known check code; others are dropped with a
    /// debug log.
    pub fn push_diagnostic(&mut self, diagnostic: DiagnosticMessage) {
        match ValidationIssue::from_diagnostic(diagnostic) {
            Some(issue) => self.issues.push(issue),
            None => tracing::debug!("Diagnostic without a check code left out of the report"),
        }
    }

    pub fn extend(&mut self, other: ValidationReport) {
        self.issues.extend(other.issues);
    }

    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }

    pub fn by_check(&self, check: CheckKind) -> impl Iterator<Item = &ValidationIssue> {
        self.issues.iter().filter(move |i| i.check == check)
    }

    pub fn count(&self, check: CheckKind) -> usize {
        self.by_check(check).count()
    }

    pub fn fatal_count(&self) -> usize {
        self.issues.iter().filter(|i| i.is_fatal()).count()
    }

    pub fn has_fatal(&self) -> bool {
        self.fatal_count() > 0
    }

    /// No fatal issues. Broken references still pass.
    pub fn passed(&self) -> bool {
        !self.has_fatal()
    }

    /// No issues at all.
    pub fn is_clean(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn to_text(&self) -> String {
        self.issues
            .iter()
            .map(|i| i.diagnostic.to_text(None))
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn to_json(&self) -> serde_json::Value {
        serde_json::json!({
            "passed": self.passed(),
            "fatal": self.fatal_count(),
            "issues": self.issues.iter().map(|i| serde_json::json!({
                "check": i.check,
                "severity": i.severity,
                "diagnostic": i.diagnostic.to_json(),
            })).collect::<Vec<_>>(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_is_a_property_of_the_check() {
        assert_eq!(CheckKind::AnchorCoverage.severity(), Severity::Fatal);
        assert_eq!(CheckKind::UnmatchedAnchorOpen.severity(), Severity::Fatal);
        assert_eq!(CheckKind::DanglingReference.severity(), Severity::Recoverable);
        assert_eq!(CheckKind::RecomputeTimedOut.severity(), Severity::Recoverable);
    }

    #[test]
    fn test_codes_round_trip_through_catalog() {
        for code in ["X-1-2", "X-2-1", "X-3-7", "X-4-3", "X-5-2"] {
            let check = CheckKind::from_code(code).unwrap();
            assert_eq!(check.code(), code);
            assert!(docxref_diagnostics::get_error_info(code).is_some());
        }
        assert_eq!(CheckKind::from_code("X-1-1"), None);
    }

    #[test]
    fn test_report_pass_fail() {
        let mut report = ValidationReport::new();
        assert!(report.passed());
        assert!(report.is_clean());

        report.push(ValidationIssue::new(
            CheckKind::DanglingReference,
            "No entity `fig:missing`",
        ));
        assert!(report.passed());
        assert!(!report.is_clean());

        report.push(ValidationIssue::new(CheckKind::UnmatchedAnchorClose, "id 3"));
        assert!(!report.passed());
        assert_eq!(report.fatal_count(), 1);
        assert_eq!(report.count(CheckKind::DanglingReference), 1);

        let json = report.to_json();
        assert_eq!(json["passed"], false);
        assert_eq!(json["issues"][0]["check"], "dangling-reference");
        assert_eq!(json["issues"][1]["diagnostic"]["code"], "X-3-2");
    }

    #[test]
    fn test_issue_diagnostic_uses_catalog_title() {
        let issue = ValidationIssue::new(CheckKind::AnchorCoverage, "`_Reffig_a` misses SEQ");
        assert!(issue.diagnostic.is_error());
        insta::assert_snapshot!(issue.diagnostic.to_text(None), @r"
        Error [X-3-7]: Incomplete Anchor Coverage
        `_Reffig_a` misses SEQ
        ");
    }

    #[test]
    fn test_push_diagnostic_requires_check_code() {
        let mut report = ValidationReport::new();
        report.push_diagnostic(DiagnosticMessage::warning("untagged"));
        report.push_diagnostic(DiagnosticMessage::warning("Unknown Table Placeholder").with_code("X-5-1"));
        assert_eq!(report.len(), 1);
        assert_eq!(report.issues()[0].check, CheckKind::UnknownTablePlaceholder);
    }
}
