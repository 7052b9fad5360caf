/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for docxref-core.
 */

//! Error types for docxref-core.
//!
//! [`XrefError`] covers everything that stops a compilation (fail closed).
//! Recoverable problems never become an `XrefError`: they travel as
//! diagnostics inside the [`crate::validate::ValidationReport`].

use docxref_diagnostics::{DiagnosticMessage, SourceContext};
use thiserror::Error;

use crate::validate::ValidationReport;

/// Diagnostics from reading authoring sources, with the sources themselves
/// so they can be rendered with snippets.
#[derive(Debug, Clone)]
pub struct SourceError {
    pub diagnostics: Vec<DiagnosticMessage>,
    pub source_context: SourceContext,
}

impl SourceError {
    pub fn new(diagnostics: Vec<DiagnosticMessage>, source_context: SourceContext) -> Self {
        Self {
            diagnostics,
            source_context,
        }
    }

    pub fn render(&self) -> String {
        self.diagnostics
            .iter()
            .map(|d| d.to_text(Some(&self.source_context)))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for SourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl std::error::Error for SourceError {}

#[derive(Error, Debug)]
pub enum XrefError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("{0}")]
    Parse(#[source] SourceError),

    /// Two entities normalize to one anchor name. Raised before any output
    /// is written.
    #[error("{0}")]
    AnchorCollision(Box<DiagnosticMessage>),

    /// The assembled package failed a structural check.
    #[error("package failed validation with {} fatal issue(s)", .0.fatal_count())]
    MalformedPackage(Box<ValidationReport>),

    #[error("Package error: {0}")]
    Package(String),

    #[error("XML error: {0}")]
    Xml(#[from] docxref_ooxml::Error),

    #[error("{0}")]
    Other(String),
}

impl XrefError {
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    pub fn anchor_collision(diagnostic: DiagnosticMessage) -> Self {
        Self::AnchorCollision(Box::new(diagnostic))
    }

    pub fn malformed_package(report: ValidationReport) -> Self {
        Self::MalformedPackage(Box::new(report))
    }

    pub fn package(msg: impl Into<String>) -> Self {
        Self::Package(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }

    /// Diagnostics carried by this error, for structured reporting.
    pub fn diagnostics(&self) -> Vec<DiagnosticMessage> {
        match self {
            XrefError::Parse(err) => err.diagnostics.clone(),
            XrefError::AnchorCollision(diag) => vec![(**diag).clone()],
            XrefError::MalformedPackage(report) => report
                .issues()
                .iter()
                .map(|issue| issue.diagnostic.clone())
                .collect(),
            _ => Vec::new(),
        }
    }
}

impl From<zip::result::ZipError> for XrefError {
    fn from(err: zip::result::ZipError) -> Self {
        XrefError::Package(err.to_string())
    }
}

impl From<serde_yaml::Error> for XrefError {
    fn from(err: serde_yaml::Error) -> Self {
        XrefError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, XrefError>;
