/*
 * error.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error types for XML reading and writing.
 */

//! Error types for XML reading and writing.

use docxref_diagnostics::{DiagnosticMessage, DiagnosticMessageBuilder};
use thiserror::Error;

use crate::Span;

/// Result type alias for docxref-ooxml operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while reading or writing XML.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// XML syntax error from quick-xml.
    #[error("XML syntax error: {message}")]
    XmlSyntax {
        message: String,
        /// Byte offset where the error occurred.
        position: Option<u64>,
    },

    /// Unexpected end of input.
    #[error("Unexpected end of input, expected {expected}")]
    UnexpectedEof { expected: String, span: Option<Span> },

    /// Mismatched end tag.
    #[error("Mismatched end tag: expected </{expected}>, found </{found}>")]
    MismatchedEndTag {
        expected: String,
        found: String,
        span: Option<Span>,
    },

    /// Invalid XML structure.
    #[error("Invalid XML structure: {message}")]
    InvalidStructure { message: String, span: Option<Span> },

    /// Empty document (no root element).
    #[error("Empty XML document: no root element found")]
    EmptyDocument,

    /// Multiple root elements.
    #[error("Invalid XML: multiple root elements")]
    MultipleRoots { span: Option<Span> },

    /// The input was not valid UTF-8.
    #[error("XML part is not valid UTF-8: {0}")]
    Encoding(String),

    /// Failure while serializing XML.
    #[error("XML write error: {0}")]
    Write(String),
}

impl Error {
    /// Convert this error to a DiagnosticMessage with the matching X-9-* code.
    ///
    /// `part` names the package part being read (e.g. `word/document.xml`).
    pub fn to_diagnostic(&self, part: &str) -> DiagnosticMessage {
        let builder = match self {
            Error::XmlSyntax { message, position } => {
                let mut builder = DiagnosticMessageBuilder::error("XML Syntax Error")
                    .with_code("X-9-1")
                    .problem(message.clone());
                if let Some(pos) = position {
                    builder = builder.add_detail(format!("Error at byte offset {} of `{}`", pos, part));
                }
                builder
            }
            Error::UnexpectedEof { expected, .. } => {
                DiagnosticMessageBuilder::error("Unexpected End of XML Input")
                    .with_code("X-9-2")
                    .problem(format!("`{}` ended unexpectedly; expected {}", part, expected))
            }
            Error::MismatchedEndTag {
                expected, found, ..
            } => DiagnosticMessageBuilder::error("Mismatched XML End Tag")
                .with_code("X-9-3")
                .problem(format!(
                    "End tag </{}> does not match start tag <{}>",
                    found, expected
                ))
                .add_detail(format!("In `{}`", part)),
            Error::InvalidStructure { message, .. } => {
                DiagnosticMessageBuilder::error("Invalid XML Structure")
                    .with_code("X-9-4")
                    .problem(message.clone())
            }
            Error::EmptyDocument => DiagnosticMessageBuilder::error("Empty XML Document")
                .with_code("X-9-5")
                .problem(format!("`{}` contains no root element", part)),
            Error::MultipleRoots { .. } => {
                DiagnosticMessageBuilder::error("Multiple XML Root Elements")
                    .with_code("X-9-6")
                    .problem(format!("`{}` contains multiple root elements", part))
            }
            Error::Encoding(message) | Error::Write(message) => {
                DiagnosticMessageBuilder::error("XML Syntax Error")
                    .with_code("X-9-1")
                    .problem(message.clone())
            }
        };

        let span = match self {
            Error::UnexpectedEof { span, .. }
            | Error::MismatchedEndTag { span, .. }
            | Error::InvalidStructure { span, .. }
            | Error::MultipleRoots { span } => *span,
            _ => None,
        };

        match span {
            Some(span) => builder
                .with_location(docxref_diagnostics::SourceLocation::new(part, span.start, span.end))
                .build(),
            None => builder.build(),
        }
    }
}

impl From<quick_xml::Error> for Error {
    fn from(err: quick_xml::Error) -> Self {
        Error::XmlSyntax {
            message: err.to_string(),
            position: None,
        }
    }
}

impl From<quick_xml::events::attributes::AttrError> for Error {
    fn from(err: quick_xml::events::attributes::AttrError) -> Self {
        Error::XmlSyntax {
            message: format!("Attribute error: {}", err),
            position: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatched_end_tag_diagnostic() {
        let err = Error::MismatchedEndTag {
            expected: "p".to_string(),
            found: "r".to_string(),
            span: Some(Span::new(4, 9)),
        };
        let diag = err.to_diagnostic("word/document.xml");
        assert_eq!(diag.code.as_deref(), Some("X-9-3"));
        let loc = diag.location.unwrap();
        assert_eq!(loc.file, "word/document.xml");
        assert_eq!((loc.start, loc.end), (4, 9));
    }

    #[test]
    fn test_empty_document_diagnostic_names_part() {
        let diag = Error::EmptyDocument.to_diagnostic("word/styles.xml");
        assert_eq!(diag.code.as_deref(), Some("X-9-5"));
        assert!(diag.problem.unwrap().as_str().contains("word/styles.xml"));
    }
}
