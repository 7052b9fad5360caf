/*
 * reader/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Readers producing intermediate documents.
 */

//! Readers producing intermediate documents.
//!
//! Two inputs are understood:
//!
//! - Markdown sources in the authoring subset ([`markdown`])
//! - JSON holding one [`IntermediateDocument`] or an array of them, as
//!   written by an external renderer

pub mod markdown;
pub mod table;

pub use markdown::{MarkdownReader, ReadOutput};
pub use table::{Placeholder, TableAnnotation, expand_table, parse_placeholder};

use docxref_diagnostics::{DiagnosticMessageBuilder, SourceContext, SourceLocation};

use crate::document::IntermediateDocument;
use crate::error::{Result, SourceError, XrefError};

/// Parse pre-built intermediate documents.
///
/// # Errors
///
/// Returns [`XrefError::Parse`] pointing at the offending JSON position.
pub fn read_json(source: &str, content: &str) -> Result<Vec<IntermediateDocument>> {
    let parsed = if content.trim_start().starts_with('[') {
        serde_json::from_str::<Vec<IntermediateDocument>>(content)
    } else {
        serde_json::from_str::<IntermediateDocument>(content).map(|doc| vec![doc])
    };
    parsed.map_err(|err| {
        let offset = offset_of(content, err.line(), err.column());
        let diagnostic = DiagnosticMessageBuilder::error("Invalid Intermediate Document")
            .problem(err.to_string())
            .with_location(SourceLocation::new(source, offset, offset))
            .add_hint("Was the file written by a compatible renderer?")
            .build();
        let mut context = SourceContext::new();
        context.add_file(source, content);
        XrefError::Parse(SourceError::new(vec![diagnostic], context))
    })
}

/// Byte offset of a one-based line and column.
fn offset_of(content: &str, line: usize, column: usize) -> usize {
    let line_start: usize = content
        .split_inclusive('\n')
        .take(line.saturating_sub(1))
        .map(str::len)
        .sum();
    (line_start + column.saturating_sub(1)).min(content.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Section;

    #[test]
    fn test_single_document_and_array() {
        let one = read_json("doc.json", r#"{"source": "a.md", "blocks": []}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].section, Section::Main);

        let many = read_json(
            "doc.json",
            r#"[{"source": "a.md", "blocks": []}, {"source": "b.md", "section": "appendix", "blocks": []}]"#,
        )
        .unwrap();
        assert_eq!(many.len(), 2);
        assert_eq!(many[1].section, Section::Appendix);
    }

    #[test]
    fn test_invalid_json_points_at_error() {
        let content = "{\"source\": \"a.md\",\n \"blocks\": [}\n";
        let err = read_json("doc.json", content).unwrap_err();
        let XrefError::Parse(source_error) = &err else {
            panic!("expected parse error, got {err:?}");
        };
        let location = source_error.diagnostics[0].location.as_ref().unwrap();
        assert_eq!(location.file, "doc.json");
        assert!(location.start > content.find('\n').unwrap());
        assert!(err.to_string().contains("Invalid Intermediate Document"));
    }

    #[test]
    fn test_offset_of() {
        assert_eq!(offset_of("ab\ncd", 2, 2), 4);
        assert_eq!(offset_of("ab", 1, 1), 0);
        assert_eq!(offset_of("ab", 9, 9), 2);
    }
}
