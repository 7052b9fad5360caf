/*
 * commands/check.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Check command implementation.
 */

//! Check command: scan an existing package and run the structural checks.

use std::path::Path;

use anyhow::{Context, Result, bail};
use docxref_core::package::Package;
use docxref_core::validate::{PackageScan, validate_package};

use super::print_diagnostics;

/// Execute the check command
pub fn execute(file: &str, json: bool) -> Result<()> {
    let path = Path::new(file);
    let package =
        Package::read(path).with_context(|| format!("Failed to read package {}", file))?;
    let (scan, report) =
        validate_package(&package, None).with_context(|| format!("Failed to scan {}", file))?;

    if json {
        let value = serde_json::json!({
            "file": file,
            "scan": scan,
            "report": report.to_json(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        print!("{}", summarize(&scan));
        print_diagnostics(report.issues().iter().map(|i| &i.diagnostic), None);
    }

    if report.has_fatal() {
        bail!("{} failed {} structural check(s)", file, report.fatal_count());
    }
    Ok(())
}

/// Human-readable listing of anchors and fields.
fn summarize(scan: &PackageScan) -> String {
    let mut out = format!(
        "{} paragraph(s), {} anchor(s), {} field(s)\n",
        scan.paragraphs,
        scan.bookmarks.len(),
        scan.fields.len()
    );
    for bookmark in &scan.bookmarks {
        let state = if bookmark.end.is_some() { "" } else { " (unclosed)" };
        out.push_str(&format!(
            "  anchor {} [{}] paragraph {}{}\n",
            bookmark.name, bookmark.id, bookmark.paragraph, state
        ));
    }
    for field in &scan.fields {
        out.push_str(&format!(
            "  field  {} -> {:?} paragraph {}\n",
            field.instruction.trim(),
            field.result,
            field.paragraph
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use docxref_core::validate::{BookmarkRecord, FieldRecord};

    #[test]
    fn test_summarize_lists_anchors_and_fields() {
        let scan = PackageScan {
            bookmarks: vec![BookmarkRecord {
                id: "0".to_string(),
                name: "_Reffig_a".to_string(),
                paragraph: 1,
                start: 3,
                end: None,
            }],
            fields: vec![FieldRecord {
                instruction: r" SEQ Figure \* ARABIC ".to_string(),
                result: "1".to_string(),
                paragraph: 1,
                begin: 4,
                end: Some(8),
                simple: false,
            }],
            paragraphs: 1,
            ..Default::default()
        };
        let text = summarize(&scan);
        assert!(text.starts_with("1 paragraph(s), 1 anchor(s), 1 field(s)"));
        assert!(text.contains("anchor _Reffig_a [0] paragraph 1 (unclosed)"));
        assert!(text.contains(r#"field  SEQ Figure \* ARABIC -> "1" paragraph 1"#));
    }
}
