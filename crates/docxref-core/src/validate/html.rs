/*
 * validate/html.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Id and fragment-link checks for HTML artifacts.
 */

//! Id and fragment-link checks for HTML artifacts.
//!
//! The HTML writer emits well-formed XHTML, so the same XML tree parser reads
//! it back. Element ids play the role of anchors and `href="#…"` links the
//! role of reference fields.

use std::collections::BTreeMap;

use docxref_ooxml::WalkEvent;

use super::{CheckKind, ValidationIssue, ValidationReport};
use crate::entity::EntityTable;
use crate::error::Result;

pub fn validate_html(html: &str, entities: Option<&EntityTable>) -> Result<ValidationReport> {
    let document = docxref_ooxml::parse(html)?;

    let mut ids: BTreeMap<String, usize> = BTreeMap::new();
    let mut links: Vec<String> = Vec::new();
    document.root.walk(&mut |event| {
        if let WalkEvent::Enter(e) = event {
            if let Some(id) = e.get_attribute("id") {
                *ids.entry(id.to_string()).or_insert(0) += 1;
            }
            if e.name == "a" {
                if let Some(fragment) = e.get_attribute("href").and_then(|h| h.strip_prefix('#')) {
                    links.push(fragment.to_string());
                }
            }
        }
    });

    let mut report = ValidationReport::new();
    for (id, count) in ids.iter().filter(|(_, c)| **c > 1) {
        report.push(ValidationIssue::new(
            CheckKind::DuplicateAnchor,
            format!("Element id `{}` is used {} times", id, count),
        ));
    }
    for link in &links {
        if !ids.contains_key(link) {
            report.push(ValidationIssue::new(
                CheckKind::MissingReferenceTarget,
                format!("Link to `#{}` has no target element", link),
            ));
        }
    }
    if let Some(table) = entities {
        for entity in table {
            match ids.get(&entity.unique_key).copied().unwrap_or(0) {
                0 => report.push(ValidationIssue::new(
                    CheckKind::EntityWithoutAnchor,
                    format!("`{}` has no element with its id", entity.unique_key),
                )),
                1 => {}
                n => report.push(ValidationIssue::new(
                    CheckKind::EntityMultipleAnchors,
                    format!("`{}` is the id of {} elements", entity.unique_key, n),
                )),
            }
        }
    }

    tracing::debug!(ids = ids.len(), links = links.len(), issues = report.len(), "Validated HTML");
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolving_links_pass() {
        let report = validate_html(
            r##"<html><body><figure id="fig:a"/><p><a class="xref" href="#fig:a">Figure 1</a></p></body></html>"##,
            None,
        )
        .unwrap();
        assert!(report.is_clean());
    }

    #[test]
    fn test_duplicate_ids_and_dead_links() {
        let report = validate_html(
            r##"<html><body><p id="x"/><p id="x"/><a href="#y">?</a><a href="https://example.com/#z">ok</a></body></html>"##,
            None,
        )
        .unwrap();
        assert_eq!(report.count(CheckKind::DuplicateAnchor), 1);
        assert_eq!(report.count(CheckKind::MissingReferenceTarget), 1);
    }
}
