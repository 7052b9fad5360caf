/*
 * writer/wordml.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * WordprocessingML serialization of the document body.
 */

//! WordprocessingML serialization of the document body.
//!
//! Fields become complex field runs (`begin`, instruction, `separate`,
//! cached result, `end`) so the word processor can recompute them. A
//! caption's bookmark opens right before the first number field and closes
//! right after the last one.

use docxref_ooxml::XmlWriter;

use super::{RenderedBlock, RenderedDocument, RenderedRun};
use crate::document::{EntityBody, Section, TableData};
use crate::field::{Caption, FieldExpr};
use crate::error::Result;

pub const W_NS: &str = "http://schemas.openxmlformats.org/wordprocessingml/2006/main";
pub const R_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Instruction of the table of contents field.
pub const TOC_INSTRUCTION: &str = r#" TOC \o "1-3" \h \z \u "#;

const TOC_PLACEHOLDER: &str = "Update fields to build the table of contents.";

/// Serialize `word/document.xml`.
pub fn document_xml(document: &RenderedDocument) -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("w:document", &[("xmlns:w", W_NS), ("xmlns:r", R_NS)])?;
    w.start("w:body", &[])?;

    if let Some(title) = &document.title {
        paragraph_start(&mut w, Some("Title"))?;
        text_run(&mut w, title)?;
        w.end()?;
    }
    if document.toc {
        toc(&mut w)?;
    }

    for block in &document.blocks {
        match block {
            RenderedBlock::Heading {
                level,
                section,
                runs,
                ..
            } => {
                paragraph_start(&mut w, Some(heading_style(*level, *section).as_str()))?;
                runs_xml(&mut w, runs)?;
                w.end()?;
            }
            RenderedBlock::Paragraph { runs } => {
                paragraph_start(&mut w, None)?;
                runs_xml(&mut w, runs)?;
                w.end()?;
            }
            RenderedBlock::Entity { body, caption, .. } => match body {
                EntityBody::Figure { path } => {
                    centred_paragraph(&mut w, &format!("[image: {}]", path))?;
                    caption_xml(&mut w, caption)?;
                }
                EntityBody::Table(data) => {
                    caption_xml(&mut w, caption)?;
                    table_xml(&mut w, data)?;
                    // Word merges adjacent tables; keep them apart.
                    paragraph_start(&mut w, None)?;
                    w.end()?;
                }
                EntityBody::Equation { tex } => {
                    centred_paragraph(&mut w, tex)?;
                    caption_xml(&mut w, caption)?;
                }
            },
        }
    }

    section_properties(&mut w)?;
    w.finish().map_err(Into::into)
}

/// Style id of a heading paragraph.
pub fn heading_style(level: u8, section: Section) -> String {
    match (level, section) {
        (1, Section::Appendix) => "Appendix".to_string(),
        (level, _) => format!("Heading{}", level.clamp(1, 3)),
    }
}

fn paragraph_start(w: &mut XmlWriter, style: Option<&str>) -> Result<()> {
    w.start("w:p", &[])?;
    if let Some(style) = style {
        w.start("w:pPr", &[])?;
        w.empty("w:pStyle", &[("w:val", style)])?;
        w.end()?;
    }
    Ok(())
}

fn centred_paragraph(w: &mut XmlWriter, text: &str) -> Result<()> {
    w.start("w:p", &[])?;
    w.start("w:pPr", &[])?;
    w.empty("w:jc", &[("w:val", "center")])?;
    w.end()?;
    text_run(w, text)?;
    w.end()?;
    Ok(())
}

fn text_run(w: &mut XmlWriter, text: &str) -> Result<()> {
    if text.is_empty() {
        return Ok(());
    }
    w.start("w:r", &[])?;
    w.text_element("w:t", &[("xml:space", "preserve")], text)?;
    w.end()?;
    Ok(())
}

fn fld_char(w: &mut XmlWriter, kind: &str) -> Result<()> {
    w.start("w:r", &[])?;
    w.empty("w:fldChar", &[("w:fldCharType", kind)])?;
    w.end()?;
    Ok(())
}

fn complex_field(w: &mut XmlWriter, instruction: &str, cached: &str) -> Result<()> {
    fld_char(w, "begin")?;
    w.start("w:r", &[])?;
    w.text_element("w:instrText", &[("xml:space", "preserve")], instruction)?;
    w.end()?;
    fld_char(w, "separate")?;
    text_run(w, cached)?;
    fld_char(w, "end")?;
    Ok(())
}

/// One field expression as runs.
pub fn field_xml(w: &mut XmlWriter, field: &FieldExpr) -> Result<()> {
    match field {
        FieldExpr::Literal(text) => text_run(w, text),
        FieldExpr::BrokenRef { .. } => {
            w.start("w:r", &[])?;
            w.start("w:rPr", &[])?;
            w.empty("w:b", &[])?;
            w.empty("w:color", &[("w:val", "FF0000")])?;
            w.end()?;
            w.text_element("w:t", &[("xml:space", "preserve")], &field.cached_text())?;
            w.end()?;
            Ok(())
        }
        _ => match field.instruction() {
            Some(instruction) => complex_field(w, &instruction, &field.cached_text()),
            None => text_run(w, &field.cached_text()),
        },
    }
}

fn runs_xml(w: &mut XmlWriter, runs: &[RenderedRun]) -> Result<()> {
    for run in runs {
        match run {
            RenderedRun::Text { text } => text_run(w, text)?,
            RenderedRun::Reference(resolved) => {
                for field in &resolved.fields {
                    field_xml(w, field)?;
                }
            }
        }
    }
    Ok(())
}

/// Caption paragraph with the bookmark around the number fields.
pub fn caption_xml(w: &mut XmlWriter, caption: &Caption) -> Result<()> {
    let id = caption.anchor.id.to_string();
    paragraph_start(w, Some("Caption"))?;
    for field in &caption.prefix {
        field_xml(w, field)?;
    }
    w.empty(
        "w:bookmarkStart",
        &[("w:id", id.as_str()), ("w:name", caption.anchor.name.as_str())],
    )?;
    for field in &caption.number {
        field_xml(w, field)?;
    }
    w.empty("w:bookmarkEnd", &[("w:id", id.as_str())])?;
    for field in &caption.suffix {
        field_xml(w, field)?;
    }
    w.end()?;
    Ok(())
}

fn table_xml(w: &mut XmlWriter, data: &TableData) -> Result<()> {
    w.start("w:tbl", &[])?;
    w.start("w:tblPr", &[])?;
    w.empty("w:tblStyle", &[("w:val", "TableGrid")])?;
    w.empty("w:tblW", &[("w:w", "0"), ("w:type", "auto")])?;
    w.end()?;

    w.start("w:tblGrid", &[])?;
    let width = (9000 / data.columns.len().max(1)).to_string();
    for _ in &data.columns {
        w.empty("w:gridCol", &[("w:w", width.as_str())])?;
    }
    w.end()?;

    w.start("w:tr", &[])?;
    w.start("w:trPr", &[])?;
    w.empty("w:tblHeader", &[])?;
    w.end()?;
    for column in &data.columns {
        cell(w, column, true)?;
    }
    w.end()?;

    for row in &data.rows {
        w.start("w:tr", &[])?;
        for value in row {
            cell(w, value, false)?;
        }
        w.end()?;
    }
    w.end()?;
    Ok(())
}

fn cell(w: &mut XmlWriter, text: &str, header: bool) -> Result<()> {
    w.start("w:tc", &[])?;
    w.start("w:p", &[])?;
    if !text.is_empty() {
        w.start("w:r", &[])?;
        if header {
            w.start("w:rPr", &[])?;
            w.empty("w:b", &[])?;
            w.end()?;
        }
        w.text_element("w:t", &[("xml:space", "preserve")], text)?;
        w.end()?;
    }
    w.end()?;
    w.end()?;
    Ok(())
}

fn toc(w: &mut XmlWriter) -> Result<()> {
    paragraph_start(w, Some("TOCHeading"))?;
    text_run(w, "Contents")?;
    w.end()?;
    paragraph_start(w, None)?;
    complex_field(w, TOC_INSTRUCTION, TOC_PLACEHOLDER)?;
    w.end()?;
    Ok(())
}

/// A4 portrait, one-inch margins.
fn section_properties(w: &mut XmlWriter) -> Result<()> {
    w.start("w:sectPr", &[])?;
    w.empty("w:pgSz", &[("w:w", "11906"), ("w:h", "16838")])?;
    w.empty(
        "w:pgMar",
        &[
            ("w:top", "1440"),
            ("w:right", "1440"),
            ("w:bottom", "1440"),
            ("w:left", "1440"),
            ("w:header", "708"),
            ("w:footer", "708"),
            ("w:gutter", "0"),
        ],
    )?;
    w.end()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{CheckKind, scan_document, validate_scan};
    use crate::writer::fixtures;

    fn caption_only(caption: &Caption) -> String {
        let mut w = XmlWriter::new();
        caption_xml(&mut w, caption).unwrap();
        w.finish().unwrap()
    }

    #[test]
    fn test_bookmark_wraps_every_number_field() {
        let xml = caption_only(&fixtures::caption("Figure", "_Reffig_a", 4, "2", 1, "Overview"));
        let start = xml.find("w:bookmarkStart").unwrap();
        let end = xml.find("w:bookmarkEnd").unwrap();
        let styleref = xml.find("STYLEREF").unwrap();
        let seq = xml.find(" SEQ Figure").unwrap();
        let last_field_end = xml[..end].rfind(r#"w:fldCharType="end""#).unwrap();
        let first_begin = xml.find(r#"w:fldCharType="begin""#).unwrap();

        assert!(start < first_begin && first_begin < styleref);
        assert!(styleref < seq && seq < last_field_end && last_field_end < end);
        assert!(xml[end..].contains(": Overview"));
        assert!(xml[..start].contains(">Figure </w:t>"));
    }

    #[test]
    fn test_broken_reference_is_visible_and_not_a_field() {
        let mut w = XmlWriter::new();
        field_xml(
            &mut w,
            &FieldExpr::BrokenRef {
                target: "fig:missing".to_string(),
            },
        )
        .unwrap();
        let xml = w.finish().unwrap();
        assert!(xml.contains("[??fig:missing]"));
        assert!(xml.contains(r#"<w:color w:val="FF0000"/>"#));
        assert!(!xml.contains("fldChar"));
    }

    #[test]
    fn test_document_passes_validation() {
        let xml = document_xml(&fixtures::document()).unwrap();
        let parsed = docxref_ooxml::parse(&xml).unwrap();
        let scan = scan_document(&parsed.root);
        let report = validate_scan(&scan, None);
        assert!(report.is_clean(), "{}", report.to_text());

        let refs: Vec<&str> = scan.fields.iter().filter_map(|f| f.target()).collect();
        assert_eq!(refs, ["_Reffig_a", "_Reftbl_t"]);
        assert_eq!(scan.bookmarks.len(), 2);
        assert_eq!(scan.fields.iter().filter(|f| f.keyword() == "TOC").count(), 1);
        assert_eq!(report.count(CheckKind::AnchorCoverage), 0);
    }

    #[test]
    fn test_reference_keeps_surrounding_text_order() {
        let xml = document_xml(&fixtures::document()).unwrap();
        let prefix = xml.find("Reference to figure: ").unwrap();
        let label = xml[prefix..].find(">Figure </w:t>").unwrap() + prefix;
        let field = xml[prefix..].find(r" REF _Reffig_a \h ").unwrap() + prefix;
        assert!(prefix < label && label < field);
    }

    #[test]
    fn test_heading_styles() {
        assert_eq!(heading_style(1, Section::Main), "Heading1");
        assert_eq!(heading_style(1, Section::Appendix), "Appendix");
        assert_eq!(heading_style(2, Section::Appendix), "Heading2");
        assert_eq!(heading_style(6, Section::Main), "Heading3");
    }
}
