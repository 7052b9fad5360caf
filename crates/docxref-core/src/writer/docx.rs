/*
 * writer/docx.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * WordprocessingML package writer.
 */

//! WordprocessingML package writer.
//!
//! Builds the smallest package Word opens without repair: content types,
//! relationships, the document body, styles with heading list numbering
//! (which the chapter fields read), and settings asking Word to refresh
//! fields on open.

use docxref_ooxml::XmlWriter;

use super::wordml::{self, W_NS};
use super::{DocumentWriter, RenderedDocument};
use crate::error::Result;
use crate::format::OutputFormat;
use crate::package::{
    CONTENT_TYPES_PART, CORE_PROPS_PART, DOCUMENT_PART, DOCUMENT_RELS_PART, NUMBERING_PART,
    PACKAGE_RELS_PART, Package, SETTINGS_PART, STYLES_PART,
};

const CONTENT_TYPES_NS: &str = "http://schemas.openxmlformats.org/package/2006/content-types";
const RELS_NS: &str = "http://schemas.openxmlformats.org/package/2006/relationships";
const OFFICE_REL: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// (part, content type) overrides.
const OVERRIDES: [(&str, &str); 5] = [
    (
        DOCUMENT_PART,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document.main+xml",
    ),
    (
        STYLES_PART,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.styles+xml",
    ),
    (
        NUMBERING_PART,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.numbering+xml",
    ),
    (
        SETTINGS_PART,
        "application/vnd.openxmlformats-officedocument.wordprocessingml.settings+xml",
    ),
    (
        CORE_PROPS_PART,
        "application/vnd.openxmlformats-package.core-properties+xml",
    ),
];

/// A paragraph style: id, display name, outline level, list numbering id.
struct StyleDef {
    id: &'static str,
    name: &'static str,
    outline: Option<&'static str>,
    num_id: Option<&'static str>,
    size: Option<&'static str>,
}

const PARAGRAPH_STYLES: [StyleDef; 10] = [
    StyleDef { id: "Title", name: "Title", outline: None, num_id: None, size: Some("48") },
    StyleDef { id: "Heading1", name: "Heading 1", outline: Some("0"), num_id: Some("1"), size: Some("32") },
    StyleDef { id: "Heading2", name: "Heading 2", outline: Some("1"), num_id: None, size: Some("28") },
    StyleDef { id: "Heading3", name: "Heading 3", outline: Some("2"), num_id: None, size: Some("24") },
    StyleDef { id: "Appendix", name: "Appendix", outline: Some("0"), num_id: Some("2"), size: Some("32") },
    StyleDef { id: "Caption", name: "Caption", outline: None, num_id: None, size: Some("18") },
    StyleDef { id: "TOCHeading", name: "TOC Heading", outline: None, num_id: None, size: Some("32") },
    StyleDef { id: "TOC1", name: "toc 1", outline: None, num_id: None, size: None },
    StyleDef { id: "TOC2", name: "toc 2", outline: None, num_id: None, size: None },
    StyleDef { id: "TOC3", name: "toc 3", outline: None, num_id: None, size: None },
];

/// Writes `.docx` packages.
#[derive(Debug, Default, Clone, Copy)]
pub struct DocxWriter;

impl DocxWriter {
    pub fn new() -> Self {
        Self
    }

    /// Every part of the package, in the order they are zipped.
    pub fn package(&self, document: &RenderedDocument) -> Result<Package> {
        let mut package = Package::new();
        package.insert(CONTENT_TYPES_PART, content_types_xml()?);
        package.insert(PACKAGE_RELS_PART, package_rels_xml()?);
        package.insert(DOCUMENT_PART, wordml::document_xml(document)?);
        package.insert(DOCUMENT_RELS_PART, document_rels_xml()?);
        package.insert(STYLES_PART, styles_xml()?);
        package.insert(NUMBERING_PART, numbering_xml()?);
        package.insert(SETTINGS_PART, settings_xml()?);
        package.insert(CORE_PROPS_PART, core_xml(document.title.as_deref())?);
        Ok(package)
    }
}

impl DocumentWriter for DocxWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Docx
    }

    fn write(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        self.package(document)?.to_bytes()
    }
}

fn content_types_xml() -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("Types", &[("xmlns", CONTENT_TYPES_NS)])?;
    w.empty(
        "Default",
        &[
            ("Extension", "rels"),
            ("ContentType", "application/vnd.openxmlformats-package.relationships+xml"),
        ],
    )?;
    w.empty(
        "Default",
        &[("Extension", "xml"), ("ContentType", "application/xml")],
    )?;
    for (part, content_type) in OVERRIDES {
        let part_name = format!("/{}", part);
        w.empty(
            "Override",
            &[("PartName", part_name.as_str()), ("ContentType", content_type)],
        )?;
    }
    Ok(w.finish()?)
}

fn relationships(entries: &[(&str, &str, &str)]) -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("Relationships", &[("xmlns", RELS_NS)])?;
    for (id, kind, target) in entries {
        w.empty(
            "Relationship",
            &[("Id", *id), ("Type", *kind), ("Target", *target)],
        )?;
    }
    Ok(w.finish()?)
}

fn package_rels_xml() -> Result<String> {
    let office_document = format!("{}/officeDocument", OFFICE_REL);
    relationships(&[
        ("rId1", office_document.as_str(), DOCUMENT_PART),
        (
            "rId2",
            "http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties",
            CORE_PROPS_PART,
        ),
    ])
}

fn document_rels_xml() -> Result<String> {
    let styles = format!("{}/styles", OFFICE_REL);
    let numbering = format!("{}/numbering", OFFICE_REL);
    let settings = format!("{}/settings", OFFICE_REL);
    relationships(&[
        ("rId1", styles.as_str(), "styles.xml"),
        ("rId2", numbering.as_str(), "numbering.xml"),
        ("rId3", settings.as_str(), "settings.xml"),
    ])
}

fn styles_xml() -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("w:styles", &[("xmlns:w", W_NS)])?;

    w.start("w:docDefaults", &[])?;
    w.start("w:rPrDefault", &[])?;
    w.start("w:rPr", &[])?;
    w.empty(
        "w:rFonts",
        &[("w:ascii", "Calibri"), ("w:hAnsi", "Calibri"), ("w:cs", "Calibri")],
    )?;
    w.empty("w:sz", &[("w:val", "22")])?;
    w.end()?;
    w.end()?;
    w.end()?;

    w.start(
        "w:style",
        &[("w:type", "paragraph"), ("w:default", "1"), ("w:styleId", "Normal")],
    )?;
    w.empty("w:name", &[("w:val", "Normal")])?;
    w.start("w:pPr", &[])?;
    w.empty("w:spacing", &[("w:after", "120")])?;
    w.end()?;
    w.end()?;

    for style in &PARAGRAPH_STYLES {
        paragraph_style(&mut w, style)?;
    }

    w.start("w:style", &[("w:type", "table"), ("w:styleId", "TableGrid")])?;
    w.empty("w:name", &[("w:val", "Table Grid")])?;
    w.start("w:tblPr", &[])?;
    w.start("w:tblBorders", &[])?;
    for edge in ["w:top", "w:left", "w:bottom", "w:right", "w:insideH", "w:insideV"] {
        w.empty(
            edge,
            &[("w:val", "single"), ("w:sz", "4"), ("w:space", "0"), ("w:color", "auto")],
        )?;
    }
    w.end()?;
    w.end()?;
    w.end()?;

    Ok(w.finish()?)
}

fn paragraph_style(w: &mut XmlWriter, style: &StyleDef) -> Result<()> {
    w.start("w:style", &[("w:type", "paragraph"), ("w:styleId", style.id)])?;
    w.empty("w:name", &[("w:val", style.name)])?;
    w.empty("w:basedOn", &[("w:val", "Normal")])?;
    w.empty("w:next", &[("w:val", "Normal")])?;
    w.empty("w:qFormat", &[])?;
    w.start("w:pPr", &[])?;
    if style.outline.is_some() {
        w.empty("w:keepNext", &[])?;
    }
    if let Some(num_id) = style.num_id {
        w.start("w:numPr", &[])?;
        w.empty("w:ilvl", &[("w:val", "0")])?;
        w.empty("w:numId", &[("w:val", num_id)])?;
        w.end()?;
    }
    if style.id == "Caption" {
        w.empty("w:jc", &[("w:val", "center")])?;
    }
    if let Some(level) = style.outline {
        w.empty("w:outlineLvl", &[("w:val", level)])?;
    }
    w.end()?;
    if let Some(size) = style.size {
        w.start("w:rPr", &[])?;
        if style.outline.is_some() || style.id == "Title" {
            w.empty("w:b", &[])?;
        }
        w.empty("w:sz", &[("w:val", size)])?;
        w.end()?;
    }
    w.end()?;
    Ok(())
}

/// Heading 1 counts 1, 2, 3; Appendix counts A, B, C.
fn numbering_xml() -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("w:numbering", &[("xmlns:w", W_NS)])?;
    for (abstract_id, format, style) in [("0", "decimal", "Heading1"), ("1", "upperLetter", "Appendix")] {
        w.start("w:abstractNum", &[("w:abstractNumId", abstract_id)])?;
        w.empty("w:multiLevelType", &[("w:val", "singleLevel")])?;
        w.start("w:lvl", &[("w:ilvl", "0")])?;
        w.empty("w:start", &[("w:val", "1")])?;
        w.empty("w:numFmt", &[("w:val", format)])?;
        w.empty("w:pStyle", &[("w:val", style)])?;
        w.empty("w:lvlText", &[("w:val", "%1")])?;
        w.empty("w:lvlJc", &[("w:val", "left")])?;
        w.end()?;
        w.end()?;
    }
    for (num_id, abstract_id) in [("1", "0"), ("2", "1")] {
        w.start("w:num", &[("w:numId", num_id)])?;
        w.empty("w:abstractNumId", &[("w:val", abstract_id)])?;
        w.end()?;
    }
    Ok(w.finish()?)
}

fn settings_xml() -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start("w:settings", &[("xmlns:w", W_NS)])?;
    w.empty("w:updateFields", &[("w:val", "true")])?;
    Ok(w.finish()?)
}

/// Core properties without dates so output stays byte-identical.
fn core_xml(title: Option<&str>) -> Result<String> {
    let mut w = XmlWriter::new();
    w.declaration()?;
    w.start(
        "cp:coreProperties",
        &[
            (
                "xmlns:cp",
                "http://schemas.openxmlformats.org/package/2006/metadata/core-properties",
            ),
            ("xmlns:dc", "http://purl.org/dc/elements/1.1/"),
            ("xmlns:dcterms", "http://purl.org/dc/terms/"),
        ],
    )?;
    if let Some(title) = title {
        w.text_element("dc:title", &[], title)?;
    }
    w.text_element("dc:creator", &[], "docxref")?;
    Ok(w.finish()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::validate_package;
    use crate::writer::fixtures;

    #[test]
    fn test_package_has_every_part() {
        let package = DocxWriter::new().package(&fixtures::document()).unwrap();
        let names: Vec<&str> = package.part_names().collect();
        assert_eq!(
            names,
            [
                CONTENT_TYPES_PART,
                PACKAGE_RELS_PART,
                DOCUMENT_PART,
                DOCUMENT_RELS_PART,
                STYLES_PART,
                NUMBERING_PART,
                SETTINGS_PART,
                CORE_PROPS_PART,
            ]
        );
        for name in names {
            docxref_ooxml::parse_bytes(package.part(name).unwrap()).unwrap();
        }
    }

    #[test]
    fn test_written_bytes_are_stable_and_valid() {
        let writer = DocxWriter::new();
        let doc = fixtures::document();
        let first = writer.write(&doc).unwrap();
        assert_eq!(first, writer.write(&doc).unwrap());

        let package = Package::from_bytes(&first).unwrap();
        let (scan, report) = validate_package(&package, None).unwrap();
        assert!(report.passed());
        assert_eq!(scan.bookmarks.len(), 2);
    }

    #[test]
    fn test_chapter_styles_are_numbered() {
        let numbering = numbering_xml().unwrap();
        assert!(numbering.contains(r#"<w:numFmt w:val="decimal"/><w:pStyle w:val="Heading1"/>"#));
        assert!(numbering.contains(r#"<w:numFmt w:val="upperLetter"/><w:pStyle w:val="Appendix"/>"#));

        let styles = styles_xml().unwrap();
        let parsed = docxref_ooxml::parse(&styles).unwrap();
        let names: Vec<&str> = parsed
            .root
            .descendants_named("name")
            .into_iter()
            .filter_map(|e| e.get_attribute("val"))
            .collect();
        assert!(names.contains(&"Heading 1"));
        assert!(names.contains(&"Appendix"));
        assert!(names.contains(&"Caption"));
        assert!(settings_xml().unwrap().contains(r#"<w:updateFields w:val="true"/>"#));
    }
}
