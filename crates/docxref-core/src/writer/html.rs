/*
 * writer/html.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Standalone XHTML writer.
 */

//! Standalone XHTML writer.
//!
//! HTML has no fields, so numbers come from the cached values the engine
//! computed. Entity blocks carry their unique key as element id and every
//! resolved reference links to it.

use docxref_ooxml::XmlWriter;

use super::{DocumentWriter, RenderedBlock, RenderedDocument, RenderedRun};
use crate::document::{EntityBody, TableData};
use crate::error::Result;
use crate::field::{Caption, cached_text};
use crate::format::OutputFormat;

const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";

const STYLE: &str = "body{max-width:50em;margin:auto;font-family:sans-serif}\
figure{text-align:center}table{border-collapse:collapse;margin:auto}\
td,th{border:1px solid #999;padding:.2em .5em}.xref-broken{color:#c00;font-weight:bold}";

#[derive(Debug, Default, Clone, Copy)]
pub struct HtmlWriter;

impl HtmlWriter {
    pub fn new() -> Self {
        Self
    }

    pub fn render(&self, document: &RenderedDocument) -> Result<String> {
        let mut w = XmlWriter::new();
        w.start("html", &[("xmlns", XHTML_NS), ("lang", "en")])?;
        w.start("head", &[])?;
        w.empty("meta", &[("charset", "utf-8")])?;
        w.text_element("title", &[], document.title.as_deref().unwrap_or("Document"))?;
        w.text_element("style", &[], STYLE)?;
        w.end()?;

        w.start("body", &[])?;
        if let Some(title) = &document.title {
            w.text_element("h1", &[("class", "title")], title)?;
        }
        if document.toc {
            toc(&mut w, document)?;
        }
        for block in &document.blocks {
            block_html(&mut w, block)?;
        }
        Ok(format!("<!DOCTYPE html>\n{}\n", w.finish()?))
    }
}

impl DocumentWriter for HtmlWriter {
    fn format(&self) -> OutputFormat {
        OutputFormat::Html
    }

    fn write(&self, document: &RenderedDocument) -> Result<Vec<u8>> {
        Ok(self.render(document)?.into_bytes())
    }
}

fn block_html(w: &mut XmlWriter, block: &RenderedBlock) -> Result<()> {
    match block {
        RenderedBlock::Heading {
            level,
            number,
            id,
            runs,
            ..
        } => {
            // The document title takes h1.
            let tag = format!("h{}", level.saturating_add(1).min(6));
            w.start(&tag, &[("id", id.as_str())])?;
            if let Some(number) = number {
                w.text_element("span", &[("class", "header-section-number")], number)?;
                w.text(" ")?;
            }
            runs_html(w, runs)?;
            w.end()?;
        }
        RenderedBlock::Paragraph { runs } => {
            w.start("p", &[])?;
            runs_html(w, runs)?;
            w.end()?;
        }
        RenderedBlock::Entity { key, body, caption } => {
            let class = body.kind().as_str();
            w.start("figure", &[("id", key.as_str()), ("class", class)])?;
            match body {
                EntityBody::Figure { path } => {
                    w.empty("img", &[("src", path.as_str()), ("alt", caption.text().as_str())])?;
                    caption_html(w, caption)?;
                }
                EntityBody::Table(data) => {
                    caption_html(w, caption)?;
                    table_html(w, data)?;
                }
                EntityBody::Equation { tex } => {
                    w.text_element("div", &[("class", "math display")], &format!("\\[{}\\]", tex))?;
                    caption_html(w, caption)?;
                }
            }
            w.end()?;
        }
    }
    Ok(())
}

fn caption_html(w: &mut XmlWriter, caption: &Caption) -> Result<()> {
    w.start("figcaption", &[])?;
    w.text(&cached_text(&caption.prefix))?;
    w.text_element("span", &[("class", "caption-number")], &caption.number_text())?;
    w.text(&cached_text(&caption.suffix))?;
    w.end()?;
    Ok(())
}

fn runs_html(w: &mut XmlWriter, runs: &[RenderedRun]) -> Result<()> {
    for run in runs {
        match run {
            RenderedRun::Text { text } => {
                w.text(text)?;
            }
            RenderedRun::Reference(resolved) if resolved.is_broken() => {
                w.text_element(
                    "span",
                    &[("class", "xref-broken")],
                    &cached_text(&resolved.fields),
                )?;
            }
            RenderedRun::Reference(resolved) => {
                let href = format!("#{}", resolved.target);
                w.text_element(
                    "a",
                    &[("class", "xref"), ("href", href.as_str())],
                    &cached_text(&resolved.fields),
                )?;
            }
        }
    }
    Ok(())
}

fn table_html(w: &mut XmlWriter, data: &TableData) -> Result<()> {
    w.start("table", &[])?;
    w.start("thead", &[])?;
    w.start("tr", &[])?;
    for column in &data.columns {
        w.text_element("th", &[], column)?;
    }
    w.end()?;
    w.end()?;
    w.start("tbody", &[])?;
    for row in &data.rows {
        w.start("tr", &[])?;
        for value in row {
            w.text_element("td", &[], value)?;
        }
        w.end()?;
    }
    w.end()?;
    w.end()?;
    Ok(())
}

struct TocNode<'a> {
    id: &'a str,
    text: String,
    children: Vec<TocNode<'a>>,
}

/// Headings of levels 1-3 as a tree.
fn toc_tree<'a>(entries: &[(u8, &'a str, String)]) -> Vec<TocNode<'a>> {
    let mut nodes = Vec::new();
    let mut i = 0;
    while i < entries.len() {
        let (level, id, text) = &entries[i];
        let mut j = i + 1;
        while j < entries.len() && entries[j].0 > *level {
            j += 1;
        }
        nodes.push(TocNode {
            id: *id,
            text: text.clone(),
            children: toc_tree(&entries[i + 1..j]),
        });
        i = j;
    }
    nodes
}

fn toc(w: &mut XmlWriter, document: &RenderedDocument) -> Result<()> {
    let entries: Vec<(u8, &str, String)> = document
        .blocks
        .iter()
        .filter_map(|b| match b {
            RenderedBlock::Heading {
                level,
                number,
                id,
                runs,
                ..
            } if *level <= 3 => {
                let title: String = runs.iter().map(RenderedRun::display_text).collect();
                let text = match number {
                    Some(number) => format!("{} {}", number, title),
                    None => title,
                };
                Some((*level, id.as_str(), text))
            }
            _ => None,
        })
        .collect();
    if entries.is_empty() {
        return Ok(());
    }
    w.start("nav", &[("id", "TOC"), ("role", "doc-toc")])?;
    w.text_element("h2", &[], "Contents")?;
    toc_list(w, &toc_tree(&entries))?;
    w.end()?;
    Ok(())
}

fn toc_list(w: &mut XmlWriter, nodes: &[TocNode<'_>]) -> Result<()> {
    w.start("ul", &[])?;
    for node in nodes {
        w.start("li", &[])?;
        let href = format!("#{}", node.id);
        w.text_element("a", &[("href", href.as_str())], &node.text)?;
        if !node.children.is_empty() {
            toc_list(w, &node.children)?;
        }
        w.end()?;
    }
    w.end()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::{CheckKind, validate_html};
    use crate::writer::fixtures;

    #[test]
    fn test_references_link_to_entity_ids() {
        let html = HtmlWriter::new().render(&fixtures::document()).unwrap();
        assert!(html.starts_with("<!DOCTYPE html>\n<html"));
        assert!(html.contains(r##"<a class="xref" href="#fig:a">Figure 1-1</a>"##));
        assert!(html.contains(r#"<span class="xref-broken">[??fig:missing]</span>"#));
        assert!(html.contains(r#"<figure id="tbl:t" class="table">"#));
        assert!(html.contains("Reference to figure: <a"));
    }

    #[test]
    fn test_output_passes_html_checks() {
        let html = HtmlWriter::new().render(&fixtures::document()).unwrap();
        let report = validate_html(&html, None).unwrap();
        assert!(report.is_clean(), "{}", report.to_text());
        assert_eq!(report.count(CheckKind::MissingReferenceTarget), 0);
    }

    #[test]
    fn test_toc_nests_sub_headings() {
        let entries = vec![
            (1, "sec-1", "1 Intro".to_string()),
            (2, "sec-2", "Scope".to_string()),
            (3, "sec-3", "Detail".to_string()),
            (1, "sec-4", "2 Method".to_string()),
        ];
        let tree = toc_tree(&entries);
        assert_eq!(tree.len(), 2);
        assert_eq!(tree[0].children.len(), 1);
        assert_eq!(tree[0].children[0].children[0].id, "sec-3");
        assert!(tree[1].children.is_empty());
    }
}
