/*
 * writer.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Streaming XML writer for package parts.
 */

//! Streaming XML writer for package parts.
//!
//! [`XmlWriter`] keeps track of open elements so callers only name an element
//! once; [`XmlWriter::end`] closes whatever is innermost.

use quick_xml::Writer;
use quick_xml::events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event};

use crate::{Error, Result};

/// Builder for one XML part.
///
/// ```rust
/// use docxref_ooxml::XmlWriter;
///
/// let mut w = XmlWriter::new();
/// w.declaration().unwrap();
/// w.start("w:p", &[]).unwrap();
/// w.empty("w:bookmarkStart", &[("w:id", "0"), ("w:name", "_Reffig_a")]).unwrap();
/// w.end().unwrap();
/// let xml = w.finish().unwrap();
/// assert!(xml.ends_with(r#"<w:p><w:bookmarkStart w:id="0" w:name="_Reffig_a"/></w:p>"#));
/// ```
pub struct XmlWriter {
    writer: Writer<Vec<u8>>,
    open: Vec<String>,
}

impl XmlWriter {
    pub fn new() -> Self {
        Self {
            writer: Writer::new(Vec::new()),
            open: Vec::new(),
        }
    }

    /// Write the standalone UTF-8 declaration every package part starts with.
    pub fn declaration(&mut self) -> Result<&mut Self> {
        self.write(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), Some("yes"))))?;
        Ok(self)
    }

    /// Open an element.
    pub fn start(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<&mut Self> {
        self.write(Event::Start(element(name, attributes)))?;
        self.open.push(name.to_string());
        Ok(self)
    }

    /// Write a self-closing element.
    pub fn empty(&mut self, name: &str, attributes: &[(&str, &str)]) -> Result<&mut Self> {
        self.write(Event::Empty(element(name, attributes)))?;
        Ok(self)
    }

    /// Write escaped text.
    pub fn text(&mut self, text: &str) -> Result<&mut Self> {
        self.write(Event::Text(BytesText::new(text)))?;
        Ok(self)
    }

    /// Write `<name attrs>text</name>`.
    pub fn text_element(
        &mut self,
        name: &str,
        attributes: &[(&str, &str)],
        text: &str,
    ) -> Result<&mut Self> {
        self.start(name, attributes)?;
        self.text(text)?;
        self.end()
    }

    /// Close the innermost open element.
    pub fn end(&mut self) -> Result<&mut Self> {
        let name = self.open.pop().ok_or_else(|| {
            Error::Write("end() called with no open element".to_string())
        })?;
        self.write(Event::End(BytesEnd::new(name)))?;
        Ok(self)
    }

    /// Number of elements currently open.
    pub fn depth(&self) -> usize {
        self.open.len()
    }

    /// Close any elements still open and return the document text.
    pub fn finish(mut self) -> Result<String> {
        while !self.open.is_empty() {
            self.end()?;
        }
        String::from_utf8(self.writer.into_inner()).map_err(|e| Error::Write(e.to_string()))
    }

    fn write(&mut self, event: Event<'_>) -> Result<()> {
        self.writer
            .write_event(event)
            .map_err(|e| Error::Write(e.to_string()))
    }
}

impl Default for XmlWriter {
    fn default() -> Self {
        Self::new()
    }
}

fn element<'a>(name: &'a str, attributes: &[(&'a str, &'a str)]) -> BytesStart<'a> {
    let mut start = BytesStart::new(name);
    for &(key, value) in attributes {
        start.push_attribute((key, value));
    }
    start
}
