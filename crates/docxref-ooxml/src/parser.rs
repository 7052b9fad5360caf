/*
 * parser.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * XML parser that builds XmlDocument trees.
 */

//! XML parser that builds [`XmlDocument`] trees.

use crate::{Error, Result, Span, XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement};
use quick_xml::Reader;
use quick_xml::events::{BytesCData, BytesEnd, BytesStart, BytesText, Event};

/// Parse XML from a string.
///
/// ```rust
/// use docxref_ooxml::parse;
///
/// let xml = parse("<root><child/></root>").unwrap();
/// assert_eq!(xml.root.name, "root");
/// ```
///
/// # Errors
///
/// Returns an error if the XML is malformed.
pub fn parse(content: &str) -> Result<XmlDocument> {
    XmlParser::new(content).parse()
}

/// Parse XML from raw package bytes (must be UTF-8, as every part this
/// crate writes is).
pub fn parse_bytes(bytes: &[u8]) -> Result<XmlDocument> {
    let content = std::str::from_utf8(bytes).map_err(|e| Error::Encoding(e.to_string()))?;
    parse(content.trim_start_matches('\u{feff}'))
}

/// Internal parser state.
struct XmlParser<'a> {
    source: &'a str,
    reader: Reader<&'a [u8]>,
    /// Stack of elements being built.
    stack: Vec<BuildNode>,
}

/// A node being constructed during parsing.
struct BuildNode {
    name: String,
    prefix: Option<String>,
    attributes: Vec<XmlAttribute>,
    /// Byte offset of the `<` that opened this element.
    start_offset: usize,
    children: Vec<XmlChild>,
}

impl<'a> XmlParser<'a> {
    fn new(source: &'a str) -> Self {
        let mut reader = Reader::from_str(source);
        reader.config_mut().trim_text_start = false;
        reader.config_mut().trim_text_end = false;

        Self {
            source,
            reader,
            stack: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<XmlDocument> {
        let mut root: Option<XmlElement> = None;

        loop {
            let event_start = self.reader.buffer_position() as usize;

            match self.reader.read_event() {
                Ok(Event::Start(e)) => {
                    self.handle_start(&e, event_start)?;
                }
                Ok(Event::End(e)) => {
                    let element = self.handle_end(&e)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Empty(e)) => {
                    let element = self.handle_empty(&e, event_start)?;
                    self.attach(element, &mut root)?;
                }
                Ok(Event::Text(e)) => {
                    self.handle_text(&e, event_start)?;
                }
                Ok(Event::CData(e)) => {
                    self.handle_cdata(&e, event_start);
                }
                Ok(Event::Comment(_) | Event::PI(_) | Event::Decl(_) | Event::DocType(_)) => {}
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(Error::XmlSyntax {
                        message: e.to_string(),
                        position: Some(self.reader.error_position()),
                    });
                }
            }
        }

        if let Some(node) = self.stack.last() {
            return Err(Error::UnexpectedEof {
                expected: format!("closing tag </{}>", qualified(&node.prefix, &node.name)),
                span: Some(Span::new(node.start_offset, self.source.len())),
            });
        }

        let root = root.ok_or(Error::EmptyDocument)?;
        Ok(XmlDocument {
            root,
            span: Span::new(0, self.source.len()),
        })
    }

    /// Hand a finished element to its parent, or make it the root.
    fn attach(&mut self, element: XmlElement, root: &mut Option<XmlElement>) -> Result<()> {
        match self.stack.last_mut() {
            Some(parent) => {
                parent.children.push(XmlChild::Element(element));
                Ok(())
            }
            None if root.is_some() => Err(Error::MultipleRoots {
                span: Some(element.span),
            }),
            None => {
                *root = Some(element);
                Ok(())
            }
        }
    }

    fn handle_start(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<()> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = parse_attributes(e, event_start)?;

        self.stack.push(BuildNode {
            name,
            prefix,
            attributes,
            start_offset: event_start,
            children: Vec::new(),
        });

        Ok(())
    }

    fn handle_end(&mut self, e: &BytesEnd<'_>) -> Result<XmlElement> {
        let (end_name, end_prefix) = split_name(e.name().as_ref());

        let node = self.stack.pop().ok_or_else(|| Error::InvalidStructure {
            message: format!("Unexpected closing tag </{}>", qualified(&end_prefix, &end_name)),
            span: None,
        })?;

        let end_offset = self.reader.buffer_position() as usize;

        if node.name != end_name || node.prefix != end_prefix {
            return Err(Error::MismatchedEndTag {
                expected: qualified(&node.prefix, &node.name),
                found: qualified(&end_prefix, &end_name),
                span: Some(Span::new(node.start_offset, end_offset)),
            });
        }

        Ok(XmlElement {
            name: node.name,
            prefix: node.prefix,
            attributes: node.attributes,
            children: finalize_children(node.children),
            span: Span::new(node.start_offset, end_offset),
        })
    }

    fn handle_empty(&mut self, e: &BytesStart<'_>, event_start: usize) -> Result<XmlElement> {
        let (name, prefix) = split_name(e.name().as_ref());
        let attributes = parse_attributes(e, event_start)?;
        let end_offset = self.reader.buffer_position() as usize;

        Ok(XmlElement {
            name,
            prefix,
            attributes,
            children: XmlChildren::Empty,
            span: Span::new(event_start, end_offset),
        })
    }

    fn handle_text(&mut self, e: &BytesText<'_>, event_start: usize) -> Result<()> {
        let text = e.unescape().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid text content: {}", err),
            position: Some(event_start as u64),
        })?;
        let span = Span::new(event_start, self.reader.buffer_position() as usize);
        let content = text.into_owned();

        if let Some(node) = self.stack.last_mut() {
            // Indentation between elements carries no meaning in package parts.
            if content.trim().is_empty() && !node.children.is_empty() {
                return Ok(());
            }
            node.children.push(XmlChild::Text { content, span });
        }
        Ok(())
    }

    fn handle_cdata(&mut self, e: &BytesCData<'_>, event_start: usize) {
        let content = String::from_utf8_lossy(e.as_ref()).to_string();
        let span = Span::new(event_start, self.reader.buffer_position() as usize);

        if let Some(node) = self.stack.last_mut() {
            node.children.push(XmlChild::Text { content, span });
        }
    }
}

fn qualified(prefix: &Option<String>, name: &str) -> String {
    match prefix {
        Some(p) => format!("{}:{}", p, name),
        None => name.to_string(),
    }
}

fn split_name(raw: &[u8]) -> (String, Option<String>) {
    let full_name = String::from_utf8_lossy(raw);
    match full_name.split_once(':') {
        Some((prefix, local)) => (local.to_string(), Some(prefix.to_string())),
        None => (full_name.into_owned(), None),
    }
}

fn parse_attributes(e: &BytesStart<'_>, tag_start: usize) -> Result<Vec<XmlAttribute>> {
    let mut attributes = Vec::new();

    for attr_result in e.attributes() {
        let attr = attr_result?;
        let (name, prefix) = split_name(attr.key.as_ref());
        let value = attr.unescape_value().map_err(|err| Error::XmlSyntax {
            message: format!("Invalid attribute value: {}", err),
            position: Some(tag_start as u64),
        })?;

        attributes.push(XmlAttribute {
            name,
            prefix,
            value: value.into_owned(),
        });
    }

    Ok(attributes)
}

fn finalize_children(mut children: Vec<XmlChild>) -> XmlChildren {
    if children.is_empty() {
        return XmlChildren::Empty;
    }

    if children.iter().all(|c| matches!(c, XmlChild::Element(_))) {
        let elements = children
            .into_iter()
            .filter_map(|c| match c {
                XmlChild::Element(e) => Some(e),
                XmlChild::Text { .. } => None,
            })
            .collect();
        return XmlChildren::Elements(elements);
    }

    if children.len() == 1 {
        if let Some(XmlChild::Text { content, span }) = children.pop() {
            return XmlChildren::Text { content, span };
        }
        return XmlChildren::Empty;
    }

    XmlChildren::Mixed(children)
}
