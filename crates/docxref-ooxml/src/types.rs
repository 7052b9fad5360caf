/*
 * types.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * XML tree types with byte-range tracking.
 */

//! XML tree types with byte-range tracking.

/// A byte range in the parsed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }
}

/// A parsed XML document.
#[derive(Debug, Clone)]
pub struct XmlDocument {
    /// The root element of the document.
    pub root: XmlElement,

    /// Span of the entire input.
    pub span: Span,
}

/// An XML element.
#[derive(Debug, Clone)]
pub struct XmlElement {
    /// The local name of the element (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any (e.g., "w" in `<w:p>`).
    pub prefix: Option<String>,

    /// Attributes of this element.
    pub attributes: Vec<XmlAttribute>,

    /// Child content of this element.
    pub children: XmlChildren,

    /// Span from the start tag to the end of the end tag.
    pub span: Span,
}

/// An XML attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// The local name of the attribute (without namespace prefix).
    pub name: String,

    /// Namespace prefix, if any.
    pub prefix: Option<String>,

    /// The attribute value (after unescaping XML entities).
    pub value: String,
}

/// Children of an XML element.
#[derive(Debug, Clone)]
pub enum XmlChildren {
    /// Element contains only child elements.
    Elements(Vec<XmlElement>),

    /// Element contains only text content.
    Text { content: String, span: Span },

    /// Element contains text and elements interleaved.
    Mixed(Vec<XmlChild>),

    /// Element is empty.
    Empty,
}

/// A single child in mixed content.
#[derive(Debug, Clone)]
pub enum XmlChild {
    Element(XmlElement),
    Text { content: String, span: Span },
}

/// One step of a document-order traversal (see [`XmlElement::walk`]).
#[derive(Debug, Clone, Copy)]
pub enum WalkEvent<'a> {
    /// Entering an element, before any of its children.
    Enter(&'a XmlElement),
    /// A text node.
    Text(&'a str, Span),
    /// Leaving an element, after all of its children.
    Leave(&'a XmlElement),
}

impl XmlElement {
    /// Create a new empty element.
    pub fn new(name: impl Into<String>, prefix: Option<String>, attributes: Vec<XmlAttribute>) -> Self {
        Self {
            name: name.into(),
            prefix,
            attributes,
            children: XmlChildren::Empty,
            span: Span::default(),
        }
    }

    /// The name as written in the source (`prefix:name`).
    pub fn qualified_name(&self) -> String {
        match &self.prefix {
            Some(prefix) => format!("{}:{}", prefix, self.name),
            None => self.name.clone(),
        }
    }

    /// Get an attribute value by local name.
    pub fn get_attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.value.as_str())
    }

    /// Check if this element has child elements.
    pub fn has_elements(&self) -> bool {
        match &self.children {
            XmlChildren::Elements(e) => !e.is_empty(),
            XmlChildren::Mixed(c) => c.iter().any(|c| matches!(c, XmlChild::Element(_))),
            _ => false,
        }
    }

    /// Check if this element is empty.
    pub fn is_empty(&self) -> bool {
        matches!(&self.children, XmlChildren::Empty)
    }

    /// Get text content, if this element contains only text.
    pub fn text(&self) -> Option<&str> {
        match &self.children {
            XmlChildren::Text { content, .. } => Some(content),
            _ => None,
        }
    }

    /// All text below this element concatenated in document order.
    pub fn text_content(&self) -> String {
        let mut out = String::new();
        self.walk(&mut |event| {
            if let WalkEvent::Text(text, _) = event {
                out.push_str(text);
            }
        });
        out
    }

    /// Get child elements by local name.
    pub fn get_children(&self, name: &str) -> Vec<&XmlElement> {
        self.all_children()
            .into_iter()
            .filter(|e| e.name == name)
            .collect()
    }

    /// First child element with the given local name.
    pub fn get_child(&self, name: &str) -> Option<&XmlElement> {
        self.all_children().into_iter().find(|e| e.name == name)
    }

    /// Get all child elements (ignoring text in mixed content).
    pub fn all_children(&self) -> Vec<&XmlElement> {
        match &self.children {
            XmlChildren::Elements(elements) => elements.iter().collect(),
            XmlChildren::Mixed(children) => children
                .iter()
                .filter_map(|c| match c {
                    XmlChild::Element(e) => Some(e),
                    XmlChild::Text { .. } => None,
                })
                .collect(),
            _ => vec![],
        }
    }

    /// Traverse this element and everything below it in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(WalkEvent<'a>)) {
        visit(WalkEvent::Enter(self));
        match &self.children {
            XmlChildren::Elements(elements) => {
                for element in elements {
                    element.walk(visit);
                }
            }
            XmlChildren::Text { content, span } => visit(WalkEvent::Text(content, *span)),
            XmlChildren::Mixed(children) => {
                for child in children {
                    match child {
                        XmlChild::Element(element) => element.walk(visit),
                        XmlChild::Text { content, span } => visit(WalkEvent::Text(content, *span)),
                    }
                }
            }
            XmlChildren::Empty => {}
        }
        visit(WalkEvent::Leave(self));
    }

    /// Every element below this one (excluding itself) with the given local
    /// name, in document order.
    pub fn descendants_named(&self, name: &str) -> Vec<&XmlElement> {
        let mut found = Vec::new();
        self.walk(&mut |event| {
            if let WalkEvent::Enter(e) = event {
                if e.name == name && !std::ptr::eq(e, self) {
                    found.push(e);
                }
            }
        });
        found
    }
}
