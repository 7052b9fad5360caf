/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * XML reading and writing for WordprocessingML parts.
 */

//! XML reading and writing for WordprocessingML parts.
//!
//! The reader wraps [`quick-xml`] and produces a tree of [`XmlElement`]s
//! where every element and text node remembers the byte range it came from,
//! so problems found while inspecting a package part can point back into it.
//! Namespace prefixes are kept separately from local names (`w:bookmarkStart`
//! parses to name `bookmarkStart`, prefix `w`).
//!
//! The writer ([`XmlWriter`]) is a thin builder over `quick_xml::Writer` used
//! to emit parts with correct escaping.
//!
//! # Example
//!
//! ```rust
//! use docxref_ooxml::parse;
//!
//! let xml = parse(r#"<w:p xmlns:w="urn:w"><w:bookmarkStart w:id="0" w:name="_Reffig_a"/></w:p>"#).unwrap();
//! let start = &xml.root.all_children()[0];
//! assert_eq!(start.name, "bookmarkStart");
//! assert_eq!(start.get_attribute("name"), Some("_Reffig_a"));
//! ```

pub mod error;
pub mod parser;
pub mod types;
pub mod writer;

pub use error::{Error, Result};
pub use parser::{parse, parse_bytes};
pub use types::{Span, WalkEvent, XmlAttribute, XmlChild, XmlChildren, XmlDocument, XmlElement};
pub use writer::XmlWriter;
