/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Diagnostic messages for the docxref cross-reference engine.
 */

//! Diagnostic messages for docxref.
//!
//! Every user-visible problem the engine finds (an unresolved reference, an
//! anchor collision, a malformed package) is reported as a
//! [`DiagnosticMessage`] with a stable code from the error catalog.
//!
//! Messages follow the tidyverse structure:
//!
//! - a short **title**
//! - an optional **problem** statement
//! - up to a handful of **details** (✖ error, ℹ info, • note)
//! - optional **hints** ending in `?`
//!
//! Messages render either as plain text ([`DiagnosticMessage::to_text`]),
//! with an `ariadne` source snippet when a [`SourceContext`] holds the file the
//! diagnostic points into, or as JSON ([`DiagnosticMessage::to_json`]) for
//! machine-readable reports.
//!
//! # Example
//!
//! ```
//! use docxref_diagnostics::DiagnosticMessageBuilder;
//!
//! let msg = DiagnosticMessageBuilder::error("Unresolved Cross-Reference")
//!     .with_code("X-2-1")
//!     .problem("No entity is declared with key `fig:missing`")
//!     .add_hint("Did you mean `fig:mising`?")
//!     .build();
//!
//! assert!(msg.to_text(None).contains("fig:missing"));
//! ```

pub mod builder;
pub mod catalog;
pub mod diagnostic;
pub mod source;

pub use builder::DiagnosticMessageBuilder;
pub use catalog::{ERROR_CATALOG, ErrorCodeInfo, get_error_info, get_subsystem};
pub use diagnostic::{DetailItem, DetailKind, DiagnosticKind, DiagnosticMessage, MessageContent};
pub use source::{SourceContext, SourceLocation};
