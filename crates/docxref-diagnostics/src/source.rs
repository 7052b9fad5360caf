/*
 * source.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Source locations attached to diagnostics.
 */

//! Source locations attached to diagnostics.
//!
//! A [`SourceLocation`] names a file and a byte range inside it. The file
//! content itself lives in a [`SourceContext`] so that locations stay cheap
//! to clone and serialize.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A byte range inside a named source file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    /// File name as shown to the user (usually a project-relative path).
    pub file: String,
    /// Start byte offset (inclusive).
    pub start: usize,
    /// End byte offset (exclusive).
    pub end: usize,
}

impl SourceLocation {
    pub fn new(file: impl Into<String>, start: usize, end: usize) -> Self {
        Self {
            file: file.into(),
            start,
            end: end.max(start),
        }
    }

    /// One-based line and column of the start offset within `content`.
    pub fn line_col(&self, content: &str) -> (usize, usize) {
        let offset = self.start.min(content.len());
        let before = &content[..floor_char_boundary(content, offset)];
        let line = before.matches('\n').count() + 1;
        let column = before
            .rsplit('\n')
            .next()
            .map(|l| l.chars().count() + 1)
            .unwrap_or(1);
        (line, column)
    }
}

/// File contents keyed by the names used in [`SourceLocation::file`].
#[derive(Debug, Clone, Default)]
pub struct SourceContext {
    files: HashMap<String, String>,
}

impl SourceContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register (or replace) the content of a file.
    pub fn add_file(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.files.insert(name.into(), content.into());
    }

    pub fn get_file(&self, name: &str) -> Option<&str> {
        self.files.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

/// Byte offsets coming from parsers may land inside a multi-byte character
/// after arithmetic; step back to the previous boundary.
pub(crate) fn floor_char_boundary(s: &str, mut offset: usize) -> usize {
    if offset >= s.len() {
        return s.len();
    }
    while !s.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

/// Convert a byte offset into a character offset (ariadne counts chars).
pub(crate) fn char_offset(s: &str, byte_offset: usize) -> usize {
    s[..floor_char_boundary(s, byte_offset)].chars().count()
}
