/*
 * commands/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Command implementations for the docxref CLI.
 */

//! Command implementations for the docxref CLI
//!
//! Each command module handles the CLI interface and delegates to
//! docxref-core for the actual work.

pub mod check;
pub mod render;

use docxref_diagnostics::{DiagnosticMessage, SourceContext};

/// Print diagnostics to stderr, with source snippets when available.
pub fn print_diagnostics<'a>(
    diagnostics: impl IntoIterator<Item = &'a DiagnosticMessage>,
    sources: Option<&SourceContext>,
) {
    for diagnostic in diagnostics {
        eprintln!("{}", diagnostic.to_text(sources));
    }
}
