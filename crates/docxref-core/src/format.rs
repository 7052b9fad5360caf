/*
 * format.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Output format identifiers.
 */

//! Output format identifiers.
//!
//! A compilation produces one artifact per requested format. Both formats
//! share the same registry, numbering and reference resolution; only the
//! serialization of [`crate::field::FieldExpr`] differs.

use serde::{Deserialize, Serialize};

/// Format identifier enum
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// WordprocessingML package (native fields and bookmarks)
    Docx,
    /// Standalone HTML document (numbers from cached field values)
    Html,
}

impl OutputFormat {
    /// Get the format name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            OutputFormat::Docx => "docx",
            OutputFormat::Html => "html",
        }
    }

    /// Output file extension (without leading dot)
    pub fn extension(&self) -> &'static str {
        self.as_str()
    }

    /// Whether the external recompute pass applies to this format.
    pub fn supports_recompute(&self) -> bool {
        matches!(self, OutputFormat::Docx)
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl TryFrom<&str> for OutputFormat {
    type Error = String;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        match s.trim().to_lowercase().as_str() {
            "docx" | "word" => Ok(OutputFormat::Docx),
            "html" => Ok(OutputFormat::Html),
            _ => Err(format!("Unknown format: {}", s)),
        }
    }
}

/// Parse a comma-separated format list such as `docx,html`.
pub fn parse_format_list(s: &str) -> Result<Vec<OutputFormat>, String> {
    let mut formats = Vec::new();
    for part in s.split(',').filter(|p| !p.trim().is_empty()) {
        let format = OutputFormat::try_from(part)?;
        if !formats.contains(&format) {
            formats.push(format);
        }
    }
    if formats.is_empty() {
        return Err("No output format given".to_string());
    }
    Ok(formats)
}
