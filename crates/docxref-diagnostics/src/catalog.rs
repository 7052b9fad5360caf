/*
 * catalog.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Error code catalog.
 */

//! Error code catalog and lookup.
//!
//! Codes have the form `X-<subsystem>-<number>`. The catalog is embedded at
//! compile time from `error_catalog.json`.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Metadata for an error code.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorCodeInfo {
    /// Subsystem name (e.g., "anchors", "validation", "recompute")
    pub subsystem: String,

    /// Short title for the error
    pub title: String,

    /// Default message used when a diagnostic carries no problem statement
    pub message_template: String,

    /// When this code was introduced (version)
    pub since_version: String,
}

/// Global error catalog, loaded lazily from the embedded JSON.
///
/// # Panics
///
/// Panics if the embedded JSON is invalid, which can only happen if the
/// catalog file was edited by hand into an invalid state.
pub static ERROR_CATALOG: Lazy<HashMap<String, ErrorCodeInfo>> = Lazy::new(|| {
    let json_data = include_str!("../error_catalog.json");
    serde_json::from_str(json_data).expect("Invalid error catalog JSON - this is a bug in docxref")
});

/// Look up error code information.
///
/// ```
/// use docxref_diagnostics::catalog::get_error_info;
///
/// let info = get_error_info("X-2-1").unwrap();
/// assert_eq!(info.subsystem, "references");
/// ```
pub fn get_error_info(code: &str) -> Option<&ErrorCodeInfo> {
    ERROR_CATALOG.get(code)
}

/// Get the subsystem name for an error code.
pub fn get_subsystem(code: &str) -> Option<&str> {
    ERROR_CATALOG.get(code).map(|info| info.subsystem.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_loads() {
        assert!(!ERROR_CATALOG.is_empty());
    }

    #[test]
    fn test_codes_are_well_formed() {
        for code in ERROR_CATALOG.keys() {
            let parts: Vec<&str> = code.split('-').collect();
            assert_eq!(parts.len(), 3, "bad code {code}");
            assert_eq!(parts[0], "X");
            assert!(parts[1].parse::<u32>().is_ok(), "bad subsystem in {code}");
            assert!(parts[2].parse::<u32>().is_ok(), "bad number in {code}");
        }
    }

    #[test]
    fn test_validation_codes_share_subsystem() {
        for n in 1..=8 {
            assert_eq!(get_subsystem(&format!("X-3-{n}")), Some("validation"));
        }
    }

    #[test]
    fn test_nonexistent_code() {
        assert!(get_error_info("X-99-99").is_none());
        assert!(get_subsystem("X-99-99").is_none());
    }
}
