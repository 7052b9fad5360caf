/*
 * reader/table.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Configured table placeholders.
 */

//! Configured table placeholders.
//!
//! A line `{{__name__}}` places the table `name` from the project
//! configuration. An annotation right after it changes how the rows are
//! shown:
//!
//! ```text
//! {{__results__}}{tbl:index:no;sortby:Value:desc;filter:^A}
//! ```
//!
//! Options are separated by `;`:
//!
//! - `index:no` / `index:yes` - hide or show the row-index column
//! - `sortby:COLUMN[:asc|desc]` - sort rows (numerically when every value is a number)
//! - `filter:REGEX[:COLUMN]` - keep rows matching in COLUMN, or in any column
//!
//! Sorting runs before filtering; the index counts the remaining rows from 0.
//! Unknown options are ignored.

use std::cmp::Ordering;

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::TableSpec;
use crate::document::TableData;

static PLACEHOLDER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\{\{__(\w+)__\}\}").unwrap());

/// Display options parsed from a `{tbl:...}` annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableAnnotation {
    /// `None` keeps the table's configured default.
    pub show_index: Option<bool>,
    pub sort_by: Option<String>,
    pub ascending: bool,
    pub filter: Option<String>,
    pub filter_column: Option<String>,
}

impl Default for TableAnnotation {
    fn default() -> Self {
        Self {
            show_index: None,
            sort_by: None,
            ascending: true,
            filter: None,
            filter_column: None,
        }
    }
}

impl TableAnnotation {
    /// Parse `{tbl:...}` (braces and prefix optional).
    pub fn parse(annotation: &str) -> Self {
        let mut result = Self::default();
        let mut body = annotation.trim();
        if let Some(inner) = body.strip_prefix('{').and_then(|b| b.strip_suffix('}')) {
            body = inner;
        }
        body = body.strip_prefix("tbl:").unwrap_or(body);

        for part in body.split(';').map(str::trim).filter(|p| !p.is_empty()) {
            let tokens: Vec<&str> = part.split(':').map(str::trim).collect();
            match (tokens[0], tokens.get(1)) {
                ("index", Some(value)) if value.eq_ignore_ascii_case("no") => {
                    result.show_index = Some(false)
                }
                ("index", Some(value)) if value.eq_ignore_ascii_case("yes") => {
                    result.show_index = Some(true)
                }
                ("sortby", Some(column)) => {
                    result.sort_by = Some(column.to_string());
                    result.ascending = !tokens
                        .get(2)
                        .is_some_and(|order| order.eq_ignore_ascii_case("desc"));
                }
                ("filter", Some(pattern)) => {
                    result.filter = Some(pattern.to_string());
                    result.filter_column = tokens.get(2).map(|c| c.to_string());
                }
                _ => tracing::debug!(option = part, "Ignoring unknown table option"),
            }
        }
        result
    }
}

/// A `{{__name__}}` line split into table name and annotation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placeholder {
    pub name: String,
    pub annotation: Option<TableAnnotation>,
}

/// Recognize a line that consists of a placeholder and an optional
/// annotation.
pub fn parse_placeholder(line: &str) -> Option<Placeholder> {
    let line = line.trim();
    let found = PLACEHOLDER.captures(line)?;
    let whole = found.get(0)?;
    if whole.start() != 0 {
        return None;
    }
    let name = found.get(1)?.as_str().to_string();
    let rest = line[whole.end()..].trim_start();
    if rest.is_empty() {
        return Some(Placeholder {
            name,
            annotation: None,
        });
    }
    if !rest.starts_with("{tbl:") {
        return None;
    }

    // The pattern itself may contain braces.
    let mut depth = 0usize;
    for (i, c) in rest.char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    if !rest[i + 1..].trim().is_empty() {
                        return None;
                    }
                    return Some(Placeholder {
                        name,
                        annotation: Some(TableAnnotation::parse(&rest[..=i])),
                    });
                }
            }
            _ => {}
        }
    }
    None
}

/// The rows a placeholder shows.
pub fn expand_table(spec: &TableSpec, annotation: Option<&TableAnnotation>) -> TableData {
    let mut rows = spec.rows.clone();
    let default = TableAnnotation::default();
    let annotation = annotation.unwrap_or(&default);

    if let Some(column) = annotation.sort_by.as_deref() {
        match spec.columns.iter().position(|c| c == column) {
            Some(index) => sort_rows(&mut rows, index, annotation.ascending),
            None => tracing::warn!(column, "Sort column not found in table"),
        }
    }

    if let Some(pattern) = annotation.filter.as_deref() {
        match Regex::new(pattern) {
            Ok(regex) => {
                let column = annotation
                    .filter_column
                    .as_deref()
                    .and_then(|c| spec.columns.iter().position(|name| name == c));
                rows.retain(|row| match column {
                    Some(index) => row.get(index).is_some_and(|v| regex.is_match(v)),
                    None => row.iter().any(|v| regex.is_match(v)),
                });
            }
            Err(err) => tracing::warn!(pattern, error = %err, "Ignoring invalid table filter"),
        }
    }

    let mut columns = spec.columns.clone();
    if annotation.show_index.unwrap_or(spec.index) {
        columns.insert(0, String::new());
        for (i, row) in rows.iter_mut().enumerate() {
            row.insert(0, i.to_string());
        }
    }
    TableData { columns, rows }
}

fn sort_rows(rows: &mut [Vec<String>], column: usize, ascending: bool) {
    let cell = |row: &Vec<String>| row.get(column).cloned().unwrap_or_default();
    let numeric: Option<Vec<f64>> = rows.iter().map(|r| cell(r).trim().parse::<f64>().ok()).collect();

    let compare = |a: &Vec<String>, b: &Vec<String>| -> Ordering {
        if numeric.is_some() {
            let x = cell(a).trim().parse::<f64>().unwrap_or(f64::NAN);
            let y = cell(b).trim().parse::<f64>().unwrap_or(f64::NAN);
            x.partial_cmp(&y).unwrap_or(Ordering::Equal)
        } else {
            cell(a).cmp(&cell(b))
        }
    };
    rows.sort_by(|a, b| {
        let ordering = compare(a, b);
        if ascending { ordering } else { ordering.reverse() }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TableSpec {
        let row = |name: &str, value: &str| vec![name.to_string(), value.to_string()];
        TableSpec {
            caption: "Results".to_string(),
            columns: vec!["Name".to_string(), "Value".to_string()],
            rows: vec![row("Beta", "20"), row("Alpha", "100"), row("Gamma", "3")],
            index: true,
        }
    }

    #[test]
    fn test_parse_annotation() {
        let annotation = TableAnnotation::parse("{tbl:index:no;sortby:Value:desc;filter:^A:Name;nocaption}");
        assert_eq!(annotation.show_index, Some(false));
        assert_eq!(annotation.sort_by.as_deref(), Some("Value"));
        assert!(!annotation.ascending);
        assert_eq!(annotation.filter.as_deref(), Some("^A"));
        assert_eq!(annotation.filter_column.as_deref(), Some("Name"));
    }

    #[test]
    fn test_parse_placeholder_lines() {
        assert_eq!(
            parse_placeholder("{{__results__}}"),
            Some(Placeholder {
                name: "results".to_string(),
                annotation: None
            })
        );
        let with = parse_placeholder("  {{__results__}}{tbl:index:no} ").unwrap();
        assert_eq!(with.annotation.unwrap().show_index, Some(false));
        assert_eq!(parse_placeholder("See {{__results__}} here"), None);
        assert_eq!(parse_placeholder("{{__results__}} trailing"), None);
        assert_eq!(parse_placeholder("{{__results__}}{tbl:index:no"), None);
    }

    #[test]
    fn test_default_expansion_adds_index() {
        let data = expand_table(&spec(), None);
        assert_eq!(data.columns, ["", "Name", "Value"]);
        assert_eq!(data.rows[0], ["0", "Beta", "20"]);
        assert_eq!(data.rows[2], ["2", "Gamma", "3"]);
    }

    #[test]
    fn test_numeric_sort_then_filter() {
        let annotation = TableAnnotation::parse("{tbl:sortby:Value;filter:a$:Name}");
        let data = expand_table(&spec(), Some(&annotation));
        let names: Vec<&str> = data.rows.iter().map(|r| r[1].as_str()).collect();
        assert_eq!(names, ["Beta", "Gamma"]);
        let indices: Vec<&str> = data.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(indices, ["0", "1"]);
    }

    #[test]
    fn test_text_sort_descending_without_index() {
        let annotation = TableAnnotation::parse("tbl:sortby:Name:desc;index:no");
        let data = expand_table(&spec(), Some(&annotation));
        assert_eq!(data.columns, ["Name", "Value"]);
        let names: Vec<&str> = data.rows.iter().map(|r| r[0].as_str()).collect();
        assert_eq!(names, ["Gamma", "Beta", "Alpha"]);
    }

    #[test]
    fn test_invalid_filter_is_ignored() {
        let annotation = TableAnnotation::parse("{tbl:filter:(unclosed}");
        assert_eq!(expand_table(&spec(), Some(&annotation)).rows.len(), 3);
    }
}
