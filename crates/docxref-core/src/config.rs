/*
 * config.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project configuration (docxref.yml).
 */

//! Project configuration.
//!
//! A project root may carry a `docxref.yml`. Every key is optional:
//!
//! ```yaml
//! title: My Report
//! numbering: restart-per-chapter   # or continuous
//! anchors: semantic                # or word-native
//! labels: { figure: Figure, table: Table, equation: Eq }
//! toc: true
//! formats: [docx, html]
//! recompute:
//!   host: auto                     # auto | word | libreoffice | none
//!   timeout-secs: 120
//! tables:
//!   test_table:
//!     caption: Test Table
//!     columns: [Name, Value]
//!     rows: [[Item A, "100"]]
//! ```
//!
//! Command-line flags are applied on top with the `with_*` methods.

use std::path::{Path, PathBuf};
use std::time::Duration;

use hashlink::LinkedHashMap;
use serde::{Deserialize, Serialize};

use crate::document::EntityKind;
use crate::error::{Result, XrefError};
use crate::format::OutputFormat;

/// Name of the project configuration file.
pub const CONFIG_FILE: &str = "docxref.yml";

/// How entity numbers are scoped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum NumberingPolicy {
    /// `chapter-sequence`, restarting with every level-1 heading.
    #[default]
    #[serde(alias = "restart-per-scope")]
    RestartPerChapter,
    /// One running integer per kind across the whole document.
    Continuous,
}

impl TryFrom<&str> for NumberingPolicy {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "restart-per-chapter" | "restart-per-scope" | "chapter" => {
                Ok(NumberingPolicy::RestartPerChapter)
            }
            "continuous" => Ok(NumberingPolicy::Continuous),
            _ => Err(format!("Unknown numbering policy: {}", s)),
        }
    }
}

/// How anchor (bookmark) names are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum AnchorPolicy {
    /// `_Ref` + sanitized unique key (`_Reffig_overview`).
    #[default]
    Semantic,
    /// `_Ref` + nine digits, the form Word itself generates.
    WordNative,
}

impl TryFrom<&str> for AnchorPolicy {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s {
            "semantic" => Ok(AnchorPolicy::Semantic),
            "word-native" | "native" => Ok(AnchorPolicy::WordNative),
            _ => Err(format!("Unknown anchor policy: {}", s)),
        }
    }
}

/// Caption and reference labels per entity kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct Labels {
    pub figure: String,
    pub table: String,
    pub equation: String,
}

impl Default for Labels {
    fn default() -> Self {
        Self {
            figure: "Figure".to_string(),
            table: "Table".to_string(),
            equation: "Eq".to_string(),
        }
    }
}

impl Labels {
    pub fn label_for(&self, kind: EntityKind) -> &str {
        match kind {
            EntityKind::Figure => &self.figure,
            EntityKind::Table => &self.table,
            EntityKind::Equation => &self.equation,
        }
    }
}

/// Which host automation performs the final field recompute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum RecomputeHostKind {
    /// Word when available, else LibreOffice, else nothing.
    #[default]
    Auto,
    Word,
    #[serde(alias = "soffice")]
    Libreoffice,
    None,
}

impl TryFrom<&str> for RecomputeHostKind {
    type Error = String;

    fn try_from(s: &str) -> std::result::Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(RecomputeHostKind::Auto),
            "word" => Ok(RecomputeHostKind::Word),
            "libreoffice" | "soffice" => Ok(RecomputeHostKind::Libreoffice),
            "none" | "off" => Ok(RecomputeHostKind::None),
            _ => Err(format!("Unknown recompute host: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct RecomputeConfig {
    pub enabled: bool,
    pub host: RecomputeHostKind,
    pub timeout_secs: u64,
    /// Explicit argv; `{input}` and `{outdir}` are substituted.
    pub command: Option<Vec<String>>,
}

impl Default for RecomputeConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            host: RecomputeHostKind::Auto,
            timeout_secs: 120,
            command: None,
        }
    }
}

impl RecomputeConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// A table defined in configuration and placed with `{{__name__}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub struct TableSpec {
    pub caption: String,
    pub columns: Vec<String>,
    #[serde(default)]
    pub rows: Vec<Vec<String>>,
    /// Show a leading row-index column unless an annotation turns it off.
    #[serde(default = "default_true")]
    pub index: bool,
}

fn default_true() -> bool {
    true
}

/// Parsed `docxref.yml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProjectConfig {
    pub title: Option<String>,
    pub numbering: NumberingPolicy,
    pub anchors: AnchorPolicy,
    pub labels: Labels,
    pub toc: bool,
    pub main_dir: PathBuf,
    pub appendix_dir: PathBuf,
    pub output_dir: PathBuf,
    /// Artifact file stem; defaults to the project directory name.
    pub output_name: Option<String>,
    pub formats: Vec<OutputFormat>,
    pub recompute: RecomputeConfig,
    pub tables: LinkedHashMap<String, TableSpec>,
}

impl Default for ProjectConfig {
    fn default() -> Self {
        Self {
            title: None,
            numbering: NumberingPolicy::default(),
            anchors: AnchorPolicy::default(),
            labels: Labels::default(),
            toc: true,
            main_dir: PathBuf::from("00-main"),
            appendix_dir: PathBuf::from("01-app"),
            output_dir: PathBuf::from("_dist"),
            output_name: None,
            formats: vec![OutputFormat::Docx],
            recompute: RecomputeConfig::default(),
            tables: LinkedHashMap::new(),
        }
    }
}

impl ProjectConfig {
    /// Parse configuration text.
    pub fn from_yaml(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: ProjectConfig = serde_yaml::from_str(content)?;
        config.check()?;
        Ok(config)
    }

    /// Load `docxref.yml` from `dir`, or defaults when there is none.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = dir.join(CONFIG_FILE);
        if !path.is_file() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)?;
        let config = Self::from_yaml(&content)
            .map_err(|e| XrefError::config(format!("{}: {}", path.display(), e)))?;
        tracing::debug!(path = %path.display(), "Loaded project configuration");
        Ok(Some(config))
    }

    fn check(&self) -> Result<()> {
        if self.formats.is_empty() {
            return Err(XrefError::config("`formats` must name at least one format"));
        }
        if self.recompute.timeout_secs == 0 {
            return Err(XrefError::config("`recompute.timeout-secs` must be positive"));
        }
        if let Some(command) = &self.recompute.command {
            if command.is_empty() {
                return Err(XrefError::config("`recompute.command` must not be empty"));
            }
        }
        for (name, table) in &self.tables {
            if let Some(row) = table.rows.iter().find(|r| r.len() != table.columns.len()) {
                return Err(XrefError::config(format!(
                    "table `{}` has a row with {} cells but {} columns",
                    name,
                    row.len(),
                    table.columns.len()
                )));
            }
        }
        Ok(())
    }

    pub fn with_numbering(mut self, numbering: NumberingPolicy) -> Self {
        self.numbering = numbering;
        self
    }

    pub fn with_anchors(mut self, anchors: AnchorPolicy) -> Self {
        self.anchors = anchors;
        self
    }

    pub fn with_formats(mut self, formats: Vec<OutputFormat>) -> Self {
        self.formats = formats;
        self
    }

    pub fn with_recompute_enabled(mut self, enabled: bool) -> Self {
        self.recompute.enabled = enabled;
        self
    }

    pub fn with_recompute_timeout(mut self, secs: u64) -> Self {
        self.recompute.timeout_secs = secs;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_file() {
        let config = ProjectConfig::from_yaml("").unwrap();
        assert_eq!(config, ProjectConfig::default());
        assert_eq!(config.numbering, NumberingPolicy::RestartPerChapter);
        assert_eq!(config.labels.label_for(EntityKind::Equation), "Eq");
        assert!(config.recompute.enabled);
        assert_eq!(config.recompute.timeout(), Duration::from_secs(120));
    }

    #[test]
    fn test_full_config() {
        let config = ProjectConfig::from_yaml(
            r#"
title: Load Report
numbering: continuous
anchors: word-native
labels:
  figure: Fig.
toc: false
formats: [docx, html]
recompute:
  host: libreoffice
  timeout-secs: 30
tables:
  test_table:
    caption: Test Table
    columns: [Name, Value]
    rows: [[Item A, "100"], [Item B, "200"]]
"#,
        )
        .unwrap();

        assert_eq!(config.title.as_deref(), Some("Load Report"));
        assert_eq!(config.numbering, NumberingPolicy::Continuous);
        assert_eq!(config.anchors, AnchorPolicy::WordNative);
        assert_eq!(config.labels.figure, "Fig.");
        assert_eq!(config.labels.table, "Table");
        assert!(!config.toc);
        assert_eq!(config.formats, vec![OutputFormat::Docx, OutputFormat::Html]);
        assert_eq!(config.recompute.host, RecomputeHostKind::Libreoffice);
        assert_eq!(config.recompute.timeout_secs, 30);
        let table = config.tables.get("test_table").unwrap();
        assert_eq!(table.rows.len(), 2);
        assert!(table.index);
    }

    #[test]
    fn test_ragged_table_rejected() {
        let err = ProjectConfig::from_yaml(
            "tables:\n  t:\n    caption: T\n    columns: [A, B]\n    rows: [[x]]\n",
        )
        .unwrap_err();
        assert!(matches!(err, XrefError::Config(_)));
    }

    #[test]
    fn test_unknown_policy_rejected() {
        assert!(ProjectConfig::from_yaml("numbering: sometimes").is_err());
        assert_eq!(
            NumberingPolicy::try_from("restart-per-scope"),
            Ok(NumberingPolicy::RestartPerChapter)
        );
    }

    #[test]
    fn test_cli_overrides() {
        let config = ProjectConfig::default()
            .with_numbering(NumberingPolicy::Continuous)
            .with_recompute_enabled(false)
            .with_recompute_timeout(5);
        assert_eq!(config.numbering, NumberingPolicy::Continuous);
        assert!(!config.recompute.enabled);
        assert_eq!(config.recompute.timeout_secs, 5);
    }
}
