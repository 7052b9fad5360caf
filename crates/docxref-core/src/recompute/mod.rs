/*
 * recompute/mod.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * External field recomputation.
 */

//! External field recomputation.
//!
//! After a package is written, a word processor can refresh its fields and
//! table of contents. The engine already writes correct cached values, so
//! this pass is optional and fails open: whatever goes wrong, the package on
//! disk stays exactly as the engine produced it and the failure becomes a
//! recoverable `X-4-*` issue in the report.
//!
//! - [`Recompute`] - the adapter interface
//! - [`NoopRecompute`] - used when no host is available or recompute is off
//! - [`HostRecompute`] - Word (PowerShell COM), LibreOffice, or a configured command
//! - [`select_adapter`] - picks an adapter from configuration and the environment

pub mod host;

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use docxref_diagnostics::{DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder};
use thiserror::Error;

use crate::config::{RecomputeConfig, RecomputeHostKind};
use crate::validate::ValidationReport;

pub use host::{HostKind, HostRecompute, find_powershell, find_soffice};

/// Ask a host to refresh the fields of the package at `path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeRequest {
    /// Absolute path of the finished package.
    pub path: PathBuf,
    pub timeout: Duration,
}

impl RecomputeRequest {
    pub fn new(path: impl Into<PathBuf>, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            timeout,
        }
    }
}

/// A successful recompute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecomputeResponse {
    /// Adapter that did the work.
    pub host: String,
    pub message: String,
}

#[derive(Error, Debug)]
pub enum RecomputeError {
    #[error("no recompute host is available")]
    Unavailable,

    #[error("failed to start {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("host exited with {}: {stderr}", .status.map_or("a signal".to_string(), |c| format!("status {}", c)))]
    HostFailed { status: Option<i32>, stderr: String },

    #[error("host did not finish within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("host output is not a readable package: {0}")]
    InvalidOutput(String),
}

impl RecomputeError {
    /// Catalog code of the report entry for this failure.
    pub fn code(&self) -> &'static str {
        match self {
            RecomputeError::Unavailable => "X-4-1",
            RecomputeError::Timeout { .. } => "X-4-3",
            _ => "X-4-2",
        }
    }

    pub fn to_diagnostic(&self, path: &Path) -> DiagnosticMessage {
        DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, self.code())
            .problem(self.to_string())
            .add_info(format!("Package: {}", path.display()))
            .add_note("Fields keep the values computed during compilation")
            .build()
    }
}

/// Refreshes fields and the table of contents of a package in place.
///
/// Implementations must leave the file untouched unless they fully succeed.
#[async_trait]
pub trait Recompute: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    async fn recompute(
        &self,
        request: &RecomputeRequest,
    ) -> std::result::Result<RecomputeResponse, RecomputeError>;
}

/// Does nothing and reports the host as unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRecompute;

#[async_trait]
impl Recompute for NoopRecompute {
    fn name(&self) -> &str {
        "none"
    }

    async fn recompute(
        &self,
        _request: &RecomputeRequest,
    ) -> std::result::Result<RecomputeResponse, RecomputeError> {
        Err(RecomputeError::Unavailable)
    }
}

/// Pick the adapter configured for this project.
///
/// An explicit `command` wins. `auto` prefers Word on Windows, then
/// LibreOffice, then nothing.
pub fn select_adapter(config: &RecomputeConfig) -> Box<dyn Recompute> {
    if let Some(argv) = config.command.as_ref().filter(|a| !a.is_empty()) {
        return Box::new(HostRecompute::new(HostKind::Command { argv: argv.clone() }));
    }
    let word = || find_powershell().map(|powershell| HostKind::Word { powershell });
    let libreoffice = || find_soffice().map(|soffice| HostKind::LibreOffice { soffice });
    let kind = match config.host {
        RecomputeHostKind::None => None,
        RecomputeHostKind::Word => word(),
        RecomputeHostKind::Libreoffice => libreoffice(),
        RecomputeHostKind::Auto if cfg!(windows) => word().or_else(libreoffice),
        RecomputeHostKind::Auto => libreoffice(),
    };
    match kind {
        Some(kind) => Box::new(HostRecompute::new(kind)),
        None => {
            tracing::debug!(host = ?config.host, "No recompute host found");
            Box::new(NoopRecompute)
        }
    }
}

/// Run `adapter` on `path`, recording any failure in `report`.
///
/// Never fails: a failed recompute leaves the package as it was.
pub async fn run_recompute(
    adapter: &dyn Recompute,
    path: &Path,
    timeout: Duration,
    report: &mut ValidationReport,
) -> Option<RecomputeResponse> {
    let request = RecomputeRequest::new(path, timeout);
    match adapter.recompute(&request).await {
        Ok(response) => {
            tracing::info!(host = %response.host, path = %path.display(), "Recomputed fields");
            Some(response)
        }
        Err(RecomputeError::Unavailable) => {
            tracing::info!("No recompute host available; fields keep their computed values");
            report.push_diagnostic(RecomputeError::Unavailable.to_diagnostic(path));
            None
        }
        Err(err) => {
            tracing::warn!(host = adapter.name(), error = %err, "Recompute failed; package left unchanged");
            report.push_diagnostic(err.to_diagnostic(path));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validate::CheckKind;

    #[test]
    fn test_error_codes() {
        assert_eq!(RecomputeError::Unavailable.code(), "X-4-1");
        assert_eq!(RecomputeError::Timeout { seconds: 3 }.code(), "X-4-3");
        let failed = RecomputeError::HostFailed {
            status: Some(1),
            stderr: "boom".to_string(),
        };
        assert_eq!(failed.code(), "X-4-2");
        assert_eq!(failed.to_string(), "host exited with status 1: boom");
    }

    #[test]
    fn test_disabled_host_selects_noop() {
        let config = RecomputeConfig {
            host: RecomputeHostKind::None,
            ..RecomputeConfig::default()
        };
        assert_eq!(select_adapter(&config).name(), "none");
    }

    #[test]
    fn test_explicit_command_wins() {
        let config = RecomputeConfig {
            host: RecomputeHostKind::None,
            command: Some(vec!["true".to_string(), "{input}".to_string()]),
            ..RecomputeConfig::default()
        };
        assert_eq!(select_adapter(&config).name(), "command");
    }

    #[tokio::test]
    async fn test_noop_is_reported_and_recoverable() {
        let mut report = ValidationReport::new();
        let response = run_recompute(
            &NoopRecompute,
            Path::new("out.docx"),
            Duration::from_secs(1),
            &mut report,
        )
        .await;
        assert!(response.is_none());
        assert_eq!(report.count(CheckKind::RecomputeUnavailable), 1);
        assert!(report.passed());
    }
}
