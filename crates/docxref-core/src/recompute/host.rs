/*
 * recompute/host.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Out-of-process recompute hosts.
 */

//! Out-of-process recompute hosts.
//!
//! The host always works on a copy inside a temporary directory. The
//! original package is replaced (atomically) only after the host exits
//! successfully within the timeout and leaves a readable package behind
//! that still passes every structural check.

use std::path::{Path, PathBuf};
use std::process::Stdio;

use async_trait::async_trait;
use tokio::process::Command;

use super::{Recompute, RecomputeError, RecomputeRequest, RecomputeResponse};
use crate::package::{DOCUMENT_PART, Package, write_atomic};
use crate::validate::validate_package;

/// Environment variable naming the PowerShell executable.
pub const POWERSHELL_ENV: &str = "DOCXREF_POWERSHELL";
/// Environment variable naming the LibreOffice `soffice` executable.
pub const SOFFICE_ENV: &str = "DOCXREF_SOFFICE";

/// Find PowerShell: `DOCXREF_POWERSHELL`, then `pwsh`/`powershell` on PATH.
pub fn find_powershell() -> Option<PathBuf> {
    from_env(POWERSHELL_ENV)
        .or_else(|| which::which("powershell").ok())
        .or_else(|| which::which("pwsh").ok())
}

/// Find LibreOffice: `DOCXREF_SOFFICE`, then `soffice`/`libreoffice` on PATH.
pub fn find_soffice() -> Option<PathBuf> {
    from_env(SOFFICE_ENV)
        .or_else(|| which::which("soffice").ok())
        .or_else(|| which::which("libreoffice").ok())
}

fn from_env(var: &str) -> Option<PathBuf> {
    let value = std::env::var_os(var)?;
    let path = PathBuf::from(value);
    if path.is_file() {
        Some(path)
    } else {
        tracing::warn!(var, path = %path.display(), "Ignoring host path that is not a file");
        None
    }
}

/// Which program refreshes the fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HostKind {
    /// Word through PowerShell COM automation (Windows).
    Word { powershell: PathBuf },
    /// `soffice --headless --convert-to docx`.
    LibreOffice { soffice: PathBuf },
    /// Configured argv; `{input}` and `{outdir}` are substituted.
    Command { argv: Vec<String> },
}

#[derive(Debug, Clone)]
pub struct HostRecompute {
    kind: HostKind,
}

/// Arguments for one host run, plus where its output lands.
struct Invocation {
    program: String,
    args: Vec<String>,
    output: PathBuf,
}

impl HostRecompute {
    pub fn new(kind: HostKind) -> Self {
        Self { kind }
    }

    pub fn kind(&self) -> &HostKind {
        &self.kind
    }

    fn invocation(&self, input: &Path, outdir: &Path) -> Result<Invocation, RecomputeError> {
        let file_name = input.file_name().unwrap_or_default();
        let invocation = match &self.kind {
            HostKind::Word { powershell } => Invocation {
                program: powershell.display().to_string(),
                args: vec![
                    "-NoProfile".to_string(),
                    "-NonInteractive".to_string(),
                    "-Command".to_string(),
                    word_script(input),
                ],
                output: input.to_path_buf(),
            },
            HostKind::LibreOffice { soffice } => Invocation {
                program: soffice.display().to_string(),
                args: vec![
                    "--headless".to_string(),
                    "--norestore".to_string(),
                    "--convert-to".to_string(),
                    "docx".to_string(),
                    "--outdir".to_string(),
                    outdir.display().to_string(),
                    input.display().to_string(),
                ],
                output: outdir.join(file_name),
            },
            HostKind::Command { argv } => {
                let substitute = |arg: &String| {
                    arg.replace("{input}", &input.display().to_string())
                        .replace("{outdir}", &outdir.display().to_string())
                };
                let (program, args) = argv.split_first().ok_or_else(|| {
                    RecomputeError::InvalidOutput("recompute command is empty".to_string())
                })?;
                // Commands either write into {outdir} or update {input} in place.
                let written = outdir.join(file_name);
                Invocation {
                    program: substitute(program),
                    args: args.iter().map(substitute).collect(),
                    output: if argv.iter().any(|a| a.contains("{outdir}")) {
                        written
                    } else {
                        input.to_path_buf()
                    },
                }
            }
        };
        Ok(invocation)
    }
}

/// PowerShell script updating every field and table of contents.
fn word_script(path: &Path) -> String {
    let path = path.display().to_string().replace('\'', "''");
    format!(
        "$ErrorActionPreference = 'Stop'; \
         $word = New-Object -ComObject Word.Application; \
         $word.Visible = $false; \
         $word.DisplayAlerts = 0; \
         try {{ \
           $doc = $word.Documents.Open('{path}'); \
           $doc.Fields.Update() | Out-Null; \
           foreach ($toc in $doc.TablesOfContents) {{ $toc.Update() | Out-Null }}; \
           $doc.Save(); \
           $doc.Close() \
         }} finally {{ $word.Quit() }}"
    )
}

#[async_trait]
impl Recompute for HostRecompute {
    fn name(&self) -> &str {
        match self.kind {
            HostKind::Word { .. } => "word",
            HostKind::LibreOffice { .. } => "libreoffice",
            HostKind::Command { .. } => "command",
        }
    }

    async fn recompute(
        &self,
        request: &RecomputeRequest,
    ) -> Result<RecomputeResponse, RecomputeError> {
        let file_name = request.path.file_name().ok_or_else(|| {
            RecomputeError::InvalidOutput(format!("{} is not a file path", request.path.display()))
        })?;

        let work = tempfile::tempdir()?;
        let input = work.path().join(file_name);
        let outdir = work.path().join("out");
        tokio::fs::create_dir_all(&outdir).await?;
        tokio::fs::copy(&request.path, &input).await?;

        let invocation = self.invocation(&input, &outdir)?;
        tracing::debug!(
            host = self.name(),
            program = %invocation.program,
            timeout_secs = request.timeout.as_secs(),
            "Starting recompute host"
        );

        let child = Command::new(&invocation.program)
            .args(&invocation.args)
            .current_dir(work.path())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| RecomputeError::Spawn {
                program: invocation.program.clone(),
                source,
            })?;

        // Dropping the timed-out future drops the child, which kills it.
        let output = tokio::time::timeout(request.timeout, child.wait_with_output())
            .await
            .map_err(|_| RecomputeError::Timeout {
                seconds: request.timeout.as_secs(),
            })??;

        if !output.status.success() {
            return Err(RecomputeError::HostFailed {
                status: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let bytes = tokio::fs::read(&invocation.output).await.map_err(|e| {
            RecomputeError::InvalidOutput(format!("{}: {}", invocation.output.display(), e))
        })?;
        let package = Package::from_bytes(&bytes).map_err(|e| RecomputeError::InvalidOutput(e.to_string()))?;
        package
            .require(DOCUMENT_PART)
            .map_err(|e| RecomputeError::InvalidOutput(e.to_string()))?;
        let (_, report) =
            validate_package(&package, None).map_err(|e| RecomputeError::InvalidOutput(e.to_string()))?;
        if report.has_fatal() {
            tracing::debug!(issues = %report.to_text(), "Rejected recompute output");
            return Err(RecomputeError::InvalidOutput(format!(
                "host output failed {} structural check(s)",
                report.fatal_count()
            )));
        }

        write_atomic(&request.path, &bytes).map_err(|e| RecomputeError::InvalidOutput(e.to_string()))?;

        Ok(RecomputeResponse {
            host: self.name().to_string(),
            message: format!("Updated {}", request.path.display()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn command(argv: &[&str]) -> HostRecompute {
        HostRecompute::new(HostKind::Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
        })
    }

    #[test]
    fn test_command_substitution() {
        let host = command(&["convert", "{input}", "--to", "{outdir}"]);
        let invocation = host
            .invocation(Path::new("/w/report.docx"), Path::new("/w/out"))
            .unwrap();
        assert_eq!(invocation.program, "convert");
        assert_eq!(invocation.args, ["/w/report.docx", "--to", "/w/out"]);
        assert_eq!(invocation.output, Path::new("/w/out/report.docx"));

        let in_place = command(&["update", "{input}"])
            .invocation(Path::new("/w/report.docx"), Path::new("/w/out"))
            .unwrap();
        assert_eq!(in_place.output, Path::new("/w/report.docx"));
    }

    #[test]
    fn test_libreoffice_arguments() {
        let host = HostRecompute::new(HostKind::LibreOffice {
            soffice: PathBuf::from("/usr/bin/soffice"),
        });
        let invocation = host
            .invocation(Path::new("/w/a.docx"), Path::new("/w/out"))
            .unwrap();
        assert_eq!(
            invocation.args,
            ["--headless", "--norestore", "--convert-to", "docx", "--outdir", "/w/out", "/w/a.docx"]
        );
        assert_eq!(invocation.output, Path::new("/w/out/a.docx"));
        assert_eq!(host.name(), "libreoffice");
    }

    #[test]
    fn test_word_script_quotes_path() {
        let script = word_script(Path::new("C:/docs/it's.docx"));
        assert!(script.contains("Open('C:/docs/it''s.docx')"));
        assert!(script.contains("$doc.Fields.Update()"));
        assert!(script.contains("TablesOfContents"));
        assert!(script.contains("finally { $word.Quit() }"));
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let err = command(&[])
            .invocation(Path::new("/w/a.docx"), Path::new("/w/out"))
            .err()
            .unwrap();
        assert!(matches!(err, RecomputeError::InvalidOutput(_)));
    }
}
