/*
 * render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render a discovered project to disk.
 */

//! Render a discovered project to disk.
//!
//! Read sources, compile, write every artifact atomically, then run the
//! optional recompute pass on Word packages. Compilation errors abort before
//! anything is written; recompute problems only add report entries.

use std::path::PathBuf;

use docxref_diagnostics::SourceContext;

use crate::compile::Compiler;
use crate::error::Result;
use crate::format::OutputFormat;
use crate::package::write_atomic;
use crate::project::ProjectContext;
use crate::recompute::{Recompute, run_recompute, select_adapter};
use crate::validate::ValidationReport;

/// What a render wrote.
#[derive(Debug)]
pub struct RenderOutput {
    /// Written files in configured format order.
    pub outputs: Vec<(OutputFormat, PathBuf)>,
    pub report: ValidationReport,
    /// Whether a host refreshed the Word package fields.
    pub recomputed: bool,
    /// Source text, for rendering report diagnostics with snippets.
    pub sources: SourceContext,
}

impl RenderOutput {
    pub fn output(&self, format: OutputFormat) -> Option<&PathBuf> {
        self.outputs.iter().find(|(f, _)| *f == format).map(|(_, p)| p)
    }
}

/// Render with the recompute adapter selected from configuration.
pub async fn render_project(project: &ProjectContext) -> Result<RenderOutput> {
    let recompute = &project.config.recompute;
    if recompute.enabled {
        let adapter = select_adapter(recompute);
        render_with_adapter(project, Some(adapter.as_ref())).await
    } else {
        tracing::debug!("Recompute disabled");
        render_with_adapter(project, None).await
    }
}

/// Render, recomputing Word packages with `adapter` when given.
pub async fn render_with_adapter(
    project: &ProjectContext,
    adapter: Option<&dyn Recompute>,
) -> Result<RenderOutput> {
    let loaded = project.load_documents()?;
    let compilation =
        Compiler::new(project.config.clone()).compile(loaded.documents, loaded.diagnostics)?;

    tokio::fs::create_dir_all(&project.output_dir).await?;
    let mut outputs = Vec::new();
    for artifact in &compilation.artifacts {
        let path = project.output_path(artifact.format);
        write_atomic(&path, &artifact.bytes)?;
        tracing::info!(format = %artifact.format, path = %path.display(), "Wrote output");
        outputs.push((artifact.format, path));
    }

    let mut report = compilation.report;
    let mut recomputed = false;
    if let Some(adapter) = adapter {
        for (format, path) in &outputs {
            if !format.supports_recompute() {
                continue;
            }
            let timeout = project.config.recompute.timeout();
            recomputed |= run_recompute(adapter, path, timeout, &mut report).await.is_some();
        }
    }

    Ok(RenderOutput {
        outputs,
        report,
        recomputed,
        sources: loaded.sources,
    })
}
