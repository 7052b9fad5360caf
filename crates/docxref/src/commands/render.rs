/*
 * commands/render.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Render command implementation.
 */

//! Render command: discover, apply overrides, compile, write, recompute.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use docxref_core::{
    AnchorPolicy, NumberingPolicy, ProjectConfig, ProjectContext, XrefError, parse_format_list,
    render_project,
};
use tracing::info;

use super::print_diagnostics;

/// Arguments for the render command
#[derive(Debug)]
pub struct RenderArgs {
    pub input: Option<String>,
    pub to: Option<String>,
    pub output_dir: Option<String>,
    pub numbering: Option<String>,
    pub anchors: Option<String>,
    pub no_recompute: bool,
    pub recompute_timeout: Option<u64>,
    pub report: String,
    pub quiet: bool,
}

/// Execute the render command
pub fn execute(args: RenderArgs) -> Result<()> {
    let json_report = match args.report.as_str() {
        "text" => false,
        "json" => true,
        other => bail!("Unknown report format: {} (expected text or json)", other),
    };

    let input = args.input.as_deref().unwrap_or(".");
    let mut project = ProjectContext::discover(input)
        .with_context(|| format!("Failed to discover project at {}", input))?;

    project.config = apply_overrides(std::mem::take(&mut project.config), &args)?;
    if let Some(dir) = &args.output_dir {
        let cwd = std::env::current_dir().context("Failed to read current directory")?;
        project.output_dir = cwd.join(PathBuf::from(dir));
    }

    info!(
        dir = %project.dir.display(),
        files = project.files.len(),
        "Rendering project"
    );

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("Failed to create async runtime")?;

    let output = match runtime.block_on(render_project(&project)) {
        Ok(output) => output,
        Err(err) => {
            report_error(&err, json_report);
            bail!("Render failed: {}", summary(&err));
        }
    };

    if json_report {
        let value = serde_json::json!({
            "outputs": output.outputs.iter().map(|(format, path)| serde_json::json!({
                "format": format.as_str(),
                "path": path.display().to_string(),
            })).collect::<Vec<_>>(),
            "recomputed": output.recomputed,
            "report": output.report.to_json(),
        });
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else if !args.quiet {
        print_diagnostics(
            output.report.issues().iter().map(|i| &i.diagnostic),
            Some(&output.sources),
        );
        for (_, path) in &output.outputs {
            eprintln!("Output created: {}", path.display());
        }
    }

    Ok(())
}

/// Layer command-line options over the project configuration.
fn apply_overrides(mut config: ProjectConfig, args: &RenderArgs) -> Result<ProjectConfig> {
    if let Some(to) = &args.to {
        config = config.with_formats(parse_format_list(to).map_err(anyhow::Error::msg)?);
    }
    if let Some(numbering) = &args.numbering {
        let policy = NumberingPolicy::try_from(numbering.as_str()).map_err(anyhow::Error::msg)?;
        config = config.with_numbering(policy);
    }
    if let Some(anchors) = &args.anchors {
        let policy = AnchorPolicy::try_from(anchors.as_str()).map_err(anyhow::Error::msg)?;
        config = config.with_anchors(policy);
    }
    if args.no_recompute {
        config = config.with_recompute_enabled(false);
    }
    if let Some(secs) = args.recompute_timeout {
        if secs == 0 {
            bail!("--recompute-timeout must be positive");
        }
        config = config.with_recompute_timeout(secs);
    }
    Ok(config)
}

fn report_error(err: &XrefError, json_report: bool) {
    let diagnostics = err.diagnostics();
    if json_report {
        let value = serde_json::json!({
            "error": summary(err),
            "diagnostics": diagnostics.iter().map(|d| d.to_json()).collect::<Vec<_>>(),
        });
        println!("{}", value);
        return;
    }
    match err {
        XrefError::Parse(source) => print_diagnostics(&source.diagnostics, Some(&source.source_context)),
        _ => print_diagnostics(&diagnostics, None),
    }
}

fn summary(err: &XrefError) -> String {
    match err {
        XrefError::Parse(_) => "invalid input".to_string(),
        XrefError::AnchorCollision(diag) => diag.title.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args() -> RenderArgs {
        RenderArgs {
            input: None,
            to: None,
            output_dir: None,
            numbering: None,
            anchors: None,
            no_recompute: false,
            recompute_timeout: None,
            report: "text".to_string(),
            quiet: false,
        }
    }

    #[test]
    fn test_no_overrides_keeps_config() {
        let config = apply_overrides(ProjectConfig::default(), &args()).unwrap();
        assert_eq!(config, ProjectConfig::default());
    }

    #[test]
    fn test_overrides_apply() {
        let args = RenderArgs {
            to: Some("docx,html".to_string()),
            numbering: Some("continuous".to_string()),
            anchors: Some("word-native".to_string()),
            no_recompute: true,
            recompute_timeout: Some(5),
            ..args()
        };
        let config = apply_overrides(ProjectConfig::default(), &args).unwrap();
        assert_eq!(config.formats.len(), 2);
        assert_eq!(config.numbering, NumberingPolicy::Continuous);
        assert_eq!(config.anchors, AnchorPolicy::WordNative);
        assert!(!config.recompute.enabled);
        assert_eq!(config.recompute.timeout_secs, 5);
    }

    #[test]
    fn test_bad_override_is_an_error() {
        let args = RenderArgs {
            numbering: Some("sometimes".to_string()),
            ..args()
        };
        let err = apply_overrides(ProjectConfig::default(), &args).unwrap_err();
        assert!(err.to_string().contains("sometimes"));
    }
}
