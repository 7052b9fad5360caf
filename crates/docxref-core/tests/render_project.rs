/*
 * tests/render_project.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Integration tests for rendering projects from disk.
 */

//! Integration tests for rendering projects from disk.
//!
//! Recompute tests drive the adapter with small shell commands (`false`,
//! `sleep`, `cp`) and are Unix-only.

use std::fs;
use std::path::Path;

use docxref_core::package::{DOCUMENT_PART, Package};
use docxref_core::recompute::{HostKind, HostRecompute};
use docxref_core::validate::validate_package;
use docxref_core::{
    CheckKind, NoopRecompute, OutputFormat, ProjectContext, render_project, render_with_adapter,
};

const CONFIG: &str = "\
title: Field Report
formats: [docx, html]
recompute:
  host: none
tables:
  results:
    caption: Measured values
    columns: [Name, Value]
    rows: [[Beta, \"20\"], [Alpha, \"100\"]]
";

fn write(dir: &Path, name: &str, content: &str) {
    let path = dir.join(name);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn sample_project() -> tempfile::TempDir {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "docxref.yml", CONFIG);
    write(
        tmp.path(),
        "00-main/01-intro.md",
        "# Introduction\n\n![Site overview](img/site.png){#fig:site}\n\nReference to figure: [@fig:site].\n",
    );
    write(
        tmp.path(),
        "00-main/02-results.md",
        "# Results\n\n{{__results__}}{tbl:sortby:Value:desc;index:no}\n\n\
         As [@tbl:results] and [-@eq:model] show, see also @fig:gone.\n\n\
         $$ y = ax + b $$ {#eq:model}\n",
    );
    write(
        tmp.path(),
        "01-app/a-data.md",
        "# Raw data\n\n![Raw plot](img/raw.png){#fig:raw}\n\nCompare @fig:raw with @fig:site.\n",
    );
    tmp
}

#[tokio::test]
async fn test_render_markdown_project() {
    let tmp = sample_project();
    let project = ProjectContext::discover(tmp.path()).unwrap();
    let output = render_project(&project).await.unwrap();

    assert_eq!(output.outputs.len(), 2);
    assert!(!output.recomputed);
    let docx = output.output(OutputFormat::Docx).unwrap();
    assert!(docx.starts_with(tmp.path().canonicalize().unwrap().join("_dist")));

    let package = Package::read(docx).unwrap();
    let (scan, report) = validate_package(&package, None).unwrap();
    assert!(report.passed(), "{}", report.to_text());
    assert_eq!(scan.bookmarks.len(), 4);

    assert!(output.report.passed());
    assert_eq!(output.report.count(CheckKind::DanglingReference), 1);
    // `host: none` is reported like any other missing host.
    assert_eq!(output.report.count(CheckKind::RecomputeUnavailable), 1);

    let html = fs::read_to_string(output.output(OutputFormat::Html).unwrap()).unwrap();
    assert!(html.contains(r##"<a class="xref" href="#fig:site">Figure 1-1</a>"##));
    assert!(html.contains(r##"<a class="xref" href="#tbl:results">Table 2-1</a>"##));
    assert!(html.contains(r##"<a class="xref" href="#eq:model">2-1</a>"##));
    assert!(html.contains(r##"<a class="xref" href="#fig:raw">Figure A-1</a>"##));
    assert!(html.contains("[??fig:gone]"));
    // Sorted descending by value, no index column.
    let alpha = html.find("<td>Alpha</td>").unwrap();
    let beta = html.find("<td>Beta</td>").unwrap();
    assert!(alpha < beta);
}

#[tokio::test]
async fn test_unavailable_host_leaves_valid_package() {
    let tmp = sample_project();
    let project = ProjectContext::discover(tmp.path()).unwrap();
    let output = render_with_adapter(&project, Some(&NoopRecompute)).await.unwrap();

    let docx = output.output(OutputFormat::Docx).unwrap();
    let package = Package::read(docx).unwrap();
    let (_, report) = validate_package(&package, None).unwrap();
    assert!(report.passed());
    assert_eq!(output.report.count(CheckKind::RecomputeUnavailable), 1);
}

#[tokio::test]
async fn test_unknown_placeholder_is_reported() {
    let tmp = tempfile::tempdir().unwrap();
    write(tmp.path(), "paper.md", "# Intro\n\n{{__nope__}}\n");
    let project = ProjectContext::discover(tmp.path().join("paper.md")).unwrap();
    let output = render_with_adapter(&project, None).await.unwrap();
    assert_eq!(output.report.count(CheckKind::UnknownTablePlaceholder), 1);
    assert!(output.output(OutputFormat::Docx).unwrap().ends_with("_dist/paper.docx"));
}

#[tokio::test]
async fn test_collision_writes_nothing() {
    let tmp = tempfile::tempdir().unwrap();
    write(
        tmp.path(),
        "paper.md",
        "# Intro\n\n![A](a.png){#fig:a-b}\n\n![B](b.png){#fig:a.b}\n",
    );
    let project = ProjectContext::discover(tmp.path().join("paper.md")).unwrap();
    assert!(render_with_adapter(&project, None).await.is_err());
    assert!(!project.output_dir.exists());
}

#[cfg(unix)]
mod hosts {
    use super::*;

    fn command(argv: &[&str]) -> HostRecompute {
        HostRecompute::new(HostKind::Command {
            argv: argv.iter().map(|s| s.to_string()).collect(),
        })
    }

    async fn render_with(argv: &[&str], timeout_secs: u64) -> (Vec<u8>, Vec<u8>, docxref_core::RenderOutput) {
        let tmp = sample_project();
        let mut project = ProjectContext::discover(tmp.path()).unwrap();
        project.config.recompute.timeout_secs = timeout_secs;

        let baseline = render_with_adapter(&project, None).await.unwrap();
        let before = fs::read(baseline.output(OutputFormat::Docx).unwrap()).unwrap();

        let output = render_with_adapter(&project, Some(&command(argv))).await.unwrap();
        let after = fs::read(output.output(OutputFormat::Docx).unwrap()).unwrap();
        // Keep the directory alive until the files are read.
        drop(tmp);
        (before, after, output)
    }

    #[tokio::test]
    async fn test_failing_host_leaves_file_untouched() {
        let (before, after, output) = render_with(&["false"], 10).await;
        assert_eq!(before, after);
        assert!(!output.recomputed);
        assert_eq!(output.report.count(CheckKind::RecomputeFailed), 1);
        assert!(output.report.passed());
    }

    #[tokio::test]
    async fn test_timed_out_host_leaves_file_untouched() {
        let (before, after, output) = render_with(&["sleep", "30"], 1).await;
        assert_eq!(before, after);
        assert_eq!(output.report.count(CheckKind::RecomputeTimedOut), 1);
    }

    #[tokio::test]
    async fn test_host_output_must_be_a_package() {
        let (before, after, output) = render_with(&["sh", "-c", "echo junk > {outdir}/out.txt; echo junk > {input}"], 10).await;
        assert_eq!(before, after);
        assert_eq!(output.report.count(CheckKind::RecomputeFailed), 1);
    }

    #[tokio::test]
    async fn test_host_output_with_broken_anchor_is_rejected() {
        let scratch = tempfile::tempdir().unwrap();
        let broken = scratch.path().join("broken.docx");
        let mut package = Package::new();
        package.insert(
            DOCUMENT_PART,
            r#"<w:document xmlns:w="http://schemas.openxmlformats.org/wordprocessingml/2006/main"><w:body><w:p><w:bookmarkStart w:id="0" w:name="_Reffig_site"/><w:r><w:t>Figure 1-1</w:t></w:r></w:p></w:body></w:document>"#,
        );
        package.write(&broken).unwrap();

        let broken = broken.display().to_string();
        let (before, after, output) = render_with(&["cp", broken.as_str(), "{input}"], 10).await;
        assert_eq!(before, after);
        assert!(!output.recomputed);
        assert_eq!(output.report.count(CheckKind::RecomputeFailed), 1);
        assert!(output.report.passed());
    }

    #[tokio::test]
    async fn test_successful_host_replaces_file() {
        let (before, after, output) = render_with(&["cp", "{input}", "{outdir}"], 10).await;
        assert!(output.recomputed);
        assert_eq!(before, after);
        assert!(output.report.passed());
        assert_eq!(output.report.count(CheckKind::RecomputeFailed), 0);
    }
}
