/*
 * project.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Project discovery and source loading.
 */

//! Project discovery and source loading.
//!
//! A project is a directory with an optional `docxref.yml`, Markdown sources
//! under `main-dir` (main body) and `appendix-dir` (appendix). A single `.md`
//! file renders as a one-file project; a `.json` file holds intermediate
//! documents written by an external renderer.

use std::path::{Path, PathBuf};

use docxref_diagnostics::{DiagnosticMessage, SourceContext};
use walkdir::WalkDir;

use crate::config::ProjectConfig;
use crate::document::{IntermediateDocument, Section};
use crate::error::{Result, XrefError};
use crate::format::OutputFormat;
use crate::reader::{MarkdownReader, read_json};

/// How a source file is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputKind {
    Markdown,
    Json,
}

impl InputKind {
    fn from_path(path: &Path) -> Option<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some("md" | "markdown") => Some(InputKind::Markdown),
            Some("json") => Some(InputKind::Json),
            _ => None,
        }
    }
}

/// One input file of a project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    /// Absolute path.
    pub path: PathBuf,
    /// Project-relative name with `/` separators, used in diagnostics.
    pub name: String,
    pub section: Section,
    pub kind: InputKind,
}

/// Everything read from a project's sources.
#[derive(Debug, Default)]
pub struct LoadedSources {
    pub documents: Vec<IntermediateDocument>,
    /// Reader warnings (unknown table placeholders).
    pub diagnostics: Vec<DiagnosticMessage>,
    /// Source text for rendering diagnostic snippets.
    pub sources: SourceContext,
}

/// Project context for rendering
#[derive(Debug)]
pub struct ProjectContext {
    /// Project root directory (the input directory, or the input file's parent)
    pub dir: PathBuf,

    /// Configuration from `docxref.yml`, or defaults
    pub config: ProjectConfig,

    /// Whether `docxref.yml` was found
    pub has_config_file: bool,

    pub is_single_file: bool,

    /// Input files in compile order: main body, then appendix
    pub files: Vec<SourceFile>,

    /// Output directory (resolved, absolute path)
    pub output_dir: PathBuf,
}

impl ProjectContext {
    /// Discover project context from a path.
    ///
    /// A directory is a project; a `.md` or `.json` file is a single-file
    /// project whose configuration (if any) sits next to it.
    pub fn discover(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().canonicalize()?;

        let (dir, single) = if path.is_file() {
            let kind = InputKind::from_path(&path).ok_or_else(|| {
                XrefError::config(format!(
                    "Unsupported input {} (expected .md or .json)",
                    path.display()
                ))
            })?;
            let dir = path
                .parent()
                .ok_or_else(|| XrefError::other("Input file has no parent directory"))?
                .to_path_buf();
            (dir, Some((path, kind)))
        } else {
            (path, None)
        };

        let loaded = ProjectConfig::load(&dir)?;
        let has_config_file = loaded.is_some();
        let config = loaded.unwrap_or_default();
        let output_dir = dir.join(&config.output_dir);
        let is_single_file = single.is_some();

        let files = match single {
            Some((path, kind)) => vec![SourceFile {
                name: relative_name(&dir, &path),
                path,
                section: Section::Main,
                kind,
            }],
            None => {
                let mut files = collect_sources(&dir, &config.main_dir, Section::Main)?;
                files.extend(collect_sources(&dir, &config.appendix_dir, Section::Appendix)?);
                if files.is_empty() {
                    return Err(XrefError::config(format!(
                        "No Markdown sources under {} or {}",
                        dir.join(&config.main_dir).display(),
                        dir.join(&config.appendix_dir).display()
                    )));
                }
                files
            }
        };

        tracing::debug!(
            dir = %dir.display(),
            files = files.len(),
            config = has_config_file,
            "Discovered project"
        );

        Ok(Self {
            dir,
            config,
            has_config_file,
            is_single_file,
            files,
            output_dir,
        })
    }

    /// Artifact file stem: `output-name`, else the single input's stem,
    /// else the project directory name.
    pub fn output_stem(&self) -> String {
        if let Some(name) = &self.config.output_name {
            return name.clone();
        }
        let from = if self.is_single_file {
            self.files.first().map(|f| f.path.as_path())
        } else {
            Some(self.dir.as_path())
        };
        from.and_then(|p| p.file_stem())
            .and_then(|s| s.to_str())
            .map(str::to_string)
            .unwrap_or_else(|| "document".to_string())
    }

    pub fn output_path(&self, format: OutputFormat) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", self.output_stem(), format.extension()))
    }

    /// Read every source into intermediate documents.
    ///
    /// # Errors
    ///
    /// I/O failures and malformed JSON inputs.
    pub fn load_documents(&self) -> Result<LoadedSources> {
        let reader = MarkdownReader::new(&self.config.tables);
        let mut loaded = LoadedSources::default();
        for file in &self.files {
            let content = std::fs::read_to_string(&file.path)?;
            match file.kind {
                InputKind::Markdown => {
                    let output = reader.read(&file.name, &content, file.section);
                    loaded.documents.push(output.document);
                    loaded.diagnostics.extend(output.diagnostics);
                }
                InputKind::Json => loaded.documents.extend(read_json(&file.name, &content)?),
            }
            loaded.sources.add_file(file.name.clone(), content);
        }
        Ok(loaded)
    }
}

fn relative_name(dir: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(dir).unwrap_or(path);
    relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Markdown files under `dir/sub`, sorted by relative path. Hidden files and
/// directories are skipped.
fn collect_sources(dir: &Path, sub: &Path, section: Section) -> Result<Vec<SourceFile>> {
    let root = dir.join(sub);
    if !root.is_dir() {
        return Ok(Vec::new());
    }
    let mut files = Vec::new();
    let walker = WalkDir::new(&root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !e.file_name().to_string_lossy().starts_with('.'));
    for entry in walker {
        let entry = entry.map_err(std::io::Error::from)?;
        if !entry.file_type().is_file() {
            continue;
        }
        if InputKind::from_path(entry.path()) != Some(InputKind::Markdown) {
            continue;
        }
        files.push(SourceFile {
            name: relative_name(dir, entry.path()),
            path: entry.path().to_path_buf(),
            section,
            kind: InputKind::Markdown,
        });
    }
    files.sort_by(|a, b| a.name.cmp(&b.name));
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Block;
    use std::fs;

    fn write(dir: &Path, name: &str, content: &str) {
        let path = dir.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_directory_project_orders_sources() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "00-main/02-method.md", "# Method\n");
        write(tmp.path(), "00-main/01-intro.md", "# Intro\n");
        write(tmp.path(), "00-main/.draft.md", "# Draft\n");
        write(tmp.path(), "00-main/notes.txt", "ignored");
        write(tmp.path(), "01-app/a.md", "# Data\n");

        let project = ProjectContext::discover(tmp.path()).unwrap();
        assert!(!project.has_config_file);
        assert!(!project.is_single_file);
        let names: Vec<&str> = project.files.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, ["00-main/01-intro.md", "00-main/02-method.md", "01-app/a.md"]);
        assert_eq!(project.files[2].section, Section::Appendix);

        let dir_name = tmp.path().canonicalize().unwrap();
        let stem = dir_name.file_name().unwrap().to_str().unwrap();
        assert_eq!(
            project.output_path(OutputFormat::Docx),
            dir_name.join("_dist").join(format!("{}.docx", stem))
        );
    }

    #[test]
    fn test_configured_directories_and_name() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "docxref.yml",
            "main-dir: body\nappendix-dir: extra\noutput-dir: out\noutput-name: report\n",
        );
        write(tmp.path(), "body/intro.md", "# Intro\n");
        write(tmp.path(), "00-main/ignored.md", "# Ignored\n");

        let project = ProjectContext::discover(tmp.path()).unwrap();
        assert!(project.has_config_file);
        assert_eq!(project.files.len(), 1);
        assert_eq!(project.output_path(OutputFormat::Html).file_name().unwrap(), "report.html");
        assert!(project.output_dir.ends_with("out"));
    }

    #[test]
    fn test_single_markdown_file() {
        let tmp = tempfile::tempdir().unwrap();
        write(tmp.path(), "paper.md", "# Intro\n\n![A](a.png){#fig:a}\n\nSee @fig:a.\n");

        let project = ProjectContext::discover(tmp.path().join("paper.md")).unwrap();
        assert!(project.is_single_file);
        assert_eq!(project.output_stem(), "paper");

        let loaded = project.load_documents().unwrap();
        assert_eq!(loaded.documents.len(), 1);
        assert_eq!(loaded.documents[0].source, "paper.md");
        assert!(matches!(loaded.documents[0].blocks[1], Block::Entity(_)));
        assert!(loaded.sources.get_file("paper.md").is_some());
    }

    #[test]
    fn test_json_input() {
        let tmp = tempfile::tempdir().unwrap();
        write(
            tmp.path(),
            "doc.json",
            r#"[{"source": "a.md", "blocks": []}, {"source": "b.md", "section": "appendix", "blocks": []}]"#,
        );
        let project = ProjectContext::discover(tmp.path().join("doc.json")).unwrap();
        let loaded = project.load_documents().unwrap();
        assert_eq!(loaded.documents.len(), 2);
        assert_eq!(project.files[0].kind, InputKind::Json);
    }

    #[test]
    fn test_rejects_empty_project_and_unknown_input() {
        let tmp = tempfile::tempdir().unwrap();
        let err = ProjectContext::discover(tmp.path()).unwrap_err();
        assert!(matches!(err, XrefError::Config(_)));

        write(tmp.path(), "paper.docx", "");
        let err = ProjectContext::discover(tmp.path().join("paper.docx")).unwrap_err();
        assert!(err.to_string().contains("Unsupported input"));

        assert!(matches!(
            ProjectContext::discover(tmp.path().join("missing.md")),
            Err(XrefError::Io(_))
        ));
    }
}
