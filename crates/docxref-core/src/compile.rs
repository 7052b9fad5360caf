/*
 * compile.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * One compilation: intermediate documents in, validated artifacts out.
 */

//! One compilation: intermediate documents in, validated artifacts out.
//!
//! The [`CompileContext`] owns everything a compilation produces, including
//! its [`Registry`]. Nothing is shared between compilations, so independent
//! documents can compile on separate threads.
//!
//! The standard stages (see [`StagePipeline::standard`]):
//!
//! 1. [`RegisterStage`] - registry, numbering, reference discovery
//! 2. [`AnchorStage`] - anchor names and captions (fatal on collision)
//! 3. [`ResolveStage`] - reference fields, dangling markers
//! 4. [`AssembleStage`] - the format-independent [`RenderedDocument`]
//! 5. [`PackageStage`] - one artifact per output format
//! 6. [`ValidateStage`] - structural checks on every artifact
//!
//! Every stage fails closed. Recoverable problems (dangling references,
//! shortened anchors) accumulate in the [`ValidationReport`] instead.

use docxref_diagnostics::{
    DiagnosticKind, DiagnosticMessage, DiagnosticMessageBuilder, SourceLocation,
};
use rustc_hash::FxHashMap;

use crate::anchor::AnchorSynthesizer;
use crate::config::{NumberingPolicy, ProjectConfig};
use crate::document::{Block, DocPosition, EntityKind, Inline, IntermediateDocument, Section};
use crate::entity::{Entity, EntityTable};
use crate::error::{Result, XrefError};
use crate::field::Caption;
use crate::format::OutputFormat;
use crate::numbering::Numbering;
use crate::package::Package;
use crate::registry::Registry;
use crate::resolve::{Reference, Resolution, Resolver};
use crate::stage::{CompileStage, StagePipeline};
use crate::validate::{ValidationReport, validate_html, validate_package};
use crate::writer::{RenderedBlock, RenderedDocument, RenderedRun, writer_for};

/// A finished output file, not yet written to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub format: OutputFormat,
    pub bytes: Vec<u8>,
}

/// Everything one compilation owns.
pub struct CompileContext {
    pub config: ProjectConfig,
    pub documents: Vec<IntermediateDocument>,
    pub registry: Registry,
    pub entities: EntityTable,
    pub references: Vec<Reference>,
    /// Chapter number of each level-1 heading, by heading position.
    pub chapter_labels: FxHashMap<DocPosition, String>,
    /// One caption per entity, same order as `entities`.
    pub captions: Vec<Caption>,
    pub resolution: Resolution,
    pub rendered: Option<RenderedDocument>,
    pub artifacts: Vec<Artifact>,
    /// Recoverable diagnostics raised before validation.
    pub diagnostics: Vec<DiagnosticMessage>,
    pub report: ValidationReport,
}

impl CompileContext {
    pub fn new(config: ProjectConfig, documents: Vec<IntermediateDocument>) -> Self {
        Self {
            config,
            documents,
            registry: Registry::new(),
            entities: EntityTable::new(),
            references: Vec::new(),
            chapter_labels: FxHashMap::default(),
            captions: Vec::new(),
            resolution: Resolution::default(),
            rendered: None,
            artifacts: Vec::new(),
            diagnostics: Vec::new(),
            report: ValidationReport::new(),
        }
    }

    /// Diagnostics found while reading the sources (unknown placeholders).
    pub fn with_diagnostics(mut self, diagnostics: Vec<DiagnosticMessage>) -> Self {
        self.diagnostics.extend(diagnostics);
        self
    }
}

/// Result of a successful compilation.
#[derive(Debug)]
pub struct Compilation {
    pub artifacts: Vec<Artifact>,
    pub report: ValidationReport,
    pub entities: EntityTable,
    pub document: RenderedDocument,
}

impl Compilation {
    pub fn artifact(&self, format: OutputFormat) -> Option<&Artifact> {
        self.artifacts.iter().find(|a| a.format == format)
    }
}

/// Compile documents with the standard pipeline.
pub fn compile(documents: Vec<IntermediateDocument>, config: &ProjectConfig) -> Result<Compilation> {
    Compiler::new(config.clone()).compile(documents, Vec::new())
}

/// A configured pipeline, reusable across compilations.
pub struct Compiler {
    config: ProjectConfig,
    pipeline: StagePipeline,
}

impl Compiler {
    pub fn new(config: ProjectConfig) -> Self {
        Self {
            config,
            pipeline: StagePipeline::standard(),
        }
    }

    pub fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// # Errors
    ///
    /// [`XrefError::AnchorCollision`] before anything is packaged, or
    /// [`XrefError::MalformedPackage`] when an artifact fails a fatal check.
    pub fn compile(
        &self,
        documents: Vec<IntermediateDocument>,
        diagnostics: Vec<DiagnosticMessage>,
    ) -> Result<Compilation> {
        let mut ctx = CompileContext::new(self.config.clone(), documents).with_diagnostics(diagnostics);
        self.pipeline.execute(&mut ctx)?;
        let document = ctx
            .rendered
            .ok_or_else(|| XrefError::other("compilation finished without a document"))?;
        tracing::info!(
            entities = ctx.entities.len(),
            references = ctx.resolution.len(),
            issues = ctx.report.len(),
            "Compiled document"
        );
        Ok(Compilation {
            artifacts: ctx.artifacts,
            report: ctx.report,
            entities: ctx.entities,
            document,
        })
    }
}

/// Every block of every document with its position and the section it
/// belongs to. The appendix starts at the first appendix document or the
/// first appendix marker, whichever comes first, and never ends.
fn blocks_in_order(
    documents: &[IntermediateDocument],
) -> impl Iterator<Item = (usize, usize, &IntermediateDocument, &Block, Section)> {
    let mut section = Section::Main;
    documents.iter().enumerate().flat_map(move |(file, doc)| {
        if doc.section == Section::Appendix {
            section = Section::Appendix;
        }
        let mut doc_section = section;
        let items: Vec<_> = doc
            .blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                if matches!(block, Block::AppendixStart) {
                    doc_section = Section::Appendix;
                }
                (file, index, doc, block, doc_section)
            })
            .collect();
        section = doc_section;
        items
    })
}

fn location(doc: &IntermediateDocument, span: Option<crate::document::TextSpan>) -> Option<SourceLocation> {
    span.map(|s| SourceLocation::new(doc.source.clone(), s.start, s.end))
}

/// Numbers entities in document order and collects reference markers.
pub struct RegisterStage;

impl CompileStage for RegisterStage {
    fn name(&self) -> &str {
        "register"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        let mut numbering = Numbering::new(ctx.config.numbering);

        for (file, index, doc, block, section) in blocks_in_order(&ctx.documents) {
            if section == Section::Appendix && numbering.section() == Section::Main {
                numbering.enter_appendix();
            }
            let position = DocPosition::new(file, index, 0);
            match block {
                Block::Heading { level, inlines } => {
                    if *level == 1 {
                        let scope = numbering.start_chapter();
                        if let Some(label) = scope.chapter_label() {
                            ctx.chapter_labels.insert(position, label);
                        }
                    }
                    collect_references(&mut ctx.references, &mut ctx.diagnostics, doc, file, index, inlines);
                }
                Block::Paragraph { inlines } => {
                    collect_references(&mut ctx.references, &mut ctx.diagnostics, doc, file, index, inlines)
                }
                Block::Entity(decl) => {
                    let kind = decl.kind();
                    if numbering.policy() == NumberingPolicy::RestartPerChapter
                        && numbering.before_first_chapter()
                    {
                        let mut builder =
                            DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-5-2")
                                .problem(format!(
                                    "`{}` comes before the first chapter heading",
                                    decl.raw_key
                                ))
                                .add_hint("Move it below a level-1 heading?");
                        if let Some(location) = location(doc, decl.span) {
                            builder = builder.with_location(location);
                        }
                        ctx.diagnostics.push(builder.build());
                    }
                    let number = numbering.next(kind);
                    let unique_key = ctx.registry.register_at(&decl.raw_key, kind, position);
                    ctx.entities.push(Entity {
                        raw_key: decl.raw_key.clone(),
                        unique_key,
                        kind,
                        caption: decl.caption.clone(),
                        position,
                        number,
                        anchor: None,
                    });
                }
                Block::AppendixStart => {}
            }
        }

        tracing::debug!(
            entities = ctx.entities.len(),
            references = ctx.references.len(),
            chapters = ctx.chapter_labels.len(),
            "Registered entities"
        );
        Ok(())
    }
}

fn collect_references(
    references: &mut Vec<Reference>,
    diagnostics: &mut Vec<DiagnosticMessage>,
    doc: &IntermediateDocument,
    file: usize,
    block: usize,
    inlines: &[Inline],
) {
    for (offset, inline) in inlines.iter().enumerate() {
        let Inline::Reference(marker) = inline else {
            continue;
        };
        let location = location(doc, marker.span);
        if EntityKind::from_key(&marker.target).is_none() {
            let mut builder = DiagnosticMessageBuilder::from_code(DiagnosticKind::Warning, "X-2-2")
                .problem(format!("`{}` has no `fig:`, `tbl:` or `eq:` prefix", marker.target));
            if let Some(location) = &location {
                builder = builder.with_location(location.clone());
            }
            diagnostics.push(builder.build());
        }
        references.push(Reference {
            target: marker.target.clone(),
            position: DocPosition::new(file, block, offset),
            display: marker.display,
            location,
        });
    }
}

/// Names anchors and builds captions.
pub struct AnchorStage;

impl CompileStage for AnchorStage {
    fn name(&self) -> &str {
        "anchor"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        let synthesizer =
            AnchorSynthesizer::new(ctx.config.anchors, ctx.config.numbering, &ctx.config.labels);
        let warnings = synthesizer.assign(&mut ctx.entities)?;
        ctx.diagnostics.extend(warnings);

        ctx.captions = ctx
            .entities
            .iter()
            .map(|entity| {
                synthesizer.caption(entity).ok_or_else(|| {
                    XrefError::other(format!("`{}` has no anchor", entity.unique_key))
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }
}

/// Turns reference markers into fields.
pub struct ResolveStage;

impl CompileStage for ResolveStage {
    fn name(&self) -> &str {
        "resolve"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        ctx.resolution = Resolver::new(&ctx.entities, &ctx.config.labels).resolve(&ctx.references);
        Ok(())
    }
}

/// Builds the [`RenderedDocument`] every writer serializes.
pub struct AssembleStage;

impl CompileStage for AssembleStage {
    fn name(&self) -> &str {
        "assemble"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        let mut blocks = Vec::new();
        let mut entity_index = 0;
        let mut heading_count = 0;

        for (file, index, _, block, section) in blocks_in_order(&ctx.documents) {
            match block {
                Block::Heading { level, inlines } => {
                    heading_count += 1;
                    blocks.push(RenderedBlock::Heading {
                        level: *level,
                        section,
                        number: ctx.chapter_labels.get(&DocPosition::new(file, index, 0)).cloned(),
                        id: format!("sec-{}", heading_count),
                        runs: runs(&ctx.resolution, file, index, inlines)?,
                    });
                }
                Block::Paragraph { inlines } => blocks.push(RenderedBlock::Paragraph {
                    runs: runs(&ctx.resolution, file, index, inlines)?,
                }),
                Block::Entity(decl) => {
                    let (entity, caption) = ctx
                        .entities
                        .as_slice()
                        .get(entity_index)
                        .zip(ctx.captions.get(entity_index))
                        .ok_or_else(|| {
                            XrefError::other(format!("`{}` was never registered", decl.raw_key))
                        })?;
                    entity_index += 1;
                    blocks.push(RenderedBlock::Entity {
                        key: entity.unique_key.clone(),
                        body: decl.body.clone(),
                        caption: caption.clone(),
                    });
                }
                Block::AppendixStart => {}
            }
        }

        ctx.rendered = Some(RenderedDocument {
            title: ctx.config.title.clone(),
            toc: ctx.config.toc,
            blocks,
        });
        Ok(())
    }
}

fn runs(resolution: &Resolution, file: usize, block: usize, inlines: &[Inline]) -> Result<Vec<RenderedRun>> {
    inlines
        .iter()
        .enumerate()
        .map(|(offset, inline)| match inline {
            Inline::Text(text) => Ok(RenderedRun::text(text.clone())),
            Inline::Reference(marker) => resolution
                .get(&DocPosition::new(file, block, offset))
                .cloned()
                .map(RenderedRun::Reference)
                .ok_or_else(|| {
                    XrefError::other(format!("reference to `{}` was never resolved", marker.target))
                }),
        })
        .collect()
}

/// Serializes the document once per configured format.
pub struct PackageStage;

impl CompileStage for PackageStage {
    fn name(&self) -> &str {
        "package"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        let document = ctx
            .rendered
            .as_ref()
            .ok_or_else(|| XrefError::other("nothing to package"))?;
        for format in &ctx.config.formats {
            let bytes = writer_for(*format).write(document)?;
            tracing::debug!(format = %format, bytes = bytes.len(), "Packaged artifact");
            ctx.artifacts.push(Artifact {
                format: *format,
                bytes,
            });
        }
        Ok(())
    }
}

/// Checks every artifact and merges the recoverable diagnostics.
pub struct ValidateStage;

impl CompileStage for ValidateStage {
    fn name(&self) -> &str {
        "validate"
    }

    fn run(&self, ctx: &mut CompileContext) -> Result<()> {
        let mut report = ValidationReport::new();
        for diagnostic in ctx.diagnostics.drain(..) {
            report.push_diagnostic(diagnostic);
        }
        for diagnostic in &ctx.resolution.dangling {
            report.push_diagnostic(diagnostic.clone());
        }

        for artifact in &ctx.artifacts {
            let found = match artifact.format {
                OutputFormat::Docx => {
                    let package = Package::from_bytes(&artifact.bytes)?;
                    validate_package(&package, Some(&ctx.entities))?.1
                }
                OutputFormat::Html => {
                    let html = std::str::from_utf8(&artifact.bytes)
                        .map_err(|e| XrefError::other(e.to_string()))?;
                    validate_html(html, Some(&ctx.entities))?
                }
            };
            report.extend(found);
        }

        if report.has_fatal() {
            tracing::error!(fatal = report.fatal_count(), "Artifact failed validation");
            return Err(XrefError::malformed_package(report));
        }
        ctx.report = report;
        Ok(())
    }
}
