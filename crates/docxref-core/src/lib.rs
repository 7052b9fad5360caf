/*
 * lib.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Cross-reference and caption numbering synthesis.
 */

//! Cross-reference and caption numbering synthesis for docxref
//!
//! This crate turns an ordered sequence of intermediate documents (one per
//! source file) into word-processor packages whose captions and
//! cross-references are native, recomputable fields.
//!
//! # Architecture
//!
//! - [`Registry`] - raw keys to unique keys (`fig:x`, `fig:x_1`, ...)
//! - [`Numbering`] - chapter/appendix scopes and per-kind counters
//! - [`AnchorSynthesizer`] - anchor names and caption field sequences
//! - [`Resolver`] - reference markers to `REF` fields, dangling markers
//! - [`DocumentWriter`] - WordprocessingML and HTML serialization
//! - [`validate`] - structural checks over finished packages
//! - [`Recompute`] - optional out-of-process field refresh
//!
//! A [`Compiler`] runs these as a [`StagePipeline`] over one
//! [`CompileContext`]; compilations share nothing and may run in parallel.
//!
//! # Example
//!
//! ```ignore
//! use docxref_core::{ProjectContext, render_project};
//!
//! let project = ProjectContext::discover("my-report")?;
//! let output = render_project(&project).await?;
//! println!("{}", output.report.to_text());
//! ```

pub mod anchor;
pub mod compile;
pub mod config;
pub mod document;
pub mod entity;
pub mod error;
pub mod field;
pub mod format;
pub mod numbering;
pub mod package;
pub mod project;
pub mod reader;
pub mod recompute;
pub mod registry;
pub mod render;
pub mod resolve;
pub mod stage;
pub mod validate;
pub mod writer;

// Re-export commonly used types
pub use anchor::AnchorSynthesizer;
pub use compile::{Artifact, CompileContext, Compilation, Compiler, compile};
pub use config::{AnchorPolicy, CONFIG_FILE, Labels, NumberingPolicy, ProjectConfig, RecomputeHostKind};
pub use document::{
    Block, DisplayMode, EntityBody, EntityDecl, EntityKind, Inline, IntermediateDocument,
    RefMarker, Section,
};
pub use entity::{Entity, EntityTable};
pub use error::{Result, SourceError, XrefError};
pub use field::{Caption, FieldExpr};
pub use format::{OutputFormat, parse_format_list};
pub use numbering::{EntityNumber, Numbering, ScopeId};
pub use package::Package;
pub use project::{LoadedSources, ProjectContext, SourceFile};
pub use recompute::{NoopRecompute, Recompute, RecomputeError, RecomputeRequest, RecomputeResponse};
pub use registry::Registry;
pub use render::{RenderOutput, render_project, render_with_adapter};
pub use resolve::{Resolution, ResolvedRef, Resolver};
pub use stage::{CompileStage, StagePipeline};
pub use validate::{CheckKind, Severity, ValidationIssue, ValidationReport};
pub use writer::{DocumentWriter, RenderedDocument, writer_for};
