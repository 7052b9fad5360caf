/*
 * stage.rs
 * Copyright (c) 2025 Posit, PBC
 *
 * Compile stage pipeline infrastructure.
 */

//! Compile stage pipeline infrastructure.
//!
//! - [`CompileStage`] - the trait implemented by every compile step
//! - [`StagePipeline`] - ordered collection of stages to execute
//!
//! Stages run in insertion order against one [`CompileContext`], which owns
//! everything a compilation produces. Stages are synchronous: the only step
//! that may block on the outside world (recompute) runs after the pipeline.
//!
//! ```ignore
//! use docxref_core::stage::{CompileStage, StagePipeline};
//!
//! struct CountEntities;
//!
//! impl CompileStage for CountEntities {
//!     fn name(&self) -> &str { "count-entities" }
//!
//!     fn run(&self, ctx: &mut CompileContext) -> Result<()> {
//!         tracing::info!(entities = ctx.entities.len());
//!         Ok(())
//!     }
//! }
//!
//! let mut pipeline = StagePipeline::standard();
//! pipeline.push(Box::new(CountEntities));
//! pipeline.execute(&mut ctx)?;
//! ```

use crate::compile::{
    AnchorStage, AssembleStage, CompileContext, PackageStage, RegisterStage, ResolveStage,
    ValidateStage,
};
use crate::error::Result;

/// One step of a compilation.
///
/// Stages hold no mutable state between executions; everything they produce
/// goes into the [`CompileContext`]. They must be `Send + Sync` so
/// independent compilations can run on separate threads.
pub trait CompileStage: Send + Sync {
    /// Name used for logging.
    fn name(&self) -> &str;

    /// # Errors
    ///
    /// A stage error aborts the compilation; no later stage runs.
    fn run(&self, ctx: &mut CompileContext) -> Result<()>;
}

/// Stages in execution order.
pub struct StagePipeline {
    stages: Vec<Box<dyn CompileStage>>,
}

impl StagePipeline {
    pub fn new() -> Self {
        Self { stages: Vec::new() }
    }

    /// Register, anchor, resolve, assemble, package, validate.
    pub fn standard() -> Self {
        let mut pipeline = Self::new();
        pipeline.extend([
            Box::new(RegisterStage) as Box<dyn CompileStage>,
            Box::new(AnchorStage),
            Box::new(ResolveStage),
            Box::new(AssembleStage),
            Box::new(PackageStage),
            Box::new(ValidateStage),
        ]);
        pipeline
    }

    pub fn push(&mut self, stage: Box<dyn CompileStage>) {
        self.stages.push(stage);
    }

    pub fn extend(&mut self, stages: impl IntoIterator<Item = Box<dyn CompileStage>>) {
        self.stages.extend(stages);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Run every stage in order. Stops at the first error.
    pub fn execute(&self, ctx: &mut CompileContext) -> Result<()> {
        for stage in &self.stages {
            tracing::debug!(stage = stage.name(), "Running stage");
            stage.run(ctx)?;
        }
        Ok(())
    }

    pub fn stage_names(&self) -> Vec<&str> {
        self.stages.iter().map(|s| s.name()).collect()
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::error::XrefError;
    use std::sync::{Arc, Mutex};

    struct Recording {
        name: &'static str,
        log: Arc<Mutex<Vec<&'static str>>>,
        fail: bool,
    }

    impl CompileStage for Recording {
        fn name(&self) -> &str {
            self.name
        }

        fn run(&self, _ctx: &mut CompileContext) -> Result<()> {
            self.log.lock().unwrap().push(self.name);
            if self.fail {
                return Err(XrefError::other(format!("{} failed", self.name)));
            }
            Ok(())
        }
    }

    fn recording(name: &'static str, log: &Arc<Mutex<Vec<&'static str>>>, fail: bool) -> Box<dyn CompileStage> {
        Box::new(Recording {
            name,
            log: Arc::clone(log),
            fail,
        })
    }

    #[test]
    fn test_standard_order() {
        assert_eq!(
            StagePipeline::standard().stage_names(),
            ["register", "anchor", "resolve", "assemble", "package", "validate"]
        );
    }

    #[test]
    fn test_stages_run_in_order_and_stop_on_error() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut pipeline = StagePipeline::new();
        pipeline.push(recording("first", &log, false));
        pipeline.push(recording("second", &log, true));
        pipeline.push(recording("third", &log, false));
        assert_eq!(pipeline.len(), 3);

        let mut ctx = CompileContext::new(ProjectConfig::default(), Vec::new());
        let err = pipeline.execute(&mut ctx).unwrap_err();
        assert_eq!(err.to_string(), "second failed");
        assert_eq!(*log.lock().unwrap(), ["first", "second"]);
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = StagePipeline::default();
        assert!(pipeline.is_empty());
        let mut ctx = CompileContext::new(ProjectConfig::default(), Vec::new());
        pipeline.execute(&mut ctx).unwrap();
    }
}
