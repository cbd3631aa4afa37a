pub mod annotate;
pub mod contours;
pub mod morphology;
pub mod preprocessing;
pub mod steps;
pub mod threshold;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use image::RgbImage;

use crate::models::PipelineParams;
use crate::pipeline::{DebugConfig, FrameOutput, Pipeline, PipelineContext};

/// Color-range detection orchestrator
///
/// Holds the context that survives between frames (verbosity, debug
/// output) and builds a fresh step list from each parameter snapshot.
pub struct FrameMaskPipeline {
    context: PipelineContext,
}

impl FrameMaskPipeline {
    pub fn new() -> Self {
        Self {
            context: PipelineContext::default(),
        }
    }

    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Save every step's view under `output_dir`
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.context.debug = Some(DebugConfig::prepare(output_dir)?);
        Ok(self)
    }

    /// Run the six stages on one frame with the given snapshot
    pub fn process(&self, raw: &RgbImage, params: &PipelineParams) -> FrameOutput {
        build_standard_pipeline(params)
            .with_context(self.context.clone())
            .run(raw)
    }
}

impl Default for FrameMaskPipeline {
    fn default() -> Self {
        Self::new()
    }
}

/// Run the standard pipeline once, without debug output
pub fn process_frame(raw: &RgbImage, params: &PipelineParams) -> FrameOutput {
    build_standard_pipeline(params).run(raw)
}

/// Build the standard detection pipeline using the composable pipeline system
pub fn build_standard_pipeline(params: &PipelineParams) -> Pipeline {
    use crate::detection::steps::*;

    Pipeline::new()
        .add_step(Arc::new(ConvertStep { space: params.space }))
        .add_step(Arc::new(BlurStep { blur: params.blur }))
        .add_step(Arc::new(ThresholdStep {
            ranges: params.ranges.clone(),
        }))
        .add_step(Arc::new(MorphologyStep {
            params: params.morphology,
        }))
        .add_step(Arc::new(ContourStep {
            min_area: params.contours.min_area,
        }))
        .add_step(Arc::new(AnnotateStep {
            params: params.contours,
        }))
}
