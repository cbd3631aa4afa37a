use image::{DynamicImage, GrayImage, RgbImage};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use anyhow::Result;

use crate::error::PipelineIssue;
use crate::models::{ColorSpace, Detection};

/// Bounding box in the original image
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// Data that flows through the pipeline
/// Each step reads what earlier steps produced and fills in its own part
pub struct FrameData {
    /// The frame as captured, in native RGB order (shared via Arc)
    pub raw: Arc<RgbImage>,

    /// Space the converted frame is expressed in (RGB until conversion runs)
    pub space: ColorSpace,

    /// Frame in `space`; None when conversion failed outright
    pub converted: Option<RgbImage>,

    /// Binary foreground mask (0 or 255)
    pub mask: GrayImage,

    /// Accepted contours
    pub detections: Vec<Detection>,

    /// Copy of the raw frame with overlays drawn on it
    pub annotated: RgbImage,

    /// Raw frame with everything outside the mask zeroed
    pub masked: RgbImage,

    /// Recoverable problems met along the way
    pub issues: Vec<PipelineIssue>,
}

impl FrameData {
    /// Create FrameData for a freshly captured frame
    pub fn from_image(raw: RgbImage) -> Self {
        let (width, height) = raw.dimensions();
        Self {
            annotated: raw.clone(),
            raw: Arc::new(raw),
            space: ColorSpace::Rgb,
            converted: None,
            mask: GrayImage::new(width, height),
            detections: Vec::new(),
            masked: RgbImage::new(width, height),
            issues: Vec::new(),
        }
    }

    /// Reset the mask and everything derived from it
    pub fn clear_mask(&mut self) {
        let (width, height) = self.raw.dimensions();
        self.mask = GrayImage::new(width, height);
        self.detections.clear();
        self.masked = RgbImage::new(width, height);
    }

    pub fn into_output(self) -> FrameOutput {
        FrameOutput {
            count: self.detections.len(),
            mask: self.mask,
            annotated: self.annotated,
            masked: self.masked,
            detections: self.detections,
            space: self.space,
            issues: self.issues,
        }
    }
}

/// What one pipeline run hands back to the caller
#[derive(Debug, Clone)]
pub struct FrameOutput {
    /// Single-channel mask, same size as the input
    pub mask: GrayImage,
    /// Input frame (RGB) with contours, boxes and centers drawn
    pub annotated: RgbImage,
    /// Input frame (RGB) restricted to the mask
    pub masked: RgbImage,
    /// Number of accepted detections
    pub count: usize,
    pub detections: Vec<Detection>,
    /// Space the thresholds were actually applied in
    pub space: ColorSpace,
    pub issues: Vec<PipelineIssue>,
}

impl FrameOutput {
    /// Status text: reportable issues first, then the detection count
    pub fn status_line(&self, label: &str) -> String {
        let mut parts: Vec<String> = self
            .issues
            .iter()
            .filter(|issue| issue.is_reportable())
            .map(ToString::to_string)
            .collect();
        parts.push(format!("{} object(s). ({})", self.count, label));
        parts.join(" | ")
    }

    pub fn has_issues(&self) -> bool {
        self.issues.iter().any(PipelineIssue::is_reportable)
    }
}

/// Debug configuration for pipeline execution
#[derive(Clone, Debug)]
pub struct DebugConfig {
    /// Root directory for debug outputs
    pub output_dir: PathBuf,
    /// Whether debug mode is enabled
    pub enabled: bool,
}

impl DebugConfig {
    /// Prepare a debug directory
    /// The directory must be empty or non-existent
    pub fn prepare(output_dir: PathBuf) -> Result<Self> {
        if output_dir.exists() {
            let entries = std::fs::read_dir(&output_dir)?;
            if entries.count() > 0 {
                return Err(anyhow::anyhow!(
                    "Debug directory is not empty: {}",
                    output_dir.display()
                ));
            }
        } else {
            std::fs::create_dir_all(&output_dir)?;
        }

        Ok(Self {
            output_dir,
            enabled: true,
        })
    }

    fn save(&self, step_dir_name: &str, image: &DynamicImage) -> Result<PathBuf> {
        let step_dir = self.output_dir.join(step_dir_name);
        std::fs::create_dir_all(&step_dir)?;
        let output_path = step_dir.join("01.png");
        image
            .save(&output_path)
            .map_err(|e| anyhow::anyhow!("Failed to save debug image: {}", e))?;
        Ok(output_path)
    }
}

/// Context available to all pipeline steps
#[derive(Clone, Debug, Default)]
pub struct PipelineContext {
    pub verbose: bool,
    pub debug: Option<DebugConfig>,
}

impl PipelineContext {
    fn active_debug(&self) -> Option<&DebugConfig> {
        self.debug.as_ref().filter(|debug| debug.enabled)
    }
}

/// Trait that all pipeline steps must implement
pub trait PipelineStep: Send + Sync {
    /// Transform the frame in place
    fn process(&self, frame: &mut FrameData, context: &PipelineContext) -> Result<()>;

    /// Human-readable name for this step (used in logs and debug directories)
    fn name(&self) -> &str;

    /// Image written to the debug directory after this step ran
    fn debug_view(&self, _frame: &FrameData) -> Option<DynamicImage> {
        None
    }
}

/// Composable pipeline builder
pub struct Pipeline {
    steps: Vec<Arc<dyn PipelineStep>>,
    context: PipelineContext,
}

impl Pipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            steps: Vec::new(),
            context: PipelineContext::default(),
        }
    }

    /// Enable verbose output
    pub fn with_verbose(mut self, verbose: bool) -> Self {
        self.context.verbose = verbose;
        self
    }

    /// Enable debug mode with output directory
    /// The directory must be empty or non-existent
    pub fn with_debug(mut self, output_dir: PathBuf) -> Result<Self> {
        self.context.debug = Some(DebugConfig::prepare(output_dir)?);
        Ok(self)
    }

    /// Replace the whole context, e.g. one prepared once and reused every tick
    pub fn with_context(mut self, context: PipelineContext) -> Self {
        self.context = context;
        self
    }

    /// Add a processing step to the pipeline
    pub fn add_step(mut self, step: Arc<dyn PipelineStep>) -> Self {
        self.steps.push(step);
        self
    }

    /// Helper method to add a step from a Box (for convenience)
    pub fn add_step_boxed(mut self, step: Box<dyn PipelineStep>) -> Self {
        self.steps.push(Arc::from(step));
        self
    }

    /// Names of the steps in execution order
    pub fn step_names(&self) -> Vec<&str> {
        self.steps.iter().map(|step| step.name()).collect()
    }

    /// Run every step on one frame
    /// A failing step is recorded and the mask cleared; the run always completes
    pub fn run(&self, input: &RgbImage) -> FrameOutput {
        self.run_partial(input, self.steps.len()).into_output()
    }

    /// Run the pipeline but stop after `num_steps` steps (useful for debugging)
    pub fn run_partial(&self, input: &RgbImage, num_steps: usize) -> FrameData {
        let mut frame = FrameData::from_image(input.clone());

        if let Some(debug_config) = self.context.active_debug() {
            let raw = DynamicImage::ImageRgb8(input.clone());
            self.save_debug(debug_config, "00_input", &raw);
        }

        for (step_idx, step) in self.steps.iter().take(num_steps).enumerate() {
            let step_name = step.name();
            let started = Instant::now();

            if let Err(err) = step.process(&mut frame, &self.context) {
                log::warn!("Step '{}' failed: {:#}", step_name, err);
                frame.issues.push(PipelineIssue::StageFailed {
                    stage: step_name.to_string(),
                    message: err.to_string(),
                });
                frame.clear_mask();
            }

            if self.context.verbose {
                log::info!("Step {}: {} took {:.2?}", step_idx + 1, step_name, started.elapsed());
            } else {
                log::debug!("Step {}: {} took {:.2?}", step_idx + 1, step_name, started.elapsed());
            }

            if let Some(debug_config) = self.context.active_debug() {
                if let Some(view) = step.debug_view(&frame) {
                    self.save_debug(debug_config, &step_dir_name(step_idx, step_name), &view);
                }
            }
        }

        frame
    }

    fn save_debug(&self, debug_config: &DebugConfig, dir_name: &str, image: &DynamicImage) {
        match debug_config.save(dir_name, image) {
            Ok(path) => log::debug!("Debug: saved {}", display_relative(&path, &debug_config.output_dir)),
            Err(err) => log::warn!("Debug output for '{}' skipped: {:#}", dir_name, err),
        }
    }
}

impl Default for Pipeline {
    fn default() -> Self {
        Self::new()
    }
}

fn step_dir_name(step_idx: usize, step_name: &str) -> String {
    format!("{:02}_{}", step_idx + 1, step_name.to_lowercase().replace(' ', "_"))
}

fn display_relative(path: &Path, root: &Path) -> String {
    path.strip_prefix(root).unwrap_or(path).display().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingStep;

    impl PipelineStep for FailingStep {
        fn process(&self, frame: &mut FrameData, _context: &PipelineContext) -> Result<()> {
            frame.mask.fill(255);
            anyhow::bail!("boom")
        }

        fn name(&self) -> &str {
            "Failing Step"
        }
    }

    #[test]
    fn failing_step_is_recorded_and_mask_cleared() {
        let pipeline = Pipeline::new().add_step_boxed(Box::new(FailingStep));
        let output = pipeline.run(&RgbImage::new(4, 3));

        assert_eq!(output.count, 0);
        assert!(output.mask.pixels().all(|p| p[0] == 0));
        assert_eq!(
            output.issues,
            vec![PipelineIssue::StageFailed {
                stage: "Failing Step".to_string(),
                message: "boom".to_string()
            }]
        );
        assert!(output.status_line("Manual").starts_with("Failing Step failed: boom | 0 object(s)."));
    }

    #[test]
    fn step_dir_names_are_numbered_snake_case() {
        assert_eq!(step_dir_name(0, "Color Conversion"), "01_color_conversion");
        assert_eq!(step_dir_name(11, "Blur"), "12_blur");
    }
}
