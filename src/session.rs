use std::time::{Duration, Instant};

use anyhow::Result;

use crate::capture::FrameSource;
use crate::detection::FrameMaskPipeline;
use crate::error::SourceError;
use crate::models::{
    BlurParam, ChannelRange, ColorPreset, ColorSpace, ContourFilterParams, MorphologyParams,
    PipelineParams, RangeSelection,
};
use crate::presets::{BuiltinColor, PresetStore, SaveOutcome};
use crate::render::FrameSink;

pub const MANUAL_LABEL: &str = "Manual";
pub const PROCESSED_DELAY: Duration = Duration::from_millis(15);
pub const READ_FAILED_DELAY: Duration = Duration::from_millis(100);
pub const UNAVAILABLE_DELAY: Duration = Duration::from_millis(1000);

/// Tuning state the user edits between frames
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub space: ColorSpace,
    pub range: ChannelRange,
    /// What the single range currently represents, e.g. a built-in color name
    pub label: String,
    pub multi: bool,
    pub blur: BlurParam,
    pub morphology: MorphologyParams,
    pub contours: ContourFilterParams,
    pub presets: PresetStore,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            space: ColorSpace::Hsv,
            range: ColorSpace::Hsv.default_range(),
            label: MANUAL_LABEL.to_string(),
            multi: false,
            blur: BlurParam::default(),
            morphology: MorphologyParams::default(),
            contours: ContourFilterParams::default(),
            presets: PresetStore::new(),
        }
    }
}

impl Settings {
    /// Seed settings from a parameter set, e.g. one loaded from a file
    pub fn from_params(params: &PipelineParams) -> Self {
        let mut settings = Settings {
            space: params.space,
            range: params.space.default_range(),
            blur: params.blur,
            morphology: params.morphology,
            contours: params.contours,
            ..Settings::default()
        };
        match &params.ranges {
            RangeSelection::Single(range) => settings.range = *range,
            RangeSelection::Multi(presets) => {
                settings.multi = true;
                for preset in presets {
                    settings.presets.save(preset.clone());
                }
            }
        }
        settings
    }

    /// Switch color space; the range resets to that space's default
    pub fn set_space(&mut self, space: ColorSpace) {
        log::debug!("Color space {} -> {}", self.space, space);
        self.space = space;
        self.range = space.default_range();
        self.label = MANUAL_LABEL.to_string();
    }

    pub fn set_range(&mut self, range: ChannelRange) {
        self.range = range;
    }

    /// Load a built-in color: switches to HSV and, in multi mode, makes sure
    /// a wrap-around companion preset is saved
    pub fn apply_builtin(&mut self, color: BuiltinColor) {
        if self.space != ColorSpace::Hsv {
            self.set_space(ColorSpace::Hsv);
        }
        self.range = color.range();
        self.label = color.name().to_string();

        if self.multi {
            if let Some(companion) = color.companion() {
                if self.presets.insert_if_absent(companion.preset()) {
                    log::info!("Added '{}' to the saved colors", companion.name());
                }
            }
        }
    }

    /// Center the range on a picked RGB color in the current space
    pub fn pick_color(&mut self, rgb: [u8; 3]) {
        self.range = ChannelRange::around(rgb, self.space);
        self.label = format!("#{:02x}{:02x}{:02x}", rgb[0], rgb[1], rgb[2]);
    }

    /// Save the current single range under `name`
    pub fn save_current(&mut self, name: &str) -> SaveOutcome {
        self.presets.save(ColorPreset::new(name, self.space, self.range))
    }

    /// Load a saved preset into the single range, leaving multi mode
    pub fn load_preset(&mut self, name: &str) -> bool {
        let Some(preset) = self.presets.get(name).cloned() else {
            return false;
        };
        if self.space != preset.space {
            self.set_space(preset.space);
        }
        self.range = preset.range;
        self.label = format!("Loaded: {}", preset.name);
        self.multi = false;
        true
    }

    pub fn set_multi(&mut self, multi: bool) {
        self.multi = multi;
    }

    /// Snapshot for one pipeline run
    ///
    /// Multi mode with nothing saved falls back to the single range.
    pub fn snapshot(&self) -> PipelineParams {
        let ranges = if self.multi && !self.presets.is_empty() {
            RangeSelection::Multi(self.presets.to_vec())
        } else {
            RangeSelection::Single(self.range)
        };
        PipelineParams {
            space: self.space,
            ranges,
            blur: self.blur,
            morphology: self.morphology,
            contours: self.contours,
        }
    }

    /// Parenthesized part of the status line
    pub fn status_label(&self) -> String {
        if self.multi {
            format!("Multi: {}", self.presets.len())
        } else {
            self.label.clone()
        }
    }
}

/// Frames per second, averaged over windows of at least one second
#[derive(Debug, Clone)]
pub struct FpsCounter {
    window_start: Instant,
    frames: u32,
    fps: Option<f64>,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames: 0,
            fps: None,
        }
    }

    /// Count a frame; returns the new rate when a window closes
    pub fn record(&mut self, now: Instant) -> Option<f64> {
        self.frames += 1;
        let elapsed = now.saturating_duration_since(self.window_start).as_secs_f64();
        if elapsed < 1.0 {
            return None;
        }
        let fps = self.frames as f64 / elapsed;
        self.fps = Some(fps);
        self.window_start = now;
        self.frames = 0;
        Some(fps)
    }

    /// Rate of the last closed window
    pub fn fps(&self) -> Option<f64> {
        self.fps
    }
}

/// What happened during one tick
#[derive(Debug, Clone, PartialEq)]
pub enum TickOutcome {
    Processed { count: usize, status: String },
    ReadFailed(String),
    Unavailable(String),
    /// The frame was processed but the sink could not show it
    RenderFailed(String),
    Exhausted,
}

impl TickOutcome {
    /// Pause before the next tick, None when the run is over
    pub fn delay(&self) -> Option<Duration> {
        match self {
            TickOutcome::Processed { .. } | TickOutcome::RenderFailed(_) => Some(PROCESSED_DELAY),
            TickOutcome::ReadFailed(_) => Some(READ_FAILED_DELAY),
            TickOutcome::Unavailable(_) => Some(UNAVAILABLE_DELAY),
            TickOutcome::Exhausted => None,
        }
    }

    pub fn status(&self) -> String {
        match self {
            TickOutcome::Processed { status, .. } => status.clone(),
            TickOutcome::ReadFailed(reason) => format!("Error reading frame: {}", reason),
            TickOutcome::Unavailable(reason) => format!("Error: source unavailable: {}", reason),
            TickOutcome::RenderFailed(reason) => format!("Error rendering frame: {}", reason),
            TickOutcome::Exhausted => "Source exhausted.".to_string(),
        }
    }
}

/// Totals for a finished run
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub ticks: u64,
    pub frames: u64,
    pub detections: u64,
    pub last_status: String,
    pub fps: Option<f64>,
}

/// Capture, process and render loop
pub struct Session {
    pub settings: Settings,
    source: Box<dyn FrameSource>,
    sink: Box<dyn FrameSink>,
    pipeline: FrameMaskPipeline,
    fps: FpsCounter,
    status: String,
}

impl Session {
    pub fn new(settings: Settings, source: Box<dyn FrameSource>, sink: Box<dyn FrameSink>) -> Self {
        Self {
            settings,
            source,
            sink,
            pipeline: FrameMaskPipeline::new(),
            fps: FpsCounter::new(Instant::now()),
            status: String::new(),
        }
    }

    pub fn with_pipeline(mut self, pipeline: FrameMaskPipeline) -> Self {
        self.pipeline = pipeline;
        self
    }

    /// Latest status line
    pub fn status(&self) -> &str {
        &self.status
    }

    pub fn fps(&self) -> Option<f64> {
        self.fps.fps()
    }

    /// Read one frame, process it and hand it to the sink
    ///
    /// Source problems become outcomes; only sink errors are returned.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let params = self.settings.snapshot();

        let raw = match self.source.next_frame() {
            Ok(raw) => raw,
            Err(err) => {
                let outcome = match err {
                    SourceError::Unavailable(reason) => TickOutcome::Unavailable(reason),
                    SourceError::ReadFailed(reason) => TickOutcome::ReadFailed(reason),
                    SourceError::Exhausted => TickOutcome::Exhausted,
                };
                if outcome != TickOutcome::Exhausted {
                    log::warn!("{}", outcome.status());
                }
                self.status = outcome.status();
                return Ok(outcome);
            }
        };

        let output = self.pipeline.process(&raw, &params);
        let status = output.status_line(&self.settings.status_label());
        if let Err(err) = self.sink.render(&output, &status) {
            let outcome = TickOutcome::RenderFailed(format!("{:#}", err));
            log::warn!("{}", outcome.status());
            self.status = outcome.status();
            return Ok(outcome);
        }

        if let Some(fps) = self.fps.record(Instant::now()) {
            log::debug!("FPS: {:.1}", fps);
        }
        self.status = status.clone();
        Ok(TickOutcome::Processed {
            count: output.count,
            status,
        })
    }

    /// Tick until the source is exhausted or `max_ticks` is reached
    pub fn run(&mut self, max_ticks: Option<u64>) -> Result<RunSummary> {
        log::info!("Reading frames from {}", self.source.describe());
        let mut summary = RunSummary::default();

        while max_ticks.is_none_or(|max| summary.ticks < max) {
            let outcome = self.tick()?;
            summary.ticks += 1;
            if let TickOutcome::Processed { count, .. } = &outcome {
                summary.frames += 1;
                summary.detections += *count as u64;
            }

            let Some(delay) = outcome.delay() else {
                log::info!("{}", outcome.status());
                break;
            };
            if max_ticks.is_none_or(|max| summary.ticks < max) {
                std::thread::sleep(delay);
            }
        }

        summary.last_status = self.status.clone();
        summary.fps = self.fps.fps();
        Ok(summary)
    }
}
