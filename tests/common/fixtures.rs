use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use colorfilter::capture::FrameSource;
use colorfilter::render::FrameSink;
use colorfilter::{
    BlurParam, ChannelRange, ColorSpace, ContourFilterParams, FrameOutput, MorphologyParams,
    PipelineParams, RangeSelection, SourceError,
};
use image::{Rgb, RgbImage};
use tempfile::NamedTempFile;

pub const BLACK: [u8; 3] = [0, 0, 0];
pub const WHITE: [u8; 3] = [255, 255, 255];
pub const GRAY: [u8; 3] = [128, 128, 128];

/// Frame filled with one color
pub fn uniform_frame(width: u32, height: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(width, height, Rgb(color))
}

/// Paints an axis-aligned rectangle; `(x, y)` is the top-left pixel
pub fn paint_rect(img: &mut RgbImage, x: u32, y: u32, width: u32, height: u32, color: [u8; 3]) {
    for py in y..y + height {
        for px in x..x + width {
            img.put_pixel(px, py, Rgb(color));
        }
    }
}

/// `background` frame with one filled square
pub fn frame_with_square(size: u32, background: [u8; 3], x: u32, y: u32, side: u32, color: [u8; 3]) -> RgbImage {
    let mut img = uniform_frame(size, size, background);
    paint_rect(&mut img, x, y, side, side, color);
    img
}

/// Writes a frame to a temporary PNG file.
/// The file will be automatically cleaned up when dropped.
pub fn save_frame(img: &RgbImage) -> NamedTempFile {
    let file = tempfile::Builder::new()
        .suffix(".png")
        .tempfile()
        .expect("Failed to create temp image file");
    img.save_with_format(file.path(), image::ImageFormat::Png)
        .expect("Failed to save test image");
    file
}

/// Parameters with every smoothing stage disabled, so geometry is exact
pub fn exact_params(space: ColorSpace, range: ChannelRange, min_area: f64) -> PipelineParams {
    PipelineParams {
        space,
        ranges: RangeSelection::Single(range),
        blur: BlurParam { kernel: 0 },
        morphology: MorphologyParams { erosion: 0, dilation: 0 },
        contours: ContourFilterParams {
            min_area,
            ..ContourFilterParams::default()
        },
    }
}

/// Range accepting near-white RGB pixels
pub fn white_rgb_range() -> ChannelRange {
    ChannelRange::new([200, 200, 200], [255, 255, 255])
}

/// Frame source that replays a fixed script, then reports exhaustion
pub struct ScriptedSource {
    script: VecDeque<Result<RgbImage, SourceError>>,
}

impl ScriptedSource {
    pub fn new(script: Vec<Result<RgbImage, SourceError>>) -> Self {
        Self {
            script: script.into(),
        }
    }
}

impl FrameSource for ScriptedSource {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
        self.script.pop_front().unwrap_or(Err(SourceError::Exhausted))
    }

    fn describe(&self) -> String {
        "scripted frames".to_string()
    }
}

/// What a [`RecordingSink`] saw for one frame
#[derive(Debug, Clone)]
pub struct RenderedFrame {
    pub count: usize,
    pub status: String,
    pub space: ColorSpace,
}

/// Sink that keeps the status of every rendered frame
#[derive(Clone, Default)]
pub struct RecordingSink {
    pub frames: Arc<Mutex<Vec<RenderedFrame>>>,
}

impl RecordingSink {
    pub fn rendered(&self) -> Vec<RenderedFrame> {
        self.frames.lock().unwrap().clone()
    }
}

impl FrameSink for RecordingSink {
    fn render(&mut self, output: &FrameOutput, status: &str) -> anyhow::Result<()> {
        self.frames.lock().unwrap().push(RenderedFrame {
            count: output.count,
            status: status.to_string(),
            space: output.space,
        });
        Ok(())
    }
}

/// Sink whose first `failures` renders fail, e.g. a full disk
pub struct FailingSink {
    pub failures: usize,
    pub inner: RecordingSink,
}

impl FrameSink for FailingSink {
    fn render(&mut self, output: &FrameOutput, status: &str) -> anyhow::Result<()> {
        if self.failures > 0 {
            self.failures -= 1;
            anyhow::bail!("disk full");
        }
        self.inner.render(output, status)
    }
}
