use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::imageops::{self, FilterType};
use image::{DynamicImage, ImageBuffer, Pixel};

use crate::pipeline::FrameOutput;

pub const DEFAULT_DISPLAY_WIDTH: u32 = 480;

/// Where processed frames go
pub trait FrameSink {
    fn render(&mut self, output: &FrameOutput, status: &str) -> Result<()>;
}

/// Scale to `width` keeping the aspect ratio; frames already that wide are copied
pub fn fit_to_width<P>(img: &ImageBuffer<P, Vec<P::Subpixel>>, width: u32) -> ImageBuffer<P, Vec<P::Subpixel>>
where
    P: Pixel + 'static,
    P::Subpixel: 'static,
{
    let (w, h) = img.dimensions();
    if w == 0 || h == 0 || w == width {
        return img.clone();
    }
    let height = ((h as f64 * width as f64 / w as f64).round() as u32).max(1);
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// Writes the three views of each frame as PNG files
///
/// Without history the files are overwritten every tick, which keeps the
/// directory a live view. With history each tick gets an `NNNNN_` prefix.
pub struct DirectorySink {
    dir: PathBuf,
    display_width: Option<u32>,
    keep_history: bool,
    frame_index: u64,
}

impl DirectorySink {
    pub fn new(dir: PathBuf) -> Result<Self> {
        std::fs::create_dir_all(&dir).with_context(|| format!("Failed to create {}", dir.display()))?;
        Ok(Self {
            dir,
            display_width: None,
            keep_history: false,
            frame_index: 0,
        })
    }

    pub fn with_display_width(mut self, width: Option<u32>) -> Self {
        self.display_width = width.filter(|w| *w > 0);
        self
    }

    pub fn with_history(mut self, keep_history: bool) -> Self {
        self.keep_history = keep_history;
        self
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn file_name(&self, view: &str) -> String {
        if self.keep_history {
            format!("{:05}_{}.png", self.frame_index, view)
        } else {
            format!("{}.png", view)
        }
    }

    fn save(&self, view: &str, image: DynamicImage) -> Result<()> {
        let path = self.dir.join(self.file_name(view));
        image
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save {}: {}", path.display(), e))
    }
}

impl FrameSink for DirectorySink {
    fn render(&mut self, output: &FrameOutput, status: &str) -> Result<()> {
        let (annotated, mask, masked) = match self.display_width {
            Some(width) => (
                fit_to_width(&output.annotated, width),
                fit_to_width(&output.mask, width),
                fit_to_width(&output.masked, width),
            ),
            None => (output.annotated.clone(), output.mask.clone(), output.masked.clone()),
        };

        self.save("original", DynamicImage::ImageRgb8(annotated))?;
        self.save("mask", DynamicImage::ImageLuma8(mask))?;
        self.save("result", DynamicImage::ImageRgb8(masked))?;
        log::debug!("Frame {} written to {}: {}", self.frame_index, self.dir.display(), status);

        self.frame_index += 1;
        Ok(())
    }
}

/// Reports the status line through the logger only
#[derive(Debug, Default)]
pub struct LogSink;

impl FrameSink for LogSink {
    fn render(&mut self, _output: &FrameOutput, status: &str) -> Result<()> {
        log::info!("{}", status);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::process_frame;
    use crate::models::PipelineParams;
    use image::{GrayImage, RgbImage};
    use tempfile::TempDir;

    #[test]
    fn fit_to_width_keeps_aspect_ratio() {
        let img = GrayImage::new(960, 540);
        let scaled = fit_to_width(&img, 480);
        assert_eq!(scaled.dimensions(), (480, 270));

        let same = fit_to_width(&RgbImage::new(480, 10), 480);
        assert_eq!(same.dimensions(), (480, 10));
    }

    #[test]
    fn directory_sink_overwrites_without_history() {
        let tmp = TempDir::new().unwrap();
        let output = process_frame(&RgbImage::new(20, 10), &PipelineParams::default());

        let mut sink = DirectorySink::new(tmp.path().to_path_buf()).unwrap();
        assert_eq!(sink.dir(), tmp.path());
        sink.render(&output, "0 object(s).").unwrap();
        sink.render(&output, "0 object(s).").unwrap();

        let mut names: Vec<String> = std::fs::read_dir(tmp.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        assert_eq!(names, vec!["mask.png", "original.png", "result.png"]);
    }

    #[test]
    fn directory_sink_numbers_frames_with_history_and_resizes() {
        let tmp = TempDir::new().unwrap();
        let output = process_frame(&RgbImage::new(40, 20), &PipelineParams::default());

        let mut sink = DirectorySink::new(tmp.path().to_path_buf())
            .unwrap()
            .with_history(true)
            .with_display_width(Some(20));
        sink.render(&output, "").unwrap();
        sink.render(&output, "").unwrap();

        assert!(tmp.path().join("00000_original.png").exists());
        assert!(tmp.path().join("00001_result.png").exists());
        let mask = image::open(tmp.path().join("00001_mask.png")).unwrap();
        assert_eq!((mask.width(), mask.height()), (20, 10));
    }
}
