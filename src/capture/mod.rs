//! Frame sources
//!
//! Everything the session can pull frames from: a still image repeated
//! forever, a directory of images played in name order, or (with the
//! `camera` feature) a capture device.

#[cfg(feature = "camera")]
pub mod camera;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use image::{ImageReader, RgbImage};

use crate::error::SourceError;

#[cfg(feature = "camera")]
pub use camera::CameraSource;

const IMAGE_EXTENSIONS: [&str; 7] = ["png", "jpg", "jpeg", "bmp", "tif", "tiff", "webp"];

/// Something that yields RGB frames, one per tick
pub trait FrameSource {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError>;

    /// Short description for logs
    fn describe(&self) -> String;
}

/// Decode an image file into RGB
pub fn load_rgb(path: &Path) -> Result<RgbImage> {
    let img = ImageReader::open(path)
        .with_context(|| format!("Failed to open {}", path.display()))?
        .with_guessed_format()?
        .decode()
        .map_err(|e| anyhow::anyhow!("Failed to decode {}: {}", path.display(), e))?;
    Ok(img.to_rgb8())
}

/// Repeats one decoded image
pub struct StillImageSource {
    frame: RgbImage,
    label: String,
}

impl StillImageSource {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            frame: load_rgb(path)?,
            label: path.display().to_string(),
        })
    }

    pub fn from_image(frame: RgbImage) -> Self {
        Self {
            frame,
            label: "in-memory image".to_string(),
        }
    }
}

impl FrameSource for StillImageSource {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
        Ok(self.frame.clone())
    }

    fn describe(&self) -> String {
        self.label.clone()
    }
}

/// Plays the images of a directory in file-name order
pub struct ImageSequenceSource {
    dir: PathBuf,
    files: Vec<PathBuf>,
    position: usize,
    looping: bool,
}

impl ImageSequenceSource {
    /// List the images in `dir`; fails if there are none
    pub fn open(dir: &Path, looping: bool) -> Result<Self> {
        let mut files = Vec::new();
        for entry in std::fs::read_dir(dir).with_context(|| format!("Failed to read {}", dir.display()))? {
            let path = entry?.path();
            if path.is_file() && has_image_extension(&path) {
                files.push(path);
            }
        }
        files.sort();

        if files.is_empty() {
            anyhow::bail!("No images found in {}", dir.display());
        }
        log::debug!("Found {} frame(s) in {}", files.len(), dir.display());

        Ok(Self {
            dir: dir.to_path_buf(),
            files,
            position: 0,
            looping,
        })
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }
}

impl FrameSource for ImageSequenceSource {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
        if self.position >= self.files.len() {
            if !self.looping {
                return Err(SourceError::Exhausted);
            }
            self.position = 0;
        }

        let path = &self.files[self.position];
        self.position += 1;
        load_rgb(path).map_err(|e| SourceError::ReadFailed(format!("{:#}", e)))
    }

    fn describe(&self) -> String {
        format!("{} ({} frames)", self.dir.display(), self.files.len())
    }
}

fn has_image_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| IMAGE_EXTENSIONS.iter().any(|known| ext.eq_ignore_ascii_case(known)))
        .unwrap_or(false)
}
