//! Camera capture using the nokhwa crate

use image::RgbImage;
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;

use super::FrameSource;
use crate::error::SourceError;

/// Reads frames synchronously from a capture device
///
/// The device is opened lazily and reopened after it goes away, so an
/// unplugged camera shows up as `Unavailable` ticks rather than an error.
pub struct CameraSource {
    index: u32,
    camera: Option<Camera>,
}

impl CameraSource {
    pub fn new(index: u32) -> Self {
        Self { index, camera: None }
    }

    /// Highest resolution first, then 640x480, then whatever the device offers
    fn open(&self) -> Result<Camera, SourceError> {
        let index = CameraIndex::Index(self.index);
        let attempts = [
            RequestedFormatType::AbsoluteHighestResolution,
            RequestedFormatType::HighestResolution(Resolution::new(640, 480)),
            RequestedFormatType::None,
        ];

        let mut last_error = String::from("no format attempted");
        for format in attempts {
            let requested = format!("{:?}", format);
            match Camera::new(index.clone(), RequestedFormat::new::<RgbFormat>(format)) {
                Ok(mut camera) => {
                    camera
                        .open_stream()
                        .map_err(|e| SourceError::Unavailable(format!("{:?}", e)))?;
                    log::info!(
                        "Camera opened: {} ({}x{})",
                        camera.info().human_name(),
                        camera.resolution().width(),
                        camera.resolution().height()
                    );
                    return Ok(camera);
                }
                Err(e) => {
                    log::warn!("Failed to open camera {} with {}: {:?}", self.index, requested, e);
                    last_error = format!("{:?}", e);
                }
            }
        }
        Err(SourceError::Unavailable(last_error))
    }
}

impl FrameSource for CameraSource {
    fn next_frame(&mut self) -> Result<RgbImage, SourceError> {
        if self.camera.is_none() {
            self.camera = Some(self.open()?);
        }
        let Some(camera) = self.camera.as_mut() else {
            return Err(SourceError::Unavailable(format!("camera {}", self.index)));
        };

        let frame = match camera.frame() {
            Ok(frame) => frame,
            Err(e) => {
                log::warn!("Failed to capture frame: {:?}", e);
                self.camera = None;
                return Err(SourceError::ReadFailed(format!("{:?}", e)));
            }
        };

        let resolution = frame.resolution();
        let decoded = frame
            .decode_image::<RgbFormat>()
            .map_err(|e| SourceError::ReadFailed(format!("{:?}", e)))?;
        RgbImage::from_raw(resolution.width(), resolution.height(), decoded.into_raw())
            .ok_or_else(|| SourceError::ReadFailed("frame buffer size mismatch".to_string()))
    }

    fn describe(&self) -> String {
        format!("camera {}", self.index)
    }
}

impl Drop for CameraSource {
    fn drop(&mut self) {
        if let Some(camera) = self.camera.as_mut() {
            if let Err(e) = camera.stop_stream() {
                log::warn!("Failed to stop camera stream: {:?}", e);
            }
        }
    }
}
