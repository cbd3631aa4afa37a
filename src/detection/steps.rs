use anyhow::Result;
use image::DynamicImage;

use crate::detection::{annotate, contours, morphology, preprocessing, threshold};
use crate::models::{BlurParam, ColorSpace, ContourFilterParams, MorphologyParams, RangeSelection};
use crate::pipeline::{FrameData, PipelineContext, PipelineStep};

/// Convert the raw frame into the requested color space
///
/// On failure the frame is retried in HSV; if that also fails the
/// converted frame stays empty and later steps see nothing to threshold.
pub struct ConvertStep {
    pub space: ColorSpace,
}

impl PipelineStep for ConvertStep {
    fn process(&self, frame: &mut FrameData, _context: &PipelineContext) -> Result<()> {
        match preprocessing::convert_color_space(&frame.raw, self.space) {
            Ok(converted) => {
                frame.space = self.space;
                frame.converted = Some(converted);
            }
            Err(issue) => {
                log::warn!("{}", issue);
                frame.issues.push(issue);
                // HSV is reported even when the fallback fails too
                frame.space = ColorSpace::Hsv;
                frame.converted = None;
                if self.space != ColorSpace::Hsv {
                    match preprocessing::convert_color_space(&frame.raw, ColorSpace::Hsv) {
                        Ok(converted) => frame.converted = Some(converted),
                        Err(retry) => {
                            log::warn!("HSV fallback failed too: {}", retry);
                            frame.issues.push(retry);
                        }
                    }
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Color Conversion"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        frame.converted.clone().map(DynamicImage::ImageRgb8)
    }
}

/// Gaussian smoothing of the converted frame
pub struct BlurStep {
    pub blur: BlurParam,
}

impl PipelineStep for BlurStep {
    fn process(&self, frame: &mut FrameData, _context: &PipelineContext) -> Result<()> {
        let Some(kernel) = self.blur.effective_kernel() else {
            return Ok(());
        };
        if let Some(converted) = frame.converted.as_ref() {
            frame.converted = Some(preprocessing::apply_blur(converted, kernel));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Gaussian Blur"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        frame.converted.clone().map(DynamicImage::ImageRgb8)
    }
}

/// Build the binary mask from every range active in the frame's space
pub struct ThresholdStep {
    pub ranges: RangeSelection,
}

impl PipelineStep for ThresholdStep {
    fn process(&self, frame: &mut FrameData, context: &PipelineContext) -> Result<()> {
        let Some(converted) = frame.converted.as_ref() else {
            frame.clear_mask();
            return Ok(());
        };

        let active = self.ranges.active(frame.space);
        if context.verbose {
            log::info!("Thresholding {} range(s) in {}", active.len(), frame.space);
        }
        frame.mask = threshold::combined_mask(converted, &active, frame.space);
        Ok(())
    }

    fn name(&self) -> &str {
        "Range Threshold"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        Some(DynamicImage::ImageLuma8(frame.mask.clone()))
    }
}

/// Erode then dilate the mask
pub struct MorphologyStep {
    pub params: MorphologyParams,
}

impl PipelineStep for MorphologyStep {
    fn process(&self, frame: &mut FrameData, _context: &PipelineContext) -> Result<()> {
        frame.mask = morphology::clean_mask(&frame.mask, &self.params);
        Ok(())
    }

    fn name(&self) -> &str {
        "Morphology"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        Some(DynamicImage::ImageLuma8(frame.mask.clone()))
    }
}

/// Extract external contours above the area threshold
pub struct ContourStep {
    pub min_area: f64,
}

impl PipelineStep for ContourStep {
    fn process(&self, frame: &mut FrameData, context: &PipelineContext) -> Result<()> {
        frame.detections = contours::detect(&frame.mask, self.min_area);
        if context.verbose {
            log::info!("Found {} contour(s) above area {}", frame.detections.len(), self.min_area);
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "Contour Detection"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        let mut canvas = frame.raw.as_ref().clone();
        for detection in &frame.detections {
            annotate::draw_contour(&mut canvas, &detection.points, annotate::CONTOUR_COLOR);
        }
        Some(DynamicImage::ImageRgb8(canvas))
    }
}

/// Draw overlays on the raw frame and composite the masked result
pub struct AnnotateStep {
    pub params: ContourFilterParams,
}

impl PipelineStep for AnnotateStep {
    fn process(&self, frame: &mut FrameData, _context: &PipelineContext) -> Result<()> {
        let mut canvas = frame.raw.as_ref().clone();
        let issues = annotate::annotate(&mut canvas, &frame.detections, &self.params);
        frame.annotated = canvas;
        frame.issues.extend(issues);
        frame.masked = annotate::apply_mask(&frame.raw, &frame.mask);
        Ok(())
    }

    fn name(&self) -> &str {
        "Annotation"
    }

    fn debug_view(&self, frame: &FrameData) -> Option<DynamicImage> {
        Some(DynamicImage::ImageRgb8(frame.annotated.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineIssue;
    use crate::models::ChannelRange;
    use image::{Rgb, RgbImage};

    #[test]
    fn conversion_records_space_actually_used() {
        let mut frame = FrameData::from_image(RgbImage::from_pixel(2, 2, Rgb([255, 0, 0])));
        ConvertStep { space: ColorSpace::Bgr }
            .process(&mut frame, &PipelineContext::default())
            .unwrap();
        assert_eq!(frame.space, ColorSpace::Bgr);
        assert_eq!(frame.converted.unwrap().get_pixel(0, 0).0, [0, 0, 255]);
    }

    #[test]
    fn empty_frame_leaves_nothing_converted() {
        let mut frame = FrameData::from_image(RgbImage::new(0, 0));
        ConvertStep { space: ColorSpace::Lab }
            .process(&mut frame, &PipelineContext::default())
            .unwrap();
        assert!(frame.converted.is_none());
        assert_eq!(frame.space, ColorSpace::Hsv, "fallback space is reported");
        assert_eq!(frame.issues.len(), 2);
        assert!(matches!(frame.issues[0], PipelineIssue::ConversionFailure { space: ColorSpace::Lab, .. }));
        assert!(matches!(frame.issues[1], PipelineIssue::ConversionFailure { space: ColorSpace::Hsv, .. }));
    }

    #[test]
    fn threshold_without_converted_frame_gives_empty_mask() {
        let mut frame = FrameData::from_image(RgbImage::from_pixel(3, 3, Rgb([9, 9, 9])));
        frame.mask.fill(255);
        ThresholdStep { ranges: RangeSelection::Single(ChannelRange::new([0; 3], [255; 3])) }
            .process(&mut frame, &PipelineContext::default())
            .unwrap();
        assert!(frame.mask.pixels().all(|p| p[0] == 0));
    }

    #[test]
    fn annotation_composites_masked_frame() {
        let mut frame = FrameData::from_image(RgbImage::from_pixel(2, 1, Rgb([7, 8, 9])));
        frame.mask.put_pixel(0, 0, image::Luma([255]));
        AnnotateStep { params: ContourFilterParams::default() }
            .process(&mut frame, &PipelineContext::default())
            .unwrap();
        assert_eq!(frame.masked.get_pixel(0, 0).0, [7, 8, 9]);
        assert_eq!(frame.masked.get_pixel(1, 0).0, [0, 0, 0]);
        assert_eq!(frame.annotated.get_pixel(1, 0).0, [7, 8, 9]);
    }
}
