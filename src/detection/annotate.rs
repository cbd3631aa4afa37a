use image::{GrayImage, Rgb, RgbImage};
use imageproc::drawing::{draw_filled_circle_mut, draw_hollow_rect_mut, draw_line_segment_mut};
use imageproc::point::Point;
use imageproc::rect::Rect;

use crate::error::PipelineIssue;
use crate::models::{ContourFilterParams, Detection};
use crate::pipeline::BoundingBox;

pub const CONTOUR_COLOR: Rgb<u8> = Rgb([0, 255, 0]);
pub const BOX_COLOR: Rgb<u8> = Rgb([0, 0, 255]);
pub const CENTER_COLOR: Rgb<u8> = Rgb([255, 0, 0]);
pub const CENTER_RADIUS: i32 = 5;
const STROKE: i32 = 2;

/// Closed polyline through the contour points
pub fn draw_contour(img: &mut RgbImage, points: &[Point<i32>], color: Rgb<u8>) {
    if points.is_empty() {
        return;
    }
    for i in 0..points.len() {
        let p1 = points[i];
        let p2 = points[(i + 1) % points.len()];
        for offset in 0..STROKE {
            draw_line_segment_mut(
                img,
                ((p1.x + offset) as f32, p1.y as f32),
                ((p2.x + offset) as f32, p2.y as f32),
                color,
            );
            draw_line_segment_mut(
                img,
                (p1.x as f32, (p1.y + offset) as f32),
                (p2.x as f32, (p2.y + offset) as f32),
                color,
            );
        }
    }
}

/// Rectangle from `(x, y)` to `(x + w, y + h)`, two pixels thick
pub fn draw_box(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>) {
    for inset in 0..STROKE as u32 {
        let (w, h) = (bbox.width + 1, bbox.height + 1);
        if w <= 2 * inset || h <= 2 * inset {
            break;
        }
        let rect = Rect::at((bbox.x + inset) as i32, (bbox.y + inset) as i32)
            .of_size(w - 2 * inset, h - 2 * inset);
        draw_hollow_rect_mut(img, rect, color);
    }
}

/// Draw the enabled overlays for every detection onto `canvas`
///
/// Returns a `DegenerateContour` issue for each detection whose center
/// was requested but could not be computed.
pub fn annotate(
    canvas: &mut RgbImage,
    detections: &[Detection],
    params: &ContourFilterParams,
) -> Vec<PipelineIssue> {
    let mut issues = Vec::new();
    for (index, detection) in detections.iter().enumerate() {
        if params.show_contours {
            draw_contour(canvas, &detection.points, CONTOUR_COLOR);
        }
        if params.show_bounding_boxes {
            draw_box(canvas, &detection.bbox, BOX_COLOR);
        }
        if params.show_center {
            match detection.centroid {
                Some(center) => draw_filled_circle_mut(canvas, center, CENTER_RADIUS, CENTER_COLOR),
                None => {
                    log::debug!("Contour {} has no centroid", index);
                    issues.push(PipelineIssue::DegenerateContour { index });
                }
            }
        }
    }
    issues
}

/// Raw pixels where the mask is set, black elsewhere
pub fn apply_mask(raw: &RgbImage, mask: &GrayImage) -> RgbImage {
    let (width, height) = raw.dimensions();
    RgbImage::from_fn(width, height, |x, y| {
        if mask.get_pixel(x, y)[0] > 0 {
            *raw.get_pixel(x, y)
        } else {
            Rgb([0, 0, 0])
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn square_detection(x: i32, y: i32, side: i32, centroid: Option<(i32, i32)>) -> Detection {
        let (x1, y1) = (x + side - 1, y + side - 1);
        Detection {
            points: vec![Point::new(x, y), Point::new(x1, y), Point::new(x1, y1), Point::new(x, y1)],
            area: ((side - 1) * (side - 1)) as f64,
            bbox: BoundingBox { x: x as u32, y: y as u32, width: side as u32, height: side as u32 },
            centroid,
        }
    }

    fn only(show_contours: bool, show_bounding_boxes: bool, show_center: bool) -> ContourFilterParams {
        ContourFilterParams {
            min_area: 1.0,
            show_contours,
            show_bounding_boxes,
            show_center,
        }
    }

    #[test]
    fn center_marker_is_red_disc() {
        let mut canvas = RgbImage::new(40, 40);
        let detection = square_detection(5, 5, 21, Some((15, 15)));
        let issues = annotate(&mut canvas, &[detection], &only(false, false, true));

        assert!(issues.is_empty());
        assert_eq!(*canvas.get_pixel(15, 15), CENTER_COLOR);
        assert_eq!(*canvas.get_pixel(15, 20), CENTER_COLOR);
        assert_eq!(*canvas.get_pixel(15, 22), Rgb([0, 0, 0]));
    }

    #[test]
    fn box_spans_to_x_plus_width() {
        let mut canvas = RgbImage::new(40, 40);
        annotate(&mut canvas, &[square_detection(5, 5, 10, None)], &only(false, true, false));

        assert_eq!(*canvas.get_pixel(5, 5), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(15, 15), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(6, 10), BOX_COLOR);
        assert_eq!(*canvas.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn contour_outline_is_green() {
        let mut canvas = RgbImage::new(40, 40);
        annotate(&mut canvas, &[square_detection(5, 5, 10, None)], &only(true, false, false));
        assert_eq!(*canvas.get_pixel(10, 5), CONTOUR_COLOR);
        assert_eq!(*canvas.get_pixel(5, 10), CONTOUR_COLOR);
        assert_eq!(*canvas.get_pixel(10, 10), Rgb([0, 0, 0]));
    }

    #[test]
    fn missing_centroid_is_reported_not_drawn() {
        let mut canvas = RgbImage::new(20, 20);
        let detections = [square_detection(1, 1, 5, Some((3, 3))), square_detection(10, 10, 1, None)];
        let issues = annotate(&mut canvas, &detections, &only(false, false, true));
        assert_eq!(issues, vec![PipelineIssue::DegenerateContour { index: 1 }]);
    }

    #[test]
    fn disabled_overlays_leave_canvas_untouched() {
        let mut canvas = RgbImage::new(20, 20);
        let issues = annotate(&mut canvas, &[square_detection(2, 2, 8, None)], &only(false, false, false));
        assert!(issues.is_empty());
        assert!(canvas.pixels().all(|p| *p == Rgb([0, 0, 0])));
    }

    #[test]
    fn mask_keeps_only_selected_pixels() {
        let raw = RgbImage::from_pixel(3, 1, Rgb([10, 20, 30]));
        let mut mask = GrayImage::new(3, 1);
        mask.put_pixel(1, 0, Luma([255]));
        let masked = apply_mask(&raw, &mask);
        assert_eq!(*masked.get_pixel(0, 0), Rgb([0, 0, 0]));
        assert_eq!(*masked.get_pixel(1, 0), Rgb([10, 20, 30]));
        assert_eq!(*masked.get_pixel(2, 0), Rgb([0, 0, 0]));
    }
}
