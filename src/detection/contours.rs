use image::{imageops, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};
use imageproc::point::Point;

use crate::models::Detection;
use crate::pipeline::BoundingBox;

/// Copy of `mask` inside a 1 px background frame
///
/// The border tracer never starts an outer border in column 0, so regions
/// touching the left edge need the margin to be found at all.
fn pad_mask(mask: &GrayImage) -> GrayImage {
    let mut padded = GrayImage::new(mask.width() + 2, mask.height() + 2);
    imageops::replace(&mut padded, mask, 1, 1);
    padded
}

/// Outer borders of the top-level foreground regions, in mask coordinates
///
/// Holes, and regions nested inside holes, are dropped.
pub fn find_external_contours(mask: &GrayImage) -> Vec<Contour<i32>> {
    if mask.width() == 0 || mask.height() == 0 {
        return Vec::new();
    }
    find_contours::<i32>(&pad_mask(mask))
        .into_iter()
        .filter(|c| c.parent.is_none() && c.border_type == BorderType::Outer)
        .map(|mut c| {
            for p in &mut c.points {
                p.x -= 1;
                p.y -= 1;
            }
            c
        })
        .collect()
}

/// Twice the signed shoelace area, plus the first moments scaled by 6A
fn polygon_moments(points: &[Point<i32>]) -> (f64, f64, f64) {
    let mut a2 = 0.0;
    let mut cx = 0.0;
    let mut cy = 0.0;
    for (i, p) in points.iter().enumerate() {
        let q = points[(i + 1) % points.len()];
        let (x0, y0, x1, y1) = (p.x as f64, p.y as f64, q.x as f64, q.y as f64);
        let cross = x0 * y1 - x1 * y0;
        a2 += cross;
        cx += (x0 + x1) * cross;
        cy += (y0 + y1) * cross;
    }
    (a2, cx, cy)
}

/// Area enclosed by the boundary polygon
pub fn polygon_area(points: &[Point<i32>]) -> f64 {
    if points.len() < 3 {
        return 0.0;
    }
    (polygon_moments(points).0 / 2.0).abs()
}

/// Centroid from the polygon moments, truncated toward zero
///
/// None when the zeroth moment vanishes (points, lines, empty input).
pub fn polygon_centroid(points: &[Point<i32>]) -> Option<(i32, i32)> {
    if points.len() < 3 {
        return None;
    }
    let (a2, cx, cy) = polygon_moments(points);
    if a2 == 0.0 {
        return None;
    }
    // cx / (6A) = cx / (3 * a2)
    Some(((cx / (3.0 * a2)) as i32, (cy / (3.0 * a2)) as i32))
}

/// Axis-aligned box of the points; both edges are inclusive
pub fn bounding_box(points: &[Point<i32>]) -> BoundingBox {
    let Some(first) = points.first() else {
        return BoundingBox { x: 0, y: 0, width: 0, height: 0 };
    };
    let (mut min_x, mut min_y, mut max_x, mut max_y) = (first.x, first.y, first.x, first.y);
    for p in &points[1..] {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }
    BoundingBox {
        x: min_x.max(0) as u32,
        y: min_y.max(0) as u32,
        width: (max_x - min_x + 1) as u32,
        height: (max_y - min_y + 1) as u32,
    }
}

/// Measure a contour
pub fn to_detection(contour: Contour<i32>) -> Detection {
    let area = polygon_area(&contour.points);
    let bbox = bounding_box(&contour.points);
    let centroid = polygon_centroid(&contour.points);
    Detection {
        points: contour.points,
        area,
        bbox,
        centroid,
    }
}

/// Keep detections whose area is strictly above `min_area`
pub fn filter_by_area(detections: Vec<Detection>, min_area: f64) -> Vec<Detection> {
    detections.into_iter().filter(|d| d.area > min_area).collect()
}

/// External contours of `mask`, measured and filtered by area
pub fn detect(mask: &GrayImage, min_area: f64) -> Vec<Detection> {
    let measured = find_external_contours(mask).into_iter().map(to_detection).collect();
    filter_by_area(measured, min_area)
}
