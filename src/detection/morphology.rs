use image::GrayImage;
use imageproc::distance_transform::Norm;
use imageproc::morphology::{dilate, erode};

use crate::models::MorphologyParams;

/// Radius of the centered square footprint used for a kernel of `size`
///
/// Size 1 is the identity, sizes 2 and 3 cover 3x3, 4 and 5 cover 5x5.
pub fn footprint_radius(size: u32) -> u8 {
    u8::try_from(size / 2).unwrap_or(u8::MAX)
}

/// Erode with a square all-ones footprint, one iteration
pub fn erode_square(mask: &GrayImage, size: u32) -> GrayImage {
    match footprint_radius(size) {
        0 => mask.clone(),
        radius => erode(mask, Norm::LInf, radius),
    }
}

/// Dilate with a square all-ones footprint, one iteration
pub fn dilate_square(mask: &GrayImage, size: u32) -> GrayImage {
    match footprint_radius(size) {
        0 => mask.clone(),
        radius => dilate(mask, Norm::LInf, radius),
    }
}

/// Erosion then dilation; a zero size skips that half
pub fn clean_mask(mask: &GrayImage, params: &MorphologyParams) -> GrayImage {
    if mask.width() == 0 || mask.height() == 0 {
        return mask.clone();
    }
    let mut cleaned = if params.erosion > 0 {
        erode_square(mask, params.erosion)
    } else {
        mask.clone()
    };
    if params.dilation > 0 {
        cleaned = dilate_square(&cleaned, params.dilation);
    }
    cleaned
}
