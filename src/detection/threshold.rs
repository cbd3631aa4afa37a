use image::{GrayImage, Luma, RgbImage};

use crate::models::{ChannelRange, ColorSpace};

pub const FOREGROUND: Luma<u8> = Luma([255]);
pub const BACKGROUND: Luma<u8> = Luma([0]);

/// Mask of the pixels one range accepts
///
/// Wrap-around on channel 1 only applies when `space` treats it as cyclic.
pub fn range_mask(img: &RgbImage, range: &ChannelRange, space: ColorSpace) -> GrayImage {
    let (width, height) = img.dimensions();
    GrayImage::from_fn(width, height, |x, y| {
        if range.contains(img.get_pixel(x, y).0, space) {
            FOREGROUND
        } else {
            BACKGROUND
        }
    })
}

/// OR of the masks of every range
pub fn combined_mask(img: &RgbImage, ranges: &[ChannelRange], space: ColorSpace) -> GrayImage {
    let (width, height) = img.dimensions();
    let mut mask = GrayImage::new(width, height);
    for range in ranges {
        union_in_place(&mut mask, &range_mask(img, range, space));
    }
    mask
}

/// `acc |= other`, pixel by pixel
pub fn union_in_place(acc: &mut GrayImage, other: &GrayImage) {
    for (a, b) in acc.pixels_mut().zip(other.pixels()) {
        a[0] |= b[0];
    }
}
