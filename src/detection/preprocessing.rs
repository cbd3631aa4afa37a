use image::RgbImage;
use imageproc::filter::separable_filter_equal;
use palette::{FromColor, Hsv, Lab, Srgb};

use crate::error::PipelineIssue;
use crate::models::ColorSpace;

/// Convert an RGB frame into `space`, keeping three 8-bit channels
pub fn convert_color_space(raw: &RgbImage, space: ColorSpace) -> Result<RgbImage, PipelineIssue> {
    let (width, height) = raw.dimensions();
    if width == 0 || height == 0 {
        return Err(PipelineIssue::ConversionFailure {
            space,
            reason: format!("empty {}x{} frame", width, height),
        });
    }

    let mut converted = raw.clone();
    if space != ColorSpace::Rgb {
        for pixel in converted.pixels_mut() {
            pixel.0 = convert_pixel(pixel.0, space);
        }
    }
    Ok(converted)
}

/// Convert a single RGB triplet into the 8-bit encoding of `space`
///
/// HSV stores hue as degrees / 2 so it fits 0..=179, Lab stores
/// `L * 255 / 100` with `a` and `b` offset by 128.
pub fn convert_pixel(rgb: [u8; 3], space: ColorSpace) -> [u8; 3] {
    let [r, g, b] = rgb;
    match space {
        ColorSpace::Rgb => rgb,
        ColorSpace::Bgr => [b, g, r],
        ColorSpace::Hsv => {
            let hsv: Hsv = Hsv::from_color(Srgb::new(r, g, b).into_format::<f32>());
            let hue = (hsv.hue.into_positive_degrees() / 2.0).round() as u16 % 180;
            [hue as u8, unit_to_byte(hsv.saturation), unit_to_byte(hsv.value)]
        }
        ColorSpace::Lab => {
            let lab: Lab = Lab::from_color(Srgb::new(r, g, b).into_format::<f32>());
            [
                clamp_byte(lab.l * 255.0 / 100.0),
                clamp_byte(lab.a + 128.0),
                clamp_byte(lab.b + 128.0),
            ]
        }
        ColorSpace::YCrCb => {
            let (r, g, b) = (r as f32, g as f32, b as f32);
            let y = 0.299 * r + 0.587 * g + 0.114 * b;
            [
                clamp_byte(y),
                clamp_byte((r - y) * 0.713 + 128.0),
                clamp_byte((b - y) * 0.564 + 128.0),
            ]
        }
    }
}

/// Inverse of [`convert_pixel`], used to render swatches for saved ranges
pub fn to_rgb_pixel(pixel: [u8; 3], space: ColorSpace) -> [u8; 3] {
    let [c1, c2, c3] = pixel;
    match space {
        ColorSpace::Rgb => pixel,
        ColorSpace::Bgr => [c3, c2, c1],
        ColorSpace::Hsv => {
            let hsv: Hsv = Hsv::new(c1 as f32 * 2.0, c2 as f32 / 255.0, c3 as f32 / 255.0);
            let rgb: Srgb<u8> = Srgb::<f32>::from_color(hsv).into_format();
            [rgb.red, rgb.green, rgb.blue]
        }
        ColorSpace::Lab => {
            let lab: Lab = Lab::new(c1 as f32 * 100.0 / 255.0, c2 as f32 - 128.0, c3 as f32 - 128.0);
            let rgb: Srgb<u8> = Srgb::<f32>::from_color(lab).into_format();
            [rgb.red, rgb.green, rgb.blue]
        }
        ColorSpace::YCrCb => {
            let (y, cr, cb) = (c1 as f32, c2 as f32 - 128.0, c3 as f32 - 128.0);
            [
                clamp_byte(y + 1.403 * cr),
                clamp_byte(y - 0.714 * cr - 0.344 * cb),
                clamp_byte(y + 1.773 * cb),
            ]
        }
    }
}

/// Normalized 1-D Gaussian of exactly `size` taps
///
/// Sigma follows the usual derivation from the kernel size:
/// `0.3 * ((size - 1) * 0.5 - 1) + 0.8`.
pub fn gaussian_kernel(size: u32) -> Vec<f32> {
    let sigma = 0.3 * ((size as f32 - 1.0) * 0.5 - 1.0) + 0.8;
    let center = (size / 2) as f32;
    let mut kernel: Vec<f32> = (0..size)
        .map(|i| {
            let d = i as f32 - center;
            (-(d * d) / (2.0 * sigma * sigma)).exp()
        })
        .collect();

    let sum: f32 = kernel.iter().sum();
    kernel.iter_mut().for_each(|w| *w /= sum);
    kernel
}

/// Apply separable Gaussian blur with an odd kernel size
pub fn apply_blur(img: &RgbImage, kernel_size: u32) -> RgbImage {
    if kernel_size <= 1 {
        return img.clone();
    }
    separable_filter_equal(img, &gaussian_kernel(kernel_size))
}

fn unit_to_byte(x: f32) -> u8 {
    clamp_byte(x * 255.0)
}

fn clamp_byte(x: f32) -> u8 {
    x.round().clamp(0.0, 255.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn hsv_matches_8bit_encoding() {
        assert_eq!(convert_pixel([255, 0, 0], ColorSpace::Hsv), [0, 255, 255]);
        assert_eq!(convert_pixel([0, 255, 0], ColorSpace::Hsv), [60, 255, 255]);
        assert_eq!(convert_pixel([0, 0, 255], ColorSpace::Hsv), [120, 255, 255]);
        assert_eq!(convert_pixel([128, 128, 128], ColorSpace::Hsv), [0, 0, 128]);
        assert_eq!(convert_pixel([255, 255, 255], ColorSpace::Hsv), [0, 0, 255]);
    }

    #[test]
    fn hue_near_360_folds_back_to_zero() {
        // hue ~359.x degrees rounds to 180 before folding
        let [h, _, _] = convert_pixel([255, 0, 2], ColorSpace::Hsv);
        assert!(h == 0 || h == 179, "got hue {}", h);
    }

    #[test]
    fn bgr_swaps_and_rgb_is_identity() {
        assert_eq!(convert_pixel([1, 2, 3], ColorSpace::Bgr), [3, 2, 1]);
        assert_eq!(convert_pixel([1, 2, 3], ColorSpace::Rgb), [1, 2, 3]);
    }

    #[test]
    fn lab_and_ycrcb_neutral_axes() {
        let white_lab = convert_pixel([255, 255, 255], ColorSpace::Lab);
        assert_eq!(white_lab[0], 255);
        assert!((white_lab[1] as i16 - 128).abs() <= 1);
        assert!((white_lab[2] as i16 - 128).abs() <= 1);

        assert_eq!(convert_pixel([0, 0, 0], ColorSpace::Lab), [0, 128, 128]);
        assert_eq!(convert_pixel([255, 255, 255], ColorSpace::YCrCb), [255, 128, 128]);
        assert_eq!(convert_pixel([0, 0, 0], ColorSpace::YCrCb), [0, 128, 128]);
    }

    #[test]
    fn inverse_conversion_is_close() {
        for space in ColorSpace::ALL {
            for rgb in [[200u8, 40, 40], [30, 160, 90], [90, 90, 220]] {
                let back = to_rgb_pixel(convert_pixel(rgb, space), space);
                for c in 0..3 {
                    assert!(
                        (back[c] as i16 - rgb[c] as i16).abs() <= 6,
                        "{} round trip of {:?} gave {:?}",
                        space,
                        rgb,
                        back
                    );
                }
            }
        }
    }

    #[test]
    fn empty_frame_fails_conversion() {
        let err = convert_color_space(&RgbImage::new(0, 5), ColorSpace::Lab).unwrap_err();
        assert!(matches!(err, PipelineIssue::ConversionFailure { space: ColorSpace::Lab, .. }));
    }

    #[test]
    fn gaussian_kernel_is_normalized_and_symmetric() {
        for size in [3, 5, 9] {
            let kernel = gaussian_kernel(size);
            assert_eq!(kernel.len(), size as usize);
            let sum: f32 = kernel.iter().sum();
            assert!((sum - 1.0).abs() < 1e-5);
            for i in 0..kernel.len() / 2 {
                assert!((kernel[i] - kernel[kernel.len() - 1 - i]).abs() < 1e-6);
            }
            assert!(kernel[size as usize / 2] > kernel[0]);
        }
    }

    #[test]
    fn blur_spreads_a_bright_pixel() {
        let mut img = RgbImage::new(9, 9);
        img.put_pixel(4, 4, Rgb([255, 255, 255]));
        let blurred = apply_blur(&img, 5);

        let center = blurred.get_pixel(4, 4)[0];
        assert!(center < 255);
        assert!(blurred.get_pixel(5, 4)[0] > 0);
        assert_eq!(blurred.get_pixel(3, 4), blurred.get_pixel(5, 4));
        assert_eq!(blurred.get_pixel(0, 0)[0], 0);
    }

    #[test]
    fn blur_of_size_one_is_identity() {
        let img = RgbImage::from_fn(5, 5, |x, y| Rgb([x as u8 * 10, y as u8 * 10, 7]));
        assert_eq!(apply_blur(&img, 1), img);
    }
}
