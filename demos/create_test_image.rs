use image::{Rgb, RgbImage};

/// Colored shapes on a dark gradient, handy for trying out ranges
fn main() -> anyhow::Result<()> {
    let mut img = RgbImage::new(800, 600);

    // Dark gradient background
    for y in 0..600 {
        for x in 0..800 {
            let v = (20 + x * 40 / 800 + y * 20 / 600) as u8;
            img.put_pixel(x, y, Rgb([v, v, v]));
        }
    }

    // (x, y, w, h, color)
    let shapes: [(u32, u32, u32, u32, [u8; 3]); 6] = [
        (60, 60, 120, 120, [230, 30, 30]),
        (260, 80, 90, 160, [30, 200, 60]),
        (440, 60, 140, 100, [40, 60, 230]),
        (640, 90, 100, 100, [240, 220, 40]),
        (120, 340, 160, 160, [250, 20, 90]),
        (420, 360, 200, 140, [245, 245, 245]),
    ];
    for (x0, y0, w, h, color) in shapes {
        for y in y0..y0 + h {
            for x in x0..x0 + w {
                img.put_pixel(x, y, Rgb(color));
            }
        }
    }

    img.save("test_image.png")?;
    println!("Created test_image.png (800x600, six colored rectangles)");
    Ok(())
}
