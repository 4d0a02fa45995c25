use image::{ImageBuffer, Luma, Rgba};

use super::text_box::Rect;

/// Converts image to binary by keeping only bright pixels.
///
/// Pixels where R > threshold AND G > threshold AND B > threshold become black (text).
/// All other pixels become white (background).
///
/// Relic panels draw light text on a dark translucent backdrop, so this
/// usually helps single-line recognizers.
pub fn threshold_bright_pixels(
    img: &ImageBuffer<Rgba<u8>, Vec<u8>>,
    threshold: u8,
) -> ImageBuffer<Luma<u8>, Vec<u8>> {
    let (width, height) = img.dimensions();
    let mut output = ImageBuffer::new(width, height);

    for (x, y, pixel) in img.enumerate_pixels() {
        let bright = pixel[0] > threshold && pixel[1] > threshold && pixel[2] > threshold;
        output.put_pixel(x, y, Luma([if bright { 0u8 } else { 255u8 }]));
    }

    output
}

/// Crops a pixel rectangle out of an image.
///
/// The rectangle is clamped to the image bounds; a rectangle entirely
/// outside the image yields an empty crop.
pub fn crop_rect(img: &ImageBuffer<Rgba<u8>, Vec<u8>>, rect: &Rect) -> ImageBuffer<Rgba<u8>, Vec<u8>> {
    let (w, h) = img.dimensions();
    let clamp = |v: i32, max: u32| (v.max(0) as u32).min(max);

    let x0 = clamp(rect.x_min, w);
    let y0 = clamp(rect.y_min, h);
    let x1 = clamp(rect.x_max, w).max(x0);
    let y1 = clamp(rect.y_max, h).max(y0);

    image::imageops::crop_imm(img, x0, y0, x1 - x0, y1 - y0).to_image()
}
