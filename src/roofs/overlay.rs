//! Overlay rendering for accepted roofs.
//!
//! Tints each roof's mask, outlines its box and writes a `#id: area` label
//! above the box. Roofs are drawn in acceptance order; where masks overlap
//! the later roof is blended over the earlier one.
//!
//! Only mask pixels are blended. Pixels outside every mask keep their
//! original values instead of being darkened by a full-frame blend per roof.

use anyhow::Result;
use image::{GrayImage, Rgb, RgbImage};
use plotters::prelude::*;
use rand::Rng;

use super::{BoundingBox, RoofRecord};

/// Weight of the original pixel when tinting a mask region.
const BASE_WEIGHT: f32 = 0.7;
/// Weight of the roof color when tinting a mask region.
const TINT_WEIGHT: f32 = 0.3;
const BOX_THICKNESS: u32 = 2;
const LABEL_FONT_SIZE: u32 = 16;

/// Picks a random overlay color.
pub fn random_color<R: Rng + ?Sized>(rng: &mut R) -> Rgb<u8> {
    Rgb([
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
        rng.gen_range(0..=255),
    ])
}

/// Blends `color` into every pixel covered by the mask.
pub fn blend_mask(img: &mut RgbImage, mask: &GrayImage, color: Rgb<u8>) {
    for (x, y, m) in mask.enumerate_pixels() {
        if m[0] == 0 || x >= img.width() || y >= img.height() {
            continue;
        }
        let pixel = img.get_pixel_mut(x, y);
        for c in 0..3 {
            let blended = pixel[c] as f32 * BASE_WEIGHT + color[c] as f32 * TINT_WEIGHT;
            pixel[c] = blended.round().min(255.0) as u8;
        }
    }
}

/// Draws a rectangle border on an image.
pub fn draw_rect(img: &mut RgbImage, bbox: &BoundingBox, color: Rgb<u8>, thickness: u32) {
    let (img_w, img_h) = img.dimensions();
    let (x, y, w, h) = (bbox.x1, bbox.y1, bbox.width(), bbox.height());

    let mut put = |px: u32, py: u32| {
        if px < img_w && py < img_h {
            img.put_pixel(px, py, color);
        }
    };

    for t in 0..thickness.min(h) {
        for dx in 0..w {
            put(x + dx, y + t);
            put(x + dx, y + h - 1 - t);
        }
    }
    for t in 0..thickness.min(w) {
        for dy in 0..h {
            put(x + t, y + dy);
            put(x + w - 1 - t, y + dy);
        }
    }
}

/// Renders `text` with its top-left corner at (`x`, `y`).
pub fn draw_label(img: &mut RgbImage, text: &str, x: i32, y: i32, color: Rgb<u8>) -> Result<()> {
    let (width, height) = img.dimensions();
    let root = BitMapBackend::with_buffer(&mut **img, (width, height)).into_drawing_area();
    let style = ("sans-serif", LABEL_FONT_SIZE)
        .into_font()
        .color(&RGBColor(color[0], color[1], color[2]));
    root.draw_text(text, &style, (x, y))?;
    root.present()?;
    Ok(())
}

/// Draws one accepted roof onto the overlay.
///
/// A label that cannot be rendered (no usable font on the system) is logged
/// and skipped; the tint and box are always drawn.
pub fn draw_roof(img: &mut RgbImage, roof: &RoofRecord, mask: &GrayImage, color: Rgb<u8>) {
    blend_mask(img, mask, color);
    draw_rect(img, &roof.bbox, color, BOX_THICKNESS);

    let label_y = roof.bbox.y1.saturating_sub(LABEL_FONT_SIZE + 6) as i32;
    if let Err(e) = draw_label(img, &roof.label(), roof.bbox.x1 as i32, label_y, color) {
        log::warn!("Could not draw label for roof #{}: {}", roof.id, e);
    }
}
