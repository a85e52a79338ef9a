use image::{GrayImage, Luma, RgbImage};

use crate::config::RelativeRect;

/// Crops a sub-region from an image using relative coordinates.
///
/// Converts the relative rect (0.0–1.0) to absolute pixel coordinates,
/// clamps to image bounds, and returns the cropped sub-image.
pub fn crop_region(img: &RgbImage, region: &RelativeRect) -> RgbImage {
    let (w, h) = img.dimensions();

    let x0 = ((region.x * w as f32) as u32).min(w);
    let y0 = ((region.y * h as f32) as u32).min(h);
    let rw = ((region.width * w as f32) as u32).min(w - x0);
    let rh = ((region.height * h as f32) as u32).min(h - y0);

    image::imageops::crop_imm(img, x0, y0, rw, rh).to_image()
}

/// Otsu's threshold: the gray level that maximizes between-class variance.
pub fn otsu_threshold(img: &GrayImage) -> u8 {
    let mut histogram = [0u64; 256];
    for pixel in img.pixels() {
        histogram[pixel[0] as usize] += 1;
    }

    let total: u64 = histogram.iter().sum();
    if total == 0 {
        return 0;
    }

    let weighted_sum: f64 = histogram
        .iter()
        .enumerate()
        .map(|(level, &count)| level as f64 * count as f64)
        .sum();

    let mut background_weight = 0u64;
    let mut background_sum = 0.0f64;
    let mut best_level = 0u8;
    let mut best_variance = 0.0f64;

    for level in 0..256 {
        background_weight += histogram[level];
        if background_weight == 0 {
            continue;
        }
        let foreground_weight = total - background_weight;
        if foreground_weight == 0 {
            break;
        }

        background_sum += level as f64 * histogram[level] as f64;
        let background_mean = background_sum / background_weight as f64;
        let foreground_mean = (weighted_sum - background_sum) / foreground_weight as f64;
        let diff = background_mean - foreground_mean;
        let variance = background_weight as f64 * foreground_weight as f64 * diff * diff;

        if variance > best_variance {
            best_variance = variance;
            best_level = level as u8;
        }
    }

    best_level
}

/// Converts to grayscale and binarizes with Otsu's threshold.
///
/// Pixels above the threshold become white, the rest black. The overlay text
/// in globe viewer screenshots is light on a dark strip, so this keeps it
/// readable for Tesseract without a fixed cutoff.
pub fn binarize_otsu(img: &RgbImage) -> GrayImage {
    let gray = image::imageops::grayscale(img);
    let threshold = otsu_threshold(&gray);

    let (width, height) = gray.dimensions();
    let mut output = GrayImage::new(width, height);
    for (x, y, pixel) in gray.enumerate_pixels() {
        let value = if pixel[0] > threshold { 255u8 } else { 0u8 };
        output.put_pixel(x, y, Luma([value]));
    }
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn test_crop_region() {
        // 100x200 image
        let img = RgbImage::from_fn(100, 200, |x, y| Rgb([x as u8, y as u8, 0]));

        let region = RelativeRect { x: 0.1, y: 0.25, width: 0.5, height: 0.1 };
        let cropped = crop_region(&img, &region);

        assert_eq!(cropped.dimensions(), (50, 20));
        // Top-left pixel should be (10, 50) from original
        assert_eq!(cropped.get_pixel(0, 0)[0], 10);
        assert_eq!(cropped.get_pixel(0, 0)[1], 50);
    }

    #[test]
    fn test_crop_region_clamps() {
        let img = RgbImage::new(100, 100);
        let region = RelativeRect { x: 0.9, y: 0.9, width: 0.5, height: 0.5 };
        let cropped = crop_region(&img, &region);

        // Should clamp to 10x10 (remaining pixels)
        assert_eq!(cropped.dimensions(), (10, 10));
    }

    #[test]
    fn test_otsu_threshold_bimodal() {
        // Half the pixels at 40, half at 200
        let img = GrayImage::from_fn(10, 10, |x, _| if x < 5 { Luma([40]) } else { Luma([200]) });
        let threshold = otsu_threshold(&img);
        assert!(threshold >= 40 && threshold < 200, "threshold {} should split the modes", threshold);
    }

    #[test]
    fn test_otsu_threshold_uniform() {
        let img = GrayImage::from_pixel(4, 4, Luma([128]));
        assert_eq!(otsu_threshold(&img), 0);
    }

    #[test]
    fn test_binarize_otsu() {
        let mut img = RgbImage::from_pixel(3, 1, Rgb([20, 20, 20]));
        img.put_pixel(1, 0, Rgb([240, 240, 240]));

        let result = binarize_otsu(&img);

        assert_eq!(result.get_pixel(0, 0)[0], 0, "Dark pixel should become black");
        assert_eq!(result.get_pixel(1, 0)[0], 255, "Bright pixel should become white");
        assert_eq!(result.get_pixel(2, 0)[0], 0);
    }
}
