//! Coordinate recovery from the screenshot's text overlay.
//!
//! The text extractor is optional. When Tesseract is missing, coordinates and
//! altitude must come from manual input.

pub mod coordinates;
pub mod engine;
pub mod preprocess;
pub mod setup;

pub use coordinates::{parse_coordinates, ParsedCoordinates};
pub use engine::{TesseractExtractor, TextExtractor};
pub use setup::locate_tesseract;

use image::RgbImage;

/// High-level function: screenshot → OCR text → parsed coordinates.
///
/// Any extractor or parser failure is logged and reported as "nothing found"
/// so the caller falls back to manual values.
pub fn read_coordinates(extractor: &dyn TextExtractor, image: &RgbImage) -> ParsedCoordinates {
    let text = match extractor.extract_text(image) {
        Ok(text) => text,
        Err(e) => {
            log::warn!("OCR failed: {}", e);
            return ParsedCoordinates::default();
        }
    };

    log::debug!("OCR text: {}", text.trim());

    match parse_coordinates(&text) {
        Ok(parsed) => {
            if parsed.is_complete() {
                log::info!(
                    "Auto-detected: {:?}°, {:?}°, {:?} m",
                    parsed.latitude,
                    parsed.longitude,
                    parsed.altitude_m
                );
            } else {
                log::warn!("Could not auto-detect all location fields from OCR text");
            }
            parsed
        }
        Err(e) => {
            log::warn!("Coordinate parsing failed: {}", e);
            ParsedCoordinates::default()
        }
    }
}
