use image::{GrayImage, RgbImage};
use std::process::Command;
use tempfile::NamedTempFile;

use super::preprocess::{binarize_otsu, crop_region};
use super::setup::TesseractPaths;
use crate::config::RelativeRect;
use crate::error::CapabilityError;

/// Reads text from an image region.
pub trait TextExtractor: Send + Sync {
    fn extract_text(&self, image: &RgbImage) -> Result<String, CapabilityError>;
}

/// Text extractor backed by the Tesseract command line tool.
///
/// Crops the configured overlay region, binarizes it and runs Tesseract in
/// single-block mode.
pub struct TesseractExtractor {
    paths: TesseractPaths,
    region: RelativeRect,
}

impl TesseractExtractor {
    pub fn new(paths: TesseractPaths, region: RelativeRect) -> Self {
        Self { paths, region }
    }

    fn recognize(&self, img: &GrayImage) -> Result<String, CapabilityError> {
        let temp_input = NamedTempFile::with_suffix(".png")
            .map_err(|e| CapabilityError::Failed(format!("temp file: {}", e)))?;
        img.save(temp_input.path())
            .map_err(|e| CapabilityError::Failed(format!("saving OCR input: {}", e)))?;

        let mut command = Command::new(&self.paths.executable);
        command.arg(temp_input.path()).arg("stdout");
        if let Some(tessdata) = &self.paths.tessdata {
            command.arg("--tessdata-dir").arg(tessdata);
        }
        command.arg("-l").arg("eng").arg("--psm").arg("6");

        let output = command
            .output()
            .map_err(|e| CapabilityError::Unavailable(format!("tesseract: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapabilityError::Failed(format!("Tesseract failed: {}", stderr)));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

impl TextExtractor for TesseractExtractor {
    fn extract_text(&self, image: &RgbImage) -> Result<String, CapabilityError> {
        let cropped = crop_region(image, &self.region);
        if cropped.width() == 0 || cropped.height() == 0 {
            return Err(CapabilityError::Failed("OCR region is empty".to_string()));
        }
        let binary = binarize_otsu(&cropped);
        let text = self.recognize(&binary)?;
        Ok(clean_text(&text))
    }
}

/// Joins OCR lines into one line and drops table separators.
pub fn clean_text(text: &str) -> String {
    text.replace('\n', " ").replace('|', " ")
}
