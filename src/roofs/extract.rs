use image::RgbImage;
use rand::Rng;
use serde::Serialize;

use super::overlay::{draw_roof, random_color};
use super::{Detector, RoofRecord, Segmenter};
use crate::error::CapabilityError;

/// Scale, detector thresholds and the minimum accepted roof area.
#[derive(Debug, Clone, Copy)]
pub struct ExtractionParams {
    pub meters_per_pixel: f64,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
    pub min_area_m2: f64,
}

/// A detection whose mask could not be produced.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SkippedDetection {
    /// Position in detector output, 0-based
    pub index: usize,
    pub error: String,
}

/// Accepted roofs, the rendered overlay, and detections skipped on error.
#[derive(Debug, Clone)]
pub struct Extraction {
    pub roofs: Vec<RoofRecord>,
    pub overlay: RgbImage,
    pub skipped: Vec<SkippedDetection>,
}

impl Extraction {
    pub fn total_area_m2(&self) -> f64 {
        self.roofs.iter().map(|r| r.area_m2).sum()
    }
}

/// Detects roofs, measures each mask, and renders the overlay.
///
/// Masks are measured as `pixels * meters_per_pixel²`. Empty masks and
/// candidates below `min_area_m2` are dropped without an id. A segmentation failure skips
/// that candidate only; a detector failure fails the call.
pub fn extract<R: Rng + ?Sized>(
    image: &RgbImage,
    detector: &dyn Detector,
    segmenter: &dyn Segmenter,
    params: &ExtractionParams,
    rng: &mut R,
) -> Result<Extraction, CapabilityError> {
    let boxes = detector.detect(image, params.confidence_threshold, params.iou_threshold)?;
    log::info!("Detector returned {} candidate boxes", boxes.len());

    let mut extraction = Extraction {
        roofs: Vec::new(),
        overlay: image.clone(),
        skipped: Vec::new(),
    };
    let pixel_area = params.meters_per_pixel * params.meters_per_pixel;
    let mut filtered = 0usize;

    for (index, bbox) in boxes.iter().enumerate() {
        let segmentation = match segmenter.segment(image, bbox) {
            Ok(seg) => seg,
            Err(e) => {
                log::warn!("Failed to process roof {}: {}", index + 1, e);
                extraction.skipped.push(SkippedDetection {
                    index,
                    error: e.to_string(),
                });
                continue;
            }
        };

        if segmentation.mask.dimensions() != image.dimensions() {
            let error = format!(
                "mask is {:?}, image is {:?}",
                segmentation.mask.dimensions(),
                image.dimensions()
            );
            log::warn!("Failed to process roof {}: {}", index + 1, error);
            extraction.skipped.push(SkippedDetection { index, error });
            continue;
        }

        let pixel_count = segmentation.pixel_count();
        if pixel_count == 0 {
            log::debug!("Candidate {} has an empty mask", index + 1);
            filtered += 1;
            continue;
        }
        let area_m2 = pixel_count as f64 * pixel_area;

        if area_m2 < params.min_area_m2 {
            log::debug!(
                "Candidate {} below minimum area: {:.1} m² < {:.1} m²",
                index + 1,
                area_m2,
                params.min_area_m2
            );
            filtered += 1;
            continue;
        }

        let roof = RoofRecord {
            id: extraction.roofs.len() as u32 + 1,
            bbox: *bbox,
            area_m2,
            pixel_count,
        };
        log::debug!(
            "Roof #{}: {:.2} m² ({} pixels, score {:.2})",
            roof.id,
            roof.area_m2,
            roof.pixel_count,
            segmentation.score
        );

        let color = random_color(rng);
        draw_roof(&mut extraction.overlay, &roof, &segmentation.mask, color);
        extraction.roofs.push(roof);
    }

    log::info!(
        "Accepted {} roofs ({} below minimum area, {} skipped on error)",
        extraction.roofs.len(),
        filtered,
        extraction.skipped.len()
    );

    Ok(extraction)
}
