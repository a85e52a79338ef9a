//! Analysis report and JSON export.

use anyhow::{Context, Result};
use image::RgbImage;
use serde::Serialize;
use std::fs::File;
use std::io::Write;
use std::path::Path;

use crate::config::AnalysisConfig;
use crate::geo::{CameraGeometry, GeoCoordinate};
use crate::harvest::HarvestResult;
use crate::precipitation::PrecipitationEstimate;
use crate::roofs::{RoofRecord, SkippedDetection};

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LocationInfo {
    pub latitude: f64,
    pub longitude: f64,
    pub camera_altitude_m: f64,
}

impl LocationInfo {
    pub fn new(coord: &GeoCoordinate, camera: &CameraGeometry) -> Self {
        Self {
            latitude: coord.latitude,
            longitude: coord.longitude,
            camera_altitude_m: camera.altitude_m,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScaleInfo {
    pub meters_per_pixel: f64,
    pub image_height_px: u32,
}

impl From<&CameraGeometry> for ScaleInfo {
    fn from(camera: &CameraGeometry) -> Self {
        Self {
            meters_per_pixel: camera.meters_per_pixel,
            image_height_px: camera.image_height_px,
        }
    }
}

/// The settings a run actually used, after CLI overrides.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ConfigurationSnapshot {
    pub runoff_coefficient: f64,
    pub min_roof_area_m2: f64,
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl From<&AnalysisConfig> for ConfigurationSnapshot {
    fn from(config: &AnalysisConfig) -> Self {
        Self {
            runoff_coefficient: config.runoff_coefficient,
            min_roof_area_m2: config.min_roof_area_m2,
            confidence_threshold: config.detection.confidence_threshold,
            iou_threshold: config.detection.iou_threshold,
        }
    }
}

/// Everything a completed run produced.
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    pub location: LocationInfo,
    pub scale: ScaleInfo,
    pub roofs: Vec<RoofRecord>,
    pub skipped_detections: Vec<SkippedDetection>,
    pub precipitation: PrecipitationEstimate,
    pub water_harvest: HarvestResult,
    pub configuration: ConfigurationSnapshot,
    /// Source image with the accepted roofs drawn on it
    #[serde(skip)]
    pub overlay: RgbImage,
}

/// Export a report to a JSON file.
///
/// The output is pretty-printed for human readability. The overlay image is
/// not part of the JSON.
pub fn export_to_json(report: &AnalysisReport, output_path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(report).context("Failed to serialize report to JSON")?;

    let mut file = File::create(output_path)
        .with_context(|| format!("Failed to create JSON file: {}", output_path.display()))?;

    file.write_all(json.as_bytes())
        .context("Failed to write JSON data")?;

    Ok(())
}
