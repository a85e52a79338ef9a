//! Roof detection, segmentation and area measurement.
//!
//! This module provides:
//! - Capability traits for the external detector and segmenter
//! - Per-detection mask to area conversion with a minimum-area filter
//! - Overlay rendering of accepted roofs
//! - Subprocess-backed capability adapters

pub mod command;
pub mod extract;
pub mod overlay;

pub use command::{CommandDetector, CommandSegmenter};
pub use extract::{extract, ExtractionParams, SkippedDetection};

use image::{GrayImage, RgbImage};
use serde::Serialize;

use crate::error::CapabilityError;

/// Axis-aligned box in pixel coordinates with `x1 < x2` and `y1 < y2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(into = "[u32; 4]")]
pub struct BoundingBox {
    pub x1: u32,
    pub y1: u32,
    pub x2: u32,
    pub y2: u32,
}

impl BoundingBox {
    /// Returns `None` for empty or inverted boxes.
    pub fn new(x1: u32, y1: u32, x2: u32, y2: u32) -> Option<Self> {
        (x1 < x2 && y1 < y2).then_some(Self { x1, y1, x2, y2 })
    }

    pub fn width(&self) -> u32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> u32 {
        self.y2 - self.y1
    }
}

impl From<BoundingBox> for [u32; 4] {
    fn from(b: BoundingBox) -> Self {
        [b.x1, b.y1, b.x2, b.y2]
    }
}

/// A binary footprint mask (non-zero = member) and the segmenter's score.
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub mask: GrayImage,
    pub score: f32,
}

impl Segmentation {
    /// Number of pixels inside the mask.
    pub fn pixel_count(&self) -> u64 {
        self.mask.pixels().filter(|p| p[0] > 0).count() as u64
    }
}

/// Proposes candidate roof boxes for an image.
pub trait Detector: Send + Sync {
    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<BoundingBox>, CapabilityError>;
}

/// Predicts a pixel mask for one box prompt.
pub trait Segmenter: Send + Sync {
    fn segment(&self, image: &RgbImage, bbox: &BoundingBox) -> Result<Segmentation, CapabilityError>;
}

/// One accepted roof.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RoofRecord {
    /// Sequential from 1 in acceptance order
    pub id: u32,
    pub bbox: BoundingBox,
    pub area_m2: f64,
    #[serde(rename = "pixels")]
    pub pixel_count: u64,
}

impl RoofRecord {
    pub fn label(&self) -> String {
        format!("#{}: {:.1}m²", self.id, self.area_m2)
    }
}
