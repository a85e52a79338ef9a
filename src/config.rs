//! Configuration for an analysis run.
//!
//! Loaded from a JSON file at startup. Every field has a default, so a partial
//! file only overrides what it names, and a missing file means all defaults.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::harvest::HarvestParams;
use crate::precipitation::regions::{default_regions, RegionEntry};

/// A rectangle in relative coordinates (0.0 to 1.0).
/// Used for image regions that scale with screenshot size.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct RelativeRect {
    /// X position of top-left corner (0.0 = left edge, 1.0 = right edge)
    pub x: f32,
    /// Y position of top-left corner (0.0 = top edge, 1.0 = bottom edge)
    pub y: f32,
    /// Width as fraction of image width
    pub width: f32,
    /// Height as fraction of image height
    pub height: f32,
}

/// Detector thresholds passed through to the detection capability.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub confidence_threshold: f32,
    pub iou_threshold: f32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.30,
            iou_threshold: 0.45,
        }
    }
}

/// Weather service endpoints, timeouts and the offline fallback table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrecipitationConfig {
    /// Per-request timeout in seconds
    pub timeout_secs: u64,
    /// Length of the trailing archive window in days
    pub historical_days: i64,
    /// Days of recent data requested from the forecast service
    pub recent_days: u32,
    pub archive_url: String,
    pub forecast_url: String,
    pub user_agent: String,
    /// Annual rainfall used when no region matches (mm)
    pub global_default_mm: f64,
    /// Ordered regional fallback table, first match wins
    pub regions: Vec<RegionEntry>,
}

impl Default for PrecipitationConfig {
    fn default() -> Self {
        Self {
            timeout_secs: 30,
            historical_days: 365,
            recent_days: 92,
            archive_url: "https://archive-api.open-meteo.com/v1/archive".to_string(),
            forecast_url: "https://api.open-meteo.com/v1/forecast".to_string(),
            user_agent: format!("rooftop-harvest/{}", env!("CARGO_PKG_VERSION")),
            global_default_mm: 800.0,
            regions: default_regions(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OcrConfig {
    /// Region holding the coordinate and altitude overlay
    pub region: RelativeRect,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self {
            // Bottom-right strip where globe viewers print the status bar
            region: RelativeRect {
                x: 0.55,
                y: 0.82,
                width: 0.45,
                height: 0.18,
            },
        }
    }
}

/// An external program and its leading arguments.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CommandSpec {
    pub program: String,
    #[serde(default)]
    pub args: Vec<String>,
}

/// External programs providing detection and segmentation.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CapabilityConfig {
    pub detector_command: Option<CommandSpec>,
    pub segmenter_command: Option<CommandSpec>,
}

/// Complete analysis configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    pub detection: DetectionConfig,
    /// Fraction of rainfall collected from a roof, in (0, 1]
    pub runoff_coefficient: f64,
    /// Roofs smaller than this are discarded (m²)
    pub min_roof_area_m2: f64,
    pub precipitation: PrecipitationConfig,
    pub harvest: HarvestParams,
    pub ocr: OcrConfig,
    pub capabilities: CapabilityConfig,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            detection: DetectionConfig::default(),
            runoff_coefficient: 0.80,
            min_roof_area_m2: 20.0,
            precipitation: PrecipitationConfig::default(),
            harvest: HarvestParams::default(),
            ocr: OcrConfig::default(),
            capabilities: CapabilityConfig::default(),
        }
    }
}

impl AnalysisConfig {
    /// Load config from file, or return defaults if file doesn't exist or is invalid.
    pub fn load(config_path: &Path) -> Self {
        log::info!("Looking for config at: {}", config_path.display());

        if !config_path.exists() {
            log::info!("{} not found. Using default config.", config_path.display());
            return Self::default();
        }

        match fs::read_to_string(config_path) {
            Ok(content) => match serde_json::from_str(&content) {
                Ok(config) => {
                    log::info!("Loaded config from {}", config_path.display());
                    config
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}. Using defaults.", config_path.display(), e);
                    Self::default()
                }
            },
            Err(e) => {
                log::warn!("Failed to read {}: {}. Using defaults.", config_path.display(), e);
                Self::default()
            }
        }
    }

    /// Save default config to file (for reference).
    pub fn save_default(config_path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&Self::default())
            .context("Failed to serialize default config")?;
        fs::write(config_path, json)
            .with_context(|| format!("Failed to write config: {}", config_path.display()))
    }
}

/// Default config location: `config.json` next to the executable.
pub fn default_config_path() -> PathBuf {
    crate::paths::get_exe_dir().join("config.json")
}
