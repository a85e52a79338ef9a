//! Detector and segmenter backed by external programs.
//!
//! The image is handed over as a temporary PNG. The detector prints a JSON
//! array of `[x1, y1, x2, y2]` boxes; the segmenter writes a mask PNG to the
//! path it is given and prints its score.

use image::RgbImage;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::{NamedTempFile, TempDir};

use super::{BoundingBox, Detector, Segmentation, Segmenter};
use crate::config::CommandSpec;
use crate::error::CapabilityError;

/// Resolves a program name against PATH, or checks a path directly.
fn resolve_program(program: &str) -> Option<PathBuf> {
    let candidate = Path::new(program);
    if candidate.components().count() > 1 {
        return candidate.is_file().then(|| candidate.to_path_buf());
    }

    let path_var = std::env::var_os("PATH")?;
    std::env::split_paths(&path_var)
        .map(|dir| dir.join(program))
        .find(|p| p.is_file())
}

/// A verified external program with its leading arguments.
#[derive(Debug, Clone)]
struct ExternalProgram {
    executable: PathBuf,
    args: Vec<String>,
}

impl ExternalProgram {
    fn new(spec: &CommandSpec) -> Result<Self, CapabilityError> {
        let executable = resolve_program(&spec.program).ok_or_else(|| {
            CapabilityError::Unavailable(format!("program not found: {}", spec.program))
        })?;
        log::debug!("Using external program: {}", executable.display());
        Ok(Self {
            executable,
            args: spec.args.clone(),
        })
    }

    fn run(&self, extra: &[String]) -> Result<Output, CapabilityError> {
        let output = Command::new(&self.executable)
            .args(&self.args)
            .args(extra)
            .output()
            .map_err(|e| {
                CapabilityError::Unavailable(format!("{}: {}", self.executable.display(), e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(CapabilityError::Failed(format!(
                "{} exited with {}: {}",
                self.executable.display(),
                output.status,
                stderr.trim()
            )));
        }

        Ok(output)
    }
}

fn write_temp_png(image: &RgbImage) -> Result<NamedTempFile, CapabilityError> {
    let file = NamedTempFile::with_suffix(".png")
        .map_err(|e| CapabilityError::Failed(format!("temp file: {}", e)))?;
    image
        .save(file.path())
        .map_err(|e| CapabilityError::Failed(format!("saving input image: {}", e)))?;
    Ok(file)
}

/// Parses detector stdout into boxes clamped to the image.
///
/// Fractional coordinates are truncated. Boxes that are empty after
/// clamping are dropped.
pub fn parse_boxes(stdout: &str, width: u32, height: u32) -> Result<Vec<BoundingBox>, CapabilityError> {
    let raw: Vec<[f64; 4]> = serde_json::from_str(stdout.trim())
        .map_err(|e| CapabilityError::Failed(format!("detector output: {}", e)))?;

    let clamp = |v: f64, max: u32| v.max(0.0).min(max as f64) as u32;

    let mut boxes = Vec::with_capacity(raw.len());
    for [x1, y1, x2, y2] in raw {
        match BoundingBox::new(
            clamp(x1, width),
            clamp(y1, height),
            clamp(x2, width),
            clamp(y2, height),
        ) {
            Some(b) => boxes.push(b),
            None => log::warn!("Dropping degenerate box [{}, {}, {}, {}]", x1, y1, x2, y2),
        }
    }
    Ok(boxes)
}

/// Runs `<program> <args..> <image.png> <confidence> <iou>`.
#[derive(Debug, Clone)]
pub struct CommandDetector {
    program: ExternalProgram,
}

impl CommandDetector {
    pub fn new(spec: &CommandSpec) -> Result<Self, CapabilityError> {
        Ok(Self {
            program: ExternalProgram::new(spec)?,
        })
    }
}

impl Detector for CommandDetector {
    fn detect(
        &self,
        image: &RgbImage,
        confidence_threshold: f32,
        iou_threshold: f32,
    ) -> Result<Vec<BoundingBox>, CapabilityError> {
        let input = write_temp_png(image)?;
        let output = self.program.run(&[
            input.path().display().to_string(),
            confidence_threshold.to_string(),
            iou_threshold.to_string(),
        ])?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        parse_boxes(&stdout, image.width(), image.height())
    }
}

/// Runs `<program> <args..> <image.png> <x1> <y1> <x2> <y2> <mask_out.png>`.
#[derive(Debug, Clone)]
pub struct CommandSegmenter {
    program: ExternalProgram,
}

impl CommandSegmenter {
    pub fn new(spec: &CommandSpec) -> Result<Self, CapabilityError> {
        Ok(Self {
            program: ExternalProgram::new(spec)?,
        })
    }
}

impl Segmenter for CommandSegmenter {
    fn segment(&self, image: &RgbImage, bbox: &BoundingBox) -> Result<Segmentation, CapabilityError> {
        let input = write_temp_png(image)?;
        let work_dir = TempDir::new().map_err(|e| CapabilityError::Failed(format!("temp dir: {}", e)))?;
        let mask_path = work_dir.path().join("mask.png");

        let output = self.program.run(&[
            input.path().display().to_string(),
            bbox.x1.to_string(),
            bbox.y1.to_string(),
            bbox.x2.to_string(),
            bbox.y2.to_string(),
            mask_path.display().to_string(),
        ])?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let score = stdout
            .trim()
            .parse::<f32>()
            .map_err(|e| CapabilityError::Failed(format!("segmenter score {:?}: {}", stdout.trim(), e)))?;

        let mask = image::open(&mask_path)
            .map_err(|e| CapabilityError::Failed(format!("reading mask: {}", e)))?
            .to_luma8();

        Ok(Segmentation { mask, score })
    }
}
