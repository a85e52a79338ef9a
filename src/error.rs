//! Error types for an analysis run.
//!
//! Only `Validation` and `CapabilityUnavailable` end a run early. Per-detection
//! segmentation failures and precipitation tier failures are recovered where
//! they happen and never reach this type.

use thiserror::Error;

/// Input that fails a bound check before any stage uses it.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("latitude {0} is outside [-90, 90]")]
    LatitudeOutOfRange(f64),

    #[error("longitude {0} is outside [-180, 180]")]
    LongitudeOutOfRange(f64),

    #[error("camera altitude must be positive, got {0} m")]
    NonPositiveAltitude(f64),

    #[error("image height must be positive, got {0} px")]
    NonPositiveImageHeight(u32),

    #[error("latitude and longitude were not found by OCR and not given manually")]
    MissingCoordinates,

    #[error("camera altitude was not found by OCR and not given manually")]
    MissingAltitude,

    #[error("runoff coefficient must lie in (0, 1], got {0}")]
    InvalidRunoffCoefficient(f64),
}

/// Failure reported by a detector, segmenter or text extractor.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CapabilityError {
    /// The backing model or program is not installed or could not be started.
    #[error("capability unavailable: {0}")]
    Unavailable(String),

    /// The capability ran but could not produce a result for this input.
    #[error("capability failed: {0}")]
    Failed(String),
}

/// Errors that abort an analysis run.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    #[error("{0} is not available")]
    CapabilityUnavailable(String),
}

/// Type alias for Results using AnalysisError
pub type Result<T> = std::result::Result<T, AnalysisError>;
