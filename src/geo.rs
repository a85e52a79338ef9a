//! Site coordinates and ground sampling distance.
//!
//! The scale model assumes a nadir view where the full image height spans the
//! camera altitude. Lens field of view and oblique viewing angles are ignored,
//! so tilted or zoomed screenshots over- or under-state roof areas.

use serde::Serialize;

use crate::error::ValidationError;

/// A validated latitude/longitude pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct GeoCoordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoCoordinate {
    /// Builds a coordinate, rejecting values outside the valid ranges.
    /// Out-of-range values are an error, never clamped.
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, ValidationError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(ValidationError::LatitudeOutOfRange(latitude));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(ValidationError::LongitudeOutOfRange(longitude));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// Camera altitude and image height, plus the scale derived from them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CameraGeometry {
    pub altitude_m: f64,
    pub image_height_px: u32,
    pub meters_per_pixel: f64,
}

impl CameraGeometry {
    pub fn new(altitude_m: f64, image_height_px: u32) -> Result<Self, ValidationError> {
        let meters_per_pixel = compute_scale(altitude_m, image_height_px)?;
        Ok(Self {
            altitude_m,
            image_height_px,
            meters_per_pixel,
        })
    }
}

/// Meters on the ground represented by one pixel: `altitude_m / image_height_px`.
pub fn compute_scale(altitude_m: f64, image_height_px: u32) -> Result<f64, ValidationError> {
    // NaN fails this comparison too
    if !(altitude_m > 0.0) {
        return Err(ValidationError::NonPositiveAltitude(altitude_m));
    }
    if image_height_px == 0 {
        return Err(ValidationError::NonPositiveImageHeight(image_height_px));
    }
    Ok(altitude_m / image_height_px as f64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compute_scale() {
        let scale = compute_scale(232.0, 1080).unwrap();
        assert!((scale - 232.0 / 1080.0).abs() < 1e-12);
    }

    #[test]
    fn test_compute_scale_round_trip() {
        for &(alt, h) in &[(50.0, 720u32), (232.0, 1080), (1500.5, 2160), (9999.0, 1)] {
            let scale = compute_scale(alt, h).unwrap();
            assert!((scale * h as f64 - alt).abs() < 1e-9);
        }
    }

    #[test]
    fn test_compute_scale_monotonic() {
        let low = compute_scale(100.0, 1000).unwrap();
        let high = compute_scale(200.0, 1000).unwrap();
        assert!(high > low, "scale should grow with altitude");

        let short = compute_scale(100.0, 500).unwrap();
        let tall = compute_scale(100.0, 1000).unwrap();
        assert!(tall < short, "scale should shrink with image height");
    }

    #[test]
    fn test_compute_scale_rejects_non_positive() {
        assert_eq!(
            compute_scale(0.0, 1080),
            Err(ValidationError::NonPositiveAltitude(0.0))
        );
        assert_eq!(
            compute_scale(-10.0, 1080),
            Err(ValidationError::NonPositiveAltitude(-10.0))
        );
        assert_eq!(
            compute_scale(100.0, 0),
            Err(ValidationError::NonPositiveImageHeight(0))
        );
        assert!(compute_scale(f64::NAN, 100).is_err());
    }

    #[test]
    fn test_geo_coordinate_bounds() {
        assert!(GeoCoordinate::new(28.6, 77.2).is_ok());
        assert!(GeoCoordinate::new(90.0, -180.0).is_ok());
        assert_eq!(
            GeoCoordinate::new(90.5, 0.0),
            Err(ValidationError::LatitudeOutOfRange(90.5))
        );
        assert_eq!(
            GeoCoordinate::new(0.0, -180.1),
            Err(ValidationError::LongitudeOutOfRange(-180.1))
        );
    }

    #[test]
    fn test_camera_geometry() {
        let geometry = CameraGeometry::new(500.0, 1000).unwrap();
        assert!((geometry.meters_per_pixel - 0.5).abs() < 1e-12);
        assert!(CameraGeometry::new(500.0, 0).is_err());
    }
}
