//! End-to-end analysis of one screenshot.
//!
//! Location is recovered (OCR, then manual overrides) and validated before any
//! detection work starts. Roof extraction, precipitation lookup and the
//! harvest estimate follow. A run with no accepted roofs ends with
//! [`AnalysisOutcome::NoRoofs`] instead of a zero-area estimate.

use image::RgbImage;
use rand::Rng;

use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, CapabilityError, Result, ValidationError};
use crate::geo::{CameraGeometry, GeoCoordinate};
use crate::harvest;
use crate::ocr::{self, TextExtractor};
use crate::precipitation::PrecipitationResolver;
use crate::report::{AnalysisReport, ConfigurationSnapshot, LocationInfo, ScaleInfo};
use crate::roofs::{self, Detector, ExtractionParams, Segmenter, SkippedDetection};

/// Values given on the command line. Each one replaces its OCR counterpart.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualInput {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
}

/// One screenshot to analyze.
#[derive(Debug, Clone)]
pub struct AnalysisRequest {
    pub image: RgbImage,
    pub manual: ManualInput,
}

/// Loaded capability instances. Absent ones are `None`.
#[derive(Default)]
pub struct Capabilities {
    pub detector: Option<Box<dyn Detector>>,
    pub segmenter: Option<Box<dyn Segmenter>>,
    pub text_extractor: Option<Box<dyn TextExtractor>>,
}

/// Result of a run that passed validation.
#[derive(Debug, Clone)]
pub enum AnalysisOutcome {
    Completed(Box<AnalysisReport>),
    /// No candidate survived extraction; no rainfall or harvest was computed.
    NoRoofs {
        location: LocationInfo,
        scale: ScaleInfo,
        skipped: Vec<SkippedDetection>,
    },
}

fn check_runoff(coefficient: f64) -> std::result::Result<(), ValidationError> {
    if coefficient > 0.0 && coefficient <= 1.0 {
        Ok(())
    } else {
        Err(ValidationError::InvalidRunoffCoefficient(coefficient))
    }
}

/// Merges OCR values with manual overrides and validates the location.
fn resolve_location(
    request: &AnalysisRequest,
    text_extractor: Option<&dyn TextExtractor>,
) -> std::result::Result<(GeoCoordinate, CameraGeometry), ValidationError> {
    let parsed = match text_extractor {
        Some(extractor) => ocr::read_coordinates(extractor, &request.image),
        None => {
            log::info!("No text extractor; using manual location only");
            ocr::ParsedCoordinates::default()
        }
    };

    let manual = &request.manual;
    let latitude = manual.latitude.or(parsed.latitude);
    let longitude = manual.longitude.or(parsed.longitude);
    let altitude_m = manual.altitude_m.or(parsed.altitude_m);

    let (Some(latitude), Some(longitude)) = (latitude, longitude) else {
        return Err(ValidationError::MissingCoordinates);
    };
    let altitude_m = altitude_m.ok_or(ValidationError::MissingAltitude)?;

    let coord = GeoCoordinate::new(latitude, longitude)?;
    let camera = CameraGeometry::new(altitude_m, request.image.height())?;

    log::info!(
        "Location: {:.6}°, {:.6}°, altitude {:.0} m, scale {:.4} m/px",
        coord.latitude,
        coord.longitude,
        camera.altitude_m,
        camera.meters_per_pixel
    );
    Ok((coord, camera))
}

fn unavailable(e: CapabilityError) -> AnalysisError {
    AnalysisError::CapabilityUnavailable(e.to_string())
}

/// Runs one analysis.
///
/// Fails only on invalid input or a missing detector/segmenter. Segmentation
/// failures are reported in the outcome; precipitation always resolves.
pub fn run<R: Rng + ?Sized>(
    request: &AnalysisRequest,
    capabilities: &Capabilities,
    resolver: &PrecipitationResolver,
    config: &AnalysisConfig,
    rng: &mut R,
) -> Result<AnalysisOutcome> {
    check_runoff(config.runoff_coefficient)?;

    let (coord, camera) = resolve_location(request, capabilities.text_extractor.as_deref())?;
    let location = LocationInfo::new(&coord, &camera);
    let scale = ScaleInfo::from(&camera);

    let detector = capabilities
        .detector
        .as_deref()
        .ok_or_else(|| AnalysisError::CapabilityUnavailable("roof detector".to_string()))?;
    let segmenter = capabilities
        .segmenter
        .as_deref()
        .ok_or_else(|| AnalysisError::CapabilityUnavailable("roof segmenter".to_string()))?;

    let params = ExtractionParams {
        meters_per_pixel: camera.meters_per_pixel,
        confidence_threshold: config.detection.confidence_threshold,
        iou_threshold: config.detection.iou_threshold,
        min_area_m2: config.min_roof_area_m2,
    };
    let extraction =
        roofs::extract(&request.image, detector, segmenter, &params, rng).map_err(unavailable)?;

    if extraction.roofs.is_empty() {
        log::warn!("No roofs detected in the image");
        return Ok(AnalysisOutcome::NoRoofs {
            location,
            scale,
            skipped: extraction.skipped,
        });
    }

    let total_area_m2 = extraction.total_area_m2();
    log::info!(
        "Total roof area: {:.2} m² over {} roofs",
        total_area_m2,
        extraction.roofs.len()
    );

    let precipitation = resolver.resolve(&coord);
    let water_harvest = harvest::estimate(
        total_area_m2,
        precipitation.annual_mm,
        config.runoff_coefficient,
        &config.harvest,
    );

    Ok(AnalysisOutcome::Completed(Box::new(AnalysisReport {
        location,
        scale,
        roofs: extraction.roofs,
        skipped_detections: extraction.skipped,
        precipitation,
        water_harvest,
        configuration: ConfigurationSnapshot::from(config),
        overlay: extraction.overlay,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::precipitation::{DailySeries, PrecipitationSource, TierError, WeatherSource};
    use crate::roofs::{BoundingBox, Segmentation};
    use chrono::NaiveDate;
    use image::{GrayImage, Luma, Rgb};
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    struct FixedBoxes(Vec<BoundingBox>);

    impl Detector for FixedBoxes {
        fn detect(&self, _: &RgbImage, _: f32, _: f32) -> std::result::Result<Vec<BoundingBox>, CapabilityError> {
            Ok(self.0.clone())
        }
    }

    struct BoxFill;

    impl Segmenter for BoxFill {
        fn segment(
            &self,
            image: &RgbImage,
            bbox: &BoundingBox,
        ) -> std::result::Result<Segmentation, CapabilityError> {
            let (w, h) = image.dimensions();
            let mask = GrayImage::from_fn(w, h, |x, y| {
                let inside = x >= bbox.x1 && x < bbox.x2 && y >= bbox.y1 && y < bbox.y2;
                Luma([if inside { 255 } else { 0 }])
            });
            Ok(Segmentation { mask, score: 0.9 })
        }
    }

    struct FixedText(&'static str);

    impl TextExtractor for FixedText {
        fn extract_text(&self, _: &RgbImage) -> std::result::Result<String, CapabilityError> {
            Ok(self.0.to_string())
        }
    }

    /// Archive returns one day of `mm`; `None` makes every request fail.
    struct FixedRain(Option<f64>);

    impl WeatherSource for FixedRain {
        fn archive_daily(
            &self,
            _: &GeoCoordinate,
            _: NaiveDate,
            _: NaiveDate,
        ) -> std::result::Result<DailySeries, TierError> {
            self.0.map(|mm| vec![Some(mm)]).ok_or(TierError::Status(503))
        }

        fn recent_daily(&self, _: &GeoCoordinate, _: u32) -> std::result::Result<DailySeries, TierError> {
            Err(TierError::Status(503))
        }
    }

    fn resolver(rain: Option<f64>) -> PrecipitationResolver {
        let config = AnalysisConfig::default();
        PrecipitationResolver::new(Box::new(FixedRain(rain)), &config.precipitation)
    }

    fn capabilities(boxes: Vec<BoundingBox>) -> Capabilities {
        Capabilities {
            detector: Some(Box::new(FixedBoxes(boxes))),
            segmenter: Some(Box::new(BoxFill)),
            text_extractor: None,
        }
    }

    fn manual(latitude: f64, longitude: f64, altitude_m: f64) -> ManualInput {
        ManualInput {
            latitude: Some(latitude),
            longitude: Some(longitude),
            altitude_m: Some(altitude_m),
        }
    }

    fn request(manual: ManualInput) -> AnalysisRequest {
        AnalysisRequest {
            image: RgbImage::from_pixel(600, 600, Rgb([80, 80, 80])),
            manual,
        }
    }

    fn run_default(
        request: &AnalysisRequest,
        capabilities: &Capabilities,
        resolver: &PrecipitationResolver,
    ) -> Result<AnalysisOutcome> {
        run(
            request,
            capabilities,
            resolver,
            &AnalysisConfig::default(),
            &mut StdRng::seed_from_u64(42),
        )
    }

    #[test]
    fn test_end_to_end_single_roof() {
        // 60 m over 600 px = 0.1 m/px; a 500x500 mask is 2500 m²
        let req = request(manual(28.6, 77.2, 60.0));
        let caps = capabilities(vec![BoundingBox::new(50, 50, 550, 550).unwrap()]);

        let outcome = run_default(&req, &caps, &resolver(Some(1000.0))).unwrap();
        let AnalysisOutcome::Completed(report) = outcome else {
            panic!("expected a completed run");
        };

        assert_eq!(report.roofs.len(), 1);
        assert!((report.roofs[0].area_m2 - 2500.0).abs() < 1e-6);
        assert_eq!(report.precipitation.source, PrecipitationSource::LiveArchive);
        assert!((report.precipitation.annual_mm - 1000.0).abs() < 1e-9);
        assert!((report.water_harvest.harvestable_liters - 2_000_000.0).abs() < 1e-3);
        assert!((report.scale.meters_per_pixel - 0.1).abs() < 1e-12);
        assert_eq!(report.location.camera_altitude_m, 60.0);
        assert_eq!(report.configuration.runoff_coefficient, 0.8);
    }

    #[test]
    fn test_offline_run_uses_regional_table() {
        let req = request(manual(28.6, 77.2, 60.0));
        let caps = capabilities(vec![BoundingBox::new(0, 0, 100, 100).unwrap()]);

        let AnalysisOutcome::Completed(report) = run_default(&req, &caps, &resolver(None)).unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(report.precipitation.source, PrecipitationSource::FallbackRegional);
        assert_eq!(report.precipitation.annual_mm, 790.0);
    }

    #[test]
    fn test_no_roofs_outcome() {
        let req = request(manual(28.6, 77.2, 60.0));
        let caps = capabilities(vec![]);

        let outcome = run_default(&req, &caps, &resolver(Some(1000.0))).unwrap();
        match outcome {
            AnalysisOutcome::NoRoofs { skipped, scale, .. } => {
                assert!(skipped.is_empty());
                assert_eq!(scale.image_height_px, 600);
            }
            AnalysisOutcome::Completed(_) => panic!("expected NoRoofs"),
        }
    }

    #[test]
    fn test_ocr_values_used_and_manual_overrides_win() {
        let req = request(ManualInput {
            altitude_m: Some(120.0),
            ..ManualInput::default()
        });
        let caps = Capabilities {
            text_extractor: Some(Box::new(FixedText("12.971600, 77.594600 camera: 300 m"))),
            ..capabilities(vec![BoundingBox::new(0, 0, 300, 300).unwrap()])
        };

        let AnalysisOutcome::Completed(report) = run_default(&req, &caps, &resolver(None)).unwrap() else {
            panic!("expected a completed run");
        };
        assert_eq!(report.location.latitude, 12.9716);
        assert_eq!(report.location.longitude, 77.5946);
        assert_eq!(report.location.camera_altitude_m, 120.0);
        assert_eq!(report.precipitation.region.as_deref(), Some("Bangalore"));
    }

    #[test]
    fn test_missing_location_fields() {
        let caps = capabilities(vec![]);
        let no_coords = request(ManualInput {
            altitude_m: Some(100.0),
            ..ManualInput::default()
        });
        assert!(matches!(
            run_default(&no_coords, &caps, &resolver(None)),
            Err(AnalysisError::Validation(ValidationError::MissingCoordinates))
        ));

        let no_altitude = request(ManualInput {
            latitude: Some(10.0),
            longitude: Some(10.0),
            altitude_m: None,
        });
        assert!(matches!(
            run_default(&no_altitude, &caps, &resolver(None)),
            Err(AnalysisError::Validation(ValidationError::MissingAltitude))
        ));
    }

    #[test]
    fn test_invalid_inputs_rejected() {
        let caps = capabilities(vec![]);
        assert!(matches!(
            run_default(&request(manual(91.0, 0.0, 100.0)), &caps, &resolver(None)),
            Err(AnalysisError::Validation(ValidationError::LatitudeOutOfRange(_)))
        ));
        assert!(matches!(
            run_default(&request(manual(0.0, 0.0, 0.0)), &caps, &resolver(None)),
            Err(AnalysisError::Validation(ValidationError::NonPositiveAltitude(_)))
        ));

        let config = AnalysisConfig {
            runoff_coefficient: 1.5,
            ..AnalysisConfig::default()
        };
        let result = run(
            &request(manual(0.0, 0.0, 100.0)),
            &caps,
            &resolver(None),
            &config,
            &mut StdRng::seed_from_u64(0),
        );
        assert!(matches!(
            result,
            Err(AnalysisError::Validation(ValidationError::InvalidRunoffCoefficient(_)))
        ));
    }

    #[test]
    fn test_missing_capability() {
        let req = request(manual(28.6, 77.2, 60.0));
        let caps = Capabilities {
            segmenter: None,
            ..capabilities(vec![])
        };
        assert!(matches!(
            run_default(&req, &caps, &resolver(None)),
            Err(AnalysisError::CapabilityUnavailable(_))
        ));
    }
}
