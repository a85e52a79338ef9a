use anyhow::Result;
use regex::Regex;

/// Signed decimal pair with at least four fractional digits each, separated
/// by a comma or whitespace. The first number is taken as latitude.
const DECIMAL_PAIR_PATTERN: &str = r"(-?\d+\.\d{4,})\s*[,\s]\s*(-?\d+\.\d{4,})";

/// Altitude keyword followed by a 2-5 digit integer in meters.
/// Matches overlays such as "Eye alt 232 m" or "Camera: 1200 m".
const ALTITUDE_PATTERN: &str = r"(?i)(?:eye\s+alt|camera|altitude|elev)[:\s]*(\d{2,5})\s*m";

/// Values recovered from OCR text. Each field is independently optional;
/// a missing value means the caller should fall back to manual input.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ParsedCoordinates {
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub altitude_m: Option<f64>,
}

impl ParsedCoordinates {
    pub fn is_complete(&self) -> bool {
        self.latitude.is_some() && self.longitude.is_some() && self.altitude_m.is_some()
    }
}

/// Extracts latitude, longitude and camera altitude from free-form text.
///
/// Only the first decimal pair and the first altitude match are used. Nothing
/// found is not an error. The pair is taken in textual order without range
/// checks; validation happens when the coordinate is built.
pub fn parse_coordinates(text: &str) -> Result<ParsedCoordinates> {
    let pair_regex = Regex::new(DECIMAL_PAIR_PATTERN)?;
    let altitude_regex = Regex::new(ALTITUDE_PATTERN)?;

    let mut parsed = ParsedCoordinates::default();

    if let Some(caps) = pair_regex.captures(text) {
        let lat = caps[1].parse::<f64>().ok();
        let lon = caps[2].parse::<f64>().ok();
        if let (Some(lat), Some(lon)) = (lat, lon) {
            parsed.latitude = Some(lat);
            parsed.longitude = Some(lon);
        }
    }

    if let Some(caps) = altitude_regex.captures(text) {
        parsed.altitude_m = caps[1].parse::<f64>().ok();
    }

    Ok(parsed)
}
