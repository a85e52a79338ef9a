//! Static rainfall table used when no live source answers.

use serde::{Deserialize, Serialize};

use crate::geo::GeoCoordinate;

/// A latitude/longitude rectangle with its typical annual rainfall.
/// Bounds are inclusive.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionEntry {
    pub name: String,
    pub lat_min: f64,
    pub lat_max: f64,
    pub lon_min: f64,
    pub lon_max: f64,
    pub annual_mm: f64,
}

impl RegionEntry {
    fn new(name: &str, lat: (f64, f64), lon: (f64, f64), annual_mm: f64) -> Self {
        Self {
            name: name.to_string(),
            lat_min: lat.0,
            lat_max: lat.1,
            lon_min: lon.0,
            lon_max: lon.1,
            annual_mm,
        }
    }

    pub fn contains(&self, coord: &GeoCoordinate) -> bool {
        (self.lat_min..=self.lat_max).contains(&coord.latitude)
            && (self.lon_min..=self.lon_max).contains(&coord.longitude)
    }
}

/// Major Indian metro areas with long-run average rainfall.
pub fn default_regions() -> Vec<RegionEntry> {
    vec![
        RegionEntry::new("Delhi", (28.4, 28.9), (76.8, 77.3), 790.0),
        RegionEntry::new("Mumbai", (18.9, 19.3), (72.7, 73.0), 2400.0),
        RegionEntry::new("Bangalore", (12.8, 13.1), (77.4, 77.7), 970.0),
        RegionEntry::new("Chennai", (13.0, 13.2), (80.1, 80.3), 1400.0),
        RegionEntry::new("Kolkata", (22.4, 22.7), (88.2, 88.5), 1580.0),
        RegionEntry::new("Hyderabad", (17.3, 17.5), (78.3, 78.6), 800.0),
        RegionEntry::new("Ahmedabad", (23.0, 23.2), (72.5, 72.7), 800.0),
        RegionEntry::new("Jaipur", (26.8, 26.9), (75.7, 75.9), 650.0),
    ]
}

/// Returns the first entry whose rectangle contains the coordinate.
pub fn lookup<'a>(regions: &'a [RegionEntry], coord: &GeoCoordinate) -> Option<&'a RegionEntry> {
    regions.iter().find(|region| region.contains(coord))
}
