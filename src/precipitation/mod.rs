//! Annual precipitation for a site.
//!
//! Resolution walks four tiers and stops at the first that answers:
//! - live archive: trailing year of daily totals, summed
//! - live recent series: last few months, extrapolated linearly to a year
//! - regional table: first rectangle containing the site
//! - global default
//!
//! A tier failure is logged and the next tier is tried. Resolution itself
//! never fails.

pub mod open_meteo;
pub mod regions;

pub use open_meteo::OpenMeteoSource;

use chrono::{Duration, NaiveDate, Utc};
use serde::Serialize;
use thiserror::Error;

use crate::config::PrecipitationConfig;
use crate::geo::GeoCoordinate;
use regions::RegionEntry;

const DAYS_PER_YEAR: f64 = 365.0;

/// Daily precipitation in mm; `None` marks a missing day.
pub type DailySeries = Vec<Option<f64>>;

/// Why a single live tier produced no value.
#[derive(Error, Debug)]
pub enum TierError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(u16),

    #[error("malformed response: {0}")]
    Malformed(String),

    #[error("series contains no data")]
    EmptySeries,

    #[error("series total {0} mm is not positive")]
    NonPositiveTotal(f64),

    #[error("archive window of {0} days is out of range")]
    InvalidWindow(i64),
}

/// A network service returning daily precipitation series.
pub trait WeatherSource: Send + Sync {
    /// Daily totals for `start..=end`.
    fn archive_daily(
        &self,
        coord: &GeoCoordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, TierError>;

    /// Daily totals for the most recent `past_days` days.
    fn recent_daily(&self, coord: &GeoCoordinate, past_days: u32) -> Result<DailySeries, TierError>;
}

/// Where an estimate came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecipitationSource {
    LiveArchive,
    LiveForecastExtrapolated,
    FallbackRegional,
    FallbackGlobal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Confidence {
    High,
    Medium,
    Low,
    VeryLow,
}

impl PrecipitationSource {
    pub fn confidence(self) -> Confidence {
        match self {
            Self::LiveArchive => Confidence::High,
            Self::LiveForecastExtrapolated => Confidence::Medium,
            Self::FallbackRegional => Confidence::Low,
            Self::FallbackGlobal => Confidence::VeryLow,
        }
    }

    pub fn is_live(self) -> bool {
        matches!(self, Self::LiveArchive | Self::LiveForecastExtrapolated)
    }
}

/// Annual precipitation with its provenance.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrecipitationEstimate {
    pub annual_mm: f64,
    pub source: PrecipitationSource,
    pub confidence: Confidence,
    /// Matched table entry for regional fallbacks
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
}

impl PrecipitationEstimate {
    fn new(annual_mm: f64, source: PrecipitationSource) -> Self {
        Self {
            annual_mm,
            source,
            confidence: source.confidence(),
            region: None,
        }
    }
}

/// Sum and count of the non-missing values in a series.
pub fn sum_valid(series: &[Option<f64>]) -> (f64, usize) {
    series
        .iter()
        .flatten()
        .fold((0.0, 0), |(sum, count), value| (sum + value, count + 1))
}

/// Validated sum and valid-day count of a live series.
///
/// Negative or non-finite daily values make the series malformed. A series
/// without valid days, or whose total is not positive, cannot answer a tier.
pub fn live_total(series: &[Option<f64>]) -> Result<(f64, usize), TierError> {
    if let Some(bad) = series.iter().flatten().find(|v| !v.is_finite() || **v < 0.0) {
        return Err(TierError::Malformed(format!("invalid daily value {}", bad)));
    }

    let (sum, valid_days) = sum_valid(series);
    if valid_days == 0 {
        return Err(TierError::EmptySeries);
    }
    if sum <= 0.0 {
        return Err(TierError::NonPositiveTotal(sum));
    }
    Ok((sum, valid_days))
}

/// Scales a partial-year total to 365 days assuming a constant daily rate.
pub fn extrapolate_annual(sum_mm: f64, valid_days: usize) -> f64 {
    sum_mm * (DAYS_PER_YEAR / valid_days as f64)
}

/// Resolves annual precipitation through the tier chain.
pub struct PrecipitationResolver {
    source: Box<dyn WeatherSource>,
    historical_days: i64,
    recent_days: u32,
    regions: Vec<RegionEntry>,
    global_default_mm: f64,
}

impl PrecipitationResolver {
    pub fn new(source: Box<dyn WeatherSource>, config: &PrecipitationConfig) -> Self {
        Self {
            source,
            historical_days: config.historical_days,
            recent_days: config.recent_days,
            regions: config.regions.clone(),
            global_default_mm: config.global_default_mm,
        }
    }

    /// Resolves the estimate for a site using today's UTC date.
    pub fn resolve(&self, coord: &GeoCoordinate) -> PrecipitationEstimate {
        self.resolve_on(coord, Utc::now().date_naive())
    }

    /// Resolves the estimate with the archive window ending on `today`.
    pub fn resolve_on(&self, coord: &GeoCoordinate, today: NaiveDate) -> PrecipitationEstimate {
        let estimate = self
            .archive_tier(coord, today)
            .or_else(|| self.recent_tier(coord))
            .or_else(|| self.regional_tier(coord))
            .unwrap_or_else(|| self.global_tier());

        log::info!(
            "Precipitation: {:.1} mm/year from {:?}",
            estimate.annual_mm,
            estimate.source
        );
        estimate
    }

    fn archive_tier(&self, coord: &GeoCoordinate, today: NaiveDate) -> Option<PrecipitationEstimate> {
        let start = Duration::try_days(self.historical_days)
            .and_then(|window| today.checked_sub_signed(window))
            .ok_or(TierError::InvalidWindow(self.historical_days))
            .map_err(|e| log::warn!("Archive request skipped: {}", e))
            .ok()?;
        log::info!("Fetching precipitation archive {} to {}", start, today);

        let (sum, _) = self
            .source
            .archive_daily(coord, start, today)
            .and_then(|series| live_total(&series))
            .map_err(|e| log::warn!("Archive tier failed: {}", e))
            .ok()?;

        Some(PrecipitationEstimate::new(sum, PrecipitationSource::LiveArchive))
    }

    fn recent_tier(&self, coord: &GeoCoordinate) -> Option<PrecipitationEstimate> {
        log::info!("Fetching last {} days of precipitation", self.recent_days);

        let (sum, valid_days) = self
            .source
            .recent_daily(coord, self.recent_days)
            .and_then(|series| live_total(&series))
            .map_err(|e| log::warn!("Recent series tier failed: {}", e))
            .ok()?;

        Some(PrecipitationEstimate::new(
            extrapolate_annual(sum, valid_days),
            PrecipitationSource::LiveForecastExtrapolated,
        ))
    }

    fn regional_tier(&self, coord: &GeoCoordinate) -> Option<PrecipitationEstimate> {
        log::warn!("Could not fetch live data. Using regional rainfall estimates.");

        let region = regions::lookup(&self.regions, coord)?;
        let mut estimate =
            PrecipitationEstimate::new(region.annual_mm, PrecipitationSource::FallbackRegional);
        estimate.region = Some(region.name.clone());
        Some(estimate)
    }

    fn global_tier(&self) -> PrecipitationEstimate {
        log::warn!("No regional match. Using global average rainfall.");
        PrecipitationEstimate::new(self.global_default_mm, PrecipitationSource::FallbackGlobal)
    }
}
