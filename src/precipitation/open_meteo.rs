//! Open-Meteo client for daily precipitation series.

use chrono::NaiveDate;
use reqwest::blocking::{Client, RequestBuilder};
use serde::Deserialize;
use std::time::Duration;

use super::{DailySeries, TierError, WeatherSource};
use crate::config::PrecipitationConfig;
use crate::geo::GeoCoordinate;

const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct DailyResponse {
    daily: Option<DailyBlock>,
}

#[derive(Debug, Deserialize)]
struct DailyBlock {
    precipitation_sum: Option<Vec<Option<f64>>>,
}

/// Blocking HTTP source for the archive and forecast endpoints.
pub struct OpenMeteoSource {
    client: Client,
    archive_url: String,
    forecast_url: String,
    user_agent: String,
    timeout: Duration,
}

impl OpenMeteoSource {
    pub fn new(config: &PrecipitationConfig) -> Result<Self, reqwest::Error> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            archive_url: config.archive_url.clone(),
            forecast_url: config.forecast_url.clone(),
            user_agent: config.user_agent.clone(),
            timeout,
        })
    }

    fn request(&self, url: &str, query: &[(&str, String)]) -> RequestBuilder {
        self.client
            .get(url)
            .query(query)
            .timeout(self.timeout)
            .header("User-Agent", self.user_agent.as_str())
            .header("Accept", "application/json")
    }

    fn fetch(&self, url: &str, query: &[(&str, String)]) -> Result<DailySeries, TierError> {
        let response = self.request(url, query).send()?;

        if !response.status().is_success() {
            return Err(TierError::Status(response.status().as_u16()));
        }

        let body = response.text()?;
        parse_daily_series(&body)
    }
}

/// Query for daily totals over `start..=end` from the archive endpoint.
pub fn archive_query(coord: &GeoCoordinate, start: NaiveDate, end: NaiveDate) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coord.latitude.to_string()),
        ("longitude", coord.longitude.to_string()),
        ("start_date", start.format(DATE_FORMAT).to_string()),
        ("end_date", end.format(DATE_FORMAT).to_string()),
        ("daily", "precipitation_sum".to_string()),
        ("timezone", "UTC".to_string()),
    ]
}

/// Query for the last `past_days` observed days from the forecast endpoint.
pub fn recent_query(coord: &GeoCoordinate, past_days: u32) -> Vec<(&'static str, String)> {
    vec![
        ("latitude", coord.latitude.to_string()),
        ("longitude", coord.longitude.to_string()),
        ("daily", "precipitation_sum".to_string()),
        ("past_days", past_days.to_string()),
        // Observed days only, no forecast tail
        ("forecast_days", "0".to_string()),
        ("timezone", "UTC".to_string()),
    ]
}

impl WeatherSource for OpenMeteoSource {
    fn archive_daily(
        &self,
        coord: &GeoCoordinate,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<DailySeries, TierError> {
        self.fetch(&self.archive_url, &archive_query(coord, start, end))
    }

    fn recent_daily(&self, coord: &GeoCoordinate, past_days: u32) -> Result<DailySeries, TierError> {
        self.fetch(&self.forecast_url, &recent_query(coord, past_days))
    }
}

/// Extracts `daily.precipitation_sum` from a response body.
///
/// Null entries are kept as `None` (missing days). A missing field is
/// malformed; an empty array is an empty series.
pub fn parse_daily_series(body: &str) -> Result<DailySeries, TierError> {
    let response: DailyResponse =
        serde_json::from_str(body).map_err(|e| TierError::Malformed(e.to_string()))?;

    let series = response
        .daily
        .and_then(|daily| daily.precipitation_sum)
        .ok_or_else(|| TierError::Malformed("missing daily.precipitation_sum".to_string()))?;

    if series.is_empty() {
        return Err(TierError::EmptySeries);
    }

    Ok(series)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn delhi() -> GeoCoordinate {
        GeoCoordinate::new(28.6139, 77.209).unwrap()
    }

    fn pairs(query: &[(&str, String)]) -> Vec<(String, String)> {
        query.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn test_archive_query() {
        let start = NaiveDate::from_ymd_opt(2025, 10, 19).unwrap();
        let end = NaiveDate::from_ymd_opt(2026, 10, 19).unwrap();
        let query = pairs(&archive_query(&delhi(), start, end));

        assert!(query.contains(&("latitude".into(), "28.6139".into())));
        assert!(query.contains(&("longitude".into(), "77.209".into())));
        assert!(query.contains(&("start_date".into(), "2025-10-19".into())));
        assert!(query.contains(&("end_date".into(), "2026-10-19".into())));
        assert!(query.contains(&("daily".into(), "precipitation_sum".into())));
        assert!(query.contains(&("timezone".into(), "UTC".into())));
    }

    #[test]
    fn test_recent_query() {
        let query = pairs(&recent_query(&delhi(), 92));

        assert!(query.contains(&("past_days".into(), "92".into())));
        assert!(query.contains(&("forecast_days".into(), "0".into())));
        assert!(query.contains(&("daily".into(), "precipitation_sum".into())));
        assert!(query.contains(&("timezone".into(), "UTC".into())));
        assert!(!query.iter().any(|(k, _)| k == "start_date"));
    }

    #[test]
    fn test_request_headers_and_timeout() {
        let config = PrecipitationConfig {
            timeout_secs: 7,
            ..PrecipitationConfig::default()
        };
        let source = OpenMeteoSource::new(&config).unwrap();

        let request = source
            .request(&config.forecast_url, &recent_query(&delhi(), 92))
            .build()
            .unwrap();

        assert_eq!(request.url().host_str(), Some("api.open-meteo.com"));
        assert_eq!(request.url().path(), "/v1/forecast");
        let query: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert!(query.contains(&("past_days".to_string(), "92".to_string())));
        assert!(query.contains(&("forecast_days".to_string(), "0".to_string())));
        assert_eq!(
            request.headers().get("User-Agent").unwrap(),
            config.user_agent.as_str()
        );
        assert_eq!(request.headers().get("Accept").unwrap(), "application/json");
        assert_eq!(request.timeout(), Some(&Duration::from_secs(7)));
    }

    #[test]
    fn test_parse_daily_series() {
        let body = r#"{
            "latitude": 28.625,
            "longitude": 77.25,
            "daily_units": { "time": "iso8601", "precipitation_sum": "mm" },
            "daily": {
                "time": ["2026-01-01", "2026-01-02", "2026-01-03"],
                "precipitation_sum": [0.0, 12.5, null]
            }
        }"#;
        let series = parse_daily_series(body).unwrap();
        assert_eq!(series, vec![Some(0.0), Some(12.5), None]);
    }

    #[test]
    fn test_parse_missing_daily_block() {
        let body = r#"{ "error": true, "reason": "Parameter 'start_date' is out of range" }"#;
        assert!(matches!(parse_daily_series(body), Err(TierError::Malformed(_))));
    }

    #[test]
    fn test_parse_missing_series_field() {
        let body = r#"{ "daily": { "time": ["2026-01-01"] } }"#;
        assert!(matches!(parse_daily_series(body), Err(TierError::Malformed(_))));
    }

    #[test]
    fn test_parse_empty_series() {
        let body = r#"{ "daily": { "time": [], "precipitation_sum": [] } }"#;
        assert!(matches!(parse_daily_series(body), Err(TierError::EmptySeries)));
    }

    #[test]
    fn test_parse_not_json() {
        assert!(matches!(
            parse_daily_series("<html>502 Bad Gateway</html>"),
            Err(TierError::Malformed(_))
        ));
    }
}
