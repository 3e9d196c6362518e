use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde::Deserialize;
use std::sync::Arc;

use crate::{
    error::FetchError,
    http::{HttpClient, HttpRequest, truncate_body},
    locale::Locale,
    model::{Coordinates, DailyForecast},
};

use super::{ForecastFetcher, MAX_FORECAST_DAYS, TimeAxis, bucket_by_day, build_samples};

pub const DEFAULT_FORECAST_URL: &str = "https://api.open-meteo.com/v1/forecast";

const HOURLY_FIELDS: &str = "temperature_2m,relativehumidity_2m,windspeed_10m";

/// Open-Meteo hourly forecast client.
///
/// The caching and retry behavior comes from the `HttpClient` it is given.
#[derive(Debug, Clone)]
pub struct OpenMeteoFetcher {
    http: Arc<dyn HttpClient>,
    url: String,
    locale: Locale,
}

impl OpenMeteoFetcher {
    pub fn new(http: Arc<dyn HttpClient>, url: impl Into<String>, locale: Locale) -> Self {
        Self { http, url: url.into(), locale }
    }

    pub fn request(&self, coords: Coordinates, days: u32) -> HttpRequest {
        HttpRequest::get(&self.url)
            .param("latitude", coords.latitude)
            .param("longitude", coords.longitude)
            .param("hourly", HOURLY_FIELDS)
            .param("forecast_days", days)
            .param("timeformat", "unixtime")
    }
}

#[async_trait]
impl ForecastFetcher for OpenMeteoFetcher {
    async fn fetch(&self, coords: Coordinates, days: u32) -> Result<Vec<DailyForecast>, FetchError> {
        if days == 0 {
            return Ok(Vec::new());
        }
        let days = days.min(MAX_FORECAST_DAYS);
        let res = self.http.execute(&self.request(coords, days)).await?;

        if !res.is_success() {
            return Err(FetchError::Status { status: res.status, body: truncate_body(&res.body) });
        }

        let forecasts = parse_forecast(&res.body, days as usize, self.locale)?;
        tracing::debug!(%coords, days = forecasts.len(), "forecast fetched");
        Ok(forecasts)
    }
}

#[derive(Debug, Deserialize)]
struct OmResponse {
    hourly: OmHourly,
}

#[derive(Debug, Deserialize)]
struct OmHourly {
    time: Vec<i64>,
    temperature_2m: Vec<f64>,
    #[serde(alias = "relative_humidity_2m")]
    relativehumidity_2m: Vec<f64>,
    #[serde(alias = "wind_speed_10m")]
    windspeed_10m: Vec<f64>,
}

/// Decodes an Open-Meteo JSON body into at most `days` daily forecasts.
pub fn parse_forecast(body: &str, days: usize, locale: Locale) -> Result<Vec<DailyForecast>, FetchError> {
    let parsed: OmResponse = serde_json::from_str(body)
        .map_err(|e| FetchError::Malformed(format!("failed to parse forecast JSON: {e}")))?;
    let hourly = parsed.hourly;

    let axis = time_axis(&hourly.time)?;
    let samples = build_samples(
        &axis,
        &hourly.temperature_2m,
        &hourly.relativehumidity_2m,
        &hourly.windspeed_10m,
    )?;

    Ok(bucket_by_day(&samples, days, locale))
}

/// Recovers the provider's `[start, end)` grid from the unix-time column.
fn time_axis(time: &[i64]) -> Result<TimeAxis, FetchError> {
    let (first, last) = match (time.first(), time.last()) {
        (Some(first), Some(last)) => (*first, *last),
        _ => return Err(FetchError::Malformed("forecast has no hourly samples".into())),
    };

    let step = match time.get(1) {
        Some(second) => gap(first, *second)?,
        None => 3600,
    };

    for pair in time.windows(2) {
        if gap(pair[0], pair[1])? != step {
            return Err(FetchError::Malformed(format!(
                "non-uniform time axis: {} -> {} (expected step {step}s)",
                pair[0], pair[1]
            )));
        }
    }

    let start = unix_to_utc(first)?;
    let end = last
        .checked_add(step)
        .ok_or_else(|| FetchError::Malformed(format!("time axis overflows after {last}")))
        .and_then(unix_to_utc)?;
    let interval = Duration::try_seconds(step)
        .ok_or_else(|| FetchError::Malformed(format!("time step {step}s out of range")))?;
    TimeAxis::new(start, end, interval)
}

fn gap(from: i64, to: i64) -> Result<i64, FetchError> {
    to.checked_sub(from)
        .ok_or_else(|| FetchError::Malformed(format!("time step {from} -> {to} overflows")))
}

fn unix_to_utc(ts: i64) -> Result<DateTime<Utc>, FetchError> {
    DateTime::<Utc>::from_timestamp(ts, 0)
        .ok_or_else(|| FetchError::Malformed(format!("timestamp {ts} out of range")))
}
