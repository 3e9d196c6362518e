use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// A point on Earth, as scraped from a city article.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinates {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }
}

impl std::fmt::Display for Coordinates {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.latitude, self.longitude)
    }
}

/// One raw measurement from the forecast provider. Values are not rounded.
#[derive(Debug, Clone, PartialEq)]
pub struct HourlySample {
    pub timestamp: DateTime<Utc>,
    pub temperature: f64,
    pub humidity: f64,
    pub windspeed: f64,
}

/// Rounded view of a single hour, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourSummary {
    /// Zero-padded 24-hour "HH:MM".
    pub time: String,
    pub temperature: f64,
    pub humidity: f64,
    pub windspeed: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// Serialized as "YYYY-MM-DD".
    pub date: NaiveDate,
    pub weekday: String,
    pub hours: Vec<HourSummary>,
}

/// Why a lookup produced no forecast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    EmptyInput,
    NotFound,
    Network,
    Parse,
    Fetch,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::EmptyInput => "empty_input",
            FailureKind::NotFound => "not_found",
            FailureKind::Network => "network",
            FailureKind::Parse => "parse",
            FailureKind::Fetch => "fetch",
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ForecastOutcome {
    Success(Vec<DailyForecast>),
    Failure(FailureKind),
}

impl ForecastOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, ForecastOutcome::Success(_))
    }
}

/// Service-level answer: exactly one of `error` / `data` is populated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAnswer {
    pub error: Option<String>,
    pub data: Option<Vec<DailyForecast>>,
    /// Underlying failure, kept out of the serialized answer.
    #[serde(skip)]
    pub cause: Option<FailureKind>,
}

impl ForecastAnswer {
    pub fn success(data: Vec<DailyForecast>) -> Self {
        Self { error: None, data: Some(data), cause: None }
    }

    pub fn failure(message: impl Into<String>, cause: FailureKind) -> Self {
        Self { error: Some(message.into()), data: None, cause: Some(cause) }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Rounds to one decimal place, ties to even.
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round_ties_even() / 10.0
}
