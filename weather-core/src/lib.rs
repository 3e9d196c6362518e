//! Core library for the `cityweather` app.
//!
//! This crate defines:
//! - City name → coordinates resolution (Wikipedia map links)
//! - Hourly forecast fetching and day bucketing (Open-Meteo)
//! - The service that chains the two behind one error message
//! - Supporting state: configuration, recent cities, encrypted user ids and
//!   search history
//!
//! It is used by `cityweather-cli`, but can also be reused by other binaries or services.

pub mod config;
pub mod error;
pub mod forecast;
pub mod history;
pub mod http;
pub mod identity;
pub mod locale;
pub mod model;
pub mod resolver;
pub mod service;
pub mod session;

pub use config::Config;
pub use error::{FetchError, HttpError, IdentityError, ResolveError};
pub use forecast::{ForecastFetcher, OpenMeteoFetcher};
pub use history::{CityCount, SearchHistoryStore};
pub use identity::IdentityCipher;
pub use locale::Locale;
pub use model::{
    Coordinates, DailyForecast, FailureKind, ForecastAnswer, ForecastOutcome, HourSummary,
    HourlySample,
};
pub use resolver::{CoordinateResolver, WikipediaResolver};
pub use service::ForecastService;
