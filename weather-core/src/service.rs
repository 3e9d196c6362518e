use std::sync::Arc;

use crate::{
    config::Config,
    error::HttpError,
    forecast::{ForecastFetcher, OpenMeteoFetcher},
    http::{
        CachingClient, HttpClient, ReqwestClient, RetryingClient,
        cache::{CacheStore, MemoryCacheStore},
    },
    locale::Locale,
    model::{FailureKind, ForecastAnswer, ForecastOutcome},
    resolver::{CoordinateResolver, WikipediaResolver},
};

/// City name in, forecast or a single localized error out.
#[derive(Debug, Clone)]
pub struct ForecastService {
    resolver: Arc<dyn CoordinateResolver>,
    fetcher: Arc<dyn ForecastFetcher>,
    locale: Locale,
    days: u32,
}

impl ForecastService {
    pub fn new(
        resolver: Arc<dyn CoordinateResolver>,
        fetcher: Arc<dyn ForecastFetcher>,
        locale: Locale,
        days: u32,
    ) -> Self {
        Self { resolver, fetcher, locale, days }
    }

    /// Wires the Wikipedia resolver and the cached, retrying Open-Meteo fetcher.
    ///
    /// Forecast responses are cached in memory for the life of the service.
    pub fn from_config(config: &Config) -> Result<Self, HttpError> {
        Self::with_cache_store(config, Box::new(MemoryCacheStore::new()))
    }

    /// Like [`ForecastService::from_config`], caching forecasts in `store`.
    pub fn with_cache_store(config: &Config, store: Box<dyn CacheStore>) -> Result<Self, HttpError> {
        let raw = Arc::new(ReqwestClient::new(config.request_timeout())?);

        // Page lookups get exactly one attempt.
        let resolver = WikipediaResolver::new(raw.clone(), config.wiki_base_url.as_str());

        let forecast_http: Arc<dyn HttpClient> = Arc::new(RetryingClient::new(
            CachingClient::with_store(raw, config.cache_ttl(), store),
            config.retry,
        ));
        let fetcher = OpenMeteoFetcher::new(forecast_http, config.forecast_url.as_str(), config.locale);

        Ok(Self::new(Arc::new(resolver), Arc::new(fetcher), config.locale, config.forecast_days()))
    }

    pub fn locale(&self) -> Locale {
        self.locale
    }

    /// Runs the pipeline and reports which stage failed, if any.
    pub async fn lookup(&self, city_name: &str) -> ForecastOutcome {
        if city_name.is_empty() {
            return ForecastOutcome::Failure(FailureKind::EmptyInput);
        }

        let coords = match self.resolver.resolve(city_name).await {
            Ok(coords) => coords,
            Err(err) => {
                tracing::error!(city = city_name, error = %err, "could not resolve city coordinates");
                return ForecastOutcome::Failure(err.kind());
            }
        };

        match self.fetcher.fetch(coords, self.days).await {
            Ok(days) => ForecastOutcome::Success(days),
            Err(err) => {
                tracing::error!(city = city_name, %coords, error = %err, "could not fetch forecast");
                ForecastOutcome::Failure(FailureKind::Fetch)
            }
        }
    }

    /// Same pipeline, collapsed to `{error, data}`: every failure shares one message.
    pub async fn get_forecast(&self, city_name: &str) -> ForecastAnswer {
        match self.lookup(city_name).await {
            ForecastOutcome::Success(days) => ForecastAnswer::success(days),
            ForecastOutcome::Failure(kind) => {
                ForecastAnswer::failure(self.locale.not_found_message(), kind)
            }
        }
    }
}
