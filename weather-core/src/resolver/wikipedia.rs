use async_trait::async_trait;
use scraper::{Html, Selector};
use std::sync::Arc;

use crate::{
    error::ResolveError,
    http::{HttpClient, HttpRequest, truncate_body},
    model::Coordinates,
};

use super::CoordinateResolver;

pub const DEFAULT_BASE_URL: &str = "https://ru.wikipedia.org";

/// Marker left on city articles by the Kartographer map widget.
const MAPLINK_SELECTOR: &str = "a.mw-kartographer-maplink";

/// Reads coordinates from the map link embedded in a Wikipedia article.
///
/// A single attempt per call: no retries and no caching.
#[derive(Debug, Clone)]
pub struct WikipediaResolver {
    http: Arc<dyn HttpClient>,
    base_url: String,
}

impl WikipediaResolver {
    pub fn new(http: Arc<dyn HttpClient>, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn article_url(&self, city_name: &str) -> String {
        format!("{}/wiki/{}", self.base_url, urlencoding::encode(city_name))
    }
}

#[async_trait]
impl CoordinateResolver for WikipediaResolver {
    async fn resolve(&self, city_name: &str) -> Result<Coordinates, ResolveError> {
        let url = self.article_url(city_name);

        let res = self
            .http
            .execute(&HttpRequest::get(&url))
            .await
            .map_err(|e| ResolveError::Network(e.to_string()))?;

        if !res.is_success() {
            return Err(ResolveError::Network(format!(
                "{url} answered with status {}: {}",
                res.status,
                truncate_body(&res.body),
            )));
        }

        let coords = extract_coordinates(&res.body, city_name)?;
        tracing::debug!(city = city_name, %coords, "resolved city");
        Ok(coords)
    }
}

/// Pulls `data-lat` / `data-lon` off the first map link in `html`.
pub fn extract_coordinates(html: &str, city_name: &str) -> Result<Coordinates, ResolveError> {
    let selector = Selector::parse(MAPLINK_SELECTOR)
        .map_err(|e| ResolveError::Parse(format!("bad selector: {e}")))?;
    let document = Html::parse_document(html);

    let maplink = document
        .select(&selector)
        .next()
        .ok_or_else(|| ResolveError::NotFound(city_name.to_string()))?;

    let latitude = parse_attr(maplink.value().attr("data-lat"), "data-lat")?;
    let longitude = parse_attr(maplink.value().attr("data-lon"), "data-lon")?;

    Ok(Coordinates { latitude, longitude })
}

fn parse_attr(raw: Option<&str>, name: &str) -> Result<f64, ResolveError> {
    let raw = raw
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ResolveError::Parse(format!("missing {name} attribute")))?;

    let value: f64 = raw
        .parse()
        .map_err(|_| ResolveError::Parse(format!("{name}='{raw}' is not a number")))?;

    if !value.is_finite() {
        return Err(ResolveError::Parse(format!("{name}='{raw}' is not finite")));
    }

    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::HttpError,
        http::{HttpResponse, testing::ScriptedClient},
    };
    use reqwest::StatusCode;

    fn page(maplink: &str) -> String {
        format!(
            r#"<html><body><div class="infobox">
                 <span class="coordinates">{maplink}</span>
               </div></body></html>"#
        )
    }

    fn resolver_with(replies: Vec<Result<HttpResponse, HttpError>>) -> WikipediaResolver {
        WikipediaResolver::new(Arc::new(ScriptedClient::new(replies)), DEFAULT_BASE_URL)
    }

    #[test]
    fn extracts_coordinates_from_maplink() {
        let html = page(
            r#"<a class="mw-kartographer-maplink" data-lat="55.750556" data-lon="37.6175">55°45′</a>"#,
        );
        let coords = extract_coordinates(&html, "Москва").unwrap();
        assert_eq!(coords, Coordinates::new(55.750556, 37.6175));
    }

    #[test]
    fn uses_first_maplink_only() {
        let html = page(
            r#"<a class="mw-kartographer-maplink mw-kartographer-autostyled" data-lat="1.5" data-lon="2.5">a</a>
               <a class="mw-kartographer-maplink" data-lat="9" data-lon="9">b</a>"#,
        );
        let coords = extract_coordinates(&html, "x").unwrap();
        assert_eq!(coords, Coordinates::new(1.5, 2.5));
    }

    #[test]
    fn page_without_maplink_is_not_found() {
        let html = page(r#"<a class="internal" href="/wiki/Париж_(значения)">Париж</a>"#);
        let err = extract_coordinates(&html, "Париж").unwrap_err();
        assert!(matches!(err, ResolveError::NotFound(name) if name == "Париж"));
    }

    #[test]
    fn non_numeric_attributes_are_parse_errors() {
        for (lat, lon) in [("north", "37.6"), ("55.7", ""), ("1e", "2"), ("NaN", "1"), ("inf", "1")] {
            let html = page(&format!(
                r#"<a class="mw-kartographer-maplink" data-lat="{lat}" data-lon="{lon}">x</a>"#
            ));
            let err = extract_coordinates(&html, "x").unwrap_err();
            assert!(matches!(err, ResolveError::Parse(_)), "lat={lat} lon={lon}");
        }
    }

    #[test]
    fn missing_attribute_is_parse_error() {
        let html = page(r#"<a class="mw-kartographer-maplink" data-lat="55.7">x</a>"#);
        let err = extract_coordinates(&html, "x").unwrap_err();
        assert!(err.to_string().contains("data-lon"));
    }

    #[test]
    fn article_url_is_percent_encoded() {
        let resolver = resolver_with(vec![]);
        assert_eq!(
            resolver.article_url("Нью-Йорк"),
            "https://ru.wikipedia.org/wiki/%D0%9D%D1%8C%D1%8E-%D0%99%D0%BE%D1%80%D0%BA"
        );
        assert_eq!(
            resolver.article_url("San Francisco"),
            "https://ru.wikipedia.org/wiki/San%20Francisco"
        );
    }

    #[tokio::test]
    async fn error_status_is_network_error() {
        let resolver = resolver_with(vec![Ok(HttpResponse::new(StatusCode::NOT_FOUND, "no page"))]);
        let err = resolver.resolve("Atlantis").await.unwrap_err();
        assert!(matches!(err, ResolveError::Network(_)));
    }

    #[tokio::test]
    async fn transport_failure_is_network_error_without_retry() {
        let client = Arc::new(ScriptedClient::new(vec![
            Err(HttpError::Timeout("slow".into())),
            Ok(HttpResponse::new(StatusCode::OK, page(""))),
        ]));
        let resolver = WikipediaResolver::new(client.clone(), DEFAULT_BASE_URL);

        let err = resolver.resolve("Moscow").await.unwrap_err();

        assert!(matches!(err, ResolveError::Network(_)));
        assert_eq!(client.calls(), 1);
    }
}
