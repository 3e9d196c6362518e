//! Cookie-backed state kept for each visitor: the recently searched cities and
//! the lifetimes of the cookies that carry them.

use serde_json::Value;
use std::time::Duration;

pub const LAST_CITIES_COOKIE: &str = "last_cities";
pub const USER_ID_COOKIE: &str = "user_id";

pub const LAST_CITIES_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 7);
/// Six 30-day months.
pub const USER_ID_MAX_AGE: Duration = Duration::from_secs(60 * 60 * 24 * 30 * 6);

pub const MAX_LAST_CITIES: usize = 5;

/// Reads the recent-cities cookie. Anything unusable yields an empty list.
pub fn decode_last_cities(raw: Option<&str>) -> Vec<String> {
    let Some(raw) = raw.filter(|s| !s.is_empty()) else {
        tracing::info!("no recent cities cookie");
        return Vec::new();
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Array(items)) => items
            .into_iter()
            .filter_map(|item| match item {
                Value::String(city) => Some(city),
                other => {
                    tracing::warn!(%other, "skipping non-string entry in recent cities cookie");
                    None
                }
            })
            .collect(),
        Ok(_) => {
            tracing::error!("recent cities cookie is JSON but not a list");
            Vec::new()
        }
        Err(e) => {
            tracing::error!(error = %e, "recent cities cookie is not valid JSON");
            Vec::new()
        }
    }
}

pub fn encode_last_cities(cities: &[String]) -> String {
    serde_json::Value::from(cities.to_vec()).to_string()
}

/// Moves `city_name` to the front, dropping any earlier occurrence, and keeps
/// at most [`MAX_LAST_CITIES`] entries.
pub fn update_last_cities(mut last_cities: Vec<String>, city_name: &str) -> Vec<String> {
    last_cities.retain(|c| c != city_name);
    last_cities.insert(0, city_name.to_string());
    last_cities.truncate(MAX_LAST_CITIES);
    last_cities
}
