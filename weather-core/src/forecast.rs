//! Hourly samples → day-bucketed, localized forecasts.

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use std::fmt::Debug;

use crate::{
    error::FetchError,
    locale::Locale,
    model::{Coordinates, DailyForecast, HourSummary, HourlySample, round1},
};

pub mod openmeteo;

pub use openmeteo::OpenMeteoFetcher;

pub const DEFAULT_FORECAST_DAYS: u32 = 7;
/// Longest window the forecast API serves.
pub const MAX_FORECAST_DAYS: u32 = 16;

#[async_trait]
pub trait ForecastFetcher: Send + Sync + Debug {
    async fn fetch(&self, coords: Coordinates, days: u32) -> Result<Vec<DailyForecast>, FetchError>;
}

/// Uniform sampling grid declared by the provider: `[start, end)` every `interval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeAxis {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: Duration,
}

impl TimeAxis {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>, interval: Duration) -> Result<Self, FetchError> {
        if interval <= Duration::zero() {
            return Err(FetchError::Malformed(format!("non-positive sampling interval {interval}")));
        }
        if end < start {
            return Err(FetchError::Malformed(format!("time axis ends ({end}) before it starts ({start})")));
        }
        Ok(Self { start, end, interval })
    }

    /// Left-inclusive timestamps: `start`, `start + interval`, ... while `< end`.
    pub fn timestamps(&self) -> Vec<DateTime<Utc>> {
        let mut out = Vec::new();
        let mut t = self.start;
        while t < self.end {
            out.push(t);
            match t.checked_add_signed(self.interval) {
                Some(next) => t = next,
                None => break,
            }
        }
        out
    }
}

/// Zips the axis with the three value series into samples.
pub fn build_samples(
    axis: &TimeAxis,
    temperature: &[f64],
    humidity: &[f64],
    windspeed: &[f64],
) -> Result<Vec<HourlySample>, FetchError> {
    let timestamps = axis.timestamps();
    let n = timestamps.len();

    if temperature.len() != n || humidity.len() != n || windspeed.len() != n {
        return Err(FetchError::Malformed(format!(
            "series lengths differ from time axis ({n}): temperature={}, humidity={}, windspeed={}",
            temperature.len(),
            humidity.len(),
            windspeed.len(),
        )));
    }

    Ok(timestamps
        .into_iter()
        .enumerate()
        .map(|(i, timestamp)| HourlySample {
            timestamp,
            temperature: temperature[i],
            humidity: humidity[i],
            windspeed: windspeed[i],
        })
        .collect())
}

/// Groups samples by UTC calendar day, keeping the first `days` distinct days
/// in order of first appearance.
pub fn bucket_by_day(samples: &[HourlySample], days: usize, locale: Locale) -> Vec<DailyForecast> {
    let mut groups: Vec<(NaiveDate, Vec<&HourlySample>)> = Vec::new();

    for sample in samples {
        let date = sample.timestamp.date_naive();
        match groups.iter().position(|(d, _)| *d == date) {
            Some(idx) => groups[idx].1.push(sample),
            None if groups.len() < days => groups.push((date, vec![sample])),
            None => {}
        }
    }

    groups
        .into_iter()
        .map(|(date, mut group)| {
            group.sort_by_key(|s| s.timestamp);
            DailyForecast {
                date,
                weekday: locale.format_weekday(date),
                hours: group.into_iter().map(summarize).collect(),
            }
        })
        .collect()
}

fn summarize(sample: &HourlySample) -> HourSummary {
    HourSummary {
        time: sample.timestamp.format("%H:%M").to_string(),
        temperature: round1(sample.temperature),
        humidity: round1(sample.humidity),
        windspeed: round1(sample.windspeed),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hourly_axis(start: DateTime<Utc>, hours: i64) -> TimeAxis {
        TimeAxis::new(start, start + Duration::hours(hours), Duration::hours(1)).unwrap()
    }

    fn samples(start: DateTime<Utc>, hours: i64) -> Vec<HourlySample> {
        let axis = hourly_axis(start, hours);
        let n = hours as usize;
        let temps: Vec<f64> = (0..n).map(|i| i as f64 * 0.123).collect();
        let hums: Vec<f64> = (0..n).map(|i| 50.0 + i as f64 * 0.07).collect();
        let winds: Vec<f64> = (0..n).map(|i| 3.33 + i as f64).collect();
        build_samples(&axis, &temps, &hums, &winds).unwrap()
    }

    fn midnight(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn axis_is_left_inclusive() {
        let start = midnight(2024, 1, 1);
        let stamps = hourly_axis(start, 3).timestamps();
        assert_eq!(stamps, vec![start, start + Duration::hours(1), start + Duration::hours(2)]);
    }

    #[test]
    fn axis_rejects_bad_interval() {
        let start = midnight(2024, 1, 1);
        assert!(TimeAxis::new(start, start, Duration::zero()).is_err());
        assert!(TimeAxis::new(start, start - Duration::hours(1), Duration::hours(1)).is_err());
    }

    #[test]
    fn mismatched_series_are_malformed() {
        let axis = hourly_axis(midnight(2024, 1, 1), 3);
        let err = build_samples(&axis, &[1.0, 2.0, 3.0], &[1.0, 2.0], &[1.0, 2.0, 3.0]).unwrap_err();
        assert!(matches!(err, FetchError::Malformed(_)));
    }

    #[test]
    fn seven_full_days_become_seven_forecasts() {
        let samples = samples(midnight(2024, 1, 1), 7 * 24);
        let days = bucket_by_day(&samples, 7, Locale::Ru);

        assert_eq!(days.len(), 7);
        assert_eq!(days[0].date.to_string(), "2024-01-01");
        assert_eq!(days[0].weekday, "понедельник");
        assert_eq!(days[6].weekday, "воскресенье");
        for day in &days {
            assert_eq!(day.hours.len(), 24);
            assert_eq!(day.hours[0].time, "00:00");
            assert_eq!(day.hours[23].time, "23:00");
        }
    }

    #[test]
    fn count_is_min_of_requested_and_available_days() {
        let samples = samples(midnight(2024, 1, 1), 3 * 24);
        assert_eq!(bucket_by_day(&samples, 7, Locale::Ru).len(), 3);
        assert_eq!(bucket_by_day(&samples, 2, Locale::Ru).len(), 2);
        assert!(bucket_by_day(&[], 7, Locale::Ru).is_empty());
    }

    #[test]
    fn later_samples_of_an_open_day_still_join_it() {
        let start = midnight(2024, 1, 1);
        let mut s = samples(start, 48);
        // Same day seen again after the next day started.
        s.push(HourlySample { timestamp: start + Duration::minutes(30), ..s[0].clone() });

        let days = bucket_by_day(&s, 1, Locale::Ru);

        assert_eq!(days.len(), 1);
        assert_eq!(days[0].hours.len(), 25);
        assert_eq!(days[0].hours[1].time, "00:30");
    }

    #[test]
    fn partial_first_day_is_its_own_bucket() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 20, 0, 0).unwrap();
        let days = bucket_by_day(&samples(start, 28), 7, Locale::En);

        assert_eq!(days.len(), 2);
        assert_eq!(days[0].hours.len(), 4);
        assert_eq!(days[0].hours[0].time, "20:00");
        assert_eq!(days[1].hours.len(), 24);
        assert_eq!(days[1].weekday, "Tuesday");
    }

    #[test]
    fn times_strictly_increase_within_each_day() {
        let start = Utc.with_ymd_and_hms(2024, 2, 28, 5, 0, 0).unwrap();
        let days = bucket_by_day(&samples(start, 100), 7, Locale::Ru);

        for day in &days {
            for pair in day.hours.windows(2) {
                assert!(pair[0].time < pair[1].time, "{} !< {}", pair[0].time, pair[1].time);
            }
        }
        // 2024 is a leap year.
        assert_eq!(days[1].date.to_string(), "2024-02-29");
    }

    #[test]
    fn values_are_rounded_to_one_decimal() {
        let days = bucket_by_day(&samples(midnight(2024, 1, 1), 24), 7, Locale::Ru);
        let hour = &days[0].hours[4];

        assert_eq!(hour.temperature, 0.5); // 0.492
        assert_eq!(hour.humidity, 50.3); // 50.28
        assert_eq!(hour.windspeed, 7.3); // 7.33
        for h in &days[0].hours {
            assert_eq!(round1(h.temperature), h.temperature);
        }
    }

    #[test]
    fn sub_hourly_interval_is_supported() {
        let start = midnight(2024, 1, 1);
        let axis = TimeAxis::new(start, start + Duration::hours(1), Duration::minutes(15)).unwrap();
        let v = [1.0; 4];
        let s = build_samples(&axis, &v, &v, &v).unwrap();
        let days = bucket_by_day(&s, 7, Locale::Ru);

        let times: Vec<&str> = days[0].hours.iter().map(|h| h.time.as_str()).collect();
        assert_eq!(times, vec!["00:00", "00:15", "00:30", "00:45"]);
    }
}
