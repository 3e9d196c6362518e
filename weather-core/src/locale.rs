use chrono::{Datelike, NaiveDate, Weekday};
use serde::{Deserialize, Serialize};
use std::convert::TryFrom;

/// Display language for weekday names and user-facing messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Ru,
    En,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Ru => "ru",
            Locale::En => "en",
        }
    }

    pub const fn all() -> &'static [Locale] {
        &[Locale::Ru, Locale::En]
    }

    /// Full weekday name, cased the way CLDR stand-alone "EEEE" renders it.
    pub fn weekday_name(&self, weekday: Weekday) -> &'static str {
        match self {
            Locale::Ru => match weekday {
                Weekday::Mon => "понедельник",
                Weekday::Tue => "вторник",
                Weekday::Wed => "среда",
                Weekday::Thu => "четверг",
                Weekday::Fri => "пятница",
                Weekday::Sat => "суббота",
                Weekday::Sun => "воскресенье",
            },
            Locale::En => match weekday {
                Weekday::Mon => "Monday",
                Weekday::Tue => "Tuesday",
                Weekday::Wed => "Wednesday",
                Weekday::Thu => "Thursday",
                Weekday::Fri => "Friday",
                Weekday::Sat => "Saturday",
                Weekday::Sun => "Sunday",
            },
        }
    }

    pub fn format_weekday(&self, date: NaiveDate) -> String {
        self.weekday_name(date.weekday()).to_string()
    }

    /// The single message shown whenever a lookup yields no forecast.
    pub fn not_found_message(&self) -> &'static str {
        match self {
            Locale::Ru => "Не удалось найти информацию о погоде в заданном городе",
            Locale::En => "could not find weather information for the given city",
        }
    }
}

impl std::fmt::Display for Locale {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for Locale {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        match value.to_lowercase().as_str() {
            "ru" | "ru_ru" | "ru-ru" => Ok(Locale::Ru),
            "en" | "en_us" | "en-us" => Ok(Locale::En),
            _ => Err(anyhow::anyhow!("Unknown locale '{value}'. Supported locales: ru, en.")),
        }
    }
}
