use anyhow::{Context, Result, anyhow};
use clap::{Parser, Subcommand};
use cityweather_core::{
    Config, DailyForecast, ForecastAnswer, ForecastService, IdentityCipher, Locale,
    SearchHistoryStore,
    http::SqliteCacheStore,
    session::{
        LAST_CITIES_COOKIE, LAST_CITIES_MAX_AGE, USER_ID_COOKIE, USER_ID_MAX_AGE,
        decode_last_cities, encode_last_cities, update_last_cities,
    },
};
use inquire::{Confirm, Select};
use std::{fs, path::PathBuf};
use uuid::Uuid;

use crate::cookies::CookieJar;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "cityweather", version, about = "7-day hourly forecast for any city")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Choose the display language and set up the user id encryption key.
    Configure,

    /// Show the forecast for a city.
    Show {
        /// City name, as written in the encyclopedia article title.
        city: String,

        /// Print the raw `{error, data}` answer as JSON.
        #[arg(long)]
        json: bool,
    },

    /// List the most recently searched cities.
    Recent,

    /// Print how many times each city was searched, as JSON.
    Report,
}

impl Cli {
    pub async fn run(self) -> Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Show { city, json } => show(&city, json).await,
            Command::Recent => recent(),
            Command::Report => report(),
        }
    }
}

fn configure() -> Result<()> {
    let mut config = Config::load()?;

    let locale = Select::new("Display language:", Locale::all().to_vec())
        .with_starting_cursor(Locale::all().iter().position(|l| *l == config.locale).unwrap_or(0))
        .prompt()
        .context("Locale selection aborted")?;
    config.locale = locale;

    let generate = match config.encryption_key {
        None => true,
        Some(_) => Confirm::new("An encryption key is already set. Replace it? (existing user ids become unreadable)")
            .with_default(false)
            .prompt()
            .context("Confirmation aborted")?,
    };
    if generate {
        config.set_encryption_key(IdentityCipher::generate_key());
    }

    config.save()?;
    println!("Saved configuration to {}", Config::config_file_path()?.display());
    Ok(())
}

fn data_dir() -> Result<PathBuf> {
    let dir = Config::data_dir()?;
    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create data directory: {}", dir.display()))?;
    Ok(dir)
}

fn open_history() -> Result<SearchHistoryStore> {
    SearchHistoryStore::open(data_dir()?.join("history.sqlite3"))
}

fn open_cookies() -> Result<CookieJar> {
    Ok(CookieJar::load(data_dir()?.join("cookies.json")))
}

/// Reads the user id cookie; an unreadable token counts as a first visit.
fn current_user(jar: &CookieJar, cipher: &IdentityCipher) -> Option<Uuid> {
    let token = jar.get(USER_ID_COOKIE)?;
    match cipher.decrypt(token) {
        Ok(id) => Uuid::parse_str(&id).ok(),
        Err(e) => {
            tracing::error!(error = %e, "could not decrypt user id cookie");
            None
        }
    }
}

async fn show(city: &str, json: bool) -> Result<()> {
    let config = Config::load()?.with_env_overrides();
    let cipher = config.identity_cipher().map_err(|e| {
        anyhow!("{e}.\nHint: run `cityweather configure` or set {}.", cityweather_core::config::ENCRYPTION_KEY_ENV)
    })?;

    let store = open_history()?;
    let mut jar = open_cookies()?;

    let mut last_cities = decode_last_cities(jar.get(LAST_CITIES_COOKIE));
    let user = store.resolve_user(current_user(&jar, &cipher))?;

    if !city.is_empty() {
        let cache = SqliteCacheStore::open(data_dir()?.join("http_cache.sqlite3"))?;
        let service = ForecastService::with_cache_store(&config, Box::new(cache))?;
        let answer = service.get_forecast(city).await;

        if answer.is_success() {
            store.record_search(user, city)?;
            last_cities = update_last_cities(last_cities, city);
        } else if let Some(cause) = answer.cause {
            tracing::info!(city, %cause, "lookup failed");
        }

        jar.set(LAST_CITIES_COOKIE, encode_last_cities(&last_cities), LAST_CITIES_MAX_AGE);
        print_answer(city, &answer, json)?;
    }

    jar.set(USER_ID_COOKIE, cipher.encrypt(&user.to_string()), USER_ID_MAX_AGE);
    jar.save()?;

    if !json && !last_cities.is_empty() {
        println!("\nRecent: {}", last_cities.join(", "));
    }
    Ok(())
}

fn recent() -> Result<()> {
    let jar = open_cookies()?;
    for city in decode_last_cities(jar.get(LAST_CITIES_COOKIE)) {
        println!("{city}");
    }
    Ok(())
}

fn report() -> Result<()> {
    println!("{}", open_history()?.report_json()?);
    Ok(())
}

fn print_answer(city: &str, answer: &ForecastAnswer, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(answer).context("Failed to serialize answer")?);
        return Ok(());
    }

    match (&answer.error, &answer.data) {
        (Some(error), _) => println!("{error}"),
        (None, Some(days)) => {
            println!("{city}");
            for day in days {
                print!("{}", render_day(day));
            }
        }
        (None, None) => {}
    }
    Ok(())
}

fn render_day(day: &DailyForecast) -> String {
    let mut out = format!("\n{} ({})\n", day.date.format("%Y-%m-%d"), day.weekday);
    for hour in &day.hours {
        out.push_str(&format!(
            "  {}  {:>6.1} °C  {:>5.1} %  {:>5.1} km/h\n",
            hour.time, hour.temperature, hour.humidity, hour.windspeed
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use cityweather_core::HourSummary;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_show_with_json_flag() {
        let cli = Cli::try_parse_from(["cityweather", "show", "Москва", "--json"]).unwrap();
        match cli.command {
            Command::Show { city, json } => {
                assert_eq!(city, "Москва");
                assert!(json);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn renders_a_day() {
        let day = DailyForecast {
            date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            weekday: "понедельник".to_string(),
            hours: vec![HourSummary {
                time: "09:00".to_string(),
                temperature: -2.3,
                humidity: 81.0,
                windspeed: 12.4,
            }],
        };

        let text = render_day(&day);
        assert!(text.contains("2024-01-01 (понедельник)"));
        assert!(text.contains("09:00"));
        assert!(text.contains("-2.3 °C"));
        assert!(text.contains("12.4 km/h"));
    }

    #[test]
    fn unreadable_user_cookie_means_new_visitor() {
        let dir = tempfile::tempdir().unwrap();
        let mut jar = CookieJar::load(dir.path().join("cookies.json"));
        let cipher = IdentityCipher::new(&IdentityCipher::generate_key()).unwrap();

        assert!(current_user(&jar, &cipher).is_none());

        jar.set(USER_ID_COOKIE, "garbage".to_string(), USER_ID_MAX_AGE);
        assert!(current_user(&jar, &cipher).is_none());

        let id = Uuid::new_v4();
        jar.set(USER_ID_COOKIE, cipher.encrypt(&id.to_string()), USER_ID_MAX_AGE);
        assert_eq!(current_user(&jar, &cipher), Some(id));
    }
}
