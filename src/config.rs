use dotenvy::dotenv;
use eyre::{eyre, WrapErr};
use nonzero_ext::nonzero;
use std::env;
use std::num::NonZeroU32;
use std::str::FromStr;

pub const DEFAULT_TMDB_URL: &str = "https://api.themoviedb.org/3";
const DEFAULT_DATABASE_URL: &str = "paon.db";
const DEFAULT_LANGUAGE: &str = "en";
const DEFAULT_LOG_FILE: &str = "paon.log";
const DEFAULT_UPCOMING_DAYS: i64 = 7;
/// Widest upcoming window, in days.
pub const MAX_UPCOMING_DAYS: i64 = 36_500;

/// What the catalog client needs to talk to the provider.
#[derive(Clone, Debug)]
pub struct CatalogConfig {
    pub api_key: String,
    pub base_url: String,
    pub language: String,
}

#[derive(Clone, Debug)]
pub struct Config {
    pub database_url: String,
    pub catalog: CatalogConfig,
    /// Catalog requests allowed per second.
    pub rate_limit: NonZeroU32,
    pub upcoming_days: i64,
    pub log_file: String,
}

impl Config {
    /// Read configuration from the environment, after loading `.env` if any.
    pub fn from_env() -> eyre::Result<Config> {
        dotenv().ok();
        Config::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> eyre::Result<Config> {
        let or_default =
            |key: &str, default: &str| lookup(key).unwrap_or_else(|| default.to_string());

        let api_key = lookup("TMDB_API_KEY").ok_or_else(|| eyre!("TMDB_API_KEY must be set."))?;

        let upcoming_days = parse_or(&lookup, "UPCOMING_DAYS", DEFAULT_UPCOMING_DAYS)?;
        if !(0..=MAX_UPCOMING_DAYS).contains(&upcoming_days) {
            return Err(eyre!(
                "UPCOMING_DAYS must be between 0 and {}, got {}",
                MAX_UPCOMING_DAYS,
                upcoming_days
            ));
        }

        Ok(Config {
            database_url: or_default("DATABASE_URL", DEFAULT_DATABASE_URL),
            catalog: CatalogConfig {
                api_key,
                base_url: or_default("TMDB_API_URL", DEFAULT_TMDB_URL),
                language: or_default("TMDB_LANGUAGE", DEFAULT_LANGUAGE),
            },
            rate_limit: parse_or(&lookup, "CATALOG_RATE_LIMIT", nonzero!(20u32))?,
            upcoming_days,
            log_file: or_default("LOG_FILE", DEFAULT_LOG_FILE),
        })
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> eyre::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .wrap_err_with(|| format!("{} has an invalid value: {:?}", key, raw)),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn defaults_fill_everything_but_the_key() {
        let config = Config::from_lookup(lookup(&[("TMDB_API_KEY", "abc")])).unwrap();
        assert_eq!(config.catalog.api_key, "abc");
        assert_eq!(config.catalog.base_url, DEFAULT_TMDB_URL);
        assert_eq!(config.catalog.language, "en");
        assert_eq!(config.database_url, "paon.db");
        assert_eq!(config.rate_limit.get(), 20);
        assert_eq!(config.upcoming_days, 7);
    }

    #[test]
    fn api_key_is_required() {
        assert!(Config::from_lookup(lookup(&[])).is_err());
    }

    #[test]
    fn zero_rate_limit_is_rejected() {
        let vars = lookup(&[("TMDB_API_KEY", "abc"), ("CATALOG_RATE_LIMIT", "0")]);
        assert!(Config::from_lookup(vars).is_err());
    }

    #[test]
    fn upcoming_window_is_bounded() {
        for days in ["-1", "36501", "9223372036854775807"] {
            let vars = lookup(&[("TMDB_API_KEY", "abc"), ("UPCOMING_DAYS", days)]);
            assert!(Config::from_lookup(vars).is_err(), "{} accepted", days);
        }
        let vars = lookup(&[("TMDB_API_KEY", "abc"), ("UPCOMING_DAYS", "36500")]);
        assert_eq!(Config::from_lookup(vars).unwrap().upcoming_days, 36_500);
    }

    #[test]
    fn unparsable_numbers_are_rejected() {
        let vars = lookup(&[("TMDB_API_KEY", "abc"), ("UPCOMING_DAYS", "a week")]);
        assert!(Config::from_lookup(vars).is_err());
    }
}
