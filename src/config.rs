//! Runtime configuration loaded from the environment

use std::env;
use std::str::FromStr;

use crate::classifier::{DEFAULT_HISTORY_BOOST, DEFAULT_HISTORY_WINDOW};
use crate::error::AgentError;
use crate::models::CategorizerMode;
use crate::Result;

/// Default horizon for "previsão" without an explicit day count
pub const DEFAULT_FORECAST_DAYS: u32 = 30;

#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Strategy used when the profile has no preference
    pub categorizer: CategorizerMode,
    pub intent_history_window: usize,
    pub history_boost: f64,
    pub forecast_days: u32,
    /// Postgres URL; in-memory storage when absent
    pub database_url: Option<String>,
    pub port: u16,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            categorizer: CategorizerMode::Rules,
            intent_history_window: DEFAULT_HISTORY_WINDOW,
            history_boost: DEFAULT_HISTORY_BOOST,
            forecast_days: DEFAULT_FORECAST_DAYS,
            database_url: None,
            port: 8080,
        }
    }
}

impl AgentConfig {
    /// Read `LEDGER_*`, `DATABASE_URL`/`POSTGRES_URL` and `PORT`/`API_PORT`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; used by `from_env` and tests
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let categorizer = match lookup("LEDGER_CATEGORIZER") {
            Some(raw) => CategorizerMode::parse(&raw).ok_or_else(|| {
                AgentError::Config(format!("LEDGER_CATEGORIZER must be rules|learned, got {}", raw))
            })?,
            None => defaults.categorizer,
        };

        let database_url = lookup("POSTGRES_URL")
            .or_else(|| lookup("DATABASE_URL"))
            .filter(|url| !url.trim().is_empty());

        let port = match lookup("PORT").or_else(|| lookup("API_PORT")) {
            Some(raw) => parse_value("PORT", &raw)?,
            None => defaults.port,
        };

        Ok(Self {
            categorizer,
            intent_history_window: parse_or(
                &lookup,
                "LEDGER_INTENT_HISTORY",
                defaults.intent_history_window,
            )?,
            history_boost: parse_or(&lookup, "LEDGER_HISTORY_BOOST", defaults.history_boost)?,
            forecast_days: parse_or(&lookup, "LEDGER_FORECAST_DAYS", defaults.forecast_days)?,
            database_url,
            port,
        })
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| AgentError::Config(format!("Invalid value for {}: {}", key, raw)))
}

fn parse_or<T, F>(lookup: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}
