use crate::IntervalsError;
use std::time::Duration;

/// Connection settings for the Intervals.icu API. The API key is not part of
/// the config; it is cached on disk by the caller and handed to the client.
#[derive(Clone, Debug)]
pub struct Config {
    pub athlete_id: String,
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            athlete_id: "0".into(),
            base_url: "https://intervals.icu".into(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, IntervalsError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Testable helper that reads configuration values using the provided
    /// function. This avoids mutating global environment in tests and keeps
    /// `from_env()` small and safe.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, IntervalsError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // "0" addresses the athlete that owns the API key.
        let athlete_id = get("INTERVALS_ICU_ATHLETE_ID").unwrap_or(defaults.athlete_id);
        let base_url = get("INTERVALS_ICU_BASE_URL").unwrap_or(defaults.base_url);
        let timeout = match get("INTERVALS_ICU_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|_| {
                    IntervalsError::Config(format!("INTERVALS_ICU_TIMEOUT_SECS invalid: {raw}"))
                })?,
            None => defaults.timeout,
        };
        if athlete_id.trim().is_empty() {
            return Err(IntervalsError::Config(
                "INTERVALS_ICU_ATHLETE_ID is empty".into(),
            ));
        }
        Ok(Self {
            athlete_id,
            base_url,
            timeout,
        })
    }
}
