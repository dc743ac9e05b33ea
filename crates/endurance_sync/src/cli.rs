use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

/// Upload Garmin Connect endurance scores to Intervals.icu wellness records.
#[derive(Debug, Clone, Parser)]
#[command(name = "endurance-sync", version)]
pub struct Cli {
    /// Number of past days to process (default: 0, only today)
    #[arg(long, env = "ENDURANCE_SYNC_DAYS", default_value_t = 0)]
    pub days: u32,

    /// Only fetch data and print, do not upload
    #[arg(long)]
    pub dry_run: bool,

    /// Directory holding the Garmin tokens and the cached API key
    #[arg(long, env = "GARMINTOKENS", default_value = "~/.garminconnect")]
    pub token_dir: String,

    /// Give up after this many failed login attempts (0 keeps trying)
    #[arg(long, env = "ENDURANCE_SYNC_LOGIN_ATTEMPTS", default_value_t = 0)]
    pub login_attempts: u32,
}

impl Cli {
    /// Token directory with a leading `~` expanded.
    pub fn token_dir(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.token_dir).into_owned())
    }
}

/// HTTP internals stay quiet unless asked for explicitly.
const HTTP_QUIET: &str = "reqwest=warn,hyper=warn";

/// Log directive from `ENDURANCE_SYNC_LOG_LEVEL`, falling back to `RUST_LOG`
/// and then `info`, with the HTTP crates capped at `warn`.
pub fn log_directive_with<F>(mut get: F) -> String
where
    F: FnMut(&str) -> Option<String>,
{
    let level = get("ENDURANCE_SYNC_LOG_LEVEL")
        .or_else(|| get("RUST_LOG"))
        .unwrap_or_else(|| "info".to_string());
    format!("{level},{HTTP_QUIET}")
}

/// Filter for the log subscriber; an unparsable directive falls back to `info`.
pub fn log_filter_with<F>(get: F) -> EnvFilter
where
    F: FnMut(&str) -> Option<String>,
{
    EnvFilter::try_new(log_directive_with(get))
        .unwrap_or_else(|_| EnvFilter::new(format!("info,{HTTP_QUIET}")))
}

pub fn log_filter() -> EnvFilter {
    log_filter_with(|k| std::env::var(k).ok())
}
