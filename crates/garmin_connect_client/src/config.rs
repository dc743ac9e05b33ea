use crate::GarminError;
use std::time::Duration;

pub const OAUTH_CONSUMER_URL: &str = "https://thegarth.s3.amazonaws.com/oauth_consumer.json";

/// Endpoints used to reach Garmin Connect. Everything is derived from the
/// domain (`garmin.com` or `garmin.cn`) but each URL can be pointed elsewhere.
#[derive(Clone, Debug)]
pub struct GarminConfig {
    pub domain: String,
    pub sso_url: String,
    pub connect_api_url: String,
    pub consumer_url: String,
    pub timeout: Duration,
}

impl Default for GarminConfig {
    fn default() -> Self {
        Self::for_domain("garmin.com")
    }
}

impl GarminConfig {
    pub fn for_domain(domain: &str) -> Self {
        Self {
            domain: domain.to_string(),
            sso_url: format!("https://sso.{domain}/sso"),
            connect_api_url: format!("https://connectapi.{domain}"),
            consumer_url: OAUTH_CONSUMER_URL.to_string(),
            timeout: Duration::from_secs(30),
        }
    }

    /// Config pointing every endpoint at one base URL, e.g. a mock server.
    pub fn with_base_url(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            domain: "garmin.com".into(),
            sso_url: format!("{base}/sso"),
            connect_api_url: base.to_string(),
            consumer_url: format!("{base}/oauth_consumer.json"),
            timeout: Duration::from_secs(30),
        }
    }

    pub fn from_env() -> Result<Self, GarminError> {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through `get`.
    pub fn from_env_with<F>(mut get: F) -> Result<Self, GarminError>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut cfg = match get("GARMIN_DOMAIN") {
            Some(domain) if !domain.trim().is_empty() => Self::for_domain(domain.trim()),
            _ => Self::default(),
        };
        if let Some(raw) = get("GARMIN_TIMEOUT_SECS") {
            let secs = raw.trim().parse::<u64>().map_err(|_| {
                GarminError::Config(format!("GARMIN_TIMEOUT_SECS invalid: {raw}"))
            })?;
            cfg.timeout = Duration::from_secs(secs);
        }
        Ok(cfg)
    }

    pub(crate) fn sso_embed_url(&self) -> String {
        format!("{}/embed", self.sso_url)
    }

    pub(crate) fn oauth_url(&self, path: &str) -> String {
        format!(
            "{}/oauth-service/oauth/{}",
            self.connect_api_url.trim_end_matches('/'),
            path
        )
    }
}
