//! Garmin Connect client: SSO login with optional MFA, an on-disk token
//! store, and the daily endurance score lookup.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};
use thiserror::Error;

pub mod config;
pub mod http_client;
pub mod oauth;
pub mod sso;
pub mod tokens;

#[derive(Debug, Error)]
pub enum GarminError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("authentication failed: {0}")]
    Auth(String),
    #[error("unexpected sso response: {0}")]
    Sso(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("token store error: {0}")]
    TokenStore(String),
    #[error("configuration error: {0}")]
    Config(String),
}

impl GarminError {
    /// Build an error from a non-success response, keeping a short body snippet.
    pub(crate) async fn from_response(resp: reqwest::Response) -> Self {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();
        match status {
            401 | 403 => GarminError::Auth(body_snippet),
            _ => GarminError::Status {
                status,
                body: body_snippet,
            },
        }
    }
}

/// Endurance score for one calendar day. `overall_score` is `None` when
/// Garmin has not computed a score for that day.
#[derive(Clone, Debug, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnduranceScore {
    #[serde(default)]
    pub calendar_date: Option<String>,
    #[serde(default, deserialize_with = "deserialize_opt_number")]
    pub overall_score: Option<f64>,
    #[serde(default)]
    pub classification: Option<i64>,
}

fn deserialize_opt_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde::de::Error;
    let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
    match value {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(serde_json::Value::Number(n)) => Ok(n.as_f64()),
        Some(serde_json::Value::String(s)) => s
            .trim()
            .parse::<f64>()
            .map(Some)
            .map_err(|_| D::Error::custom(format!("expected number, got {s:?}"))),
        Some(other) => Err(D::Error::custom(format!("expected number, got {other}"))),
    }
}

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SocialProfile {
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
}

#[async_trait]
pub trait GarminClient: Send + Sync + 'static {
    /// Cheap authenticated call used to check that a session is still accepted.
    async fn validate(&self) -> Result<SocialProfile, GarminError>;

    /// Endurance score for `date`.
    async fn get_endurance_score(&self, date: NaiveDate) -> Result<EnduranceScore, GarminError>;
}
