//! Minimal Intervals.icu wellness client: the `WellnessClient` trait and a
//! reqwest-based implementation.

use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::SecretString;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub mod config;
pub mod http_client;

#[derive(Debug, Error)]
pub enum IntervalsError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("unauthorized: {0}")]
    Unauthorized(String),
    #[error("not found: {0}")]
    NotFound(String),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
}

impl IntervalsError {
    /// HTTP status carried by the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            IntervalsError::Unauthorized(_) => Some(401),
            IntervalsError::NotFound(_) => Some(404),
            IntervalsError::Status { status, .. } => Some(*status),
            IntervalsError::Http(e) => e.status().map(|s| s.as_u16()),
            IntervalsError::Config(_) => None,
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, IntervalsError::Unauthorized(_))
    }

    /// True when the request never produced an HTTP response.
    pub fn is_transport(&self) -> bool {
        matches!(self, IntervalsError::Http(e) if e.status().is_none())
    }
}

/// Body of a wellness upsert. Only the fields that are set are sent.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq)]
pub struct WellnessUpdate {
    #[serde(
        rename = "EnduranceScore",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_score"
    )]
    pub endurance_score: Option<f64>,
}

/// Whole scores go out as integers (`45`, not `45.0`).
fn serialize_score<S>(score: &Option<f64>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match score {
        Some(v) if v.fract() == 0.0 && v.abs() < i64::MAX as f64 => {
            serializer.serialize_i64(*v as i64)
        }
        Some(v) => serializer.serialize_f64(*v),
        None => serializer.serialize_none(),
    }
}

impl WellnessUpdate {
    pub fn endurance_score(score: f64) -> Self {
        Self {
            endurance_score: Some(score),
        }
    }
}

#[async_trait]
pub trait WellnessClient: Send + Sync + 'static {
    /// Create or replace the wellness record for `date`.
    ///
    /// Only 200 and 201 count as success. The returned value is the echoed
    /// record, or `Value::Null` when the body is empty or not JSON.
    async fn update_wellness(
        &self,
        date: NaiveDate,
        update: &WellnessUpdate,
    ) -> Result<serde_json::Value, IntervalsError>;

    /// Swap the API key used by every later request.
    fn replace_api_key(&self, api_key: SecretString);
}
