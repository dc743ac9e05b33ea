//! HTTP client implementation for the Intervals.icu API.
//!
//! This module provides a reqwest-based implementation of the [`WellnessClient`](crate::WellnessClient) trait.

use crate::config::Config;
use crate::{IntervalsError, WellnessClient, WellnessUpdate};
use async_trait::async_trait;
use chrono::NaiveDate;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, RwLock};

/// Basic-auth username Intervals.icu expects when authenticating with an API key.
const API_KEY_USER: &str = "API_KEY";

/// Client for the Intervals.icu API using reqwest.
#[derive(Clone, Debug)]
pub struct ReqwestIntervalsClient {
    base_url: String,
    athlete_id: String,
    api_key: Arc<RwLock<SecretString>>,
    client: reqwest::Client,
}

impl ReqwestIntervalsClient {
    /// Create a new client instance.
    ///
    /// # Arguments
    /// * `config` - Base URL, athlete placeholder and request timeout
    /// * `api_key` - The API key sent as the basic-auth password
    pub fn new(config: &Config, api_key: SecretString) -> Result<Self, IntervalsError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            athlete_id: config.athlete_id.clone(),
            api_key: Arc::new(RwLock::new(api_key)),
            client,
        })
    }

    fn wellness_url(&self, date: NaiveDate) -> String {
        format!(
            "{}/api/v1/athlete/{}/wellness/{}",
            self.base_url,
            self.athlete_id,
            date.format("%Y-%m-%d")
        )
    }

    /// Build an authenticated PUT request.
    fn put_request(&self, url: &str) -> reqwest::RequestBuilder {
        let key = self.api_key.read().unwrap_or_else(|e| e.into_inner());
        self.client
            .put(url)
            .header(reqwest::header::ACCEPT, "*/*")
            .basic_auth(API_KEY_USER, Some(key.expose_secret()))
    }

    /// Handle a response, converting status codes to appropriate errors.
    async fn handle_response(
        &self,
        resp: reqwest::Response,
    ) -> Result<serde_json::Value, IntervalsError> {
        let status = resp.status().as_u16();
        if status != 200 && status != 201 {
            return Err(self.error_from_response(resp).await);
        }
        let body = resp.text().await?;
        Ok(serde_json::from_str(&body).unwrap_or(serde_json::Value::Null))
    }

    /// Extract error information from a failed response.
    async fn error_from_response(&self, resp: reqwest::Response) -> IntervalsError {
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        let body_snippet: String = body.chars().take(256).collect();

        match status {
            401 => IntervalsError::Unauthorized(body_snippet),
            404 => IntervalsError::NotFound(body_snippet),
            _ => IntervalsError::Status {
                status,
                body: body_snippet,
            },
        }
    }
}

#[async_trait]
impl WellnessClient for ReqwestIntervalsClient {
    async fn update_wellness(
        &self,
        date: NaiveDate,
        update: &WellnessUpdate,
    ) -> Result<serde_json::Value, IntervalsError> {
        let url = self.wellness_url(date);
        tracing::debug!(%url, "updating wellness record");
        let resp = self.put_request(&url).json(update).send().await?;
        self.handle_response(resp).await
    }

    fn replace_api_key(&self, api_key: SecretString) {
        let mut slot = self.api_key.write().unwrap_or_else(|e| e.into_inner());
        *slot = api_key;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(base: &str) -> ReqwestIntervalsClient {
        let cfg = Config {
            base_url: base.into(),
            ..Config::default()
        };
        ReqwestIntervalsClient::new(&cfg, SecretString::new("key".into())).expect("client")
    }

    #[test]
    fn wellness_url_uses_iso_date_and_athlete_placeholder() {
        let c = client("https://intervals.icu/");
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            c.wellness_url(date),
            "https://intervals.icu/api/v1/athlete/0/wellness/2024-03-09"
        );
    }

    #[test]
    fn replace_api_key_swaps_secret() {
        let c = client("http://localhost");
        c.replace_api_key(SecretString::new("fresh".into()));
        let key = c.api_key.read().unwrap();
        assert_eq!(key.expose_secret(), "fresh");
    }
}
