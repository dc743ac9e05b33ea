//! Authenticated Connect API client.
//!
//! This module provides a reqwest-based implementation of the [`GarminClient`](crate::GarminClient) trait.

use crate::config::GarminConfig;
use crate::oauth::{self, OAuthConsumer};
use crate::tokens::GarminTokens;
use crate::{EnduranceScore, GarminClient, GarminError, SocialProfile};
use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::header::{AUTHORIZATION, USER_AGENT};
use tokio::sync::{OnceCell, RwLock};

/// Client for the Garmin Connect API using reqwest.
#[derive(Debug)]
pub struct ReqwestGarminClient {
    config: GarminConfig,
    client: reqwest::Client,
    tokens: RwLock<GarminTokens>,
    consumer: OnceCell<OAuthConsumer>,
}

impl ReqwestGarminClient {
    pub fn new(config: GarminConfig, tokens: GarminTokens) -> Result<Self, GarminError> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self {
            config,
            client,
            tokens: RwLock::new(tokens),
            consumer: OnceCell::new(),
        })
    }

    /// Current tokens, including any refresh done since construction.
    pub async fn tokens(&self) -> GarminTokens {
        self.tokens.read().await.clone()
    }

    /// Return a valid `Authorization` header value, re-exchanging the OAuth1
    /// token first when the OAuth2 token has expired.
    async fn authorization(&self) -> Result<String, GarminError> {
        let now = chrono::Utc::now().timestamp();
        {
            let tokens = self.tokens.read().await;
            if !tokens.oauth2.expired(now) {
                return Ok(tokens.oauth2.authorization_header());
            }
        }

        let mut tokens = self.tokens.write().await;
        // Another caller may have refreshed while we waited for the lock.
        if !tokens.oauth2.expired(now) {
            return Ok(tokens.oauth2.authorization_header());
        }
        tracing::info!("garmin oauth2 token expired, refreshing");
        let consumer = self
            .consumer
            .get_or_try_init(|| oauth::fetch_consumer(&self.client, &self.config))
            .await?;
        tokens.oauth2 = oauth::exchange(&self.client, &self.config, consumer, &tokens.oauth1).await?;
        Ok(tokens.oauth2.authorization_header())
    }

    async fn connectapi_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, GarminError> {
        let url = format!(
            "{}{}",
            self.config.connect_api_url.trim_end_matches('/'),
            path
        );
        let auth = self.authorization().await?;
        let resp = self
            .client
            .get(&url)
            .query(query)
            .header(AUTHORIZATION, auth)
            .header(USER_AGENT, oauth::MOBILE_USER_AGENT)
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(GarminError::from_response(resp).await);
        }
        Ok(resp)
    }
}

#[async_trait]
impl GarminClient for ReqwestGarminClient {
    async fn validate(&self) -> Result<SocialProfile, GarminError> {
        let resp = self
            .connectapi_get("/userprofile-service/socialProfile", &[])
            .await?;
        Ok(resp.json::<SocialProfile>().await?)
    }

    async fn get_endurance_score(&self, date: NaiveDate) -> Result<EnduranceScore, GarminError> {
        let resp = self
            .connectapi_get(
                "/metrics-service/metrics/endurancescore",
                &[("calendarDate", date.format("%Y-%m-%d").to_string())],
            )
            .await?;
        let body = resp.text().await?;
        // Days without data may come back with no body at all.
        if body.trim().is_empty() {
            return Ok(EnduranceScore::default());
        }
        Ok(serde_json::from_str(&body)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tokens::sample_tokens;

    #[tokio::test]
    async fn authorization_uses_unexpired_token_without_network() {
        let tokens = sample_tokens(i64::MAX / 2);
        // Unroutable endpoints: any network call would fail the test.
        let client =
            ReqwestGarminClient::new(GarminConfig::with_base_url("http://127.0.0.1:1"), tokens)
                .unwrap();
        assert_eq!(client.authorization().await.unwrap(), "Bearer access");
    }
}
