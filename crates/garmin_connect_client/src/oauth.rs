//! OAuth1 request signing (HMAC-SHA1) and the two token endpoints Garmin
//! Connect uses after an SSO ticket has been issued.

use crate::GarminError;
use crate::config::GarminConfig;
use crate::tokens::{OAuth1Token, OAuth2Token};
use base64::{Engine as _, engine::general_purpose::STANDARD};
use hmac::{Hmac, Mac};
use rand::{RngExt, rng};
use reqwest::Url;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use serde::Deserialize;
use sha1::Sha1;
use std::fmt;

type HmacSha1 = Hmac<Sha1>;

/// User agent the token endpoints expect.
pub(crate) const MOBILE_USER_AGENT: &str = "com.garmin.android.apps.connectmobile";

#[derive(Clone, Deserialize)]
pub struct OAuthConsumer {
    pub consumer_key: String,
    pub consumer_secret: String,
}

impl fmt::Debug for OAuthConsumer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuthConsumer")
            .field("consumer_key", &self.consumer_key)
            .field("consumer_secret", &"[redacted]")
            .finish()
    }
}

/// Fetch the consumer key pair the mobile app signs token requests with.
pub async fn fetch_consumer(
    http: &reqwest::Client,
    config: &GarminConfig,
) -> Result<OAuthConsumer, GarminError> {
    let resp = http.get(&config.consumer_url).send().await?;
    if !resp.status().is_success() {
        return Err(GarminError::from_response(resp).await);
    }
    Ok(resp.json::<OAuthConsumer>().await?)
}

/// RFC 3986 percent-encoding: everything but unreserved characters.
fn percent_encode(s: &str) -> String {
    urlencoding::encode(s).into_owned()
}

fn base_string_uri(url: &Url) -> String {
    let host = url.host_str().unwrap_or_default().to_ascii_lowercase();
    match url.port() {
        Some(port) => format!("{}://{}:{}{}", url.scheme(), host, port, url.path()),
        None => format!("{}://{}{}", url.scheme(), host, url.path()),
    }
}

fn nonce() -> String {
    let mut rng = rng();
    let hi = rng.random_range(0..u64::MAX);
    let lo = rng.random_range(0..u64::MAX);
    format!("{hi:016x}{lo:016x}")
}

/// Build the `Authorization: OAuth ...` header value for a request.
///
/// `body_params` are the `application/x-www-form-urlencoded` body fields, if
/// any; query parameters are taken from `url`.
pub fn authorization_header(
    method: &str,
    url: &Url,
    body_params: &[(String, String)],
    consumer: &OAuthConsumer,
    token: Option<(&str, &str)>,
    nonce: &str,
    timestamp: i64,
) -> String {
    let timestamp = timestamp.to_string();
    let mut oauth_params: Vec<(&str, &str)> = vec![
        ("oauth_consumer_key", consumer.consumer_key.as_str()),
        ("oauth_nonce", nonce),
        ("oauth_signature_method", "HMAC-SHA1"),
        ("oauth_timestamp", timestamp.as_str()),
        ("oauth_version", "1.0"),
    ];
    if let Some((key, _)) = token {
        oauth_params.push(("oauth_token", key));
    }

    let mut all: Vec<(String, String)> = oauth_params
        .iter()
        .map(|(k, v)| (percent_encode(k), percent_encode(v)))
        .collect();
    all.extend(
        url.query_pairs()
            .map(|(k, v)| (percent_encode(&k), percent_encode(&v))),
    );
    all.extend(
        body_params
            .iter()
            .map(|(k, v)| (percent_encode(k), percent_encode(v))),
    );
    all.sort();
    let normalized = all
        .iter()
        .map(|(k, v)| format!("{k}={v}"))
        .collect::<Vec<_>>()
        .join("&");

    let base = format!(
        "{}&{}&{}",
        method.to_ascii_uppercase(),
        percent_encode(&base_string_uri(url)),
        percent_encode(&normalized)
    );
    let signing_key = format!(
        "{}&{}",
        percent_encode(&consumer.consumer_secret),
        percent_encode(token.map(|(_, secret)| secret).unwrap_or(""))
    );
    let mut mac =
        HmacSha1::new_from_slice(signing_key.as_bytes()).expect("HMAC can take key of any size");
    mac.update(base.as_bytes());
    let signature = STANDARD.encode(mac.finalize().into_bytes());

    let mut header_params = oauth_params;
    header_params.push(("oauth_signature", signature.as_str()));
    let fields = header_params
        .iter()
        .map(|(k, v)| format!("{}=\"{}\"", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join(", ");
    format!("OAuth {fields}")
}

fn encode_form(params: &[(String, String)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", percent_encode(k), percent_encode(v)))
        .collect::<Vec<_>>()
        .join("&")
}

fn parse_oauth1_token(body: &str, domain: &str) -> Result<OAuth1Token, GarminError> {
    let mut token = OAuth1Token {
        oauth_token: String::new(),
        oauth_token_secret: String::new(),
        mfa_token: None,
        mfa_expiration_timestamp: None,
        domain: Some(domain.to_string()),
    };
    for pair in body.trim().split('&') {
        let (k, v) = pair.split_once('=').unwrap_or((pair, ""));
        let v = urlencoding::decode(&v.replace('+', " "))
            .map(|c| c.into_owned())
            .unwrap_or_else(|_| v.to_string());
        match k {
            "oauth_token" => token.oauth_token = v,
            "oauth_token_secret" => token.oauth_token_secret = v,
            "mfa_token" => token.mfa_token = Some(v),
            "mfa_expiration_timestamp" => token.mfa_expiration_timestamp = Some(v),
            _ => {}
        }
    }
    if token.oauth_token.is_empty() || token.oauth_token_secret.is_empty() {
        return Err(GarminError::Auth(
            "preauthorized response did not contain an oauth token".into(),
        ));
    }
    Ok(token)
}

/// Trade an SSO ticket for an OAuth1 token.
pub async fn preauthorize(
    http: &reqwest::Client,
    config: &GarminConfig,
    consumer: &OAuthConsumer,
    ticket: &str,
) -> Result<OAuth1Token, GarminError> {
    let login_url = config.sso_embed_url();
    let url = Url::parse_with_params(
        &config.oauth_url("preauthorized"),
        &[
            ("ticket", ticket),
            ("login-url", login_url.as_str()),
            ("accepts-mfa-tokens", "true"),
        ],
    )
    .map_err(|e| GarminError::Config(e.to_string()))?;
    let auth = authorization_header(
        "GET",
        &url,
        &[],
        consumer,
        None,
        &nonce(),
        chrono::Utc::now().timestamp(),
    );
    let resp = http
        .get(url)
        .header(AUTHORIZATION, auth)
        .header(USER_AGENT, MOBILE_USER_AGENT)
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(GarminError::from_response(resp).await);
    }
    let body = resp.text().await?;
    parse_oauth1_token(&body, &config.domain)
}

/// Trade an OAuth1 token for a fresh OAuth2 bearer token.
pub async fn exchange(
    http: &reqwest::Client,
    config: &GarminConfig,
    consumer: &OAuthConsumer,
    oauth1: &OAuth1Token,
) -> Result<OAuth2Token, GarminError> {
    let url = Url::parse(&config.oauth_url("exchange/user/2.0"))
        .map_err(|e| GarminError::Config(e.to_string()))?;
    let mut form = Vec::new();
    if let Some(mfa) = &oauth1.mfa_token {
        form.push(("mfa_token".to_string(), mfa.clone()));
    }
    let auth = authorization_header(
        "POST",
        &url,
        &form,
        consumer,
        Some((&oauth1.oauth_token, &oauth1.oauth_token_secret)),
        &nonce(),
        chrono::Utc::now().timestamp(),
    );
    let resp = http
        .post(url)
        .header(AUTHORIZATION, auth)
        .header(USER_AGENT, MOBILE_USER_AGENT)
        .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(encode_form(&form))
        .send()
        .await?;
    if !resp.status().is_success() {
        return Err(GarminError::from_response(resp).await);
    }
    let token = resp.json::<OAuth2Token>().await?;
    tracing::debug!("exchanged oauth1 token for oauth2 token");
    Ok(token.stamp_expirations(chrono::Utc::now().timestamp()))
}
