//! OAuth token types and the directory they are persisted to.
//!
//! The on-disk layout is two JSON files, `oauth1_token.json` and
//! `oauth2_token.json`, so a directory written by other Garmin tooling that
//! uses the same layout can be reused.

use crate::GarminError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

const OAUTH1_FILE: &str = "oauth1_token.json";
const OAUTH2_FILE: &str = "oauth2_token.json";

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OAuth1Token {
    pub oauth_token: String,
    pub oauth_token_secret: String,
    #[serde(default)]
    pub mfa_token: Option<String>,
    #[serde(default)]
    pub mfa_expiration_timestamp: Option<String>,
    #[serde(default)]
    pub domain: Option<String>,
}

impl fmt::Debug for OAuth1Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth1Token")
            .field("oauth_token", &"[redacted]")
            .field("mfa_token", &self.mfa_token.as_ref().map(|_| "[redacted]"))
            .field("domain", &self.domain)
            .finish()
    }
}

#[derive(Clone, Deserialize, Serialize, PartialEq, Eq)]
pub struct OAuth2Token {
    #[serde(default)]
    pub scope: String,
    #[serde(default)]
    pub jti: String,
    pub token_type: String,
    pub access_token: String,
    pub refresh_token: String,
    pub expires_in: i64,
    #[serde(default)]
    pub expires_at: i64,
    #[serde(default)]
    pub refresh_token_expires_in: i64,
    #[serde(default)]
    pub refresh_token_expires_at: i64,
}

impl fmt::Debug for OAuth2Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Token")
            .field("token_type", &self.token_type)
            .field("access_token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

impl OAuth2Token {
    /// Fill the absolute expiry timestamps from the relative lifetimes the
    /// exchange endpoint returns.
    pub fn stamp_expirations(mut self, now: i64) -> Self {
        self.expires_at = now + self.expires_in;
        self.refresh_token_expires_at = now + self.refresh_token_expires_in;
        self
    }

    pub fn expired(&self, now: i64) -> bool {
        self.expires_at < now
    }

    pub fn authorization_header(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// The token pair that makes up a Garmin Connect session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GarminTokens {
    pub oauth1: OAuth1Token,
    pub oauth2: OAuth2Token,
}

/// Directory holding a persisted session.
#[derive(Clone, Debug)]
pub struct TokenStore {
    dir: PathBuf,
}

impl TokenStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Read both token files. A missing file surfaces as `GarminError::Io`.
    pub fn load(&self) -> Result<GarminTokens, GarminError> {
        let oauth1: OAuth1Token = read_json(&self.dir.join(OAUTH1_FILE))?;
        let oauth2: OAuth2Token = read_json(&self.dir.join(OAUTH2_FILE))?;
        if oauth2.access_token.is_empty() {
            return Err(GarminError::TokenStore(format!(
                "{OAUTH2_FILE} has an empty access token"
            )));
        }
        Ok(GarminTokens { oauth1, oauth2 })
    }

    /// Write both token files, replacing whatever was there.
    pub fn dump(&self, tokens: &GarminTokens) -> Result<(), GarminError> {
        std::fs::create_dir_all(&self.dir)?;
        write_json(&self.dir.join(OAUTH1_FILE), &tokens.oauth1)?;
        write_json(&self.dir.join(OAUTH2_FILE), &tokens.oauth2)?;
        tracing::debug!(dir = %self.dir.display(), "garmin tokens written");
        Ok(())
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, GarminError> {
    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), GarminError> {
    let raw = serde_json::to_string_pretty(value)?;
    std::fs::write(path, raw)?;
    Ok(())
}

#[cfg(test)]
pub(crate) fn sample_tokens(expires_at: i64) -> GarminTokens {
    GarminTokens {
        oauth1: OAuth1Token {
            oauth_token: "o1".into(),
            oauth_token_secret: "o1secret".into(),
            mfa_token: None,
            mfa_expiration_timestamp: None,
            domain: Some("garmin.com".into()),
        },
        oauth2: OAuth2Token {
            scope: "CONNECT_READ".into(),
            jti: "jti".into(),
            token_type: "Bearer".into(),
            access_token: "access".into(),
            refresh_token: "refresh".into(),
            expires_in: 3600,
            expires_at,
            refresh_token_expires_in: 7200,
            refresh_token_expires_at: expires_at + 3600,
        },
    }
}
