//! On-disk cache for the Intervals.icu API key.
//!
//! The key is stored base64-encoded in a small JSON file next to the Garmin
//! tokens. This only keeps the key from being readable at a glance; it is
//! not encryption.

use base64::{Engine as _, engine::general_purpose::STANDARD};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::prompt::Prompter;

pub const API_KEY_FILE: &str = "api_key.json";

#[derive(Debug, Deserialize, Serialize)]
struct StoredKey {
    #[serde(default)]
    api_key: String,
}

pub struct SecretStore {
    path: PathBuf,
    prompter: Arc<dyn Prompter>,
}

impl SecretStore {
    pub fn new(dir: &Path, prompter: Arc<dyn Prompter>) -> Self {
        Self {
            path: dir.join(API_KEY_FILE),
            prompter,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Return the cached key, or ask for one when there is none or
    /// `force_new` is set. A freshly entered key is written back to disk.
    ///
    /// Cache read and write failures are logged and otherwise ignored.
    pub fn get_api_key(&self, force_new: bool) -> SyncResult<SecretString> {
        if !force_new {
            match self.read_cached() {
                Ok(Some(key)) => return Ok(key),
                Ok(None) => {}
                Err(e) => tracing::warn!(path = %self.path.display(), "Error reading stored API key: {e}"),
            }
        }

        let key = self.prompter.api_key()?;
        if key.expose_secret().trim().is_empty() {
            return Err(SyncError::Validation("API key cannot be empty".into()));
        }

        match self.write_cached(&key) {
            Ok(()) => println!("API key saved to {}", self.path.display()),
            Err(e) => tracing::error!(path = %self.path.display(), "Failed to save API key: {e}"),
        }
        Ok(key)
    }

    fn read_cached(&self) -> SyncResult<Option<SecretString>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let raw = std::fs::read_to_string(&self.path)?;
        let stored: StoredKey = serde_json::from_str(&raw)?;
        if stored.api_key.is_empty() {
            return Ok(None);
        }
        let bytes = STANDARD
            .decode(stored.api_key.as_bytes())
            .map_err(|e| SyncError::Cache(format!("api key is not valid base64: {e}")))?;
        let key = String::from_utf8(bytes)
            .map_err(|e| SyncError::Cache(format!("api key is not valid utf-8: {e}")))?;
        Ok(Some(SecretString::new(key.into())))
    }

    fn write_cached(&self, key: &SecretString) -> SyncResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let stored = StoredKey {
            api_key: STANDARD.encode(key.expose_secret().as_bytes()),
        };
        std::fs::write(&self.path, serde_json::to_string(&stored)?)?;
        Ok(())
    }
}
