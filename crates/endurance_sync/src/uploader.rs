//! Upserting endurance scores into Intervals.icu wellness records.

use chrono::NaiveDate;
use intervals_icu_client::{IntervalsError, WellnessClient, WellnessUpdate};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::SyncResult;
use crate::secret_store::SecretStore;

#[derive(Clone, Debug, PartialEq)]
pub enum UploadOutcome {
    /// Stored; `retried` is set when a replacement API key was needed.
    Uploaded { retried: bool },
    /// The server answered with something other than 200/201.
    Failed {
        status: Option<u16>,
        message: String,
        retried: bool,
    },
    /// No response at all (connection refused, timeout, ...).
    TransportError(String),
}

#[derive(Clone, Debug, PartialEq)]
pub struct UploadResult {
    pub date: NaiveDate,
    pub score: f64,
    /// The first attempt was answered with 401.
    pub key_rejected: bool,
    pub outcome: UploadOutcome,
}

impl UploadResult {
    pub fn succeeded(&self) -> bool {
        matches!(self.outcome, UploadOutcome::Uploaded { .. })
    }

    pub fn status(&self) -> Option<u16> {
        match &self.outcome {
            UploadOutcome::Uploaded { .. } => Some(200),
            UploadOutcome::Failed { status, .. } => *status,
            UploadOutcome::TransportError(_) => None,
        }
    }

    /// Console lines describing the outcome. A rejected key adds a notice
    /// line before the result line.
    pub fn message(&self) -> String {
        let line = self.outcome_line();
        if self.key_rejected {
            format!("{UNAUTHORIZED_NOTICE}\n{line}")
        } else {
            line
        }
    }

    fn outcome_line(&self) -> String {
        match &self.outcome {
            UploadOutcome::Uploaded { retried: false } => {
                format!("  → Uploaded to Intervals.icu: {}", self.score)
            }
            UploadOutcome::Uploaded { retried: true } => {
                format!("  → Uploaded with new API key: {}", self.score)
            }
            UploadOutcome::Failed {
                status,
                message,
                retried,
            } => {
                let status = status.map_or_else(|| "-".to_string(), |s| s.to_string());
                if *retried {
                    format!("  → Failed again ({status}): {message}")
                } else {
                    format!("  → Failed to upload ({status}): {message}")
                }
            }
            UploadOutcome::TransportError(e) => {
                format!("  → Error uploading to Intervals.icu: {e}")
            }
        }
    }
}

const UNAUTHORIZED_NOTICE: &str = "  → Unauthorized: Your API key may be invalid.";

/// Sends scores to Intervals.icu. A 401 triggers one key replacement and
/// one retry of the same request.
pub struct Uploader {
    client: Arc<dyn WellnessClient>,
    secrets: Arc<SecretStore>,
    // Bumped on every key replacement so that callers that saw a 401 with an
    // already-replaced key retry instead of prompting again.
    key_generation: Mutex<u64>,
}

impl Uploader {
    pub fn new(client: Arc<dyn WellnessClient>, secrets: Arc<SecretStore>) -> Self {
        Self {
            client,
            secrets,
            key_generation: Mutex::new(0),
        }
    }

    pub async fn upload(&self, date: NaiveDate, score: f64) -> UploadResult {
        let update = WellnessUpdate::endurance_score(score);
        let generation = *self.key_generation.lock().await;

        let mut key_rejected = false;
        let outcome = match self.client.update_wellness(date, &update).await {
            Ok(_) => UploadOutcome::Uploaded { retried: false },
            Err(e) if e.is_unauthorized() => {
                key_rejected = true;
                match self.refresh_key(generation).await {
                    Ok(()) => match self.client.update_wellness(date, &update).await {
                        Ok(_) => UploadOutcome::Uploaded { retried: true },
                        Err(e) => failure(e, true),
                    },
                    Err(e) => UploadOutcome::Failed {
                        status: Some(401),
                        message: format!("could not replace API key: {e}"),
                        retried: false,
                    },
                }
            }
            Err(e) => failure(e, false),
        };

        if let UploadOutcome::TransportError(e) = &outcome {
            tracing::warn!(%date, "upload transport error: {e}");
        }
        UploadResult {
            date,
            score,
            key_rejected,
            outcome,
        }
    }

    /// Replace the API key unless someone else already did since
    /// `seen_generation`.
    async fn refresh_key(&self, seen_generation: u64) -> SyncResult<()> {
        let mut generation = self.key_generation.lock().await;
        if *generation != seen_generation {
            return Ok(());
        }
        // The prompt blocks on the terminal; keep it off the runtime threads.
        let secrets = Arc::clone(&self.secrets);
        let key = tokio::task::spawn_blocking(move || secrets.get_api_key(true)).await??;
        self.client.replace_api_key(key);
        *generation += 1;
        Ok(())
    }
}

fn failure(e: IntervalsError, retried: bool) -> UploadOutcome {
    if e.is_transport() {
        return UploadOutcome::TransportError(e.to_string());
    }
    let status = e.status();
    let message = match e {
        IntervalsError::Status { body, .. }
        | IntervalsError::Unauthorized(body)
        | IntervalsError::NotFound(body) => body,
        other => other.to_string(),
    };
    UploadOutcome::Failed {
        status,
        message,
        retried,
    }
}
