//! Error type for the sync tool.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Garmin Connect error: {0}")]
    Garmin(#[from] garmin_connect_client::GarminError),

    #[error("Intervals.icu error: {0}")]
    Intervals(#[from] intervals_icu_client::IntervalsError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Prompt error: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// Result type alias for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;
