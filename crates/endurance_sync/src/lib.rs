//! Copies the daily Garmin Connect endurance score into the matching
//! Intervals.icu wellness record.
//!
//! The pieces are wired together by the binary: [`session::SessionManager`]
//! produces a Garmin session, [`secret_store::SecretStore`] supplies the
//! Intervals.icu API key, and [`sync::SyncDriver`] walks the date range and
//! hands present scores to [`uploader::Uploader`].

pub mod cli;
pub mod error;
pub mod prompt;
pub mod retry;
pub mod secret_store;
pub mod session;
pub mod sync;
pub mod uploader;

#[cfg(test)]
mod test_utils;

pub use error::{SyncError, SyncResult};
