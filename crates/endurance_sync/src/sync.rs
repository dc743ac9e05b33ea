//! The sync pass: read one endurance score per day and upload present ones.

use chrono::{Days, NaiveDate};
use garmin_connect_client::GarminClient;
use std::io::Write;
use std::sync::Arc;

use crate::error::{SyncError, SyncResult};
use crate::uploader::{UploadResult, Uploader};

/// Inclusive, ascending range of `days_back + 1` dates ending at `today`.
pub fn date_range(today: NaiveDate, days_back: u32) -> SyncResult<Vec<NaiveDate>> {
    let start = today
        .checked_sub_days(Days::new(u64::from(days_back)))
        .ok_or_else(|| SyncError::Validation(format!("--days {days_back} is out of range")))?;
    Ok(start.iter_days().take(days_back as usize + 1).collect())
}

#[derive(Clone, Debug, PartialEq)]
pub enum DateOutcome {
    /// The read failed; the message is the cause.
    FetchFailed(String),
    /// No score was published for the day.
    NoScore,
    /// Score read, upload suppressed by dry run.
    Skipped { score: f64 },
    /// Score read and an upload attempted.
    Upload(UploadResult),
}

#[derive(Clone, Debug, PartialEq)]
pub struct DateReport {
    pub date: NaiveDate,
    pub outcome: DateOutcome,
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct SyncReport {
    pub dates: Vec<DateReport>,
}

impl SyncReport {
    pub fn uploaded(&self) -> usize {
        self.dates
            .iter()
            .filter(|d| matches!(&d.outcome, DateOutcome::Upload(r) if r.succeeded()))
            .count()
    }

    pub fn upload_attempts(&self) -> usize {
        self.dates
            .iter()
            .filter(|d| matches!(d.outcome, DateOutcome::Upload(_)))
            .count()
    }

    pub fn failed(&self) -> usize {
        self.dates
            .iter()
            .filter(|d| match &d.outcome {
                DateOutcome::FetchFailed(_) => true,
                DateOutcome::Upload(r) => !r.succeeded(),
                _ => false,
            })
            .count()
    }
}

pub struct SyncDriver {
    source: Arc<dyn GarminClient>,
    uploader: Option<Uploader>,
}

impl SyncDriver {
    /// `uploader` may be `None` only for dry runs.
    pub fn new(source: Arc<dyn GarminClient>, uploader: Option<Uploader>) -> Self {
        Self { source, uploader }
    }

    /// Process every day from `today - days_back` to `today`, oldest first,
    /// writing one console line per outcome to `out`. Per-day failures are
    /// reported and never stop the pass.
    pub async fn run<W: Write>(
        &self,
        days_back: u32,
        dry_run: bool,
        today: NaiveDate,
        out: &mut W,
    ) -> SyncResult<SyncReport> {
        let uploader = match (&self.uploader, dry_run) {
            (_, true) => None,
            (Some(uploader), false) => Some(uploader),
            (None, false) => {
                return Err(SyncError::Config(
                    "uploads requested but no Intervals.icu uploader is configured".into(),
                ));
            }
        };

        let mut report = SyncReport::default();
        let mut header_written = false;
        for date in date_range(today, days_back)? {
            let outcome = self.process(date, uploader, &mut header_written, out).await?;
            report.dates.push(DateReport { date, outcome });
        }
        Ok(report)
    }

    async fn process<W: Write>(
        &self,
        date: NaiveDate,
        uploader: Option<&Uploader>,
        header_written: &mut bool,
        out: &mut W,
    ) -> SyncResult<DateOutcome> {
        let score = match self.source.get_endurance_score(date).await {
            Ok(s) => s.overall_score,
            Err(e) => {
                tracing::debug!(%date, error = ?e, "endurance score lookup failed");
                writeln!(out, "{date}: Error fetching data - {e}")?;
                return Ok(DateOutcome::FetchFailed(e.to_string()));
            }
        };
        let Some(score) = score else {
            writeln!(out, "{date}: No score available")?;
            return Ok(DateOutcome::NoScore);
        };

        if !*header_written {
            writeln!(out, "Endurance score data from Garmin Connect:")?;
            *header_written = true;
        }
        writeln!(out, "{date}: {score}")?;

        let Some(uploader) = uploader else {
            writeln!(out, "  → DRY RUN: Skipped upload")?;
            return Ok(DateOutcome::Skipped { score });
        };
        let result = uploader.upload(date, score).await;
        writeln!(out, "{}", result.message())?;
        Ok(DateOutcome::Upload(result))
    }
}
