//! Shared fakes for unit tests: scripted prompts, an in-memory score source
//! and a wellness client that records every upsert.
#![cfg(test)]

use async_trait::async_trait;
use chrono::NaiveDate;
use garmin_connect_client::{EnduranceScore, GarminClient, GarminError, SocialProfile};
use intervals_icu_client::{IntervalsError, WellnessClient, WellnessUpdate};
use secrecy::{ExposeSecret, SecretString};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::thread::ThreadId;

use crate::error::{SyncError, SyncResult};
use crate::prompt::Prompter;

#[derive(Default)]
pub struct ScriptedPrompter {
    identifier: Option<String>,
    secret: Option<String>,
    codes: Mutex<VecDeque<String>>,
    api_keys: Mutex<VecDeque<String>>,
    calls: Mutex<Vec<&'static str>>,
    threads: Mutex<Vec<ThreadId>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identifier(mut self, id: &str) -> Self {
        self.identifier = Some(id.into());
        self
    }

    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret = Some(secret.into());
        self
    }

    pub fn with_codes(self, codes: &[&str]) -> Self {
        self.codes
            .lock()
            .unwrap()
            .extend(codes.iter().map(|c| c.to_string()));
        self
    }

    pub fn with_api_keys(self, keys: &[&str]) -> Self {
        self.api_keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.calls.lock().unwrap().clone()
    }

    /// Threads the prompts were answered on.
    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().unwrap().clone()
    }

    fn record(&self, what: &'static str) {
        self.calls.lock().unwrap().push(what);
        self.threads.lock().unwrap().push(std::thread::current().id());
    }
}

fn exhausted(what: &str) -> SyncError {
    SyncError::Validation(format!("no scripted {what} left"))
}

impl Prompter for ScriptedPrompter {
    fn identifier(&self) -> SyncResult<String> {
        self.record("identifier");
        self.identifier.clone().ok_or_else(|| exhausted("identifier"))
    }

    fn secret(&self) -> SyncResult<SecretString> {
        self.record("secret");
        self.secret
            .clone()
            .map(|s| SecretString::new(s.into()))
            .ok_or_else(|| exhausted("secret"))
    }

    fn one_time_code(&self) -> SyncResult<String> {
        self.record("one_time_code");
        self.codes
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| exhausted("code"))
    }

    fn api_key(&self) -> SyncResult<SecretString> {
        self.record("api_key");
        self.api_keys
            .lock()
            .unwrap()
            .pop_front()
            .map(|k| SecretString::new(k.into()))
            .ok_or_else(|| exhausted("api key"))
    }
}

/// Score source answering from a fixed table. Dates not in the table have
/// no score.
#[derive(Default)]
pub struct FakeGarmin {
    scores: HashMap<NaiveDate, Result<Option<f64>, String>>,
    requested: Mutex<Vec<NaiveDate>>,
}

impl FakeGarmin {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn score(mut self, date: NaiveDate, score: Option<f64>) -> Self {
        self.scores.insert(date, Ok(score));
        self
    }

    pub fn failing(mut self, date: NaiveDate, message: &str) -> Self {
        self.scores.insert(date, Err(message.into()));
        self
    }

    pub fn requested(&self) -> Vec<NaiveDate> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl GarminClient for FakeGarmin {
    async fn validate(&self) -> Result<SocialProfile, GarminError> {
        Ok(SocialProfile::default())
    }

    async fn get_endurance_score(&self, date: NaiveDate) -> Result<EnduranceScore, GarminError> {
        self.requested.lock().unwrap().push(date);
        match self.scores.get(&date) {
            Some(Ok(score)) => Ok(EnduranceScore {
                calendar_date: Some(date.to_string()),
                overall_score: *score,
                classification: None,
            }),
            Some(Err(message)) => Err(GarminError::Sso(message.clone())),
            None => Ok(EnduranceScore::default()),
        }
    }
}

/// One recorded upsert: the date, the score sent and the key in use.
#[derive(Clone, Debug, PartialEq)]
pub struct RecordedUpsert {
    pub date: NaiveDate,
    pub score: Option<f64>,
    pub api_key: String,
}

/// Wellness client answering with scripted statuses (200 once the script
/// runs out). Requests made with a rejected key always get a 401.
pub struct RecordingWellness {
    api_key: Mutex<String>,
    rejected_keys: Mutex<Vec<String>>,
    statuses: Mutex<VecDeque<u16>>,
    upserts: Mutex<Vec<RecordedUpsert>>,
}

impl RecordingWellness {
    pub fn new(api_key: &str) -> Self {
        Self {
            api_key: Mutex::new(api_key.into()),
            rejected_keys: Mutex::new(Vec::new()),
            statuses: Mutex::new(VecDeque::new()),
            upserts: Mutex::new(Vec::new()),
        }
    }

    pub fn with_statuses(self, statuses: &[u16]) -> Self {
        self.statuses.lock().unwrap().extend(statuses.iter().copied());
        self
    }

    pub fn rejecting(self, keys: &[&str]) -> Self {
        self.rejected_keys
            .lock()
            .unwrap()
            .extend(keys.iter().map(|k| k.to_string()));
        self
    }

    pub fn upserts(&self) -> Vec<RecordedUpsert> {
        self.upserts.lock().unwrap().clone()
    }
}

#[async_trait]
impl WellnessClient for RecordingWellness {
    async fn update_wellness(
        &self,
        date: NaiveDate,
        update: &WellnessUpdate,
    ) -> Result<serde_json::Value, IntervalsError> {
        let api_key = self.api_key.lock().unwrap().clone();
        let rejected = self.rejected_keys.lock().unwrap().contains(&api_key);
        self.upserts.lock().unwrap().push(RecordedUpsert {
            date,
            score: update.endurance_score,
            api_key,
        });
        let status = if rejected {
            401
        } else {
            self.statuses.lock().unwrap().pop_front().unwrap_or(200)
        };
        match status {
            200 | 201 => Ok(serde_json::json!({"id": date.to_string()})),
            401 => Err(IntervalsError::Unauthorized("bad key".into())),
            status => Err(IntervalsError::Status {
                status,
                body: "server says no".into(),
            }),
        }
    }

    fn replace_api_key(&self, api_key: SecretString) {
        *self.api_key.lock().unwrap() = api_key.expose_secret().to_string();
    }
}

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}
