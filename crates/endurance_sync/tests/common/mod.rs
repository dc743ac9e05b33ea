#![allow(dead_code)]

use endurance_sync::prompt::Prompter;
use endurance_sync::{SyncError, SyncResult};
use garmin_connect_client::tokens::{GarminTokens, OAuth1Token, OAuth2Token};
use secrecy::SecretString;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::thread::ThreadId;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const SIGNIN_PAGE: &str = r#"<html><head><title>GARMIN Authentication Application</title></head>
<body><form><input type="hidden" name="_csrf" value="csrf-1"/></form></body></html>"#;

pub const MFA_PAGE: &str = r#"<html><head><title>Enter MFA code for login</title></head>
<body><form><input type="hidden" name="_csrf" value="csrf-mfa"/></form></body></html>"#;

pub const SUCCESS_PAGE: &str = r#"<html><head><title>Success</title></head>
<body><script>var response_url = "https://sso.garmin.com/sso/embed?ticket=ST-7-cas";</script></body></html>"#;

/// Answers prompts from fixed queues and records what was asked.
#[derive(Default)]
pub struct QueuedPrompter {
    identifiers: Mutex<VecDeque<String>>,
    secrets: Mutex<VecDeque<String>>,
    codes: Mutex<VecDeque<String>>,
    api_keys: Mutex<VecDeque<String>>,
    asked: Mutex<Vec<&'static str>>,
    threads: Mutex<Vec<ThreadId>>,
}

impl QueuedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn identifier(self, v: &str) -> Self {
        self.identifiers.lock().unwrap().push_back(v.into());
        self
    }

    pub fn secret(self, v: &str) -> Self {
        self.secrets.lock().unwrap().push_back(v.into());
        self
    }

    pub fn code(self, v: &str) -> Self {
        self.codes.lock().unwrap().push_back(v.into());
        self
    }

    pub fn api_key(self, v: &str) -> Self {
        self.api_keys.lock().unwrap().push_back(v.into());
        self
    }

    pub fn asked(&self) -> Vec<&'static str> {
        self.asked.lock().unwrap().clone()
    }

    pub fn threads(&self) -> Vec<ThreadId> {
        self.threads.lock().unwrap().clone()
    }

    fn next(&self, what: &'static str, queue: &Mutex<VecDeque<String>>) -> SyncResult<String> {
        self.asked.lock().unwrap().push(what);
        self.threads.lock().unwrap().push(std::thread::current().id());
        queue
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| SyncError::Validation(format!("unexpected {what} prompt")))
    }
}

impl Prompter for QueuedPrompter {
    fn identifier(&self) -> SyncResult<String> {
        self.next("identifier", &self.identifiers)
    }

    fn secret(&self) -> SyncResult<SecretString> {
        self.next("secret", &self.secrets)
            .map(|s| SecretString::new(s.into()))
    }

    fn one_time_code(&self) -> SyncResult<String> {
        self.next("one_time_code", &self.codes)
    }

    fn api_key(&self) -> SyncResult<SecretString> {
        self.next("api_key", &self.api_keys)
            .map(|s| SecretString::new(s.into()))
    }
}

pub fn stored_tokens(access_token: &str, expires_at: i64) -> GarminTokens {
    let oauth2: OAuth2Token = serde_json::from_value(serde_json::json!({
        "token_type": "Bearer",
        "access_token": access_token,
        "refresh_token": "refresh",
        "expires_in": 3600,
        "expires_at": expires_at
    }))
    .unwrap();
    GarminTokens {
        oauth1: OAuth1Token {
            oauth_token: "t1".into(),
            oauth_token_secret: "s1".into(),
            mfa_token: None,
            mfa_expiration_timestamp: None,
            domain: None,
        },
        oauth2,
    }
}

/// SSO widget pages; the password POST answers with `after_password`.
pub async fn mount_sso(server: &MockServer, after_password: &str) {
    Mock::given(method("GET"))
        .and(path("/sso/embed"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sso/signin"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SIGNIN_PAGE))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/signin"))
        .and(body_string_contains("_csrf=csrf-1"))
        .respond_with(ResponseTemplate::new(200).set_body_string(after_password))
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/sso/verifyMFA/loginEnterMfaCode"))
        .and(body_string_contains("_csrf=csrf-mfa"))
        .respond_with(ResponseTemplate::new(200).set_body_string(SUCCESS_PAGE))
        .mount(server)
        .await;
}

/// Consumer, preauthorize and exchange endpoints issuing access token `fresh-access`.
pub async fn mount_oauth(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/oauth_consumer.json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "consumer_key": "ck",
            "consumer_secret": "cs"
        })))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path("/oauth-service/oauth/preauthorized"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("oauth_token=t2&oauth_token_secret=s2"),
        )
        .mount(server)
        .await;
    Mock::given(method("POST"))
        .and(path("/oauth-service/oauth/exchange/user/2.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "scope": "CONNECT_READ",
            "jti": "j",
            "token_type": "Bearer",
            "access_token": "fresh-access",
            "refresh_token": "fresh-refresh",
            "expires_in": 3600,
            "refresh_token_expires_in": 7200
        })))
        .mount(server)
        .await;
}
