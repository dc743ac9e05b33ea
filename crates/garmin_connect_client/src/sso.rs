//! Garmin SSO sign-in flow.
//!
//! The embed widget pages are scraped for a CSRF token and the page title;
//! a `Success` page carries the service ticket that is then traded for
//! OAuth tokens. Accounts with two-factor auth get an `MFA` page instead,
//! which is returned to the caller as [`LoginOutcome::NeedsMfa`].

use crate::config::GarminConfig;
use crate::oauth;
use crate::tokens::GarminTokens;
use crate::GarminError;
use regex::Regex;
use reqwest::header::{REFERER, USER_AGENT};
use secrecy::{ExposeSecret, SecretString};
use std::sync::LazyLock;

const SSO_USER_AGENT: &str = "GCM-iOS-5.7.2.1";

static CSRF_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"name="_csrf"\s+value="(.+?)""#).unwrap());
static TITLE_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<title>(.+?)</title>").unwrap());
static TICKET_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"embed\?ticket=([^"]+)""#).unwrap());

/// State carried between the password step and the one-time code step.
#[derive(Debug)]
pub struct PendingMfa {
    csrf: String,
    referer: String,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Success(GarminTokens),
    NeedsMfa(PendingMfa),
}

/// Cookie-carrying client for one sign-in attempt.
pub struct GarminSso {
    config: GarminConfig,
    http: reqwest::Client,
}

impl GarminSso {
    pub fn new(config: GarminConfig) -> Result<Self, GarminError> {
        let http = reqwest::Client::builder()
            .cookie_store(true)
            .timeout(config.timeout)
            .build()?;
        Ok(Self { config, http })
    }

    fn signin_url(&self) -> String {
        format!("{}/signin", self.config.sso_url)
    }

    fn signin_params(&self) -> Vec<(&'static str, String)> {
        let embed = self.config.sso_embed_url();
        vec![
            ("id", "gauth-widget".to_string()),
            ("embedWidget", "true".to_string()),
            ("gauthHost", embed.clone()),
            ("service", embed.clone()),
            ("source", embed.clone()),
            ("redirectAfterAccountLoginUrl", embed.clone()),
            ("redirectAfterAccountCreationUrl", embed),
        ]
    }

    async fn page(&self, req: reqwest::RequestBuilder) -> Result<String, GarminError> {
        let resp = req.header(USER_AGENT, SSO_USER_AGENT).send().await?;
        if !resp.status().is_success() {
            return Err(GarminError::from_response(resp).await);
        }
        Ok(resp.text().await?)
    }

    /// Submit email and password. Returns tokens directly unless the account
    /// requires a second factor.
    pub async fn login(
        &self,
        email: &str,
        password: &SecretString,
    ) -> Result<LoginOutcome, GarminError> {
        let embed = self.config.sso_embed_url();
        // Seeds the session cookies.
        self.page(self.http.get(&embed).query(&[
            ("id", "gauth-widget"),
            ("embedWidget", "true"),
            ("gauthHost", self.config.sso_url.as_str()),
        ]))
        .await?;

        let params = self.signin_params();
        let signin = self.signin_url();
        let html = self
            .page(
                self.http
                    .get(&signin)
                    .query(&params)
                    .header(REFERER, embed.as_str()),
            )
            .await?;
        let csrf = capture(&CSRF_RE, &html, "csrf token")?;

        let html = self
            .page(
                self.http
                    .post(&signin)
                    .query(&params)
                    .header(REFERER, signin.as_str())
                    .form(&[
                        ("username", email),
                        ("password", password.expose_secret()),
                        ("embed", "true"),
                        ("_csrf", csrf.as_str()),
                    ]),
            )
            .await?;
        let title = capture(&TITLE_RE, &html, "page title")?;
        if title.contains("MFA") {
            tracing::debug!("garmin sso requested a second factor");
            let csrf = capture(&CSRF_RE, &html, "mfa csrf token")?;
            return Ok(LoginOutcome::NeedsMfa(PendingMfa {
                csrf,
                referer: signin,
            }));
        }
        self.complete_login(&title, &html).await.map(LoginOutcome::Success)
    }

    /// Finish a login that stopped at the MFA page.
    pub async fn resume_login(
        &self,
        pending: PendingMfa,
        code: &str,
    ) -> Result<GarminTokens, GarminError> {
        let url = format!("{}/verifyMFA/loginEnterMfaCode", self.config.sso_url);
        let html = self
            .page(
                self.http
                    .post(&url)
                    .query(&self.signin_params())
                    .header(REFERER, pending.referer.as_str())
                    .form(&[
                        ("mfa-code", code.trim()),
                        ("embed", "true"),
                        ("_csrf", pending.csrf.as_str()),
                        ("fromPage", "setupEnterMfaCode"),
                    ]),
            )
            .await?;
        let title = capture(&TITLE_RE, &html, "page title")?;
        self.complete_login(&title, &html).await
    }

    async fn complete_login(&self, title: &str, html: &str) -> Result<GarminTokens, GarminError> {
        if title != "Success" {
            return Err(GarminError::Auth(format!("sign-in page title: {title}")));
        }
        let ticket = capture(&TICKET_RE, html, "service ticket")?;
        let consumer = oauth::fetch_consumer(&self.http, &self.config).await?;
        let oauth1 = oauth::preauthorize(&self.http, &self.config, &consumer, &ticket).await?;
        let oauth2 = oauth::exchange(&self.http, &self.config, &consumer, &oauth1).await?;
        Ok(GarminTokens { oauth1, oauth2 })
    }
}

fn capture(re: &Regex, html: &str, what: &str) -> Result<String, GarminError> {
    re.captures(html)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .ok_or_else(|| GarminError::Sso(format!("{what} not found")))
}
