//! Where login credentials, one-time codes and the API key come from when
//! they are not already known.

use crate::error::{SyncError, SyncResult};
use secrecy::SecretString;

/// Supplies credentials on demand. The terminal implementation asks the
/// user; tests script the answers.
pub trait Prompter: Send + Sync {
    fn identifier(&self) -> SyncResult<String>;
    fn secret(&self) -> SyncResult<SecretString>;
    fn one_time_code(&self) -> SyncResult<String>;
    fn api_key(&self) -> SyncResult<SecretString>;
}

/// Interactive prompts on the controlling terminal.
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalPrompter;

impl Prompter for TerminalPrompter {
    fn identifier(&self) -> SyncResult<String> {
        let email = dialoguer::Input::<String>::new()
            .with_prompt("Login e-mail")
            .interact_text()?;
        Ok(email.trim().to_string())
    }

    fn secret(&self) -> SyncResult<SecretString> {
        let password = dialoguer::Password::new()
            .with_prompt("Enter password")
            .interact()?;
        Ok(SecretString::new(password.into()))
    }

    fn one_time_code(&self) -> SyncResult<String> {
        let code = dialoguer::Input::<String>::new()
            .with_prompt("MFA one-time code")
            .interact_text()?;
        Ok(code.trim().to_string())
    }

    fn api_key(&self) -> SyncResult<SecretString> {
        let key = dialoguer::Password::new()
            .with_prompt("Enter your Intervals.icu API Key")
            .interact()?;
        Ok(SecretString::new(key.trim().to_string().into()))
    }
}

/// Garmin login credentials taken from the environment. Either half may be
/// missing, in which case it is prompted for.
#[derive(Clone, Debug, Default)]
pub struct Credentials {
    pub identifier: Option<String>,
    pub secret: Option<SecretString>,
}

impl Credentials {
    pub fn from_env() -> Self {
        Self::from_env_with(|k| std::env::var(k).ok())
    }

    pub fn from_env_with<F>(mut get: F) -> Self
    where
        F: FnMut(&str) -> Option<String>,
    {
        let identifier = get("EMAIL").filter(|v| !v.trim().is_empty());
        let secret = get("PASSWORD")
            .filter(|v| !v.is_empty())
            .map(|v| SecretString::new(v.into()));
        Self { identifier, secret }
    }

    /// Fill in whichever half is missing from `prompter`.
    pub fn resolve(&self, prompter: &dyn Prompter) -> SyncResult<(String, SecretString)> {
        let identifier = match &self.identifier {
            Some(id) => id.clone(),
            None => prompter.identifier()?,
        };
        if identifier.is_empty() {
            return Err(SyncError::Validation("login e-mail cannot be empty".into()));
        }
        let secret = match &self.secret {
            Some(secret) => secret.clone(),
            None => prompter.secret()?,
        };
        Ok((identifier, secret))
    }
}
