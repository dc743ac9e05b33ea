//! Obtaining an authenticated Garmin Connect session.
//!
//! A stored session is preferred. When it is missing or rejected the user
//! logs in again (credentials from the environment or prompted), answering a
//! one-time code challenge if the account requires one, and the new tokens
//! are written back to the token directory.

use garmin_connect_client::GarminClient;
use garmin_connect_client::config::GarminConfig;
use garmin_connect_client::http_client::ReqwestGarminClient;
use garmin_connect_client::sso::{GarminSso, LoginOutcome};
use garmin_connect_client::tokens::{GarminTokens, TokenStore};
use std::sync::Arc;

use crate::error::SyncResult;
use crate::prompt::{Credentials, Prompter};

pub struct SessionManager {
    config: GarminConfig,
    store: TokenStore,
    credentials: Credentials,
    prompter: Arc<dyn Prompter>,
}

impl SessionManager {
    pub fn new(
        config: GarminConfig,
        store: TokenStore,
        credentials: Credentials,
        prompter: Arc<dyn Prompter>,
    ) -> Self {
        Self {
            config,
            store,
            credentials,
            prompter,
        }
    }

    /// Return a session accepted by Garmin Connect, logging in if needed.
    pub async fn acquire(&self) -> SyncResult<ReqwestGarminClient> {
        let dir = self.store.dir().display();
        println!("Trying to login to Garmin Connect using token data from directory '{dir}'...");

        match self.resume().await {
            Ok(client) => {
                println!("Login to Garmin Connect successful.");
                return Ok(client);
            }
            Err(e) => tracing::debug!(error = %e, "stored garmin session unusable"),
        }

        println!(
            "Login tokens not present, login with your Garmin Connect credentials to generate them.\n\
             They will be stored in '{dir}' for future use."
        );
        let client = self.login().await?;
        println!("Login to Garmin Connect successful.");
        Ok(client)
    }

    /// Load the stored session and check it with a trivial call.
    async fn resume(&self) -> SyncResult<ReqwestGarminClient> {
        let stored = self.store.load()?;
        let client = ReqwestGarminClient::new(self.config.clone(), stored.clone())?;
        client.validate().await?;
        let current = client.tokens().await;
        if current != stored {
            self.persist(&current);
        }
        Ok(client)
    }

    async fn login(&self) -> SyncResult<ReqwestGarminClient> {
        // Prompts block on the terminal; keep them off the runtime threads.
        let credentials = self.credentials.clone();
        let prompter = Arc::clone(&self.prompter);
        let (identifier, secret) =
            tokio::task::spawn_blocking(move || credentials.resolve(prompter.as_ref())).await??;
        let sso = GarminSso::new(self.config.clone())?;
        let tokens = match sso.login(&identifier, &secret).await? {
            LoginOutcome::Success(tokens) => tokens,
            LoginOutcome::NeedsMfa(pending) => {
                let prompter = Arc::clone(&self.prompter);
                let code = tokio::task::spawn_blocking(move || prompter.one_time_code()).await??;
                sso.resume_login(pending, &code).await?
            }
        };
        if self.persist(&tokens) {
            println!(
                "Oauth tokens stored in '{}' for future use.",
                self.store.dir().display()
            );
        }
        Ok(ReqwestGarminClient::new(self.config.clone(), tokens)?)
    }

    /// Write tokens to the store; a failure only costs a login next run.
    fn persist(&self, tokens: &GarminTokens) -> bool {
        match self.store.dump(tokens) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    dir = %self.store.dir().display(),
                    "Failed to save Garmin tokens: {e}"
                );
                false
            }
        }
    }
}
