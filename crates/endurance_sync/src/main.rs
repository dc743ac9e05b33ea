use clap::Parser;
use std::sync::Arc;

use endurance_sync::cli::{self, Cli};
use endurance_sync::prompt::{Credentials, Prompter, TerminalPrompter};
use endurance_sync::retry::RetryPolicy;
use endurance_sync::secret_store::SecretStore;
use endurance_sync::session::SessionManager;
use endurance_sync::sync::SyncDriver;
use endurance_sync::uploader::Uploader;
use garmin_connect_client::config::GarminConfig;
use garmin_connect_client::tokens::TokenStore;
use intervals_icu_client::http_client::ReqwestIntervalsClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env_filter = cli::log_filter();
    let directive = env_filter.to_string();
    tracing_subscriber::fmt()
        .compact()
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .with_target(false)
        .with_env_filter(env_filter)
        .init();
    tracing::debug!("endurance_sync: log filter: {}", directive);

    let args = Cli::parse();
    let token_dir = args.token_dir();
    let prompter: Arc<dyn Prompter> = Arc::new(TerminalPrompter);

    println!("\n*** Get Garmin Connect Endurance Score and upload to Intervals.icu ***\n");

    let sessions = SessionManager::new(
        GarminConfig::from_env()?,
        TokenStore::new(&token_dir),
        Credentials::from_env(),
        prompter.clone(),
    );
    let policy = RetryPolicy::from_attempts(args.login_attempts);
    let garmin = policy.retry_async(|| sessions.acquire()).await?;

    let uploader = if args.dry_run {
        None
    } else {
        let secrets = Arc::new(SecretStore::new(&token_dir, prompter));
        let api_key = secrets.get_api_key(false)?;
        let config = intervals_icu_client::config::Config::from_env()?;
        let client = ReqwestIntervalsClient::new(&config, api_key)?;
        Some(Uploader::new(Arc::new(client), secrets))
    };

    let driver = SyncDriver::new(Arc::new(garmin), uploader);
    let today = chrono::Local::now().date_naive();
    let mut stdout = std::io::stdout();
    let report = driver
        .run(args.days, args.dry_run, today, &mut stdout)
        .await?;

    tracing::info!(
        dates = report.dates.len(),
        uploaded = report.uploaded(),
        failed = report.failed(),
        "endurance_sync: pass complete"
    );
    Ok(())
}
