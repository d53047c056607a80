use std::sync::Arc;

use jobledger::classify::{build_classifier, Classifier};
use jobledger::config::Config;
use jobledger::google::gmail::GmailSource;
use jobledger::google::sheets::SheetsStore;
use jobledger::google::{TokenStore, SHEETS_ACCOUNT};
use jobledger::poller::Poller;
use jobledger::watermark::WatermarkStore;

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run().await {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let watermarks = WatermarkStore::load(&config.state_dir)?;
    // Surface first-run misconfiguration before touching any API.
    for account in &config.accounts {
        watermarks.resolve(account, config.start_timestamp)?;
    }

    let tokens = Arc::new(TokenStore::new(&config.state_dir));
    // Fail now, not mid-cycle, if the spreadsheet credential is absent.
    tokens.load(SHEETS_ACCOUNT)?;
    for account in &config.accounts {
        tokens.load(account)?;
    }

    let source = Arc::new(GmailSource::new(tokens.clone()));
    let store = Arc::new(SheetsStore::new(tokens, config.sheet_id.clone()));
    let classifier: Arc<dyn Classifier> =
        build_classifier(config.classifier_mode, config.openai_api_key.clone()).into();

    log::info!(
        "watching {} account(s), polling every {}s",
        config.accounts.len(),
        config.poll_interval_secs
    );

    Poller::new(config, source, store, classifier, watermarks)
        .run()
        .await;
    Ok(())
}
