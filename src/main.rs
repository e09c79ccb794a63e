use anyhow::Result;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use rust_screener::api::{GithubRosterSource, YahooClient};
use rust_screener::models::Config;
use rust_screener::notifier::{Notifier, TelegramNotifier};
use rust_screener::orchestrator::Orchestrator;
use rust_screener::utils::today_local;

#[tokio::main]
async fn main() {
    // Initialize logging, RUST_LOG overrides the default level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("rust_screener=info"));
    let subscriber = FmtSubscriber::builder().with_env_filter(filter).finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("setting default subscriber failed");

    // Failures are reported but never change the exit status
    if let Err(e) = run().await {
        error!("Screening run failed: {:#}", e);
        eprintln!("❌ Error: {:#}", e);
    }
}

async fn run() -> Result<()> {
    let config = Config::from_env()?;
    info!("📋 Configuration loaded successfully");

    let provider = YahooClient::new(&config)?;
    let roster = GithubRosterSource::new(&config)?;
    let telegram = TelegramNotifier::from_config(&config);
    let notifier = telegram.as_ref().map(|n| n as &dyn Notifier);

    let orchestrator = Orchestrator::new(&config, &provider, &roster, notifier);
    let summary = orchestrator.run(today_local()).await?;

    info!(
        "📈 {} stocks matched, report at {}",
        summary.filtered.len(),
        summary.report_path.display()
    );
    Ok(())
}
