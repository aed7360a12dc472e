use anyhow::Result;
use clap::Parser;
use std::sync::Arc;
use tracing::info;

use vigia::config::AppConfig;
use vigia::fetcher::HttpFetcher;
use vigia::notifier::TelegramNotifier;
use vigia::scheduler::MonitorScheduler;
use vigia::store::SqliteStore;

#[derive(Parser)]
#[command(name = "vigia", about = "Product price monitor with Telegram alerts")]
struct Args {
    /// Directory holding the layered configuration files
    #[arg(long, default_value = "config")]
    config_dir: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("vigia=debug".parse()?),
        )
        .init();

    let args = Args::parse();

    info!("Starting vigia...");
    let config = AppConfig::from_dir(&args.config_dir)?;

    let store = SqliteStore::connect(&config.database).await?;
    let fetcher = Arc::new(HttpFetcher::new(&config.scraper)?);
    let notifier = Arc::new(TelegramNotifier::new(&config.telegram)?);

    let scheduler = MonitorScheduler::new(
        Arc::new(store.clone()),
        Arc::new(store),
        fetcher,
        notifier,
        &config.scheduler,
        &config.policy,
    );

    // Restore the durable job set before anything else can touch it.
    let restored = scheduler.reconcile_on_startup().await?;
    info!("Restored {} monitor job(s) from the link registry", restored);

    if let Some(watch) = &config.watch {
        let destination = watch
            .destination
            .as_deref()
            .unwrap_or(&config.telegram.chat_id);
        scheduler.register(&watch.url, destination).await?;
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down...");
    scheduler.shutdown().await;

    Ok(())
}
