//! cp-searchd - scheduled CouchPotato wanted-search runner
//!
//! Hosts one background task: trigger a full search of wanted movies on a
//! CouchPotato server and poll it to completion. By default the task runs
//! on a cron schedule; `--once` runs it immediately and exits.

mod cli;
mod config;
mod jobs;
mod services;

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::cli::CliOptions;
use crate::config::Config;
use crate::jobs::search_wanted::SearchWantedTask;
use crate::jobs::{run_task, start_scheduler, ScheduledTask};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let options = CliOptions::from_args();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "cp_searchd=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting cp-searchd");

    if config.couchpotato.is_none() {
        tracing::warn!(
            "CouchPotato connection not configured; set COUCHPOTATO_URL and COUCHPOTATO_API_KEY"
        );
    }

    let task: Arc<dyn ScheduledTask> =
        Arc::new(SearchWantedTask::new(config.couchpotato.clone()));
    let cancel = CancellationToken::new();

    if options.run_once {
        let shutdown = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Shutdown requested");
                shutdown.cancel();
            }
        });

        run_task(task, cancel).await;
        return Ok(());
    }

    let mut scheduler =
        start_scheduler(task, config.search_schedule.clone(), cancel.clone()).await?;

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");

    // Let an in-flight execution wind down, then stop the scheduler
    cancel.cancel();
    scheduler.shutdown().await?;

    Ok(())
}
