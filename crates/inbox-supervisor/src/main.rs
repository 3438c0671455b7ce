//! inbox-supervisor — the pending-inbox discovery daemon binary.
//!
//! Startup sequence:
//!   1. Load configuration from the environment, layered with CLI overrides
//!   2. Initialize structured logging
//!   3. Boot-time probes: ledger health check, store connectivity ping
//!   4. Run an immediate cycle, then tick every `pollIntervalSec`
//!   5. On SIGINT/SIGTERM, stop ticking and let in-flight work drain

mod config;
mod cycle;
mod stats;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::Context;
use clap::Parser;
use inbox_ledger::{LedgerClient, LedgerPort};
use inbox_store::{FirestoreInboxStore, InboxStore};
use inbox_support::RetryPolicy;
use tracing::info;

use config::Config;

#[derive(Parser, Debug)]
#[command(
    name = "inbox-supervisor",
    version,
    about = "Polls a multi-sig ledger and publishes each user's pending-signature inbox"
)]
struct Args {
    /// Run a single cycle and exit instead of looping.
    #[arg(long)]
    once: bool,

    /// Override POLL_INTERVAL_SEC.
    #[arg(long)]
    poll_interval_sec: Option<u64>,

    /// Override USER_CONCURRENCY.
    #[arg(long)]
    user_concurrency: Option<usize>,

    /// Override DRY_RUN.
    #[arg(long)]
    dry_run: bool,
}

fn apply_overrides(mut config: Config, args: &Args) -> Config {
    if let Some(v) = args.poll_interval_sec {
        config.poll_interval_sec = v;
    }
    if let Some(v) = args.user_concurrency {
        config.user_concurrency = v;
    }
    if args.dry_run {
        config.dry_run = true;
    }
    config
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let config = Config::from_env().context("loading configuration")?;
    let config = apply_overrides(config, &args);

    tracing_subscriber::fmt()
        .json()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_level.as_filter_str().parse().unwrap()),
        )
        .init();

    info!(
        project = %config.firebase_project_id,
        network = ?config.accumulate_network,
        poll_interval_sec = config.poll_interval_sec,
        user_concurrency = config.user_concurrency,
        dry_run = config.dry_run,
        "inbox-supervisor starting"
    );

    let retry_policy = RetryPolicy {
        max_retries: config.max_retries,
        ..RetryPolicy::default()
    };
    let ledger: Arc<dyn LedgerPort> = Arc::new(LedgerClient::with_pending_page_size(
        config.accumulate_api_url.clone(),
        retry_policy,
        config.pending_page_size,
    ));

    let store: Arc<dyn InboxStore> = Arc::new(
        FirestoreInboxStore::connect(&config.firebase_project_id, config.users_collection.clone())
            .await
            .context("connecting to the inbox store")?,
    );

    ledger.health_check().await.context("ledger health check failed at boot")?;
    store.ping().await.context("store connectivity probe failed at boot")?;
    info!("boot-time probes passed");

    if args.once {
        let stats = cycle::run_cycle(ledger, store, &config).await;
        info!(?stats, "single cycle complete");
        return Ok(());
    }

    run_forever(ledger, store, config).await
}

async fn run_forever(
    ledger: Arc<dyn LedgerPort>,
    store: Arc<dyn InboxStore>,
    config: Config,
) -> anyhow::Result<()> {
    let running = Arc::new(AtomicBool::new(false));
    let mut interval = tokio::time::interval(std::time::Duration::from_secs(config.poll_interval_sec));

    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);
    let mut current_cycle: Option<tokio::task::JoinHandle<()>> = None;

    loop {
        tokio::select! {
            _ = interval.tick() => {
                if running.swap(true, Ordering::SeqCst) {
                    tracing::warn!("previous cycle still running, skipping this tick");
                    continue;
                }
                let ledger = ledger.clone();
                let store = store.clone();
                let config = config.clone();
                let running = running.clone();
                current_cycle = Some(tokio::spawn(async move {
                    let stats = cycle::run_cycle(ledger, store, &config).await;
                    info!(?stats, "cycle complete");
                    running.store(false, Ordering::SeqCst);
                }));
            }
            _ = &mut shutdown => {
                info!("shutdown signal received, draining in-flight work");
                break;
            }
        }
    }

    if let Some(handle) = current_cycle {
        if !handle.is_finished() {
            info!("waiting for in-flight cycle to finish");
        }
        if let Err(err) = handle.await {
            tracing::warn!(error = %err, "cycle task panicked during shutdown drain");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c().await.expect("failed to install SIGINT handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
