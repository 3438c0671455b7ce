//! One discovery-and-reconcile cycle: list users, run the
//! per-user pipeline bounded by `userConcurrency`, accumulate `PollStats`.

use std::sync::Arc;

use chrono::Utc;
use inbox_core::User;
use inbox_ledger::LedgerPort;
use inbox_store::InboxStore;
use inbox_support::BoundedPool;
use tokio::sync::Mutex;

use crate::config::Config;
use crate::stats::PollStats;

async fn run_user(
    user: &User,
    ledger: &dyn LedgerPort,
    store: &dyn InboxStore,
    config: &Config,
) -> Result<(usize, bool), inbox_core::InboxError> {
    if user.identities.is_empty() {
        return Ok((0, false));
    }

    let result = inbox_discovery::discover_for_user(user, ledger, config.delegation_depth).await;
    if result.ledger_unavailable {
        return Err(inbox_core::InboxError::Other(format!(
            "ledger unavailable for every RPC attempted this cycle for user {}",
            user.uid
        )));
    }

    let now_ms = Utc::now().timestamp_millis();
    let outcome = inbox_reconciler::reconcile(store, &user.uid, &result.eligible, now_ms, config.dry_run).await?;

    Ok((outcome.to_add.len(), outcome.written))
}

/// Runs one full cycle against the given ledger/store adapters, returning
/// the accumulated statistics.
pub async fn run_cycle(ledger: Arc<dyn LedgerPort>, store: Arc<dyn InboxStore>, config: &Config) -> PollStats {
    let started = Utc::now();
    let stats = Arc::new(Mutex::new(PollStats::default()));

    let users = match store.list_users_with_identities().await {
        Ok(users) => users,
        Err(err) => {
            tracing::error!(error = %err, "cycle aborted: could not list users");
            return PollStats {
                duration_ms: (Utc::now() - started).num_milliseconds(),
                ..PollStats::default()
            };
        }
    };

    {
        let mut s = stats.lock().await;
        s.total_users = users.len();
    }

    let pool = BoundedPool::new("per-user-discovery", config.user_concurrency);
    let stats_for_pool = stats.clone();

    pool.run_bounded(users, move |user| {
        let ledger = ledger.clone();
        let store = store.clone();
        let config = config.clone();
        let stats = stats_for_pool.clone();
        async move {
            if user.identities.is_empty() {
                stats.lock().await.skipped_users += 1;
                return;
            }

            match run_user(&user, ledger.as_ref(), store.as_ref(), &config).await {
                Ok((pending_count, written)) => {
                    let mut s = stats.lock().await;
                    s.processed_users += 1;
                    s.total_pending += pending_count;
                    if written {
                        s.firestore_writes += 1;
                    }
                }
                Err(err) => {
                    tracing::warn!(uid = %user.uid, error = %err, "per-user cycle failed, isolated");
                    stats.lock().await.failed_users += 1;
                }
            }
        }
    })
    .await;

    let mut final_stats = stats.lock().await.clone();
    final_stats.duration_ms = (Utc::now() - started).num_milliseconds();
    final_stats
}
