//! The diff/build/commit algorithm: turns one cycle's
//! `EligibleTransaction` set into a store write, or a dry-run report.

use std::collections::{HashMap, HashSet};

use inbox_core::{CanonicalHash, ComputedInboxSummary, EligibleTransaction, InboxError, PendingActionDoc, TimestampMs};
use inbox_store::InboxStore;

use crate::build::build_doc;
use crate::summary::build_summary;
use crate::token::cycle_token;

#[derive(Debug)]
pub struct ReconcileOutcome {
    pub to_add: Vec<PendingActionDoc>,
    pub to_remove: Vec<CanonicalHash>,
    pub summary: ComputedInboxSummary,
    /// `false` under `dry_run` — nothing was committed to the store.
    pub written: bool,
}

/// Reconciles one user's freshly discovered `eligible` set against their
/// current inbox. The caller must not invoke this when the discovery cycle's
/// ledger-unavailability guard fired — an empty `eligible` in that case
/// means "the ledger didn't answer," not "nothing is pending."
pub async fn reconcile(
    store: &dyn InboxStore,
    uid: &str,
    eligible: &HashMap<CanonicalHash, EligibleTransaction>,
    now_ms: TimestampMs,
    dry_run: bool,
) -> Result<ReconcileOutcome, InboxError> {
    let current = store.get_inbox(uid).await?;
    let current_ids: HashSet<CanonicalHash> = current.iter().map(|d| d.hash.clone()).collect();
    let new_ids: HashSet<CanonicalHash> = eligible.keys().cloned().collect();

    let to_remove: Vec<CanonicalHash> = current_ids.difference(&new_ids).cloned().collect();

    let mut to_add: Vec<PendingActionDoc> = eligible.values().map(|t| build_doc(t, now_ms)).collect();
    to_add.sort_by(|a, b| a.hash.as_str().cmp(b.hash.as_str()));

    let summary = build_summary(&to_add, cycle_token(uid), now_ms);

    if dry_run {
        return Ok(ReconcileOutcome {
            to_add,
            to_remove,
            summary,
            written: false,
        });
    }

    store
        .apply_inbox_diff(uid, to_add.clone(), to_remove.clone(), summary.clone())
        .await?;

    Ok(ReconcileOutcome {
        to_add,
        to_remove,
        summary,
        written: true,
    })
}
