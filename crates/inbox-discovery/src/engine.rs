//! `discover_for_user`: the one orchestrating entry point that runs the
//! explorer, then phases 1 → 2 → 3 strictly in order (phase 3 consults what
//! the earlier phases already saw), then hands back the deduplicated result.

use std::collections::HashSet;

use inbox_core::{CanonicalHash, EligibleTransaction, Identity, KeyBook, KeyEntry, User};
use inbox_ledger::LedgerPort;

use crate::context::DiscoveryContext;
use crate::phases::{phase1_signing_paths, phase2_direct_accounts, phase3_signature_chain_scan};

pub struct DiscoveryResult {
    pub eligible: std::collections::HashMap<CanonicalHash, EligibleTransaction>,
    /// Every RPC this user's cycle attempted failed. The caller must
    /// not reconcile against this (empty) result — it would flap the
    /// user's inbox on a transient outage.
    pub ledger_unavailable: bool,
}

fn collect_user_key_hashes(user: &User) -> HashSet<CanonicalHash> {
    let mut hashes = HashSet::new();
    for identity in &user.identities {
        for book in &identity.key_books {
            for page in &book.key_pages {
                for entry in &page.entries {
                    if let KeyEntry::Key { public_key_hash, .. } = entry {
                        hashes.insert(public_key_hash.clone());
                    }
                }
            }
        }
    }
    hashes
}

pub async fn discover_for_user(
    user: &User,
    ledger: &dyn LedgerPort,
    max_depth: u32,
) -> DiscoveryResult {
    let mut ctx = DiscoveryContext::new(collect_user_key_hashes(user));

    let mut all_paths = Vec::new();
    let mut per_identity: Vec<(Identity, Vec<KeyBook>)> = Vec::with_capacity(user.identities.len());

    for identity in &user.identities {
        let output = inbox_explorer::explore_identity(identity, ledger, max_depth).await;
        all_paths.extend(output.paths);
        per_identity.push((identity.clone(), output.key_books));
    }

    phase1_signing_paths(&mut ctx, &all_paths, ledger).await;

    for (identity, live_books) in &per_identity {
        phase2_direct_accounts(&mut ctx, identity, live_books, ledger).await;
    }
    for (identity, live_books) in &per_identity {
        phase3_signature_chain_scan(&mut ctx, identity, live_books, ledger).await;
    }

    DiscoveryResult {
        ledger_unavailable: ctx.ledger_totally_unavailable(),
        eligible: ctx.eligible,
    }
}
