//! The three discovery phases, each a free function over a shared
//! `DiscoveryContext` — no phase owns a struct of its own, matching the
//! reference workspace's preference for small free functions over a
//! phase-per-object design.

use std::collections::HashSet;

use inbox_core::{CanonicalUrl, EligibilityCategory, EligibleTransaction, Identity, KeyBook, SigningPath};
use inbox_ledger::{response::parse_status_v3, LedgerPort};
use inbox_support::canon::{extract_adi, normalize_hash};

use crate::context::DiscoveryContext;

/// Phase 1 — signing paths (delegated transactions). Single-hop paths are
/// skipped here; they're covered by Phase 2's richer predicate.
pub async fn phase1_signing_paths(
    ctx: &mut DiscoveryContext,
    paths: &[SigningPath],
    ledger: &dyn LedgerPort,
) {
    for path in paths {
        if path.is_direct() {
            continue;
        }
        let final_signer = path.final_signer().clone();
        let prior = path
            .prior_hop()
            .expect("a non-direct path always has a prior hop")
            .clone();

        let pending = match ledger.query_pending(&final_signer).await {
            Ok(txs) => {
                ctx.record_rpc(false);
                txs
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase1",
                    path = %path.render(),
                    error = %err,
                    "phase 1: query_pending failed for this path, skipping"
                );
                continue;
            }
        };

        for tx in pending {
            ctx.cache_signatures(&tx.hash, &tx.signatures);
            let prior_signed = tx.signatures.iter().any(|s| s.signer == prior);
            if !prior_signed {
                ctx.insert_or_merge(
                    tx.hash.clone(),
                    EligibleTransaction {
                        tx,
                        eligible_paths: vec![path.clone()],
                        category: EligibilityCategory::RequiringSignature,
                    },
                );
            }
        }
    }
}

fn push_unique(url: CanonicalUrl, out: &mut Vec<CanonicalUrl>, seen: &mut HashSet<CanonicalUrl>) {
    if seen.insert(url.clone()) {
        out.push(url);
    }
}

fn candidate_accounts(identity: &Identity, live_books: &[KeyBook]) -> Vec<CanonicalUrl> {
    let mut out = Vec::new();
    let mut seen = HashSet::new();

    push_unique(identity.identity_url.clone(), &mut out, &mut seen);
    for account in &identity.accounts {
        push_unique(account.url.clone(), &mut out, &mut seen);
    }
    for book in identity.key_books.iter().chain(live_books.iter()) {
        push_unique(book.url.clone(), &mut out, &mut seen);
        for page in &book.key_pages {
            push_unique(page.url.clone(), &mut out, &mut seen);
        }
    }
    out
}

/// Phase 2 — direct accounts: the identity URL, its sub-accounts, its
/// key-books/pages, and its directory entries.
pub async fn phase2_direct_accounts(
    ctx: &mut DiscoveryContext,
    identity: &Identity,
    live_books: &[KeyBook],
    ledger: &dyn LedgerPort,
) {
    let mut accounts = candidate_accounts(identity, live_books);

    match ledger.query_directory(&identity.identity_url, 0, 1000).await {
        Ok(entries) => {
            ctx.record_rpc(false);
            let mut seen: HashSet<CanonicalUrl> = accounts.iter().cloned().collect();
            for url in entries {
                push_unique(url, &mut accounts, &mut seen);
            }
        }
        Err(err) => {
            ctx.record_rpc(true);
            tracing::warn!(
                target: "inbox_discovery::phase2",
                identity = %identity.identity_url,
                error = %err,
                "phase 2: directory lookup failed, continuing with stored accounts"
            );
        }
    }

    for account in accounts {
        let pending = match ledger.query_pending(&account).await {
            Ok(txs) => {
                ctx.record_rpc(false);
                txs
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase2",
                    account = %account,
                    error = %err,
                    "phase 2: query_pending failed for this account, skipping"
                );
                continue;
            }
        };

        for tx in pending {
            ctx.cache_signatures(&tx.hash, &tx.signatures);
            if ctx.user_has_signed(&tx.signatures) {
                continue;
            }
            let category = if extract_adi(&tx.principal) == identity.identity_url {
                EligibilityCategory::InitiatedByUser
            } else {
                EligibilityCategory::RequiringSignature
            };
            ctx.insert_or_merge(
                tx.hash.clone(),
                EligibleTransaction {
                    tx,
                    eligible_paths: vec![SigningPath::new(vec![account.clone()])],
                    category,
                },
            );
        }
    }
}

/// Phase 3 — signature-chain scan: a bounded catch-up pass over the most
/// recent 30 signature-chain entries per key-book.
pub async fn phase3_signature_chain_scan(
    ctx: &mut DiscoveryContext,
    identity: &Identity,
    live_books: &[KeyBook],
    ledger: &dyn LedgerPort,
) {
    let mut book_urls: Vec<CanonicalUrl> = Vec::new();
    let mut seen_books = HashSet::new();
    for book in identity.key_books.iter().chain(live_books.iter()) {
        push_unique(book.url.clone(), &mut book_urls, &mut seen_books);
    }
    if let Ok(entries) = ledger.query_directory(&identity.identity_url, 0, 1000).await {
        ctx.record_rpc(false);
        for url in entries {
            push_unique(url, &mut book_urls, &mut seen_books);
        }
    } else {
        ctx.record_rpc(true);
    }

    for book_url in book_urls {
        let total = match ledger.query_signature_chain_total(&book_url).await {
            Ok(t) => {
                ctx.record_rpc(false);
                t
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase3",
                    book = %book_url,
                    error = %err,
                    "phase 3: signature chain total failed, skipping book"
                );
                continue;
            }
        };
        if total == 0 {
            continue;
        }

        let count = total.min(30);
        let start = total - count;
        let records = match ledger
            .query_signature_chain_records(&book_url, start, count)
            .await
        {
            Ok(r) => {
                ctx.record_rpc(false);
                r
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase3",
                    book = %book_url,
                    error = %err,
                    "phase 3: signature chain read failed, skipping book"
                );
                continue;
            }
        };

        for record in &records {
            scan_signature_request(ctx, record, &book_url, ledger).await;
        }
    }
}

async fn scan_signature_request(
    ctx: &mut DiscoveryContext,
    record: &serde_json::Value,
    book_url: &CanonicalUrl,
    ledger: &dyn LedgerPort,
) {
    let message = record
        .pointer("/value/message")
        .or_else(|| record.get("message"));
    let Some(message) = message else { return };
    if message.get("type").and_then(|v| v.as_str()) != Some("signatureRequest") {
        return;
    }

    let produced = record
        .pointer("/value/produced/records")
        .and_then(|v| v.as_array())
        .cloned()
        .unwrap_or_default();

    for produced_record in &produced {
        let tx_id = produced_record
            .get("value")
            .and_then(|v| v.as_str())
            .or_else(|| produced_record.get("id").and_then(|v| v.as_str()));
        let Some(tx_id) = tx_id else { continue };

        let hash = normalize_hash(tx_id);
        if hash.is_empty() || ctx.already_seen(&hash) {
            continue;
        }

        let raw = match ledger.query_transaction_raw(tx_id).await {
            Ok(r) => {
                ctx.record_rpc(false);
                r
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase3",
                    tx_id,
                    error = %err,
                    "phase 3: raw status probe failed, skipping produced tx"
                );
                continue;
            }
        };
        let Some(raw) = raw else { continue };
        if parse_status_v3(raw.get("status")) != inbox_core::TxStatus::Pending {
            continue;
        }

        let tx = match ledger.query_transaction(tx_id).await {
            Ok(t) => {
                ctx.record_rpc(false);
                t
            }
            Err(err) => {
                ctx.record_rpc(true);
                tracing::warn!(
                    target: "inbox_discovery::phase3",
                    tx_id,
                    error = %err,
                    "phase 3: full transaction fetch failed, skipping"
                );
                continue;
            }
        };
        let Some(tx) = tx else { continue };

        ctx.cache_signatures(&tx.hash, &tx.signatures);
        if !ctx.user_has_signed(&tx.signatures) {
            ctx.insert_or_merge(
                tx.hash.clone(),
                EligibleTransaction {
                    tx,
                    eligible_paths: vec![SigningPath::new(vec![book_url.clone()])],
                    category: EligibilityCategory::RequiringSignature,
                },
            );
        }
    }
}
