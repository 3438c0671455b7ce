//! `ComputedInboxSummary` aggregation over a reconciled doc set.

use inbox_core::{CanonicalHash, ComputedInboxSummary, EligibilityCategory, PendingActionDoc, TimestampMs};

pub fn build_summary(docs: &[PendingActionDoc], cycle_token: String, now_ms: TimestampMs) -> ComputedInboxSummary {
    let urgent_count = docs.iter().filter(|d| d.is_expiring).count();
    let initiated_by_user_count = docs
        .iter()
        .filter(|d| d.category == EligibilityCategory::InitiatedByUser)
        .count();
    let requiring_signature_count = docs
        .iter()
        .filter(|d| d.category == EligibilityCategory::RequiringSignature)
        .count();

    let mut tx_hashes: Vec<CanonicalHash> = docs.iter().map(|d| d.hash.clone()).collect();
    tx_hashes.sort_by(|a, b| a.as_str().cmp(b.as_str()));

    ComputedInboxSummary {
        total_count: docs.len(),
        urgent_count,
        initiated_by_user_count,
        requiring_signature_count,
        tx_hashes,
        cycle_token,
        computed_at: now_ms,
    }
}
