//! Renders an `EligibleTransaction` into its store-facing `PendingActionDoc`.

use inbox_core::{
    DocStatus, EligibleTransaction, PendingActionDoc, RenderedSignature, TimestampMs,
    UrgencyLevel,
};

const ONE_DAY_MS: i64 = 24 * 3_600 * 1_000;

pub fn build_doc(t: &EligibleTransaction, now_ms: TimestampMs) -> PendingActionDoc {
    let status = if t.tx.signatures.is_empty() {
        DocStatus::Pending
    } else {
        DocStatus::PartiallySigned
    };

    let time_remaining_ms = t.tx.expires_at.map(|expires_at| expires_at - now_ms);
    let urgency_level = UrgencyLevel::from_remaining_ms(time_remaining_ms);
    let is_expiring = time_remaining_ms.map(|ms| ms < ONE_DAY_MS).unwrap_or(false);

    let signatures = t
        .tx
        .signatures
        .iter()
        .map(|s| RenderedSignature {
            signer: s.signer.clone(),
            public_key_hash: s.public_key_hash.clone(),
            vote: s.vote,
            signed_at: s.timestamp.unwrap_or(now_ms),
        })
        .collect();

    let eligible_signing_paths = t.eligible_paths.iter().map(|p| p.render()).collect();

    PendingActionDoc {
        tx_id: t.tx.tx_id.clone(),
        hash: t.tx.hash.clone(),
        principal: t.tx.principal.clone(),
        tx_type: t.tx.tx_type.clone(),
        category: t.category,
        status,
        urgency_level,
        time_remaining_ms,
        is_expiring,
        user_has_signed: false,
        signatures,
        eligible_signing_paths,
        expires_at: t.tx.expires_at,
        updated_at: now_ms,
    }
}
