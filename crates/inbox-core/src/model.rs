use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::types::{
    CanonicalHash, CanonicalUrl, DocStatus, EligibilityCategory, TimestampMs, TxStatus,
    UrgencyLevel, Vote,
};

// ── User / Identity / KeyBook / KeyPage ─────────────────────────────────────

/// A registered user of the client application.
///
/// Only processed by the discovery engine when both gating flags are true.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct User {
    pub uid: String,
    pub contact_email: Option<String>,
    pub default_identity: Option<CanonicalUrl>,
    pub onboarding_complete: bool,
    pub key_vault_setup: bool,
    pub identities: Vec<Identity>,
}

impl User {
    pub fn is_eligible_for_discovery(&self) -> bool {
        self.onboarding_complete && self.key_vault_setup
    }
}

/// One user-controlled on-chain identity (ADI).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Identity {
    pub identity_url: CanonicalUrl,
    pub key_books: Vec<KeyBook>,
    pub accounts: Vec<AccountStub>,
    pub credit_balance: u64,
    pub created_at: Option<TimestampMs>,
    pub updated_at: Option<TimestampMs>,
}

/// A stub reference to a sub-account of an identity (URL + ledger type tag).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AccountStub {
    pub url: CanonicalUrl,
    pub account_type: String,
}

/// A key-book: an ordered set of key-pages addressed `book/1`, `book/2`, ….
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyBook {
    pub url: CanonicalUrl,
    pub key_pages: Vec<KeyPage>,
}

/// A key-page: a signing authority with a threshold and a list of entries.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct KeyPage {
    pub url: CanonicalUrl,
    pub version: u64,
    pub threshold: u64,
    pub credit_balance: u64,
    pub entries: Vec<KeyEntry>,
}

/// One entry in a key-page: either a raw key or a delegate reference.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum KeyEntry {
    Key {
        public_key_hash: CanonicalHash,
        key_type: Option<String>,
        last_used_on: Option<TimestampMs>,
    },
    Delegate {
        delegate_url: CanonicalUrl,
    },
}

// ── SigningPath ──────────────────────────────────────────────────────────────

/// An ordered, non-empty, cycle-free sequence of key-page URLs through which
/// a user can ultimately authorize a transaction.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct SigningPath {
    pub hops: Vec<CanonicalUrl>,
}

impl SigningPath {
    pub fn new(hops: Vec<CanonicalUrl>) -> Self {
        debug_assert!(!hops.is_empty(), "a SigningPath must have at least one hop");
        Self { hops }
    }

    pub fn final_signer(&self) -> &CanonicalUrl {
        self.hops.last().expect("SigningPath is never empty")
    }

    /// The hop immediately before the final signer, if this is a delegated
    /// (multi-hop) path.
    pub fn prior_hop(&self) -> Option<&CanonicalUrl> {
        if self.hops.len() < 2 {
            None
        } else {
            Some(&self.hops[self.hops.len() - 2])
        }
    }

    pub fn is_direct(&self) -> bool {
        self.hops.len() == 1
    }

    /// Human-readable rendering: `"hop0 -> hop1 -> ..."`.
    pub fn render(&self) -> String {
        self.hops
            .iter()
            .map(|h| h.as_str())
            .collect::<Vec<_>>()
            .join(" -> ")
    }
}

// ── PendingTx / SignatureRecord ──────────────────────────────────────────────

/// A signature observed on a pending transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SignatureRecord {
    pub signer: CanonicalUrl,
    pub public_key_hash: CanonicalHash,
    pub vote: Vote,
    pub timestamp: Option<TimestampMs>,
}

/// A pending (not-yet-finalized) ledger transaction.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingTx {
    pub tx_id: String,
    pub hash: CanonicalHash,
    pub principal: CanonicalUrl,
    pub tx_type: String,
    pub status: TxStatus,
    pub signatures: Vec<SignatureRecord>,
    pub expires_at: Option<TimestampMs>,
    pub body: Option<serde_json::Value>,
}

// ── EligibleTransaction ──────────────────────────────────────────────────────

/// A pending transaction the discovery engine has determined the user is
/// eligible to sign, together with every signing path that authorizes it.
#[derive(Clone, Debug)]
pub struct EligibleTransaction {
    pub tx: PendingTx,
    pub eligible_paths: Vec<SigningPath>,
    pub category: EligibilityCategory,
}

impl EligibleTransaction {
    /// Merge a second contribution for the same tx hash: the
    /// path set is unioned and the category is promoted, never demoted.
    pub fn merge(&mut self, other: EligibleTransaction) {
        let mut seen: BTreeSet<String> =
            self.eligible_paths.iter().map(|p| p.render()).collect();
        for path in other.eligible_paths {
            if seen.insert(path.render()) {
                self.eligible_paths.push(path);
            }
        }
        self.category = self.category.promote(other.category);
    }
}

// ── PendingActionDoc / ComputedInboxSummary ─────────────────────────────────

/// Rendering of a `SignatureRecord` as it is written into the store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderedSignature {
    pub signer: CanonicalUrl,
    pub public_key_hash: CanonicalHash,
    pub vote: Vote,
    pub signed_at: TimestampMs,
}

/// The per-transaction inbox entry, keyed by `CanonicalHash(tx)` in the
/// store.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingActionDoc {
    pub tx_id: String,
    pub hash: CanonicalHash,
    pub principal: CanonicalUrl,
    pub tx_type: String,
    pub category: EligibilityCategory,
    pub status: DocStatus,
    pub urgency_level: UrgencyLevel,
    pub time_remaining_ms: Option<i64>,
    pub is_expiring: bool,
    pub user_has_signed: bool,
    pub signatures: Vec<RenderedSignature>,
    pub eligible_signing_paths: Vec<String>,
    pub expires_at: Option<TimestampMs>,
    pub updated_at: TimestampMs,
}

/// Per-user aggregate summary, written at `computedState/pending`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComputedInboxSummary {
    pub total_count: usize,
    pub urgent_count: usize,
    pub initiated_by_user_count: usize,
    pub requiring_signature_count: usize,
    pub tx_hashes: Vec<CanonicalHash>,
    pub cycle_token: String,
    pub computed_at: TimestampMs,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn url(s: &str) -> CanonicalUrl {
        CanonicalUrl::new(s.to_string())
    }

    #[test]
    fn signing_path_final_and_prior_hop() {
        let direct = SigningPath::new(vec![url("acc://alice.acme/book/1")]);
        assert!(direct.is_direct());
        assert!(direct.prior_hop().is_none());
        assert_eq!(direct.final_signer().as_str(), "acc://alice.acme/book/1");

        let delegated = SigningPath::new(vec![
            url("acc://bob.acme/book/1"),
            url("acc://corp.acme/book/1"),
        ]);
        assert!(!delegated.is_direct());
        assert_eq!(
            delegated.prior_hop().unwrap().as_str(),
            "acc://bob.acme/book/1"
        );
        assert_eq!(delegated.render(), "acc://bob.acme/book/1 -> acc://corp.acme/book/1");
    }

    fn sample_tx(hash: &str) -> PendingTx {
        PendingTx {
            tx_id: "acc://deadbeef@acc://x/y".to_string(),
            hash: CanonicalHash::new(hash.to_string()),
            principal: url("acc://x.acme/tokens"),
            tx_type: "sendTokens".to_string(),
            status: TxStatus::Pending,
            signatures: vec![],
            expires_at: None,
            body: None,
        }
    }

    #[test]
    fn merge_unions_paths_and_promotes_category() {
        let path_a = SigningPath::new(vec![url("acc://a/book/1")]);
        let path_b = SigningPath::new(vec![url("acc://b/book/1")]);

        let mut a = EligibleTransaction {
            tx: sample_tx("aaaa"),
            eligible_paths: vec![path_a.clone()],
            category: EligibilityCategory::RequiringSignature,
        };
        let b = EligibleTransaction {
            tx: sample_tx("aaaa"),
            eligible_paths: vec![path_a, path_b],
            category: EligibilityCategory::InitiatedByUser,
        };

        a.merge(b);
        assert_eq!(a.eligible_paths.len(), 2);
        assert_eq!(a.category, EligibilityCategory::InitiatedByUser);
    }
}
