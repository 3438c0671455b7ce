//! Firestore document shapes. These are the wire-level structs Firestore
//! (de)serializes; `inbox-core`'s domain types are built from / flattened
//! into these at the store boundary, mirroring how the reference
//! workspace's `StateDb` keeps its on-disk row types separate from the
//! domain types callers actually work with.

use inbox_core::{
    CanonicalHash, CanonicalUrl, ComputedInboxSummary, DocStatus, EligibilityCategory, Identity,
    PendingActionDoc, RenderedSignature, TimestampMs, UrgencyLevel, User,
};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserDoc {
    pub uid: String,
    pub contact_email: Option<String>,
    pub default_identity: Option<String>,
    pub onboarding_complete: bool,
    pub key_vault_setup: bool,
}

impl UserDoc {
    pub fn into_domain(self, identities: Vec<Identity>) -> User {
        User {
            uid: self.uid,
            contact_email: self.contact_email,
            default_identity: self.default_identity.map(CanonicalUrl::new),
            onboarding_complete: self.onboarding_complete,
            key_vault_setup: self.key_vault_setup,
            identities,
        }
    }
}

/// An identity's key-books/accounts are stored as opaque JSON — Firestore
/// rejects fields with `undefined` values, so the adapter is responsible for
/// never handing it one.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct IdentityDoc {
    pub identity_url: String,
    pub key_books: serde_json::Value,
    pub accounts: serde_json::Value,
    pub credit_balance: u64,
    pub created_at: Option<TimestampMs>,
    pub updated_at: Option<TimestampMs>,
}

impl IdentityDoc {
    pub fn into_domain(self) -> Option<Identity> {
        Some(Identity {
            identity_url: CanonicalUrl::new(self.identity_url),
            key_books: serde_json::from_value(self.key_books).ok()?,
            accounts: serde_json::from_value(self.accounts).ok()?,
            credit_balance: self.credit_balance,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PendingActionFirestoreDoc {
    pub tx_id: String,
    pub hash: String,
    pub principal: String,
    pub tx_type: String,
    pub category: EligibilityCategory,
    pub status: DocStatus,
    pub urgency_level: UrgencyLevel,
    pub time_remaining_ms: Option<i64>,
    pub is_expiring: bool,
    pub user_has_signed: bool,
    pub signatures: Vec<RenderedSignatureDoc>,
    pub eligible_signing_paths: Vec<String>,
    pub expires_at: Option<TimestampMs>,
    pub updated_at: TimestampMs,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RenderedSignatureDoc {
    pub signer: String,
    pub public_key_hash: String,
    pub vote: inbox_core::Vote,
    pub signed_at: TimestampMs,
}

impl From<PendingActionDoc> for PendingActionFirestoreDoc {
    fn from(doc: PendingActionDoc) -> Self {
        Self {
            tx_id: doc.tx_id,
            hash: doc.hash.as_str().to_string(),
            principal: doc.principal.into_string(),
            tx_type: doc.tx_type,
            category: doc.category,
            status: doc.status,
            urgency_level: doc.urgency_level,
            time_remaining_ms: doc.time_remaining_ms,
            is_expiring: doc.is_expiring,
            user_has_signed: doc.user_has_signed,
            signatures: doc
                .signatures
                .into_iter()
                .map(|s| RenderedSignatureDoc {
                    signer: s.signer.into_string(),
                    public_key_hash: s.public_key_hash.as_str().to_string(),
                    vote: s.vote,
                    signed_at: s.signed_at,
                })
                .collect(),
            eligible_signing_paths: doc.eligible_signing_paths,
            expires_at: doc.expires_at,
            updated_at: doc.updated_at,
        }
    }
}

impl PendingActionFirestoreDoc {
    pub fn into_domain(self) -> PendingActionDoc {
        PendingActionDoc {
            tx_id: self.tx_id,
            hash: CanonicalHash::new(self.hash),
            principal: CanonicalUrl::new(self.principal),
            tx_type: self.tx_type,
            category: self.category,
            status: self.status,
            urgency_level: self.urgency_level,
            time_remaining_ms: self.time_remaining_ms,
            is_expiring: self.is_expiring,
            user_has_signed: self.user_has_signed,
            signatures: self
                .signatures
                .into_iter()
                .map(|s| inbox_core::RenderedSignature {
                    signer: CanonicalUrl::new(s.signer),
                    public_key_hash: CanonicalHash::new(s.public_key_hash),
                    vote: s.vote,
                    signed_at: s.signed_at,
                })
                .collect(),
            eligible_signing_paths: self.eligible_signing_paths,
            expires_at: self.expires_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ComputedSummaryDoc {
    pub total_count: usize,
    pub urgent_count: usize,
    pub initiated_by_user_count: usize,
    pub requiring_signature_count: usize,
    pub tx_hashes: Vec<String>,
    pub cycle_token: String,
    pub computed_at: TimestampMs,
}

impl From<ComputedInboxSummary> for ComputedSummaryDoc {
    fn from(s: ComputedInboxSummary) -> Self {
        Self {
            total_count: s.total_count,
            urgent_count: s.urgent_count,
            initiated_by_user_count: s.initiated_by_user_count,
            requiring_signature_count: s.requiring_signature_count,
            tx_hashes: s.tx_hashes.into_iter().map(|h| h.as_str().to_string()).collect(),
            cycle_token: s.cycle_token,
            computed_at: s.computed_at,
        }
    }
}
