use serde::{Deserialize, Serialize};
use std::fmt;

/// Unix timestamp in milliseconds (UTC). The store's native timestamp type is
/// converted to/from this at the store boundary.
pub type TimestampMs = i64;

// ── CanonicalUrl ─────────────────────────────────────────────────────────────

/// A ledger URL already reduced to canonical form: lowercase, `acc://`
/// prefixed, no trailing slash.
///
/// This type makes no attempt to canonicalize on construction — that's
/// `inbox_support::canon::normalize_url`'s job. `CanonicalUrl::new` only
/// wraps a string a caller asserts is already canonical (typically because
/// it just came out of `normalize_url`), so the distinction between "raw"
/// and "canonical" stays visible at every call site.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CanonicalUrl(String);

impl CanonicalUrl {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for CanonicalUrl {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CanonicalUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalUrl({})", self.0)
    }
}

// ── CanonicalHash ────────────────────────────────────────────────────────────

/// A transaction hash already reduced to canonical form: lowercase hex, no
/// `0x`/`acc://` prefix, no `@principal` suffix, no path segments.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, Default)]
pub struct CanonicalHash(String);

impl CanonicalHash {
    pub fn new(canonical: impl Into<String>) -> Self {
        Self(canonical.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl AsRef<str> for CanonicalHash {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CanonicalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for CanonicalHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "CanonicalHash({})", self.0)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────────

/// Finality status of a pending transaction as reported by the ledger.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TxStatus {
    Pending,
    Delivered,
    Remote,
    Failed,
    Expired,
    Unknown,
}

impl Default for TxStatus {
    fn default() -> Self {
        TxStatus::Unknown
    }
}

/// A signer's vote on a pending transaction's signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vote {
    Approve,
    Reject,
    Abstain,
}

impl Default for Vote {
    fn default() -> Self {
        Vote::Approve
    }
}

/// Why a transaction is eligible for a user to sign. `InitiatedByUser`
/// dominates `RequiringSignature` — once a tx is categorized as
/// user-initiated it never demotes back.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EligibilityCategory {
    InitiatedByUser,
    RequiringSignature,
}

impl EligibilityCategory {
    /// Promote `self` given a newly observed category for the same tx.
    /// `InitiatedByUser` wins once either contributor reports it.
    pub fn promote(self, other: EligibilityCategory) -> EligibilityCategory {
        use EligibilityCategory::*;
        match (self, other) {
            (InitiatedByUser, _) | (_, InitiatedByUser) => InitiatedByUser,
            _ => RequiringSignature,
        }
    }
}

/// Derived UI status for a `PendingActionDoc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DocStatus {
    Pending,
    PartiallySigned,
    AwaitingSignatures,
}

/// Derived UI urgency level for a `PendingActionDoc`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Critical,
    Warning,
    Normal,
}

impl UrgencyLevel {
    /// Critical < 4h, warning in [4h, 24h), normal otherwise.
    pub fn from_remaining_ms(remaining_ms: Option<i64>) -> Self {
        match remaining_ms {
            Some(ms) if ms < 4 * 3_600 * 1000 => UrgencyLevel::Critical,
            Some(ms) if ms < 24 * 3_600 * 1000 => UrgencyLevel::Warning,
            _ => UrgencyLevel::Normal,
        }
    }
}
