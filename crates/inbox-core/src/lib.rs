//! inbox-core
//!
//! Shared data model and domain error type for the pending-inbox
//! discovery service. Every other crate in the workspace depends on this
//! one; it depends on nothing in the workspace.

pub mod error;
pub mod model;
pub mod types;

pub use error::InboxError;
pub use model::{
    AccountStub, ComputedInboxSummary, EligibleTransaction, Identity, KeyBook, KeyEntry, KeyPage,
    PendingActionDoc, PendingTx, RenderedSignature, SignatureRecord, SigningPath, User,
};
pub use types::{
    CanonicalHash, CanonicalUrl, DocStatus, EligibilityCategory, TimestampMs, TxStatus,
    UrgencyLevel, Vote,
};
