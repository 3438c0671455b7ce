//! The inbox store's read/write surface as a trait, so the
//! reconciler and supervisor can be exercised against an in-memory fake.

use async_trait::async_trait;
use inbox_core::{CanonicalHash, ComputedInboxSummary, InboxError, PendingActionDoc, User};

#[async_trait]
pub trait InboxStore: Send + Sync {
    /// Every user with `onboarding_complete && key_vault_setup`, identities
    /// attached.
    async fn list_users_with_identities(&self) -> Result<Vec<User>, InboxError>;

    async fn get_inbox(&self, uid: &str) -> Result<Vec<PendingActionDoc>, InboxError>;

    async fn get_summary(&self, uid: &str) -> Result<Option<ComputedInboxSummary>, InboxError>;

    /// Atomically deletes `remove_ids`, upserts `upserts` (merge semantics,
    /// keyed by `normalizeHash(tx.hash)`), and upserts `summary` at
    /// `computedState/pending`. All-or-nothing: a partial failure must not
    /// leave some of these changes committed.
    async fn apply_inbox_diff(
        &self,
        uid: &str,
        upserts: Vec<PendingActionDoc>,
        remove_ids: Vec<CanonicalHash>,
        summary: ComputedInboxSummary,
    ) -> Result<(), InboxError>;

    /// Cheap connectivity probe used at daemon boot.
    async fn ping(&self) -> Result<(), InboxError>;
}
