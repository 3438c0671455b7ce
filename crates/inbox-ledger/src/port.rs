//! The ledger client's operation vocabulary as a trait, so the
//! explorer and discovery engine can be driven against an in-memory fake in
//! tests without a live ledger.

use async_trait::async_trait;
use inbox_core::{CanonicalUrl, InboxError, KeyPage, PendingTx};

/// Typed wrappers over the ledger's single `query` RPC method.
#[async_trait]
pub trait LedgerPort: Send + Sync {
    /// Paginates `{queryType: pending}` at `scope`, returning raw tx ids.
    async fn query_pending_tx_ids(
        &self,
        scope: &CanonicalUrl,
        page_size: u32,
        max_pages: u32,
    ) -> Result<Vec<String>, InboxError>;

    /// Convenience built on `query_pending_tx_ids` + `query_transaction`:
    /// every not-yet-finalized transaction at `scope`.
    async fn query_pending(&self, scope: &CanonicalUrl) -> Result<Vec<PendingTx>, InboxError>;

    async fn query_key_book_page_count(&self, url: &CanonicalUrl) -> Result<u64, InboxError>;

    async fn query_key_page(&self, url: &CanonicalUrl) -> Result<Option<KeyPage>, InboxError>;

    /// `{total}` from a `{queryType: chain, name: signature}` probe read
    /// (`count=1, expand=false`).
    async fn query_signature_chain_total(&self, url: &CanonicalUrl) -> Result<u64, InboxError>;

    /// Raw signature-chain records for `[start, start+count)`, expanded.
    async fn query_signature_chain_records(
        &self,
        url: &CanonicalUrl,
        start: u64,
        count: u64,
    ) -> Result<Vec<serde_json::Value>, InboxError>;

    async fn query_directory(
        &self,
        url: &CanonicalUrl,
        start: u64,
        count: u64,
    ) -> Result<Vec<CanonicalUrl>, InboxError>;

    async fn query_transaction(&self, tx_id: &str) -> Result<Option<PendingTx>, InboxError>;

    async fn query_transaction_raw(
        &self,
        tx_id: &str,
    ) -> Result<Option<serde_json::Value>, InboxError>;

    async fn account_exists(&self, url: &CanonicalUrl) -> bool;

    /// One-time startup probe confirming the configured endpoint is live.
    async fn health_check(&self) -> Result<(), InboxError>;
}
