//! `LedgerClient`: a `reqwest`-backed JSON-RPC 2.0 client over the ledger's
//! single `query` method, in the idiom of the reference workspace's
//! `WalletRpcClient` — one private `call` helper, typed wrappers on top.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use inbox_core::{CanonicalUrl, InboxError, KeyPage, PendingTx, SignatureRecord};
use inbox_support::canon::normalize_url;
use inbox_support::retry::{retry, RetryPolicy};
use serde_json::{json, Value};

use crate::port::LedgerPort;
use crate::response;

const RPC_TIMEOUT: Duration = Duration::from_secs(30);

const DEFAULT_PENDING_PAGE_SIZE: u32 = 100;
const DEFAULT_PENDING_MAX_PAGES: u32 = 50;

pub struct LedgerClient {
    http: reqwest::Client,
    endpoint: String,
    retry_policy: RetryPolicy,
    pending_page_size: u32,
    next_id: AtomicU64,
}

impl LedgerClient {
    pub fn new(endpoint: impl Into<String>, retry_policy: RetryPolicy) -> Self {
        Self::with_pending_page_size(endpoint, retry_policy, DEFAULT_PENDING_PAGE_SIZE)
    }

    /// Like `new`, but overrides the page size `query_pending` requests per
    /// round trip (`PENDING_PAGE_SIZE`).
    pub fn with_pending_page_size(
        endpoint: impl Into<String>,
        retry_policy: RetryPolicy,
        pending_page_size: u32,
    ) -> Self {
        let http = reqwest::Client::builder()
            .timeout(RPC_TIMEOUT)
            .build()
            .expect("reqwest client builds with static config");
        Self {
            http,
            endpoint: endpoint.into(),
            retry_policy,
            pending_page_size,
            next_id: AtomicU64::new(1),
        }
    }

    fn next_request_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::Relaxed)
    }

    /// The one RPC call this whole client is built on: `method: "query"`
    /// with a caller-supplied `params` shape. Transient transport failures
    /// are retried; a JSON-RPC `error` envelope is raised immediately.
    async fn call(&self, op_label: &'static str, params: Value) -> Result<Value, InboxError> {
        retry(self.retry_policy, op_label, || async {
            let body = json!({
                "jsonrpc": "2.0",
                "id": self.next_request_id(),
                "method": "query",
                "params": params,
            });

            let resp = self
                .http
                .post(&self.endpoint)
                .json(&body)
                .send()
                .await
                .map_err(|e| InboxError::Transport {
                    method: op_label.into(),
                    message: e.to_string(),
                })?;

            let status = resp.status();
            if !status.is_success() {
                return Err(InboxError::Transport {
                    method: op_label.into(),
                    message: format!("http status {status}"),
                });
            }

            let envelope: Value = resp.json().await.map_err(|e| InboxError::UnexpectedResponseShape {
                method: op_label.into(),
                detail: e.to_string(),
            })?;

            if let Some(error) = envelope.get("error") {
                let code = error.get("code").and_then(Value::as_i64).unwrap_or(0);
                let message = error
                    .get("message")
                    .and_then(Value::as_str)
                    .unwrap_or("unknown RPC error")
                    .to_string();
                return Err(InboxError::RpcProtocol {
                    method: op_label.into(),
                    code,
                    message,
                });
            }

            Ok(envelope.get("result").cloned().unwrap_or(Value::Null))
        })
        .await
    }

    fn parse_pending_tx(tx_id: &str, body: &Value) -> Option<PendingTx> {
        let tx = response::transaction_object(body)?;
        let header = tx.get("header").or_else(|| tx.get("transaction"));
        let principal = header
            .and_then(|h| h.get("principal"))
            .and_then(Value::as_str)
            .or_else(|| tx.get("principal").and_then(Value::as_str))
            .unwrap_or("");
        let tx_type = tx
            .pointer("/body/type")
            .and_then(Value::as_str)
            .unwrap_or("unknown")
            .to_string();
        let expires_at = tx
            .pointer("/header/expire/atTime")
            .or_else(|| tx.pointer("/expiresAt"))
            .and_then(Value::as_i64);
        let hash = tx
            .get("hash")
            .or_else(|| body.get("hash"))
            .and_then(Value::as_str)
            .unwrap_or(tx_id);

        let signatures: Vec<SignatureRecord> = response::extract_signatures_v3(body);
        let status = response::parse_status_v3(body.get("status"));

        Some(PendingTx {
            tx_id: tx_id.to_string(),
            hash: inbox_support::canon::normalize_hash(hash),
            principal: normalize_url(principal),
            tx_type,
            status,
            signatures,
            expires_at,
            body: tx.get("body").cloned(),
        })
    }
}

#[async_trait]
impl LedgerPort for LedgerClient {
    async fn query_pending_tx_ids(
        &self,
        scope: &CanonicalUrl,
        page_size: u32,
        max_pages: u32,
    ) -> Result<Vec<String>, InboxError> {
        let mut seen = std::collections::HashSet::new();
        let mut ordered = Vec::new();
        let mut start = 0u32;

        for _ in 0..max_pages.max(1) {
            let params = json!({
                "scope": scope.as_str(),
                "query": {
                    "queryType": "pending",
                    "range": {"start": start, "count": page_size},
                },
            });

            let page = match self.call("queryPendingTxIds", params).await {
                Ok(v) => v,
                Err(InboxError::Transport { .. }) => break,
                Err(e) => return Err(e),
            };

            let records = response::pending_records(&page);
            let page_len = records.len() as u32;
            for record in &records {
                if let Some(id) = response::extract_tx_id(record) {
                    if seen.insert(id.clone()) {
                        ordered.push(id);
                    }
                }
            }

            let total = response::pending_total(&page);
            start += page_len;
            let exhausted = page_len < page_size
                || total.map(|t| u64::from(start) >= t).unwrap_or(false);
            if exhausted {
                break;
            }
        }

        Ok(ordered)
    }

    async fn query_pending(&self, scope: &CanonicalUrl) -> Result<Vec<PendingTx>, InboxError> {
        let ids = self
            .query_pending_tx_ids(scope, self.pending_page_size, DEFAULT_PENDING_MAX_PAGES)
            .await?;
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(tx) = self.query_transaction(&id).await? {
                if tx.status == inbox_core::TxStatus::Pending {
                    out.push(tx);
                }
            }
        }
        Ok(out)
    }

    async fn query_key_book_page_count(&self, url: &CanonicalUrl) -> Result<u64, InboxError> {
        let params = json!({"scope": url.as_str()});
        match self.call("queryKeyBookPageCount", params).await {
            Ok(body) => Ok(response::page_count(&body)),
            Err(InboxError::RpcProtocol { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn query_key_page(&self, url: &CanonicalUrl) -> Result<Option<KeyPage>, InboxError> {
        let params = json!({"scope": url.as_str()});
        match self.call("queryKeyPage", params).await {
            Ok(body) => Ok(response::extract_key_page(url, &body)),
            Err(InboxError::RpcProtocol { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_signature_chain_total(&self, url: &CanonicalUrl) -> Result<u64, InboxError> {
        let params = json!({
            "scope": url.as_str(),
            "query": {"queryType": "chain", "name": "signature", "range": {"start": 0, "count": 1, "expand": false}},
        });
        match self.call("querySignatureChain", params).await {
            Ok(body) => Ok(body.get("total").and_then(Value::as_u64).unwrap_or(0)),
            Err(InboxError::RpcProtocol { .. }) => Ok(0),
            Err(e) => Err(e),
        }
    }

    async fn query_signature_chain_records(
        &self,
        url: &CanonicalUrl,
        start: u64,
        count: u64,
    ) -> Result<Vec<Value>, InboxError> {
        let params = json!({
            "scope": url.as_str(),
            "query": {"queryType": "chain", "name": "signature", "range": {"start": start, "count": count, "expand": true}},
        });
        match self.call("querySignatureChain", params).await {
            Ok(body) => Ok(body
                .get("records")
                .and_then(Value::as_array)
                .cloned()
                .unwrap_or_default()),
            Err(InboxError::RpcProtocol { .. }) => Ok(Vec::new()),
            Err(e) => Err(e),
        }
    }

    async fn query_directory(
        &self,
        url: &CanonicalUrl,
        start: u64,
        count: u64,
    ) -> Result<Vec<CanonicalUrl>, InboxError> {
        let params = json!({
            "scope": url.as_str(),
            "query": {"queryType": "directory", "range": {"start": start, "count": count}},
        });
        let body = match self.call("queryDirectory", params).await {
            Ok(v) => v,
            Err(InboxError::RpcProtocol { .. }) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        };

        let records = body.get("records").and_then(Value::as_array).cloned().unwrap_or_default();
        let mut urls = Vec::new();
        for record in &records {
            match response::extract_directory_url(record) {
                Some(u) => urls.push(normalize_url(&u)),
                None => tracing::warn!(target: "inbox_ledger::client", "unrecognized directory record shape"),
            }
        }
        Ok(urls)
    }

    async fn query_transaction(&self, tx_id: &str) -> Result<Option<PendingTx>, InboxError> {
        let params = json!({"txid": tx_id});
        match self.call("queryTransaction", params).await {
            Ok(body) => Ok(Self::parse_pending_tx(tx_id, &body)),
            Err(InboxError::RpcProtocol { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn query_transaction_raw(&self, tx_id: &str) -> Result<Option<Value>, InboxError> {
        let params = json!({"txid": tx_id});
        match self.call("queryTransactionRaw", params).await {
            Ok(body) if body.is_null() => Ok(None),
            Ok(body) => Ok(Some(body)),
            Err(InboxError::RpcProtocol { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    async fn account_exists(&self, url: &CanonicalUrl) -> bool {
        let params = json!({"scope": url.as_str()});
        self.call("accountExists", params).await.is_ok()
    }

    async fn health_check(&self) -> Result<(), InboxError> {
        let params = json!({"scope": "acc://"});
        self.call("healthCheck", params).await.map(|_| ())
    }
}
