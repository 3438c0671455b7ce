//! Tolerant response parsing for the ledger's `query` RPC.
//!
//! The v3 envelope's exact shape drifts by method and ledger version. Every
//! place that probes a response for a field lives here, not in `client.rs`
//! or upstream in the discovery engine — callers see a typed value or
//! `None`/empty, never a parse error.

use std::collections::HashSet;

use inbox_core::{CanonicalHash, CanonicalUrl, KeyEntry, KeyPage, SignatureRecord, TxStatus, Vote};
use inbox_support::canon::{normalize_hash, normalize_url};
use serde_json::Value;

/// Pulls the page of pending-tx records out of a `queryPendingTxIds`
/// response, trying each known envelope shape in turn.
pub fn pending_records(body: &Value) -> Vec<Value> {
    if let Some(records) = body.pointer("/pending/records").and_then(Value::as_array) {
        return records.clone();
    }
    if body.get("recordType").and_then(Value::as_str) == Some("range") {
        if let Some(records) = body.get("records").and_then(Value::as_array) {
            return records.clone();
        }
    }
    if let Some(items) = body.get("items").and_then(Value::as_array) {
        return items.clone();
    }
    Vec::new()
}

/// Best-effort total count for a paginated response, used to decide when to
/// stop requesting further pages.
pub fn pending_total(body: &Value) -> Option<u64> {
    body.pointer("/pending/total")
        .or_else(|| body.get("total"))
        .and_then(Value::as_u64)
}

/// Extracts a transaction id string from a single pending-query record,
/// probing each documented location in order.
pub fn extract_tx_id(record: &Value) -> Option<String> {
    if let Some(s) = record.get("value").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    if let Some(value) = record.get("value") {
        for key in ["txID", "txId", "id"] {
            if let Some(s) = value.get(key).and_then(Value::as_str) {
                return Some(s.to_string());
            }
        }
        if let Some(s) = value.pointer("/message/txID").and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    for key in ["txid", "hash"] {
        if let Some(s) = record.get(key).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    if let Some(s) = record.as_str() {
        if s.starts_with("acc://") {
            return Some(s.to_string());
        }
    }
    None
}

/// Extracts a directory-query record's URL, probing each documented shape.
pub fn extract_directory_url(record: &Value) -> Option<String> {
    if let Some(s) = record.as_str() {
        return Some(s.to_string());
    }
    for pointer in ["/value", "/url", "/account/url"] {
        if let Some(s) = record.pointer(pointer).and_then(Value::as_str) {
            return Some(s.to_string());
        }
    }
    None
}

/// `account.pageCount | data.pageCount | pageCount`, treating a missing or
/// non-key-book account as page count 0.
pub fn page_count(body: &Value) -> u64 {
    let is_key_book = account_type(body).map(|t| t == "keyBook").unwrap_or(false);
    if !is_key_book {
        return 0;
    }
    for pointer in ["/account/pageCount", "/data/pageCount", "/pageCount"] {
        if let Some(n) = body.pointer(pointer).and_then(Value::as_u64) {
            return n;
        }
    }
    0
}

fn account_type(body: &Value) -> Option<String> {
    for pointer in ["/account/type", "/data/type", "/type"] {
        if let Some(t) = body.pointer(pointer).and_then(Value::as_str) {
            return Some(t.to_string());
        }
    }
    None
}

/// Builds a `KeyPage` from a `queryKeyPage` response body. Returns `None`
/// when the account is not of type `keyPage`.
pub fn extract_key_page(url: &CanonicalUrl, body: &Value) -> Option<KeyPage> {
    if account_type(body).as_deref() != Some("keyPage") {
        return None;
    }

    let account = body
        .get("account")
        .or_else(|| body.get("data"))
        .unwrap_or(body);

    let version = account.get("version").and_then(Value::as_u64).unwrap_or(0);
    let threshold = account
        .get("acceptThreshold")
        .or_else(|| account.get("threshold"))
        .and_then(Value::as_u64)
        .unwrap_or(1);
    let credit_balance = account
        .get("creditBalance")
        .and_then(Value::as_u64)
        .unwrap_or(0);

    let entries = account
        .get("keys")
        .and_then(Value::as_array)
        .map(|raw| raw.iter().filter_map(parse_key_entry).collect())
        .unwrap_or_default();

    Some(KeyPage {
        url: url.clone(),
        version,
        threshold,
        credit_balance,
        entries,
    })
}

fn parse_key_entry(raw: &Value) -> Option<KeyEntry> {
    if let Some(delegate) = raw.get("delegate").and_then(Value::as_str) {
        return Some(KeyEntry::Delegate {
            delegate_url: normalize_url(delegate),
        });
    }
    if let Some(hash) = raw.get("publicKeyHash").and_then(Value::as_str) {
        return Some(KeyEntry::Key {
            public_key_hash: normalize_hash(hash),
            key_type: raw.get("keyType").and_then(Value::as_str).map(String::from),
            last_used_on: raw.get("lastUsedOn").and_then(Value::as_i64),
        });
    }
    None
}

/// `response.transaction` or `response.message.transaction`.
pub fn transaction_object(body: &Value) -> Option<&Value> {
    body.get("transaction")
        .or_else(|| body.pointer("/message/transaction"))
}

/// `status` may be: a bare string; a map with numeric `code`; a map with
/// string `code`; or a map with boolean `pending`/`delivered` flags.
/// Missing ⇒ unknown.
pub fn parse_status_v3(status: Option<&Value>) -> TxStatus {
    let Some(status) = status else {
        return TxStatus::Unknown;
    };

    if let Some(s) = status.as_str() {
        return match s {
            "pending" => TxStatus::Pending,
            "delivered" => TxStatus::Delivered,
            "remote" => TxStatus::Remote,
            "failed" => TxStatus::Failed,
            "expired" => TxStatus::Expired,
            _ => TxStatus::Unknown,
        };
    }

    if let Some(code) = status.get("code").and_then(Value::as_i64) {
        return match code {
            202 => TxStatus::Pending,
            201 => TxStatus::Delivered,
            _ => TxStatus::Unknown,
        };
    }
    if let Some(code) = status.get("code").and_then(Value::as_str) {
        return match code {
            "pending" => TxStatus::Pending,
            "delivered" => TxStatus::Delivered,
            "remote" => TxStatus::Remote,
            "failed" => TxStatus::Failed,
            "expired" => TxStatus::Expired,
            _ => TxStatus::Unknown,
        };
    }
    if status.get("pending").and_then(Value::as_bool) == Some(true) {
        return TxStatus::Pending;
    }
    if status.get("delivered").and_then(Value::as_bool) == Some(true) {
        return TxStatus::Delivered;
    }

    TxStatus::Unknown
}

fn normalize_timestamp_ms(raw: i64) -> i64 {
    if raw > 1_000_000_000_000_000 {
        raw / 1000
    } else if raw != 0 && raw < 1_000_000_000_000 {
        raw * 1000
    } else {
        raw
    }
}

fn find_signer(sig: &Value) -> Option<String> {
    if let Some(s) = sig.get("signer").and_then(Value::as_str) {
        return Some(s.to_string());
    }
    sig.get("signature").and_then(find_signer)
}

fn innermost(sig: &Value) -> &Value {
    match sig.get("signature") {
        Some(inner) if inner.is_object() => innermost(inner),
        _ => sig,
    }
}

fn vote_from(v: &Value) -> Vote {
    match v.get("vote").and_then(Value::as_str) {
        Some("reject") => Vote::Reject,
        Some("abstain") => Vote::Abstain,
        _ => Vote::Approve,
    }
}

fn record_from_signature_value(signer_default: Option<&str>, sig: &Value) -> SignatureRecord {
    let signer = find_signer(sig)
        .or_else(|| signer_default.map(String::from))
        .unwrap_or_default();
    let leaf = innermost(sig);
    let public_key_hash = leaf
        .get("publicKeyHash")
        .and_then(Value::as_str)
        .unwrap_or("");
    let timestamp = leaf
        .get("timestamp")
        .and_then(Value::as_i64)
        .map(normalize_timestamp_ms);

    SignatureRecord {
        signer: normalize_url(&signer),
        public_key_hash: normalize_hash(public_key_hash),
        vote: vote_from(leaf),
        timestamp,
    }
}

/// Merges the nested, paginated, and flat-legacy
/// signature shapes, deduplicated by `(signer, publicKeyHash, timestampMs)`.
pub fn extract_signatures_v3(body: &Value) -> Vec<SignatureRecord> {
    let mut out = Vec::new();
    let mut seen: HashSet<(String, String, i64)> = HashSet::new();

    let mut push = |rec: SignatureRecord| {
        let key = (
            rec.signer.as_str().to_string(),
            rec.public_key_hash.as_str().to_string(),
            rec.timestamp.unwrap_or(0),
        );
        if seen.insert(key) {
            out.push(rec);
        }
    };

    // Shape 1: nested records-of-records.
    if let Some(outer) = body.pointer("/signatures/records").and_then(Value::as_array) {
        for item in outer {
            if let Some(inner) = item.pointer("/signatures/records").and_then(Value::as_array) {
                for rec in inner {
                    let msg = rec.get("message");
                    if msg.and_then(|m| m.get("type")).and_then(Value::as_str) == Some("signature")
                    {
                        if let Some(sig) = msg.and_then(|m| m.get("signature")) {
                            push(record_from_signature_value(None, sig));
                        }
                    }
                }
            }
        }
    }

    // Shape 2: signatureBooks[*].pages[*].signatures.
    if let Some(books) = body.get("signatureBooks").and_then(Value::as_array) {
        for book in books {
            let Some(pages) = book.get("pages").and_then(Value::as_array) else {
                continue;
            };
            for page in pages {
                let elements: Vec<Value> = match page.get("signatures") {
                    Some(Value::Array(arr)) => arr.clone(),
                    Some(obj) => obj
                        .get("records")
                        .and_then(Value::as_array)
                        .cloned()
                        .unwrap_or_default(),
                    None => Vec::new(),
                };
                for elem in elements {
                    let msg = elem.get("message");
                    if msg.and_then(|m| m.get("type")).and_then(Value::as_str) == Some("signature")
                    {
                        if let Some(sig) = msg.and_then(|m| m.get("signature")) {
                            push(record_from_signature_value(None, sig));
                        }
                    }
                }
            }
        }
    }

    // Shape 3: flat legacy `signatures: [{signer, signatures:[...]}]`.
    if let Some(flat) = body.get("signatures").and_then(Value::as_array) {
        for elem in flat {
            let outer_signer = match elem.get("signer") {
                Some(Value::String(s)) => Some(s.clone()),
                Some(obj) => obj.get("url").and_then(Value::as_str).map(String::from),
                None => None,
            };
            match elem.get("signatures") {
                Some(Value::Array(inners)) => {
                    for inner in inners {
                        push(record_from_signature_value(outer_signer.as_deref(), inner));
                    }
                }
                _ => {
                    push(record_from_signature_value(outer_signer.as_deref(), elem));
                }
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parse_status_v3_handles_every_shape() {
        assert_eq!(parse_status_v3(Some(&json!("pending"))), TxStatus::Pending);
        assert_eq!(parse_status_v3(Some(&json!({"code": 202}))), TxStatus::Pending);
        assert_eq!(parse_status_v3(Some(&json!({"code": 201}))), TxStatus::Delivered);
        assert_eq!(parse_status_v3(Some(&json!({"code": "failed"}))), TxStatus::Failed);
        assert_eq!(
            parse_status_v3(Some(&json!({"pending": true}))),
            TxStatus::Pending
        );
        assert_eq!(parse_status_v3(None), TxStatus::Unknown);
    }

    #[test]
    fn extract_tx_id_probes_every_shape() {
        assert_eq!(
            extract_tx_id(&json!({"value": "acc://abc@x/y"})).as_deref(),
            Some("acc://abc@x/y")
        );
        assert_eq!(
            extract_tx_id(&json!({"value": {"txID": "acc://a"}})).as_deref(),
            Some("acc://a")
        );
        assert_eq!(
            extract_tx_id(&json!({"value": {"message": {"txID": "acc://b"}}})).as_deref(),
            Some("acc://b")
        );
        assert_eq!(extract_tx_id(&json!({"txid": "acc://c"})).as_deref(), Some("acc://c"));
        assert_eq!(extract_tx_id(&json!("acc://d")).as_deref(), Some("acc://d"));
        assert_eq!(extract_tx_id(&json!({"nothing": 1})), None);
    }

    #[test]
    fn extract_signatures_v3_nested_shape() {
        let body = json!({
            "signatures": {
                "records": [{
                    "signatures": {
                        "records": [{
                            "message": {
                                "type": "signature",
                                "signature": {
                                    "signer": "acc://alice.acme/book/1",
                                    "publicKeyHash": "AA",
                                    "timestamp": 1_700_000_000_000_000i64
                                }
                            }
                        }]
                    }
                }]
            }
        });

        let sigs = extract_signatures_v3(&body);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].signer.as_str(), "acc://alice.acme/book/1");
        assert_eq!(sigs[0].public_key_hash.as_str(), "aa");
    }

    #[test]
    fn extract_signatures_v3_nested_delegated_signer() {
        let body = json!({
            "signatures": {
                "records": [{
                    "signatures": {
                        "records": [{
                            "message": {
                                "type": "signature",
                                "signature": {
                                    "signature": {
                                        "signer": "acc://corp.acme/book/1",
                                        "publicKeyHash": "BB"
                                    }
                                }
                            }
                        }]
                    }
                }]
            }
        });

        let sigs = extract_signatures_v3(&body);
        assert_eq!(sigs.len(), 1);
        assert_eq!(sigs[0].signer.as_str(), "acc://corp.acme/book/1");
        assert_eq!(sigs[0].public_key_hash.as_str(), "bb");
    }

    #[test]
    fn extract_signatures_v3_flat_legacy_shape() {
        let body = json!({
            "signatures": [{
                "signer": "acc://alice.acme/book/1",
                "signatures": [
                    {"publicKeyHash": "AA", "timestamp": 1_700_000_000i64},
                    {"publicKeyHash": "BB"}
                ]
            }]
        });

        let sigs = extract_signatures_v3(&body);
        assert_eq!(sigs.len(), 2);
        assert!(sigs.iter().all(|s| s.signer.as_str() == "acc://alice.acme/book/1"));
    }

    #[test]
    fn extract_signatures_v3_deduplicates() {
        let body = json!({
            "signatures": [{
                "signer": "acc://alice.acme/book/1",
                "signatures": [
                    {"publicKeyHash": "AA", "timestamp": 100},
                    {"publicKeyHash": "AA", "timestamp": 100}
                ]
            }]
        });

        assert_eq!(extract_signatures_v3(&body).len(), 1);
    }

    #[test]
    fn extract_key_page_builds_entries() {
        let url = normalize_url("acc://alice.acme/book/1");
        let body = json!({
            "account": {
                "type": "keyPage",
                "version": 3,
                "threshold": 2,
                "creditBalance": 500,
                "keys": [
                    {"publicKeyHash": "AA"},
                    {"delegate": "acc://corp.acme/book/1"}
                ]
            }
        });

        let page = extract_key_page(&url, &body).unwrap();
        assert_eq!(page.threshold, 2);
        assert_eq!(page.entries.len(), 2);
    }

    #[test]
    fn page_count_requires_key_book_type() {
        let not_a_book = json!({"account": {"type": "keyPage", "pageCount": 5}});
        assert_eq!(page_count(&not_a_book), 0);

        let book = json!({"account": {"type": "keyBook", "pageCount": 5}});
        assert_eq!(page_count(&book), 5);
    }
}
