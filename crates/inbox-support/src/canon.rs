//! URL/Hash canonicalization.
//!
//! Centralizes every place a ledger URL or transaction hash is reduced to
//! its comparable form. Nothing downstream should re-derive these rules —
//! wrap a normalized value in `CanonicalUrl`/`CanonicalHash` once, here.

use inbox_core::{CanonicalHash, CanonicalUrl};
use once_cell::sync::Lazy;
use regex::Regex;

const SCHEME: &str = "acc://";

/// Normalize a ledger URL: trim, lowercase, ensure a leading `acc://`, strip
/// any trailing slash.
pub fn normalize_url(raw: &str) -> CanonicalUrl {
    let trimmed = raw.trim().to_lowercase();

    let with_scheme = if trimmed.starts_with(SCHEME) {
        trimmed
    } else if let Some(rest) = trimmed.strip_prefix("acc:") {
        // "acc:foo.acme" → insert the missing "//" separator.
        format!("{SCHEME}{}", rest.trim_start_matches('/'))
    } else {
        format!("{SCHEME}{trimmed}")
    };

    let mut canonical = with_scheme;
    while canonical.len() > SCHEME.len() && canonical.ends_with('/') {
        canonical.pop();
    }

    CanonicalUrl::new(canonical)
}

/// Normalize a transaction hash/id: trim, lowercase, strip a leading `0x`
/// or `acc://`, then truncate at the first `@` or `/` (the ledger's
/// `acc://HEX@principal/path` transaction-id form reduces to `HEX`).
pub fn normalize_hash(raw: &str) -> CanonicalHash {
    let mut s = raw.trim().to_lowercase();

    if let Some(rest) = s.strip_prefix("0x") {
        s = rest.to_string();
    }
    if let Some(rest) = s.strip_prefix(SCHEME) {
        s = rest.to_string();
    }

    let cut = s
        .find(['@', '/'])
        .unwrap_or(s.len());
    s.truncate(cut);

    CanonicalHash::new(s)
}

/// Extract the identity (ADI) root from a canonical URL:
/// `acc://<adi-name>/<path>` → `acc://<adi-name>`. A URL with no slash after
/// the scheme is already an identity URL and is returned unchanged.
pub fn extract_adi(url: &CanonicalUrl) -> CanonicalUrl {
    let s = url.as_str();
    let rest = &s[SCHEME.len()..];
    match rest.find('/') {
        Some(idx) => CanonicalUrl::new(format!("{SCHEME}{}", &rest[..idx])),
        None => url.clone(),
    }
}

static KEY_BOOK_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/books?$").unwrap());
static KEY_PAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"/books?/\d+$|/page/\d+$").unwrap());

/// Advisory classifier: does this URL look like a key-book? Not
/// authoritative — the ledger's `account.type` field always wins.
pub fn is_key_book_url(url: &CanonicalUrl) -> bool {
    KEY_BOOK_RE.is_match(url.as_str())
}

/// Advisory classifier: does this URL look like a key-page?
pub fn is_key_page_url(url: &CanonicalUrl) -> bool {
    KEY_PAGE_RE.is_match(url.as_str())
}
