//! Signing-path explorer: bounded DFS over the delegation DAG.
//!
//! Modeled the way the reference workspace splits DAG traversal from
//! validation — `SigningPath` is an immutable value, the walk is a free
//! function over a mutable `visited` set passed by reference rather than a
//! struct carrying interior mutability.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;

use inbox_core::{CanonicalUrl, Identity, KeyBook, KeyEntry, KeyPage, SigningPath};
use inbox_ledger::LedgerPort;
use inbox_support::canon::normalize_url;

/// What the explorer hands back to the discovery engine per identity: every
/// distinct signing path, plus a fresh snapshot of the key-books it walked
/// (used to refresh the stored identity).
pub struct ExplorationOutput {
    pub paths: Vec<SigningPath>,
    pub key_books: Vec<KeyBook>,
}

/// Follows one delegation chain. `depth` starts at 1 for the first hop off
/// the source; the walk aborts once `depth > max_depth`. Recursion crosses
/// an `.await` point, so each call is boxed.
fn follow_delegation_chain<'a>(
    target: CanonicalUrl,
    current_path: Vec<CanonicalUrl>,
    visited: &'a mut HashSet<CanonicalUrl>,
    results: &'a mut Vec<SigningPath>,
    depth: u32,
    max_depth: u32,
    ledger: &'a dyn LedgerPort,
) -> Pin<Box<dyn Future<Output = ()> + Send + 'a>> {
    Box::pin(async move {
        if depth > max_depth || visited.contains(&target) {
            return;
        }
        visited.insert(target.clone());

        if !ledger.account_exists(&target).await {
            return;
        }

        let mut new_path = current_path;
        new_path.push(target.clone());
        results.push(SigningPath::new(new_path.clone()));

        if let Ok(Some(page)) = ledger.query_key_page(&target).await {
            for entry in &page.entries {
                if let KeyEntry::Delegate { delegate_url } = entry {
                    follow_delegation_chain(
                        delegate_url.clone(),
                        new_path.clone(),
                        visited,
                        results,
                        depth + 1,
                        max_depth,
                        ledger,
                    )
                    .await;
                }
            }
        }
    })
}

fn register_direct(
    page_url: &CanonicalUrl,
    direct_registered: &mut HashSet<CanonicalUrl>,
    results: &mut Vec<SigningPath>,
) {
    if direct_registered.insert(page_url.clone()) {
        results.push(SigningPath::new(vec![page_url.clone()]));
    }
}

async fn key_page_url_at(book_url: &CanonicalUrl, index: u64) -> CanonicalUrl {
    normalize_url(&format!("{}/{}", book_url.as_str(), index))
}

/// Walks every key-book/key-page owned by a single identity, discovering
/// each distinct signing path.
pub async fn explore_identity(
    identity: &Identity,
    ledger: &dyn LedgerPort,
    max_depth: u32,
) -> ExplorationOutput {
    let mut visited: HashSet<CanonicalUrl> = HashSet::new();
    let mut direct_registered: HashSet<CanonicalUrl> = HashSet::new();
    let mut paths: Vec<SigningPath> = Vec::new();
    let mut live_books: Vec<KeyBook> = Vec::new();

    // Step 1: seed the key-book URL set from stored books + directory.
    let mut book_urls: Vec<CanonicalUrl> =
        identity.key_books.iter().map(|b| b.url.clone()).collect();
    let directory = ledger
        .query_directory(&identity.identity_url, 0, 1000)
        .await
        .unwrap_or_default();
    for url in directory {
        if !book_urls.contains(&url) {
            book_urls.push(url);
        }
    }

    // Step 2: stored key-pages become direct paths; DFS their delegates.
    for book in &identity.key_books {
        for page in &book.key_pages {
            register_direct(&page.url, &mut direct_registered, &mut paths);
            walk_delegates(page, &mut visited, &mut paths, max_depth, ledger).await;
        }
    }

    // Step 3: seeded key-book URLs queried live, page by page.
    for book_url in &book_urls {
        let page_count = match ledger.query_key_book_page_count(book_url).await {
            Ok(n) => n,
            Err(_) => continue,
        };
        if page_count == 0 {
            continue;
        }

        let mut live_pages = Vec::with_capacity(page_count as usize);
        for index in 1..=page_count {
            let page_url = key_page_url_at(book_url, index).await;
            let page = match ledger.query_key_page(&page_url).await {
                Ok(Some(p)) => p,
                _ => continue,
            };

            if !direct_registered.contains(&page.url) {
                register_direct(&page.url, &mut direct_registered, &mut paths);
            }
            walk_delegates(&page, &mut visited, &mut paths, max_depth, ledger).await;
            live_pages.push(page);
        }

        live_books.push(KeyBook {
            url: book_url.clone(),
            key_pages: live_pages,
        });
    }

    ExplorationOutput {
        paths,
        key_books: live_books,
    }
}

async fn walk_delegates(
    page: &KeyPage,
    visited: &mut HashSet<CanonicalUrl>,
    paths: &mut Vec<SigningPath>,
    max_depth: u32,
    ledger: &dyn LedgerPort,
) {
    for entry in &page.entries {
        if let KeyEntry::Delegate { delegate_url } = entry {
            follow_delegation_chain(
                delegate_url.clone(),
                vec![page.url.clone()],
                visited,
                paths,
                1,
                max_depth,
                ledger,
            )
            .await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use inbox_core::{AccountStub, InboxError, PendingTx};
    use proptest::prelude::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct FakeLedger {
        key_pages: HashMap<String, KeyPage>,
        existing: std::collections::HashSet<String>,
        directory: Vec<CanonicalUrl>,
        page_counts: HashMap<String, u64>,
        exists_calls: Mutex<u32>,
    }

    #[async_trait]
    impl LedgerPort for FakeLedger {
        async fn query_pending_tx_ids(&self, _: &CanonicalUrl, _: u32, _: u32) -> Result<Vec<String>, InboxError> {
            Ok(Vec::new())
        }
        async fn query_pending(&self, _: &CanonicalUrl) -> Result<Vec<PendingTx>, InboxError> {
            Ok(Vec::new())
        }
        async fn query_key_book_page_count(&self, url: &CanonicalUrl) -> Result<u64, InboxError> {
            Ok(*self.page_counts.get(url.as_str()).unwrap_or(&0))
        }
        async fn query_key_page(&self, url: &CanonicalUrl) -> Result<Option<KeyPage>, InboxError> {
            Ok(self.key_pages.get(url.as_str()).cloned())
        }
        async fn query_signature_chain_total(&self, _: &CanonicalUrl) -> Result<u64, InboxError> {
            Ok(0)
        }
        async fn query_signature_chain_records(
            &self,
            _: &CanonicalUrl,
            _: u64,
            _: u64,
        ) -> Result<Vec<serde_json::Value>, InboxError> {
            Ok(Vec::new())
        }
        async fn query_directory(&self, _: &CanonicalUrl, _: u64, _: u64) -> Result<Vec<CanonicalUrl>, InboxError> {
            Ok(self.directory.clone())
        }
        async fn query_transaction(&self, _: &str) -> Result<Option<PendingTx>, InboxError> {
            Ok(None)
        }
        async fn query_transaction_raw(&self, _: &str) -> Result<Option<serde_json::Value>, InboxError> {
            Ok(None)
        }
        async fn account_exists(&self, url: &CanonicalUrl) -> bool {
            *self.exists_calls.lock().unwrap() += 1;
            self.existing.contains(url.as_str())
        }
        async fn health_check(&self) -> Result<(), InboxError> {
            Ok(())
        }
    }

    fn url(s: &str) -> CanonicalUrl {
        normalize_url(s)
    }

    #[tokio::test]
    async fn direct_path_for_owned_key_page() {
        let page = KeyPage {
            url: url("acc://alice.acme/book/1"),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![],
        };
        let identity = Identity {
            identity_url: url("acc://alice.acme"),
            key_books: vec![KeyBook {
                url: url("acc://alice.acme/book"),
                key_pages: vec![page],
            }],
            accounts: vec![AccountStub {
                url: url("acc://alice.acme/tokens"),
                account_type: "tokenAccount".into(),
            }],
            credit_balance: 0,
            created_at: None,
            updated_at: None,
        };

        let ledger = FakeLedger {
            key_pages: HashMap::new(),
            existing: Default::default(),
            directory: vec![],
            page_counts: HashMap::new(),
            exists_calls: Mutex::new(0),
        };

        let out = explore_identity(&identity, &ledger, 10).await;
        assert_eq!(out.paths.len(), 1);
        assert!(out.paths[0].is_direct());
    }

    #[tokio::test]
    async fn delegation_chain_produces_multi_hop_path() {
        let bob_page = KeyPage {
            url: url("acc://bob.acme/book/1"),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Delegate {
                delegate_url: url("acc://corp.acme/book/1"),
            }],
        };
        let corp_page = KeyPage {
            url: url("acc://corp.acme/book/1"),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Key {
                public_key_hash: inbox_core::CanonicalHash::new("bb"),
                key_type: None,
                last_used_on: None,
            }],
        };

        let identity = Identity {
            identity_url: url("acc://bob.acme"),
            key_books: vec![KeyBook {
                url: url("acc://bob.acme/book"),
                key_pages: vec![bob_page],
            }],
            accounts: vec![],
            credit_balance: 0,
            created_at: None,
            updated_at: None,
        };

        let mut key_pages = HashMap::new();
        key_pages.insert("acc://corp.acme/book/1".to_string(), corp_page);
        let mut existing = std::collections::HashSet::new();
        existing.insert("acc://corp.acme/book/1".to_string());

        let ledger = FakeLedger {
            key_pages,
            existing,
            directory: vec![],
            page_counts: HashMap::new(),
            exists_calls: Mutex::new(0),
        };

        let out = explore_identity(&identity, &ledger, 10).await;
        // One direct path (bob/book/1) + one delegated path (bob -> corp).
        assert_eq!(out.paths.len(), 2);
        let delegated = out.paths.iter().find(|p| !p.is_direct()).unwrap();
        assert_eq!(delegated.hops.len(), 2);
        assert_eq!(delegated.final_signer().as_str(), "acc://corp.acme/book/1");
    }

    #[tokio::test]
    async fn cyclic_delegation_terminates_and_visits_once() {
        let a = url("acc://a.acme/book/1");
        let b = url("acc://b.acme/book/1");

        let page_a = KeyPage {
            url: a.clone(),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Delegate { delegate_url: b.clone() }],
        };
        let page_b = KeyPage {
            url: b.clone(),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Delegate { delegate_url: a.clone() }],
        };

        let identity = Identity {
            identity_url: url("acc://a.acme"),
            key_books: vec![KeyBook {
                url: url("acc://a.acme/book"),
                key_pages: vec![page_a],
            }],
            accounts: vec![],
            credit_balance: 0,
            created_at: None,
            updated_at: None,
        };

        let mut key_pages = HashMap::new();
        key_pages.insert(a.as_str().to_string(), key_pages_clone_entry(&a));
        key_pages.insert(b.as_str().to_string(), page_b);
        let mut existing = std::collections::HashSet::new();
        existing.insert(a.as_str().to_string());
        existing.insert(b.as_str().to_string());

        fn key_pages_clone_entry(url: &CanonicalUrl) -> KeyPage {
            KeyPage {
                url: url.clone(),
                version: 1,
                threshold: 1,
                credit_balance: 0,
                entries: vec![KeyEntry::Delegate {
                    delegate_url: CanonicalUrl::new("acc://b.acme/book/1"),
                }],
            }
        }

        let ledger = FakeLedger {
            key_pages,
            existing,
            directory: vec![],
            page_counts: HashMap::new(),
            exists_calls: Mutex::new(0),
        };

        let out = explore_identity(&identity, &ledger, 10).await;
        // direct(a) + delegated(a->b); the b->a back-edge is dropped since a is
        // already visited.
        assert_eq!(out.paths.len(), 2);
        let hop_counts: Vec<usize> = out.paths.iter().map(|p| p.hops.len()).collect();
        assert!(hop_counts.contains(&1));
        assert!(hop_counts.contains(&2));
    }

    #[tokio::test]
    async fn max_depth_is_enforced() {
        // A chain of delegates 10 deep should be truncated at max_depth=2.
        let start = url("acc://start.acme/book/1");
        let mid = url("acc://mid.acme/book/1");
        let tail = url("acc://tail.acme/book/1");

        let page_start = KeyPage {
            url: start.clone(),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Delegate { delegate_url: mid.clone() }],
        };
        let page_mid = KeyPage {
            url: mid.clone(),
            version: 1,
            threshold: 1,
            credit_balance: 0,
            entries: vec![KeyEntry::Delegate { delegate_url: tail.clone() }],
        };

        let identity = Identity {
            identity_url: url("acc://start.acme"),
            key_books: vec![KeyBook {
                url: url("acc://start.acme/book"),
                key_pages: vec![page_start],
            }],
            accounts: vec![],
            credit_balance: 0,
            created_at: None,
            updated_at: None,
        };

        let mut key_pages = HashMap::new();
        key_pages.insert(mid.as_str().to_string(), page_mid);
        let mut existing = std::collections::HashSet::new();
        existing.insert(mid.as_str().to_string());
        existing.insert(tail.as_str().to_string());

        let ledger = FakeLedger {
            key_pages,
            existing,
            directory: vec![],
            page_counts: HashMap::new(),
            exists_calls: Mutex::new(0),
        };

        // depth starts at 1 for the first hop; max_depth=1 allows exactly one
        // delegated hop (start -> mid) and no further.
        let out = explore_identity(&identity, &ledger, 1).await;
        assert!(out.paths.iter().all(|p| p.hops.len() <= 2));
        assert!(!out.paths.iter().any(|p| p.final_signer().as_str() == tail.as_str()));
    }

    fn linear_chain_ledger(length: usize) -> FakeLedger {
        let mut key_pages = HashMap::new();
        let mut existing = std::collections::HashSet::new();
        for i in 0..length {
            let this_url = url(&format!("acc://hop{i}.acme/book/1"));
            existing.insert(this_url.as_str().to_string());
            let entries = if i + 1 < length {
                let next_url = url(&format!("acc://hop{}.acme/book/1", i + 1));
                vec![KeyEntry::Delegate { delegate_url: next_url }]
            } else {
                vec![]
            };
            key_pages.insert(
                this_url.as_str().to_string(),
                KeyPage {
                    url: this_url,
                    version: 1,
                    threshold: 1,
                    credit_balance: 0,
                    entries,
                },
            );
        }
        FakeLedger {
            key_pages,
            existing,
            directory: vec![],
            page_counts: HashMap::new(),
            exists_calls: Mutex::new(0),
        }
    }

    proptest::proptest! {
        // Every SigningPath has at most DELEGATION_DEPTH + 1 hops and no
        // duplicate hops, for any chain length / depth cap.
        #[test]
        fn path_length_never_exceeds_depth_cap_plus_one(
            chain_len in 1usize..12,
            max_depth in 1u32..12,
        ) {
            let runtime = tokio::runtime::Runtime::new().unwrap();
            runtime.block_on(async {
                let hop0 = url("acc://hop0.acme/book/1");
                let identity = Identity {
                    identity_url: url("acc://hop0.acme"),
                    key_books: vec![KeyBook {
                        url: url("acc://hop0.acme/book"),
                        key_pages: vec![KeyPage {
                            url: hop0.clone(),
                            version: 1,
                            threshold: 1,
                            credit_balance: 0,
                            entries: if chain_len > 1 {
                                vec![KeyEntry::Delegate {
                                    delegate_url: url("acc://hop1.acme/book/1"),
                                }]
                            } else {
                                vec![]
                            },
                        }],
                    }],
                    accounts: vec![],
                    credit_balance: 0,
                    created_at: None,
                    updated_at: None,
                };

                let ledger = linear_chain_ledger(chain_len);
                let out = explore_identity(&identity, &ledger, max_depth).await;

                for path in &out.paths {
                    prop_assert!(path.hops.len() as u32 <= max_depth + 1);
                    let mut seen = std::collections::HashSet::new();
                    prop_assert!(path.hops.iter().all(|h| seen.insert(h.as_str())));
                }
                Ok(())
            })?;
        }
    }
}
