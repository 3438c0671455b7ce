//! Shared mutable state for one user's discovery cycle.
//!
//! Lives inside a single `discover_for_user` call — never shared across
//! users or cycles, per the reference workspace's per-worker-owns-its-maps
//! convention for this kind of fan-out.

use std::collections::{HashMap, HashSet};

use inbox_core::{CanonicalHash, EligibleTransaction, SignatureRecord};

pub struct DiscoveryContext {
    /// `hash → EligibleTransaction`, the running deduplicated result.
    pub eligible: HashMap<CanonicalHash, EligibleTransaction>,
    /// Cache of the last observed signatures per tx hash, so later phases
    /// don't re-fetch what an earlier phase already saw.
    pub signatures_by_hash: HashMap<CanonicalHash, Vec<SignatureRecord>>,
    /// `U`: the user's own key-hash set across every stored key-page.
    pub user_key_hashes: HashSet<CanonicalHash>,
    rpc_attempts: usize,
    rpc_failures: usize,
}

impl DiscoveryContext {
    pub fn new(user_key_hashes: HashSet<CanonicalHash>) -> Self {
        Self {
            eligible: HashMap::new(),
            signatures_by_hash: HashMap::new(),
            user_key_hashes,
            rpc_attempts: 0,
            rpc_failures: 0,
        }
    }

    pub fn cache_signatures(&mut self, hash: &CanonicalHash, signatures: &[SignatureRecord]) {
        self.signatures_by_hash
            .insert(hash.clone(), signatures.to_vec());
    }

    pub fn user_has_signed(&self, signatures: &[SignatureRecord]) -> bool {
        signatures
            .iter()
            .any(|s| self.user_key_hashes.contains(&s.public_key_hash))
    }

    pub fn already_seen(&self, hash: &CanonicalHash) -> bool {
        self.signatures_by_hash.contains_key(hash)
    }

    /// Union eligible-paths and promote category on a duplicate hash;
    /// insert fresh otherwise.
    pub fn insert_or_merge(&mut self, hash: CanonicalHash, contribution: EligibleTransaction) {
        self.eligible
            .entry(hash)
            .and_modify(|existing| existing.merge(contribution.clone()))
            .or_insert(contribution);
    }

    /// Records the outcome of one ledger RPC for the total-unavailability
    /// guard: `true` means it failed (transport/protocol error).
    pub fn record_rpc(&mut self, failed: bool) {
        self.rpc_attempts += 1;
        if failed {
            self.rpc_failures += 1;
        }
    }

    /// `true` when every RPC this user's cycle attempted failed or timed out.
    pub fn ledger_totally_unavailable(&self) -> bool {
        self.rpc_attempts > 0 && self.rpc_failures == self.rpc_attempts
    }
}
