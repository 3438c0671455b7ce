//! inbox-discovery
//!
//! The three-phase discovery engine: turns a user's identities plus
//! the ledger's pending set into a deduplicated `EligibleTransaction` map.

pub mod context;
pub mod engine;
pub mod phases;

pub use context::DiscoveryContext;
pub use engine::{discover_for_user, DiscoveryResult};
