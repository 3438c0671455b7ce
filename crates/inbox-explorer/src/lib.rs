//! inbox-explorer
//!
//! Signing-path explorer: a bounded DFS over each identity's
//! delegation DAG, producing every distinct path through which the user can
//! ultimately authorize a transaction.

pub mod explorer;

pub use explorer::{explore_identity, ExplorationOutput};
