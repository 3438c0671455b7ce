//! inbox-reconciler
//!
//! Turns one cycle's discovery result into a per-user inbox diff and commits
//! it through the store adapter.

pub mod build;
pub mod reconcile;
pub mod summary;
pub mod token;

pub use build::build_doc;
pub use reconcile::{reconcile, ReconcileOutcome};
pub use token::cycle_token;
