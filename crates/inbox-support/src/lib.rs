//! inbox-support
//!
//! Cross-cutting helpers shared by every other crate in the workspace:
//! URL/hash canonicalization, retry/backoff, and bounded concurrency.

pub mod canon;
pub mod concurrency;
pub mod retry;

pub use concurrency::BoundedPool;
pub use retry::{retry, RetryPolicy};
