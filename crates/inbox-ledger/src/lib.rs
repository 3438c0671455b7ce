//! inbox-ledger
//!
//! Typed client over the ledger's `query` JSON-RPC method, with
//! tolerant parsing of the v3 response envelope centralized in `response`.

pub mod client;
pub mod port;
pub mod response;

pub use client::LedgerClient;
pub use port::LedgerPort;
