use thiserror::Error;

/// Domain error type shared across every crate in the service.
///
/// One flat enum per crate boundary rather than nested error types, so a
/// caller two layers up can still match on a specific variant without
/// reaching through `source()` chains.
#[derive(Debug, Error)]
pub enum InboxError {
    // ── Ledger transport ─────────────────────────────────────────────────────
    #[error("ledger transport error calling {method}: {message}")]
    Transport { method: String, message: String },

    #[error("ledger RPC error ({code}) calling {method}: {message}")]
    RpcProtocol {
        method: String,
        code: i64,
        message: String,
    },

    #[error("ledger response for {method} had an unexpected shape: {detail}")]
    UnexpectedResponseShape { method: String, detail: String },

    // ── Domain lookups ───────────────────────────────────────────────────────
    #[error("unknown account: {0}")]
    UnknownAccount(String),

    #[error("not a key page: {0}")]
    NotAKeyPage(String),

    #[error("not a key book: {0}")]
    NotAKeyBook(String),

    // ── Store ────────────────────────────────────────────────────────────────
    #[error("inbox store read failed for user {uid}: {message}")]
    StoreRead { uid: String, message: String },

    #[error("inbox store commit failed for user {uid}: {message}")]
    StoreCommit { uid: String, message: String },

    // ── Configuration ────────────────────────────────────────────────────────
    #[error("invalid configuration: {0}")]
    Config(String),

    // ── Serialization ────────────────────────────────────────────────────────
    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("{0}")]
    Other(String),
}

impl InboxError {
    /// Classifies transport-layer failures as retryable per the retry
    /// policy's default predicate: network timeouts, connection
    /// refused/reset, rate-limiting, and the 5xx family.
    pub fn is_transient(&self) -> bool {
        match self {
            InboxError::Transport { message, .. } => {
                let m = message.to_lowercase();
                m.contains("timeout")
                    || m.contains("timed out")
                    || m.contains("connection refused")
                    || m.contains("connection reset")
                    || m.contains("429")
                    || m.contains("5xx")
                    || (m.contains("50") && m.contains("status"))
            }
            _ => false,
        }
    }
}
