//! Per-cycle statistics, updated from N worker tasks under a lock.

#[derive(Default, Debug, Clone, serde::Serialize)]
pub struct PollStats {
    pub total_users: usize,
    pub processed_users: usize,
    pub skipped_users: usize,
    pub failed_users: usize,
    pub total_pending: usize,
    pub firestore_writes: usize,
    pub duration_ms: i64,
}
