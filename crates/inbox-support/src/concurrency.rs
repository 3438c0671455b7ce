//! Bounded concurrency primitive.
//!
//! `tokio::sync::Semaphore` is already a fair FIFO semaphore — permits are
//! handed out in acquire order, so a slow-starting worker never gets
//! starved by later arrivals. We wrap it rather than reimplement it.

use std::sync::Arc;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio::sync::Semaphore;

/// A named bound on in-flight work. Cloning shares the same underlying
/// permit pool.
#[derive(Clone)]
pub struct BoundedPool {
    label: &'static str,
    semaphore: Arc<Semaphore>,
}

impl BoundedPool {
    pub fn new(label: &'static str, max_concurrent: usize) -> Self {
        Self {
            label,
            semaphore: Arc::new(Semaphore::new(max_concurrent.max(1))),
        }
    }

    pub fn label(&self) -> &'static str {
        self.label
    }

    /// Runs `make_future(item)` for every item in `items`, at most
    /// `max_concurrent` at a time, and collects results in completion
    /// order (not input order — callers that need input order should
    /// tag their own item before collecting).
    pub async fn run_bounded<I, T, F, Fut>(&self, items: Vec<I>, make_future: F) -> Vec<T>
    where
        F: Fn(I) -> Fut,
        Fut: std::future::Future<Output = T>,
    {
        let mut pending = FuturesUnordered::new();
        for item in items {
            let permit = self
                .semaphore
                .clone()
                .acquire_owned()
                .await
                .expect("semaphore is never closed");
            let fut = make_future(item);
            pending.push(async move {
                let result = fut.await;
                drop(permit);
                result
            });
        }

        let mut results = Vec::new();
        while let Some(r) = pending.next().await {
            results.push(r);
        }
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[tokio::test]
    async fn never_exceeds_bound() {
        let pool = BoundedPool::new("test", 2);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let max_seen = Arc::new(AtomicUsize::new(0));

        let items: Vec<u32> = (0..10).collect();
        let in_flight_c = in_flight.clone();
        let max_seen_c = max_seen.clone();

        let results = pool
            .run_bounded(items, move |i| {
                let in_flight = in_flight_c.clone();
                let max_seen = max_seen_c.clone();
                async move {
                    let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                    max_seen.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(std::time::Duration::from_millis(1)).await;
                    in_flight.fetch_sub(1, Ordering::SeqCst);
                    i
                }
            })
            .await;

        assert_eq!(results.len(), 10);
        assert!(max_seen.load(Ordering::SeqCst) <= 2);
    }
}
