//! Bounded fan-out/fan-in over independent work items.
//!
//! Each batch runs on a dedicated rayon pool sized to the configured worker
//! limit. Items are processed in unspecified order; every result is returned
//! paired with the item that produced it. A panic inside any item rejects the
//! whole batch with [`Error::Worker`].

use rayon::prelude::*;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::{Error, Result};

/// Progress sink: `(completed, total)` after each finished item.
pub type BatchProgress<'a> = &'a (dyn Fn(usize, usize) + Sync);

/// Runs batches of pure work items on a bounded thread pool.
pub struct ParallelExecutor {
    pool: rayon::ThreadPool,
    limit: usize,
}

impl std::fmt::Debug for ParallelExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ParallelExecutor")
            .field("limit", &self.limit)
            .finish()
    }
}

impl ParallelExecutor {
    /// Creates an executor with at most `limit` concurrent workers.
    ///
    /// A limit of 0 uses the available hardware parallelism.
    pub fn new(limit: usize) -> Result<Self> {
        let limit = if limit == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1)
        } else {
            limit
        };

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(limit)
            .thread_name(|i| format!("orbinest-worker-{}", i))
            .build()
            .map_err(|e| Error::Internal(format!("failed to build worker pool: {}", e)))?;

        Ok(Self { pool, limit })
    }

    /// Maximum number of concurrent workers.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Applies `job` to every item and returns `(item, result)` pairs.
    ///
    /// Resolves only once every item has completed. If any item panics the
    /// batch is rejected and no partial results are returned.
    pub fn map<T, R, F>(
        &self,
        items: Vec<T>,
        job: F,
        progress: Option<BatchProgress<'_>>,
    ) -> Result<Vec<(T, R)>>
    where
        T: Send,
        R: Send,
        F: Fn(&T) -> R + Sync,
    {
        let total = items.len();
        if total == 0 {
            return Ok(Vec::new());
        }

        let completed = AtomicUsize::new(0);

        self.pool.install(|| {
            items
                .into_par_iter()
                .map(|item| {
                    let outcome = catch_unwind(AssertUnwindSafe(|| job(&item)));
                    let done = completed.fetch_add(1, Ordering::Relaxed) + 1;
                    if let Some(report) = progress {
                        report(done, total);
                    }
                    match outcome {
                        Ok(result) => Ok((item, result)),
                        Err(payload) => Err(Error::Worker(panic_message(payload.as_ref()))),
                    }
                })
                .collect::<Result<Vec<_>>>()
        })
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "work item panicked".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn test_results_paired_with_items() {
        let executor = ParallelExecutor::new(4).unwrap();
        let items: Vec<u32> = (0..100).collect();

        let results = executor.map(items, |x| x * x, None).unwrap();

        assert_eq!(results.len(), 100);
        for (item, square) in results {
            assert_eq!(item * item, square);
        }
    }

    #[test]
    fn test_empty_batch() {
        let executor = ParallelExecutor::new(2).unwrap();
        let results = executor.map(Vec::<u32>::new(), |x| *x, None).unwrap();
        assert!(results.is_empty());
    }

    #[test]
    fn test_progress_reaches_total() {
        let executor = ParallelExecutor::new(3).unwrap();
        let calls = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);
        let progress = |done: usize, total: usize| {
            assert_eq!(total, 25);
            calls.fetch_add(1, Ordering::Relaxed);
            max_seen.fetch_max(done, Ordering::Relaxed);
        };

        executor
            .map((0..25).collect::<Vec<u32>>(), |x| x + 1, Some(&progress))
            .unwrap();

        assert_eq!(calls.load(Ordering::Relaxed), 25);
        assert_eq!(max_seen.load(Ordering::Relaxed), 25);
    }

    #[test]
    fn test_panic_rejects_batch() {
        let executor = ParallelExecutor::new(2).unwrap();
        let result = executor.map(
            (0..10).collect::<Vec<u32>>(),
            |&x| {
                if x == 7 {
                    panic!("bad item {}", x);
                }
                x
            },
            None,
        );

        match result {
            Err(Error::Worker(message)) => assert!(message.contains("bad item 7")),
            other => panic!("expected worker error, got {:?}", other.map(|r| r.len())),
        }
    }

    #[test]
    fn test_zero_limit_uses_hardware() {
        let executor = ParallelExecutor::new(0).unwrap();
        assert!(executor.limit() >= 1);
    }
}
