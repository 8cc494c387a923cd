//! Scanline work distribution.
//!
//! Every worker of a fixed rayon pool pulls rows from one shared atomic
//! cursor until the image is exhausted. Rows are claimed dynamically, so a
//! slow row does not hold up the rest. A dispatch is fork-join: it returns
//! only once every worker has drained the cursor.

use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicUsize, Ordering};

use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::RenderResult;

/// Row counts from one dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DispatchReport {
    /// Rows claimed by each worker, indexed by worker
    pub rows_per_worker: Vec<usize>,
}

impl DispatchReport {
    /// Total rows processed.
    pub fn total_rows(&self) -> usize {
        self.rows_per_worker.iter().sum()
    }
}

/// Distributes image rows across a fixed pool of worker threads.
pub struct ScanlineDispatcher {
    pool: ThreadPool,
}

impl ScanlineDispatcher {
    /// One worker per available hardware thread (at least one).
    pub fn new() -> RenderResult<Self> {
        let threads = std::thread::available_parallelism()
            .map(NonZeroUsize::get)
            .unwrap_or(1);
        Self::with_threads(threads)
    }

    /// Fixed worker count; zero is bumped to one.
    pub fn with_threads(threads: usize) -> RenderResult<Self> {
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads.max(1))
            .thread_name(|i| format!("facetrace-worker-{i}"))
            .build()?;
        Ok(Self { pool })
    }

    /// Number of workers.
    pub fn num_threads(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Process rows `0..rows` exactly once each.
    ///
    /// Each worker builds its private state with `init(worker_index)` and
    /// then calls `work(&mut state, row)` for every row it claims. Columns
    /// within a row are the callee's business. Blocks until all workers
    /// are done.
    pub fn dispatch<S, I, F>(&self, rows: usize, init: I, work: F) -> DispatchReport
    where
        I: Fn(usize) -> S + Sync,
        F: Fn(&mut S, usize) + Sync,
    {
        let cursor = AtomicUsize::new(0);

        let rows_per_worker = self.pool.broadcast(|ctx| {
            let mut state = init(ctx.index());
            let mut claimed = 0;
            loop {
                let row = cursor.fetch_add(1, Ordering::Relaxed);
                if row >= rows {
                    break;
                }
                work(&mut state, row);
                claimed += 1;
            }
            claimed
        });

        DispatchReport { rows_per_worker }
    }
}
