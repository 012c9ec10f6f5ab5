//! Bounded worker pool with join-all dispatch
//!
//! A `WorkerPool` is created once and shared by reference (usually through an
//! `Arc`). Every call to [`WorkerPool::dispatch`] submits the whole batch to
//! the pool and then blocks until every task has returned, so the wall-clock
//! cost of a batch is that of its slowest task rather than the sum.

use super::error::DispatchError;
use crossbeam_channel::bounded;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::time::Instant;
use tracing::debug;

/// Default number of concurrent workers
pub const DEFAULT_CAPACITY: usize = 64;

/// Fixed-capacity pool servicing batch dispatches
///
/// The pool holds no per-call state. Several threads may dispatch into the
/// same pool at once; their tasks simply share the workers.
pub struct WorkerPool {
    pool: rayon::ThreadPool,
    capacity: usize,
}

impl WorkerPool {
    /// Create a pool with exactly `capacity` workers
    ///
    /// A capacity of 1 serializes execution, which makes task ordering
    /// deterministic in tests.
    pub fn new(capacity: usize) -> Result<Self, DispatchError> {
        if capacity == 0 {
            return Err(DispatchError::ZeroCapacity);
        }

        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(capacity)
            .thread_name(|index| format!("dispatch-{}", index))
            .build()
            .map_err(|e| DispatchError::PoolBuild(e.to_string()))?;

        debug!("Created worker pool with {} workers", capacity);

        Ok(Self { pool, capacity })
    }

    /// Create a pool with [`DEFAULT_CAPACITY`] workers
    pub fn with_default_capacity() -> Result<Self, DispatchError> {
        Self::new(DEFAULT_CAPACITY)
    }

    /// Maximum number of tasks that run at the same time
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Run every task in `batch` and wait for all of them
    ///
    /// Returns one entry per input key. Tasks are expected to fold their own
    /// failures into `R`; the pool neither retries nor suppresses anything.
    /// If a task panics, the panic is re-raised here once every other task
    /// of the batch has finished, and the pool stays usable.
    pub fn dispatch<K, F, R>(&self, batch: HashMap<K, F>) -> HashMap<K, R>
    where
        K: Eq + Hash + Send,
        F: FnOnce() -> R + Send,
        R: Send,
    {
        self.dispatch_with(batch)
    }

    /// Same as [`dispatch`](Self::dispatch) for any sequence of `(key, task)`
    /// pairs. If a key repeats, the result of the later task wins.
    pub fn dispatch_with<I, K, F, R>(&self, tasks: I) -> HashMap<K, R>
    where
        I: IntoIterator<Item = (K, F)>,
        K: Eq + Hash + Send,
        F: FnOnce() -> R + Send,
        R: Send,
    {
        let tasks: Vec<(K, F)> = tasks.into_iter().collect();
        let submitted = tasks.len();
        if submitted == 0 {
            return HashMap::new();
        }

        let started = Instant::now();
        let (tx, rx) = bounded::<(usize, K, R)>(submitted);

        // All jobs are spawned before the scope starts waiting on them.
        self.pool.scope(|scope| {
            for (index, (key, task)) in tasks.into_iter().enumerate() {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let result = task();
                    // Capacity equals the batch size, so this never blocks.
                    let _ = tx.send((index, key, result));
                });
            }
        });
        drop(tx);

        let mut collected: Vec<(usize, K, R)> = rx.into_iter().collect();
        collected.sort_by_key(|(index, _, _)| *index);

        debug!(
            "Dispatched {} tasks on {} workers in {:?}",
            submitted,
            self.capacity,
            started.elapsed()
        );

        collected
            .into_iter()
            .map(|(_, key, result)| (key, result))
            .collect()
    }
}

impl fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorkerPool")
            .field("capacity", &self.capacity)
            .finish()
    }
}
