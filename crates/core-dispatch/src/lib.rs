//! nodectl Core Dispatch: bounded worker pool with join-all batch dispatch
//!
//! # Overview
//!
//! This crate is **pure logic** with zero knowledge of nodes, transports or
//! remote protocols. It owns exactly one concern: running a batch of keyed
//! units of work on a fixed-size pool and handing back one result per key.
//!
//! ```text
//!   HashMap<K, FnOnce() -> R>
//!               │
//!               ▼
//! ┌─────────────────────────────────────────┐
//! │            WorkerPool                   │  ← explicitly sized, shared via Arc
//! │   (rayon scope, one job per key)        │
//! └─────────────┬───────────────────────────┘
//!               │  join-all barrier
//!               ▼
//!       HashMap<K, R>  (exactly one entry per input key)
//! ```
//!
//! # Usage Example
//!
//! ```
//! use nodectl_core_dispatch::WorkerPool;
//! use std::collections::HashMap;
//!
//! let pool = WorkerPool::new(4).unwrap();
//!
//! let mut batch = HashMap::new();
//! batch.insert("a", Box::new(|| 1) as Box<dyn FnOnce() -> i32 + Send>);
//! batch.insert("b", Box::new(|| 2) as Box<dyn FnOnce() -> i32 + Send>);
//!
//! let results = pool.dispatch(batch);
//! assert_eq!(results["a"], 1);
//! assert_eq!(results["b"], 2);
//! ```

pub mod error;
pub mod pool;

pub use error::DispatchError;
pub use pool::{WorkerPool, DEFAULT_CAPACITY};
