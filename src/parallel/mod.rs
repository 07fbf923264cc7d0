//! Parallel execution framework
//!
//! This module owns the resource side of a sweep: how many workers the
//! machine can afford, how a window of offsets is cut into batches, how the
//! batches are executed, and how requests are paced.
//!
//! # Architecture Responsibilities
//!
//! - **Resource Discovery**: detects available CPU cores with `num_cpus::get()`
//! - **Partitioning**: tiles a window into batches of the parallelism degree
//! - **Execution Strategy**: sequential for small windows, one scoped thread
//!   per batch otherwise
//! - **Pacing**: a single rate limiter shared by every worker
//!
//! It does not know what a case is. The dispatcher supplies the per-batch
//! closure and merges what comes back.
//!
//! ```text
//! ┌──────────────┐    ┌──────────────────┐    ┌─────────────────┐
//! │  Dispatcher  │───▶│  partition()     │───▶│  BatchExecutor  │
//! │              │    │  RateLimiter     │    │  (1 per batch)  │
//! └──────────────┘    └──────────────────┘    └─────────────────┘
//! ```
//!
//! # Example Usage
//!
//! ```rust
//! use casepoll::parallel::ExecutionStrategy;
//!
//! let workers = ExecutionStrategy::calculate_optimal_workers(0, 100);
//! let strategy = ExecutionStrategy::auto(40, 21, workers);
//! assert!(matches!(strategy, ExecutionStrategy::Parallel { .. }));
//! ```

pub mod core;
pub mod partition;
pub mod progress;
pub mod rate_limit;

// Re-export main types for easier access
pub use self::core::{ExecutionReport, ExecutionStrategy, WorkerOutput};
pub use partition::{BatchRange, Partition, RemainderPolicy, partition};
pub use progress::QueryProgress;
pub use rate_limit::{RateLimitPolicy, RateLimiter};
