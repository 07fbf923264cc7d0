use anyhow::Result;
use crossbeam::channel::{Receiver, Sender, unbounded};
use std::panic::{AssertUnwindSafe, catch_unwind};

/// Output of one worker, tagged with the worker that produced it
#[derive(Debug)]
pub struct WorkerOutput<R> {
    pub worker_id: usize,
    pub output: R,
}

/// Everything the executors hand back after the join barrier
#[derive(Debug)]
pub struct ExecutionReport<R> {
    /// Worker outputs in arrival order
    pub outputs: Vec<WorkerOutput<R>>,
    /// Workers that panicked; their output is lost
    pub panicked: Vec<usize>,
}

impl<R> Default for ExecutionReport<R> {
    fn default() -> Self {
        Self {
            outputs: Vec::new(),
            panicked: Vec::new(),
        }
    }
}

/// Worker counts above this are logged as unusually high
pub const MANY_WORKERS: usize = 1024;

/// Runs one dedicated worker thread per batch
///
/// All workers are spawned before any is joined. Each worker hands its whole
/// output back over a channel, so the dispatcher merges without a lock. A
/// batch whose thread cannot be spawned runs on the calling thread instead.
pub struct BatchExecutor;

impl BatchExecutor {
    pub fn execute<T, R, F>(batches: &[T], processor: F) -> Result<ExecutionReport<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T, usize) -> R + Sync, // (batch, worker_id)
    {
        Self::execute_with_stack_size(batches, None, processor)
    }

    fn execute_with_stack_size<T, R, F>(
        batches: &[T],
        stack_size: Option<usize>,
        processor: F,
    ) -> Result<ExecutionReport<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T, usize) -> R + Sync,
    {
        if batches.is_empty() {
            return Ok(ExecutionReport::default());
        }

        if batches.len() > MANY_WORKERS {
            tracing::warn!(
                "Spawning {} workers, consider a larger batch size (--workers) or a smaller window",
                batches.len()
            );
        }

        let (result_tx, result_rx): (Sender<WorkerOutput<R>>, Receiver<WorkerOutput<R>>) =
            unbounded();
        let processor = &processor;

        crossbeam::thread::scope(|s| {
            let mut handles = Vec::with_capacity(batches.len());
            let mut unspawned = Vec::new();

            for (worker_id, batch) in batches.iter().enumerate() {
                let worker_tx = result_tx.clone();
                let mut builder = s.builder().name(format!("worker-{}", worker_id));
                if let Some(size) = stack_size {
                    builder = builder.stack_size(size);
                }

                let spawned = builder.spawn(move |_| {
                    let output = processor(batch, worker_id);
                    // The collector only stops once every sender is gone
                    let _ = worker_tx.send(WorkerOutput { worker_id, output });
                });

                match spawned {
                    Ok(handle) => handles.push((worker_id, handle)),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to spawn worker-{}: {}, running its batch inline",
                            worker_id,
                            e
                        );
                        unspawned.push((worker_id, batch));
                    }
                }
            }

            tracing::debug!("Spawned {} workers", handles.len());

            let mut panicked = Vec::new();
            for (worker_id, batch) in unspawned {
                match catch_unwind(AssertUnwindSafe(|| processor(batch, worker_id))) {
                    Ok(output) => {
                        let _ = result_tx.send(WorkerOutput { worker_id, output });
                    }
                    Err(_) => {
                        tracing::warn!("worker-{} panicked, its results are lost", worker_id);
                        panicked.push(worker_id);
                    }
                }
            }

            // Drop the original sender so the collector sees the end of work
            drop(result_tx);

            let outputs = Self::collect_results(result_rx, batches.len());

            for (worker_id, handle) in handles {
                if handle.join().is_err() {
                    tracing::warn!("worker-{} panicked, its results are lost", worker_id);
                    panicked.push(worker_id);
                }
            }
            panicked.sort_unstable();

            ExecutionReport { outputs, panicked }
        })
        .map_err(|_| anyhow::anyhow!("Thread panic occurred during parallel execution"))
    }

    fn collect_results<R>(
        result_rx: Receiver<WorkerOutput<R>>,
        total_workers: usize,
    ) -> Vec<WorkerOutput<R>> {
        let mut outputs = Vec::with_capacity(total_workers);

        while let Ok(output) = result_rx.recv() {
            tracing::trace!("worker-{} finished", output.worker_id);
            outputs.push(output);
        }

        outputs
    }
}

/// Sequential execution strategy for small windows
pub struct SequentialExecutor;

impl SequentialExecutor {
    /// Runs every batch on the calling thread; a panicking batch is recorded
    /// and skipped like a panicking worker
    pub fn execute<T, R, F>(batches: &[T], processor: F) -> ExecutionReport<R>
    where
        F: Fn(&T, usize) -> R,
    {
        let mut report = ExecutionReport::default();

        for batch in batches {
            // Sequential uses worker_id 0
            match catch_unwind(AssertUnwindSafe(|| processor(batch, 0))) {
                Ok(output) => report.outputs.push(WorkerOutput {
                    worker_id: 0,
                    output,
                }),
                Err(_) => {
                    tracing::warn!("worker-0 panicked, its results are lost");
                    report.panicked.push(0);
                }
            }
        }

        report
    }
}

/// Execution strategy enum for choosing between parallel and sequential
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStrategy {
    Sequential,
    Parallel { workers: usize },
}

impl ExecutionStrategy {
    pub fn execute<T, R, F>(&self, batches: &[T], processor: F) -> Result<ExecutionReport<R>>
    where
        T: Sync,
        R: Send,
        F: Fn(&T, usize) -> R + Sync,
    {
        match self {
            ExecutionStrategy::Sequential => Ok(SequentialExecutor::execute(batches, processor)),
            ExecutionStrategy::Parallel { .. } => BatchExecutor::execute(batches, processor),
        }
    }

    /// Auto strategy selection based on workload size threshold
    ///
    /// ```text
    /// if work_items_count >= min_items_for_parallel {
    ///     Parallel { workers: optimal_workers }
    /// } else {
    ///     Sequential
    /// }
    /// ```
    ///
    /// # Example
    /// ```rust
    /// use casepoll::parallel::ExecutionStrategy;
    ///
    /// // A window of 20 stays sequential with the default threshold of 21
    /// let strategy = ExecutionStrategy::auto(20, 21, 8);
    /// assert!(matches!(strategy, ExecutionStrategy::Sequential));
    ///
    /// let strategy = ExecutionStrategy::auto(21, 21, 8);
    /// assert_eq!(strategy, ExecutionStrategy::Parallel { workers: 8 });
    /// ```
    pub fn auto(
        work_items_count: usize,
        min_items_for_parallel: usize,
        optimal_workers: usize,
    ) -> Self {
        if work_items_count >= min_items_for_parallel {
            ExecutionStrategy::Parallel {
                workers: optimal_workers.max(1),
            }
        } else {
            ExecutionStrategy::Sequential
        }
    }

    /// Calculate optimal workers based on available system resources and configuration limits
    ///
    /// # Algorithm
    /// ```text
    /// 1. Detect available CPU cores: num_cpus::get()
    /// 2. Apply percentage: cores * thread_percentage / 100
    /// 3. Apply config limit: min(max_threads_config, percentage_result) if max_threads_config > 0
    /// 4. Ensure minimum: max(1, final_result)
    /// ```
    ///
    /// # Examples
    /// ```rust
    /// use casepoll::parallel::ExecutionStrategy;
    ///
    /// let workers = ExecutionStrategy::calculate_optimal_workers(0, 75);
    /// assert!(workers >= 1);
    ///
    /// let workers = ExecutionStrategy::calculate_optimal_workers(8, 75);
    /// assert!(workers <= 8);
    /// ```
    pub fn calculate_optimal_workers(max_threads_config: usize, thread_percentage: u8) -> usize {
        let available_cores = num_cpus::get();

        let workers_by_percentage =
            std::cmp::max(1, (available_cores * thread_percentage as usize) / 100);

        // 0 means use percentage calculation only
        if max_threads_config > 0 {
            std::cmp::min(max_threads_config, workers_by_percentage)
        } else {
            workers_by_percentage
        }
    }
}
