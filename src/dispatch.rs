//! Parallel dispatcher
//!
//! Builds the query plan for a window and runs it: small windows are swept by
//! one sequential loop, larger ones are cut into batches with one worker per
//! batch. Each worker keeps its records locally and returns them when its
//! batch is done; the dispatcher merges them in arrival order.

use anyhow::Result;
use std::ops::AddAssign;
use std::time::{Duration, Instant};

use crate::case::{CaseRecord, QueryWindow};
use crate::client::{CaseFetcher, QueryClient, QueryOutcome};
use crate::parallel::{
    BatchRange, ExecutionStrategy, QueryProgress, RateLimiter, RemainderPolicy, WorkerOutput,
    partition,
};

/// How the window will be swept
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryPlan {
    pub window: QueryWindow,
    pub strategy: ExecutionStrategy,
    pub batches: Vec<BatchRange>,
    /// Identifiers skipped by [`RemainderPolicy::Drop`]
    pub dropped: u64,
}

impl QueryPlan {
    /// Sequential up to the threshold, batches of `degree` beyond it
    pub fn build(
        window: QueryWindow,
        min_items_for_parallel: usize,
        degree: usize,
        remainder: RemainderPolicy,
    ) -> Self {
        let count = usize::try_from(window.len()).unwrap_or(usize::MAX);
        let strategy = ExecutionStrategy::auto(count, min_items_for_parallel, degree);

        match strategy {
            ExecutionStrategy::Sequential => Self {
                window,
                strategy,
                batches: vec![BatchRange::new(window.start, window.end)],
                dropped: 0,
            },
            ExecutionStrategy::Parallel { workers } => {
                let split = partition(window.start, window.len(), workers, remainder);
                Self {
                    window,
                    strategy,
                    batches: split.batches,
                    dropped: split.dropped,
                }
            }
        }
    }

    /// Number of queries the plan will issue
    pub fn query_count(&self) -> u64 {
        self.batches.iter().map(BatchRange::len).sum()
    }

    pub fn is_parallel(&self) -> bool {
        matches!(self.strategy, ExecutionStrategy::Parallel { .. })
    }
}

/// Per-outcome query counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueryStats {
    pub queried: usize,
    pub recorded: usize,
    pub filtered: usize,
    pub unparseable: usize,
    pub failed: usize,
}

impl AddAssign for QueryStats {
    fn add_assign(&mut self, other: Self) {
        self.queried += other.queried;
        self.recorded += other.recorded;
        self.filtered += other.filtered;
        self.unparseable += other.unparseable;
        self.failed += other.failed;
    }
}

/// What one worker hands back to the dispatcher
#[derive(Debug, Default)]
pub struct WorkerReport {
    pub records: Vec<CaseRecord>,
    pub stats: QueryStats,
}

impl WorkerReport {
    fn absorb(&mut self, outcome: QueryOutcome) {
        self.stats.queried += 1;
        match outcome {
            QueryOutcome::Record(record) => {
                self.stats.recorded += 1;
                self.records.push(record);
            }
            QueryOutcome::Filtered { .. } => self.stats.filtered += 1,
            QueryOutcome::Unparseable { .. } => self.stats.unparseable += 1,
            QueryOutcome::Failed { .. } => self.stats.failed += 1,
        }
    }
}

/// Result of a full sweep
#[derive(Debug)]
pub struct RunSummary {
    pub records: Vec<CaseRecord>,
    pub stats: QueryStats,
    pub batches: usize,
    /// Workers that panicked; their in-flight records are lost
    pub panicked: Vec<usize>,
    pub elapsed: Duration,
}

/// Runs query plans against one [`QueryClient`]
pub struct Dispatcher<F> {
    client: QueryClient<F>,
    limiter: RateLimiter,
    sort_by_case: bool,
    progress_every: usize,
    verbose: bool,
}

impl<F: CaseFetcher> Dispatcher<F> {
    pub fn new(client: QueryClient<F>, limiter: RateLimiter) -> Self {
        Self {
            client,
            limiter,
            sort_by_case: false,
            progress_every: 5,
            verbose: false,
        }
    }

    /// Sort merged records by identifier instead of arrival order
    pub fn with_sort(mut self, sort_by_case: bool) -> Self {
        self.sort_by_case = sort_by_case;
        self
    }

    /// Log a progress line every `every` queries when `verbose` is set
    pub fn with_progress(mut self, every: usize, verbose: bool) -> Self {
        self.progress_every = every;
        self.verbose = verbose;
        self
    }

    /// Execute the plan and block until every worker has finished
    pub fn run(&self, plan: &QueryPlan) -> Result<RunSummary> {
        let start_time = Instant::now();
        let total = usize::try_from(plan.query_count()).unwrap_or(usize::MAX);
        let progress = QueryProgress::new(total, self.progress_every, self.verbose);

        tracing::debug!(
            "Sweeping {} with {:?} over {} batch(es)",
            plan.window,
            plan.strategy,
            plan.batches.len()
        );

        let report = plan.strategy.execute(&plan.batches, |batch, worker_id| {
            self.run_batch(batch, worker_id, &progress)
        })?;

        let mut records = Vec::new();
        let mut stats = QueryStats::default();
        for WorkerOutput { worker_id, output } in report.outputs {
            tracing::debug!("worker-{} merged {} record(s)", worker_id, output.records.len());
            stats += output.stats;
            records.extend(output.records);
        }

        if self.sort_by_case {
            records.sort_by(|a, b| a.id.cmp(&b.id));
        }

        let no_status = stats.unparseable + stats.failed;
        if no_status > 0 {
            tracing::info!("{} of {} queries returned no valid status", no_status, stats.queried);
        }

        Ok(RunSummary {
            records,
            stats,
            batches: plan.batches.len(),
            panicked: report.panicked,
            elapsed: start_time.elapsed(),
        })
    }

    /// Worker body: sweep one batch sequentially, keeping records locally
    fn run_batch(&self, batch: &BatchRange, worker_id: usize, progress: &QueryProgress) -> WorkerReport {
        tracing::debug!("worker-{} start is {}, end is {}", worker_id, batch.start, batch.end);

        let mut local = WorkerReport::default();
        for number in batch.offsets() {
            self.limiter.acquire();
            local.absorb(self.client.query(number));
            progress.tick(worker_id);
        }

        local
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::{CaseIdentifier, CaseSeries};
    use crate::client::testing::{StubFetcher, status_html};

    fn series() -> CaseSeries {
        CaseSeries::new("IOE", 10).unwrap()
    }

    fn approved(form: &str) -> String {
        status_html(
            "Case Was Approved",
            &format!("On June 1, 2021, we approved your Form {}, visa category", form),
        )
    }

    #[test]
    fn test_plan_sequential_up_to_threshold() {
        for half_width in 1..=10 {
            let plan = QueryPlan::build(
                QueryWindow::around(1000, half_width),
                21,
                8,
                RemainderPolicy::Drop,
            );
            assert!(!plan.is_parallel());
            assert_eq!(plan.batches.len(), 1);
            assert_eq!(plan.query_count(), 2 * half_width);
        }
    }

    #[test]
    fn test_plan_forty_with_degree_eight() {
        let plan = QueryPlan::build(QueryWindow::around(1020, 20), 21, 8, RemainderPolicy::Drop);
        assert!(plan.is_parallel());
        assert_eq!(plan.batches.len(), 5);
        assert!(plan.batches.iter().all(|b| b.len() == 8));
        assert_eq!(plan.batches[0].start, 1000);
        assert_eq!(plan.dropped, 0);
    }

    #[test]
    fn test_plan_remainder_policies() {
        let window = QueryWindow::around(1011, 11); // 22 identifiers
        let dropped = QueryPlan::build(window, 21, 8, RemainderPolicy::Drop);
        assert_eq!(dropped.batches.len(), 2);
        assert_eq!(dropped.dropped, 6);
        assert_eq!(dropped.query_count(), 16);

        let kept = QueryPlan::build(window, 21, 8, RemainderPolicy::Keep);
        assert_eq!(kept.batches.len(), 3);
        assert_eq!(kept.query_count(), 22);
    }

    #[test]
    fn test_sequential_run_keeps_query_order_and_filters() {
        let fetcher = StubFetcher::default()
            .with_page(100, approved("I-130"))
            .with_page(101, approved("IR-1"))
            .with_page(102, "<html><body>down for maintenance</body></html>".to_string())
            .with_page(103, approved("IR-1"));
        let client = QueryClient::new(fetcher, series(), Some("IR-1".to_string()));
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited());

        let plan = QueryPlan::build(QueryWindow::around(102, 2), 21, 8, RemainderPolicy::Keep);
        let summary = dispatcher.run(&plan).unwrap();

        let ids: Vec<&str> = summary.records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["IOE0000000101", "IOE0000000103"]);
        assert_eq!(
            summary.stats,
            QueryStats {
                queried: 4,
                recorded: 2,
                filtered: 1,
                unparseable: 1,
                failed: 0,
            }
        );
    }

    #[test]
    fn test_filter_matching_nothing_yields_empty_set() {
        let mut fetcher = StubFetcher::default();
        for number in 0..30 {
            fetcher = fetcher.with_page(number, approved("I-130"));
        }
        let client = QueryClient::new(fetcher, series(), Some("CR-1".to_string()));
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited());

        let plan = QueryPlan::build(QueryWindow::around(15, 15), 21, 4, RemainderPolicy::Keep);
        let summary = dispatcher.run(&plan).unwrap();

        assert!(summary.records.is_empty());
        assert_eq!(summary.stats.filtered, 30);
    }

    #[test]
    fn test_parallel_run_merges_every_record_once() {
        let mut fetcher = StubFetcher::default();
        for number in 1000..1040 {
            fetcher = fetcher.with_page(number, approved("I-485"));
        }
        let client = QueryClient::new(fetcher, series(), None);
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited()).with_sort(true);

        let plan = QueryPlan::build(QueryWindow::around(1020, 20), 21, 8, RemainderPolicy::Drop);
        let summary = dispatcher.run(&plan).unwrap();

        assert_eq!(summary.batches, 5);
        assert_eq!(summary.records.len(), 40);
        assert!(summary.panicked.is_empty());

        let numbers: Vec<u64> = summary.records.iter().map(|r| r.id.number()).collect();
        assert_eq!(numbers, (1000..1040).collect::<Vec<_>>());
    }

    #[test]
    fn test_failures_are_absorbed() {
        // Only even offsets answer; odd ones fail at the transport level
        let mut fetcher = StubFetcher::default();
        for number in (0..24).step_by(2) {
            fetcher = fetcher.with_page(number, approved("I-130"));
        }
        let client = QueryClient::new(fetcher, series(), None);
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited());

        let plan = QueryPlan::build(QueryWindow::around(12, 12), 21, 6, RemainderPolicy::Keep);
        let summary = dispatcher.run(&plan).unwrap();

        assert_eq!(summary.records.len(), 12);
        assert_eq!(summary.stats.failed, 12);
        assert_eq!(summary.stats.queried, 24);
    }

    struct PanickingFetcher;

    impl CaseFetcher for PanickingFetcher {
        fn fetch(&self, id: &CaseIdentifier) -> Result<String> {
            if id.number() == 13 {
                panic!("fetcher blew up on {}", id);
            }
            Ok(approved("I-130"))
        }
    }

    #[test]
    fn test_worker_panic_does_not_cancel_siblings() {
        let client = QueryClient::new(PanickingFetcher, series(), None);
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited());

        // Batches 0..8, 8..16, 16..24; the second one panics
        let plan = QueryPlan::build(QueryWindow::around(12, 12), 21, 8, RemainderPolicy::Keep);
        let summary = dispatcher.run(&plan).unwrap();

        assert_eq!(summary.panicked, vec![1]);
        assert_eq!(summary.records.len(), 16);
        assert!(summary.records.iter().all(|r| !(8..16).contains(&r.id.number())));
    }

    #[test]
    fn test_sequential_panic_still_yields_summary() {
        let client = QueryClient::new(PanickingFetcher, series(), None);
        let dispatcher = Dispatcher::new(client, RateLimiter::unlimited());

        let plan = QueryPlan::build(QueryWindow::around(13, 2), 21, 8, RemainderPolicy::Keep);
        assert!(!plan.is_parallel());

        let summary = dispatcher.run(&plan).unwrap();
        assert_eq!(summary.panicked, vec![0]);
        assert!(summary.records.is_empty());
    }
}
