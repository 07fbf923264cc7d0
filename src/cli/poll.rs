//! The poll command: plan the sweep, run it, write the report

use anyhow::{Context, Result};
use std::time::Instant;

use super::{Cli, Output};
use crate::case::{CaseSeries, QueryWindow};
use crate::client::{HttpFetcher, QueryClient};
use crate::config::CasepollConfig;
use crate::dispatch::{Dispatcher, QueryPlan, RunSummary};
use crate::parallel::{ExecutionStrategy, RateLimiter};
use crate::report::{self, Report};

pub fn execute(cli: &Cli, output: &Output) -> Result<()> {
    let start_time = Instant::now();

    let (series, number) = CaseSeries::parse(&cli.case_num)?;
    let config = CasepollConfig::load(cli.config.as_deref(), Some(cli.config_overrides()))
        .context("Failed to load configuration")?;

    let degree = ExecutionStrategy::calculate_optimal_workers(
        config.parallel.max_threads,
        config.parallel.thread_percentage,
    );
    let plan = QueryPlan::build(
        QueryWindow::around(number, cli.batch),
        config.parallel.min_items_for_parallel,
        degree,
        config.parallel.remainder,
    );

    if cli.dry_run {
        print_plan(&series, &plan, cli, output);
        return Ok(());
    }

    output.verbose(&format!("Querying {}", config.endpoint.url));

    let fetcher = HttpFetcher::new(&config.endpoint)?;
    let client = QueryClient::new(fetcher, series, cli.type_filter());
    let dispatcher = Dispatcher::new(client, RateLimiter::from_config(&config.rate_limit))
        .with_sort(config.report.sort_by_case)
        .with_progress(config.parallel.progress_every, cli.verbose > 0);

    let summary = dispatcher.run(&plan)?;
    let report = report::write(&summary.records, &config.report)?;

    print!("{}", report.body);

    print_summary(&plan, &summary, &report, output);
    tracing::debug!("Run finished in {:.2?}", start_time.elapsed());
    Ok(())
}

fn print_plan(series: &CaseSeries, plan: &QueryPlan, cli: &Cli, output: &Output) {
    output.header("Query plan (dry run)");
    let first = series.identifier(plan.window.start);
    let last = series.identifier(plan.window.end.saturating_sub(1));
    output.key_value("Window:", &format!("{} ({} .. {})", plan.window, first, last), false);
    output.key_value("Queries:", &plan.query_count().to_string(), true);
    output.key_value("Strategy:", &strategy_label(&plan.strategy), false);
    if let Some(filter) = cli.type_filter() {
        output.key_value("Filter:", &filter, false);
    }

    if plan.is_parallel() {
        for (worker_id, batch) in plan.batches.iter().enumerate() {
            output.list_item(&format!("worker-{}: {}", worker_id, batch));
        }
    }

    if plan.dropped > 0 {
        output.warning(&format!("{} trailing identifier(s) would be skipped", plan.dropped));
    }
    output.info("Dry run: no requests sent, no report written");
}

fn print_summary(plan: &QueryPlan, summary: &RunSummary, report: &Report, output: &Output) {
    if !summary.panicked.is_empty() {
        let workers: Vec<String> = summary
            .panicked
            .iter()
            .map(|id| format!("worker-{}", id))
            .collect();
        output.error(&format!(
            "{} worker(s) panicked, their results are missing: {}",
            workers.len(),
            workers.join(", ")
        ));
    }

    if output.is_quiet() {
        return;
    }

    output.header("Summary");
    output.key_value("Window:", &plan.window.to_string(), false);
    output.key_value("Strategy:", &strategy_label(&plan.strategy), false);
    output.key_value("Batches:", &summary.batches.to_string(), false);
    output.key_value("Queried:", &summary.stats.queried.to_string(), false);
    output.key_value("Records:", &summary.stats.recorded.to_string(), true);
    output.key_value("Filtered:", &summary.stats.filtered.to_string(), false);
    output.key_value(
        "No status:",
        &(summary.stats.unparseable + summary.stats.failed).to_string(),
        false,
    );
    if plan.dropped > 0 {
        output.warning(&format!("{} trailing identifier(s) were skipped", plan.dropped));
    }
    output.step(&format!("Elapsed {:.2?}", summary.elapsed));
    output.success(&format!(
        "Wrote {} record(s) to {}",
        report.records,
        report.path.display()
    ));
}

fn strategy_label(strategy: &ExecutionStrategy) -> String {
    match strategy {
        ExecutionStrategy::Sequential => "sequential".to_string(),
        ExecutionStrategy::Parallel { workers } => format!("parallel (batches of {})", workers),
    }
}
