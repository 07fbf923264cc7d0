//! Command-line interface for casepoll
//!
//! One command: sweep the window around a case number and report what the
//! status endpoint says about each identifier.

use anyhow::Result;
use clap::Parser;
use serde_json::{Map, Value, json};
use std::path::PathBuf;

mod output;
mod poll;

pub use output::Output;

use crate::report::ReportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "casepoll",
    version = env!("CARGO_PKG_VERSION"),
    about = "Poll case statuses around a receipt number",
    long_about = "casepoll queries the case status endpoint for every receipt number in a \
                  window around the one given, in parallel batches, and writes a dated report."
)]
pub struct Cli {
    /// Half-width of the window around the case number
    #[arg(short, long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch: u64,

    /// Case number: 3-character prefix followed by digits (e.g. IOE0912345678)
    #[arg(short = 'c', long = "case-num", value_name = "CASE")]
    pub case_num: String,

    /// Only report cases of this exact type (e.g. I-130, IR-1)
    #[arg(short = 't', long = "case-type-filter", value_name = "TYPE")]
    pub case_type_filter: Option<String>,

    /// Increase verbosity (can be repeated)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Suppress everything but the report
    #[arg(short, long)]
    pub quiet: bool,

    /// Print the query plan without sending any request
    #[arg(long)]
    pub dry_run: bool,

    /// Use custom configuration file
    #[arg(long, value_name = "FILE")]
    pub config: Option<String>,

    /// Cap the parallelism degree
    #[arg(long, value_name = "N", value_parser = clap::value_parser!(u64).range(1..))]
    pub workers: Option<u64>,

    /// Report file format
    #[arg(long, value_enum)]
    pub format: Option<ReportFormat>,

    /// Directory the report is written to
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Sort the report by case number instead of arrival order
    #[arg(long)]
    pub sort: bool,

    /// Skip the identifiers that do not fill a whole batch
    #[arg(long)]
    pub drop_remainder: bool,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        setup_logging(self.verbose, self.quiet);

        let output = Output::new(self.verbose > 0, self.quiet);
        poll::execute(&self, &output)
    }

    /// Config layer built from the flags that were actually given
    pub fn config_overrides(&self) -> Value {
        let mut parallel = Map::new();
        if let Some(workers) = self.workers {
            parallel.insert("max_threads".into(), json!(workers));
        }
        if self.drop_remainder {
            parallel.insert("remainder".into(), json!("drop"));
        }

        let mut report = Map::new();
        if let Some(format) = self.format {
            report.insert("format".into(), json!(format));
        }
        if let Some(dir) = &self.output_dir {
            report.insert("output_dir".into(), json!(dir));
        }
        if self.sort {
            report.insert("sort_by_case".into(), json!(true));
        }

        let mut overrides = Map::new();
        if !parallel.is_empty() {
            overrides.insert("parallel".into(), Value::Object(parallel));
        }
        if !report.is_empty() {
            overrides.insert("report".into(), Value::Object(report));
        }
        Value::Object(overrides)
    }

    /// Type filter, with an empty value meaning no filter
    pub fn type_filter(&self) -> Option<String> {
        self.case_type_filter
            .as_deref()
            .map(str::trim)
            .filter(|filter| !filter.is_empty())
            .map(str::to_string)
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug,hyper=info,rustls=info"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    // stdout carries the report
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
