//! Dated status report
//!
//! Serializes the merged records as a list of single-key mappings
//! (`identifier -> {Queried, Received, Status, Type}`), writes the document to
//! `<prefix>-<YYYY-MM-DD>.<ext>` and hands the rendered text back so the
//! caller can echo it to stdout.

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::case::CaseRecord;
use crate::config::ReportConfig;

/// Serialization format of the report file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ReportFormat {
    #[default]
    Yaml,
    Json,
}

impl ReportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ReportFormat::Yaml => "yml",
            ReportFormat::Json => "json",
        }
    }

    /// Render records in this format
    pub fn render(&self, records: &[CaseRecord]) -> Result<String> {
        match self {
            ReportFormat::Yaml => {
                serde_yml::to_string(records).context("Failed to serialize report as YAML")
            }
            ReportFormat::Json => {
                let mut body = serde_json::to_string_pretty(records)
                    .context("Failed to serialize report as JSON")?;
                body.push('\n');
                Ok(body)
            }
        }
    }
}

/// A report that has been written to disk
#[derive(Debug, Clone)]
pub struct Report {
    pub path: PathBuf,
    pub body: String,
    pub records: usize,
}

/// File name for the report of `date`, e.g. `data-2021-03-04.yml`
pub fn file_name(prefix: &str, format: ReportFormat, date: NaiveDate) -> String {
    format!("{}-{}.{}", prefix, date.format("%Y-%m-%d"), format.extension())
}

/// Write today's report
pub fn write(records: &[CaseRecord], config: &ReportConfig) -> Result<Report> {
    write_dated(records, config, Local::now().date_naive())
}

/// Write the report for an explicit date, replacing any earlier one
pub fn write_dated(records: &[CaseRecord], config: &ReportConfig, date: NaiveDate) -> Result<Report> {
    let body = config.format.render(records)?;
    let path = report_path(&config.output_dir, &config.file_prefix, config.format, date);

    if !config.output_dir.as_os_str().is_empty() && !config.output_dir.exists() {
        fs::create_dir_all(&config.output_dir).with_context(|| {
            format!("Failed to create report directory {}", config.output_dir.display())
        })?;
    }

    fs::write(&path, &body)
        .with_context(|| format!("Failed to write report {}", path.display()))?;

    tracing::debug!("Wrote {} record(s) to {}", records.len(), path.display());

    Ok(Report {
        path,
        body,
        records: records.len(),
    })
}

fn report_path(dir: &Path, prefix: &str, format: ReportFormat, date: NaiveDate) -> PathBuf {
    dir.join(file_name(prefix, format, date))
}
