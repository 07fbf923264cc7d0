//! Configuration management for casepoll
//!
//! This module holds the typed configuration sections and their validation.
//! Loading and layering (embedded defaults, user and working-directory files,
//! environment, CLI overrides) lives in [`core`].

use anyhow::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use crate::parallel::partition::RemainderPolicy;
use crate::parallel::rate_limit::RateLimitPolicy;
use crate::report::ReportFormat;

pub mod core;

/// Slowest token bucket refill accepted (one request every ~17 minutes)
pub const MIN_REFILL_PER_SEC: f64 = 1e-3;

/// Main configuration structure for casepoll
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct CasepollConfig {
    /// Status endpoint and HTTP client settings
    pub endpoint: EndpointConfig,

    /// Batching and worker sizing
    pub parallel: ParallelConfig,

    /// Request pacing shared by all workers
    pub rate_limit: RateLimitConfig,

    /// Report output settings
    pub report: ReportConfig,
}

/// Status endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EndpointConfig {
    /// URL the receipt number is POSTed to
    pub url: String,

    /// Extra PEM trust bundle
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ca_bundle: Option<PathBuf>,

    /// Request timeout in seconds (0 = none)
    pub timeout_secs: u64,

    /// User-Agent header value
    pub user_agent: String,
}

/// Batching and worker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ParallelConfig {
    /// Smallest window that is split into parallel batches
    pub min_items_for_parallel: usize,

    /// Maximum number of workers per batch size (0 = no cap)
    pub max_threads: usize,

    /// Percentage of CPU cores used to size batches (1-100)
    pub thread_percentage: u8,

    /// What to do with the tail that does not fill a whole batch
    pub remainder: RemainderPolicy,

    /// Verbose progress line frequency (every N queries)
    pub progress_every: usize,
}

/// Rate limiting configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Pacing policy
    pub policy: RateLimitPolicy,

    /// Minimum spacing between two requests for the `fixed` policy
    pub min_interval_ms: u64,

    /// Bucket size for the `token_bucket` policy
    pub capacity: u32,

    /// Tokens added per second for the `token_bucket` policy
    pub refill_per_sec: f64,
}

/// Report configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportConfig {
    /// Serialization format of the report file
    pub format: ReportFormat,

    /// Directory the dated report is written to
    pub output_dir: PathBuf,

    /// File name prefix, the date and extension are appended
    pub file_prefix: String,

    /// Sort records by case identifier instead of arrival order
    pub sort_by_case: bool,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            url: "https://egov.uscis.gov/casestatus/mycasestatus.do".to_string(),
            ca_bundle: None,
            timeout_secs: 0,
            user_agent: "casepoll".to_string(),
        }
    }
}

impl Default for ParallelConfig {
    fn default() -> Self {
        Self {
            min_items_for_parallel: 21,
            max_threads: 0,
            thread_percentage: 100,
            remainder: RemainderPolicy::Keep,
            progress_every: 5,
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            policy: RateLimitPolicy::TokenBucket,
            min_interval_ms: 0,
            capacity: 20,
            refill_per_sec: 20.0,
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            format: ReportFormat::Yaml,
            output_dir: PathBuf::from("."),
            file_prefix: "data".to_string(),
            sort_by_case: false,
        }
    }
}

impl EndpointConfig {
    /// Request timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl CasepollConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        if self.endpoint.url.trim().is_empty() {
            anyhow::bail!("endpoint.url cannot be empty");
        }

        if self.parallel.thread_percentage == 0 || self.parallel.thread_percentage > 100 {
            anyhow::bail!(
                "parallel.thread_percentage must be between 1 and 100, got {}",
                self.parallel.thread_percentage
            );
        }

        if self.parallel.min_items_for_parallel == 0 {
            anyhow::bail!("parallel.min_items_for_parallel cannot be 0");
        }

        match self.rate_limit.policy {
            RateLimitPolicy::None => {}
            RateLimitPolicy::Fixed => {
                if self.rate_limit.min_interval_ms == 0 {
                    anyhow::bail!("rate_limit.min_interval_ms must be > 0 for the fixed policy");
                }
            }
            RateLimitPolicy::TokenBucket => {
                if self.rate_limit.capacity == 0 {
                    anyhow::bail!("rate_limit.capacity cannot be 0");
                }
                if !(self.rate_limit.refill_per_sec >= MIN_REFILL_PER_SEC) {
                    anyhow::bail!(
                        "rate_limit.refill_per_sec must be at least {}, got {}",
                        MIN_REFILL_PER_SEC,
                        self.rate_limit.refill_per_sec
                    );
                }
            }
        }

        if self.report.file_prefix.trim().is_empty() {
            anyhow::bail!("report.file_prefix cannot be empty");
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
