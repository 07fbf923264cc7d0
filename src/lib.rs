//! # casepoll
//!
//! Polls a case status endpoint for every receipt number in a window around a
//! given case, fans the window out over parallel batches, and writes the
//! merged results to a dated report.
//!
//! ## Quick Start
//!
//! ```bash
//! # 20 cases either side of IOE0912345678, I-130 only
//! casepoll -b 20 -c IOE0912345678 -t I-130
//!
//! # Show the plan without sending requests
//! casepoll -b 20 -c IOE0912345678 --dry-run
//! ```

pub mod case;
pub mod cli;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod parallel;
pub mod report;

pub use cli::{Cli, Output};
pub use config::CasepollConfig;

/// Result type alias for casepoll operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
pub const PKG_DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
