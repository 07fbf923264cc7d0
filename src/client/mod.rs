//! Single-query status client
//!
//! [`QueryClient`] turns one numeric offset into one [`QueryOutcome`]: it
//! builds the receipt number, fetches the page through a [`CaseFetcher`],
//! parses it and applies the optional type filter. Nothing here is fatal;
//! every failure mode comes back as an outcome variant.

use anyhow::Result;

use crate::case::{CaseIdentifier, CaseRecord, CaseSeries, CaseType, StatusParser, Unparseable};

pub mod http;

pub use http::HttpFetcher;

/// Source of raw status pages, one request per call
pub trait CaseFetcher: Send + Sync {
    fn fetch(&self, id: &CaseIdentifier) -> Result<String>;
}

impl<T: CaseFetcher + ?Sized> CaseFetcher for &T {
    fn fetch(&self, id: &CaseIdentifier) -> Result<String> {
        (**self).fetch(id)
    }
}

/// Result of querying one case identifier
#[derive(Debug, Clone)]
pub enum QueryOutcome {
    /// Parsed and accepted by the filter
    Record(CaseRecord),
    /// Parsed but excluded by the type filter
    Filtered { id: CaseIdentifier, case_type: CaseType },
    /// Response did not have the expected shape
    Unparseable { id: CaseIdentifier, reason: Unparseable },
    /// Transport or HTTP failure
    Failed { id: CaseIdentifier, error: String },
}

impl QueryOutcome {
    pub fn into_record(self) -> Option<CaseRecord> {
        match self {
            QueryOutcome::Record(record) => Some(record),
            _ => None,
        }
    }
}

/// Issues single status queries for one case series
pub struct QueryClient<F> {
    fetcher: F,
    parser: StatusParser,
    series: CaseSeries,
    type_filter: Option<String>,
}

impl<F: CaseFetcher> QueryClient<F> {
    pub fn new(fetcher: F, series: CaseSeries, type_filter: Option<String>) -> Self {
        Self {
            fetcher,
            parser: StatusParser::new(),
            series,
            type_filter,
        }
    }

    /// Query the case at `number`
    pub fn query(&self, number: u64) -> QueryOutcome {
        let id = self.series.identifier(number);

        let body = match self.fetcher.fetch(&id) {
            Ok(body) => body,
            Err(e) => {
                tracing::info!("Invalid case status for {}: {:#}", id, e);
                return QueryOutcome::Failed {
                    id,
                    error: format!("{:#}", e),
                };
            }
        };

        let page = match self.parser.parse(&body) {
            Ok(page) => page,
            Err(reason) => {
                tracing::info!("Invalid case status for {}: {}", id, reason);
                return QueryOutcome::Unparseable { id, reason };
            }
        };

        if let Some(filter) = &self.type_filter
            && !page.case_type.matches(filter)
        {
            tracing::info!("{} skipped: type {} != {}", id, page.case_type, filter);
            return QueryOutcome::Filtered {
                id,
                case_type: page.case_type,
            };
        }

        let record = CaseRecord::new(id, page);
        tracing::info!(
            "{}: {} [{}] received {}",
            record.id,
            record.status,
            record.case_type,
            record.received.as_deref().unwrap_or("unknown")
        );
        QueryOutcome::Record(record)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Canned fetcher keyed by numeric offset; unknown offsets fail
    #[derive(Default)]
    pub struct StubFetcher {
        pages: HashMap<u64, String>,
        pub calls: Mutex<Vec<u64>>,
    }

    impl StubFetcher {
        pub fn with_page(mut self, number: u64, html: String) -> Self {
            self.pages.insert(number, html);
            self
        }
    }

    impl CaseFetcher for StubFetcher {
        fn fetch(&self, id: &CaseIdentifier) -> Result<String> {
            self.calls.lock().unwrap().push(id.number());
            self.pages
                .get(&id.number())
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("connection refused"))
        }
    }

    pub fn status_html(status: &str, details: &str) -> String {
        format!(
            "<html><body><div class=\"rows text-center\">\n<h1>{}</h1>\n<p>{}</p></div></body></html>",
            status, details
        )
    }
}
