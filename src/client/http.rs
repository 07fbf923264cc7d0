use anyhow::{Context, Result};
use reqwest::blocking::Client;
use reqwest::Certificate;

use super::CaseFetcher;
use crate::case::CaseIdentifier;
use crate::config::EndpointConfig;

/// Form field the status endpoint reads the receipt number from
pub const RECEIPT_FIELD: &str = "appReceiptNum";

/// Blocking HTTP fetcher for the status endpoint
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
    url: String,
}

impl HttpFetcher {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let mut builder = Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout());

        if let Some(bundle) = &config.ca_bundle {
            let pem = std::fs::read(bundle)
                .with_context(|| format!("Failed to read CA bundle: {}", bundle.display()))?;
            let certificates = Certificate::from_pem_bundle(&pem)
                .with_context(|| format!("Failed to parse CA bundle: {}", bundle.display()))?;

            tracing::debug!(
                "Trusting {} extra certificate(s) from {}",
                certificates.len(),
                bundle.display()
            );
            for certificate in certificates {
                builder = builder.add_root_certificate(certificate);
            }
        }

        let client = builder.build().context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            url: config.url.clone(),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl CaseFetcher for HttpFetcher {
    fn fetch(&self, id: &CaseIdentifier) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .form(&[(RECEIPT_FIELD, id.as_str())])
            .send()
            .with_context(|| format!("Request for {} failed", id))?;

        let response = response
            .error_for_status()
            .with_context(|| format!("Status endpoint rejected {}", id))?;

        response
            .text()
            .with_context(|| format!("Failed to read response body for {}", id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builds_with_defaults() {
        let fetcher = HttpFetcher::new(&EndpointConfig::default()).unwrap();
        assert_eq!(fetcher.url(), EndpointConfig::default().url);
    }

    #[test]
    fn test_missing_ca_bundle_is_an_error() {
        let config = EndpointConfig {
            ca_bundle: Some("/nonexistent/ca-bundle.pem".into()),
            ..EndpointConfig::default()
        };
        let err = HttpFetcher::new(&config).unwrap_err();
        assert!(err.to_string().contains("Failed to read CA bundle"));
    }
}
