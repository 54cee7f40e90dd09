//! Where sensor CSV comes from: a local file or an HTTP(S) export URL

use crate::error::{Result, RiskError};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Timeout for HTTP fetches
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    File(PathBuf),
    Url(String),
}

impl DataSource {
    /// `http://` and `https://` values are URLs, anything else is a path
    pub fn parse(location: &str) -> DataSource {
        let trimmed = location.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            DataSource::Url(trimmed.to_string())
        } else {
            DataSource::File(PathBuf::from(trimmed))
        }
    }

    /// Fetch the CSV text; every failure is an upstream fetch error
    pub fn fetch(&self) -> Result<String> {
        self.fetch_with_timeout(DEFAULT_FETCH_TIMEOUT)
    }

    pub fn fetch_with_timeout(&self, timeout: Duration) -> Result<String> {
        match self {
            DataSource::File(path) => std::fs::read_to_string(path).map_err(|e| {
                RiskError::UpstreamFetch(format!("failed to read {}: {}", path.display(), e))
            }),
            DataSource::Url(url) => {
                tracing::debug!(url = %url, "fetching dataset");
                let response = ureq::get(url)
                    .timeout(timeout)
                    .call()
                    .map_err(|e| RiskError::UpstreamFetch(format!("GET {}: {}", url, e)))?;
                response.into_string().map_err(|e| {
                    RiskError::UpstreamFetch(format!("failed to read body from {}: {}", url, e))
                })
            }
        }
    }
}

impl fmt::Display for DataSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataSource::File(path) => write!(f, "{}", path.display()),
            DataSource::Url(url) => f.write_str(url),
        }
    }
}
