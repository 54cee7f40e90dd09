//! Error taxonomy for the inference pipeline
//!
//! Unparsable sensor values are not errors: the normalizer substitutes a
//! default and reports the affected features (see `features::NormalizedReading`).
//! Everything here is surfaced to the caller and never retried.

use std::path::PathBuf;
use thiserror::Error;

/// Errors produced by the core library
#[derive(Error, Debug)]
pub enum RiskError {
    /// Scaler and classifier disagree with the five-feature reading layout
    #[error("configuration mismatch: {0}")]
    ConfigurationMismatch(String),

    /// The classifier could not produce a class code
    #[error("inference error: {0}")]
    Inference(String),

    /// The data source could not be reached or read
    #[error("upstream fetch error: {0}")]
    UpstreamFetch(String),

    /// A persisted scaler or model artifact is unreadable or malformed
    #[error("artifact error in {}: {message}", path.display())]
    Artifact { path: PathBuf, message: String },

    /// The fetched dataset is not valid CSV or lacks required columns
    #[error("dataset error: {0}")]
    Dataset(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl RiskError {
    /// True for failures that leave the last-known snapshot in place
    pub fn is_upstream(&self) -> bool {
        matches!(self, RiskError::UpstreamFetch(_) | RiskError::Dataset(_))
    }

    pub(crate) fn artifact(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        RiskError::Artifact {
            path: path.into(),
            message: message.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, RiskError>;
