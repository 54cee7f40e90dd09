//! Inference pipeline: normalize, scale, classify, label
//!
//! Global invariants enforced:
//! - Scaler and classifier are injected at construction and never mutated
//! - One prediction per input row, in input order
//! - Batch and single-row inference agree for identical feature values

use crate::classifier::Classifier;
use crate::error::{Result, RiskError};
use crate::features::{normalize, ColumnMap, Feature, FieldSource, SensorReading, FEATURE_COUNT};
use crate::label::{label_name, RiskLabel};
use crate::scaler::ScalingParameters;
use rayon::prelude::*;
use serde::Serialize;

/// Outcome of classifying one row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Prediction {
    /// Raw class code returned by the classifier
    pub code: i64,
    /// Display name, "Unknown" for unrecognized codes
    pub label: &'static str,
    pub reading: SensorReading,
    /// Features whose raw value was missing or unparsable
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub defaulted: Vec<Feature>,
}

impl Prediction {
    pub fn risk(&self) -> Option<RiskLabel> {
        RiskLabel::from_code(self.code)
    }
}

/// Stateless pipeline over load-once artifacts
pub struct InferencePipeline<C: Classifier> {
    scaler: ScalingParameters,
    classifier: C,
    columns: ColumnMap,
}

impl<C: Classifier> std::fmt::Debug for InferencePipeline<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InferencePipeline")
            .field("scaler", &self.scaler)
            .field("n_features", &self.classifier.n_features())
            .field("columns", &self.columns)
            .finish()
    }
}

impl<C: Classifier> InferencePipeline<C> {
    /// Build a pipeline, checking both artifacts against the reading layout
    pub fn new(scaler: ScalingParameters, classifier: C, columns: ColumnMap) -> Result<Self> {
        scaler.validate()?;
        if classifier.n_features() != FEATURE_COUNT {
            return Err(RiskError::ConfigurationMismatch(format!(
                "classifier expects {} features, readings have {}",
                classifier.n_features(),
                FEATURE_COUNT
            )));
        }
        Ok(InferencePipeline {
            scaler,
            classifier,
            columns,
        })
    }

    pub fn scaler(&self) -> &ScalingParameters {
        &self.scaler
    }

    pub fn classifier(&self) -> &C {
        &self.classifier
    }

    pub fn columns(&self) -> &ColumnMap {
        &self.columns
    }

    fn classify(&self, reading: SensorReading, defaulted: Vec<Feature>) -> Result<Prediction> {
        let scaled = self.scaler.transform(&reading)?;
        let code = self.classifier.predict(&scaled)?;
        Ok(Prediction {
            code,
            label: label_name(code),
            reading,
            defaulted,
        })
    }

    /// Classify an already typed reading (manual entry)
    pub fn predict_reading(&self, reading: &SensorReading) -> Result<Prediction> {
        self.classify(*reading, Vec::new())
    }

    /// Classify one raw row
    pub fn predict_single<R: FieldSource + ?Sized>(&self, row: &R) -> Result<Prediction> {
        let normalized = normalize(row, &self.columns);
        if !normalized.is_complete() {
            tracing::warn!(
                defaulted = ?normalized.defaulted,
                "substituted default values for missing or unparsable fields"
            );
        }
        self.classify(normalized.reading, normalized.defaulted)
    }

    /// Classify many raw rows, preserving input order
    pub fn predict_batch<R: FieldSource + Sync>(&self, rows: &[R]) -> Result<Vec<Prediction>> {
        let predictions = rows
            .par_iter()
            .map(|row| self.predict_single(row))
            .collect::<Result<Vec<_>>>()?;
        tracing::debug!(rows = predictions.len(), "classified batch");
        Ok(predictions)
    }
}
