//! Pre-fit linear scaling of sensor readings
//!
//! Artifact format (JSON):
//!
//! ```json
//! { "mean": [25.0, 60.0, 5.0, 2.0, 40.0], "scale": [5.0, 10.0, 2.0, 1.0, 10.0] }
//! ```
//!
//! An optional `feature_names` array records the column order the scaler
//! was fit on. It is informational only.

use crate::error::{Result, RiskError};
use crate::features::{SensorReading, FEATURE_COUNT};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Per-feature (mean, scale) pairs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ScalingParameters {
    pub mean: Vec<f64>,
    pub scale: Vec<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feature_names: Option<Vec<String>>,
}

impl ScalingParameters {
    pub fn new(mean: Vec<f64>, scale: Vec<f64>) -> Self {
        ScalingParameters {
            mean,
            scale,
            feature_names: None,
        }
    }

    /// Identity transform for `FEATURE_COUNT` features
    pub fn identity() -> Self {
        ScalingParameters::new(vec![0.0; FEATURE_COUNT], vec![1.0; FEATURE_COUNT])
    }

    /// Load and validate a scaler artifact
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| RiskError::artifact(path, format!("failed to read: {}", e)))?;
        let params: ScalingParameters = serde_json::from_str(&content)
            .map_err(|e| RiskError::artifact(path, format!("failed to parse: {}", e)))?;
        params
            .check()
            .map_err(|message| RiskError::artifact(path, message))?;
        tracing::debug!(path = %path.display(), features = params.len(), "loaded scaler");
        Ok(params)
    }

    /// Number of features the scaler was fit on
    pub fn len(&self) -> usize {
        self.mean.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mean.is_empty()
    }

    /// Structural checks independent of the reading layout
    fn check(&self) -> std::result::Result<(), String> {
        if self.mean.len() != self.scale.len() {
            return Err(format!(
                "mean has {} entries but scale has {}",
                self.mean.len(),
                self.scale.len()
            ));
        }
        if let Some(names) = &self.feature_names {
            if names.len() != self.mean.len() {
                return Err(format!(
                    "feature_names has {} entries but mean has {}",
                    names.len(),
                    self.mean.len()
                ));
            }
        }
        for (i, (m, s)) in self.mean.iter().zip(&self.scale).enumerate() {
            if !m.is_finite() {
                return Err(format!("mean[{}] is not finite", i));
            }
            if !s.is_finite() || *s == 0.0 {
                return Err(format!("scale[{}] must be finite and non-zero (got {})", i, s));
            }
        }
        Ok(())
    }

    fn ensure_dimensions(&self) -> Result<()> {
        if self.mean.len() != FEATURE_COUNT || self.scale.len() != FEATURE_COUNT {
            return Err(RiskError::ConfigurationMismatch(format!(
                "scaler expects {} mean / {} scale values, readings have {} features",
                self.mean.len(),
                self.scale.len(),
                FEATURE_COUNT
            )));
        }
        Ok(())
    }

    /// Validate against the reading layout
    pub fn validate(&self) -> Result<()> {
        self.ensure_dimensions()?;
        self.check().map_err(RiskError::ConfigurationMismatch)
    }

    /// scaled[i] = (raw[i] - mean[i]) / scale[i]
    pub fn transform(&self, reading: &SensorReading) -> Result<[f64; FEATURE_COUNT]> {
        self.ensure_dimensions()?;
        let raw = reading.to_vector();
        Ok(std::array::from_fn(|i| (raw[i] - self.mean[i]) / self.scale[i]))
    }

    /// raw[i] = scaled[i] * scale[i] + mean[i]
    pub fn inverse_transform(&self, scaled: &[f64; FEATURE_COUNT]) -> Result<SensorReading> {
        self.ensure_dimensions()?;
        let raw = std::array::from_fn(|i| scaled[i] * self.scale[i] + self.mean[i]);
        Ok(SensorReading::from_vector(raw))
    }
}
