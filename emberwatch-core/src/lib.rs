//! Emberwatch core library - wildfire-risk classification of IoT sensor readings

#![deny(warnings)]

// Global invariants enforced in this crate:
// - Artifacts are loaded once and never mutated afterwards
// - Every reading passes through the same normalize, scale, classify path
// - Missing or unparsable values become 0.0 and are reported, never dropped
// - One prediction per dataset row, in dataset order
// - Upstream failures never discard the last-known snapshot

pub mod classifier;
pub mod config;
pub mod dataset;
pub mod error;
pub mod features;
pub mod label;
pub mod locale;
pub mod monitor;
pub mod pipeline;
pub mod report;
pub mod scaler;
pub mod source;

pub use classifier::{Classifier, ModelArtifact};
pub use config::ResolvedConfig;
pub use dataset::Dataset;
pub use error::RiskError;
pub use features::{ColumnMap, Feature, SensorReading};
pub use label::RiskLabel;
pub use monitor::{Monitor, RefreshOutcome, Snapshot};
pub use pipeline::{InferencePipeline, Prediction};
pub use report::{render_json, render_text};
pub use scaler::ScalingParameters;
pub use source::DataSource;

use anyhow::Context;

/// Load both artifacts named by the configuration and build a pipeline
pub fn load_pipeline(config: &ResolvedConfig) -> anyhow::Result<InferencePipeline<ModelArtifact>> {
    let scaler = ScalingParameters::load(&config.scaler_path)?;
    let model = ModelArtifact::load(&config.model_path)?;
    let pipeline = InferencePipeline::new(scaler, model, config.columns.clone())
        .context("scaler and classifier do not fit the sensor reading layout")?;
    tracing::info!(
        model = %config.model_path.display(),
        scaler = %config.scaler_path.display(),
        "artifacts loaded"
    );
    Ok(pipeline)
}

/// Fetch a dataset once and classify every row
pub fn classify_source(
    pipeline: &InferencePipeline<ModelArtifact>,
    source: &DataSource,
    config: &ResolvedConfig,
) -> anyhow::Result<Snapshot> {
    let text = source.fetch_with_timeout(config.fetch_timeout)?;
    let dataset = Dataset::from_csv(&text)?;
    let snapshot = Snapshot::capture(
        pipeline,
        dataset,
        &source.to_string(),
        &config.snapshot_settings(),
    )?;
    Ok(snapshot)
}
