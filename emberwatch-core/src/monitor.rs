//! Refresh cycles over a data source
//!
//! A cycle fetches the dataset, classifies every row and summarizes the most
//! recent one. Upstream failures keep the last-known snapshot; configuration
//! and inference failures are returned as errors.

use crate::classifier::Classifier;
use crate::dataset::{parse_timestamp, Dataset, DEFAULT_TIMESTAMP_COLUMN};
use crate::error::{Result, RiskError};
use crate::features::Feature;
use crate::locale::{format_date_line, risk_banner, Locale};
use crate::pipeline::{InferencePipeline, Prediction};
use crate::source::{DataSource, DEFAULT_FETCH_TIMEOUT};
use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Serialize;
use std::time::Duration;

/// Display settings applied when building a snapshot
#[derive(Debug, Clone, PartialEq)]
pub struct SnapshotSettings {
    pub timestamp_column: String,
    pub locale: Locale,
}

impl Default for SnapshotSettings {
    fn default() -> Self {
        SnapshotSettings {
            timestamp_column: DEFAULT_TIMESTAMP_COLUMN.to_string(),
            locale: Locale::default(),
        }
    }
}

/// One classified row
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRow {
    pub timestamp: Option<String>,
    #[serde(flatten)]
    pub prediction: Prediction,
}

/// The most recent row, ready for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LatestSummary {
    pub timestamp: Option<String>,
    pub parsed_timestamp: Option<NaiveDateTime>,
    pub day: Option<String>,
    pub date: Option<String>,
    pub banner: String,
    pub prediction: Prediction,
}

/// Result of one refresh cycle
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    pub source: String,
    pub fetched_at: DateTime<Utc>,
    pub rows: Vec<LabeledRow>,
    pub latest: Option<LatestSummary>,
    #[serde(skip)]
    pub dataset: Dataset,
}

impl Snapshot {
    /// Classify every row of `dataset` and summarize the last one
    pub fn capture<C: Classifier>(
        pipeline: &InferencePipeline<C>,
        dataset: Dataset,
        source: &str,
        settings: &SnapshotSettings,
    ) -> Result<Snapshot> {
        check_columns(pipeline, &dataset)?;

        let rows: Vec<_> = dataset.rows().collect();
        let predictions = pipeline.predict_batch(&rows)?;

        let labeled: Vec<LabeledRow> = rows
            .iter()
            .zip(predictions)
            .map(|(row, prediction)| LabeledRow {
                timestamp: row.get(&settings.timestamp_column).map(str::to_string),
                prediction,
            })
            .collect();

        let latest = labeled.last().map(|row| summarize(row, settings.locale));

        Ok(Snapshot {
            source: source.to_string(),
            fetched_at: Utc::now(),
            rows: labeled,
            latest,
            dataset,
        })
    }

    pub fn predictions(&self) -> impl Iterator<Item = &Prediction> {
        self.rows.iter().map(|r| &r.prediction)
    }
}

fn summarize(row: &LabeledRow, locale: Locale) -> LatestSummary {
    let parsed = row.timestamp.as_deref().and_then(parse_timestamp);
    let date_line = parsed.as_ref().map(|ts| format_date_line(ts, locale));
    let banner = risk_banner(
        locale,
        date_line.as_ref(),
        row.timestamp.as_deref(),
        row.prediction.label,
    );
    let (day, date) = match date_line {
        Some((day, date)) => (Some(day), Some(date)),
        None => (None, None),
    };
    LatestSummary {
        timestamp: row.timestamp.clone(),
        parsed_timestamp: parsed,
        day,
        date,
        banner,
        prediction: row.prediction.clone(),
    }
}

/// A dataset with no recognizable feature column is rejected outright
fn check_columns<C: Classifier>(pipeline: &InferencePipeline<C>, dataset: &Dataset) -> Result<()> {
    let resolved = pipeline.columns().resolve_headers(dataset.headers());
    let missing: Vec<Feature> = Feature::ALL
        .into_iter()
        .filter(|f| resolved[f.index()].is_none())
        .collect();
    if missing.len() == Feature::ALL.len() {
        return Err(RiskError::Dataset(format!(
            "no sensor columns found in headers {:?}",
            dataset.headers()
        )));
    }
    if !missing.is_empty() {
        tracing::warn!(
            missing = ?missing,
            "dataset lacks some sensor columns; defaults will be used"
        );
    }
    Ok(())
}

/// What a refresh produced
#[derive(Debug)]
pub enum RefreshOutcome<'a> {
    /// New data was fetched and classified
    Fresh(&'a Snapshot),
    /// The fetch failed; the last-known snapshot, if any, still stands
    Stale {
        error: RiskError,
        last: Option<&'a Snapshot>,
    },
}

/// Repeated refresh cycles over one source
pub struct Monitor<C: Classifier> {
    pipeline: InferencePipeline<C>,
    source: DataSource,
    settings: SnapshotSettings,
    fetch_timeout: Duration,
    last: Option<Snapshot>,
}

impl<C: Classifier> Monitor<C> {
    pub fn new(
        pipeline: InferencePipeline<C>,
        source: DataSource,
        settings: SnapshotSettings,
    ) -> Self {
        Monitor {
            pipeline,
            source,
            settings,
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            last: None,
        }
    }

    pub fn with_fetch_timeout(mut self, timeout: Duration) -> Self {
        self.fetch_timeout = timeout;
        self
    }

    pub fn last(&self) -> Option<&Snapshot> {
        self.last.as_ref()
    }

    pub fn pipeline(&self) -> &InferencePipeline<C> {
        &self.pipeline
    }

    fn fetch_dataset(&self) -> Result<Dataset> {
        let text = self.source.fetch_with_timeout(self.fetch_timeout)?;
        Dataset::from_csv(&text)
    }

    /// Run one cycle
    pub fn refresh(&mut self) -> Result<RefreshOutcome<'_>> {
        let dataset = match self.fetch_dataset() {
            Ok(dataset) => dataset,
            Err(error) if error.is_upstream() => {
                tracing::warn!(
                    source = %self.source,
                    error = %error,
                    "refresh failed, keeping last snapshot"
                );
                return Ok(RefreshOutcome::Stale {
                    error,
                    last: self.last.as_ref(),
                });
            }
            Err(error) => return Err(error),
        };

        let source = self.source.to_string();
        let snapshot = match Snapshot::capture(&self.pipeline, dataset, &source, &self.settings) {
            Ok(snapshot) => snapshot,
            Err(error) if error.is_upstream() => {
                tracing::warn!(
                    source = %self.source,
                    error = %error,
                    "unusable dataset, keeping last snapshot"
                );
                return Ok(RefreshOutcome::Stale {
                    error,
                    last: self.last.as_ref(),
                });
            }
            Err(error) => return Err(error),
        };

        tracing::debug!(
            source = %self.source,
            rows = snapshot.rows.len(),
            latest = snapshot.latest.as_ref().map(|l| l.prediction.label).unwrap_or("-"),
            "refresh complete"
        );
        Ok(RefreshOutcome::Fresh(&*self.last.insert(snapshot)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::{ColumnMap, FEATURE_COUNT};
    use crate::scaler::ScalingParameters;
    use std::fs;

    /// Low below 25 degrees, High otherwise
    struct Threshold;

    impl Classifier for Threshold {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict(&self, features: &[f64]) -> Result<i64> {
            Ok(if features[0] < 25.0 { 0 } else { 2 })
        }
    }

    fn pipeline() -> InferencePipeline<Threshold> {
        InferencePipeline::new(ScalingParameters::identity(), Threshold, ColumnMap::default())
            .unwrap()
    }

    const CSV: &str = "Waktu,Suhu Udara,Kelembapan Udara,Curah Hujan/Jam,Kecepatan Angin (ms),Kelembapan Tanah\n\
        2025-01-06 08:00:00,\"20,0\",80,0,1,60\n\
        2025-01-06 10:00:00,\"30,0\",65,10,3,50\n";

    #[test]
    fn test_capture_summarizes_last_row() {
        let dataset = Dataset::from_csv(CSV).unwrap();
        let snapshot =
            Snapshot::capture(&pipeline(), dataset, "test", &SnapshotSettings::default()).unwrap();
        assert_eq!(snapshot.rows.len(), 2);
        assert_eq!(snapshot.rows[0].prediction.label, "Low");
        let latest = snapshot.latest.unwrap();
        assert_eq!(latest.prediction.label, "High");
        assert_eq!(latest.day.as_deref(), Some("Senin"));
        assert_eq!(latest.date.as_deref(), Some("06 Januari 2025"));
        assert!(latest.banner.ends_with("tingkat resiko kebakaran: High"));
    }

    #[test]
    fn test_capture_empty_dataset() {
        let dataset = Dataset::from_csv("Waktu,Suhu Udara\n").unwrap();
        let snapshot =
            Snapshot::capture(&pipeline(), dataset, "test", &SnapshotSettings::default()).unwrap();
        assert!(snapshot.rows.is_empty());
        assert!(snapshot.latest.is_none());
    }

    #[test]
    fn test_capture_rejects_unrelated_columns() {
        let dataset = Dataset::from_csv("a,b\n1,2\n").unwrap();
        let err = Snapshot::capture(&pipeline(), dataset, "test", &SnapshotSettings::default())
            .unwrap_err();
        assert!(matches!(err, RiskError::Dataset(_)));
    }

    #[test]
    fn test_unparsable_timestamp_uses_raw_text() {
        let dataset = Dataset::from_csv("Waktu,Suhu Udara\nkemarin sore,30\n").unwrap();
        let settings = SnapshotSettings {
            locale: Locale::English,
            ..SnapshotSettings::default()
        };
        let snapshot = Snapshot::capture(&pipeline(), dataset, "test", &settings).unwrap();
        let latest = snapshot.latest.unwrap();
        assert!(latest.parsed_timestamp.is_none());
        assert_eq!(
            latest.banner,
            "At kemarin sore, this site is predicted to have fire risk level: High"
        );
    }

    #[test]
    fn test_monitor_keeps_last_snapshot_on_fetch_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.csv");
        fs::write(&path, CSV).unwrap();

        let mut monitor = Monitor::new(
            pipeline(),
            DataSource::File(path.clone()),
            SnapshotSettings::default(),
        );
        match monitor.refresh().unwrap() {
            RefreshOutcome::Fresh(snapshot) => assert_eq!(snapshot.rows.len(), 2),
            other => panic!("expected fresh snapshot, got {:?}", other),
        }

        fs::remove_file(&path).unwrap();
        match monitor.refresh().unwrap() {
            RefreshOutcome::Stale { error, last } => {
                assert!(matches!(error, RiskError::UpstreamFetch(_)));
                let last = last.expect("last snapshot should persist");
                assert_eq!(last.latest.as_ref().unwrap().prediction.label, "High");
            }
            other => panic!("expected stale outcome, got {:?}", other),
        }
        assert!(monitor.last().is_some());
    }

    #[test]
    fn test_monitor_stale_without_history() {
        let dir = tempfile::tempdir().unwrap();
        let mut monitor = Monitor::new(
            pipeline(),
            DataSource::File(dir.path().join("missing.csv")),
            SnapshotSettings::default(),
        );
        match monitor.refresh().unwrap() {
            RefreshOutcome::Stale { last, .. } => assert!(last.is_none()),
            other => panic!("expected stale outcome, got {:?}", other),
        }
    }

    #[test]
    fn test_monitor_stale_on_unreachable_url() {
        let mut monitor = Monitor::new(
            pipeline(),
            DataSource::parse("http://127.0.0.1:1/x.csv"),
            SnapshotSettings::default(),
        )
        .with_fetch_timeout(Duration::from_millis(200));
        match monitor.refresh().unwrap() {
            RefreshOutcome::Stale { error, last } => {
                assert!(matches!(error, RiskError::UpstreamFetch(_)));
                assert!(last.is_none());
            }
            other => panic!("expected stale outcome, got {:?}", other),
        }
    }
}
