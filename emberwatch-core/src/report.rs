//! Reporting and export
//!
//! Global invariants enforced:
//! - Rows are rendered in dataset order
//! - Exported CSV keeps the original headers and cells, plus one label column

use crate::features::Feature;
use crate::label::RiskLabel;
use crate::monitor::{LatestSummary, Snapshot};
use crate::pipeline::Prediction;
use anyhow::{Context, Result};
use std::io::Write;

/// Default name of the appended label column
pub const DEFAULT_LABEL_COLUMN: &str = "Prediksi Kebakaran";

/// Render the latest reading, the risk banner and the full labeled table
pub fn render_text(snapshot: &Snapshot) -> String {
    let mut output = String::new();

    match &snapshot.latest {
        Some(latest) => {
            output.push_str(&render_latest(latest));
            output.push('\n');
        }
        None => output.push_str("No sensor data available.\n\n"),
    }

    if !snapshot.rows.is_empty() {
        output.push_str(&render_rows(snapshot));
    }

    output
}

fn render_latest(latest: &LatestSummary) -> String {
    let mut output = String::new();
    output.push_str("Latest sensor reading:\n");
    output.push_str(&render_reading(&latest.prediction));
    output.push('\n');
    output.push_str(&latest.banner);
    output.push('\n');
    output
}

/// Feature table for one prediction; defaulted values are marked with `*`
pub fn render_reading(prediction: &Prediction) -> String {
    let mut output = String::new();
    output.push_str(&format!("  {:<42} {:>10}\n", "Variable", "Value"));
    for feature in Feature::ALL {
        let marker = if prediction.defaulted.contains(&feature) {
            "*"
        } else {
            ""
        };
        output.push_str(&format!(
            "  {:<42} {:>9.1}{:<1}\n",
            feature.canonical_column(),
            prediction.reading.get(feature),
            marker
        ));
    }
    if !prediction.defaulted.is_empty() {
        output.push_str("  * missing or unparsable, substituted with 0.0\n");
    }
    output
}

fn render_rows(snapshot: &Snapshot) -> String {
    let mut output = String::new();
    output.push_str(&format!(
        "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8}  {}\n",
        "TIME", "TEMP", "RH", "RAIN", "WIND", "SOIL", "RISK"
    ));
    for row in &snapshot.rows {
        let p = &row.prediction;
        let cells: Vec<String> = Feature::ALL
            .iter()
            .map(|f| {
                let marker = if p.defaulted.contains(f) { "*" } else { "" };
                format!("{:.1}{}", p.reading.get(*f), marker)
            })
            .collect();
        output.push_str(&format!(
            "{:<20} {:>8} {:>8} {:>8} {:>8} {:>8}  {}\n",
            truncate_or_pad(row.timestamp.as_deref().unwrap_or("-"), 20),
            cells[0],
            cells[1],
            cells[2],
            cells[3],
            cells[4],
            p.label
        ));
    }
    output
}

/// Render a manual-entry prediction
pub fn render_prediction_text(prediction: &Prediction) -> String {
    let mut output = render_reading(prediction);
    output.push('\n');
    output.push_str(&format!("Predicted fire risk: {}\n", prediction.label));
    if let Some(risk) = prediction.risk() {
        output.push_str(&format!("{}\n", risk.description()));
    }
    output
}

/// The four categories with their color and meaning
pub fn risk_table() -> String {
    let mut output = String::new();
    output.push_str(&format!("{:<8} {:<10} {}\n", "COLOR", "RISK", "DESCRIPTION"));
    for label in RiskLabel::ALL {
        output.push_str(&format!(
            "{:<8} {:<10} {}\n",
            label.color(),
            label.as_str(),
            label.description()
        ));
    }
    output
}

/// Render a snapshot as JSON
pub fn render_json(snapshot: &Snapshot) -> String {
    serde_json::to_string_pretty(snapshot).unwrap_or_else(|_| "{}".to_string())
}

/// Render a single prediction as JSON
pub fn render_prediction_json(prediction: &Prediction) -> String {
    serde_json::to_string_pretty(prediction).unwrap_or_else(|_| "{}".to_string())
}

/// Write the original dataset with the label column appended
pub fn write_csv<W: Write>(snapshot: &Snapshot, label_column: &str, writer: W) -> Result<()> {
    let mut csv_writer = csv::WriterBuilder::new().flexible(true).from_writer(writer);
    let headers = snapshot.dataset.headers();

    let mut header_row: Vec<&str> = headers.iter().map(String::as_str).collect();
    header_row.push(label_column);
    csv_writer
        .write_record(&header_row)
        .context("failed to write CSV header")?;

    for (row, labeled) in snapshot.dataset.rows().zip(&snapshot.rows) {
        let mut record: Vec<&str> = (0..headers.len())
            .map(|i| row.cells().get(i).map(String::as_str).unwrap_or(""))
            .collect();
        record.push(labeled.prediction.label);
        csv_writer
            .write_record(&record)
            .context("failed to write CSV record")?;
    }

    csv_writer.flush().context("failed to flush CSV output")?;
    Ok(())
}

/// Export to an in-memory CSV string
pub fn render_csv(snapshot: &Snapshot, label_column: &str) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(snapshot, label_column, &mut buffer)?;
    String::from_utf8(buffer).context("exported CSV is not valid UTF-8")
}

/// Truncate or pad string to fixed width
fn truncate_or_pad(s: &str, width: usize) -> String {
    if s.chars().count() > width {
        let kept: String = s.chars().take(width.saturating_sub(3)).collect();
        format!("{}...", kept)
    } else {
        format!("{:<width$}", s, width = width)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classifier::Classifier;
    use crate::dataset::Dataset;
    use crate::error::RiskError;
    use crate::features::{ColumnMap, FEATURE_COUNT};
    use crate::monitor::SnapshotSettings;
    use crate::pipeline::InferencePipeline;
    use crate::scaler::ScalingParameters;

    struct Fixed(i64);

    impl Classifier for Fixed {
        fn n_features(&self) -> usize {
            FEATURE_COUNT
        }

        fn predict(&self, _features: &[f64]) -> std::result::Result<i64, RiskError> {
            Ok(self.0)
        }
    }

    fn snapshot(csv: &str) -> Snapshot {
        let pipeline =
            InferencePipeline::new(ScalingParameters::identity(), Fixed(3), ColumnMap::default())
                .unwrap();
        Snapshot::capture(
            &pipeline,
            Dataset::from_csv(csv).unwrap(),
            "test",
            &SnapshotSettings::default(),
        )
        .unwrap()
    }

    const CSV: &str = "Waktu,Suhu Udara,Kelembapan Udara,Curah Hujan/Jam,Kecepatan Angin (ms),Kelembapan Tanah\n\
        2025-01-06 10:00:00,\"38,2\",\"30,5\",0,\"6,1\",\"12,0\"\n";

    #[test]
    fn test_export_appends_label_column() {
        let out = render_csv(&snapshot(CSV), DEFAULT_LABEL_COLUMN).unwrap();
        let mut lines = out.lines();
        assert_eq!(
            lines.next(),
            Some("Waktu,Suhu Udara,Kelembapan Udara,Curah Hujan/Jam,Kecepatan Angin (ms),Kelembapan Tanah,Prediksi Kebakaran")
        );
        assert_eq!(
            lines.next(),
            Some("2025-01-06 10:00:00,\"38,2\",\"30,5\",0,\"6,1\",\"12,0\",Very High")
        );
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn test_export_pads_short_rows() {
        let snap = snapshot("Waktu,Suhu Udara,Kelembapan Udara\n2025-01-06,31\n");
        let out = render_csv(&snap, "risk").unwrap();
        assert!(out.contains("2025-01-06,31,,Very High"));
    }

    #[test]
    fn test_text_contains_banner_and_values() {
        let text = render_text(&snapshot(CSV));
        assert!(text.contains("Tavg: Temperatur rata-rata (°C)"));
        assert!(text.contains("38.2"));
        assert!(text.contains(
            "Pada hari Senin, tanggal 06 Januari 2025, lahan ini diprediksi memiliki tingkat resiko kebakaran: Very High"
        ));
    }

    #[test]
    fn test_text_marks_defaulted_values() {
        let snap = snapshot("Waktu,Suhu Udara\n2025-01-06,abc\n");
        let text = render_text(&snap);
        assert!(text.contains("0.0*"));
        assert!(text.contains("substituted with 0.0"));
    }

    #[test]
    fn test_text_without_rows() {
        let text = render_text(&snapshot("Waktu,Suhu Udara\n"));
        assert_eq!(text, "No sensor data available.\n\n");
    }

    #[test]
    fn test_json_omits_dataset() {
        let json = render_json(&snapshot(CSV));
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value.get("dataset").is_none());
        assert_eq!(value["rows"][0]["label"], "Very High");
        assert_eq!(value["latest"]["day"], "Senin");
    }

    #[test]
    fn test_risk_table_lists_all_levels() {
        let table = risk_table();
        for label in RiskLabel::ALL {
            assert!(table.contains(label.as_str()));
            assert!(table.contains(label.color()));
        }
    }

    #[test]
    fn test_truncate_or_pad() {
        assert_eq!(truncate_or_pad("abc", 5), "abc  ");
        assert_eq!(truncate_or_pad("abcdefgh", 6), "abc...");
    }
}
