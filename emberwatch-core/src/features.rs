//! Feature normalization: raw rows to typed sensor readings
//!
//! Global invariants enforced:
//! - Feature order is fixed by `Feature::ALL` and matches the order the
//!   scaler and classifier were fit on
//! - Normalization never fails; missing or unparsable values become
//!   `DEFAULT_VALUE` and are reported in `NormalizedReading::defaulted`

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Number of model inputs
pub const FEATURE_COUNT: usize = 5;

/// Value substituted for missing or unparsable readings
pub const DEFAULT_VALUE: f64 = 0.0;

/// One model input, in model order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Feature {
    Temperature,
    Humidity,
    Rainfall,
    WindSpeed,
    SoilMoisture,
}

impl Feature {
    pub const ALL: [Feature; FEATURE_COUNT] = [
        Feature::Temperature,
        Feature::Humidity,
        Feature::Rainfall,
        Feature::WindSpeed,
        Feature::SoilMoisture,
    ];

    pub fn index(&self) -> usize {
        match self {
            Feature::Temperature => 0,
            Feature::Humidity => 1,
            Feature::Rainfall => 2,
            Feature::WindSpeed => 3,
            Feature::SoilMoisture => 4,
        }
    }

    /// Short key used in config files and JSON output
    pub fn key(&self) -> &'static str {
        match self {
            Feature::Temperature => "temperature",
            Feature::Humidity => "humidity",
            Feature::Rainfall => "rainfall",
            Feature::WindSpeed => "wind_speed",
            Feature::SoilMoisture => "soil_moisture",
        }
    }

    /// Column name the model was trained with
    pub fn canonical_column(&self) -> &'static str {
        match self {
            Feature::Temperature => "Tavg: Temperatur rata-rata (°C)",
            Feature::Humidity => "RH_avg: Kelembapan rata-rata (%)",
            Feature::Rainfall => "RR: Curah hujan (mm)",
            Feature::WindSpeed => "ff_avg: Kecepatan angin rata-rata (m/s)",
            Feature::SoilMoisture => "Kelembaban Permukaan Tanah",
        }
    }

    /// Column name written by the sensor station's spreadsheet
    pub fn sheet_column(&self) -> &'static str {
        match self {
            Feature::Temperature => "Suhu Udara",
            Feature::Humidity => "Kelembapan Udara",
            Feature::Rainfall => "Curah Hujan/Jam",
            Feature::WindSpeed => "Kecepatan Angin (ms)",
            Feature::SoilMoisture => "Kelembapan Tanah",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            Feature::Temperature => "°C",
            Feature::Humidity => "%",
            Feature::Rainfall => "mm",
            Feature::WindSpeed => "m/s",
            Feature::SoilMoisture => "%",
        }
    }

    pub fn from_key(key: &str) -> Option<Feature> {
        Feature::ALL.into_iter().find(|f| f.key() == key)
    }
}

/// The five sensor values, always in model order
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SensorReading {
    pub temperature: f64,
    pub humidity: f64,
    pub rainfall: f64,
    pub wind_speed: f64,
    pub soil_moisture: f64,
}

impl SensorReading {
    pub fn from_vector(values: [f64; FEATURE_COUNT]) -> Self {
        SensorReading {
            temperature: values[0],
            humidity: values[1],
            rainfall: values[2],
            wind_speed: values[3],
            soil_moisture: values[4],
        }
    }

    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.temperature,
            self.humidity,
            self.rainfall,
            self.wind_speed,
            self.soil_moisture,
        ]
    }

    pub fn get(&self, feature: Feature) -> f64 {
        self.to_vector()[feature.index()]
    }
}

/// A reading plus the features that fell back to `DEFAULT_VALUE`
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedReading {
    pub reading: SensorReading,
    pub defaulted: Vec<Feature>,
}

impl NormalizedReading {
    pub fn is_complete(&self) -> bool {
        self.defaulted.is_empty()
    }
}

/// Read access to a raw row by column name
pub trait FieldSource {
    fn field(&self, name: &str) -> Option<&str>;
}

impl FieldSource for HashMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldSource for BTreeMap<String, String> {
    fn field(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

impl FieldSource for [(&str, &str)] {
    fn field(&self, name: &str) -> Option<&str> {
        self.iter().find(|(k, _)| *k == name).map(|(_, v)| *v)
    }
}

impl<const N: usize> FieldSource for [(&str, &str); N] {
    fn field(&self, name: &str) -> Option<&str> {
        self.as_slice().field(name)
    }
}

impl<T: FieldSource + ?Sized> FieldSource for &T {
    fn field(&self, name: &str) -> Option<&str> {
        (**self).field(name)
    }
}

/// Accepted column names per feature; the first one present in a row wins
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnMap {
    aliases: [Vec<String>; FEATURE_COUNT],
}

impl Default for ColumnMap {
    fn default() -> Self {
        let aliases = Feature::ALL.map(|f| {
            vec![
                f.sheet_column().to_string(),
                f.canonical_column().to_string(),
                f.key().to_string(),
            ]
        });
        ColumnMap { aliases }
    }
}

impl ColumnMap {
    /// Replace the aliases for one feature
    pub fn with_aliases(mut self, feature: Feature, aliases: Vec<String>) -> Self {
        self.aliases[feature.index()] = aliases;
        self
    }

    pub fn aliases(&self, feature: Feature) -> &[String] {
        &self.aliases[feature.index()]
    }

    /// Resolve the raw text for a feature in `row`
    pub fn lookup<'r, R: FieldSource + ?Sized>(
        &self,
        row: &'r R,
        feature: Feature,
    ) -> Option<&'r str> {
        self.aliases(feature).iter().find_map(|name| row.field(name))
    }

    /// First alias of each feature that appears in `headers`, if any
    pub fn resolve_headers(&self, headers: &[String]) -> [Option<String>; FEATURE_COUNT] {
        Feature::ALL.map(|f| {
            self.aliases(f)
                .iter()
                .find(|alias| headers.iter().any(|h| h == *alias))
                .cloned()
        })
    }
}

/// Parse a sensor value that may use a comma as decimal separator
///
/// Returns `None` for missing, unparsable, NaN or infinite values.
pub fn parse_decimal(raw: &str) -> Option<f64> {
    let cleaned = raw.trim().replace(',', ".");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Build a typed reading from a raw row
pub fn normalize<R: FieldSource + ?Sized>(row: &R, columns: &ColumnMap) -> NormalizedReading {
    let mut values = [DEFAULT_VALUE; FEATURE_COUNT];
    let mut defaulted = Vec::new();

    for feature in Feature::ALL {
        match columns.lookup(row, feature).and_then(parse_decimal) {
            Some(v) => values[feature.index()] = v,
            None => defaulted.push(feature),
        }
    }

    NormalizedReading {
        reading: SensorReading::from_vector(values),
        defaulted,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_comma_and_dot_decimals_agree() {
        assert_eq!(parse_decimal("12,5"), Some(12.5));
        assert_eq!(parse_decimal("12.5"), Some(12.5));
        assert_eq!(parse_decimal(" 7 "), Some(7.0));
        assert_eq!(parse_decimal("-3,25"), Some(-3.25));
    }

    #[test]
    fn test_malformed_values_are_rejected() {
        for raw in ["abc", "", "   ", "12,5,6", "1.2.3", "NaN", "inf", "--1"] {
            assert_eq!(parse_decimal(raw), None, "{:?} should not parse", raw);
        }
    }

    #[test]
    fn test_normalize_sheet_columns() {
        let r = row(&[
            ("Suhu Udara", "30,0"),
            ("Kelembapan Udara", "65,0"),
            ("Curah Hujan/Jam", "10,0"),
            ("Kecepatan Angin (ms)", "3,0"),
            ("Kelembapan Tanah", "50,0"),
        ]);
        let normalized = normalize(&r, &ColumnMap::default());
        assert!(normalized.is_complete());
        assert_eq!(
            normalized.reading.to_vector(),
            [30.0, 65.0, 10.0, 3.0, 50.0]
        );
    }

    #[test]
    fn test_unparsable_fields_default_to_zero() {
        let r = row(&[
            ("temperature", "abc"),
            ("humidity", ""),
            ("rainfall", "12,5,6"),
            ("wind_speed", "2,5"),
        ]);
        let normalized = normalize(&r, &ColumnMap::default());
        assert_eq!(normalized.reading.to_vector(), [0.0, 0.0, 0.0, 2.5, 0.0]);
        assert_eq!(
            normalized.defaulted,
            vec![
                Feature::Temperature,
                Feature::Humidity,
                Feature::Rainfall,
                Feature::SoilMoisture
            ]
        );
    }

    #[test]
    fn test_first_present_alias_wins() {
        let r = row(&[("Suhu Udara", "31"), ("temperature", "99")]);
        let normalized = normalize(&r, &ColumnMap::default());
        assert_eq!(normalized.reading.temperature, 31.0);
    }

    #[test]
    fn test_custom_aliases() {
        let columns =
            ColumnMap::default().with_aliases(Feature::Rainfall, vec!["rain".to_string()]);
        let r = [("rain", "4,2"), ("Curah Hujan/Jam", "9")];
        let normalized = normalize(&r, &columns);
        assert_eq!(normalized.reading.rainfall, 4.2);
    }

    #[test]
    fn test_resolve_headers() {
        let headers = vec!["Waktu".to_string(), "Suhu Udara".to_string(), "humidity".to_string()];
        let resolved = ColumnMap::default().resolve_headers(&headers);
        assert_eq!(resolved[0].as_deref(), Some("Suhu Udara"));
        assert_eq!(resolved[1].as_deref(), Some("humidity"));
        assert!(resolved[2].is_none());
    }

    #[test]
    fn test_feature_order_is_fixed() {
        for (i, f) in Feature::ALL.iter().enumerate() {
            assert_eq!(f.index(), i);
            assert_eq!(Feature::from_key(f.key()), Some(*f));
        }
        let reading = SensorReading::from_vector([1.0, 2.0, 3.0, 4.0, 5.0]);
        assert_eq!(reading.get(Feature::WindSpeed), 4.0);
    }
}
