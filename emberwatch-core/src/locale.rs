//! Day and month name lookup for the risk banner
//!
//! The tables translate English calendar names. Names that are not in a
//! table pass through unchanged.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

const DAYS_ID: &[(&str, &str)] = &[
    ("Monday", "Senin"),
    ("Tuesday", "Selasa"),
    ("Wednesday", "Rabu"),
    ("Thursday", "Kamis"),
    ("Friday", "Jumat"),
    ("Saturday", "Sabtu"),
    ("Sunday", "Minggu"),
];

const MONTHS_ID: &[(&str, &str)] = &[
    ("January", "Januari"),
    ("February", "Februari"),
    ("March", "Maret"),
    ("April", "April"),
    ("May", "Mei"),
    ("June", "Juni"),
    ("July", "Juli"),
    ("August", "Agustus"),
    ("September", "September"),
    ("October", "Oktober"),
    ("November", "November"),
    ("December", "Desember"),
];

/// Display language for dates and the banner sentence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    Indonesian,
    English,
}

impl Locale {
    pub fn as_str(&self) -> &'static str {
        match self {
            Locale::Indonesian => "id",
            Locale::English => "en",
        }
    }
}

impl FromStr for Locale {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "id" | "indonesian" => Ok(Locale::Indonesian),
            "en" | "english" => Ok(Locale::English),
            other => Err(format!("unsupported locale: {} (expected id or en)", other)),
        }
    }
}

fn lookup<'a>(table: &[(&'static str, &'static str)], name: &'a str) -> &'a str {
    table
        .iter()
        .find(|(en, _)| *en == name)
        .map(|(_, translated)| *translated)
        .unwrap_or(name)
}

/// Translate an English day name to Indonesian
pub fn translate_day(name: &str) -> &str {
    lookup(DAYS_ID, name)
}

/// Translate an English month name to Indonesian
pub fn translate_month(name: &str) -> &str {
    lookup(MONTHS_ID, name)
}

/// Localized (day name, "DD Month YYYY") pair for a timestamp
pub fn format_date_line(timestamp: &NaiveDateTime, locale: Locale) -> (String, String) {
    let day = timestamp.format("%A").to_string();
    let month = timestamp.format("%B").to_string();
    let (day, month) = match locale {
        Locale::Indonesian => (
            translate_day(&day).to_string(),
            translate_month(&month).to_string(),
        ),
        Locale::English => (day, month),
    };
    let date = format!(
        "{} {} {}",
        timestamp.format("%d"),
        month,
        timestamp.format("%Y")
    );
    (day, date)
}

/// Sentence stating the predicted risk for the most recent reading
///
/// `date_line` is the output of `format_date_line`; when it is absent the raw
/// timestamp text is used, and with neither the sentence has no time part.
pub fn risk_banner(
    locale: Locale,
    date_line: Option<&(String, String)>,
    raw_time: Option<&str>,
    label: &str,
) -> String {
    match locale {
        Locale::Indonesian => {
            let when = match (date_line, raw_time) {
                (Some((day, date)), _) => format!("Pada hari {}, tanggal {}, lahan", day, date),
                (None, Some(raw)) => format!("Pada waktu {}, lahan", raw),
                (None, None) => "Lahan".to_string(),
            };
            format!(
                "{} ini diprediksi memiliki tingkat resiko kebakaran: {}",
                when, label
            )
        }
        Locale::English => {
            let when = match (date_line, raw_time) {
                (Some((day, date)), _) => format!("On {}, {}, this site", day, date),
                (None, Some(raw)) => format!("At {}, this site", raw),
                (None, None) => "This site".to_string(),
            };
            format!("{} is predicted to have fire risk level: {}", when, label)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_translate_known_names() {
        assert_eq!(translate_day("Monday"), "Senin");
        assert_eq!(translate_day("Sunday"), "Minggu");
        assert_eq!(translate_month("May"), "Mei");
        assert_eq!(translate_month("December"), "Desember");
    }

    #[test]
    fn test_unknown_names_pass_through() {
        assert_eq!(translate_day("Funday"), "Funday");
        assert_eq!(translate_month(""), "");
        assert_eq!(translate_month("monday"), "monday");
    }

    #[test]
    fn test_format_date_line_indonesian() {
        let ts = NaiveDate::from_ymd_opt(2025, 1, 6)
            .unwrap()
            .and_hms_opt(10, 0, 0)
            .unwrap();
        let (day, date) = format_date_line(&ts, Locale::Indonesian);
        assert_eq!(day, "Senin");
        assert_eq!(date, "06 Januari 2025");
    }

    #[test]
    fn test_format_date_line_english() {
        let ts = NaiveDate::from_ymd_opt(2025, 8, 17)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap();
        let (day, date) = format_date_line(&ts, Locale::English);
        assert_eq!(day, "Sunday");
        assert_eq!(date, "17 August 2025");
    }

    #[test]
    fn test_risk_banner() {
        let line = ("Senin".to_string(), "06 Januari 2025".to_string());
        assert_eq!(
            risk_banner(Locale::Indonesian, Some(&line), Some("2025-01-06 10:00:00"), "High"),
            "Pada hari Senin, tanggal 06 Januari 2025, lahan ini diprediksi memiliki tingkat resiko kebakaran: High"
        );
        assert_eq!(
            risk_banner(Locale::English, None, Some("shortly"), "Low"),
            "At shortly, this site is predicted to have fire risk level: Low"
        );
        assert_eq!(
            risk_banner(Locale::Indonesian, None, None, "Very High"),
            "Lahan ini diprediksi memiliki tingkat resiko kebakaran: Very High"
        );
    }

    #[test]
    fn test_parse_locale() {
        assert_eq!("id".parse::<Locale>(), Ok(Locale::Indonesian));
        assert_eq!("English".parse::<Locale>(), Ok(Locale::English));
        assert!("fr".parse::<Locale>().is_err());
    }
}
