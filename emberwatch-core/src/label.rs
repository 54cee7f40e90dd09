//! Risk label codec
//!
//! Global invariants enforced:
//! - Class codes are fixed by the classifier's encoding and never renumbered
//! - Label order is increasing severity

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Name returned for class codes outside the four known categories
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Wildfire-risk category
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RiskLabel {
    Low,      // 0
    Moderate, // 1
    High,     // 2
    #[serde(rename = "Very High")]
    VeryHigh, // 3
}

impl RiskLabel {
    /// All labels in severity order
    pub const ALL: [RiskLabel; 4] = [
        RiskLabel::Low,
        RiskLabel::Moderate,
        RiskLabel::High,
        RiskLabel::VeryHigh,
    ];

    pub fn from_code(code: i64) -> Option<RiskLabel> {
        match code {
            0 => Some(RiskLabel::Low),
            1 => Some(RiskLabel::Moderate),
            2 => Some(RiskLabel::High),
            3 => Some(RiskLabel::VeryHigh),
            _ => None,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            RiskLabel::Low => 0,
            RiskLabel::Moderate => 1,
            RiskLabel::High => 2,
            RiskLabel::VeryHigh => 3,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low",
            RiskLabel::Moderate => "Moderate",
            RiskLabel::High => "High",
            RiskLabel::VeryHigh => "Very High",
        }
    }

    /// Color used for this level in the risk table and banner
    pub fn color(&self) -> &'static str {
        match self {
            RiskLabel::Low => "blue",
            RiskLabel::Moderate => "green",
            RiskLabel::High => "yellow",
            RiskLabel::VeryHigh => "red",
        }
    }

    /// How hard a fire is to control at this level
    pub fn description(&self) -> &'static str {
        match self {
            RiskLabel::Low => "Low fire risk. Fire is easy to control.",
            RiskLabel::Moderate => "Moderate fire risk. Fire is relatively easy to control.",
            RiskLabel::High => "High fire risk. Fire is difficult to control.",
            RiskLabel::VeryHigh => "Very high fire risk. Fire is very difficult to control.",
        }
    }
}

impl fmt::Display for RiskLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLabel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_ascii_lowercase().replace(['_', '-'], " ");
        match normalized.as_str() {
            "low" => Ok(RiskLabel::Low),
            "moderate" => Ok(RiskLabel::Moderate),
            "high" => Ok(RiskLabel::High),
            "very high" | "veryhigh" => Ok(RiskLabel::VeryHigh),
            _ => Err(format!("unknown risk label: {}", s)),
        }
    }
}

/// Map a raw class code to its display name, falling back to "Unknown"
pub fn label_name(code: i64) -> &'static str {
    RiskLabel::from_code(code)
        .map(|label| label.as_str())
        .unwrap_or(UNKNOWN_LABEL)
}
