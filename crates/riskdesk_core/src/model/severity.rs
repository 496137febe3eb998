//! Shared severity and probability scales.
//!
//! # Responsibility
//! - Define the four-level severity scale used by risks, incidents,
//!   protocols and materializations.
//! - Keep canonical display labels stable for notification rendering.
//!
//! # Invariants
//! - `label()` strings are matched exactly (case-sensitive) by the
//!   notification style mapping and must never change casing or accents.

use serde::{Deserialize, Serialize};

/// Four-level severity scale shared across the domain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
}

impl Severity {
    /// Canonical display label used in notifications and exports.
    pub fn label(self) -> &'static str {
        match self {
            Self::Critical => "Crítica",
            Self::High => "Alta",
            Self::Medium => "Media",
            Self::Low => "Baja",
        }
    }
}

/// Parses one severity from its canonical display label.
pub fn parse_severity(value: &str) -> Option<Severity> {
    match value {
        "Crítica" => Some(Severity::Critical),
        "Alta" => Some(Severity::High),
        "Media" => Some(Severity::Medium),
        "Baja" => Some(Severity::Low),
        _ => None,
    }
}

/// Likelihood scale for risk assessment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Probability {
    High,
    Medium,
    Low,
}

impl Probability {
    /// Canonical display label used in notifications and exports.
    pub fn label(self) -> &'static str {
        match self {
            Self::High => "Alta",
            Self::Medium => "Media",
            Self::Low => "Baja",
        }
    }
}

/// Parses one probability from its canonical display label.
pub fn parse_probability(value: &str) -> Option<Probability> {
    match value {
        "Alta" => Some(Probability::High),
        "Media" => Some(Probability::Medium),
        "Baja" => Some(Probability::Low),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::{parse_probability, parse_severity, Probability, Severity};

    #[test]
    fn severity_labels_roundtrip_through_parse() {
        for severity in [
            Severity::Critical,
            Severity::High,
            Severity::Medium,
            Severity::Low,
        ] {
            assert_eq!(parse_severity(severity.label()), Some(severity));
        }
    }

    #[test]
    fn parse_severity_is_case_sensitive() {
        assert_eq!(parse_severity("crítica"), None);
        assert_eq!(parse_severity("ALTA"), None);
        assert_eq!(parse_severity(""), None);
    }

    #[test]
    fn probability_labels_roundtrip_through_parse() {
        for probability in [Probability::High, Probability::Medium, Probability::Low] {
            assert_eq!(parse_probability(probability.label()), Some(probability));
        }
    }
}
