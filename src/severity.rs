use serde::Serialize;
use std::fmt;

/// Normalized severity category understood by Application Insights.
///
/// Ordered from least to most severe; the ordering matches the numeric
/// `severityLevel` values on the wire (0..=4).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum Severity {
    Verbose,
    Information,
    Warning,
    Error,
    Critical,
}

impl Severity {
    /// Map a numeric log level onto a [`Severity`].
    ///
    /// Levels follow the pino convention: 10 trace, 20 debug, 30 info,
    /// 40 warn, 50 error, 60 fatal. Bands are inclusive on their lower
    /// bound; anything below 30 (including NaN from a non-numeric
    /// `level` field) is `Verbose`.
    pub fn from_level(level: f64) -> Self {
        if level >= 60.0 {
            Severity::Critical
        } else if level >= 50.0 {
            Severity::Error
        } else if level >= 40.0 {
            Severity::Warning
        } else if level >= 30.0 {
            Severity::Information
        } else {
            Severity::Verbose
        }
    }

    /// Numeric `severityLevel` used by the ingestion envelope.
    pub fn wire_level(self) -> u8 {
        match self {
            Severity::Verbose => 0,
            Severity::Information => 1,
            Severity::Warning => 2,
            Severity::Error => 3,
            Severity::Critical => 4,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Severity::Verbose => "Verbose",
            Severity::Information => "Information",
            Severity::Warning => "Warning",
            Severity::Error => "Error",
            Severity::Critical => "Critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
