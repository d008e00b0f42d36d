use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Dimension {
    Quality,
    Security,
    Stack,
    Architecture,
    Documentation,
}

impl Dimension {
    pub const ALL: [Dimension; 5] = [
        Dimension::Quality,
        Dimension::Security,
        Dimension::Stack,
        Dimension::Architecture,
        Dimension::Documentation,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Dimension::Quality => "quality",
            Dimension::Security => "security",
            Dimension::Stack => "stack",
            Dimension::Architecture => "architecture",
            Dimension::Documentation => "documentation",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Dimension::Quality => "Code Quality",
            Dimension::Security => "Security",
            Dimension::Stack => "Technology Stack",
            Dimension::Architecture => "Architecture",
            Dimension::Documentation => "Documentation",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shared scale for effort, impact and priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Low,
    Medium,
    High,
}

impl Level {
    pub fn parse(raw: &str) -> Option<Level> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "low" => Some(Level::Low),
            "medium" | "med" | "moderate" => Some(Level::Medium),
            "high" | "critical" => Some(Level::High),
            _ => None,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Level::Low => "Low",
            Level::Medium => "Medium",
            Level::High => "High",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recommendation {
    pub title: String,
    pub category: String,
    pub effort: Level,
    pub impact: Level,
    pub priority: Level,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DimensionSource {
    Simulated,
    Live,
    /// Live generation failed and the simulated result was used instead.
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisDimensionResult {
    pub dimension: Dimension,
    pub score: f64,
    pub findings: Vec<String>,
    pub recommendations: Vec<Recommendation>,
    pub source: DimensionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReportSource {
    Simulated,
    LiveApi,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub strengths: Vec<String>,
    pub areas_for_improvement: Vec<String>,
    pub priority_actions: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub id: uuid::Uuid,
    pub generated_at: chrono::DateTime<chrono::Utc>,
    pub repository: String,
    pub overall_score: f64,
    pub dimensions: BTreeMap<Dimension, AnalysisDimensionResult>,
    pub source: ReportSource,
    /// Share of expected dimensions present in `dimensions` (0.0–1.0).
    pub confidence: f64,
    pub degraded_dimensions: Vec<Dimension>,
    pub summary: ReportSummary,
}

impl AnalysisReport {
    pub fn score(&self, dimension: Dimension) -> Option<f64> {
        self.dimensions.get(&dimension).map(|d| d.score)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_order_low_to_high_and_parse_loosely() {
        assert!(Level::High > Level::Medium && Level::Medium > Level::Low);
        assert_eq!(Level::parse(" High "), Some(Level::High));
        assert_eq!(Level::parse("moderate"), Some(Level::Medium));
        assert_eq!(Level::parse("urgent"), None);
    }

    #[test]
    fn dimensions_serialize_as_snake_case_map_keys() {
        let mut map = BTreeMap::new();
        map.insert(Dimension::Documentation, 1);
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"documentation":1}"#);
        assert_eq!(
            serde_json::to_string(&ReportSource::LiveApi).unwrap(),
            r#""live_api""#
        );
    }
}
