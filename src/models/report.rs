use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Scenario;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSection {
    pub id: String,
    pub title: String,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RiskLevel {
    Red,
    Yellow,
    Green,
    Unknown,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Red => "RED",
            RiskLevel::Yellow => "YELLOW",
            RiskLevel::Green => "GREEN",
            RiskLevel::Unknown => "UNKNOWN",
        }
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// KPI entry written once per generated report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageRecord {
    pub case_id: String,
    #[serde(rename = "scenarioType")]
    pub scenario: Scenario,
    pub timestamp: DateTime<Utc>,
    pub duration_ms: u64,
    #[serde(rename = "outputSections")]
    pub section_count: usize,
    pub risk_level: RiskLevel,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeneratedReport {
    pub full_markdown: String,
    pub sections: Vec<ReportSection>,
    #[serde(rename = "kpiData", skip_serializing_if = "Option::is_none")]
    pub usage: Option<UsageRecord>,
    pub risk_level: RiskLevel,
    pub dpia_required: bool,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

impl GeneratedReport {
    pub fn section(&self, id: &str) -> Option<&ReportSection> {
        self.sections.iter().find(|s| s.id == id)
    }
}
