use std::time::Duration;

use chrono::{Datelike, Utc};
use opentelemetry::KeyValue;

use crate::models::{RiskLevel, Scenario, UsageRecord};
use crate::telemetry::metrics::REPORT_CASES;

/// Writes KPI entries to the operational log. Nothing is persisted; the
/// configured latency stands in for the round-trip to a KPI backend.
#[derive(Debug, Clone)]
pub struct UsageLogger {
    latency: Duration,
}

impl UsageLogger {
    pub fn new(latency: Duration) -> Self {
        Self { latency }
    }

    #[tracing::instrument(
        name = "pipeline_stage log_case",
        skip(self),
        fields(pipeline.stage = "log_case", kpi.case_id)
    )]
    pub async fn log_case(
        &self,
        scenario: Scenario,
        risk_level: RiskLevel,
        dpia_required: bool,
        section_count: usize,
        elapsed: Duration,
    ) -> UsageRecord {
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let record = UsageRecord {
            case_id: new_case_id(),
            scenario,
            timestamp: Utc::now(),
            duration_ms: elapsed.as_millis() as u64,
            section_count,
            risk_level,
        };

        tracing::Span::current().record("kpi.case_id", record.case_id.as_str());

        let payload = serde_json::to_string_pretty(&record).unwrap_or_default();
        tracing::info!(
            tool = "kpi.log_case",
            case_id = %record.case_id,
            scenario = %record.scenario,
            risk_level = %record.risk_level,
            dpia_required,
            duration_ms = record.duration_ms,
            output_sections = record.section_count,
            payload = %payload,
            "KPI case logged"
        );

        REPORT_CASES.add(
            1,
            &[
                KeyValue::new("report.scenario", scenario.as_str()),
                KeyValue::new("report.risk_level", risk_level.as_str()),
                KeyValue::new("report.dpia_required", dpia_required),
            ],
        );

        record
    }
}

/// `CASE-{year}-{nnnn}`. Collisions are possible.
pub fn new_case_id() -> String {
    format!("CASE-{}-{:04}", Utc::now().year(), fastrand::u32(0..10_000))
}
