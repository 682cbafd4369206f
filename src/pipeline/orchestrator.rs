use std::time::Instant;

use opentelemetry::KeyValue;

use crate::error::AppError;
use crate::llm::{ApiKey, LlmClient};
use crate::models::{AssessmentInput, GeneratedReport, Scenario};
use crate::telemetry::metrics::{REPORT_FAILURES, REPORT_GENERATION_DURATION, REPORT_SECTIONS};

use super::format::{self, FormatParams};
use super::generate::{self, GenerationSettings};
use super::usage::UsageLogger;

/// Long-lived collaborators of the report chain.
pub struct ReportPipeline {
    pub llm_client: LlmClient,
    pub settings: GenerationSettings,
    pub usage_logger: UsageLogger,
}

impl ReportPipeline {
    /// Generate → parse → classify → log usage.
    #[tracing::instrument(
        name = "pipeline report",
        skip(self, input, api_key),
        fields(
            report.scenario = %scenario,
            report.case_id,
            report.duration_ms,
        )
    )]
    pub async fn generate_report(
        &self,
        scenario: Scenario,
        input: &AssessmentInput,
        api_key: Option<&ApiKey>,
    ) -> Result<GeneratedReport, AppError> {
        let start = Instant::now();

        // Stage 1: uploads + one generation call
        let raw = match generate::generate_raw_report(
            &self.llm_client,
            &self.settings,
            scenario,
            input,
            api_key,
        )
        .await
        {
            Ok(raw) => raw,
            Err(err) => {
                REPORT_FAILURES.add(1, &[KeyValue::new("report.scenario", scenario.as_str())]);
                return Err(err);
            }
        };

        // Stage 2: local parsing and classification
        let analysis = format::analyze(&raw.markdown);
        let elapsed = start.elapsed();

        // Stage 3: usage record
        let usage = self
            .usage_logger
            .log_case(
                scenario,
                analysis.risk_level,
                analysis.dpia_required,
                analysis.sections.len(),
                elapsed,
            )
            .await;

        let report = format::format_report(FormatParams {
            raw,
            analysis,
            usage: Some(usage),
        });

        REPORT_GENERATION_DURATION.record(
            start.elapsed().as_secs_f64(),
            &[KeyValue::new("report.scenario", scenario.as_str())],
        );
        REPORT_SECTIONS.record(report.sections.len() as f64, &[]);

        let span = tracing::Span::current();
        if let Some(usage) = &report.usage {
            span.record("report.case_id", usage.case_id.as_str());
            span.record("report.duration_ms", usage.duration_ms);
        }

        Ok(report)
    }
}
