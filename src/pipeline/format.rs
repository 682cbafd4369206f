use crate::models::{GeneratedReport, ReportSection, RiskLevel, UsageRecord};

use super::generate::RawReport;
use super::risk::{classify_risk, dpia_required};
use super::sections::parse_sections;

/// Everything derived locally from the raw markdown.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportAnalysis {
    pub sections: Vec<ReportSection>,
    pub risk_level: RiskLevel,
    pub dpia_required: bool,
}

/// Risk tier comes from the first section only, the DPIA flag from the
/// whole text.
pub fn analyze(raw: &str) -> ReportAnalysis {
    let sections = parse_sections(raw);
    let first_section = sections.first().map(|s| s.content.as_str()).unwrap_or("");

    ReportAnalysis {
        risk_level: classify_risk(first_section),
        dpia_required: dpia_required(raw),
        sections,
    }
}

pub struct FormatParams {
    pub raw: RawReport,
    pub analysis: ReportAnalysis,
    pub usage: Option<UsageRecord>,
}

#[tracing::instrument(
    name = "pipeline_stage format",
    skip(params),
    fields(pipeline.stage = "format", report.sections_count, report.risk_level)
)]
pub fn format_report(params: FormatParams) -> GeneratedReport {
    let span = tracing::Span::current();
    span.record("report.sections_count", params.analysis.sections.len());
    span.record("report.risk_level", params.analysis.risk_level.as_str());

    GeneratedReport {
        full_markdown: params.raw.markdown,
        sections: params.analysis.sections,
        usage: params.usage,
        risk_level: params.analysis.risk_level,
        dpia_required: params.analysis.dpia_required,
        input_tokens: params.raw.input_tokens,
        output_tokens: params.raw.output_tokens,
        cost_usd: params.raw.cost_usd,
    }
}
