use maud::{Markup, display, html};
use uuid::Uuid;

use super::{page, render_markdown};
use crate::models::{GeneratedReport, ReportSection, RiskLevel, Scenario};

pub struct ReportView<'a> {
    pub session_id: Uuid,
    pub scenario: Scenario,
    pub report: &'a GeneratedReport,
    /// `sec-n` from the query string; unknown ids fall back to the first tab.
    pub active_tab: Option<&'a str>,
}

impl ReportView<'_> {
    fn active_section(&self) -> Option<&ReportSection> {
        self.active_tab
            .and_then(|id| self.report.section(id))
            .or_else(|| self.report.sections.first())
    }
}

fn risk_class(level: RiskLevel) -> &'static str {
    match level {
        RiskLevel::Red => "risk-dot risk-red",
        RiskLevel::Yellow => "risk-dot risk-yellow",
        RiskLevel::Green => "risk-dot risk-green",
        RiskLevel::Unknown => "risk-dot risk-unknown",
    }
}

/// Headers arrive as `[Title]`; tabs show the bare title.
fn tab_label(title: &str) -> &str {
    title
        .strip_prefix('[')
        .and_then(|t| t.strip_suffix(']'))
        .unwrap_or(title)
}

fn seconds(duration_ms: u64) -> String {
    format!("{:.1}s", duration_ms as f64 / 1000.0)
}

pub fn report_page(view: &ReportView<'_>) -> Markup {
    let report = view.report;
    let case_id = report.usage.as_ref().map(|u| u.case_id.as_str());
    let active = view.active_section();
    let base = format!("/sessions/{}", view.session_id);

    page(
        "Compliance pack",
        case_id,
        html! {
            div.card {
                div.actions {
                    h2 {
                        span class=(risk_class(report.risk_level)) title=(report.risk_level.as_str()) {}
                        (view.scenario.as_str()) " compliance pack · " (report.risk_level.as_str())
                        @if report.dpia_required {
                            span.badge { "DPIA required" }
                        }
                    }
                }
                nav.tabs {
                    @for section in &report.sections {
                        a class=[active.filter(|a| a.id == section.id).map(|_| "active")]
                            href={ (base) "?tab=" (section.id) } { (tab_label(&section.title)) }
                    }
                }
                @if let Some(section) = active {
                    article.markdown id=(section.id) { (render_markdown(&section.content)) }
                } @else {
                    p { "The generated report contained no sections." }
                }
                @if let Some(usage) = &report.usage {
                    div.kpi {
                        span { "Case " (usage.case_id) }
                        span { "Generated in " (seconds(usage.duration_ms)) }
                        span { (usage.section_count) " artifacts" }
                        span { (report.input_tokens + report.output_tokens) " tokens" }
                        span { "Logged " (display(usage.timestamp.format("%Y-%m-%d %H:%M UTC"))) }
                    }
                }
            }
            div.actions {
                a.secondary href={ (base) "/report.md" } download="compliance-pack.md" { "Copy Markdown" }
                form method="post" action={ (base) "/reset" } {
                    button.primary type="submit" { "Start New Case" }
                }
            }
        },
    )
}
