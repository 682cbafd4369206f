use crate::models::RiskLevel;

const RED_MARKERS: &[&str] = &["RED", "Red", "高风险"];
const YELLOW_MARKERS: &[&str] = &["YELLOW", "Yellow", "中风险"];
const DPIA_MARKERS: &[&str] = &["DPIA: Required", "触发 DPIA"];

/// Risk tier of a report, read off its first section.
///
/// Case-sensitive substring match, red markers checked before yellow ones.
/// No negation handling: "not RED" still counts as red.
pub fn classify_risk(first_section: &str) -> RiskLevel {
    if contains_any(first_section, RED_MARKERS) {
        RiskLevel::Red
    } else if contains_any(first_section, YELLOW_MARKERS) {
        RiskLevel::Yellow
    } else {
        RiskLevel::Green
    }
}

/// Whether the model asked for a DPIA anywhere in the report.
///
/// Independent of [`classify_risk`]; the two may disagree.
pub fn dpia_required(full_text: &str) -> bool {
    contains_any(full_text, DPIA_MARKERS)
}

fn contains_any(text: &str, markers: &[&str]) -> bool {
    markers.iter().any(|m| text.contains(m))
}
