use crate::models::ReportSection;

/// Token the model is instructed to put in front of every report section.
pub const SECTION_DELIMITER: &str = "---SECTION:";

/// Closes a `[Title]` header inside a section fragment.
const TITLE_TERMINATOR: &str = "---";

pub const FALLBACK_TITLE: &str = "Executive Conclusion";

/// Splits the model's markdown into titled sections.
///
/// Never fails: text without any delimiter becomes a single
/// "Executive Conclusion" section, fragments without a header get a
/// positional "Section n" title.
#[tracing::instrument(
    name = "pipeline_stage parse_sections",
    skip(raw),
    fields(
        pipeline.stage = "parse_sections",
        report.raw_len = raw.len(),
        report.sections_count,
    )
)]
pub fn parse_sections(raw: &str) -> Vec<ReportSection> {
    let has_delimiter = raw.contains(SECTION_DELIMITER);

    let sections: Vec<ReportSection> = raw
        .split(SECTION_DELIMITER)
        .filter(|fragment| !fragment.trim().is_empty())
        .enumerate()
        .map(|(index, fragment)| {
            let (title, content) = match split_header(fragment) {
                Some((title, body)) => (title.to_string(), body.to_string()),
                None if index == 0 && !has_delimiter => {
                    (FALLBACK_TITLE.to_string(), fragment.trim().to_string())
                }
                None => (format!("Section {}", index + 1), fragment.trim().to_string()),
            };

            ReportSection {
                id: format!("sec-{index}"),
                title,
                content,
            }
        })
        .collect();

    tracing::Span::current().record("report.sections_count", sections.len());

    sections
}

/// Header is the shortest run on the first non-blank line ending in `---`.
fn split_header(fragment: &str) -> Option<(&str, &str)> {
    let start = fragment.trim_start();
    let first_line = start.split('\n').next().unwrap_or_default();
    let end = first_line.find(TITLE_TERMINATOR)?;

    let title = first_line[..end].trim();
    let body = start[end + TITLE_TERMINATOR.len()..].trim();
    Some((title, body))
}
