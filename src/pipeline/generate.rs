use crate::config::Config;
use crate::error::AppError;
use crate::llm::{ApiKey, GenerateRequest, InputPart, LlmClient, LlmError, Tool};
use crate::models::{AssessmentFields, AssessmentInput, Scenario};

/// Fixed ordered section list the model must produce.
pub const REPORT_SECTIONS: [&str; 9] = [
    "Executive Conclusion",
    "Actions (MUST/SHOULD/NICE)",
    "Regulation References Used (If files provided)",
    "RoPA Entry",
    "Assessment Decision",
    "Vendor & DPA Gap List",
    "Risk Register",
    "Evidence Pack",
    "Open Questions",
];

const ROLE_AND_STYLE: &str = "\
You are the Data Protection & Privacy Program Lead of an automotive R&D organisation in Europe. \
You focus on execution, not academic explanation. \
For the single scenario described by the user, produce a complete deliverable pack in one pass.

Delivery style (enterprise-ready):
- Structured and field-by-field, ready to paste into an email or a slide.
- No vague \"strengthen controls\" advice: give action lists, template fields, evidence lists and acceptance criteria.
- List uncertain information under \"Assumptions / Open Questions\" (at most 8 items), but still give a default, actionable plan first.
- Name the source of every key compliance point without long quotations: GDPR Article 30/28/35, EDPB transfer guidance, EU SCC, etc.
- IMPORTANT: if the user attached regulation files, cite them explicitly (file name plus the relevant page or clause).
- State the overall risk rating in the Executive Conclusion as RED, YELLOW or GREEN (高风险 / 中风险 / 低风险).
- If a DPIA is needed, write the exact line \"DPIA: Required\" in the Assessment Decision.";

/// System instruction sent with every request.
pub fn system_instruction() -> String {
    let sections = REPORT_SECTIONS
        .iter()
        .enumerate()
        .map(|(i, name)| format!("{}. {name}", i + 1))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{ROLE_AND_STYLE}\n\n\
        The deliverable pack MUST contain the following sections, in this order, and every section \
        MUST start with the separator \"---SECTION: [Section Name]---\" so the output can be parsed:\n\
        {sections}\n\n\
        Write the report bilingually (中文 / EN) and keep it professional."
    )
}

/// Labeled list of the ten answers, in form order.
pub fn user_prompt(scenario: Scenario, fields: &AssessmentFields, has_files: bool) -> String {
    let mut prompt = format!(
        "Scenario type: {scenario}\n\n\
        Scenario description:\n\
        1) System/Process name: {}\n\
        2) Data subjects: {}\n\
        3) Data types: {}\n\
        4) Processing purpose: {}\n\
        5) Data source: {}\n\
        6) Storage location: {}\n\
        7) Recipients / sharing: {}\n\
        8) Cross-border transfer: {}\n\
        9) Retention period: {}\n\
        10) Current security measures: {}\n\n\
        Run task chain A/B/C/D/E and output the final deliverable pack.",
        fields.system_name,
        fields.data_subject,
        fields.data_type,
        fields.purpose,
        fields.source,
        fields.storage,
        fields.recipients,
        fields.cross_border,
        fields.retention,
        fields.security,
    );

    if has_files {
        prompt.push_str(" Files are attached: base the analysis on their content and cite them.");
    }

    prompt
}

/// Model output plus the token accounting of the call that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReport {
    pub markdown: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
}

#[derive(Debug, Clone)]
pub struct GenerationSettings {
    pub model: String,
    pub reasoning_effort: String,
    pub web_search: bool,
}

impl From<&Config> for GenerationSettings {
    fn from(config: &Config) -> Self {
        Self {
            model: config.llm_model.clone(),
            reasoning_effort: config.llm_reasoning_effort.clone(),
            web_search: config.llm_web_search,
        }
    }
}

pub fn build_request(
    settings: &GenerationSettings,
    scenario: Scenario,
    fields: &AssessmentFields,
    file_ids: &[String],
) -> GenerateRequest {
    let mut input = vec![InputPart::InputText {
        text: user_prompt(scenario, fields, !file_ids.is_empty()),
    }];
    input.extend(file_ids.iter().map(|id| InputPart::InputFile {
        file_id: id.clone(),
    }));

    GenerateRequest {
        model: settings.model.clone(),
        instructions: system_instruction(),
        reasoning_effort: settings.reasoning_effort.clone(),
        input,
        tools: if settings.web_search {
            vec![Tool::WebSearch]
        } else {
            vec![]
        },
        stage: "generate".to_string(),
    }
}

/// Raw markdown for one assessment: uploads attachments, then makes exactly
/// one generation call.
#[tracing::instrument(
    name = "pipeline_stage generate",
    skip(llm_client, settings, input, api_key),
    fields(
        pipeline.stage = "generate",
        report.scenario = %scenario,
        report.attachments = input.attachments.len(),
        report.raw_len,
    )
)]
pub async fn generate_raw_report(
    llm_client: &LlmClient,
    settings: &GenerationSettings,
    scenario: Scenario,
    input: &AssessmentInput,
    api_key: Option<&ApiKey>,
) -> Result<RawReport, AppError> {
    let api_key = api_key.ok_or(LlmError::MissingCredentials)?;

    let file_ids = if input.attachments.is_empty() {
        Vec::new()
    } else {
        llm_client
            .upload_attachments(api_key, &input.attachments)
            .await
            .map_err(|e| match e {
                LlmError::Upload { .. } => AppError::from(e),
                other => AppError::Upload(other.to_string()),
            })?
    };

    let request = build_request(settings, scenario, &input.fields, &file_ids);
    let response = llm_client.generate(api_key, &request).await?;

    if response.content.trim().is_empty() {
        return Err(LlmError::EmptyResponse.into());
    }

    tracing::Span::current().record("report.raw_len", response.content.len());

    Ok(RawReport {
        markdown: response.content,
        model: response.model,
        input_tokens: response.input_tokens,
        output_tokens: response.output_tokens,
        cost_usd: response.cost_usd,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> GenerationSettings {
        GenerationSettings {
            model: "gpt-5.2-pro".into(),
            reasoning_effort: "high".into(),
            web_search: true,
        }
    }

    #[test]
    fn test_system_instruction_lists_sections_in_order() {
        let instruction = system_instruction();
        assert!(instruction.contains("---SECTION: [Section Name]---"));

        let mut last = 0;
        for name in REPORT_SECTIONS {
            let pos = instruction[last..]
                .find(name)
                .map(|p| p + last)
                .unwrap_or_else(|| panic!("missing section {name}"));
            last = pos;
        }
        assert!(instruction.contains("1. Executive Conclusion"));
        assert!(instruction.contains("9. Open Questions"));
    }

    #[test]
    fn test_user_prompt_interpolates_every_field() {
        let fields = AssessmentFields::demo(Scenario::RnD);
        let prompt = user_prompt(Scenario::RnD, &fields, false);

        assert!(prompt.starts_with("Scenario type: R&D"));
        for (name, _) in crate::models::FIELD_LABELS {
            let value = fields.get(name).unwrap();
            assert!(prompt.contains(value), "prompt is missing {name}");
        }
        assert!(prompt.contains("10) Current security measures: Disk encryption"));
        assert!(!prompt.contains("Files are attached"));
    }

    #[test]
    fn test_user_prompt_is_deterministic() {
        let fields = AssessmentFields::demo(Scenario::Office);
        assert_eq!(
            user_prompt(Scenario::Office, &fields, true),
            user_prompt(Scenario::Office, &fields, true)
        );
        assert!(user_prompt(Scenario::Office, &fields, true).contains("Files are attached"));
    }

    #[test]
    fn test_build_request_appends_file_parts_after_text() {
        let fields = AssessmentFields::demo(Scenario::Office);
        let ids = vec!["file-1".to_string(), "file-2".to_string()];
        let req = build_request(&settings(), Scenario::Office, &fields, &ids);

        assert_eq!(req.input.len(), 3);
        assert!(matches!(req.input[0], InputPart::InputText { .. }));
        assert_eq!(
            req.input[1],
            InputPart::InputFile {
                file_id: "file-1".into()
            }
        );
        assert_eq!(
            req.input[2],
            InputPart::InputFile {
                file_id: "file-2".into()
            }
        );
        assert_eq!(req.tools, vec![Tool::WebSearch]);
        assert_eq!(req.reasoning_effort, "high");
    }

    #[test]
    fn test_build_request_without_web_search() {
        let mut settings = settings();
        settings.web_search = false;
        let req = build_request(
            &settings,
            Scenario::RnD,
            &AssessmentFields::demo(Scenario::RnD),
            &[],
        );
        assert!(req.tools.is_empty());
        assert_eq!(req.input.len(), 1);
    }
}
