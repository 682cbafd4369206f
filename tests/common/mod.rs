#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use compliance_pack_generator::Config;
use compliance_pack_generator::llm::{ApiKey, GenerateRequest, GenerateResponse, LlmError, Provider};
use compliance_pack_generator::models::{AssessmentFields, FIELD_LABELS};

pub const TWO_SECTION_REPORT: &str = "---SECTION: [Executive Conclusion]---\n\
Overall risk: YELLOW (中风险)\n\
---SECTION: [Assessment Decision]---\n\
DPIA: Required\n";

/// In-process provider with a canned answer; counts calls.
pub struct ScriptedProvider {
    reply: Option<String>,
    pub uploads: AtomicUsize,
    pub generations: AtomicUsize,
}

impl ScriptedProvider {
    pub fn replying(text: &str) -> Arc<Self> {
        Arc::new(Self {
            reply: Some(text.to_string()),
            uploads: AtomicUsize::new(0),
            generations: AtomicUsize::new(0),
        })
    }

    /// Every generation fails like a rejected key would.
    pub fn rejecting() -> Arc<Self> {
        Arc::new(Self {
            reply: None,
            uploads: AtomicUsize::new(0),
            generations: AtomicUsize::new(0),
        })
    }

    pub fn generation_count(&self) -> usize {
        self.generations.load(Ordering::SeqCst)
    }

    pub fn upload_count(&self) -> usize {
        self.uploads.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl Provider for ScriptedProvider {
    async fn upload_file(
        &self,
        _api_key: &ApiKey,
        file: &compliance_pack_generator::models::Attachment,
    ) -> Result<String, LlmError> {
        self.uploads.fetch_add(1, Ordering::SeqCst);
        Ok(format!("file-{}", file.filename))
    }

    async fn generate(
        &self,
        _api_key: &ApiKey,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        self.generations.fetch_add(1, Ordering::SeqCst);
        match &self.reply {
            Some(text) => Ok(GenerateResponse {
                content: text.clone(),
                model: req.model.clone(),
                input_tokens: 100,
                output_tokens: 200,
                cost_usd: 0.0,
                status: "completed".to_string(),
                provider: String::new(),
            }),
            None => Err(LlmError::Api {
                status: 401,
                message: "Incorrect API key provided".to_string(),
            }),
        }
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

pub fn test_config() -> Config {
    Config {
        usage_log_latency: Duration::ZERO,
        openai_api_key: None,
        ..Config::default()
    }
}

/// Hand-built multipart body: text fields, then `(filename, content_type,
/// bytes)` parts under `attachments`.
pub fn multipart_body(
    fields: &[(&str, &str)],
    files: &[(&str, &str, &[u8])],
) -> (String, Vec<u8>) {
    const BOUNDARY: &str = "----compliance-test-boundary";
    let mut body = Vec::new();

    for (name, value) in fields {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{name}\"\r\n\r\n{value}\r\n"
            )
            .as_bytes(),
        );
    }
    for (filename, content_type, bytes) in files {
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"attachments\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(b"\r\n");
    }
    body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

    (format!("multipart/form-data; boundary={BOUNDARY}"), body)
}

pub fn filled_fields(fields: &AssessmentFields) -> Vec<(&'static str, String)> {
    FIELD_LABELS
        .iter()
        .map(|(name, _)| (*name, fields.get(name).unwrap_or_default().to_string()))
        .collect()
}
