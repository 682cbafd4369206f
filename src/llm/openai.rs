use std::time::Duration;

use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use super::{ApiKey, GenerateRequest, GenerateResponse, InputPart, LlmError, Provider, Tool};
use crate::models::Attachment;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// OpenAI Responses API provider: `/files` for attachments, `/responses`
/// for generation.
pub struct OpenAIProvider {
    client: Client,
    base_url: String,
    file_purpose: String,
}

impl OpenAIProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "Failed to build HTTP client with custom timeout, using default client");
                Client::new()
            });

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            file_purpose: "assistants".to_string(),
        }
    }

    pub fn with_file_purpose(mut self, purpose: impl Into<String>) -> Self {
        self.file_purpose = purpose.into();
        self
    }

    fn files_url(&self) -> String {
        format!("{}/files", self.base_url)
    }

    fn responses_url(&self) -> String {
        format!("{}/responses", self.base_url)
    }
}

#[derive(Serialize)]
struct ResponsesRequest<'a> {
    model: &'a str,
    instructions: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [Tool]>,
    reasoning: Reasoning<'a>,
    input: [InputMessage<'a>; 1],
}

#[derive(Serialize)]
struct Reasoning<'a> {
    effort: &'a str,
}

#[derive(Serialize)]
struct InputMessage<'a> {
    role: &'static str,
    content: &'a [InputPart],
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsesEnvelope {
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub output: Vec<OutputItem>,
    #[serde(default)]
    pub usage: Option<ResponsesUsage>,
}

#[derive(Debug, Default, Deserialize)]
pub struct OutputItem {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub role: Option<String>,
    /// Left untyped: tool-call and reasoning items carry other shapes here.
    #[serde(default)]
    pub content: serde_json::Value,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResponsesUsage {
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
}

#[derive(Deserialize)]
struct FileObject {
    id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

/// Concatenates every `output_text` part of every assistant message, in
/// the order the endpoint returned them.
pub fn extract_output_text(envelope: &ResponsesEnvelope) -> String {
    let mut text = String::new();

    for item in &envelope.output {
        if item.kind != "message" || item.role.as_deref() != Some("assistant") {
            continue;
        }
        let Some(parts) = item.content.as_array() else {
            continue;
        };
        for part in parts {
            if part.get("type").and_then(|t| t.as_str()) == Some("output_text")
                && let Some(chunk) = part.get("text").and_then(|t| t.as_str())
            {
                text.push_str(chunk);
            }
        }
    }

    text
}

/// Provider message from an error body, else the status reason phrase.
fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()
        .and_then(|e| e.error)
        .and_then(|d| d.message)
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .map(str::to_string)
                .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
        })
}

fn file_part(file: &Attachment) -> Result<Part, LlmError> {
    let part = Part::bytes(file.bytes.clone()).file_name(file.filename.clone());
    match part.mime_str(&file.content_type) {
        Ok(part) => Ok(part),
        Err(_) => Ok(Part::bytes(file.bytes.clone())
            .file_name(file.filename.clone())
            .mime_str("application/octet-stream")?),
    }
}

#[async_trait::async_trait]
impl Provider for OpenAIProvider {
    async fn upload_file(&self, api_key: &ApiKey, file: &Attachment) -> Result<String, LlmError> {
        let form = Form::new()
            .part("file", file_part(file)?)
            .text("purpose", self.file_purpose.clone());

        let response = self
            .client
            .post(self.files_url())
            .bearer_auth(api_key.expose())
            .multipart(form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(LlmError::Upload {
                filename: file.filename.clone(),
                message: error_message(status, &body),
            });
        }

        let uploaded: FileObject =
            serde_json::from_str(&body).map_err(|e| LlmError::Decode(e.to_string()))?;

        tracing::debug!(
            filename = %file.filename,
            file_id = %uploaded.id,
            bytes = file.bytes.len(),
            "File uploaded"
        );

        Ok(uploaded.id)
    }

    async fn generate(
        &self,
        api_key: &ApiKey,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        let body = ResponsesRequest {
            model: &req.model,
            instructions: &req.instructions,
            tools: (!req.tools.is_empty()).then_some(req.tools.as_slice()),
            reasoning: Reasoning {
                effort: &req.reasoning_effort,
            },
            input: [InputMessage {
                role: "user",
                content: &req.input,
            }],
        };

        let response = self
            .client
            .post(self.responses_url())
            .bearer_auth(api_key.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(status = status.as_u16(), body = %text, "OpenAI API error");
            return Err(LlmError::Api {
                status: status.as_u16(),
                message: error_message(status, &text),
            });
        }

        let envelope: ResponsesEnvelope =
            serde_json::from_str(&text).map_err(|e| LlmError::Decode(e.to_string()))?;

        let content = extract_output_text(&envelope);
        if content.is_empty() {
            tracing::warn!(
                output_items = envelope.output.len(),
                status = envelope.status.as_deref().unwrap_or(""),
                "Unexpected response structure"
            );
            return Err(LlmError::EmptyResponse);
        }

        let (input_tokens, output_tokens) = envelope
            .usage
            .as_ref()
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        Ok(GenerateResponse {
            content,
            model: if envelope.model.is_empty() {
                req.model.clone()
            } else {
                envelope.model
            },
            input_tokens,
            output_tokens,
            cost_usd: 0.0,
            status: envelope.status.unwrap_or_default(),
            provider: String::new(),
        })
    }

    fn name(&self) -> &str {
        "openai"
    }
}
