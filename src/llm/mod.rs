pub mod client;
pub mod openai;
pub mod pricing;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::models::Attachment;

pub use client::LlmClient;

/// Bearer credential supplied by the user. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    pub fn new(raw: impl Into<String>) -> Option<Self> {
        let raw = raw.into();
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(***)")
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InputPart {
    InputText { text: String },
    InputFile { file_id: String },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Tool {
    WebSearch,
}

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub instructions: String,
    pub reasoning_effort: String,
    pub input: Vec<InputPart>,
    pub tools: Vec<Tool>,
    pub stage: String,
}

impl GenerateRequest {
    pub fn prompt_text(&self) -> String {
        self.input
            .iter()
            .filter_map(|part| match part {
                InputPart::InputText { text } => Some(text.as_str()),
                InputPart::InputFile { .. } => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn file_count(&self) -> usize {
        self.input
            .iter()
            .filter(|part| matches!(part, InputPart::InputFile { .. }))
            .count()
    }
}

#[derive(Debug, Clone)]
pub struct GenerateResponse {
    pub content: String,
    pub model: String,
    pub input_tokens: u32,
    pub output_tokens: u32,
    pub cost_usd: f64,
    pub status: String,
    pub provider: String,
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("OpenAI API Key is missing.")]
    MissingCredentials,

    #[error("File upload failed: {message}")]
    Upload { filename: String, message: String },

    #[error("OpenAI API Error: {message}")]
    Api { status: u16, message: String },

    #[error("No text content generated from OpenAI.")]
    EmptyResponse,

    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("unexpected response body: {0}")]
    Decode(String),
}

#[async_trait::async_trait]
pub trait Provider: Send + Sync {
    /// Uploads one document and returns the provider's file id.
    async fn upload_file(&self, api_key: &ApiKey, file: &Attachment) -> Result<String, LlmError>;

    async fn generate(
        &self,
        api_key: &ApiKey,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError>;

    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_key_rejects_blank() {
        assert!(ApiKey::new("").is_none());
        assert!(ApiKey::new("   ").is_none());
        assert_eq!(ApiKey::new(" sk-abc ").unwrap().expose(), "sk-abc");
    }

    #[test]
    fn test_api_key_debug_is_redacted() {
        let key = ApiKey::new("sk-secret").unwrap();
        assert_eq!(format!("{key:?}"), "ApiKey(***)");
    }

    #[test]
    fn test_input_parts_wire_shape() {
        let parts = vec![
            InputPart::InputText {
                text: "hello".into(),
            },
            InputPart::InputFile {
                file_id: "file-1".into(),
            },
        ];
        let value = serde_json::to_value(&parts).unwrap();
        assert_eq!(
            value,
            serde_json::json!([
                {"type": "input_text", "text": "hello"},
                {"type": "input_file", "file_id": "file-1"}
            ])
        );
        assert_eq!(
            serde_json::to_value(Tool::WebSearch).unwrap(),
            serde_json::json!({"type": "web_search"})
        );
    }

    #[test]
    fn test_request_helpers() {
        let req = GenerateRequest {
            model: "m".into(),
            instructions: String::new(),
            reasoning_effort: "high".into(),
            input: vec![
                InputPart::InputText { text: "a".into() },
                InputPart::InputFile {
                    file_id: "f".into(),
                },
                InputPart::InputFile {
                    file_id: "g".into(),
                },
            ],
            tools: vec![],
            stage: "generate".into(),
        };
        assert_eq!(req.prompt_text(), "a");
        assert_eq!(req.file_count(), 2);
    }

    #[test]
    fn test_error_messages() {
        let err = LlmError::Upload {
            filename: "gdpr.pdf".into(),
            message: "Invalid file format".into(),
        };
        assert_eq!(err.to_string(), "File upload failed: Invalid file format");
        let err = LlmError::Api {
            status: 400,
            message: "Unsupported model".into(),
        };
        assert_eq!(err.to_string(), "OpenAI API Error: Unsupported model");
    }
}
