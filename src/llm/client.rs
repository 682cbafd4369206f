use std::sync::Arc;
use std::time::Instant;

use futures::future::try_join_all;
use opentelemetry::KeyValue;
use tracing::Instrument;
use tracing_opentelemetry::OpenTelemetrySpanExt;

use super::pricing::{calculate_cost, server_endpoint};
use super::{ApiKey, GenerateRequest, GenerateResponse, LlmError, Provider};
use crate::models::Attachment;
use crate::telemetry::metrics::{
    GEN_AI_COST, GEN_AI_ERROR_COUNT, GEN_AI_OPERATION_DURATION, GEN_AI_TOKEN_USAGE,
    GEN_AI_UPLOAD_COUNT,
};

pub struct LlmClient {
    pub provider: Arc<dyn Provider>,
    pub server_address: String,
    pub server_port: i64,
}

impl LlmClient {
    pub fn new(provider: Arc<dyn Provider>, base_url: &str) -> Self {
        let (server_address, server_port) = server_endpoint(base_url);
        Self {
            provider,
            server_address,
            server_port,
        }
    }

    /// Uploads every attachment concurrently and returns the file ids in
    /// attachment order. The first failure aborts the whole batch.
    #[tracing::instrument(
        name = "gen_ai.upload_files",
        skip(self, api_key, files),
        fields(files.count = files.len(), files.bytes)
    )]
    pub async fn upload_attachments(
        &self,
        api_key: &ApiKey,
        files: &[Attachment],
    ) -> Result<Vec<String>, LlmError> {
        let total_bytes: usize = files.iter().map(|f| f.bytes.len()).sum();
        tracing::Span::current().record("files.bytes", total_bytes);

        let provider_name = self.provider.name().to_string();
        let uploads = files.iter().map(|file| {
            let provider_name = provider_name.clone();
            async move {
                let result = self.provider.upload_file(api_key, file).await;
                let outcome = if result.is_ok() { "success" } else { "error" };
                GEN_AI_UPLOAD_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name),
                        KeyValue::new("outcome", outcome),
                    ],
                );
                result
            }
        });

        let ids = try_join_all(uploads).await?;
        tracing::info!(file_ids = ?ids, "Uploaded attachments");
        Ok(ids)
    }

    /// One generation call wrapped in a `gen_ai.chat` span. Not retried.
    pub async fn generate(
        &self,
        api_key: &ApiKey,
        req: &GenerateRequest,
    ) -> Result<GenerateResponse, LlmError> {
        let provider_name = self.provider.name().to_string();
        let span_display_name = format!("gen_ai.chat {}", req.model);
        let start = Instant::now();

        let span = tracing::info_span!(
            "gen_ai.chat",
            otel.name = %span_display_name,
            gen_ai.operation.name = "chat",
            gen_ai.provider.name = %provider_name,
            gen_ai.request.model = %req.model,
            gen_ai.request.reasoning_effort = %req.reasoning_effort,
            gen_ai.request.input_files = req.file_count() as i64,
            server.address = %self.server_address,
            server.port = self.server_port,
            gen_ai.response.model = tracing::field::Empty,
            gen_ai.usage.input_tokens = tracing::field::Empty,
            gen_ai.usage.output_tokens = tracing::field::Empty,
            gen_ai.usage.cost_usd = tracing::field::Empty,
            gen_ai.response.status = tracing::field::Empty,
            report.stage = %req.stage,
            otel.status_code = tracing::field::Empty,
            error.type = tracing::field::Empty,
        );

        {
            let mut user_event_attrs = vec![KeyValue::new(
                "gen_ai.prompt",
                truncate(&req.prompt_text(), 1000),
            )];
            if !req.instructions.is_empty() {
                user_event_attrs.push(KeyValue::new(
                    "gen_ai.system_instructions",
                    truncate(&req.instructions, 500),
                ));
            }
            span.add_event("gen_ai.user.message", user_event_attrs);
        }

        let result = self
            .provider
            .generate(api_key, req)
            .instrument(span.clone())
            .await;

        let duration = start.elapsed().as_secs_f64();

        match result {
            Ok(mut resp) => {
                resp.provider = provider_name.clone();
                resp.cost_usd = calculate_cost(&resp.model, resp.input_tokens, resp.output_tokens);

                span.record("gen_ai.response.model", resp.model.as_str());
                span.record("gen_ai.usage.input_tokens", resp.input_tokens as i64);
                span.record("gen_ai.usage.output_tokens", resp.output_tokens as i64);
                span.record("gen_ai.usage.cost_usd", resp.cost_usd);
                if !resp.status.is_empty() {
                    span.record("gen_ai.response.status", resp.status.as_str());
                }

                span.add_event(
                    "gen_ai.assistant.message",
                    vec![KeyValue::new(
                        "gen_ai.completion",
                        truncate(&resp.content, 2000),
                    )],
                );

                let op_kv = KeyValue::new("gen_ai.operation.name", "chat");
                let provider_kv = KeyValue::new("gen_ai.provider.name", provider_name);
                let model_kv = KeyValue::new("gen_ai.request.model", resp.model.clone());

                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.input_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "input"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_TOKEN_USAGE.record(
                    f64::from(resp.output_tokens),
                    &[
                        KeyValue::new("gen_ai.token.type", "output"),
                        op_kv.clone(),
                        provider_kv.clone(),
                        model_kv.clone(),
                    ],
                );
                GEN_AI_OPERATION_DURATION.record(
                    duration,
                    &[op_kv.clone(), provider_kv.clone(), model_kv.clone()],
                );
                GEN_AI_COST.add(resp.cost_usd, &[op_kv, provider_kv, model_kv]);

                Ok(resp)
            }
            Err(err) => {
                span.record("otel.status_code", "ERROR");
                span.record("error.type", classify_error(&err));

                tracing::error!(
                    provider = %provider_name,
                    model = %req.model,
                    error = %err,
                    duration_s = duration,
                    "LLM call failed"
                );

                GEN_AI_ERROR_COUNT.add(
                    1,
                    &[
                        KeyValue::new("gen_ai.provider.name", provider_name),
                        KeyValue::new("gen_ai.request.model", req.model.clone()),
                        KeyValue::new("error.type", classify_error(&err)),
                    ],
                );

                Err(err)
            }
        }
    }
}

fn classify_error(err: &LlmError) -> &'static str {
    match err {
        LlmError::MissingCredentials => "auth_error",
        LlmError::EmptyResponse | LlmError::Decode(_) => "invalid_response",
        LlmError::Upload { .. } => "upload_error",
        LlmError::Api { status, .. } => match *status {
            429 => "rate_limit",
            401 | 403 => "auth_error",
            408 | 504 => "timeout",
            400..=499 => "invalid_request",
            _ => "server_error",
        },
        LlmError::Transport(e) if e.is_timeout() => "timeout",
        LlmError::Transport(e) if e.is_connect() => "network_error",
        LlmError::Transport(_) => "unknown_error",
    }
}

/// At most `max` bytes, cut on a char boundary.
fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let end = (0..=max)
        .rev()
        .find(|&i| s.is_char_boundary(i))
        .unwrap_or(0);
    s[..end].to_string()
}
