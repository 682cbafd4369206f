use std::env;
use std::str::FromStr;
use std::time::Duration;

use anyhow::Context;

use crate::llm::openai::DEFAULT_BASE_URL;
use crate::session::{DEFAULT_MAX_SESSIONS, DEFAULT_SESSION_TTL};

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub environment: String,
    pub openai_base_url: String,
    /// Used when the user leaves the key field on the selector blank.
    pub openai_api_key: Option<String>,
    pub llm_model: String,
    pub llm_reasoning_effort: String,
    pub llm_web_search: bool,
    pub llm_file_purpose: String,
    pub llm_request_timeout: Duration,
    pub usage_log_latency: Duration,
    pub max_upload_bytes: usize,
    /// Idle sessions older than this are swept.
    pub session_ttl: Duration,
    pub max_sessions: usize,
    pub otel_service_name: String,
    pub otel_exporter_endpoint: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            port: 8080,
            environment: "development".to_string(),
            openai_base_url: DEFAULT_BASE_URL.to_string(),
            openai_api_key: None,
            llm_model: "gpt-5.2-pro".to_string(),
            llm_reasoning_effort: "high".to_string(),
            llm_web_search: true,
            llm_file_purpose: "assistants".to_string(),
            llm_request_timeout: Duration::from_secs(600),
            usage_log_latency: Duration::from_millis(800),
            max_upload_bytes: 25 * 1024 * 1024,
            session_ttl: DEFAULT_SESSION_TTL,
            max_sessions: DEFAULT_MAX_SESSIONS,
            otel_service_name: "compliance-pack-generator".to_string(),
            otel_exporter_endpoint: "http://localhost:4317".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds a config from an arbitrary variable source; unset keys keep
    /// their defaults.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| lookup(key).unwrap_or(default);

        Ok(Self {
            port: parsed(&lookup, "APP_PORT", defaults.port)?,
            environment: text("APP_ENVIRONMENT", defaults.environment),
            openai_base_url: text("OPENAI_BASE_URL", defaults.openai_base_url),
            openai_api_key: lookup("OPENAI_API_KEY").filter(|k| !k.trim().is_empty()),
            llm_model: text("LLM_MODEL", defaults.llm_model),
            llm_reasoning_effort: text("LLM_REASONING_EFFORT", defaults.llm_reasoning_effort),
            llm_web_search: parsed(&lookup, "LLM_WEB_SEARCH", defaults.llm_web_search)?,
            llm_file_purpose: text("LLM_FILE_PURPOSE", defaults.llm_file_purpose),
            llm_request_timeout: Duration::from_secs(parsed(
                &lookup,
                "LLM_REQUEST_TIMEOUT_SECS",
                defaults.llm_request_timeout.as_secs(),
            )?),
            usage_log_latency: Duration::from_millis(parsed(
                &lookup,
                "USAGE_LOG_LATENCY_MS",
                defaults.usage_log_latency.as_millis() as u64,
            )?),
            max_upload_bytes: parsed(&lookup, "MAX_UPLOAD_BYTES", defaults.max_upload_bytes)?,
            session_ttl: Duration::from_secs(parsed(
                &lookup,
                "SESSION_TTL_SECS",
                defaults.session_ttl.as_secs(),
            )?),
            max_sessions: parsed(&lookup, "MAX_SESSIONS", defaults.max_sessions)?,
            otel_service_name: text("OTEL_SERVICE_NAME", defaults.otel_service_name),
            otel_exporter_endpoint: text(
                "OTEL_EXPORTER_OTLP_ENDPOINT",
                defaults.otel_exporter_endpoint,
            ),
        })
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

fn parsed<T, F>(lookup: &F, key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} has an invalid value: {raw:?}")),
        None => Ok(default),
    }
}
