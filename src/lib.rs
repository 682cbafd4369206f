pub mod config;
pub mod error;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod routes;
pub mod session;
pub mod telemetry;
pub mod views;

use std::sync::Arc;

pub use config::Config;

use llm::{ApiKey, LlmClient, Provider};
use pipeline::{GenerationSettings, ReportPipeline, UsageLogger};
use session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub pipeline: Arc<ReportPipeline>,
    pub sessions: SessionStore,
    /// Server-side key used when a session has none of its own.
    pub fallback_key: Option<ApiKey>,
}

impl AppState {
    pub fn new(config: Config, provider: Arc<dyn Provider>) -> Self {
        let pipeline = ReportPipeline {
            llm_client: LlmClient::new(provider, &config.openai_base_url),
            settings: GenerationSettings::from(&config),
            usage_logger: UsageLogger::new(config.usage_log_latency),
        };

        Self {
            fallback_key: config.openai_api_key.clone().and_then(ApiKey::new),
            pipeline: Arc::new(pipeline),
            sessions: SessionStore::new(config.session_ttl, config.max_sessions),
            config,
        }
    }
}
