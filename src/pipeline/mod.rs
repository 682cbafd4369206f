pub mod format;
pub mod generate;
pub mod orchestrator;
pub mod risk;
pub mod sections;
pub mod usage;

pub use generate::{GenerationSettings, RawReport, generate_raw_report};
pub use orchestrator::ReportPipeline;
pub use usage::UsageLogger;
