pub mod http;
pub mod init;
pub mod metrics;

pub use http::{HttpMakeSpan, HttpOnResponse, X_REQUEST_ID, record_http_metrics};
pub use init::{TelemetryGuard, init_telemetry};
