use std::time::{Duration, Instant};

use axum::extract::{MatchedPath, Request};
use axum::http;
use axum::middleware::Next;
use axum::response::Response;
use opentelemetry::KeyValue;
use tower_http::trace::{MakeSpan, OnResponse};
use tracing::Span;

use super::metrics::{HTTP_REQUEST_DURATION, HTTP_REQUESTS_TOTAL};

pub const X_REQUEST_ID: &str = "x-request-id";

/// Templated route (`/sessions/{id}`) when the router matched one, else the
/// raw path.
fn route_of<B>(request: &http::Request<B>) -> String {
    request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string())
}

fn header_str<'a, B>(request: &'a http::Request<B>, name: &str) -> &'a str {
    request
        .headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
}

#[derive(Clone)]
pub struct HttpMakeSpan;

impl<B> MakeSpan<B> for HttpMakeSpan {
    fn make_span(&mut self, request: &http::Request<B>) -> Span {
        let method = request.method().as_str();
        let route = route_of(request);

        tracing::info_span!(
            "HTTP request",
            otel.name = %format!("{method} {route}"),
            http.method = %method,
            http.route = %route,
            http.target = %request.uri(),
            http.scheme = "http",
            http.flavor = ?request.version(),
            http.user_agent = header_str(request, "user-agent"),
            http.request_id = header_str(request, X_REQUEST_ID),
            http.response.status_code = tracing::field::Empty,
            otel.status_code = tracing::field::Empty,
        )
    }
}

#[derive(Clone)]
pub struct HttpOnResponse;

impl<B> OnResponse<B> for HttpOnResponse {
    fn on_response(self, response: &http::Response<B>, latency: Duration, span: &Span) {
        let status = response.status().as_u16();

        span.record("http.response.status_code", i64::from(status));
        span.record("otel.status_code", if status >= 500 { "ERROR" } else { "OK" });

        tracing::info!(
            http.response.status_code = status,
            latency_ms = latency.as_secs_f64() * 1000.0,
            "finished processing request"
        );
    }
}

/// Request count and latency by method, route and status class.
pub async fn record_http_metrics(request: Request, next: Next) -> Response {
    let method = request.method().to_string();
    let route = route_of(&request);
    let start = Instant::now();

    let response = next.run(request).await;

    let status = response.status().as_u16();
    let attrs = [
        KeyValue::new("http.request.method", method),
        KeyValue::new("http.route", route),
        KeyValue::new("http.response.status_code", i64::from(status)),
        KeyValue::new("http.status_class", format!("{}xx", status / 100)),
    ];
    HTTP_REQUESTS_TOTAL.add(1, &attrs);
    HTTP_REQUEST_DURATION.record(start.elapsed().as_secs_f64() * 1000.0, &attrs);

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_route_falls_back_to_path() {
        let request = http::Request::get("/sessions/abc?tab=sec-1")
            .body(Body::empty())
            .unwrap();
        assert_eq!(route_of(&request), "/sessions/abc");
    }
}
