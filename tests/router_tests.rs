mod common;

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use http_body_util::BodyExt;
use tower::ServiceExt;
use uuid::Uuid;

use common::{ScriptedProvider, TWO_SECTION_REPORT, filled_fields, multipart_body, test_config};
use compliance_pack_generator::models::{AssessmentFields, Scenario};
use compliance_pack_generator::{AppState, Config, routes};

fn app_with(config: Config, provider: Arc<ScriptedProvider>) -> Router {
    routes::create_router(AppState::new(config, provider))
}

fn app(provider: Arc<ScriptedProvider>) -> Router {
    app_with(test_config(), provider)
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn body_text(response: Response) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

fn location(response: &Response) -> String {
    response
        .headers()
        .get(header::LOCATION)
        .expect("redirect location")
        .to_str()
        .unwrap()
        .to_string()
}

fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).unwrap()
}

/// Creates a session in FormEntry and returns its page path.
async fn start(app: &Router, scenario: &str, api_key: &str) -> String {
    let body = format!("scenario={scenario}&api_key={api_key}");
    let response = send(app, form_post("/sessions", &body)).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    location(&response)
}

async fn submit(
    app: &Router,
    session: &str,
    fields: &[(&str, String)],
    files: &[(&str, &str, &[u8])],
) -> Response {
    let pairs: Vec<(&str, &str)> = fields.iter().map(|(k, v)| (*k, v.as_str())).collect();
    let (content_type, body) = multipart_body(&pairs, files);
    let request = Request::post(format!("{session}/submit"))
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

#[tokio::test]
async fn health_reports_ok() {
    let app = app(ScriptedProvider::replying("x"));
    let response = send(&app, get("/api/health")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["service"], "compliance-pack-generator");
}

#[tokio::test]
async fn index_renders_selector() {
    let app = app(ScriptedProvider::replying("x"));
    let response = send(&app, get("/")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let html = body_text(response).await;
    assert!(html.contains(r#"action="/sessions""#));
    assert!(html.contains("Office"));
}

#[tokio::test]
async fn demo_query_prefills_form() {
    let app = app(ScriptedProvider::replying("x"));
    let session = start(&app, "Office", "sk-test").await;

    let blank = body_text(send(&app, get(&session)).await).await;
    assert!(!blank.contains("Office Visitor Management System"));

    let demo = body_text(send(&app, get(&format!("{session}?demo=1"))).await).await;
    assert!(demo.contains("Office Visitor Management System"));
    assert!(demo.contains("Scenario: Office"));
}

#[tokio::test]
async fn full_case_flow() {
    let provider = ScriptedProvider::replying(TWO_SECTION_REPORT);
    let app = app(provider.clone());
    let session = start(&app, "R%26D", "sk-test").await;
    let id = session.trim_start_matches("/sessions/").to_string();

    let status = body_text(send(&app, get(&format!("/api/sessions/{id}"))).await).await;
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["state"], "form_entry");
    assert_eq!(status["scenario"], "R&D");
    assert_eq!(status["riskLevel"], "UNKNOWN");
    assert!(status["caseId"].is_null());

    let fields = filled_fields(&AssessmentFields::demo(Scenario::RnD));
    let response = submit(
        &app,
        &session,
        &fields,
        &[("gdpr.pdf", "application/pdf", b"%PDF-1.7")],
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    assert_eq!(location(&response), session);
    assert_eq!(provider.upload_count(), 1);
    assert_eq!(provider.generation_count(), 1);

    // report page
    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("CASE-"));
    assert!(html.contains("risk-dot risk-yellow"));
    assert!(html.contains("DPIA required"));
    assert!(html.contains("Executive Conclusion"));
    assert!(html.contains("Start New Case"));

    let tab = body_text(send(&app, get(&format!("{session}?tab=sec-1"))).await).await;
    assert!(tab.contains("DPIA: Required"));

    let status = body_text(send(&app, get(&format!("/api/sessions/{id}"))).await).await;
    let status: serde_json::Value = serde_json::from_str(&status).unwrap();
    assert_eq!(status["state"], "viewing");
    assert_eq!(status["riskLevel"], "YELLOW");
    assert!(status["caseId"].as_str().unwrap().starts_with("CASE-"));

    // JSON and markdown views
    let response = send(&app, get(&format!("/api/sessions/{id}/report"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["riskLevel"], "YELLOW");
    assert_eq!(json["dpiaRequired"], true);
    assert_eq!(json["sections"].as_array().unwrap().len(), 2);
    assert_eq!(json["sections"][1]["id"], "sec-1");
    assert_eq!(json["kpiData"]["scenarioType"], "R&D");
    assert_eq!(json["kpiData"]["outputSections"], 2);

    let response = send(&app, get(&format!("{session}/report.md"))).await;
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "text/markdown; charset=utf-8"
    );
    assert_eq!(body_text(response).await, TWO_SECTION_REPORT);

    // a second submission on a finished case is refused
    let response = submit(&app, &session, &fields, &[]).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(provider.generation_count(), 1);

    // start a new case: back to the selector, credential kept
    let response = send(&app, form_post(&format!("{session}/reset"), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains(&format!("{session}/scenario")));
    assert!(html.contains("Stored for this session"));

    let response = send(&app, get(&format!("/api/sessions/{id}/report"))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn provider_failure_returns_to_form_with_banner() {
    let provider = ScriptedProvider::rejecting();
    let app = app(provider.clone());
    let session = start(&app, "Office", "sk-wrong").await;

    let fields = filled_fields(&AssessmentFields::demo(Scenario::Office));
    let response = submit(&app, &session, &fields, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("OpenAI API Error: Incorrect API key provided"));
    // answers survive the failed attempt
    assert!(html.contains("Office Visitor Management System"));
    assert!(!html.contains("Generating..."));
}

#[tokio::test]
async fn missing_credential_is_reported_without_calling_provider() {
    let provider = ScriptedProvider::replying("Summary text");
    let app = app(provider.clone());
    let session = start(&app, "Office", "").await;

    let fields = filled_fields(&AssessmentFields::demo(Scenario::Office));
    submit(&app, &session, &fields, &[]).await;

    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("OpenAI API Key is missing."));
    assert_eq!(provider.generation_count(), 0);
}

#[tokio::test]
async fn server_key_is_used_when_session_has_none() {
    let provider = ScriptedProvider::replying("Summary text");
    let config = Config {
        openai_api_key: Some("sk-server".to_string()),
        ..test_config()
    };
    let app = app_with(config, provider.clone());
    let session = start(&app, "Office", "").await;

    let fields = filled_fields(&AssessmentFields::demo(Scenario::Office));
    submit(&app, &session, &fields, &[]).await;

    assert_eq!(provider.generation_count(), 1);
    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("risk-dot risk-green"));
}

#[tokio::test]
async fn blank_fields_stay_on_form() {
    let provider = ScriptedProvider::replying("Summary text");
    let app = app(provider.clone());
    let session = start(&app, "R%26D", "sk-test").await;

    let fields = vec![("system_name", "Fleet telemetry".to_string())];
    let response = submit(&app, &session, &fields, &[]).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("Please fill in: Data Subject"));
    assert!(html.contains("Fleet telemetry"));
    assert_eq!(provider.generation_count(), 0);
}

#[tokio::test]
async fn unsupported_attachment_is_rejected() {
    let provider = ScriptedProvider::replying("Summary text");
    let app = app(provider.clone());
    let session = start(&app, "Office", "sk-test").await;

    let fields = filled_fields(&AssessmentFields::demo(Scenario::Office));
    submit(&app, &session, &fields, &[("notes.txt", "text/plain", b"hi")]).await;

    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("Unsupported attachment notes.txt"));
    assert_eq!(provider.upload_count(), 0);
    assert_eq!(provider.generation_count(), 0);
}

#[tokio::test]
async fn back_returns_to_selector() {
    let app = app(ScriptedProvider::replying("x"));
    let session = start(&app, "Office", "sk-test").await;

    let response = send(&app, form_post(&format!("{session}/back"), "")).await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);

    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains(&format!("{session}/scenario")));

    let response = send(
        &app,
        form_post(&format!("{session}/scenario"), "scenario=R%26D"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::SEE_OTHER);
    let html = body_text(send(&app, get(&session)).await).await;
    assert!(html.contains("Scenario: R&amp;D"));
}

#[tokio::test]
async fn invalid_transitions_and_unknown_sessions() {
    let app = app(ScriptedProvider::replying("x"));
    let session = start(&app, "Office", "sk-test").await;

    let response = send(&app, form_post(&format!("{session}/reset"), "")).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
    assert_eq!(json["status"], 409);

    let response = send(&app, get(&format!("/sessions/{}", Uuid::new_v4()))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, form_post("/sessions", "scenario=Factory")).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
