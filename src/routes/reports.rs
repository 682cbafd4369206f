use axum::{
    Json,
    extract::{Path, State},
    http::header,
    response::IntoResponse,
};
use serde::Serialize;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::models::{GeneratedReport, RiskLevel, Scenario};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionStatus {
    pub id: Uuid,
    pub state: &'static str,
    pub scenario: Option<Scenario>,
    pub risk_level: RiskLevel,
    pub case_id: Option<String>,
}

fn current_report(state: &AppState, id: Uuid) -> AppResult<GeneratedReport> {
    let session = state.sessions.get(id)?;
    session
        .report()
        .map(|report| GeneratedReport::clone(report))
        .ok_or_else(|| AppError::NotFound(format!("no report for session {id}")))
}

/// Raw model output, served for the "Copy Markdown" link.
pub async fn report_markdown(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<impl IntoResponse> {
    let report = current_report(&state, id)?;
    Ok((
        [(header::CONTENT_TYPE, "text/markdown; charset=utf-8")],
        report.full_markdown,
    ))
}

pub async fn report_json(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<GeneratedReport>> {
    Ok(Json(current_report(&state, id)?))
}

/// Where a session stands; `riskLevel` is `UNKNOWN` until a report exists.
pub async fn session_status(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<SessionStatus>> {
    let session = state.sessions.get(id)?;
    Ok(Json(SessionStatus {
        id,
        state: session.state.name(),
        scenario: session.state.scenario(),
        risk_level: session.risk_level(),
        case_id: session
            .report()
            .and_then(|report| report.usage.as_ref())
            .map(|usage| usage.case_id.clone()),
    }))
}
