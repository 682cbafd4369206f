use axum::{
    Form,
    extract::{Multipart, Path, Query, State},
    response::Redirect,
};
use maud::Markup;
use serde::Deserialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::AppState;
use crate::error::{AppError, AppResult};
use crate::llm::ApiKey;
use crate::models::{AssessmentFields, AssessmentInput, Attachment, Scenario};
use crate::session::SessionState;
use crate::views::{self, ReportView};

const ATTACHMENT_FIELD: &str = "attachments";

#[derive(Debug, Deserialize)]
pub struct ScenarioForm {
    pub scenario: String,
    #[serde(default)]
    pub api_key: Option<String>,
}

impl ScenarioForm {
    fn parse(self) -> AppResult<(Scenario, Option<ApiKey>)> {
        let scenario = self.scenario.parse::<Scenario>().map_err(AppError::Validation)?;
        Ok((scenario, self.api_key.and_then(ApiKey::new)))
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct SessionQuery {
    pub demo: Option<String>,
    pub tab: Option<String>,
}

impl SessionQuery {
    fn wants_demo(&self) -> bool {
        self.demo
            .as_deref()
            .is_some_and(|v| matches!(v, "1" | "true" | "yes"))
    }
}

fn session_url(id: Uuid) -> String {
    format!("/sessions/{id}")
}

pub async fn index() -> Markup {
    views::selector_page("/sessions", false)
}

pub async fn create_session(
    State(state): State<AppState>,
    Form(form): Form<ScenarioForm>,
) -> AppResult<Redirect> {
    let (scenario, credential) = form.parse()?;
    let id = state.sessions.create(None);
    state
        .sessions
        .update(id, |session| session.select_scenario(scenario, credential))?;

    Ok(Redirect::to(&session_url(id)))
}

pub async fn show_session(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(query): Query<SessionQuery>,
) -> AppResult<Markup> {
    let session = state.sessions.get(id)?;

    let page = match &session.state {
        SessionState::Idle => views::selector_page(
            &format!("/sessions/{id}/scenario"),
            session.credential.is_some(),
        ),
        SessionState::FormEntry { scenario } => {
            let values = if query.wants_demo() {
                AssessmentFields::demo(*scenario)
            } else {
                session.draft.clone().unwrap_or_default()
            };
            views::form_page(id, *scenario, &values, session.last_error.as_deref())
        }
        SessionState::Submitting { scenario } => views::submitting_page(id, *scenario),
        SessionState::Viewing { scenario, report } => views::report_page(&ReportView {
            session_id: id,
            scenario: *scenario,
            report,
            active_tab: query.tab.as_deref(),
        }),
    };

    Ok(page)
}

pub async fn select_scenario(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Form(form): Form<ScenarioForm>,
) -> AppResult<Redirect> {
    let (scenario, credential) = form.parse()?;
    state
        .sessions
        .update(id, |session| session.select_scenario(scenario, credential))?;

    Ok(Redirect::to(&session_url(id)))
}

pub async fn go_back(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Redirect> {
    state.sessions.update(id, |session| session.back())?;
    Ok(Redirect::to(&session_url(id)))
}

pub async fn reset(State(state): State<AppState>, Path(id): Path<Uuid>) -> AppResult<Redirect> {
    state.sessions.update(id, |session| session.reset())?;
    Ok(Redirect::to(&session_url(id)))
}

/// Runs the whole report chain for one form post. Failures land back on the
/// form as a banner; only session conflicts and malformed bodies surface as
/// HTTP errors.
#[tracing::instrument(name = "submit_assessment", skip_all, fields(session.id = %id))]
pub async fn submit(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    multipart: Multipart,
) -> AppResult<Redirect> {
    let input = read_assessment(multipart).await?;

    let missing = input.fields.missing();
    if !missing.is_empty() {
        let message = format!("Please fill in: {}", missing.join(", "));
        state
            .sessions
            .update(id, |session| session.reject_draft(message, input.fields))?;
        return Ok(Redirect::to(&session_url(id)));
    }

    if let Some(bad) = input.attachments.iter().find(|a| !a.has_accepted_extension()) {
        let message = format!(
            "Unsupported attachment {}: only PDF and Word documents are accepted",
            bad.filename
        );
        state
            .sessions
            .update(id, |session| session.reject_draft(message, input.fields))?;
        return Ok(Redirect::to(&session_url(id)));
    }

    let (scenario, credential) = state.sessions.update(id, |session| {
        let scenario = session.begin_submission()?;
        Ok((scenario, session.credential.clone()))
    })?;
    let api_key = credential.or_else(|| state.fallback_key.clone());

    tracing::info!(
        report.scenario = %scenario,
        report.attachments = input.attachments.len(),
        "Assessment submitted"
    );

    // Detached so a dropped connection cannot leave the session stuck in
    // Submitting.
    let draft = input.fields.clone();
    let task = tokio::spawn(
        run_submission(state.clone(), id, scenario, input, api_key).in_current_span(),
    );

    match task.await {
        Ok(result) => result?,
        Err(join_err) => {
            tracing::error!(error = %join_err, "Report task aborted");
            state.sessions.update(id, |session| {
                session.fail_submission("Report generation was interrupted".into(), draft)
            })?;
        }
    }

    Ok(Redirect::to(&session_url(id)))
}

async fn run_submission(
    state: AppState,
    id: Uuid,
    scenario: Scenario,
    input: AssessmentInput,
    api_key: Option<ApiKey>,
) -> AppResult<()> {
    let outcome = state
        .pipeline
        .generate_report(scenario, &input, api_key.as_ref())
        .await;

    state.sessions.update(id, |session| match outcome {
        Ok(report) => session.complete_submission(report),
        Err(err) => {
            tracing::warn!(error = %err, status = err.status_code().as_u16(), "Report generation failed");
            session.fail_submission(err.user_message(), input.fields)
        }
    })
}

/// Collects the ten text answers and any uploaded files, in upload order.
/// Empty file parts (no file chosen) are dropped.
async fn read_assessment(mut multipart: Multipart) -> AppResult<AssessmentInput> {
    let mut fields = AssessmentFields::default();
    let mut attachments = Vec::new();

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| AppError::Validation(format!("invalid form body: {e}")))?
    {
        let name = field.name().unwrap_or_default().to_string();

        if name == ATTACHMENT_FIELD {
            let filename = field.file_name().unwrap_or_default().to_string();
            let content_type = field
                .content_type()
                .unwrap_or("application/octet-stream")
                .to_string();
            let bytes = field
                .bytes()
                .await
                .map_err(|e| AppError::Validation(format!("failed to read {filename}: {e}")))?;

            if filename.is_empty() && bytes.is_empty() {
                continue;
            }
            attachments.push(Attachment {
                filename,
                content_type,
                bytes: bytes.to_vec(),
            });
        } else {
            let value = field
                .text()
                .await
                .map_err(|e| AppError::Validation(format!("invalid field {name}: {e}")))?;
            if !fields.set(&name, value) {
                tracing::debug!(field = %name, "Ignoring unknown form field");
            }
        }
    }

    Ok(AssessmentInput {
        fields,
        attachments,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scenario_form_parse() {
        let form = ScenarioForm {
            scenario: "R&D".into(),
            api_key: Some("  ".into()),
        };
        let (scenario, key) = form.parse().unwrap();
        assert_eq!(scenario, Scenario::RnD);
        assert!(key.is_none());

        let form = ScenarioForm {
            scenario: "Factory".into(),
            api_key: None,
        };
        assert!(matches!(form.parse(), Err(AppError::Validation(_))));
    }

    #[test]
    fn test_demo_query_flag() {
        let query = SessionQuery {
            demo: Some("1".into()),
            tab: None,
        };
        assert!(query.wants_demo());
        assert!(!SessionQuery::default().wants_demo());
        let query = SessionQuery {
            demo: Some("0".into()),
            tab: None,
        };
        assert!(!query.wants_demo());
    }
}
