use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tokio::time::Instant;
use uuid::Uuid;

use crate::error::AppError;
use crate::llm::ApiKey;
use crate::models::{AssessmentFields, GeneratedReport, RiskLevel, Scenario};

#[derive(Debug, Clone)]
pub enum SessionState {
    Idle,
    FormEntry { scenario: Scenario },
    Submitting { scenario: Scenario },
    Viewing {
        scenario: Scenario,
        report: Arc<GeneratedReport>,
    },
}

impl SessionState {
    pub fn name(&self) -> &'static str {
        match self {
            SessionState::Idle => "idle",
            SessionState::FormEntry { .. } => "form_entry",
            SessionState::Submitting { .. } => "submitting",
            SessionState::Viewing { .. } => "viewing",
        }
    }

    pub fn scenario(&self) -> Option<Scenario> {
        match self {
            SessionState::Idle => None,
            SessionState::FormEntry { scenario }
            | SessionState::Submitting { scenario }
            | SessionState::Viewing { scenario, .. } => Some(*scenario),
        }
    }
}

/// One user's walk through selector, form and report.
///
/// The credential survives `reset` so a user can run several cases without
/// re-entering it.
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub credential: Option<ApiKey>,
    pub state: SessionState,
    /// Message of the last failed submission, shown above the form.
    pub last_error: Option<String>,
    /// Answers of the last failed submission, used to refill the form.
    pub draft: Option<AssessmentFields>,
}

impl Session {
    pub fn new(credential: Option<ApiKey>) -> Self {
        Self {
            id: Uuid::new_v4(),
            credential,
            state: SessionState::Idle,
            last_error: None,
            draft: None,
        }
    }

    /// Idle → FormEntry. A supplied credential replaces the stored one.
    pub fn select_scenario(
        &mut self,
        scenario: Scenario,
        credential: Option<ApiKey>,
    ) -> Result<(), AppError> {
        match self.state {
            SessionState::Idle => {
                if credential.is_some() {
                    self.credential = credential;
                }
                self.state = SessionState::FormEntry { scenario };
                self.last_error = None;
                self.draft = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("select a scenario")),
        }
    }

    /// FormEntry → Idle.
    pub fn back(&mut self) -> Result<(), AppError> {
        match self.state {
            SessionState::FormEntry { .. } => {
                self.state = SessionState::Idle;
                self.last_error = None;
                self.draft = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("go back")),
        }
    }

    /// Stays in FormEntry with a validation message and the rejected answers.
    pub fn reject_draft(
        &mut self,
        message: String,
        fields: AssessmentFields,
    ) -> Result<(), AppError> {
        match self.state {
            SessionState::FormEntry { .. } => {
                self.last_error = Some(message);
                self.draft = Some(fields);
                Ok(())
            }
            SessionState::Submitting { .. } => Err(AppError::Conflict(
                "A report is already being generated for this session".into(),
            )),
            _ => Err(self.invalid_transition("submit")),
        }
    }

    /// FormEntry → Submitting. Returns the scenario being submitted.
    pub fn begin_submission(&mut self) -> Result<Scenario, AppError> {
        match self.state {
            SessionState::FormEntry { scenario } => {
                self.state = SessionState::Submitting { scenario };
                self.last_error = None;
                Ok(scenario)
            }
            SessionState::Submitting { .. } => Err(AppError::Conflict(
                "A report is already being generated for this session".into(),
            )),
            _ => Err(self.invalid_transition("submit")),
        }
    }

    /// Submitting → Viewing.
    pub fn complete_submission(&mut self, report: GeneratedReport) -> Result<(), AppError> {
        match self.state {
            SessionState::Submitting { scenario } => {
                self.state = SessionState::Viewing {
                    scenario,
                    report: Arc::new(report),
                };
                self.draft = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("complete a submission")),
        }
    }

    /// Submitting → FormEntry, keeping the answers and the error message.
    pub fn fail_submission(
        &mut self,
        message: String,
        fields: AssessmentFields,
    ) -> Result<(), AppError> {
        match self.state {
            SessionState::Submitting { scenario } => {
                self.state = SessionState::FormEntry { scenario };
                self.last_error = Some(message);
                self.draft = Some(fields);
                Ok(())
            }
            _ => Err(self.invalid_transition("fail a submission")),
        }
    }

    /// Viewing → Idle. The report is dropped, the credential is kept.
    pub fn reset(&mut self) -> Result<(), AppError> {
        match self.state {
            SessionState::Viewing { .. } => {
                self.state = SessionState::Idle;
                self.last_error = None;
                self.draft = None;
                Ok(())
            }
            _ => Err(self.invalid_transition("start a new case")),
        }
    }

    pub fn report(&self) -> Option<&Arc<GeneratedReport>> {
        match &self.state {
            SessionState::Viewing { report, .. } => Some(report),
            _ => None,
        }
    }

    /// Risk tier of the current report, `Unknown` until one exists.
    pub fn risk_level(&self) -> RiskLevel {
        self.report()
            .map(|report| report.risk_level)
            .unwrap_or(RiskLevel::Unknown)
    }

    fn invalid_transition(&self, action: &str) -> AppError {
        AppError::Conflict(format!(
            "Cannot {action} while the session is {}",
            self.state.name()
        ))
    }
}

/// In-memory session registry. Nothing outlives the process.
///
/// Sessions idle longer than `ttl` are dropped by [`SessionStore::sweep`];
/// at `capacity` the least recently touched one makes room for a new one.
/// A session in `Submitting` is never evicted.
#[derive(Debug, Clone)]
pub struct SessionStore {
    inner: Arc<RwLock<HashMap<Uuid, Entry>>>,
    ttl: Duration,
    capacity: usize,
}

#[derive(Debug)]
struct Entry {
    session: Session,
    touched: Instant,
}

impl Entry {
    fn evictable(&self) -> bool {
        !matches!(self.session.state, SessionState::Submitting { .. })
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new(DEFAULT_SESSION_TTL, DEFAULT_MAX_SESSIONS)
    }
}

pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(60 * 60);
pub const DEFAULT_MAX_SESSIONS: usize = 10_000;

impl SessionStore {
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            inner: Arc::default(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    pub fn create(&self, credential: Option<ApiKey>) -> Uuid {
        let session = Session::new(credential);
        let id = session.id;
        let now = Instant::now();

        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        if sessions.len() >= self.capacity {
            let expired = remove_expired(&mut sessions, now, self.ttl);
            if expired > 0 {
                tracing::info!(evicted = expired, "Expired sessions removed");
            }
        }
        if sessions.len() >= self.capacity {
            let oldest = sessions
                .iter()
                .filter(|(_, entry)| entry.evictable())
                .min_by_key(|(_, entry)| entry.touched)
                .map(|(id, _)| *id);
            if let Some(oldest) = oldest {
                sessions.remove(&oldest);
                tracing::info!(session.id = %oldest, "Session evicted at capacity");
            }
        }
        sessions.insert(
            id,
            Entry {
                session,
                touched: now,
            },
        );
        drop(sessions);

        tracing::debug!(session.id = %id, "Session created");
        id
    }

    /// Snapshot of a session. Counts as activity.
    pub fn get(&self, id: Uuid) -> Result<Session, AppError> {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        entry.touched = Instant::now();
        Ok(entry.session.clone())
    }

    /// Applies `f` under the write lock; state changes only stick when `f`
    /// returns `Ok`.
    pub fn update<T>(
        &self,
        id: Uuid,
        f: impl FnOnce(&mut Session) -> Result<T, AppError>,
    ) -> Result<T, AppError> {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let entry = sessions
            .get_mut(&id)
            .ok_or_else(|| AppError::NotFound(format!("session {id}")))?;
        entry.touched = Instant::now();
        let session = &mut entry.session;

        let before = session.state.name();
        let result = f(session)?;
        let after = session.state.name();
        if before != after {
            tracing::info!(session.id = %id, from = before, to = after, "Session transition");
        }
        Ok(result)
    }

    /// Drops sessions idle for longer than the TTL; returns how many went.
    pub fn sweep(&self) -> usize {
        let mut sessions = self.inner.write().unwrap_or_else(PoisonError::into_inner);
        let removed = remove_expired(&mut sessions, Instant::now(), self.ttl);
        if removed > 0 {
            tracing::info!(evicted = removed, remaining = sessions.len(), "Expired sessions removed");
        }
        removed
    }

    pub fn len(&self) -> usize {
        self.inner.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn remove_expired(sessions: &mut HashMap<Uuid, Entry>, now: Instant, ttl: Duration) -> usize {
    let before = sessions.len();
    sessions.retain(|_, entry| !entry.evictable() || now.duration_since(entry.touched) <= ttl);
    before - sessions.len()
}
