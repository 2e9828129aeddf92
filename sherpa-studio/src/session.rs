//! Per-browser session state
//!
//! One `Session` per connected browser, created on successful login and
//! destroyed on disconnect. The selection flow is re-entrant: changing an
//! earlier selection resets everything downstream of it so annotations are
//! never shown against a stale selection.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sherpa_common::models::{AnnotatedDocument, Annotator, Label, Plan, Project};
use std::collections::HashMap;
use std::sync::Mutex;
use uuid::Uuid;

/// Where a session stands in the selection flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPhase {
    Authenticated,
    ProjectSelected,
    AnnotatorSelected,
    Annotated,
}

/// Transient state of one connected user
#[derive(Debug, Clone)]
pub struct Session {
    pub id: Uuid,
    pub created_at: DateTime<Utc>,
    pub server: String,
    pub token: String,
    pub project: Option<Project>,
    pub annotator: Option<Annotator>,
    /// Resolved label mapping for the selected annotator
    pub labels: HashMap<String, Label>,
    /// Full plan definition when the selected annotator is a plan
    pub plan: Option<Plan>,
    pub document: Option<AnnotatedDocument>,
    /// Notice from the last failed call, shown once in the UI
    pub last_error: Option<String>,
}

impl Session {
    pub fn new(server: String, token: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_at: Utc::now(),
            server,
            token,
            project: None,
            annotator: None,
            labels: HashMap::new(),
            plan: None,
            document: None,
            last_error: None,
        }
    }

    /// Derived phase; a session only exists once authenticated
    pub fn phase(&self) -> SessionPhase {
        if self.document.is_some() {
            SessionPhase::Annotated
        } else if self.annotator.is_some() {
            SessionPhase::AnnotatorSelected
        } else if self.project.is_some() {
            SessionPhase::ProjectSelected
        } else {
            SessionPhase::Authenticated
        }
    }

    /// Select a project; resets annotator, labels, plan, and document
    pub fn select_project(&mut self, project: Project) {
        self.project = Some(project);
        self.annotator = None;
        self.labels.clear();
        self.plan = None;
        self.document = None;
        self.last_error = None;
    }

    /// Select an annotator with its resolved labels; resets the document
    pub fn select_annotator(
        &mut self,
        annotator: Annotator,
        labels: HashMap<String, Label>,
        plan: Option<Plan>,
    ) {
        self.annotator = Some(annotator);
        self.labels = labels;
        self.plan = plan;
        self.document = None;
        self.last_error = None;
    }

    pub fn set_document(&mut self, document: AnnotatedDocument) {
        self.document = Some(document);
        self.last_error = None;
    }

    /// A failed annotate call reverts to the annotator-selected state
    pub fn fail_annotation(&mut self, notice: String) {
        self.document = None;
        self.last_error = Some(notice);
    }
}

/// Shared session store
///
/// Axum serves sessions from a shared worker pool, so the map is
/// mutex-guarded even though each individual session is driven by one
/// browser at a time.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a freshly authenticated session, returning its id
    pub fn insert(&self, session: Session) -> Uuid {
        let id = session.id;
        if let Ok(mut sessions) = self.sessions.lock() {
            sessions.insert(id, session);
        }
        id
    }

    /// Clone of the session, if it exists
    pub fn get(&self, id: &Uuid) -> Option<Session> {
        self.sessions.lock().ok()?.get(id).cloned()
    }

    /// Run a closure against the live session
    pub fn update<R>(&self, id: &Uuid, f: impl FnOnce(&mut Session) -> R) -> Option<R> {
        let mut sessions = self.sessions.lock().ok()?;
        sessions.get_mut(id).map(f)
    }

    pub fn remove(&self, id: &Uuid) -> Option<Session> {
        self.sessions.lock().ok()?.remove(id)
    }

    pub fn len(&self) -> usize {
        self.sessions.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
