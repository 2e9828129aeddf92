//! Session lifecycle handlers: connect, state snapshot, disconnect

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::session::{Session, SessionPhase};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    /// Sherpa server URL; the configured default when absent
    #[serde(default)]
    pub server: Option<String>,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct ConnectResponse {
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub session_id: Option<Uuid>,
    /// Human notice when authentication failed; retry is allowed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// POST /api/session/connect
///
/// A failed login is a normal response, not an error status: the form stays
/// on screen and the user retries.
pub async fn connect(
    State(state): State<AppState>,
    Json(request): Json<ConnectRequest>,
) -> Json<ConnectResponse> {
    let server = request
        .server
        .filter(|s| !s.trim().is_empty())
        .unwrap_or_else(|| state.config.default_server.clone());

    match state
        .client
        .login(&server, &request.email, &request.password)
        .await
    {
        Ok(token) => {
            let session = Session::new(server, token);
            let id = state.sessions.insert(session);
            Json(ConnectResponse {
                authenticated: true,
                session_id: Some(id),
                notice: None,
            })
        }
        Err(e) => {
            warn!(server = %server, "Login failed: {}", e);
            Json(ConnectResponse {
                authenticated: false,
                session_id: None,
                notice: Some("Not logged in. Check the server URL and credentials.".to_string()),
            })
        }
    }
}

/// POST /api/session/{id}/disconnect
///
/// Drops the session and the memoized lookups, so the next connect starts
/// from a clean slate.
pub async fn disconnect(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Value>> {
    state
        .sessions
        .remove(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;
    state.client.cache().clear();
    Ok(Json(serde_json::json!({ "disconnected": true })))
}

/// One entry of the label legend, sorted by name
#[derive(Debug, Serialize)]
pub struct LabelSummary {
    pub name: String,
    pub label: String,
    pub color: String,
}

/// Full snapshot returned to the UI, including the raw JSON the expandable
/// panels display
#[derive(Debug, Serialize)]
pub struct SessionSnapshot {
    pub phase: SessionPhase,
    pub server: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub annotator: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    pub labels: Vec<LabelSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub default_text: String,
}

/// GET /api/session/{id}
pub async fn session_state(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<SessionSnapshot>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    Ok(Json(snapshot(&session, &state.config.default_text)))
}

pub(crate) fn snapshot(session: &Session, default_text: &str) -> SessionSnapshot {
    let mut labels: Vec<LabelSummary> = session
        .labels
        .values()
        .map(|l| LabelSummary {
            name: l.name.clone(),
            label: l.label.clone().unwrap_or_else(|| l.name.clone()),
            color: l
                .color
                .clone()
                .unwrap_or_else(|| sherpa_common::highlight::DEFAULT_COLOR.to_string()),
        })
        .collect();
    labels.sort_by(|a, b| a.name.cmp(&b.name));

    SessionSnapshot {
        phase: session.phase(),
        server: session.server.clone(),
        project: session
            .project
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok()),
        annotator: session
            .annotator
            .as_ref()
            .and_then(|a| serde_json::to_value(a).ok()),
        plan: session
            .plan
            .as_ref()
            .and_then(|p| serde_json::to_value(p).ok()),
        document: session
            .document
            .as_ref()
            .and_then(|d| serde_json::to_value(d).ok()),
        labels,
        last_error: session.last_error.clone(),
        default_text: default_text.to_string(),
    }
}
