//! Annotator listing and selection

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sherpa_common::models::{resolve_by_label, Annotator, Labeled};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::session::Session;
use crate::AppState;

use super::projects::SelectRequest;

#[derive(Debug, Serialize)]
pub struct AnnotatorChoice {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub favorite: bool,
}

#[derive(Debug, Serialize)]
pub struct AnnotatorListResponse {
    pub annotators: Vec<AnnotatorChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// GET /api/session/{id}/annotators
///
/// Listed for the selected project, restricted to the configured annotator
/// types and favorites. Fetch failure degrades to an empty list.
pub async fn list_annotators(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<AnnotatorListResponse>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    let Some(project) = session.project.as_ref() else {
        return Err(ApiError::BadRequest("no project selected".to_string()));
    };

    match fetch_annotators(&state, &session, &project.name).await {
        Ok(annotators) => Ok(Json(AnnotatorListResponse {
            annotators: annotators
                .iter()
                .map(|a| AnnotatorChoice {
                    name: a.name.clone(),
                    label: a.display_label().to_string(),
                    kind: a.kind.clone(),
                    favorite: a.favorite,
                })
                .collect(),
            notice: None,
        })),
        Err(e) => {
            warn!(session = %id, "Annotator list failed: {}", e);
            Ok(Json(AnnotatorListResponse {
                annotators: Vec::new(),
                notice: Some("No annotators available.".to_string()),
            }))
        }
    }
}

/// POST /api/session/{id}/annotator
///
/// Selecting by display label resolves the full label mapping (plan steps
/// plus the owning project) and, for a plan, the plan definition for the
/// raw-JSON panel. Resets any previous document.
pub async fn select_annotator(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<super::session::SessionSnapshot>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    let Some(project) = session.project.as_ref() else {
        return Err(ApiError::BadRequest("no project selected".to_string()));
    };
    let project_name = project.name.clone();

    let annotators = fetch_annotators(&state, &session, &project_name)
        .await
        .unwrap_or_default();
    let annotator = resolve_by_label(&annotators, &request.label)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("unknown annotator: {}", request.label)))?;

    // Label resolution failure is survivable: spans fall back to the
    // default color
    let labels = match state
        .client
        .full_labels(&session.server, &project_name, &annotator, &session.token)
        .await
    {
        Ok(labels) => labels,
        Err(e) => {
            warn!(session = %id, "Label resolution failed: {}", e);
            Default::default()
        }
    };

    let plan = if annotator.kind.as_deref() == Some("plan") {
        match state
            .client
            .plan(&session.server, &project_name, &annotator.name, &session.token)
            .await
        {
            Ok(plan) => Some(plan),
            Err(e) => {
                warn!(session = %id, "Plan fetch failed: {}", e);
                None
            }
        }
    } else {
        None
    };

    let snapshot = state
        .sessions
        .update(&id, |s| {
            s.select_annotator(annotator, labels, plan);
            super::session::snapshot(s, &state.config.default_text)
        })
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    Ok(Json(snapshot))
}

async fn fetch_annotators(
    state: &AppState,
    session: &Session,
    project: &str,
) -> sherpa_common::Result<Vec<Annotator>> {
    state
        .client
        .annotators(
            &session.server,
            project,
            state.config.annotator_types.as_deref(),
            state.config.favorite_only,
            &session.token,
        )
        .await
}
