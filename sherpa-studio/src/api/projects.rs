//! Project listing and selection

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sherpa_common::models::{resolve_by_label, Labeled, Project};
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct ProjectChoice {
    pub name: String,
    pub label: String,
}

#[derive(Debug, Serialize)]
pub struct ProjectListResponse {
    pub projects: Vec<ProjectChoice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// GET /api/session/{id}/projects
///
/// A failed fetch degrades to an empty select list plus a notice; the page
/// stays interactive.
pub async fn list_projects(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<ProjectListResponse>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    match fetch_projects(&state, &session.server, &session.token).await {
        Ok(projects) => Ok(Json(ProjectListResponse {
            projects: projects
                .iter()
                .map(|p| ProjectChoice {
                    name: p.name.clone(),
                    label: p.display_label().to_string(),
                })
                .collect(),
            notice: None,
        })),
        Err(e) => {
            warn!(session = %id, "Project list failed: {}", e);
            Ok(Json(ProjectListResponse {
                projects: Vec::new(),
                notice: Some("No projects available.".to_string()),
            }))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SelectRequest {
    pub label: String,
}

/// POST /api/session/{id}/project
///
/// Selecting by display label; resets every downstream selection.
pub async fn select_project(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<SelectRequest>,
) -> ApiResult<Json<super::session::SessionSnapshot>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    let projects = fetch_projects(&state, &session.server, &session.token)
        .await
        .unwrap_or_default();
    let project = resolve_by_label(&projects, &request.label)
        .cloned()
        .ok_or_else(|| ApiError::BadRequest(format!("unknown project: {}", request.label)))?;

    let snapshot = state
        .sessions
        .update(&id, |s| {
            s.select_project(project);
            super::session::snapshot(s, &state.config.default_text)
        })
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    Ok(Json(snapshot))
}

/// Memoized fetch, filtered down to the configured allow-list
async fn fetch_projects(
    state: &AppState,
    server: &str,
    token: &str,
) -> sherpa_common::Result<Vec<Project>> {
    let mut projects = state.client.projects(server, token).await?;
    if let Some(allowed) = &state.config.projects {
        projects.retain(|p| allowed.iter().any(|name| name == &p.name));
    }
    Ok(projects)
}
