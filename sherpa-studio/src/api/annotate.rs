//! Text annotation handler: the last step of the selection flow

use axum::extract::{Path, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sherpa_common::highlight::{highlight, to_html, Segment};
use sherpa_common::models::Category;
use tracing::warn;
use uuid::Uuid;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct AnnotateRequest {
    pub text: String,
}

/// Successful annotation: the raw document plus its rendered forms
#[derive(Debug, Serialize)]
pub struct AnnotateResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    pub segments: Vec<Segment>,
    pub html: String,
    pub categories: Vec<Category>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
}

/// POST /api/session/{id}/annotate
///
/// A failed remote call is a normal response with a notice and no document
/// panel; the session reverts to its annotator-selected state and the user
/// retries explicitly.
pub async fn annotate(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(request): Json<AnnotateRequest>,
) -> ApiResult<Json<AnnotateResponse>> {
    let session = state
        .sessions
        .get(&id)
        .ok_or_else(|| ApiError::NotFound(format!("session {}", id)))?;

    let Some(project) = session.project.as_ref() else {
        return Err(ApiError::BadRequest("no project selected".to_string()));
    };
    let Some(annotator) = session.annotator.as_ref() else {
        return Err(ApiError::BadRequest("no annotator selected".to_string()));
    };

    match state
        .client
        .annotate_text(
            &session.server,
            &project.name,
            &annotator.name,
            &request.text,
            &session.token,
        )
        .await
    {
        Ok(document) => {
            let segments = highlight(&document.text, &document.annotations, &session.labels);
            let html = to_html(&segments);
            let categories = document.categories.clone();
            let raw = serde_json::to_value(&document).ok();

            state.sessions.update(&id, |s| s.set_document(document));

            Ok(Json(AnnotateResponse {
                document: raw,
                segments,
                html,
                categories,
                notice: None,
            }))
        }
        Err(e) => {
            warn!(session = %id, "Annotation failed: {}", e);
            let notice = "No result. The annotate call failed; retry to issue a fresh call.";
            state
                .sessions
                .update(&id, |s| s.fail_annotation(notice.to_string()));

            Ok(Json(AnnotateResponse {
                document: None,
                segments: Vec::new(),
                html: String::new(),
                categories: Vec::new(),
                notice: Some(notice.to_string()),
            }))
        }
    }
}
