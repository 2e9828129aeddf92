//! sherpa-studio library - browser demo dashboard for a Sherpa annotation
//! server
//!
//! Serves a single-page UI plus a JSON API driving the selection flow:
//! connect, pick a project, pick a plan/annotator, annotate text, render the
//! highlighted result.

use axum::Router;
use sherpa_common::config::StudioConfig;
use std::sync::Arc;

pub mod api;
pub mod cache;
pub mod error;
pub mod services;
pub mod session;

use cache::CachedClient;
use session::SessionStore;

/// Application state shared across HTTP handlers
#[derive(Clone)]
pub struct AppState {
    /// Resolved dashboard configuration
    pub config: Arc<StudioConfig>,
    /// Sherpa client with memoized lookups
    pub client: Arc<CachedClient>,
    /// Live sessions, one per connected browser
    pub sessions: Arc<SessionStore>,
}

impl AppState {
    pub fn new(config: StudioConfig, client: CachedClient) -> Self {
        Self {
            config: Arc::new(config),
            client: Arc::new(client),
            sessions: Arc::new(SessionStore::new()),
        }
    }
}

/// Build application router
pub fn build_router(state: AppState) -> Router {
    use axum::routing::{get, post};

    Router::new()
        .route("/", get(api::serve_index))
        .route("/static/app.js", get(api::serve_app_js))
        .merge(api::health_routes())
        .route("/api/session/connect", post(api::connect))
        .route("/api/session/:id", get(api::session_state))
        .route("/api/session/:id/disconnect", post(api::disconnect))
        .route("/api/session/:id/projects", get(api::list_projects))
        .route("/api/session/:id/project", post(api::select_project))
        .route("/api/session/:id/annotators", get(api::list_annotators))
        .route("/api/session/:id/annotator", post(api::select_annotator))
        .route("/api/session/:id/annotate", post(api::annotate))
        .with_state(state)
}
