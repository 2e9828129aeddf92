//! HTTP API handlers for sherpa-studio

pub mod annotate;
pub mod annotators;
pub mod health;
pub mod projects;
pub mod session;
pub mod ui;

pub use annotate::annotate;
pub use annotators::{list_annotators, select_annotator};
pub use health::health_routes;
pub use projects::{list_projects, select_project};
pub use session::{connect, disconnect, session_state};
pub use ui::{serve_app_js, serve_index};
