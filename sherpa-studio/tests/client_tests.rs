//! Client, cache, and flow integration tests against an in-process mock of
//! the Sherpa API
//!
//! The mock server binds an ephemeral port and counts calls per endpoint so
//! the memoization contract is observable: identical lookups hit the cache,
//! changed arguments and explicit invalidation issue fresh calls.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use sherpa_studio::cache::CachedClient;
use sherpa_studio::services::SherpaClient;

#[derive(Clone, Default)]
struct MockState {
    projects_calls: Arc<AtomicUsize>,
    labels_demo_calls: Arc<AtomicUsize>,
}

async fn mock_login(Json(body): Json<Value>) -> Response {
    if body["email"] == "alice@example.com" && body["password"] == "secret" {
        Json(json!({ "access_token": "tok-123" })).into_response()
    } else {
        (StatusCode::UNAUTHORIZED, Json(json!({ "error": "bad credentials" }))).into_response()
    }
}

async fn mock_login_without_token() -> Json<Value> {
    // Reachable server, 200 response, but no access_token field
    Json(json!({ "message": "please use SSO" }))
}

async fn mock_projects(State(state): State<MockState>) -> Json<Value> {
    state.projects_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        { "name": "demo", "label": "Demo Project" },
        { "name": "hidden", "label": "Hidden Project" }
    ]))
}

async fn mock_annotators_by_type() -> Json<Value> {
    Json(json!({
        "learner": [
            { "name": "ner", "label": "NER model" }
        ],
        "plan": [
            { "name": "full_plan", "label": "Full plan", "favorite": true },
            { "name": "draft_plan", "label": "Draft plan" }
        ]
    }))
}

async fn mock_demo_labels(State(state): State<MockState>) -> Json<Value> {
    state.labels_demo_calls.fetch_add(1, Ordering::SeqCst);
    Json(json!([
        { "name": "PERSON", "label": "Person", "color": "#aa9cfc" }
    ]))
}

async fn mock_shared_labels() -> Json<Value> {
    Json(json!([
        { "name": "PERSON", "label": "Shared Person", "color": "#ff0000" },
        { "name": "ORG", "label": "Organization", "color": "#7aecec" }
    ]))
}

async fn mock_full_plan() -> Json<Value> {
    Json(json!({
        "name": "full_plan",
        "label": "Full plan",
        "parameters": {
            "pipeline": [
                { "projectName": "shared" },
                { "projectName": "." }
            ]
        }
    }))
}

async fn mock_annotate(text: String) -> Json<Value> {
    Json(json!({
        "text": text,
        "annotations": [
            { "start": 0, "end": 13, "labelName": "PERSON" }
        ],
        "categories": [
            { "label": "News", "labelName": "news", "score": 0.87 }
        ]
    }))
}

async fn mock_annotate_broken() -> Response {
    (StatusCode::BAD_GATEWAY, "upstream worker died").into_response()
}

async fn mock_annotate_format_text(text: String) -> Response {
    (
        [
            ("content-type", "application/vnd.ms-excel"),
            ("content-disposition", "attachment; filename=\"result.xlsx\""),
        ],
        text.into_bytes(),
    )
        .into_response()
}

async fn mock_annotate_binary(body: axum::body::Bytes) -> Response {
    // Multipart framing is opaque here; a non-empty upload is enough
    if body.is_empty() {
        return (StatusCode::BAD_REQUEST, "empty upload").into_response();
    }
    Json(json!([
        {
            "text": "Sundar Pichai is the CEO of Google.",
            "annotations": [
                { "start": 0, "end": 13, "labelName": "PERSON" }
            ]
        }
    ]))
    .into_response()
}

/// Spawn the mock Sherpa server; returns its base URL and call counters
async fn spawn_mock() -> (String, MockState) {
    let state = MockState::default();
    let router = Router::new()
        .route("/api/auth/login", post(mock_login))
        .route("/api/projects", get(mock_projects))
        .route("/api/projects/demo/annotators_by_type", get(mock_annotators_by_type))
        .route("/api/projects/demo/labels", get(mock_demo_labels))
        .route("/api/projects/shared/labels", get(mock_shared_labels))
        .route("/api/projects/demo/plans/full_plan", get(mock_full_plan))
        .route("/api/projects/demo/annotators/ner/_annotate", post(mock_annotate))
        .route("/api/projects/demo/annotators/broken/_annotate", post(mock_annotate_broken))
        .route(
            "/api/projects/demo/plans/full_plan/_annotate_format_text",
            post(mock_annotate_format_text),
        )
        .route(
            "/api/projects/demo/plans/full_plan/_annotate_binary",
            post(mock_annotate_binary),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}", addr), state)
}

fn client() -> SherpaClient {
    SherpaClient::new(5).unwrap()
}

// =============================================================================
// Login
// =============================================================================

#[tokio::test]
async fn login_returns_token_for_valid_credentials() {
    let (server, _) = spawn_mock().await;

    let token = client()
        .login(&server, "alice@example.com", "secret")
        .await
        .unwrap();
    assert_eq!(token, "tok-123");
}

#[tokio::test]
async fn login_with_bad_credentials_is_an_auth_error() {
    let (server, _) = spawn_mock().await;

    let err = client()
        .login(&server, "alice@example.com", "wrong")
        .await
        .unwrap_err();
    assert!(matches!(err, sherpa_common::Error::Auth(_)));
}

#[tokio::test]
async fn login_response_without_token_is_an_auth_error() {
    let router = Router::new().route("/api/auth/login", post(mock_login_without_token));
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    let err = client()
        .login(&format!("http://{}", addr), "alice@example.com", "secret")
        .await
        .unwrap_err();
    assert!(matches!(err, sherpa_common::Error::Auth(_)));
}

// =============================================================================
// Lookups and memoization
// =============================================================================

#[tokio::test]
async fn identical_project_lookups_are_served_from_cache() {
    let (server, mock) = spawn_mock().await;
    let cached = CachedClient::new(client());

    let first = cached.projects(&server, "tok-123").await.unwrap();
    let second = cached.projects(&server, "tok-123").await.unwrap();

    assert_eq!(first.len(), 2);
    assert_eq!(second.len(), 2);
    // Second identical call: no second network round-trip
    assert_eq!(mock.projects_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn changed_token_misses_the_cache() {
    let (server, mock) = spawn_mock().await;
    let cached = CachedClient::new(client());

    cached.projects(&server, "tok-123").await.unwrap();
    cached.projects(&server, "tok-456").await.unwrap();

    assert_eq!(mock.projects_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn relogin_invalidates_the_cache() {
    let (server, mock) = spawn_mock().await;
    let cached = CachedClient::new(client());

    cached.projects(&server, "tok-123").await.unwrap();
    assert!(!cached.cache().is_empty());

    cached
        .login(&server, "alice@example.com", "secret")
        .await
        .unwrap();
    assert!(cached.cache().is_empty());

    cached.projects(&server, "tok-123").await.unwrap();
    assert_eq!(mock.projects_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn failed_lookup_is_not_cached() {
    let (server, mock) = spawn_mock().await;
    let cached = CachedClient::new(client());

    // "missing" project has no labels route: both calls must hit the network
    assert!(cached.labels(&server, "missing", "tok-123").await.is_err());
    assert!(cached.labels(&server, "missing", "tok-123").await.is_err());
    assert!(cached.cache().is_empty());

    // Sanity: successful demo lookups still memoize
    cached.labels(&server, "demo", "tok-123").await.unwrap();
    cached.labels(&server, "demo", "tok-123").await.unwrap();
    assert_eq!(mock.labels_demo_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn annotators_filter_by_type_and_favorite() {
    let (server, _) = spawn_mock().await;
    let c = client();

    let learners = c
        .annotators(&server, "demo", Some(&["learner".to_string()]), false, "tok-123")
        .await
        .unwrap();
    assert_eq!(learners.len(), 1);
    assert_eq!(learners[0].name, "ner");
    assert_eq!(learners[0].kind.as_deref(), Some("learner"));

    let favorites = c
        .annotators(&server, "demo", None, true, "tok-123")
        .await
        .unwrap();
    assert_eq!(favorites.len(), 1);
    assert_eq!(favorites[0].name, "full_plan");

    let all = c.annotators(&server, "demo", None, false, "tok-123").await.unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn plan_rewrites_current_project_marker() {
    let (server, _) = spawn_mock().await;

    let plan = client()
        .plan(&server, "demo", "full_plan", "tok-123")
        .await
        .unwrap();

    let sources: Vec<_> = plan
        .parameters
        .pipeline
        .iter()
        .map(|s| s.project_name.as_deref().unwrap())
        .collect();
    assert_eq!(sources, vec!["shared", "demo"]);
}

#[tokio::test]
async fn full_labels_merge_prefers_current_project() {
    let (server, _) = spawn_mock().await;
    let cached = CachedClient::new(client());

    let annotators = cached
        .annotators(&server, "demo", None, false, "tok-123")
        .await
        .unwrap();
    let plan_annotator = annotators.iter().find(|a| a.name == "full_plan").unwrap();

    let labels = cached
        .full_labels(&server, "demo", plan_annotator, "tok-123")
        .await
        .unwrap();

    // ORG comes from the step project, PERSON collides and demo wins
    assert_eq!(labels.len(), 2);
    assert_eq!(labels["ORG"].color.as_deref(), Some("#7aecec"));
    assert_eq!(labels["PERSON"].color.as_deref(), Some("#aa9cfc"));
    assert_eq!(labels["PERSON"].label.as_deref(), Some("Person"));
}

// =============================================================================
// Annotation end-to-end
// =============================================================================

#[tokio::test]
async fn annotate_and_highlight_end_to_end() {
    let (server, _) = spawn_mock().await;
    let cached = CachedClient::new(client());

    let labels = cached.labels(&server, "demo", "tok-123").await.unwrap();
    let doc = cached
        .annotate_text(
            &server,
            "demo",
            "ner",
            "Sundar Pichai is the CEO of Google.",
            "tok-123",
        )
        .await
        .unwrap();

    let segments = sherpa_common::highlight(&doc.text, &doc.annotations, &labels);

    assert_eq!(segments.len(), 2);
    assert_eq!(segments[0].text, "Sundar Pichai");
    let label = segments[0].label.as_ref().unwrap();
    assert_eq!(label.name, "PERSON");
    assert_eq!(label.color, "#aa9cfc");
    assert_eq!(segments[1].text, " is the CEO of Google.");
    assert!(segments[1].label.is_none());

    assert_eq!(doc.categories.len(), 1);
    assert_eq!(doc.categories[0].score, Some(0.87));
}

#[tokio::test]
async fn annotate_format_text_returns_named_artifact() {
    let (server, _) = spawn_mock().await;

    let artifact = client()
        .annotate_format_text(&server, "demo", "full_plan", "some text", "tok-123")
        .await
        .unwrap();

    assert_eq!(artifact.filename, "result.xlsx");
    assert_eq!(artifact.content_type, "application/vnd.ms-excel");
    assert_eq!(artifact.data, b"some text");
}

#[tokio::test]
async fn annotate_binary_uploads_and_parses_documents() {
    let (server, _) = spawn_mock().await;

    let docs = client()
        .annotate_binary(
            &server,
            "demo",
            "full_plan",
            "input.txt",
            "text/plain",
            b"Sundar Pichai is the CEO of Google.".to_vec(),
            "tok-123",
        )
        .await
        .unwrap();

    assert_eq!(docs.len(), 1);
    assert_eq!(docs[0].annotations[0].label_name, "PERSON");
}

#[tokio::test]
async fn failed_annotate_is_an_annotation_error() {
    let (server, _) = spawn_mock().await;

    let err = client()
        .annotate_text(&server, "demo", "broken", "hello", "tok-123")
        .await
        .unwrap_err();
    assert!(matches!(err, sherpa_common::Error::Annotation(_)));
}

// =============================================================================
// Full dashboard flow through the studio router
// =============================================================================

mod flow {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use sherpa_common::config::StudioConfig;
    use sherpa_studio::{build_router, AppState};
    use tower::util::ServiceExt;

    async fn json_of(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    #[tokio::test]
    async fn connect_select_annotate_renders_highlights() {
        let (server, mock) = spawn_mock().await;

        let config = StudioConfig {
            default_server: server.clone(),
            // Allow-list hides the second project from the select list
            projects: Some(vec!["demo".to_string()]),
            timeout_secs: 5,
            ..StudioConfig::default()
        };
        let app = build_router(AppState::new(
            config,
            CachedClient::new(SherpaClient::new(5).unwrap()),
        ));

        // Connect
        let response = app
            .clone()
            .oneshot(post_json(
                "/api/session/connect",
                json!({ "email": "alice@example.com", "password": "secret" }),
            ))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["authenticated"], true);
        let session_id = body["session_id"].as_str().unwrap().to_string();

        // Project list honors the allow-list
        let response = app
            .clone()
            .oneshot(get(&format!("/api/session/{}/projects", session_id)))
            .await
            .unwrap();
        let body = json_of(response).await;
        let projects = body["projects"].as_array().unwrap();
        assert_eq!(projects.len(), 1);
        assert_eq!(projects[0]["label"], "Demo Project");

        // Select project by display label
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/session/{}/project", session_id),
                json!({ "label": "Demo Project" }),
            ))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["phase"], "project_selected");

        // Select the learner annotator
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/session/{}/annotator", session_id),
                json!({ "label": "NER model" }),
            ))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["phase"], "annotator_selected");
        assert_eq!(body["labels"][0]["name"], "PERSON");

        // Annotate
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/session/{}/annotate", session_id),
                json!({ "text": "Sundar Pichai is the CEO of Google." }),
            ))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["segments"][0]["text"], "Sundar Pichai");
        assert_eq!(body["segments"][0]["label"]["name"], "PERSON");
        assert_eq!(body["segments"][1]["text"], " is the CEO of Google.");
        assert!(body["html"].as_str().unwrap().contains("background: #aa9cfc"));
        assert_eq!(body["categories"][0]["label"], "News");

        // The cascading fetches hit the project list exactly once
        assert_eq!(mock.projects_calls.load(Ordering::SeqCst), 1);

        // Session snapshot reflects the annotated phase
        let response = app
            .clone()
            .oneshot(get(&format!("/api/session/{}", session_id)))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["phase"], "annotated");
        assert_eq!(body["document"]["annotations"][0]["labelName"], "PERSON");

        // Disconnect drops the session
        let response = app
            .clone()
            .oneshot(post_json(
                &format!("/api/session/{}/disconnect", session_id),
                json!({}),
            ))
            .await
            .unwrap();
        let body = json_of(response).await;
        assert_eq!(body["disconnected"], true);

        let response = app
            .clone()
            .oneshot(get(&format!("/api/session/{}", session_id)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
