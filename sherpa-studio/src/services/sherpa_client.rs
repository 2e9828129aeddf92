//! Sherpa annotation API client
//!
//! Thin authenticated REST wrappers over the remote annotation service:
//! login, project/annotator/label lookups, plan resolution, and the
//! `_annotate` family of endpoints. Transport and status failures surface
//! as typed errors; callers absorb them into empty results so the dashboard
//! stays interactive after a failed call.

use sherpa_common::models::{AnnotatedDocument, Annotator, Label, Plan, Project};
use sherpa_common::{Error, Result};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

const USER_AGENT: &str = concat!("SherpaStudio/", env!("CARGO_PKG_VERSION"));

/// Pipeline step `projectName` meaning "this project"
const CURRENT_PROJECT: &str = ".";

/// Login response body
#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    access_token: Option<String>,
}

/// Binary artifact returned by the `_annotate_format_*` endpoints
#[derive(Debug, Clone)]
pub struct Artifact {
    pub filename: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Sherpa API client
pub struct SherpaClient {
    http: reqwest::Client,
}

impl SherpaClient {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .build()?;
        Ok(Self { http })
    }

    /// POST /api/auth/login
    ///
    /// Success is a response body carrying `access_token`; a reachable
    /// server that answers without one is still an auth failure.
    pub async fn login(&self, server: &str, email: &str, password: &str) -> Result<String> {
        let url = api_url(server, "auth/login");
        let body = serde_json::json!({ "email": email, "password": password });

        let response = self
            .http
            .post(&url)
            .query(&[("loginOnly", "true")])
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Auth(format!("login transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Auth(format!("login rejected: HTTP {}", status.as_u16())));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| Error::Auth(format!("login parse error: {}", e)))?;

        match login.access_token {
            Some(token) if !token.is_empty() => {
                tracing::info!(server = %server, user = %email, "Login successful");
                Ok(token)
            }
            _ => Err(Error::Auth("login response carried no access token".to_string())),
        }
    }

    /// GET /api/projects
    pub async fn projects(&self, server: &str, token: &str) -> Result<Vec<Project>> {
        let url = api_url(server, "projects");
        let response = self.authed_get(&url, token).await?;
        let projects: Vec<Project> = check_lookup(response, "projects").await?.json().await?;
        tracing::debug!(server = %server, count = projects.len(), "Fetched projects");
        Ok(projects)
    }

    /// GET /api/projects/{project}/annotators_by_type
    ///
    /// Flattens the type-partitioned response, keeps only the requested
    /// types (all when `types` is `None`) and, if `favorite_only`, entries
    /// flagged favorite. Each surviving annotator is tagged with its source
    /// type.
    pub async fn annotators(
        &self,
        server: &str,
        project: &str,
        types: Option<&[String]>,
        favorite_only: bool,
        token: &str,
    ) -> Result<Vec<Annotator>> {
        let url = api_url(server, &format!("projects/{}/annotators_by_type", project));
        let response = self.authed_get(&url, token).await?;
        let by_type: BTreeMap<String, Vec<Annotator>> =
            check_lookup(response, "annotators").await?.json().await?;

        let mut annotators = Vec::new();
        for (kind, list) in by_type {
            if let Some(wanted) = types {
                if !wanted.iter().any(|t| t == &kind) {
                    continue;
                }
            }
            for mut annotator in list {
                if favorite_only && !annotator.favorite {
                    continue;
                }
                annotator.kind = Some(kind.clone());
                annotators.push(annotator);
            }
        }
        tracing::debug!(
            server = %server,
            project = %project,
            count = annotators.len(),
            "Fetched annotators"
        );
        Ok(annotators)
    }

    /// GET /api/projects/{project}/labels, keyed by label name
    pub async fn labels(
        &self,
        server: &str,
        project: &str,
        token: &str,
    ) -> Result<HashMap<String, Label>> {
        let url = api_url(server, &format!("projects/{}/labels", project));
        let response = self.authed_get(&url, token).await?;
        let list: Vec<Label> = check_lookup(response, "labels").await?.json().await?;
        Ok(list.into_iter().map(|l| (l.name.clone(), l)).collect())
    }

    /// GET /api/projects/{project}/plans/{name}
    ///
    /// Pipeline steps naming `"."` as their source project are rewritten to
    /// the owning project.
    pub async fn plan(
        &self,
        server: &str,
        project: &str,
        name: &str,
        token: &str,
    ) -> Result<Plan> {
        let url = api_url(server, &format!("projects/{}/plans/{}", project, name));
        let response = self.authed_get(&url, token).await?;
        let mut plan: Plan = check_lookup(response, "plan").await?.json().await?;
        for step in &mut plan.parameters.pipeline {
            if step.project_name.as_deref() == Some(CURRENT_PROJECT) {
                step.project_name = Some(project.to_string());
            }
        }
        Ok(plan)
    }

    /// POST /api/projects/{project}/annotators/{annotator}/_annotate
    ///
    /// Raw text in, annotated document out.
    pub async fn annotate_text(
        &self,
        server: &str,
        project: &str,
        annotator: &str,
        text: &str,
        token: &str,
    ) -> Result<AnnotatedDocument> {
        let url = api_url(
            server,
            &format!("projects/{}/annotators/{}/_annotate", project, annotator),
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "text/plain")
            .header("Accept", "application/json")
            .body(text.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| Error::Annotation(format!("annotate transport error: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Annotation(format!(
                "annotate rejected: HTTP {}",
                status.as_u16()
            )));
        }

        let doc: AnnotatedDocument = response
            .json()
            .await
            .map_err(|e| Error::Annotation(format!("annotate parse error: {}", e)))?;
        tracing::info!(
            project = %project,
            annotator = %annotator,
            annotations = doc.annotations.len(),
            categories = doc.categories.len(),
            "Annotation complete"
        );
        Ok(doc)
    }

    /// POST /api/projects/{project}/plans/{plan}/_annotate_format_text
    ///
    /// Raw text in, formatted binary artifact out (content type negotiated
    /// via response headers).
    pub async fn annotate_format_text(
        &self,
        server: &str,
        project: &str,
        plan: &str,
        text: &str,
        token: &str,
    ) -> Result<Artifact> {
        let url = api_url(
            server,
            &format!("projects/{}/plans/{}/_annotate_format_text", project, plan),
        );
        let response = self
            .http
            .post(&url)
            .bearer_auth(token)
            .header("Content-Type", "text/plain")
            .header("Accept", "application/octet-stream")
            .body(text.as_bytes().to_vec())
            .send()
            .await
            .map_err(|e| Error::Annotation(format!("format transport error: {}", e)))?;

        read_artifact(response).await
    }

    /// POST /api/projects/{project}/plans/{plan}/_annotate_binary
    ///
    /// File bytes in, annotated documents out.
    pub async fn annotate_binary(
        &self,
        server: &str,
        project: &str,
        plan: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
        token: &str,
    ) -> Result<Vec<AnnotatedDocument>> {
        let url = api_url(
            server,
            &format!("projects/{}/plans/{}/_annotate_binary", project, plan),
        );
        let response = self
            .post_multipart(&url, filename, content_type, data, token)
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Annotation(format!(
                "binary annotate rejected: HTTP {}",
                status.as_u16()
            )));
        }
        response
            .json()
            .await
            .map_err(|e| Error::Annotation(format!("binary annotate parse error: {}", e)))
    }

    /// POST /api/projects/{project}/plans/{plan}/_annotate_format_binary
    ///
    /// File bytes in, formatted binary artifact out.
    pub async fn annotate_format_binary(
        &self,
        server: &str,
        project: &str,
        plan: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
        token: &str,
    ) -> Result<Artifact> {
        let url = api_url(
            server,
            &format!("projects/{}/plans/{}/_annotate_format_binary", project, plan),
        );
        let response = self
            .post_multipart(&url, filename, content_type, data, token)
            .await?;
        read_artifact(response).await
    }

    async fn authed_get(&self, url: &str, token: &str) -> Result<reqwest::Response> {
        self.http
            .get(url)
            .bearer_auth(token)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| Error::Lookup(format!("transport error: {}", e)))
    }

    async fn post_multipart(
        &self,
        url: &str,
        filename: &str,
        content_type: &str,
        data: Vec<u8>,
        token: &str,
    ) -> Result<reqwest::Response> {
        let part = reqwest::multipart::Part::bytes(data)
            .file_name(filename.to_string())
            .mime_str(content_type)
            .map_err(|e| Error::Annotation(format!("invalid content type: {}", e)))?;
        let form = reqwest::multipart::Form::new().part("file", part);

        self.http
            .post(url)
            .bearer_auth(token)
            .multipart(form)
            .send()
            .await
            .map_err(|e| Error::Annotation(format!("multipart transport error: {}", e)))
    }
}

/// Build `{server}/api/{path}`, tolerating a trailing slash on the server URL
fn api_url(server: &str, path: &str) -> String {
    format!("{}/api/{}", server.trim_end_matches('/'), path)
}

/// Map a non-success lookup response to `Error::Auth` (401) or
/// `Error::Lookup` (anything else)
async fn check_lookup(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
    let status = response.status();
    if status == reqwest::StatusCode::UNAUTHORIZED {
        return Err(Error::Auth(format!("{}: HTTP 401", what)));
    }
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        return Err(Error::Lookup(format!(
            "{}: HTTP {}: {}",
            what,
            status.as_u16(),
            text
        )));
    }
    Ok(response)
}

/// Read a binary artifact response: body plus `Content-Type` and the
/// filename from `Content-Disposition` (defaulting to `file`)
async fn read_artifact(response: reqwest::Response) -> Result<Artifact> {
    let status = response.status();
    if !status.is_success() {
        return Err(Error::Annotation(format!(
            "format rejected: HTTP {}",
            status.as_u16()
        )));
    }

    let content_type = response
        .headers()
        .get("Content-Type")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("application/octet-stream")
        .to_string();
    let filename = response
        .headers()
        .get("Content-Disposition")
        .and_then(|v| v.to_str().ok())
        .and_then(filename_from_content_disposition)
        .unwrap_or_else(|| "file".to_string());
    let data = response
        .bytes()
        .await
        .map_err(|e| Error::Annotation(format!("artifact read error: {}", e)))?
        .to_vec();

    Ok(Artifact {
        filename,
        content_type,
        data,
    })
}

/// Extract the `filename` parameter from a `Content-Disposition` header value
pub fn filename_from_content_disposition(header: &str) -> Option<String> {
    header.split(';').map(str::trim).find_map(|param| {
        let value = param.strip_prefix("filename=")?;
        Some(value.trim_matches('"').to_string())
    })
}
