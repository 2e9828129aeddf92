//! Per-call memo cache for Sherpa lookups
//!
//! Lookup operations are memoized keyed by their full argument tuple
//! (server, identifiers, token). A changed token or project misses
//! naturally; re-login and disconnect clear the table explicitly. Failed
//! calls are never cached, so a user-initiated retry with identical
//! arguments always issues a fresh request.

use crate::services::SherpaClient;
use sherpa_common::models::{AnnotatedDocument, Annotator, Label, Plan, Project};
use sherpa_common::Result;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Mutex;

/// Full argument tuple of each memoized lookup
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    Projects {
        server: String,
        token: String,
    },
    Annotators {
        server: String,
        project: String,
        types: Option<Vec<String>>,
        favorite_only: bool,
        token: String,
    },
    Labels {
        server: String,
        project: String,
        token: String,
    },
    Plan {
        server: String,
        project: String,
        name: String,
        token: String,
    },
}

/// Mutex-guarded memo table; values are JSON snapshots of the typed results
#[derive(Debug, Default)]
pub struct MemoCache {
    entries: Mutex<HashMap<CacheKey, Value>>,
}

impl MemoCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        self.entries.lock().ok()?.get(key).cloned()
    }

    pub fn put(&self, key: CacheKey, value: Value) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.insert(key, value);
        }
    }

    /// Drop everything; called on re-login and disconnect
    pub fn clear(&self) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Sherpa client with memoized lookups
///
/// Annotate calls are intentionally not memoized: each form submit is one
/// outbound call.
pub struct CachedClient {
    client: SherpaClient,
    cache: MemoCache,
}

impl CachedClient {
    pub fn new(client: SherpaClient) -> Self {
        Self {
            client,
            cache: MemoCache::new(),
        }
    }

    pub fn cache(&self) -> &MemoCache {
        &self.cache
    }

    /// Login is never cached; a successful login invalidates prior lookups
    pub async fn login(&self, server: &str, email: &str, password: &str) -> Result<String> {
        let token = self.client.login(server, email, password).await?;
        self.cache.clear();
        Ok(token)
    }

    pub async fn projects(&self, server: &str, token: &str) -> Result<Vec<Project>> {
        let key = CacheKey::Projects {
            server: server.to_string(),
            token: token.to_string(),
        };
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let projects = self.client.projects(server, token).await?;
        self.store(key, &projects);
        Ok(projects)
    }

    pub async fn annotators(
        &self,
        server: &str,
        project: &str,
        types: Option<&[String]>,
        favorite_only: bool,
        token: &str,
    ) -> Result<Vec<Annotator>> {
        let key = CacheKey::Annotators {
            server: server.to_string(),
            project: project.to_string(),
            types: types.map(|t| t.to_vec()),
            favorite_only,
            token: token.to_string(),
        };
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let annotators = self
            .client
            .annotators(server, project, types, favorite_only, token)
            .await?;
        self.store(key, &annotators);
        Ok(annotators)
    }

    pub async fn labels(
        &self,
        server: &str,
        project: &str,
        token: &str,
    ) -> Result<HashMap<String, Label>> {
        let key = CacheKey::Labels {
            server: server.to_string(),
            project: project.to_string(),
            token: token.to_string(),
        };
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let labels = self.client.labels(server, project, token).await?;
        self.store(key, &labels);
        Ok(labels)
    }

    pub async fn plan(
        &self,
        server: &str,
        project: &str,
        name: &str,
        token: &str,
    ) -> Result<Plan> {
        let key = CacheKey::Plan {
            server: server.to_string(),
            project: project.to_string(),
            name: name.to_string(),
            token: token.to_string(),
        };
        if let Some(hit) = self.lookup(&key) {
            return Ok(hit);
        }
        let plan = self.client.plan(server, project, name, token).await?;
        self.store(key, &plan);
        Ok(plan)
    }

    /// Full label resolution for an annotator; composed from the memoized
    /// plan and label lookups, current project winning on key collision.
    pub async fn full_labels(
        &self,
        server: &str,
        project: &str,
        annotator: &Annotator,
        token: &str,
    ) -> Result<HashMap<String, Label>> {
        let mut all_labels = HashMap::new();

        if annotator.kind.as_deref() == Some("plan") {
            let plan = self.plan(server, project, &annotator.name, token).await?;
            for step in &plan.parameters.pipeline {
                let Some(step_project) = step.project_name.as_deref() else {
                    continue;
                };
                if step_project == project {
                    continue;
                }
                match self.labels(server, step_project, token).await {
                    Ok(step_labels) => all_labels.extend(step_labels),
                    Err(e) => {
                        tracing::warn!(
                            project = %step_project,
                            "Skipping labels of pipeline step project: {}", e
                        );
                    }
                }
            }
        }

        all_labels.extend(self.labels(server, project, token).await?);
        Ok(all_labels)
    }

    /// Not memoized
    pub async fn annotate_text(
        &self,
        server: &str,
        project: &str,
        annotator: &str,
        text: &str,
        token: &str,
    ) -> Result<AnnotatedDocument> {
        self.client
            .annotate_text(server, project, annotator, text, token)
            .await
    }

    fn lookup<T: serde::de::DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let value = self.cache.get(key)?;
        match serde_json::from_value(value) {
            Ok(typed) => {
                tracing::debug!(?key, "Memo cache hit");
                Some(typed)
            }
            Err(_) => None,
        }
    }

    fn store<T: serde::Serialize>(&self, key: CacheKey, value: &T) {
        if let Ok(snapshot) = serde_json::to_value(value) {
            self.cache.put(key, snapshot);
        }
    }
}
