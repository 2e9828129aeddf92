//! Wire types for the Sherpa annotation API
//!
//! All response types are tolerant of extra fields: anything the dashboard
//! does not interpret is captured in `extra` so the raw JSON panels can show
//! the document exactly as the server returned it.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A named workspace on the annotation server
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Project {
    /// API key for the project
    pub name: String,
    /// Display name shown in select lists
    pub label: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A single annotation component, or a multi-step plan
///
/// The `annotators_by_type` response partitions these by type; the client
/// tags each surviving entry with its source type when flattening.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Annotator {
    pub name: String,
    pub label: Option<String>,
    /// Source type (`learner`, `plan`, `gazetteer`, ...); filled in by the
    /// client, absent on the wire
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// User-flagged favorite
    #[serde(default)]
    pub favorite: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Annotator {
    /// True for a plan-type annotator whose parameters carry a converter
    pub fn has_converter(&self) -> bool {
        self.kind.as_deref() == Some("plan")
            && self
                .parameters
                .as_ref()
                .map(|p| p.get("converter").is_some())
                .unwrap_or(false)
    }

    /// True for a plan-type annotator whose parameters carry a formatter
    pub fn has_formatter(&self) -> bool {
        self.kind.as_deref() == Some("plan")
            && self
                .parameters
                .as_ref()
                .map(|p| p.get("formatter").is_some())
                .unwrap_or(false)
    }
}

/// Full plan definition, as returned by `GET .../plans/{name}`
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Plan {
    pub name: String,
    pub label: Option<String>,
    #[serde(default)]
    pub parameters: PlanParameters,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Plan parameters: the ordered annotation pipeline plus optional
/// converter/formatter configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PlanParameters {
    #[serde(default)]
    pub pipeline: Vec<PipelineStep>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub converter: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub formatter: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One step of a plan's pipeline
///
/// `project_name` of `"."` means "this project"; the client rewrites it to
/// the owning project when fetching the plan.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct PipelineStep {
    #[serde(rename = "projectName", default, skip_serializing_if = "Option::is_none")]
    pub project_name: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A named annotation category with display metadata
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Label {
    pub name: String,
    pub label: Option<String>,
    /// Display color (CSS); absent labels render with the default color
    #[serde(default)]
    pub color: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Document returned by the `_annotate` endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AnnotatedDocument {
    pub text: String,
    #[serde(default)]
    pub annotations: Vec<Annotation>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A half-open character range `[start, end)` over the document text
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Annotation {
    pub start: usize,
    pub end: usize,
    #[serde(rename = "labelName")]
    pub label_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A document-level classification result
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Category {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(rename = "labelName", default)]
    pub label_name: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Anything with an API name and a human display label
pub trait Labeled {
    fn name(&self) -> &str;
    /// Display label, falling back to the API name when none is set
    fn display_label(&self) -> &str;
}

macro_rules! impl_labeled {
    ($($t:ty),*) => {
        $(impl Labeled for $t {
            fn name(&self) -> &str {
                &self.name
            }
            fn display_label(&self) -> &str {
                self.label.as_deref().unwrap_or(&self.name)
            }
        })*
    };
}

impl_labeled!(Project, Annotator, Plan, Label);

/// Turn a UI selection (display label) back into the matching item.
///
/// Returns `None` when no item carries the label; labels are assumed unique
/// per list, the first match wins.
pub fn resolve_by_label<'a, T: Labeled>(items: &'a [T], label: &str) -> Option<&'a T> {
    items.iter().find(|item| item.display_label() == label)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn project(name: &str, label: Option<&str>) -> Project {
        Project {
            name: name.to_string(),
            label: label.map(|s| s.to_string()),
            extra: Map::new(),
        }
    }

    #[test]
    fn resolve_by_label_finds_unique_match() {
        let projects = vec![
            project("demo", Some("Demo Project")),
            project("legal", Some("Legal Corpus")),
        ];

        let found = resolve_by_label(&projects, "Legal Corpus").unwrap();
        assert_eq!(found.name, "legal");
    }

    #[test]
    fn resolve_by_label_returns_none_for_unknown_label() {
        let projects = vec![project("demo", Some("Demo Project"))];
        assert!(resolve_by_label(&projects, "Missing").is_none());
    }

    #[test]
    fn display_label_falls_back_to_name() {
        let p = project("demo", None);
        assert_eq!(p.display_label(), "demo");
        assert!(resolve_by_label(std::slice::from_ref(&p), "demo").is_some());
    }

    #[test]
    fn annotator_tolerates_extra_fields_and_defaults() {
        let json = serde_json::json!({
            "name": "ner",
            "label": "NER model",
            "uuid": "abc-123",
            "engine": "crf"
        });
        let ann: Annotator = serde_json::from_value(json).unwrap();
        assert_eq!(ann.name, "ner");
        assert!(!ann.favorite);
        assert!(ann.kind.is_none());
        assert_eq!(ann.extra.get("engine").unwrap(), "crf");
    }

    #[test]
    fn converter_and_formatter_detection() {
        let mut ann: Annotator = serde_json::from_value(serde_json::json!({
            "name": "pdf_plan",
            "label": "PDF plan",
            "parameters": {"pipeline": [], "converter": {"name": "tika"}}
        }))
        .unwrap();
        // Not a plan yet: type tag missing
        assert!(!ann.has_converter());

        ann.kind = Some("plan".to_string());
        assert!(ann.has_converter());
        assert!(!ann.has_formatter());
    }

    #[test]
    fn document_round_trips_unknown_fields() {
        let json = serde_json::json!({
            "text": "Sundar Pichai is the CEO of Google.",
            "annotations": [
                {"start": 0, "end": 13, "labelName": "PERSON", "score": 0.99}
            ],
            "categories": [],
            "sourceText": "raw"
        });
        let doc: AnnotatedDocument = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(doc.annotations.len(), 1);
        assert_eq!(doc.annotations[0].label_name, "PERSON");

        let back = serde_json::to_value(&doc).unwrap();
        assert_eq!(back["sourceText"], "raw");
        assert_eq!(back["annotations"][0]["score"], 0.99);
    }
}
