//! Span-merge highlighter
//!
//! Converts a list of possibly overlapping labeled character ranges over a
//! text into an ordered, gap-filled sequence of plain/labeled segments, plus
//! an HTML rendering of those segments for the dashboard.
//!
//! Offsets are half-open character (code-point) ranges, as produced by the
//! annotation server; slicing converts through a char-index table before
//! touching the UTF-8 text.

use crate::models::{Annotation, Label};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::ops::Range;

/// Color used for labels with no configured color
pub const DEFAULT_COLOR: &str = "#333";

/// Coalescing interval map over half-open `usize` ranges.
///
/// Insertion overwrites the overlapping sub-range of prior entries
/// (last-write-wins); partially covered predecessors are split so that
/// iteration always yields non-overlapping ranges in ascending start order.
#[derive(Debug, Clone, Default)]
pub struct IntervalMap<V> {
    entries: BTreeMap<usize, Entry<V>>,
}

#[derive(Debug, Clone)]
struct Entry<V> {
    end: usize,
    value: V,
}

impl<V: Clone> IntervalMap<V> {
    pub fn new() -> Self {
        Self {
            entries: BTreeMap::new(),
        }
    }

    /// Insert `[start, end)`; the new value wins over any prior entry on
    /// the overlapping sub-range. Empty ranges are ignored.
    pub fn insert(&mut self, start: usize, end: usize, value: V) {
        if start >= end {
            return;
        }

        // Every overlapping entry begins before `end` and extends past `start`.
        let overlapping: Vec<usize> = self
            .entries
            .range(..end)
            .filter(|(_, e)| e.end > start)
            .map(|(k, _)| *k)
            .collect();

        for key in overlapping {
            let old = self.entries.remove(&key).unwrap();
            if key < start {
                // Keep the uncovered left piece
                self.entries.insert(
                    key,
                    Entry {
                        end: start,
                        value: old.value.clone(),
                    },
                );
            }
            if old.end > end {
                // Keep the uncovered right piece
                self.entries.insert(
                    end,
                    Entry {
                        end: old.end,
                        value: old.value,
                    },
                );
            }
        }

        self.entries.insert(start, Entry { end, value });
    }

    /// Non-overlapping ranges in ascending start order
    pub fn iter(&self) -> impl Iterator<Item = (Range<usize>, &V)> {
        self.entries.iter().map(|(start, e)| (*start..e.end, &e.value))
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// One displayable piece of the input text
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Segment {
    pub text: String,
    /// `None` for plain text between annotations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<SegmentLabel>,
}

/// Display metadata for a labeled segment
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SegmentLabel {
    /// Canonical label name from the annotation
    pub name: String,
    /// Human display label
    pub label: String,
    /// Resolved CSS color
    pub color: String,
}

impl Segment {
    fn plain(text: &str) -> Self {
        Segment {
            text: text.to_string(),
            label: None,
        }
    }
}

/// Convert annotations over `text` into an ordered segment sequence covering
/// the whole text exactly once.
///
/// Overlapping spans resolve last-write-wins in input order; spans past the
/// end of the text are clamped; zero-length spans contribute nothing. A
/// label name missing from `labels` renders with [`DEFAULT_COLOR`].
pub fn highlight(
    text: &str,
    spans: &[Annotation],
    labels: &HashMap<String, Label>,
) -> Vec<Segment> {
    // Byte offset of every char boundary, plus the terminating length
    let mut boundaries: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();
    boundaries.push(text.len());
    let char_len = boundaries.len() - 1;

    let mut map = IntervalMap::new();
    for span in spans {
        let start = span.start.min(char_len);
        let end = span.end.min(char_len);
        map.insert(start, end, span);
    }

    let slice = |range: &Range<usize>| &text[boundaries[range.start]..boundaries[range.end]];

    let mut segments = Vec::new();
    let mut cursor = 0usize;
    for (range, span) in map.iter() {
        if range.start > cursor {
            segments.push(Segment::plain(slice(&(cursor..range.start))));
        }
        segments.push(Segment {
            text: slice(&range).to_string(),
            label: Some(resolve_label(&span.label_name, labels)),
        });
        cursor = range.end;
    }
    if cursor < char_len || segments.is_empty() {
        segments.push(Segment::plain(slice(&(cursor..char_len))));
    }

    segments
}

fn resolve_label(name: &str, labels: &HashMap<String, Label>) -> SegmentLabel {
    match labels.get(name) {
        Some(label) => SegmentLabel {
            name: name.to_string(),
            label: label.label.clone().unwrap_or_else(|| name.to_string()),
            color: label
                .color
                .clone()
                .unwrap_or_else(|| DEFAULT_COLOR.to_string()),
        },
        None => SegmentLabel {
            name: name.to_string(),
            label: name.to_string(),
            color: DEFAULT_COLOR.to_string(),
        },
    }
}

/// Render segments as highlighted HTML in a scrollable container.
///
/// Labeled segments become `<mark>` elements with the resolved background
/// color and a small uppercase label tag.
pub fn to_html(segments: &[Segment]) -> String {
    let mut body = String::new();
    for segment in segments {
        let text = html_escape::encode_text(&segment.text);
        match &segment.label {
            Some(label) => {
                body.push_str(&format!(
                    "<mark class=\"entity\" style=\"background: {}\">{}\
                     <span class=\"entity-label\">{}</span></mark>",
                    label.color,
                    text,
                    html_escape::encode_text(&label.label),
                ));
            }
            None => body.push_str(&text),
        }
    }
    // Newlines mess with the rendering
    let body = body.replace('\n', " ");
    format!(
        "<div style=\"overflow-x: auto; border: 1px solid #e6e9ef; \
         border-radius: 0.25rem; padding: 1rem; margin-bottom: 2.5rem\">{}</div>",
        body
    )
}
