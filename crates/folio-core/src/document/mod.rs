//! Case-study documents
//!
//! A [`Document`] is typed [`Metadata`] plus a free-form markdown body.
//! Unknown frontmatter keys ride along in [`Metadata::extra`] so editing a
//! document never drops data the schema doesn't know about.

mod codec;
mod patch;

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use serde_yaml::Mapping;
use thiserror::Error;

pub use codec::{decode, encode};
pub use patch::DocumentPatch;

/// Frontmatter keys owned by the schema, in canonical order
pub const KNOWN_FIELDS: [&str; 13] = [
    "title",
    "description",
    "metric",
    "tags",
    "summary",
    "background",
    "solution",
    "decisions",
    "highlights",
    "results",
    "retrospective",
    "codeUrl",
    "demoUrl",
];

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?i)https?://[^\s/?#]+[^\s]*$").expect("static regex"));

/// Structured frontmatter of a case study
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    pub title: String,
    pub description: String,
    /// Headline metric shown on cards
    pub metric: String,
    pub tags: Vec<String>,
    pub summary: String,
    pub background: String,
    pub solution: String,
    pub decisions: Vec<String>,
    pub highlights: Vec<String>,
    pub results: String,
    pub retrospective: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub demo_url: Option<String>,
    /// Keys outside the schema, in file order
    #[serde(flatten)]
    pub extra: Mapping,
}

/// A decoded document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Document {
    pub metadata: Metadata,
    pub body: String,
}

impl Document {
    pub fn new(metadata: Metadata, body: impl Into<String>) -> Self {
        Self {
            metadata,
            body: body.into(),
        }
    }

    /// Title for commit messages and listings
    pub fn title(&self) -> &str {
        &self.metadata.title
    }

    /// Check required fields and URL shapes, reporting every problem found
    pub fn validate(&self) -> Result<(), Vec<FieldProblem>> {
        let m = &self.metadata;
        let mut problems = Vec::new();

        let required = [
            ("title", &m.title),
            ("description", &m.description),
            ("metric", &m.metric),
            ("summary", &m.summary),
            ("background", &m.background),
            ("solution", &m.solution),
            ("results", &m.results),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                problems.push(FieldProblem::new(field, "is required"));
            }
        }

        for (field, url) in [("codeUrl", &m.code_url), ("demoUrl", &m.demo_url)] {
            if let Some(url) = url {
                if !url.is_empty() && !URL_RE.is_match(url) {
                    problems.push(FieldProblem::new(field, "must be an http(s) URL"));
                }
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// One field that failed validation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldProblem {
    pub field: String,
    pub message: String,
}

impl FieldProblem {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.field, self.message)
    }
}

/// Errors decoding or encoding the stored representation
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("file is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("metadata block opened with '---' is never closed")]
    Unterminated,

    #[error("metadata is not valid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("metadata must be a key/value mapping, found {found}")]
    NotAMapping { found: &'static str },

    #[error("field '{field}' must be {expected}, found {found}")]
    FieldType {
        field: &'static str,
        expected: &'static str,
        found: &'static str,
    },
}
