//! Frontmatter codec
//!
//! On-disk layout of a document:
//!
//! ```text
//! ---
//! title: Ising Model Simulator
//! tags:
//! - physics
//! ---
//! Body text, kept byte-for-byte.
//! ```
//!
//! Known fields are written first in schema order, then unknown fields in
//! the order they were read.

use serde_yaml::{Mapping, Value};
use tracing::debug;

use super::{Document, DocumentError, Metadata, KNOWN_FIELDS};

const DELIMITER: &str = "---";

/// Parse a stored file into metadata and body.
///
/// A file without a leading `---` line has empty metadata and is all body.
pub fn decode(raw: &[u8]) -> Result<Document, DocumentError> {
    let text = std::str::from_utf8(raw)?;
    let (header, body) = split_frontmatter(text)?;
    let mapping = match header {
        Some(yaml) => parse_mapping(yaml)?,
        None => Mapping::new(),
    };
    Ok(Document {
        metadata: Metadata::from_mapping(mapping)?,
        body: body.to_string(),
    })
}

/// Serialize metadata and body into the exact on-disk representation
pub fn encode(document: &Document) -> Result<String, DocumentError> {
    let mapping = document.metadata.to_mapping();
    let yaml = serde_yaml::to_string(&Value::Mapping(mapping))?;
    Ok(format!("{DELIMITER}\n{yaml}{DELIMITER}\n{}", document.body))
}

/// Split `---`-delimited frontmatter from the body
fn split_frontmatter(text: &str) -> Result<(Option<&str>, &str), DocumentError> {
    let Some(rest) = text
        .strip_prefix("---\n")
        .or_else(|| text.strip_prefix("---\r\n"))
    else {
        return Ok((None, text));
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        if line.trim_end_matches(|c| c == '\n' || c == '\r') == DELIMITER {
            return Ok((Some(&rest[..offset]), &rest[offset + line.len()..]));
        }
        offset += line.len();
    }
    Err(DocumentError::Unterminated)
}

fn parse_mapping(yaml: &str) -> Result<Mapping, DocumentError> {
    if yaml.trim().is_empty() {
        return Ok(Mapping::new());
    }
    match serde_yaml::from_str::<Value>(yaml)? {
        Value::Mapping(mapping) => Ok(mapping),
        Value::Null => Ok(Mapping::new()),
        other => Err(DocumentError::NotAMapping {
            found: value_kind(&other),
        }),
    }
}

impl Metadata {
    /// Split a raw mapping into typed known fields and pass-through extras
    pub(crate) fn from_mapping(mapping: Mapping) -> Result<Self, DocumentError> {
        let mut known: Vec<(&'static str, Value)> = Vec::new();
        let mut extra = Mapping::new();
        for (key, value) in mapping {
            match key
                .as_str()
                .and_then(|k| KNOWN_FIELDS.iter().copied().find(|f| *f == k))
            {
                Some(field) => known.push((field, value)),
                None => {
                    extra.insert(key, value);
                }
            }
        }
        let mut take = |field: &'static str| {
            known
                .iter()
                .position(|(name, _)| *name == field)
                .map(|idx| known.swap_remove(idx).1)
        };

        Ok(Self {
            title: text_field("title", take("title"))?,
            description: text_field("description", take("description"))?,
            metric: text_field("metric", take("metric"))?,
            tags: list_field("tags", take("tags"))?,
            summary: text_field("summary", take("summary"))?,
            background: text_field("background", take("background"))?,
            solution: text_field("solution", take("solution"))?,
            decisions: list_field("decisions", take("decisions"))?,
            highlights: list_field("highlights", take("highlights"))?,
            results: text_field("results", take("results"))?,
            retrospective: list_field("retrospective", take("retrospective"))?,
            code_url: url_field("codeUrl", take("codeUrl"))?,
            demo_url: url_field("demoUrl", take("demoUrl"))?,
            extra,
        })
    }

    /// Canonical mapping: known fields in schema order, then extras
    pub(crate) fn to_mapping(&self) -> Mapping {
        let mut mapping = Mapping::new();
        let mut put = |key: &str, value: Value| {
            mapping.insert(Value::String(key.to_string()), value);
        };

        put("title", text(&self.title));
        put("description", text(&self.description));
        put("metric", text(&self.metric));
        put("tags", list(&self.tags));
        put("summary", text(&self.summary));
        put("background", text(&self.background));
        put("solution", text(&self.solution));
        put("decisions", list(&self.decisions));
        put("highlights", list(&self.highlights));
        put("results", text(&self.results));
        put("retrospective", list(&self.retrospective));
        if let Some(url) = &self.code_url {
            put("codeUrl", text(url));
        }
        if let Some(url) = &self.demo_url {
            put("demoUrl", text(url));
        }

        for (key, value) in &self.extra {
            if key.as_str().is_some_and(|k| KNOWN_FIELDS.contains(&k)) {
                debug!("Dropping extra metadata key that shadows a known field: {:?}", key);
                continue;
            }
            mapping.insert(key.clone(), value.clone());
        }
        mapping
    }
}

fn text(value: &str) -> Value {
    Value::String(value.to_string())
}

fn list(values: &[String]) -> Value {
    Value::Sequence(values.iter().map(|v| text(v)).collect())
}

fn scalar_to_string(value: Value) -> Result<String, Value> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        Value::Bool(b) => Ok(b.to_string()),
        other => Err(other),
    }
}

fn text_field(field: &'static str, value: Option<Value>) -> Result<String, DocumentError> {
    match value {
        None | Some(Value::Null) => Ok(String::new()),
        Some(value) => scalar_to_string(value).map_err(|other| DocumentError::FieldType {
            field,
            expected: "text",
            found: value_kind(&other),
        }),
    }
}

fn list_field(field: &'static str, value: Option<Value>) -> Result<Vec<String>, DocumentError> {
    match value {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .into_iter()
            .map(|item| {
                scalar_to_string(item).map_err(|other| DocumentError::FieldType {
                    field,
                    expected: "a list of text items",
                    found: value_kind(&other),
                })
            })
            .collect(),
        Some(other) => Err(DocumentError::FieldType {
            field,
            expected: "a list",
            found: value_kind(&other),
        }),
    }
}

fn url_field(field: &'static str, value: Option<Value>) -> Result<Option<String>, DocumentError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(other) => Err(DocumentError::FieldType {
            field,
            expected: "a URL string",
            found: value_kind(&other),
        }),
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "text",
        Value::Sequence(_) => "a list",
        Value::Mapping(_) => "a mapping",
        Value::Tagged(_) => "a tagged value",
    }
}
