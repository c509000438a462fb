//! Rendering of store results as tables or JSON

use anyhow::Result;
use comfy_table::{presets::UTF8_FULL, Cell, Color, ContentArrangement, Table};
use folio_core::{Divergence, Document, PathState, Revision, RevisionId, Slug};
use serde::Serialize;

use crate::cli::OutputFormat;

/// One row of `folio list`
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub slug: Slug,
    /// `None` when the stored file could not be decoded
    pub title: Option<String>,
    pub metric: Option<String>,
    pub tags: Vec<String>,
}

impl Listing {
    pub fn new(slug: Slug, document: Option<&Document>) -> Self {
        Self {
            slug,
            title: document.map(|d| d.metadata.title.clone()),
            metric: document.map(|d| d.metadata.metric.clone()),
            tags: document.map(|d| d.metadata.tags.clone()).unwrap_or_default(),
        }
    }
}

/// Result of a mutating command
#[derive(Debug, Clone, Serialize)]
pub struct Change<'a> {
    pub action: &'a str,
    pub slug: &'a str,
    /// `None` when nothing changed
    pub revision: Option<&'a RevisionId>,
}

fn table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

fn json<T: Serialize + ?Sized>(value: &T) -> Result<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

pub fn listings(format: OutputFormat, rows: &[Listing]) -> Result<String> {
    match format {
        OutputFormat::Json => json(rows),
        OutputFormat::Table if rows.is_empty() => Ok("No documents".to_string()),
        OutputFormat::Table => {
            let mut t = table();
            t.set_header(vec!["Slug", "Title", "Metric", "Tags"]);
            for row in rows {
                let title = match &row.title {
                    Some(title) => Cell::new(title),
                    None => Cell::new("(malformed)").fg(Color::Red),
                };
                t.add_row(vec![
                    Cell::new(row.slug.as_str()),
                    title,
                    Cell::new(row.metric.as_deref().unwrap_or("")),
                    Cell::new(row.tags.join(", ")),
                ]);
            }
            Ok(t.to_string())
        }
    }
}

pub fn document(format: OutputFormat, slug: &str, doc: &Document) -> Result<String> {
    match format {
        OutputFormat::Json => json(doc),
        OutputFormat::Table => {
            let m = &doc.metadata;
            let mut t = table();
            t.set_header(vec!["Field", slug]);

            let text = [
                ("title", &m.title),
                ("description", &m.description),
                ("metric", &m.metric),
                ("summary", &m.summary),
                ("background", &m.background),
                ("solution", &m.solution),
                ("results", &m.results),
            ];
            for (field, value) in text {
                t.add_row(vec![field, value.as_str()]);
            }
            let lists = [
                ("tags", &m.tags),
                ("decisions", &m.decisions),
                ("highlights", &m.highlights),
                ("retrospective", &m.retrospective),
            ];
            for (field, values) in lists {
                if !values.is_empty() {
                    t.add_row(vec![field.to_string(), values.join("\n")]);
                }
            }
            for (field, url) in [("codeUrl", &m.code_url), ("demoUrl", &m.demo_url)] {
                if let Some(url) = url {
                    t.add_row(vec![field, url.as_str()]);
                }
            }
            for (key, value) in &m.extra {
                let key = key.as_str().map(str::to_string).unwrap_or_else(|| format!("{key:?}"));
                let value = serde_yaml::to_string(value).unwrap_or_default();
                t.add_row(vec![key, value.trim_end().to_string()]);
            }

            if doc.body.is_empty() {
                Ok(t.to_string())
            } else {
                Ok(format!("{t}\n\n{}", doc.body.trim_end()))
            }
        }
    }
}

pub fn change(format: OutputFormat, change: &Change<'_>) -> Result<String> {
    match format {
        OutputFormat::Json => json(change),
        OutputFormat::Table => Ok(match change.revision {
            Some(revision) => format!("{} {} ({})", change.action, change.slug, revision.short()),
            None => format!("{} {} (no changes to record)", change.action, change.slug),
        }),
    }
}

pub fn revisions(format: OutputFormat, slug: &str, revisions: &[Revision]) -> Result<String> {
    match format {
        OutputFormat::Json => json(revisions),
        OutputFormat::Table if revisions.is_empty() => Ok(format!("No history for {slug}")),
        OutputFormat::Table => {
            let mut t = table();
            t.set_header(vec!["Revision", "Date", "Author", "Message"]);
            for r in revisions {
                t.add_row(vec![
                    r.id.short().to_string(),
                    r.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
                    r.author.clone(),
                    r.message.clone(),
                ]);
            }
            Ok(t.to_string())
        }
    }
}

pub fn diff(format: OutputFormat, diff: &str) -> Result<String> {
    match format {
        OutputFormat::Json => json(&serde_json::json!({ "diff": diff })),
        OutputFormat::Table if diff.is_empty() => Ok("No differences".to_string()),
        OutputFormat::Table => Ok(diff.trim_end().to_string()),
    }
}

pub fn divergences(format: OutputFormat, found: &[Divergence]) -> Result<String> {
    match format {
        OutputFormat::Json => json(found),
        OutputFormat::Table if found.is_empty() => {
            Ok("Working files match the last revision".to_string())
        }
        OutputFormat::Table => {
            let mut t = table();
            t.set_header(vec!["Path", "Document", "State"]);
            for d in found {
                let color = match d.state {
                    PathState::Deleted => Color::Red,
                    PathState::Untracked => Color::Yellow,
                    PathState::Modified | PathState::Staged => Color::Cyan,
                };
                t.add_row(vec![
                    Cell::new(d.path.display()),
                    Cell::new(d.slug.as_ref().map(Slug::as_str).unwrap_or("-")),
                    Cell::new(d.state).fg(color),
                ]);
            }
            Ok(t.to_string())
        }
    }
}
