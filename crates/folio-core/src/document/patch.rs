//! Partial document updates

use serde::Deserialize;
use serde_yaml::Mapping;

use super::Document;

/// Fields to change on an existing document.
///
/// `None` leaves a field alone. An empty or blank `codeUrl`/`demoUrl`
/// removes the link; an empty list clears the list. Keys in `extra` are
/// written over the document's unknown fields, everything else there is kept.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentPatch {
    pub title: Option<String>,
    pub description: Option<String>,
    pub metric: Option<String>,
    pub tags: Option<Vec<String>>,
    pub summary: Option<String>,
    pub background: Option<String>,
    pub solution: Option<String>,
    pub decisions: Option<Vec<String>>,
    pub highlights: Option<Vec<String>>,
    pub results: Option<String>,
    pub retrospective: Option<Vec<String>>,
    pub code_url: Option<String>,
    pub demo_url: Option<String>,
    #[serde(alias = "content")]
    pub body: Option<String>,
    #[serde(flatten)]
    pub extra: Mapping,
}

impl DocumentPatch {
    /// True when applying the patch cannot change anything
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Merge onto `document`
    pub fn apply_to(self, document: &mut Document) {
        let m = &mut document.metadata;

        set(&mut m.title, self.title);
        set(&mut m.description, self.description);
        set(&mut m.metric, self.metric);
        set(&mut m.tags, self.tags);
        set(&mut m.summary, self.summary);
        set(&mut m.background, self.background);
        set(&mut m.solution, self.solution);
        set(&mut m.decisions, self.decisions);
        set(&mut m.highlights, self.highlights);
        set(&mut m.results, self.results);
        set(&mut m.retrospective, self.retrospective);
        set_url(&mut m.code_url, self.code_url);
        set_url(&mut m.demo_url, self.demo_url);

        for (key, value) in self.extra {
            m.extra.insert(key, value);
        }

        set(&mut document.body, self.body);
    }
}

fn set<T>(slot: &mut T, value: Option<T>) {
    if let Some(value) = value {
        *slot = value;
    }
}

fn set_url(slot: &mut Option<String>, value: Option<String>) {
    match value {
        Some(url) if url.trim().is_empty() => *slot = None,
        Some(url) => *slot = Some(url),
        None => {}
    }
}
