//! Fixtures for store tests.

use std::sync::Arc;

use tempfile::TempDir;

use crate::auth::Capability;
use crate::document::{Document, Metadata};
use crate::history::memory::MemoryHistory;
use crate::history::{GitBackend, Signature};
use crate::storage::ContentStore;

/// Content directory used by [`TestStore`], relative to its root
pub const CONTENT_DIR: &str = "content/projects";

/// A document that passes validation, with every required field filled.
pub fn sample_document(title: &str) -> Document {
    Document::new(
        Metadata {
            title: title.to_string(),
            description: format!("{title} in one line"),
            metric: "10x faster".to_string(),
            tags: vec!["rust".to_string()],
            summary: "What was built.".to_string(),
            background: "Why it was needed.".to_string(),
            solution: "How it works.".to_string(),
            decisions: vec!["Chose simplicity".to_string()],
            results: "pending".to_string(),
            ..Default::default()
        },
        format!("# {title}\n\nBody text.\n"),
    )
}

/// Capability for tests that are not about authorization
pub fn capability() -> Capability {
    Capability::grant(&true).expect("true always grants")
}

/// A store rooted in a temporary directory.
///
/// The directory is removed when the value drops.
pub struct TestStore {
    pub dir: TempDir,
    pub store: ContentStore,
    /// Set when backed by [`MemoryHistory`], for failure injection
    pub memory: Option<Arc<MemoryHistory>>,
}

impl TestStore {
    /// Store over a freshly initialized git repository
    pub fn git() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let backend = GitBackend::init(dir.path(), Signature::new("Test Author", "test@example.com"))
            .expect("init git repository");
        let store = ContentStore::new(dir.path(), CONTENT_DIR, "mdx", Arc::new(backend));
        Self {
            dir,
            store,
            memory: None,
        }
    }

    /// Store over the in-memory backend
    pub fn memory() -> Self {
        let dir = TempDir::new().expect("create temp dir");
        let backend = Arc::new(MemoryHistory::new(dir.path()));
        let store = ContentStore::new(dir.path(), CONTENT_DIR, "mdx", backend.clone());
        Self {
            dir,
            store,
            memory: Some(backend),
        }
    }

    /// Absolute path of a document file
    pub fn document_path(&self, slug: &str) -> std::path::PathBuf {
        self.dir.path().join(CONTENT_DIR).join(format!("{slug}.mdx"))
    }
}
