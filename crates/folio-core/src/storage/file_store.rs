//! One file per document under a content directory
//!
//! Writes go to a temporary file in the same directory and are renamed into
//! place, so a concurrent reader sees either the old or the new content.

use std::io::{ErrorKind as IoErrorKind, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::slug::Slug;

/// Filesystem CRUD over `<root>/<slug>.<extension>`
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    extension: String,
}

impl FileStore {
    /// `extension` may be given with or without its leading dot
    pub fn new(root: impl Into<PathBuf>, extension: impl Into<String>) -> Self {
        let extension: String = extension.into();
        Self {
            root: root.into(),
            extension: extension.trim_start_matches('.').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// File name of a slug's document, relative to the content directory
    pub fn file_name(&self, slug: &Slug) -> String {
        format!("{}.{}", slug, self.extension)
    }

    pub fn path_for(&self, slug: &Slug) -> PathBuf {
        self.root.join(self.file_name(slug))
    }

    pub fn exists(&self, slug: &Slug) -> bool {
        self.path_for(slug).is_file()
    }

    pub fn read(&self, slug: &Slug) -> StoreResult<Vec<u8>> {
        let path = self.path_for(slug);
        std::fs::read(&path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => StoreError::NotFound {
                slug: slug.to_string(),
            },
            _ => StoreError::io("read", path, e),
        })
    }

    /// Replace the document's content, creating the content directory if needed
    pub fn write(&self, slug: &Slug, content: &[u8]) -> StoreResult<()> {
        std::fs::create_dir_all(&self.root)
            .map_err(|e| StoreError::io("create directory", &self.root, e))?;

        let path = self.path_for(slug);
        let mut tmp =
            NamedTempFile::new_in(&self.root).map_err(|e| StoreError::io("write", &path, e))?;
        tmp.write_all(content)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| StoreError::io("write", &path, e))?;
        tmp.persist(&path)
            .map_err(|e| StoreError::io("write", &path, e.error))?;

        debug!(slug = %slug, bytes = content.len(), "Wrote document file");
        Ok(())
    }

    pub fn delete(&self, slug: &Slug) -> StoreResult<()> {
        let path = self.path_for(slug);
        std::fs::remove_file(&path).map_err(|e| match e.kind() {
            IoErrorKind::NotFound => StoreError::NotFound {
                slug: slug.to_string(),
            },
            _ => StoreError::io("delete", path, e),
        })
    }

    /// Slugs of every document file, sorted.
    ///
    /// Files with another extension or a stem that is not a valid slug are
    /// skipped. A missing directory lists as empty.
    pub fn list(&self) -> StoreResult<Vec<Slug>> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) if e.kind() == IoErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(StoreError::io("list", &self.root, e)),
        };

        let mut slugs = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| StoreError::io("list", &self.root, e))?;
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if let Some(slug) = self.slug_of(&path) {
                slugs.push(slug);
            }
        }
        slugs.sort();
        Ok(slugs)
    }

    /// Slug for a document path, if it names one of ours
    pub fn slug_of(&self, path: &Path) -> Option<Slug> {
        if path.extension().and_then(|e| e.to_str()) != Some(self.extension.as_str()) {
            return None;
        }
        let stem = path.file_stem()?.to_str()?;
        Slug::new(stem).ok()
    }
}
