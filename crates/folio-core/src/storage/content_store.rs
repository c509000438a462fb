//! Versioned Content Store
//!
//! Sequences the file store and the history backend. Each mutation is two
//! steps: materialize the file, then commit exactly that path. The steps are
//! not atomic. When the commit fails the new file stays on disk, the error is
//! returned, and [`ContentStore::status`] reports the path until someone
//! commits or discards it.
//!
//! Mutations on one slug are serialized by a per-slug async mutex. Different
//! slugs proceed in parallel up to the history backend, which serializes its
//! own repository access.

use std::path::{Component, Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use folio_config::FolioConfig;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, info, instrument, warn};

use crate::auth::Capability;
use crate::document::{self, Document, DocumentPatch};
use crate::error::{StoreError, StoreResult};
use crate::history::{
    short_id, GitBackend, HistoryBackend, HistoryError, PathState, Revision, RevisionId, Signature,
};
use crate::slug::Slug;

use super::FileStore;

/// Default number of revisions returned by [`ContentStore::list_history`]
pub const DEFAULT_HISTORY_LIMIT: usize = 20;

/// A document path whose working state differs from the last revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Divergence {
    /// `None` for files under the content directory that are not documents
    pub slug: Option<Slug>,
    pub path: PathBuf,
    pub state: PathState,
}

/// Document CRUD where every mutation is one revision
pub struct ContentStore {
    files: FileStore,
    history: Arc<dyn HistoryBackend>,
    /// Content directory relative to the repository root
    content_dir: PathBuf,
    history_limit: usize,
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for ContentStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentStore")
            .field("files", &self.files)
            .field("content_dir", &self.content_dir)
            .field("history_limit", &self.history_limit)
            .finish_non_exhaustive()
    }
}

impl ContentStore {
    /// Store documents under `repo_root/content_dir` with the given backend.
    ///
    /// `history` must be rooted at `repo_root`.
    pub fn new(
        repo_root: impl AsRef<Path>,
        content_dir: impl AsRef<Path>,
        extension: impl Into<String>,
        history: Arc<dyn HistoryBackend>,
    ) -> Self {
        let content_dir: PathBuf = content_dir
            .as_ref()
            .components()
            .filter(|c| !matches!(c, Component::CurDir))
            .collect();
        Self {
            files: FileStore::new(repo_root.as_ref().join(&content_dir), extension),
            history,
            content_dir,
            history_limit: DEFAULT_HISTORY_LIMIT,
            locks: DashMap::new(),
        }
    }

    /// Build from configuration with a caller-supplied backend
    pub fn from_config(config: &FolioConfig, history: Arc<dyn HistoryBackend>) -> Self {
        Self::new(
            &config.store.repo_root,
            &config.store.content_dir,
            config.store.extension.clone(),
            history,
        )
        .with_history_limit(config.history.limit)
    }

    /// Open the git repository named by `config` and check it for divergence
    pub async fn open(config: &FolioConfig) -> StoreResult<Self> {
        let root = config.store.repo_root.clone();
        let signature = Signature::from(&config.history);
        let backend = if config.history.init_repository {
            GitBackend::init(&root, signature)
        } else {
            GitBackend::open(&root, signature)
        }
        .map_err(|e| StoreError::history("open", root.display().to_string(), e))?;

        let store = Self::from_config(config, Arc::new(backend));
        if !store.history.is_repository().await {
            warn!(
                root = %root.display(),
                "No repository found; mutations will fail until one is initialized"
            );
        }
        store.reconcile().await;
        Ok(store)
    }

    pub fn with_history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit.max(1);
        self
    }

    pub fn files(&self) -> &FileStore {
        &self.files
    }

    /// Log every divergence between working files and history
    async fn reconcile(&self) {
        match self.divergences().await {
            Ok(found) => {
                for d in &found {
                    warn!(
                        path = %d.path.display(),
                        state = %d.state,
                        "Working file differs from last revision"
                    );
                }
                debug!(count = found.len(), "Reconciliation finished");
            }
            Err(StoreError::VersionControl {
                source: HistoryError::Unsupported(_) | HistoryError::NoRepository { .. },
                ..
            }) => debug!("Backend cannot report status; skipping reconciliation"),
            Err(e) => warn!(error = %e, "Reconciliation failed"),
        }
    }

    fn repo_path(&self, slug: &Slug) -> PathBuf {
        self.content_dir.join(self.files.file_name(slug))
    }

    fn lock_for(&self, slug: &Slug) -> Arc<Mutex<()>> {
        Arc::clone(&self.locks.entry(slug.to_string()).or_default())
    }

    /// Forget the slug's lock unless another task holds or awaits it
    fn release_lock(&self, slug: &Slug) {
        self.locks
            .remove_if(slug.as_str(), |_, lock| Arc::strong_count(lock) == 1);
    }

    fn decode(slug: &Slug, raw: &[u8]) -> StoreResult<Document> {
        document::decode(raw).map_err(|e| StoreError::malformed(slug.as_str(), e))
    }

    fn encode(slug: &Slug, doc: &Document) -> StoreResult<String> {
        doc.validate().map_err(|problems| StoreError::InvalidDocument {
            slug: slug.to_string(),
            problems,
        })?;
        document::encode(doc).map_err(|e| StoreError::malformed(slug.as_str(), e))
    }

    /// Commit the slug's path. `Ok(None)` when the working copy already
    /// matches the last revision.
    async fn commit(
        &self,
        operation: &'static str,
        slug: &Slug,
        message: &str,
    ) -> StoreResult<Option<RevisionId>> {
        let path = self.repo_path(slug);
        match self.history.commit(message, &[path.clone()]).await {
            Ok(id) => Ok(Some(id)),
            Err(e) if e.is_nothing_to_commit() => {
                debug!(slug = %slug, "Nothing to commit");
                Ok(None)
            }
            Err(e) => {
                warn!(
                    slug = %slug,
                    path = %path.display(),
                    error = %e,
                    "Commit failed after file change; working file and history diverge"
                );
                Err(StoreError::history(operation, slug.as_str(), e))
            }
        }
    }

    /// Every document slug, sorted
    pub fn list(&self, _cap: &Capability) -> StoreResult<Vec<Slug>> {
        self.files.list()
    }

    pub fn exists(&self, _cap: &Capability, slug: &str) -> StoreResult<bool> {
        Ok(self.files.exists(&Slug::new(slug)?))
    }

    pub fn read(&self, _cap: &Capability, slug: &str) -> StoreResult<Document> {
        let slug = Slug::new(slug)?;
        let raw = self.files.read(&slug)?;
        Self::decode(&slug, &raw)
    }

    /// Write a new document and commit it
    #[instrument(skip(self, _cap, document))]
    pub async fn create(
        &self,
        _cap: &Capability,
        slug: &str,
        document: Document,
    ) -> StoreResult<Option<RevisionId>> {
        let slug = Slug::new(slug)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock().await;

        if self.files.exists(&slug) {
            return Err(StoreError::AlreadyExists {
                slug: slug.into(),
            });
        }
        let raw = Self::encode(&slug, &document)?;
        self.files.write(&slug, raw.as_bytes())?;

        let message = format!("Create document: {}", document.title());
        let revision = self.commit("create", &slug, &message).await?;
        info!(slug = %slug, revision = ?revision.as_ref().map(RevisionId::short), "Created document");
        Ok(revision)
    }

    /// Merge `patch` onto the stored document and commit the result
    #[instrument(skip(self, _cap, patch))]
    pub async fn update(
        &self,
        _cap: &Capability,
        slug: &str,
        patch: DocumentPatch,
    ) -> StoreResult<Option<RevisionId>> {
        let slug = Slug::new(slug)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock().await;

        let mut doc = Self::decode(&slug, &self.files.read(&slug)?)?;
        patch.apply_to(&mut doc);
        let raw = Self::encode(&slug, &doc)?;
        self.files.write(&slug, raw.as_bytes())?;

        let message = format!("Update document: {}", doc.title());
        let revision = self.commit("update", &slug, &message).await?;
        info!(slug = %slug, revision = ?revision.as_ref().map(RevisionId::short), "Updated document");
        Ok(revision)
    }

    /// Remove the document and commit the removal
    #[instrument(skip(self, _cap))]
    pub async fn delete(&self, _cap: &Capability, slug: &str) -> StoreResult<Option<RevisionId>> {
        let slug = Slug::new(slug)?;
        let lock = self.lock_for(&slug);
        let result = {
            let _guard = lock.lock().await;
            self.delete_locked(&slug).await
        };
        drop(lock);
        self.release_lock(&slug);
        result
    }

    async fn delete_locked(&self, slug: &Slug) -> StoreResult<Option<RevisionId>> {
        let raw = self.files.read(slug)?;
        let title = match Self::decode(slug, &raw) {
            Ok(doc) if !doc.title().trim().is_empty() => doc.title().to_string(),
            Ok(_) => slug.to_string(),
            Err(e) => {
                warn!(slug = %slug, error = %e, "Deleting unreadable document");
                slug.to_string()
            }
        };
        self.files.delete(slug)?;

        let message = format!("Delete document: {title}");
        let revision = self.commit("delete", slug, &message).await?;
        info!(slug = %slug, revision = ?revision.as_ref().map(RevisionId::short), "Deleted document");
        Ok(revision)
    }

    /// Restore the document as of `revision` and record that as a new revision.
    ///
    /// Returns the restored document.
    #[instrument(skip(self, _cap))]
    pub async fn rollback(
        &self,
        _cap: &Capability,
        slug: &str,
        revision: &str,
    ) -> StoreResult<Document> {
        let slug = Slug::new(slug)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock().await;

        if !self.files.exists(&slug) {
            return Err(StoreError::NotFound {
                slug: slug.into(),
            });
        }
        let path = self.repo_path(&slug);
        self.history
            .checkout_at(&path, revision)
            .await
            .map_err(|e| StoreError::history("rollback", slug.as_str(), e))?;

        let message = format!("Rollback {} to {}", slug, short_id(revision));
        let committed = self.commit("rollback", &slug, &message).await?;
        info!(
            slug = %slug,
            target = short_id(revision),
            revision = ?committed.as_ref().map(RevisionId::short),
            "Rolled back document"
        );
        Self::decode(&slug, &self.files.read(&slug)?)
    }

    /// Revisions touching the document, newest first, bounded by the
    /// configured limit
    pub async fn list_history(&self, cap: &Capability, slug: &str) -> StoreResult<Vec<Revision>> {
        self.list_history_limited(cap, slug, self.history_limit).await
    }

    pub async fn list_history_limited(
        &self,
        _cap: &Capability,
        slug: &str,
        limit: usize,
    ) -> StoreResult<Vec<Revision>> {
        let slug = Slug::new(slug)?;
        self.history
            .history(&self.repo_path(&slug), limit)
            .await
            .map_err(|e| StoreError::history("history", slug.as_str(), e))
    }

    /// The document as recorded in `revision`; it need not exist now
    pub async fn content_at(
        &self,
        _cap: &Capability,
        slug: &str,
        revision: &str,
    ) -> StoreResult<Document> {
        let slug = Slug::new(slug)?;
        let raw = self
            .history
            .content_at(&self.repo_path(&slug), revision)
            .await
            .map_err(|e| StoreError::history("content_at", slug.as_str(), e))?;
        Self::decode(&slug, &raw)
    }

    /// Unified diff from `revision` to the working file; empty when equal
    pub async fn diff(&self, _cap: &Capability, slug: &str, revision: &str) -> StoreResult<String> {
        let slug = Slug::new(slug)?;
        self.history
            .diff(&self.repo_path(&slug), revision)
            .await
            .map_err(|e| StoreError::history("diff", slug.as_str(), e))
    }

    /// Document paths whose working state differs from the last revision
    pub async fn status(&self, _cap: &Capability) -> StoreResult<Vec<Divergence>> {
        self.divergences().await
    }

    async fn divergences(&self) -> StoreResult<Vec<Divergence>> {
        let statuses = self
            .history
            .status(&self.content_dir)
            .await
            .map_err(|e| StoreError::history("status", self.content_dir.display().to_string(), e))?;

        Ok(statuses
            .into_iter()
            .map(|s| Divergence {
                slug: (s.path.parent() == Some(self.content_dir.as_path()))
                    .then(|| self.files.slug_of(&s.path))
                    .flatten(),
                path: s.path,
                state: s.state,
            })
            .collect())
    }

    /// Drop uncommitted edits to the document by restoring the last revision
    #[instrument(skip(self, _cap))]
    pub async fn discard(&self, _cap: &Capability, slug: &str) -> StoreResult<Document> {
        let slug = Slug::new(slug)?;
        let lock = self.lock_for(&slug);
        let _guard = lock.lock().await;

        let head = self
            .history
            .current_revision()
            .await
            .map_err(|e| StoreError::history("discard", slug.as_str(), e))?
            .ok_or_else(|| StoreError::RevisionNotFound {
                slug: slug.to_string(),
                revision: "HEAD".to_string(),
            })?;
        self.history
            .checkout_at(&self.repo_path(&slug), head.as_str())
            .await
            .map_err(|e| StoreError::history("discard", slug.as_str(), e))?;

        info!(slug = %slug, revision = head.short(), "Discarded working changes");
        Self::decode(&slug, &self.files.read(&slug)?)
    }

    pub async fn current_revision(&self, _cap: &Capability) -> StoreResult<Option<RevisionId>> {
        self.history
            .current_revision()
            .await
            .map_err(|e| StoreError::history("current_revision", "", e))
    }
}
