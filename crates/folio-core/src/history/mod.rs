//! Version History Backend
//!
//! [`HistoryBackend`] is the seam between the content store and whatever
//! records revisions. Paths passed in are relative to the backend's root.
//!
//! The store depends only on the five core operations (`commit`, `history`,
//! `content_at`, `checkout_at`, `current_revision`); `diff`, `status` and
//! `is_repository` have defaults so a minimal backend stays substitutable.

mod git;
#[cfg(feature = "test-utils")]
pub mod memory;

use std::fmt;
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use git::{GitBackend, Signature};

/// Content-derived revision identifier (a commit hash for git)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RevisionId(String);

impl RevisionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// First seven characters, as shown in commit messages
    pub fn short(&self) -> &str {
        short_id(&self.0)
    }
}

impl fmt::Display for RevisionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for RevisionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

/// First seven characters of a revision string (char-boundary safe)
pub fn short_id(id: &str) -> &str {
    match id.char_indices().nth(7) {
        Some((idx, _)) => &id[..idx],
        None => id,
    }
}

/// One recorded revision
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Revision {
    pub id: RevisionId,
    pub timestamp: DateTime<Utc>,
    pub author: String,
    pub message: String,
}

/// Working-tree state of a path relative to the last revision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PathState {
    /// Changed on disk, not staged
    Modified,
    /// Removed on disk, still in the last revision
    Deleted,
    /// Never recorded
    Untracked,
    /// Staged but not yet committed
    Staged,
}

impl fmt::Display for PathState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Modified => "modified",
            Self::Deleted => "deleted",
            Self::Untracked => "untracked",
            Self::Staged => "staged",
        };
        f.write_str(label)
    }
}

/// A path whose working state differs from history
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PathStatus {
    pub path: PathBuf,
    pub state: PathState,
}

/// Errors reported by a history backend
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("no repository at {}", .path.display())]
    NoRepository { path: PathBuf },

    #[error("nothing to commit")]
    NothingToCommit,

    #[error("repository is locked: {0}")]
    Locked(String),

    #[error("revision {revision} does not contain {}", .path.display())]
    RevisionNotFound { revision: String, path: PathBuf },

    #[error("operation not supported by this backend: {0}")]
    Unsupported(&'static str),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("git error: {0}")]
    Git(#[from] git2::Error),

    #[error("history task failed: {0}")]
    Task(String),
}

/// Result type for history backend operations
pub type HistoryResult<T> = Result<T, HistoryError>;

impl HistoryError {
    pub fn is_nothing_to_commit(&self) -> bool {
        matches!(self, Self::NothingToCommit)
    }
}

/// Append-only revision log over a working tree
#[async_trait]
pub trait HistoryBackend: Send + Sync {
    /// Record the given paths (all pending changes when empty) as one revision
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> HistoryResult<RevisionId>;

    /// Revisions touching `path`, newest first, at most `limit`.
    ///
    /// Empty when the path has no history or there is no repository.
    async fn history(&self, path: &Path, limit: usize) -> HistoryResult<Vec<Revision>>;

    /// Content of `path` as recorded in `revision`
    async fn content_at(&self, path: &Path, revision: &str) -> HistoryResult<Vec<u8>>;

    /// Overwrite the working copy of `path` with its content at `revision`.
    ///
    /// Does not record a revision.
    async fn checkout_at(&self, path: &Path, revision: &str) -> HistoryResult<()>;

    /// Latest revision, or `None` when there is no repository or no revisions
    async fn current_revision(&self) -> HistoryResult<Option<RevisionId>>;

    /// Unified diff of `path` between `revision` and the working copy
    async fn diff(&self, _path: &Path, _revision: &str) -> HistoryResult<String> {
        Err(HistoryError::Unsupported("diff"))
    }

    /// Paths under `prefix` whose working state differs from the last revision
    async fn status(&self, _prefix: &Path) -> HistoryResult<Vec<PathStatus>> {
        Err(HistoryError::Unsupported("status"))
    }

    /// Whether a repository backs this history
    async fn is_repository(&self) -> bool {
        false
    }
}

/// Replace `target` through a sibling temp file so readers never see a partial write
pub(crate) fn write_atomically(target: &Path, content: &[u8]) -> HistoryResult<()> {
    let parent = target.parent().unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(parent)?;
    let mut tmp = tempfile::NamedTempFile::new_in(parent)?;
    tmp.write_all(content)?;
    tmp.as_file().sync_all()?;
    tmp.persist(target).map_err(|e| HistoryError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_id_takes_seven_chars() {
        let id = RevisionId::new("0123456789abcdef");
        assert_eq!(id.short(), "0123456");
        assert_eq!(short_id("abc"), "abc");
        assert_eq!(short_id(""), "");
    }

    #[test]
    fn revision_id_serializes_as_plain_string() {
        let json = serde_json::to_string(&RevisionId::new("abc")).unwrap();
        assert_eq!(json, "\"abc\"");
    }
}
