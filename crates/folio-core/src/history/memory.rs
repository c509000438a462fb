//! In-memory history backend
//!
//! Keeps a full snapshot of every committed path per revision. Useful in
//! tests that need to inject backend failures or avoid touching git.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::Utc;
use parking_lot::Mutex;
use walkdir::WalkDir;

use super::{
    write_atomically, HistoryBackend, HistoryError, HistoryResult, PathState, PathStatus,
    Revision, RevisionId,
};

type Snapshot = BTreeMap<PathBuf, Vec<u8>>;

struct Entry {
    revision: Revision,
    snapshot: Snapshot,
}

#[derive(Default)]
struct State {
    entries: Vec<Entry>,
    fail_next_commit: bool,
}

/// [`HistoryBackend`] that records snapshots in memory
pub struct MemoryHistory {
    root: PathBuf,
    author: String,
    state: Mutex<State>,
}

impl MemoryHistory {
    /// Track files under `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            author: "memory".to_string(),
            state: Mutex::new(State::default()),
        }
    }

    /// Make the next `commit` fail with [`HistoryError::Locked`]
    pub fn fail_next_commit(&self) {
        self.state.lock().fail_next_commit = true;
    }

    /// Number of recorded revisions
    pub fn revision_count(&self) -> usize {
        self.state.lock().entries.len()
    }

    fn working_files(&self, prefix: &Path) -> HistoryResult<Vec<PathBuf>> {
        let base = self.root.join(prefix);
        if !base.exists() {
            return Ok(Vec::new());
        }
        let mut files = Vec::new();
        for entry in WalkDir::new(&base) {
            let entry = entry.map_err(|e| HistoryError::Io(e.into()))?;
            if entry.file_type().is_file() {
                if let Ok(rel) = entry.path().strip_prefix(&self.root) {
                    files.push(rel.to_path_buf());
                }
            }
        }
        Ok(files)
    }

    fn find<'a>(entries: &'a [Entry], revision: &str, path: &Path) -> HistoryResult<&'a Entry> {
        if revision.len() >= 4 {
            let mut matches = entries
                .iter()
                .filter(|e| e.revision.id.as_str().starts_with(revision));
            if let (Some(entry), None) = (matches.next(), matches.next()) {
                return Ok(entry);
            }
        }
        Err(HistoryError::RevisionNotFound {
            revision: revision.to_string(),
            path: path.to_path_buf(),
        })
    }
}

#[async_trait]
impl HistoryBackend for MemoryHistory {
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> HistoryResult<RevisionId> {
        let mut state = self.state.lock();
        if std::mem::take(&mut state.fail_next_commit) {
            return Err(HistoryError::Locked("injected commit failure".to_string()));
        }

        let previous = state.entries.last().map(|e| e.snapshot.clone()).unwrap_or_default();
        let mut snapshot = previous.clone();

        let targets: Vec<PathBuf> = if paths.is_empty() {
            let mut all = self.working_files(Path::new(""))?;
            all.extend(previous.keys().cloned());
            all
        } else {
            paths.to_vec()
        };
        for path in targets {
            let full = self.root.join(&path);
            if full.is_file() {
                snapshot.insert(path, std::fs::read(&full)?);
            } else {
                snapshot.remove(&path);
            }
        }

        if snapshot == previous {
            return Err(HistoryError::NothingToCommit);
        }

        let mut hasher = blake3::Hasher::new();
        if let Some(parent) = state.entries.last() {
            hasher.update(parent.revision.id.as_str().as_bytes());
        }
        hasher.update(message.as_bytes());
        for (path, content) in &snapshot {
            hasher.update(path.to_string_lossy().as_bytes());
            hasher.update(content);
        }
        let id = RevisionId::new(hex::encode(hasher.finalize().as_bytes()));

        state.entries.push(Entry {
            revision: Revision {
                id: id.clone(),
                timestamp: Utc::now(),
                author: self.author.clone(),
                message: message.to_string(),
            },
            snapshot,
        });
        Ok(id)
    }

    async fn history(&self, path: &Path, limit: usize) -> HistoryResult<Vec<Revision>> {
        let state = self.state.lock();
        let mut out = Vec::new();
        for (idx, entry) in state.entries.iter().enumerate().rev() {
            let previous = idx
                .checked_sub(1)
                .and_then(|p| state.entries[p].snapshot.get(path));
            if entry.snapshot.get(path) != previous {
                out.push(entry.revision.clone());
                if out.len() >= limit {
                    break;
                }
            }
        }
        Ok(out)
    }

    async fn content_at(&self, path: &Path, revision: &str) -> HistoryResult<Vec<u8>> {
        let state = self.state.lock();
        let entry = Self::find(&state.entries, revision, path)?;
        entry
            .snapshot
            .get(path)
            .cloned()
            .ok_or_else(|| HistoryError::RevisionNotFound {
                revision: revision.to_string(),
                path: path.to_path_buf(),
            })
    }

    async fn checkout_at(&self, path: &Path, revision: &str) -> HistoryResult<()> {
        let content = self.content_at(path, revision).await?;
        write_atomically(&self.root.join(path), &content)
    }

    async fn current_revision(&self) -> HistoryResult<Option<RevisionId>> {
        Ok(self
            .state
            .lock()
            .entries
            .last()
            .map(|e| e.revision.id.clone()))
    }

    async fn status(&self, prefix: &Path) -> HistoryResult<Vec<PathStatus>> {
        let files = self.working_files(prefix)?;
        let state = self.state.lock();
        let empty = Snapshot::new();
        let last = state.entries.last().map(|e| &e.snapshot).unwrap_or(&empty);

        let mut out = Vec::new();
        for path in &files {
            let path_state = match last.get(path) {
                None => Some(PathState::Untracked),
                Some(recorded) if *recorded != std::fs::read(self.root.join(path))? => {
                    Some(PathState::Modified)
                }
                Some(_) => None,
            };
            if let Some(state) = path_state {
                out.push(PathStatus {
                    path: path.clone(),
                    state,
                });
            }
        }
        for path in last.keys() {
            if path.starts_with(prefix) && !files.contains(path) {
                out.push(PathStatus {
                    path: path.clone(),
                    state: PathState::Deleted,
                });
            }
        }
        Ok(out)
    }

    async fn is_repository(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn records_and_lists_history() {
        let dir = TempDir::new().unwrap();
        let history = MemoryHistory::new(dir.path());
        let path = PathBuf::from("a.mdx");

        std::fs::write(dir.path().join("a.mdx"), "v1").unwrap();
        let first = history.commit("one", &[path.clone()]).await.unwrap();
        std::fs::write(dir.path().join("a.mdx"), "v2").unwrap();
        history.commit("two", &[path.clone()]).await.unwrap();

        let revisions = history.history(&path, 10).await.unwrap();
        assert_eq!(revisions.len(), 2);
        assert_eq!(revisions[0].message, "two");
        assert_eq!(
            history.content_at(&path, first.short()).await.unwrap(),
            b"v1"
        );
    }

    #[tokio::test]
    async fn injected_failure_affects_one_commit() {
        let dir = TempDir::new().unwrap();
        let history = MemoryHistory::new(dir.path());
        std::fs::write(dir.path().join("a.mdx"), "v1").unwrap();

        history.fail_next_commit();
        assert!(matches!(
            history.commit("x", &[]).await.unwrap_err(),
            HistoryError::Locked(_)
        ));
        assert!(history.commit("x", &[]).await.is_ok());
        assert_eq!(history.revision_count(), 1);
    }

    #[tokio::test]
    async fn checkout_replaces_file_without_leftovers() {
        let dir = TempDir::new().unwrap();
        let history = MemoryHistory::new(dir.path());
        let path = PathBuf::from("docs/a.mdx");
        std::fs::create_dir_all(dir.path().join("docs")).unwrap();

        std::fs::write(dir.path().join("docs/a.mdx"), "v1").unwrap();
        let first = history.commit("one", &[path.clone()]).await.unwrap();
        std::fs::remove_dir_all(dir.path().join("docs")).unwrap();

        history.checkout_at(&path, first.as_str()).await.unwrap();
        let entries: Vec<_> = std::fs::read_dir(dir.path().join("docs"))
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from("a.mdx")]);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("docs/a.mdx")).unwrap(),
            "v1"
        );
    }
}
