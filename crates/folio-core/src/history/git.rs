//! Git-backed history
//!
//! All libgit2 access lives here. The repository handle sits behind a mutex
//! so index updates and commits never interleave, and every call runs on
//! tokio's blocking pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use git2::{
    Commit, DiffFormat, DiffOptions, ErrorCode, Index, IndexAddOption, Oid, Repository, Sort,
    Status, StatusOptions, Tree,
};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::{
    write_atomically, HistoryBackend, HistoryError, HistoryResult, PathState, PathStatus,
    Revision, RevisionId,
};

/// Author recorded on every revision
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Signature {
    pub name: String,
    pub email: String,
}

impl Signature {
    pub fn new(name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            email: email.into(),
        }
    }
}

impl From<&folio_config::HistoryConfig> for Signature {
    fn from(config: &folio_config::HistoryConfig) -> Self {
        Self::new(&config.author_name, &config.author_email)
    }
}

/// [`HistoryBackend`] over a git working tree
#[derive(Clone)]
pub struct GitBackend {
    root: PathBuf,
    signature: Signature,
    repo: Arc<Mutex<Option<Repository>>>,
}

impl std::fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBackend")
            .field("root", &self.root)
            .field("signature", &self.signature)
            .field("has_repository", &self.repo.lock().is_some())
            .finish()
    }
}

impl GitBackend {
    /// Open the repository at `root`.
    ///
    /// A missing repository is not an error: reads return empty results and
    /// commits fail with [`HistoryError::NoRepository`].
    pub fn open(root: impl Into<PathBuf>, signature: Signature) -> HistoryResult<Self> {
        let root = root.into();
        let repo = match Repository::open(&root) {
            Ok(repo) => Some(repo),
            Err(e) if e.code() == ErrorCode::NotFound => {
                debug!("No git repository at {}", root.display());
                None
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_parts(root, signature, repo)
    }

    /// Open the repository at `root`, creating it if absent
    pub fn init(root: impl Into<PathBuf>, signature: Signature) -> HistoryResult<Self> {
        let root = root.into();
        let repo = match Repository::open(&root) {
            Ok(repo) => repo,
            Err(e) if e.code() == ErrorCode::NotFound => {
                info!("Initializing git repository at {}", root.display());
                Repository::init(&root)?
            }
            Err(e) => return Err(e.into()),
        };
        Self::from_parts(root, signature, Some(repo))
    }

    fn from_parts(
        root: PathBuf,
        signature: Signature,
        repo: Option<Repository>,
    ) -> HistoryResult<Self> {
        if repo.as_ref().is_some_and(|r| r.workdir().is_none()) {
            return Err(HistoryError::NoRepository { path: root });
        }
        Ok(Self {
            root,
            signature,
            repo: Arc::new(Mutex::new(repo)),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Run `f` on the blocking pool with the (possibly absent) repository
    async fn with_optional_repo<T, F>(&self, f: F) -> HistoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(Option<&Repository>) -> HistoryResult<T> + Send + 'static,
    {
        let repo = Arc::clone(&self.repo);
        tokio::task::spawn_blocking(move || {
            let guard = repo.lock();
            f(guard.as_ref())
        })
        .await
        .map_err(|e| HistoryError::Task(e.to_string()))?
    }

    /// Run `f` on the blocking pool; fails when there is no repository
    async fn with_repo<T, F>(&self, f: F) -> HistoryResult<T>
    where
        T: Send + 'static,
        F: FnOnce(&Repository) -> HistoryResult<T> + Send + 'static,
    {
        let root = self.root.clone();
        self.with_optional_repo(move |repo| match repo {
            Some(repo) => f(repo),
            None => Err(HistoryError::NoRepository { path: root }),
        })
        .await
    }
}

#[async_trait]
impl HistoryBackend for GitBackend {
    async fn commit(&self, message: &str, paths: &[PathBuf]) -> HistoryResult<RevisionId> {
        let message = message.to_string();
        let paths = paths.to_vec();
        let signature = self.signature.clone();
        self.with_repo(move |repo| {
            commit_paths(repo, &signature, &message, &paths).map_err(|e| match e {
                HistoryError::Git(err) if err.code() == ErrorCode::Locked => {
                    HistoryError::Locked(err.message().to_string())
                }
                other => other,
            })
        })
        .await
    }

    async fn history(&self, path: &Path, limit: usize) -> HistoryResult<Vec<Revision>> {
        let path = path.to_path_buf();
        self.with_optional_repo(move |repo| match repo {
            Some(repo) => path_history(repo, &path, limit),
            None => Ok(Vec::new()),
        })
        .await
    }

    async fn content_at(&self, path: &Path, revision: &str) -> HistoryResult<Vec<u8>> {
        let path = path.to_path_buf();
        let revision = revision.to_string();
        self.with_repo(move |repo| blob_at(repo, &path, &revision)).await
    }

    async fn checkout_at(&self, path: &Path, revision: &str) -> HistoryResult<()> {
        let path = path.to_path_buf();
        let revision = revision.to_string();
        self.with_repo(move |repo| {
            let content = blob_at(repo, &path, &revision)?;
            let target = workdir(repo)?.join(&path);
            write_atomically(&target, &content)?;
            debug!("Checked out {} at {}", path.display(), revision);
            Ok(())
        })
        .await
    }

    async fn current_revision(&self) -> HistoryResult<Option<RevisionId>> {
        self.with_optional_repo(|repo| match repo {
            Some(repo) => {
                Ok(head_commit(repo)?.map(|commit| RevisionId::new(commit.id().to_string())))
            }
            None => Ok(None),
        })
        .await
    }

    async fn diff(&self, path: &Path, revision: &str) -> HistoryResult<String> {
        let path = path.to_path_buf();
        let revision = revision.to_string();
        self.with_repo(move |repo| diff_against_workdir(repo, &path, &revision))
            .await
    }

    async fn status(&self, prefix: &Path) -> HistoryResult<Vec<PathStatus>> {
        let prefix = prefix.to_path_buf();
        self.with_repo(move |repo| path_status(repo, &prefix)).await
    }

    async fn is_repository(&self) -> bool {
        self.repo.lock().is_some()
    }
}

fn workdir(repo: &Repository) -> HistoryResult<&Path> {
    repo.workdir().ok_or_else(|| HistoryError::NoRepository {
        path: repo.path().to_path_buf(),
    })
}

fn head_commit(repo: &Repository) -> HistoryResult<Option<Commit<'_>>> {
    match repo.head() {
        Ok(head) => Ok(Some(head.peel_to_commit()?)),
        Err(e) if matches!(e.code(), ErrorCode::UnbornBranch | ErrorCode::NotFound) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn commit_paths(
    repo: &Repository,
    signature: &Signature,
    message: &str,
    paths: &[PathBuf],
) -> HistoryResult<RevisionId> {
    let mut index = repo.index()?;
    match stage_and_commit(repo, &mut index, signature, message, paths) {
        Ok(revision) => {
            if let Err(e) = index.write() {
                warn!("Committed {} but could not write the index: {}", revision.short(), e);
            }
            Ok(revision)
        }
        Err(e) => {
            // the cached index is shared with later commits; drop what this one staged
            index.read(true)?;
            Err(e)
        }
    }
}

/// Stage `paths` in the in-memory index and commit the resulting tree.
///
/// Nothing is written to the on-disk index here.
fn stage_and_commit(
    repo: &Repository,
    index: &mut Index,
    signature: &Signature,
    message: &str,
    paths: &[PathBuf],
) -> HistoryResult<RevisionId> {
    let workdir = workdir(repo)?;
    if paths.is_empty() {
        index.add_all(["*"], IndexAddOption::DEFAULT, None)?;
        index.update_all(["*"], None)?;
    } else {
        for path in paths {
            if workdir.join(path).is_file() {
                index.add_path(path)?;
            } else {
                index.remove_path(path)?;
            }
        }
    }

    let tree_id = index.write_tree()?;
    let tree = repo.find_tree(tree_id)?;
    let parent = head_commit(repo)?;
    let unchanged = match &parent {
        Some(parent) => parent.tree_id() == tree_id,
        None => tree.len() == 0,
    };
    if unchanged {
        return Err(HistoryError::NothingToCommit);
    }

    let sig = git2::Signature::now(&signature.name, &signature.email)?;
    let parents: Vec<&Commit<'_>> = parent.iter().collect();
    let oid = repo.commit(Some("HEAD"), &sig, &sig, message, &tree, &parents)?;
    debug!("Committed {} ({} paths)", oid, paths.len());
    Ok(RevisionId::new(oid.to_string()))
}

fn entry_id(tree: &Tree<'_>, path: &Path) -> Option<Oid> {
    tree.get_path(path).ok().map(|entry| entry.id())
}

fn path_history(repo: &Repository, path: &Path, limit: usize) -> HistoryResult<Vec<Revision>> {
    if limit == 0 || head_commit(repo)?.is_none() {
        return Ok(Vec::new());
    }

    let mut walk = repo.revwalk()?;
    walk.set_sorting(Sort::TOPOLOGICAL | Sort::TIME)?;
    walk.push_head()?;

    let mut revisions = Vec::new();
    for oid in walk {
        let commit = repo.find_commit(oid?)?;
        let current = entry_id(&commit.tree()?, path);
        let previous = match commit.parent(0) {
            Ok(parent) => entry_id(&parent.tree()?, path),
            Err(_) => None,
        };
        if current != previous {
            revisions.push(to_revision(&commit));
            if revisions.len() >= limit {
                break;
            }
        }
    }
    Ok(revisions)
}

fn to_revision(commit: &Commit<'_>) -> Revision {
    Revision {
        id: RevisionId::new(commit.id().to_string()),
        timestamp: DateTime::<Utc>::from_timestamp(commit.time().seconds(), 0).unwrap_or_default(),
        author: commit.author().name().unwrap_or_default().to_string(),
        message: commit.message().unwrap_or_default().trim_end().to_string(),
    }
}

fn not_found(revision: &str, path: &Path) -> HistoryError {
    HistoryError::RevisionNotFound {
        revision: revision.to_string(),
        path: path.to_path_buf(),
    }
}

fn resolve_commit<'r>(repo: &'r Repository, revision: &str, path: &Path) -> HistoryResult<Commit<'r>> {
    repo.revparse_single(revision)
        .and_then(|object| object.peel_to_commit())
        .map_err(|_| not_found(revision, path))
}

fn blob_at(repo: &Repository, path: &Path, revision: &str) -> HistoryResult<Vec<u8>> {
    let commit = resolve_commit(repo, revision, path)?;
    let entry = commit
        .tree()?
        .get_path(path)
        .map_err(|_| not_found(revision, path))?;
    let blob = repo
        .find_blob(entry.id())
        .map_err(|_| not_found(revision, path))?;
    Ok(blob.content().to_vec())
}

fn diff_against_workdir(repo: &Repository, path: &Path, revision: &str) -> HistoryResult<String> {
    let tree = resolve_commit(repo, revision, path)?.tree()?;
    let mut opts = DiffOptions::new();
    opts.pathspec(path)
        .disable_pathspec_match(true)
        .include_untracked(true)
        .show_untracked_content(true);
    let diff = repo.diff_tree_to_workdir(Some(&tree), Some(&mut opts))?;

    let mut out = String::new();
    diff.print(DiffFormat::Patch, |_delta, _hunk, line| {
        if matches!(line.origin(), '+' | '-' | ' ') {
            out.push(line.origin());
        }
        out.push_str(&String::from_utf8_lossy(line.content()));
        true
    })?;
    Ok(out)
}

fn path_status(repo: &Repository, prefix: &Path) -> HistoryResult<Vec<PathStatus>> {
    let mut opts = StatusOptions::new();
    if !prefix.as_os_str().is_empty() {
        opts.pathspec(prefix);
    }
    opts.include_untracked(true)
        .recurse_untracked_dirs(true)
        .include_ignored(false);

    let statuses = repo.statuses(Some(&mut opts))?;
    let mut out = Vec::new();
    for entry in statuses.iter() {
        let Some(path) = entry.path() else {
            continue;
        };
        let status = entry.status();
        let state = if status.contains(Status::WT_NEW) {
            PathState::Untracked
        } else if status.contains(Status::WT_DELETED) {
            PathState::Deleted
        } else if status.intersects(Status::WT_MODIFIED | Status::WT_TYPECHANGE | Status::WT_RENAMED) {
            PathState::Modified
        } else if status.intersects(
            Status::INDEX_NEW
                | Status::INDEX_MODIFIED
                | Status::INDEX_DELETED
                | Status::INDEX_RENAMED
                | Status::INDEX_TYPECHANGE,
        ) {
            PathState::Staged
        } else {
            continue;
        };
        out.push(PathStatus {
            path: PathBuf::from(path),
            state,
        });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn backend(dir: &TempDir) -> GitBackend {
        GitBackend::init(dir.path(), Signature::new("Tester", "tester@example.com")).unwrap()
    }

    fn write(dir: &TempDir, rel: &str, content: &str) {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    #[tokio::test]
    async fn commit_then_read_back() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "docs/a.mdx", "one");

        let rev = git.commit("first", &[PathBuf::from("docs/a.mdx")]).await.unwrap();
        assert_eq!(rev.as_str().len(), 40);
        assert_eq!(git.current_revision().await.unwrap(), Some(rev.clone()));
        assert_eq!(
            git.content_at(Path::new("docs/a.mdx"), rev.as_str()).await.unwrap(),
            b"one"
        );
    }

    #[tokio::test]
    async fn commit_without_changes_is_nothing_to_commit() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "a.mdx", "one");
        git.commit("first", &[PathBuf::from("a.mdx")]).await.unwrap();

        let err = git.commit("again", &[PathBuf::from("a.mdx")]).await.unwrap_err();
        assert!(err.is_nothing_to_commit());
    }

    #[tokio::test]
    async fn empty_repository_has_no_revision_and_nothing_to_commit() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        assert_eq!(git.current_revision().await.unwrap(), None);
        assert!(git.commit("nothing", &[]).await.unwrap_err().is_nothing_to_commit());
    }

    #[tokio::test]
    async fn commit_only_stages_given_paths() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "a.mdx", "a");
        write(&dir, "b.mdx", "b");

        let rev = git.commit("only a", &[PathBuf::from("a.mdx")]).await.unwrap();
        assert!(git.content_at(Path::new("b.mdx"), rev.as_str()).await.is_err());

        let status = git.status(Path::new("b.mdx")).await.unwrap();
        assert!(status.contains(&PathStatus {
            path: PathBuf::from("b.mdx"),
            state: PathState::Untracked,
        }));
    }

    #[tokio::test]
    async fn commit_with_no_paths_takes_everything() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "a.mdx", "a");
        write(&dir, "nested/b.mdx", "b");

        let rev = git.commit("all", &[]).await.unwrap();
        assert_eq!(
            git.content_at(Path::new("nested/b.mdx"), rev.as_str()).await.unwrap(),
            b"b"
        );
    }

    #[tokio::test]
    async fn history_is_newest_first_and_includes_deletion() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        let path = PathBuf::from("a.mdx");

        write(&dir, "a.mdx", "v1");
        git.commit("create", &[path.clone()]).await.unwrap();
        write(&dir, "other.mdx", "x");
        git.commit("unrelated", &[PathBuf::from("other.mdx")]).await.unwrap();
        write(&dir, "a.mdx", "v2");
        git.commit("update", &[path.clone()]).await.unwrap();
        std::fs::remove_file(dir.path().join("a.mdx")).unwrap();
        git.commit("delete", &[path.clone()]).await.unwrap();

        let history = git.history(&path, 20).await.unwrap();
        let messages: Vec<&str> = history.iter().map(|r| r.message.as_str()).collect();
        assert_eq!(messages, vec!["delete", "update", "create"]);
        assert!(history.iter().all(|r| r.author == "Tester"));

        let limited = git.history(&path, 2).await.unwrap();
        assert_eq!(limited.len(), 2);
        assert_eq!(limited[0].message, "delete");
    }

    #[tokio::test]
    async fn history_without_repository_is_empty() {
        let dir = TempDir::new().unwrap();
        let git = GitBackend::open(dir.path(), Signature::new("T", "t@example.com")).unwrap();
        assert!(!git.is_repository().await);
        assert!(git.history(Path::new("a.mdx"), 10).await.unwrap().is_empty());
        assert_eq!(git.current_revision().await.unwrap(), None);
        assert!(matches!(
            git.commit("x", &[]).await.unwrap_err(),
            HistoryError::NoRepository { .. }
        ));
    }

    #[tokio::test]
    async fn checkout_restores_old_content_without_committing() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        let path = PathBuf::from("a.mdx");

        write(&dir, "a.mdx", "v1");
        let first = git.commit("v1", &[path.clone()]).await.unwrap();
        write(&dir, "a.mdx", "v2");
        let second = git.commit("v2", &[path.clone()]).await.unwrap();

        git.checkout_at(&path, first.as_str()).await.unwrap();
        assert_eq!(std::fs::read_to_string(dir.path().join("a.mdx")).unwrap(), "v1");
        assert_eq!(git.current_revision().await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn unknown_revision_or_path_is_revision_not_found() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "a.mdx", "v1");
        let rev = git.commit("v1", &[PathBuf::from("a.mdx")]).await.unwrap();

        let err = git
            .content_at(Path::new("a.mdx"), "0000000000000000000000000000000000000000")
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::RevisionNotFound { .. }));

        let err = git
            .checkout_at(Path::new("missing.mdx"), rev.as_str())
            .await
            .unwrap_err();
        assert!(matches!(err, HistoryError::RevisionNotFound { .. }));
    }

    #[tokio::test]
    async fn diff_shows_working_changes() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        let path = PathBuf::from("a.mdx");
        write(&dir, "a.mdx", "line one\nline two\n");
        let rev = git.commit("v1", &[path.clone()]).await.unwrap();

        assert_eq!(git.diff(&path, rev.as_str()).await.unwrap(), "");

        write(&dir, "a.mdx", "line one\nline 2\n");
        let diff = git.diff(&path, rev.as_str()).await.unwrap();
        assert!(diff.contains("-line two\n"));
        assert!(diff.contains("+line 2\n"));
    }

    #[tokio::test]
    async fn status_reports_modified_and_deleted() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        write(&dir, "docs/a.mdx", "a");
        write(&dir, "docs/b.mdx", "b");
        git.commit("both", &[]).await.unwrap();

        write(&dir, "docs/a.mdx", "changed");
        std::fs::remove_file(dir.path().join("docs/b.mdx")).unwrap();

        let mut status = git.status(Path::new("docs")).await.unwrap();
        status.sort_by(|a, b| a.path.cmp(&b.path));
        assert_eq!(
            status,
            vec![
                PathStatus {
                    path: PathBuf::from("docs/a.mdx"),
                    state: PathState::Modified,
                },
                PathStatus {
                    path: PathBuf::from("docs/b.mdx"),
                    state: PathState::Deleted,
                },
            ]
        );
    }

    #[tokio::test]
    async fn failed_commit_is_not_picked_up_by_the_next_one() {
        let dir = TempDir::new().unwrap();
        let git = backend(&dir);
        let a = PathBuf::from("a.mdx");
        write(&dir, "a.mdx", "v1");
        git.commit("create a", &[a.clone()]).await.unwrap();

        let head_ref = Repository::open(dir.path())
            .unwrap()
            .head()
            .unwrap()
            .name()
            .unwrap()
            .to_string();
        let lock = dir.path().join(".git").join(format!("{head_ref}.lock"));
        std::fs::write(&lock, "").unwrap();

        write(&dir, "a.mdx", "v2");
        let err = git.commit("update a", &[a.clone()]).await.unwrap_err();
        assert!(matches!(err, HistoryError::Locked(_)));
        std::fs::remove_file(&lock).unwrap();

        write(&dir, "b.mdx", "b");
        let rev = git.commit("create b", &[PathBuf::from("b.mdx")]).await.unwrap();
        assert_eq!(git.content_at(&a, rev.as_str()).await.unwrap(), b"v1");

        let messages: Vec<String> = git
            .history(&a, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.message)
            .collect();
        assert_eq!(messages, vec!["create a"]);
        assert_eq!(
            git.status(Path::new("")).await.unwrap(),
            vec![PathStatus {
                path: a.clone(),
                state: PathState::Modified,
            }]
        );
    }
}
