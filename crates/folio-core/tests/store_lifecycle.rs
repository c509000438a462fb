//! End-to-end lifecycle of documents in a git-backed store

use folio_core::test_utils::{capability, sample_document, TestStore};
use folio_core::{Capability, DocumentPatch, ErrorKind, PathState};

#[tokio::test]
async fn ising_model_scenario() {
    let t = TestStore::git();
    let cap = capability();

    t.store
        .create(&cap, "ising-model", sample_document("Ising Model Simulator"))
        .await
        .unwrap();
    assert_eq!(
        t.store.read(&cap, "ising-model").unwrap().title(),
        "Ising Model Simulator"
    );

    t.store
        .update(
            &cap,
            "ising-model",
            DocumentPatch {
                results: Some("validated against analytic solution".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let doc = t.store.read(&cap, "ising-model").unwrap();
    assert_eq!(doc.metadata.results, "validated against analytic solution");
    assert_eq!(doc.title(), "Ising Model Simulator");

    t.store.delete(&cap, "ising-model").await.unwrap();
    assert!(!t.store.list(&cap).unwrap().iter().any(|s| s.as_str() == "ising-model"));
    assert!(!t.store.exists(&cap, "ising-model").unwrap());
    assert_eq!(
        t.store.read(&cap, "ising-model").unwrap_err().kind(),
        ErrorKind::NotFound
    );

    let history = t.store.list_history(&cap, "ising-model").await.unwrap();
    let messages: Vec<&str> = history.iter().map(|r| r.message.as_str()).collect();
    assert_eq!(
        messages,
        vec![
            "Delete document: Ising Model Simulator",
            "Update document: Ising Model Simulator",
            "Create document: Ising Model Simulator",
        ]
    );
}

#[tokio::test]
async fn create_then_read_returns_written_data() {
    let t = TestStore::git();
    let cap = capability();
    let mut doc = sample_document("Round Trip");
    doc.metadata.code_url = Some("https://github.com/example/round-trip".into());
    doc.metadata.extra.insert("featured".into(), true.into());

    t.store.create(&cap, "round-trip", doc.clone()).await.unwrap();
    assert_eq!(t.store.read(&cap, "round-trip").unwrap(), doc);
}

#[tokio::test]
async fn update_keeps_unknown_frontmatter_keys_on_disk() {
    let t = TestStore::git();
    let cap = capability();
    let mut doc = sample_document("Featured");
    doc.metadata.extra.insert("featured".into(), true.into());
    t.store.create(&cap, "featured", doc).await.unwrap();

    t.store
        .update(
            &cap,
            "featured",
            DocumentPatch {
                results: Some("shipped".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let stored = std::fs::read_to_string(t.document_path("featured")).unwrap();
    assert!(stored.contains("results: shipped"));
    assert!(stored.contains("featured: true"));
}

#[tokio::test]
async fn second_create_is_already_exists() {
    let t = TestStore::git();
    let cap = capability();

    t.store.create(&cap, "dup", sample_document("First")).await.unwrap();
    let err = t
        .store
        .create(&cap, "dup", sample_document("Second"))
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::AlreadyExists);
    assert_eq!(t.store.read(&cap, "dup").unwrap().title(), "First");
    assert_eq!(t.store.list_history(&cap, "dup").await.unwrap().len(), 1);
}

#[tokio::test]
async fn mutations_on_missing_documents_are_not_found() {
    let t = TestStore::git();
    let cap = capability();

    let update = t
        .store
        .update(&cap, "ghost", DocumentPatch::default())
        .await
        .unwrap_err();
    assert_eq!(update.kind(), ErrorKind::NotFound);
    assert_eq!(
        t.store.delete(&cap, "ghost").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert_eq!(
        t.store.rollback(&cap, "ghost", "HEAD").await.unwrap_err().kind(),
        ErrorKind::NotFound
    );
    assert!(t.store.list_history(&cap, "ghost").await.unwrap().is_empty());
}

#[tokio::test]
async fn n_mutations_give_n_revisions_newest_first() {
    let t = TestStore::git();
    let cap = capability();

    t.store.create(&cap, "counted", sample_document("v0")).await.unwrap();
    for i in 1..5 {
        t.store
            .update(
                &cap,
                "counted",
                DocumentPatch {
                    title: Some(format!("v{i}")),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
    }

    let history = t.store.list_history(&cap, "counted").await.unwrap();
    assert_eq!(history.len(), 5);
    assert_eq!(history[0].message, "Update document: v4");
    assert_eq!(history[4].message, "Create document: v0");
    assert!(history.windows(2).all(|w| w[0].timestamp >= w[1].timestamp));

    let limited = t.store.list_history_limited(&cap, "counted", 2).await.unwrap();
    assert_eq!(limited.len(), 2);
}

#[tokio::test]
async fn history_is_scoped_to_one_document() {
    let t = TestStore::git();
    let cap = capability();

    t.store.create(&cap, "one", sample_document("One")).await.unwrap();
    t.store.create(&cap, "two", sample_document("Two")).await.unwrap();

    let history = t.store.list_history(&cap, "one").await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].message, "Create document: One");
}

#[tokio::test]
async fn rollback_restores_previous_content() {
    let t = TestStore::git();
    let cap = capability();

    t.store.create(&cap, "doc", sample_document("Original")).await.unwrap();
    t.store
        .update(
            &cap,
            "doc",
            DocumentPatch {
                results: Some("first results".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let before = t.store.read(&cap, "doc").unwrap();
    let target = t.store.list_history(&cap, "doc").await.unwrap()[0].id.clone();

    t.store
        .update(
            &cap,
            "doc",
            DocumentPatch {
                results: Some("second results".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();

    let restored = t.store.rollback(&cap, "doc", target.as_str()).await.unwrap();
    assert_eq!(restored, before);
    assert_eq!(t.store.read(&cap, "doc").unwrap(), before);

    let history = t.store.list_history(&cap, "doc").await.unwrap();
    assert_eq!(history.len(), 4);
    assert!(history[0].message.starts_with("Rollback doc to "));
}

#[tokio::test]
async fn rollback_to_unknown_revision_is_revision_not_found() {
    let t = TestStore::git();
    let cap = capability();
    t.store.create(&cap, "doc", sample_document("Doc")).await.unwrap();

    let err = t
        .store
        .rollback(&cap, "doc", "0000000000000000000000000000000000000000")
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::RevisionNotFound);
}

#[tokio::test]
async fn content_at_reads_deleted_documents() {
    let t = TestStore::git();
    let cap = capability();

    let created = t
        .store
        .create(&cap, "old", sample_document("Old Project"))
        .await
        .unwrap()
        .unwrap();
    t.store.delete(&cap, "old").await.unwrap();

    let doc = t.store.content_at(&cap, "old", created.as_str()).await.unwrap();
    assert_eq!(doc.title(), "Old Project");
}

#[tokio::test]
async fn diff_against_revision() {
    let t = TestStore::git();
    let cap = capability();

    let created = t
        .store
        .create(&cap, "doc", sample_document("Doc"))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(t.store.diff(&cap, "doc", created.as_str()).await.unwrap(), "");

    t.store
        .update(
            &cap,
            "doc",
            DocumentPatch {
                results: Some("measured".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap();
    let diff = t.store.diff(&cap, "doc", created.as_str()).await.unwrap();
    assert!(diff.contains("-results: pending"));
    assert!(diff.contains("+results: measured"));
}

#[tokio::test]
async fn update_rejects_clearing_required_fields() {
    let t = TestStore::git();
    let cap = capability();
    t.store.create(&cap, "doc", sample_document("Doc")).await.unwrap();

    let err = t
        .store
        .update(
            &cap,
            "doc",
            DocumentPatch {
                title: Some(String::new()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidDocument);
    assert_eq!(t.store.read(&cap, "doc").unwrap().title(), "Doc");
}

#[test]
fn capability_requires_authenticated_gate() {
    let err = Capability::grant(&false).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
}

#[tokio::test]
async fn failed_commit_is_not_recorded_under_another_document() {
    let t = TestStore::git();
    let cap = capability();
    t.store.create(&cap, "alpha", sample_document("Alpha")).await.unwrap();

    let head = std::fs::read_to_string(t.dir.path().join(".git/HEAD")).unwrap();
    let head_ref = head.trim().trim_start_matches("ref: ");
    let lock = t.dir.path().join(".git").join(format!("{head_ref}.lock"));
    std::fs::write(&lock, "").unwrap();

    let err = t
        .store
        .update(
            &cap,
            "alpha",
            DocumentPatch {
                results: Some("measured".into()),
                ..Default::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::VersionControl);
    std::fs::remove_file(&lock).unwrap();

    t.store.create(&cap, "beta", sample_document("Beta")).await.unwrap();

    let messages: Vec<String> = t
        .store
        .list_history(&cap, "alpha")
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.message)
        .collect();
    assert_eq!(messages, vec!["Create document: Alpha"]);

    let diverged = t.store.status(&cap).await.unwrap();
    assert_eq!(diverged.len(), 1);
    assert_eq!(diverged[0].slug.as_ref().map(|s| s.as_str()), Some("alpha"));
    assert_eq!(diverged[0].state, PathState::Modified);
}
