use futures::future::join_all;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use vellum_store::{
    CommitOutcome, ContentStore, RevisionInfo, SearchMatch, StoreConfig, StoreError, StoreResult,
    StoreService, VersionControl,
};

fn new_service() -> (TempDir, StoreService) {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig::new(tmp.path());
    let service = StoreService::new(config).unwrap();
    (tmp, service)
}

#[tokio::test]
async fn test_save_read_history_through_service() {
    let (_tmp, service) = new_service();

    let rev = service
        .save("course-1", "resources/notes-a1.md", "async body\n", "alice", None)
        .await
        .unwrap();
    assert_eq!(rev.len(), 40);

    let body = service.read("course-1", "resources/notes-a1.md", None).await.unwrap();
    assert_eq!(body, "async body\n");

    let history = service.history("course-1", "resources/notes-a1.md", 10).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].audit_actor.as_deref(), Some("alice"));
}

#[tokio::test]
async fn test_full_item_lifecycle_through_service() {
    let (_tmp, service) = new_service();
    let path = "assessments/quiz-q1.md";

    let first = service.save("course-1", path, "v1\n", "alice", None).await.unwrap();
    service.save("course-1", path, "v2\n", "alice", None).await.unwrap();

    service.revert("course-1", path, &first, "bob").await.unwrap();
    assert_eq!(service.read("course-1", path, None).await.unwrap(), "v1\n");

    let patch = service.diff("course-1", path, &first, None).await.unwrap();
    assert!(patch.is_empty()); // reverted content matches the first revision

    let hits = service.search("course-1", "v1", None).await.unwrap();
    assert_eq!(hits.len(), 1);

    service.delete("course-1", path, "alice").await.unwrap();
    let err = service.read("course-1", path, None).await.unwrap_err();
    assert!(err.is_not_found());

    assert_eq!(service.list_owners().await.unwrap(), vec!["course-1".to_string()]);
    assert!(service.delete_repository("course-1").await.unwrap());
    assert!(!service.stats("course-1").await.unwrap().exists);
}

#[tokio::test]
async fn test_concurrent_saves_to_same_owner_serialize() {
    let (_tmp, service) = new_service();
    let path = "resources/notes-a1.md";

    let saves = (0..4).map(|i| {
        let service = service.clone();
        async move {
            service
                .save("course-1", path, &format!("concurrent v{i}\n"), "alice", None)
                .await
        }
    });
    let results: Vec<_> = join_all(saves).await;
    for result in &results {
        assert!(result.is_ok(), "save failed: {result:?}");
    }

    // Four distinct bodies, serialized by the owner lock: four revisions.
    let history = service.history("course-1", path, 10).await.unwrap();
    assert_eq!(history.len(), 4);
    let ids: std::collections::HashSet<_> = history.iter().map(|r| r.id.clone()).collect();
    assert_eq!(ids.len(), 4);
}

#[tokio::test]
async fn test_concurrent_saves_to_distinct_owners() {
    let (_tmp, service) = new_service();

    let owners = ["course-a", "course-b", "course-c"];
    let saves = owners.iter().map(|owner| {
        let service = service.clone();
        async move {
            service
                .save(owner, "resources/notes.md", "parallel\n", "alice", None)
                .await
        }
    });
    for result in join_all(saves).await {
        result.unwrap();
    }

    let listed = service.list_owners().await.unwrap();
    assert_eq!(listed.len(), owners.len());
    for owner in owners {
        assert!(service.stats(owner).await.unwrap().exists);
    }
}

#[tokio::test]
async fn test_errors_pass_through_the_facade() {
    let (_tmp, service) = new_service();

    let err = service.read("course-9", "resources/x.md", None).await.unwrap_err();
    assert!(err.is_not_found());

    let err = service
        .save("bad owner", "resources/x.md", "x\n", "alice", None)
        .await
        .unwrap_err();
    assert!(matches!(err, StoreError::InvalidInput(_)));
}

/// Backend whose repository check stalls, for exercising the deadline.
struct SlowBackend {
    delay: Duration,
}

impl VersionControl for SlowBackend {
    fn is_repo(&self, _dir: &Path) -> bool {
        std::thread::sleep(self.delay);
        false
    }

    fn init(&self, _dir: &Path, _name: &str, _email: &str) -> StoreResult<()> {
        Ok(())
    }

    fn commit_paths(&self, _dir: &Path, _paths: &[&str], _message: &str) -> StoreResult<CommitOutcome> {
        Ok(CommitOutcome::NoChanges)
    }

    fn remove_paths(&self, _dir: &Path, _paths: &[&str], _message: &str) -> StoreResult<CommitOutcome> {
        Ok(CommitOutcome::NoChanges)
    }

    fn is_tracked(&self, _dir: &Path, _path: &str) -> StoreResult<bool> {
        Ok(false)
    }

    fn tracked_files(&self, _dir: &Path) -> StoreResult<Vec<String>> {
        Ok(Vec::new())
    }

    fn resolve(&self, _dir: &Path, revision: &str) -> StoreResult<String> {
        Ok(revision.to_string())
    }

    fn read_at(&self, _dir: &Path, _path: &str, _revision: &str) -> StoreResult<Vec<u8>> {
        Ok(Vec::new())
    }

    fn log_path(&self, _dir: &Path, _path: &str, _limit: usize) -> StoreResult<Vec<RevisionInfo>> {
        Ok(Vec::new())
    }

    fn log_all(&self, _dir: &Path, _limit: usize) -> StoreResult<Vec<RevisionInfo>> {
        Ok(Vec::new())
    }

    fn diff_path(&self, _dir: &Path, _path: &str, _from: &str, _to: &str) -> StoreResult<String> {
        Ok(String::new())
    }

    fn grep(
        &self,
        _dir: &Path,
        _pattern: &regex::Regex,
        _file_glob: Option<&glob::Pattern>,
    ) -> StoreResult<Vec<SearchMatch>> {
        Ok(Vec::new())
    }

    fn revision_count(&self, _dir: &Path) -> StoreResult<usize> {
        Ok(0)
    }

    fn restore_path(&self, _dir: &Path, _path: &str) -> StoreResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_deadline_expiry_is_storage_unavailable() {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig::new(tmp.path());
    let store = ContentStore::with_backend(
        config,
        Arc::new(SlowBackend {
            delay: Duration::from_millis(500),
        }),
    )
    .unwrap();
    let service = StoreService::with_store(Arc::new(store), Duration::from_millis(50));

    let err = service.stats("course-1").await.unwrap_err();
    match err {
        StoreError::StorageUnavailable(msg) => assert!(msg.contains("timed out"), "{msg}"),
        other => panic!("expected StorageUnavailable, got {other:?}"),
    }
}

#[tokio::test]
async fn test_slow_operation_within_deadline_succeeds() {
    let tmp = TempDir::new().unwrap();
    let config = StoreConfig::new(tmp.path());
    let store = ContentStore::with_backend(
        config,
        Arc::new(SlowBackend {
            delay: Duration::from_millis(20),
        }),
    )
    .unwrap();
    let service = StoreService::with_store(Arc::new(store), Duration::from_secs(5));

    let stats = service.stats("course-1").await.unwrap();
    assert!(!stats.exists);
}
