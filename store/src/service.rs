//! Async facade over the blocking store core
//!
//! Store operations are filesystem and libgit2 work, so request-handling
//! tasks must not run them on the async runtime directly. `StoreService`
//! clones each call's arguments, pushes the work through
//! `spawn_blocking`, and bounds the wait with the configured deadline.
//! Deadline expiry abandons the wait, not the work: the blocking task
//! still runs to completion, and the per-owner locks keep it consistent
//! with whatever call comes next.

use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::store::ContentStore;
use crate::types::{RepoStats, RevisionInfo, SearchMatch};
use std::sync::Arc;
use std::time::Duration;

#[derive(Clone)]
pub struct StoreService {
    store: Arc<ContentStore>,
    timeout: Duration,
}

impl StoreService {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        let timeout = config.operation_timeout;
        Ok(Self {
            store: Arc::new(ContentStore::new(config)?),
            timeout,
        })
    }

    /// Wrap an already-built store.
    pub fn with_store(store: Arc<ContentStore>, timeout: Duration) -> Self {
        Self { store, timeout }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// The blocking core, for synchronous callers sharing this service.
    pub fn store(&self) -> &Arc<ContentStore> {
        &self.store
    }

    async fn run<T, F>(&self, op: F) -> StoreResult<T>
    where
        F: FnOnce(&ContentStore) -> StoreResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || op(&store));
        match tokio::time::timeout(self.timeout, task).await {
            Ok(Ok(result)) => result,
            Ok(Err(join_err)) => Err(StoreError::StorageUnavailable(format!(
                "store task failed: {join_err}"
            ))),
            Err(_) => Err(StoreError::StorageUnavailable(format!(
                "store operation timed out after {:?}",
                self.timeout
            ))),
        }
    }

    pub async fn save(
        &self,
        owner: &str,
        path: &str,
        body: &str,
        actor: &str,
        message: Option<&str>,
    ) -> StoreResult<String> {
        let owner = owner.to_string();
        let path = path.to_string();
        let body = body.to_string();
        let actor = actor.to_string();
        let message = message.map(str::to_string);
        self.run(move |store| store.save(&owner, &path, &body, &actor, message.as_deref()))
            .await
    }

    pub async fn delete(&self, owner: &str, path: &str, actor: &str) -> StoreResult<String> {
        let owner = owner.to_string();
        let path = path.to_string();
        let actor = actor.to_string();
        self.run(move |store| store.delete(&owner, &path, &actor))
            .await
    }

    pub async fn read(
        &self,
        owner: &str,
        path: &str,
        revision: Option<&str>,
    ) -> StoreResult<String> {
        let owner = owner.to_string();
        let path = path.to_string();
        let revision = revision.map(str::to_string);
        self.run(move |store| store.read(&owner, &path, revision.as_deref()))
            .await
    }

    pub async fn history(
        &self,
        owner: &str,
        path: &str,
        limit: usize,
    ) -> StoreResult<Vec<RevisionInfo>> {
        let owner = owner.to_string();
        let path = path.to_string();
        self.run(move |store| store.history(&owner, &path, limit))
            .await
    }

    pub async fn diff(
        &self,
        owner: &str,
        path: &str,
        from: &str,
        to: Option<&str>,
    ) -> StoreResult<String> {
        let owner = owner.to_string();
        let path = path.to_string();
        let from = from.to_string();
        let to = to.map(str::to_string);
        self.run(move |store| store.diff(&owner, &path, &from, to.as_deref()))
            .await
    }

    pub async fn revert(
        &self,
        owner: &str,
        path: &str,
        to_revision: &str,
        actor: &str,
    ) -> StoreResult<String> {
        let owner = owner.to_string();
        let path = path.to_string();
        let to_revision = to_revision.to_string();
        let actor = actor.to_string();
        self.run(move |store| store.revert(&owner, &path, &to_revision, &actor))
            .await
    }

    pub async fn search(
        &self,
        owner: &str,
        query: &str,
        file_pattern: Option<&str>,
    ) -> StoreResult<Vec<SearchMatch>> {
        let owner = owner.to_string();
        let query = query.to_string();
        let file_pattern = file_pattern.map(str::to_string);
        self.run(move |store| store.search(&owner, &query, file_pattern.as_deref()))
            .await
    }

    pub async fn stats(&self, owner: &str) -> StoreResult<RepoStats> {
        let owner = owner.to_string();
        self.run(move |store| store.stats(&owner)).await
    }

    pub async fn delete_repository(&self, owner: &str) -> StoreResult<bool> {
        let owner = owner.to_string();
        self.run(move |store| store.delete_repository(&owner)).await
    }

    pub async fn list_owners(&self) -> StoreResult<Vec<String>> {
        self.run(|store| store.list_owners()).await
    }

    pub async fn list_files(&self, owner: &str) -> StoreResult<Vec<String>> {
        let owner = owner.to_string();
        self.run(move |store| store.list_files(&owner)).await
    }

    pub async fn recent_revisions(
        &self,
        owner: &str,
        limit: usize,
    ) -> StoreResult<Vec<RevisionInfo>> {
        let owner = owner.to_string();
        self.run(move |store| store.recent_revisions(&owner, limit))
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_with_timeout_overrides_config() {
        let tmp = TempDir::new().unwrap();
        let config = StoreConfig::new(tmp.path());
        let service = StoreService::new(config)
            .unwrap()
            .with_timeout(Duration::from_millis(250));
        assert_eq!(service.timeout, Duration::from_millis(250));
    }
}
