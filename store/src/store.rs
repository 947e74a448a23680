//! The content version store
//!
//! `ContentStore` is the synchronous core: it owns the repository
//! lifecycle, serializes same-owner mutations, and turns item-level
//! operations (save, delete, read, history, diff, revert, search) into
//! backend calls. Metadata stays with the caller; the store's contract
//! is that every mutation returns the revision id the caller should
//! persist next to its row.

use crate::address::{validate_owner, validate_rel_path};
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::lifecycle::RepoManager;
use crate::locks::OwnerLocks;
use crate::types::{RepoStats, RevisionInfo, SearchMatch, DELETED_BY_TRAILER, UPDATED_BY_TRAILER};
use crate::vcs::{CommitOutcome, GitBackend, VersionControl};
use regex::Regex;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub struct ContentStore {
    manager: RepoManager,
    backend: Arc<dyn VersionControl>,
    locks: OwnerLocks,
}

impl ContentStore {
    pub fn new(config: StoreConfig) -> StoreResult<Self> {
        Self::with_backend(config, Arc::new(GitBackend::new()))
    }

    /// Build a store over a custom version-control backend.
    pub fn with_backend(
        config: StoreConfig,
        backend: Arc<dyn VersionControl>,
    ) -> StoreResult<Self> {
        config.validate().map_err(StoreError::InvalidInput)?;
        let manager = RepoManager::new(&config, Arc::clone(&backend));
        Ok(Self {
            manager,
            backend,
            locks: OwnerLocks::new(),
        })
    }

    /// Save a content item body, creating the owner repository on first
    /// use. Returns the id of the revision now holding this body: a new
    /// revision normally, or the existing newest revision touching the
    /// path when the body is byte-identical to what is already stored.
    pub fn save(
        &self,
        owner: &str,
        path: &str,
        body: &str,
        actor: &str,
        message: Option<&str>,
    ) -> StoreResult<String> {
        validate_owner(owner)?;
        validate_rel_path(path)?;
        validate_actor(actor)?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.save_locked(owner, path, body, actor, message)
    }

    /// Save with the owner lock already held. `revert` reuses this so a
    /// revert stays a single critical section.
    fn save_locked(
        &self,
        owner: &str,
        path: &str,
        body: &str,
        actor: &str,
        message: Option<&str>,
    ) -> StoreResult<String> {
        let handle = self.manager.ensure(owner)?;
        let dir = handle.dir();

        let was_tracked = self.backend.is_tracked(dir, path)?;

        // A body write can fail after truncating the file, so its error
        // branch needs the same cleanup as a failed commit.
        if let Err(err) = write_working_file(dir, path, body) {
            warn!(
                "Write failed for {}/{}: {}; restoring working tree",
                owner, path, err
            );
            self.restore_working_tree(owner, dir, path);
            return Err(err);
        }

        let name = item_name(path);
        let summary = match message {
            Some(m) if !m.trim().is_empty() => m.trim_end().to_string(),
            _ if was_tracked => format!("Updated {name}"),
            _ => format!("Created {name}"),
        };
        let full_message = format!("{summary}\n\n{UPDATED_BY_TRAILER}: {actor}");

        match self.backend.commit_paths(dir, &[path], &full_message) {
            Ok(CommitOutcome::Committed(id)) => {
                info!("Committed revision {} for {}/{}", short_id(&id), owner, path);
                Ok(id)
            }
            Ok(CommitOutcome::NoChanges) => {
                debug!("Save of {}/{} produced no changes", owner, path);
                let latest = self.backend.log_path(dir, path, 1)?;
                latest.into_iter().next().map(|rev| rev.id).ok_or_else(|| {
                    StoreError::StorageUnavailable(format!(
                        "no existing revision for unchanged path {path}"
                    ))
                })
            }
            Err(err) => {
                warn!(
                    "Commit failed for {}/{}: {}; restoring working tree",
                    owner, path, err
                );
                self.restore_working_tree(owner, dir, path);
                Err(err)
            }
        }
    }

    /// Remove a content item with a tombstone revision. The file
    /// disappears from the head tree; every prior revision remains
    /// readable through `read` with an explicit revision.
    pub fn delete(&self, owner: &str, path: &str, actor: &str) -> StoreResult<String> {
        validate_owner(owner)?;
        validate_rel_path(path)?;
        validate_actor(actor)?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Err(StoreError::NotFound(format!(
                "No repository for owner {owner}"
            )));
        }
        if !self.backend.is_tracked(&dir, path)? {
            return Err(StoreError::NotFound(format!(
                "{path} is not tracked for owner {owner}"
            )));
        }

        let message = format!(
            "Deleted {}\n\n{DELETED_BY_TRAILER}: {actor}",
            item_name(path)
        );
        match self.backend.remove_paths(&dir, &[path], &message) {
            Ok(CommitOutcome::Committed(id)) => {
                info!("Deleted {}/{} at revision {}", owner, path, short_id(&id));
                Ok(id)
            }
            Ok(CommitOutcome::NoChanges) => Err(StoreError::StorageUnavailable(format!(
                "delete of {path} produced no revision"
            ))),
            Err(err) => {
                warn!(
                    "Delete commit failed for {}/{}: {}; restoring working tree",
                    owner, path, err
                );
                self.restore_working_tree(owner, &dir, path);
                Err(err)
            }
        }
    }

    /// Read a content item body. Without a revision this serves the
    /// current state and requires the path to be tracked; with a
    /// revision (full or abbreviated id) it reads from the object store
    /// and leaves the working tree untouched.
    pub fn read(&self, owner: &str, path: &str, revision: Option<&str>) -> StoreResult<String> {
        validate_owner(owner)?;
        validate_rel_path(path)?;

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Err(StoreError::NotFound(format!(
                "No repository for owner {owner}"
            )));
        }

        match revision {
            Some(rev) => {
                let bytes = self.backend.read_at(&dir, path, rev)?;
                String::from_utf8(bytes).map_err(|_| {
                    StoreError::StorageUnavailable(format!(
                        "{path} at revision {rev} is not valid UTF-8"
                    ))
                })
            }
            None => {
                if !self.backend.is_tracked(&dir, path)? {
                    return Err(StoreError::NotFound(format!(
                        "{path} is not tracked for owner {owner}"
                    )));
                }
                match fs::read_to_string(dir.join(path)) {
                    Ok(body) => Ok(body),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                        Err(StoreError::StorageUnavailable(format!(
                            "tracked file {path} is missing from the working tree"
                        )))
                    }
                    Err(e) => Err(e.into()),
                }
            }
        }
    }

    /// Revisions that changed the given path, newest first. An owner or
    /// path with no history yields an empty list, never an error.
    pub fn history(
        &self,
        owner: &str,
        path: &str,
        limit: usize,
    ) -> StoreResult<Vec<RevisionInfo>> {
        validate_owner(owner)?;
        validate_rel_path(path)?;

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Ok(Vec::new());
        }
        self.backend.log_path(&dir, path, limit)
    }

    /// Unified diff for one path between two revisions. `to` defaults
    /// to the current head. Empty string when the file is unchanged.
    pub fn diff(
        &self,
        owner: &str,
        path: &str,
        from: &str,
        to: Option<&str>,
    ) -> StoreResult<String> {
        validate_owner(owner)?;
        validate_rel_path(path)?;

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Err(StoreError::NotFound(format!(
                "No repository for owner {owner}"
            )));
        }
        self.backend.diff_path(&dir, path, from, to.unwrap_or("HEAD"))
    }

    /// Restore a path to its content at an earlier revision by writing
    /// that content as a new revision. History is append-only: the
    /// intervening revisions stay in place. Reverting to content equal
    /// to the current state follows the no-op save rule.
    pub fn revert(
        &self,
        owner: &str,
        path: &str,
        to_revision: &str,
        actor: &str,
    ) -> StoreResult<String> {
        validate_owner(owner)?;
        validate_rel_path(path)?;
        validate_actor(actor)?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Err(StoreError::NotFound(format!(
                "No repository for owner {owner}"
            )));
        }

        let resolved = self.backend.resolve(&dir, to_revision)?;
        let bytes = self.backend.read_at(&dir, path, &resolved)?;
        let body = String::from_utf8(bytes).map_err(|_| {
            StoreError::StorageUnavailable(format!(
                "{path} at revision {to_revision} is not valid UTF-8"
            ))
        })?;

        let summary = format!("Reverted to version {}", short_id(&resolved));
        self.save_locked(owner, path, &body, actor, Some(&summary))
    }

    /// Line-oriented regex search over tracked file contents. The
    /// optional `file_pattern` is a glob over repository-relative paths.
    /// An uninitialized owner yields an empty result.
    pub fn search(
        &self,
        owner: &str,
        query: &str,
        file_pattern: Option<&str>,
    ) -> StoreResult<Vec<SearchMatch>> {
        validate_owner(owner)?;
        let pattern = Regex::new(query).map_err(|e| {
            StoreError::InvalidInput(format!("Invalid search pattern: {e}"))
        })?;
        let file_glob = match file_pattern {
            Some(p) => Some(glob::Pattern::new(p).map_err(|e| {
                StoreError::InvalidInput(format!("Invalid file pattern: {e}"))
            })?),
            None => None,
        };

        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Ok(Vec::new());
        }
        self.backend.grep(&dir, &pattern, file_glob.as_ref())
    }

    /// Size and activity statistics for one owner.
    pub fn stats(&self, owner: &str) -> StoreResult<RepoStats> {
        self.manager.stats(owner)
    }

    /// Destroy an owner's repository and all of its history. Returns
    /// `false` when nothing existed. The caller owns the ordering
    /// against its metadata rows.
    pub fn delete_repository(&self, owner: &str) -> StoreResult<bool> {
        validate_owner(owner)?;

        let lock = self.locks.for_owner(owner);
        let _guard = lock.lock().unwrap_or_else(|e| e.into_inner());
        self.manager.delete(owner)
    }

    /// All owners with an initialized repository, sorted.
    pub fn list_owners(&self) -> StoreResult<Vec<String>> {
        self.manager.list_all()
    }

    /// All tracked paths for an owner, sorted. Empty for an
    /// uninitialized owner.
    pub fn list_files(&self, owner: &str) -> StoreResult<Vec<String>> {
        validate_owner(owner)?;
        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Ok(Vec::new());
        }
        self.backend.tracked_files(&dir)
    }

    /// Repository-wide log, newest first, across all paths.
    pub fn recent_revisions(&self, owner: &str, limit: usize) -> StoreResult<Vec<RevisionInfo>> {
        validate_owner(owner)?;
        let dir = self.manager.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Ok(Vec::new());
        }
        self.backend.log_all(&dir, limit)
    }

    /// Best-effort cleanup after a failed mutation: put the touched path
    /// back to its head state so a later bare `read` never serves bytes
    /// that were not committed.
    fn restore_working_tree(&self, owner: &str, dir: &Path, path: &str) {
        if let Err(err) = self.backend.restore_path(dir, path) {
            warn!(
                "Working tree restore failed for {}/{}: {}",
                owner, path, err
            );
        }
    }
}

/// Write a body into the working tree, creating parent directories.
fn write_working_file(dir: &Path, path: &str, body: &str) -> StoreResult<()> {
    let file = dir.join(path);
    if let Some(parent) = file.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(file, body)?;
    Ok(())
}

/// Display name for commit summaries: the final path component.
fn item_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}

fn short_id(id: &str) -> &str {
    &id[..id.len().min(7)]
}

/// Actors land in a message trailer, so they must be a single non-empty
/// line.
fn validate_actor(actor: &str) -> StoreResult<()> {
    if actor.trim().is_empty() {
        return Err(StoreError::InvalidInput("actor cannot be empty".to_string()));
    }
    if actor.contains('\n') || actor.contains('\r') {
        return Err(StoreError::InvalidInput(
            "actor may not contain line breaks".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_name_is_last_component() {
        assert_eq!(item_name("weeks/week-03/lecture-abc123.md"), "lecture-abc123.md");
        assert_eq!(item_name("README.md"), "README.md");
    }

    #[test]
    fn test_short_id_truncates() {
        assert_eq!(short_id("0123456789abcdef"), "0123456");
        assert_eq!(short_id("abc"), "abc");
    }

    #[test]
    fn test_validate_actor() {
        assert!(validate_actor("alice@example.com").is_ok());
        assert!(validate_actor("").is_err());
        assert!(validate_actor("   ").is_err());
        assert!(validate_actor("line\nbreak").is_err());
        assert!(validate_actor("carriage\rreturn").is_err());
    }
}
