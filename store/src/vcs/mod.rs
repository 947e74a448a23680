//! Version-control backend abstraction
//!
//! The store treats its version-control engine as a black-box storage
//! primitive: every capability the store consumes is expressed on the
//! `VersionControl` trait, and `GitBackend` is the production
//! implementation. A substitute engine (say, a log-structured store)
//! only needs to implement this trait; nothing above it knows about git.
//!
//! All methods take the repository directory explicitly; the backend
//! itself is stateless and shared across owners.

mod git;

pub use git::GitBackend;

use crate::error::StoreResult;
use crate::types::{RevisionInfo, SearchMatch};
use std::path::Path;

/// Result of a commit attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommitOutcome {
    /// A new revision was created with this id.
    Committed(String),
    /// Staging produced a tree identical to the current head; no
    /// revision was created.
    NoChanges,
}

pub trait VersionControl: Send + Sync {
    /// Whether `dir` holds an initialized repository (control directory
    /// present). Plain directory existence is not enough.
    fn is_repo(&self, dir: &Path) -> bool;

    /// Initialize a fresh repository at `dir` with `main` as the initial
    /// branch and the given identity as its committer configuration.
    fn init(&self, dir: &Path, identity_name: &str, identity_email: &str) -> StoreResult<()>;

    /// Stage the given working-tree paths and commit. Returns
    /// `NoChanges` when staging leaves the tree identical to head.
    fn commit_paths(&self, dir: &Path, paths: &[&str], message: &str)
        -> StoreResult<CommitOutcome>;

    /// Remove the given paths from the working tree and the index, then
    /// commit the removal.
    fn remove_paths(&self, dir: &Path, paths: &[&str], message: &str)
        -> StoreResult<CommitOutcome>;

    /// Whether `path` exists in the head tree.
    fn is_tracked(&self, dir: &Path, path: &str) -> StoreResult<bool>;

    /// All paths in the head tree, sorted.
    fn tracked_files(&self, dir: &Path) -> StoreResult<Vec<String>>;

    /// Resolve a revision expression (full or abbreviated id, `HEAD`)
    /// to a full revision id.
    fn resolve(&self, dir: &Path, revision: &str) -> StoreResult<String>;

    /// Raw bytes of `path` as stored at `revision`, straight from the
    /// object store. Never touches the working tree.
    fn read_at(&self, dir: &Path, path: &str, revision: &str) -> StoreResult<Vec<u8>>;

    /// Revisions that changed `path`, newest first, at most `limit`.
    fn log_path(&self, dir: &Path, path: &str, limit: usize) -> StoreResult<Vec<RevisionInfo>>;

    /// Repository-wide log, newest first, at most `limit`.
    fn log_all(&self, dir: &Path, limit: usize) -> StoreResult<Vec<RevisionInfo>>;

    /// Unified diff for `path` between two revisions. Empty string when
    /// the file is identical in both.
    fn diff_path(&self, dir: &Path, path: &str, from: &str, to: &str) -> StoreResult<String>;

    /// Line-oriented pattern search over tracked file contents at head.
    /// `file_glob` restricts which tracked paths are searched.
    fn grep(
        &self,
        dir: &Path,
        pattern: &regex::Regex,
        file_glob: Option<&glob::Pattern>,
    ) -> StoreResult<Vec<SearchMatch>>;

    /// Total number of revisions reachable from head.
    fn revision_count(&self, dir: &Path) -> StoreResult<usize>;

    /// Force `path` in the working tree and index back to its head
    /// state. Used to clean up after a failed mutation.
    fn restore_path(&self, dir: &Path, path: &str) -> StoreResult<()>;
}
