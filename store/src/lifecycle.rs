//! Repository lifecycle management
//!
//! One repository per owning entity, created on first use under the
//! configured root. An owner moves `Nonexistent -> Initialized` on the
//! first `ensure` and back to `Nonexistent` only through `delete`.

use crate::address::validate_owner;
use crate::config::StoreConfig;
use crate::error::{StoreError, StoreResult};
use crate::types::RepoStats;
use crate::vcs::{CommitOutcome, VersionControl};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

/// Category directories scaffolded into every fresh repository so the
/// standard layout exists before the first item lands.
const CATEGORY_DIRS: [&str; 3] = ["weeks", "assessments", "resources"];

const GITATTRIBUTES: &str = "* text=auto eol=lf\n";

const INITIAL_COMMIT_MESSAGE: &str = "Initialize content repository";

/// Handle to one owner's initialized repository.
#[derive(Debug, Clone)]
pub struct RepoHandle {
    owner: String,
    dir: PathBuf,
}

impl RepoHandle {
    fn new(owner: &str, dir: PathBuf) -> Self {
        Self {
            owner: owner.to_string(),
            dir,
        }
    }

    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

/// Creates, inspects, and destroys per-owner repositories under the
/// configured root.
pub struct RepoManager {
    root: PathBuf,
    identity_name: String,
    identity_email: String,
    backend: Arc<dyn VersionControl>,
}

impl RepoManager {
    pub fn new(config: &StoreConfig, backend: Arc<dyn VersionControl>) -> Self {
        Self {
            root: config.root_dir.clone(),
            identity_name: config.identity_name.clone(),
            identity_email: config.identity_email.clone(),
            backend,
        }
    }

    pub fn repo_dir(&self, owner: &str) -> PathBuf {
        self.root.join(owner)
    }

    /// Idempotent: returns the existing repository when one is present,
    /// otherwise initializes and scaffolds a fresh one. An existing
    /// repository is detected by its control directory, so a half-created
    /// directory from an earlier failure is initialized again rather than
    /// mistaken for a live repository.
    ///
    /// Concurrent first-time `ensure` calls for the same owner must be
    /// serialized by the caller; `ContentStore` does this with its
    /// per-owner locks.
    pub fn ensure(&self, owner: &str) -> StoreResult<RepoHandle> {
        validate_owner(owner)?;
        let dir = self.repo_dir(owner);
        if self.backend.is_repo(&dir) {
            debug!("Repository for {} already initialized", owner);
            return Ok(RepoHandle::new(owner, dir));
        }

        info!("Initializing content repository for {}", owner);
        fs::create_dir_all(&dir)?;
        self.backend
            .init(&dir, &self.identity_name, &self.identity_email)?;
        self.scaffold(owner, &dir)?;
        Ok(RepoHandle::new(owner, dir))
    }

    fn scaffold(&self, owner: &str, dir: &Path) -> StoreResult<()> {
        let readme = format!(
            "# Content repository for {owner}\n\n\
             Version-controlled bodies of content items owned by `{owner}`.\n\
             Managed by the vellum content store; do not edit by hand.\n"
        );
        fs::write(dir.join("README.md"), readme)?;
        fs::write(dir.join(".gitattributes"), GITATTRIBUTES)?;

        let mut paths: Vec<String> = vec!["README.md".into(), ".gitattributes".into()];
        for category in CATEGORY_DIRS {
            fs::create_dir_all(dir.join(category))?;
            let keep = format!("{category}/.gitkeep");
            fs::write(dir.join(&keep), "")?;
            paths.push(keep);
        }

        let path_refs: Vec<&str> = paths.iter().map(String::as_str).collect();
        match self
            .backend
            .commit_paths(dir, &path_refs, INITIAL_COMMIT_MESSAGE)?
        {
            CommitOutcome::Committed(_) => Ok(()),
            CommitOutcome::NoChanges => Err(StoreError::StorageUnavailable(
                "scaffold commit produced no revision".to_string(),
            )),
        }
    }

    /// Remove an owner's repository entirely, history included. Returns
    /// `false` when no repository directory exists.
    pub fn delete(&self, owner: &str) -> StoreResult<bool> {
        validate_owner(owner)?;
        let dir = self.repo_dir(owner);
        if !dir.exists() {
            return Ok(false);
        }
        info!("Deleting content repository for {}", owner);
        fs::remove_dir_all(&dir)?;
        Ok(true)
    }

    /// Stats for an owner. An uninitialized owner is reported as absent
    /// with zeroed counters, never as an error.
    pub fn stats(&self, owner: &str) -> StoreResult<RepoStats> {
        validate_owner(owner)?;
        let dir = self.repo_dir(owner);
        if !self.backend.is_repo(&dir) {
            return Ok(RepoStats::absent(owner));
        }
        Ok(RepoStats {
            owner: owner.to_string(),
            exists: true,
            file_count: self.backend.tracked_files(&dir)?.len(),
            revision_count: self.backend.revision_count(&dir)?,
            size_bytes: dir_size(&dir)?,
        })
    }

    /// Owners with an initialized repository under the root, sorted.
    pub fn list_all(&self) -> StoreResult<Vec<String>> {
        let mut owners = Vec::new();
        if !self.root.exists() {
            return Ok(owners);
        }
        for entry in fs::read_dir(&self.root)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let path = entry.path();
            if !self.backend.is_repo(&path) {
                continue;
            }
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                owners.push(name.to_string());
            }
        }
        owners.sort();
        Ok(owners)
    }
}

fn dir_size(dir: &Path) -> StoreResult<u64> {
    let mut total = 0;
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        let metadata = entry.metadata()?;
        if metadata.is_dir() {
            total += dir_size(&entry.path())?;
        } else {
            total += metadata.len();
        }
    }
    Ok(total)
}
