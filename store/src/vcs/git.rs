//! git2-backed implementation of the version-control seam

use crate::error::{StoreError, StoreResult};
use crate::types::{RevisionInfo, SearchMatch};
use crate::vcs::{CommitOutcome, VersionControl};
use std::path::Path;

/// Stateless backend over libgit2. Commit identity comes from the
/// per-repository configuration written by `init`, so one backend
/// instance serves every owner.
#[derive(Debug, Default)]
pub struct GitBackend;

impl GitBackend {
    pub fn new() -> Self {
        Self
    }

    fn head_commit(repo: &git2::Repository) -> StoreResult<Option<git2::Commit<'_>>> {
        match repo.head() {
            Ok(head) => Ok(Some(head.peel_to_commit()?)),
            Err(e)
                if e.code() == git2::ErrorCode::UnbornBranch
                    || e.code() == git2::ErrorCode::NotFound =>
            {
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn head_tree(repo: &git2::Repository) -> StoreResult<Option<git2::Tree<'_>>> {
        Ok(match Self::head_commit(repo)? {
            Some(commit) => Some(commit.tree()?),
            None => None,
        })
    }

    /// Write the index as a tree and commit it unless it matches head.
    fn commit_staged(repo: &git2::Repository, message: &str) -> StoreResult<CommitOutcome> {
        let mut index = repo.index()?;
        let tree_id = index.write_tree()?;

        let parent = Self::head_commit(repo)?;
        if let Some(parent) = &parent {
            if parent.tree_id() == tree_id {
                return Ok(CommitOutcome::NoChanges);
            }
        }

        let tree = repo.find_tree(tree_id)?;
        let signature = repo.signature()?;
        let parents: Vec<&git2::Commit<'_>> = parent.iter().collect();
        let oid = repo.commit(Some("HEAD"), &signature, &signature, message, &tree, &parents)?;
        Ok(CommitOutcome::Committed(oid.to_string()))
    }

    fn revision_from_commit(commit: &git2::Commit<'_>) -> RevisionInfo {
        let timestamp =
            chrono::DateTime::from_timestamp(commit.time().seconds(), 0).unwrap_or_default();
        let author = commit.author();
        RevisionInfo::new(
            commit.id().to_string(),
            timestamp,
            author.name().unwrap_or("").to_string(),
            author.email().unwrap_or("").to_string(),
            commit.message().unwrap_or("").to_string(),
        )
    }

    /// Whether `commit` changed `path` relative to its first parent.
    /// Covers creation (absent in parent) and deletion (absent in commit).
    fn commit_touches_path(commit: &git2::Commit<'_>, path: &Path) -> StoreResult<bool> {
        let entry_id =
            |tree: &git2::Tree<'_>| -> Option<git2::Oid> { tree.get_path(path).ok().map(|e| e.id()) };

        let current = entry_id(&commit.tree()?);
        let previous = if commit.parent_count() == 0 {
            None
        } else {
            entry_id(&commit.parent(0)?.tree()?)
        };
        Ok(current != previous)
    }

    fn tree_blobs(tree: &git2::Tree<'_>) -> StoreResult<Vec<(String, git2::Oid)>> {
        let mut blobs = Vec::new();
        tree.walk(git2::TreeWalkMode::PreOrder, |root, entry| {
            if entry.kind() == Some(git2::ObjectType::Blob) {
                if let Some(name) = entry.name() {
                    blobs.push((format!("{root}{name}"), entry.id()));
                }
            }
            git2::TreeWalkResult::Ok
        })?;
        blobs.sort();
        Ok(blobs)
    }

    fn resolve_tree<'r>(
        repo: &'r git2::Repository,
        revision: &str,
    ) -> StoreResult<git2::Tree<'r>> {
        let commit = repo.revparse_single(revision)?.peel_to_commit()?;
        Ok(commit.tree()?)
    }
}

impl VersionControl for GitBackend {
    fn is_repo(&self, dir: &Path) -> bool {
        dir.join(".git").is_dir()
    }

    fn init(&self, dir: &Path, identity_name: &str, identity_email: &str) -> StoreResult<()> {
        let mut opts = git2::RepositoryInitOptions::new();
        opts.initial_head("main");
        let repo = git2::Repository::init_opts(dir, &opts)?;

        let mut config = repo.config()?;
        config.set_str("user.name", identity_name)?;
        config.set_str("user.email", identity_email)?;
        Ok(())
    }

    fn commit_paths(
        &self,
        dir: &Path,
        paths: &[&str],
        message: &str,
    ) -> StoreResult<CommitOutcome> {
        let repo = git2::Repository::open(dir)?;
        let mut index = repo.index()?;
        for path in paths {
            index.add_path(Path::new(path))?;
        }
        index.write()?;
        Self::commit_staged(&repo, message)
    }

    fn remove_paths(
        &self,
        dir: &Path,
        paths: &[&str],
        message: &str,
    ) -> StoreResult<CommitOutcome> {
        let repo = git2::Repository::open(dir)?;
        let workdir = repo
            .workdir()
            .ok_or_else(|| {
                StoreError::StorageUnavailable("repository has no working tree".to_string())
            })?
            .to_path_buf();

        let mut index = repo.index()?;
        for path in paths {
            match std::fs::remove_file(workdir.join(path)) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
            index.remove_path(Path::new(path))?;
        }
        index.write()?;
        Self::commit_staged(&repo, message)
    }

    fn is_tracked(&self, dir: &Path, path: &str) -> StoreResult<bool> {
        let repo = git2::Repository::open(dir)?;
        let tree = match Self::head_tree(&repo)? {
            Some(tree) => tree,
            None => return Ok(false),
        };
        match tree.get_path(Path::new(path)) {
            Ok(_) => Ok(true),
            Err(e) if e.code() == git2::ErrorCode::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }

    fn tracked_files(&self, dir: &Path) -> StoreResult<Vec<String>> {
        let repo = git2::Repository::open(dir)?;
        let tree = match Self::head_tree(&repo)? {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };
        Ok(Self::tree_blobs(&tree)?
            .into_iter()
            .map(|(path, _)| path)
            .collect())
    }

    fn resolve(&self, dir: &Path, revision: &str) -> StoreResult<String> {
        let repo = git2::Repository::open(dir)?;
        let commit = repo.revparse_single(revision)?.peel_to_commit()?;
        Ok(commit.id().to_string())
    }

    fn read_at(&self, dir: &Path, path: &str, revision: &str) -> StoreResult<Vec<u8>> {
        let repo = git2::Repository::open(dir)?;
        let tree = Self::resolve_tree(&repo, revision)?;
        let entry = tree.get_path(Path::new(path)).map_err(|e| {
            if e.code() == git2::ErrorCode::NotFound {
                StoreError::NotFound(format!("{path} does not exist at revision {revision}"))
            } else {
                e.into()
            }
        })?;
        let blob = repo.find_blob(entry.id())?;
        Ok(blob.content().to_vec())
    }

    fn log_path(&self, dir: &Path, path: &str, limit: usize) -> StoreResult<Vec<RevisionInfo>> {
        let repo = git2::Repository::open(dir)?;
        if Self::head_commit(&repo)?.is_none() {
            return Ok(Vec::new());
        }
        let target = Path::new(path);

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push_head()?;

        let mut revisions = Vec::new();
        for oid in revwalk {
            if revisions.len() >= limit {
                break;
            }
            let commit = repo.find_commit(oid?)?;
            if Self::commit_touches_path(&commit, target)? {
                revisions.push(Self::revision_from_commit(&commit));
            }
        }
        Ok(revisions)
    }

    fn log_all(&self, dir: &Path, limit: usize) -> StoreResult<Vec<RevisionInfo>> {
        let repo = git2::Repository::open(dir)?;
        if Self::head_commit(&repo)?.is_none() {
            return Ok(Vec::new());
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.set_sorting(git2::Sort::TOPOLOGICAL | git2::Sort::TIME)?;
        revwalk.push_head()?;

        let mut revisions = Vec::new();
        for oid in revwalk {
            if revisions.len() >= limit {
                break;
            }
            let commit = repo.find_commit(oid?)?;
            revisions.push(Self::revision_from_commit(&commit));
        }
        Ok(revisions)
    }

    fn diff_path(&self, dir: &Path, path: &str, from: &str, to: &str) -> StoreResult<String> {
        let repo = git2::Repository::open(dir)?;
        let from_tree = Self::resolve_tree(&repo, from)?;
        let to_tree = Self::resolve_tree(&repo, to)?;

        let mut opts = git2::DiffOptions::new();
        // Pathspecs are fnmatch patterns by default; item paths are
        // literal names, brackets and stars included.
        opts.pathspec(path).disable_pathspec_match(true);
        let diff = repo.diff_tree_to_tree(Some(&from_tree), Some(&to_tree), Some(&mut opts))?;

        let mut text = String::new();
        diff.print(git2::DiffFormat::Patch, |_delta, _hunk, line| {
            match line.origin() {
                '+' | '-' | ' ' => text.push(line.origin()),
                _ => {}
            }
            text.push_str(&String::from_utf8_lossy(line.content()));
            true
        })?;
        Ok(text)
    }

    fn grep(
        &self,
        dir: &Path,
        pattern: &regex::Regex,
        file_glob: Option<&glob::Pattern>,
    ) -> StoreResult<Vec<SearchMatch>> {
        let repo = git2::Repository::open(dir)?;
        let tree = match Self::head_tree(&repo)? {
            Some(tree) => tree,
            None => return Ok(Vec::new()),
        };

        let mut matches = Vec::new();
        for (file, oid) in Self::tree_blobs(&tree)? {
            if let Some(glob) = file_glob {
                if !glob.matches(&file) {
                    continue;
                }
            }
            let blob = repo.find_blob(oid)?;
            if blob.is_binary() {
                continue;
            }
            let content = String::from_utf8_lossy(blob.content());
            for (idx, line) in content.lines().enumerate() {
                if pattern.is_match(line) {
                    matches.push(SearchMatch {
                        file: file.clone(),
                        line: idx + 1,
                        text: line.to_string(),
                    });
                }
            }
        }
        Ok(matches)
    }

    fn revision_count(&self, dir: &Path) -> StoreResult<usize> {
        let repo = git2::Repository::open(dir)?;
        if Self::head_commit(&repo)?.is_none() {
            return Ok(0);
        }

        let mut revwalk = repo.revwalk()?;
        revwalk.push_head()?;

        let mut count = 0;
        for oid in revwalk {
            oid?;
            count += 1;
        }
        Ok(count)
    }

    fn restore_path(&self, dir: &Path, path: &str) -> StoreResult<()> {
        let repo = git2::Repository::open(dir)?;
        let mut checkout = git2::build::CheckoutBuilder::new();
        checkout.force().remove_untracked(true).path(path);
        repo.checkout_head(Some(&mut checkout))?;
        Ok(())
    }
}
