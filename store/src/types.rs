//! Shared result types for store operations

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Trailer key carrying the acting user on save and revert revisions.
pub const UPDATED_BY_TRAILER: &str = "Updated-by";

/// Trailer key carrying the acting user on delete revisions.
pub const DELETED_BY_TRAILER: &str = "Deleted-by";

/// A single revision as reported by history and log queries.
///
/// Authorship is always the fixed system identity; the human actor is
/// carried in a message trailer and surfaced as `audit_actor`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevisionInfo {
    /// Full revision id (40 hex characters)
    pub id: String,

    /// Abbreviated revision id (first 7 characters)
    pub short_id: String,

    /// Commit timestamp in UTC
    pub timestamp: DateTime<Utc>,

    /// Recorded author name (system identity)
    pub author: String,

    /// Recorded author email (system identity)
    pub author_email: String,

    /// Full commit message, trailers included
    pub message: String,

    /// First line of the message
    pub summary: String,

    /// Acting user parsed from the `Updated-by`/`Deleted-by` trailer
    pub audit_actor: Option<String>,
}

impl RevisionInfo {
    /// Build a revision record from raw commit fields, deriving the
    /// short id, summary line, and audit actor.
    pub fn new(
        id: String,
        timestamp: DateTime<Utc>,
        author: String,
        author_email: String,
        message: String,
    ) -> Self {
        let short_id = id.chars().take(7).collect();
        let summary = message.lines().next().unwrap_or_default().to_string();
        let audit_actor = parse_audit_actor(&message);

        Self {
            id,
            short_id,
            timestamp,
            author,
            author_email,
            message,
            summary,
            audit_actor,
        }
    }
}

/// Size and activity statistics for one owner's repository.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoStats {
    /// Owner id the stats describe
    pub owner: String,

    /// Whether an initialized repository exists for this owner
    pub exists: bool,

    /// Number of tracked files at HEAD
    pub file_count: usize,

    /// Total number of revisions on the default branch
    pub revision_count: usize,

    /// On-disk size of the repository directory, control data included
    pub size_bytes: u64,
}

impl RepoStats {
    /// Stats for an owner with no repository. Not an error condition.
    pub fn absent(owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            exists: false,
            file_count: 0,
            revision_count: 0,
            size_bytes: 0,
        }
    }
}

/// One matching line from a content search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchMatch {
    /// Repository-relative path of the matching file
    pub file: String,

    /// 1-based line number
    pub line: usize,

    /// The matching line, without its trailing newline
    pub text: String,
}

/// Extract the acting user from a commit message trailer.
///
/// Only the final paragraph is considered, so a body sentence that
/// happens to contain a colon never reads as attribution.
pub fn parse_audit_actor(message: &str) -> Option<String> {
    let last_paragraph = message.trim_end().rsplit("\n\n").next()?;
    for line in last_paragraph.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key == UPDATED_BY_TRAILER || key == DELETED_BY_TRAILER {
                let value = value.trim();
                if !value.is_empty() {
                    return Some(value.to_string());
                }
            }
        }
    }
    None
}
