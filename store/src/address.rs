//! Content addressing scheme
//!
//! Maps a content item (kind + id + optional week number) to its permanent
//! repository-relative path. The mapping is pure and deterministic: the same
//! item always lives at the same path, and the path never changes for the
//! life of the item, even if its display title or content type label does.
//!
//! Layout:
//! - week-scoped items: `weeks/week-NN/{kind}-{id}.md`
//! - assessment kinds (`assessment`, `exam`, `quiz`, `assignment`):
//!   `assessments/{kind}-{id}.md`
//! - everything else: `resources/{kind}-{id}.md`

use crate::error::{StoreError, StoreResult};

/// Kinds grouped under `assessments/` when no week number applies.
const ASSESSMENT_KINDS: [&str; 4] = ["assessment", "exam", "quiz", "assignment"];

/// Compute the repository-relative path for a content item.
///
/// `kind` and `content_id` must be plain identifiers
/// (`[A-Za-z0-9_-]+`); anything else is rejected before any filesystem
/// access happens. The extension is always `.md`.
pub fn path_for(kind: &str, content_id: &str, week: Option<u32>) -> StoreResult<String> {
    validate_identifier("kind", kind)?;
    validate_identifier("content id", content_id)?;

    let file = format!("{kind}-{content_id}.md");
    let path = match week {
        Some(week) => format!("weeks/week-{week:02}/{file}"),
        None if ASSESSMENT_KINDS.contains(&kind) => format!("assessments/{file}"),
        None => format!("resources/{file}"),
    };
    Ok(path)
}

/// Validate an owner id. Owners become directory names under the store
/// root, so they follow the same identifier rule as kinds and content ids.
pub fn validate_owner(owner: &str) -> StoreResult<()> {
    validate_identifier("owner", owner)
}

/// Validate an externally supplied repository-relative path: normal
/// components only, forward slashes, nothing reaching outside the
/// repository or into its control directory.
pub fn validate_rel_path(path: &str) -> StoreResult<()> {
    if path.is_empty() {
        return Err(StoreError::InvalidInput("path cannot be empty".to_string()));
    }
    if path.starts_with('/') {
        return Err(StoreError::InvalidInput(format!(
            "path must be relative: {path}"
        )));
    }
    if path.contains('\\') {
        return Err(StoreError::InvalidInput(format!(
            "path must use forward slashes: {path}"
        )));
    }
    for component in path.split('/') {
        if component.is_empty() {
            return Err(StoreError::InvalidInput(format!(
                "path has an empty component: {path}"
            )));
        }
        if component == "." || component == ".." {
            return Err(StoreError::InvalidInput(format!(
                "path may not contain '.' or '..' components: {path}"
            )));
        }
        if component == ".git" {
            return Err(StoreError::InvalidInput(format!(
                "path may not enter the repository control directory: {path}"
            )));
        }
    }
    Ok(())
}

fn validate_identifier(label: &str, value: &str) -> StoreResult<()> {
    if value.is_empty() {
        return Err(StoreError::InvalidInput(format!("{label} cannot be empty")));
    }
    if !value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StoreError::InvalidInput(format!(
            "{label} may only contain letters, digits, '-' and '_': {value}"
        )));
    }
    Ok(())
}
