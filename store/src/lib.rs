pub mod address;
pub mod config;
pub mod error;
pub mod lifecycle;
pub mod locks;
pub mod service;
pub mod store;
pub mod types;
pub mod vcs;

pub use address::{path_for, validate_owner, validate_rel_path};
pub use config::{StoreConfig, ROOT_ENV_VAR};
pub use error::{StoreError, StoreResult};
pub use lifecycle::{RepoHandle, RepoManager};
pub use locks::OwnerLocks;
pub use service::StoreService;
pub use store::ContentStore;
pub use types::{parse_audit_actor, RepoStats, RevisionInfo, SearchMatch};
pub use vcs::{CommitOutcome, GitBackend, VersionControl};

pub mod prelude {
    pub use crate::address::*;
    pub use crate::config::*;
    pub use crate::error::*;
    pub use crate::lifecycle::*;
    pub use crate::locks::*;
    pub use crate::service::*;
    pub use crate::store::*;
    pub use crate::types::*;
    pub use crate::vcs::*;
}
