mod database;
mod git;
mod handle;
mod store;

pub use database::Database;
pub use git::{
    changed_file_contents, fetch_all, owning_branch, resolve_commit, ChangedFile, CommitInfo, ResolveError,
};
pub(crate) use git::diff_against_parents;
pub use handle::{RepoHandle, RepoRegistry};
pub use store::{Datastore, LocaleCounter};

// Re-export the schema version for callers who need it
pub const SCHEMA_VERSION: &str = "1";
