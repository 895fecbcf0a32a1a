//! Generic CRUD surface over pluggable data-access handles.
//! Bind an entity type and a handle once, then create, fetch, update,
//! delete and search records with a uniform result shape.

pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod service;

pub use logging::{default_log_level, init_logging, logging_status, LoggingConfig};
pub use model::changeset::{Changeset, FieldError, ValidationErrors};
pub use model::entity::{ChangesetFn, Entity, EntityDescriptor};
pub use model::value::{CastError, FieldMap, FieldValue, Filter, RecordId};
pub use repo::data_access::{DataAccess, RepoError, RepoResult};
pub use repo::memory_repo::MemoryRepository;
pub use repo::query::{exact_filter, partial_filter, Predicate, Query};
pub use repo::sqlite_repo::SqliteRepository;
pub use service::crud_service::{ConfigError, Crud, CrudBuilder};
pub use service::result::{flatten_errors, CrudResult, Failure};

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
