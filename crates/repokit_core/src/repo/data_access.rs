//! Data-access contract consumed by the CRUD surface.
//!
//! # Responsibility
//! - Define the storage operations a handle must provide for one entity.
//! - Define the semantic error vocabulary shared by every handle.
//!
//! # Invariants
//! - `insert`/`update` reject invalid changesets with `RepoError::Invalid`
//!   before touching storage.
//! - Writes against a row that no longer exists report `RepoError::Stale`.
//! - `list` results are ordered by primary key ascending.

use crate::db::DbError;
use crate::model::changeset::{Changeset, ValidationErrors};
use crate::model::entity::Entity;
use crate::model::value::{Filter, RecordId};
use crate::repo::query::Query;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

/// Semantic and transport errors reported by data-access handles.
#[derive(Debug)]
pub enum RepoError {
    /// Changeset failed validation; nothing was written.
    Invalid(ValidationErrors),
    /// The targeted row no longer exists.
    Stale { table: &'static str },
    UnknownField { table: &'static str, field: String },
    MultipleResults { table: &'static str, count: usize },
    DuplicateKey { table: &'static str, id: RecordId },
    MissingPrimaryKey { table: &'static str },
    MissingRequiredTable(&'static str),
    MissingRequiredColumn {
        table: &'static str,
        column: &'static str,
    },
    InvalidData(String),
    LockPoisoned,
    Db(DbError),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Invalid(errors) => write!(f, "changeset has {} invalid field(s)", errors.len()),
            Self::Stale { table } => write!(f, "row in `{table}` no longer exists"),
            Self::UnknownField { table, field } => {
                write!(f, "unknown field `{field}` for `{table}`")
            }
            Self::MultipleResults { table, count } => {
                write!(f, "expected at most one row in `{table}`, got {count}")
            }
            Self::DuplicateKey { table, id } => {
                write!(f, "duplicate primary key `{id}` in `{table}`")
            }
            Self::MissingPrimaryKey { table } => {
                write!(f, "record for `{table}` has no primary key")
            }
            Self::MissingRequiredTable(table) => write!(f, "required table `{table}` is missing"),
            Self::MissingRequiredColumn { table, column } => {
                write!(f, "required column `{table}.{column}` is missing")
            }
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
            Self::LockPoisoned => write!(f, "storage lock poisoned"),
            Self::Db(err) => write!(f, "{err}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Storage operations for one entity type.
pub trait DataAccess<E: Entity> {
    /// Persists a new record and returns it as stored.
    fn insert(&self, changeset: Changeset<E>) -> RepoResult<E>;
    /// Direct lookup by primary key.
    fn get(&self, id: &RecordId) -> RepoResult<Option<E>>;
    /// Single-record lookup by exact filter.
    ///
    /// Fails with `MultipleResults` when more than one row matches.
    fn get_by(&self, filter: &Filter) -> RepoResult<Option<E>>;
    fn list(&self, query: &Query) -> RepoResult<Vec<E>>;
    /// Persists the changes of an existing record and returns it as stored.
    fn update(&self, changeset: Changeset<E>) -> RepoResult<E>;
    /// Removes a record and returns the removed value.
    fn delete(&self, record: &E) -> RepoResult<E>;
}

/// Rejects queries naming fields the entity does not define.
pub(crate) fn check_query_fields<E: Entity>(query: &Query) -> RepoResult<()> {
    match query.unknown_field::<E>() {
        Some(field) => Err(RepoError::UnknownField {
            table: E::SOURCE,
            field: field.to_string(),
        }),
        None => Ok(()),
    }
}

/// Passes a valid changeset through, or returns its errors.
pub(crate) fn valid_changes<E: Entity>(changeset: Changeset<E>) -> RepoResult<Changeset<E>> {
    if changeset.is_valid() {
        Ok(changeset)
    } else {
        Err(RepoError::Invalid(changeset.into_errors()))
    }
}
