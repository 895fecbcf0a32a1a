//! CRUD surface bound to one entity and one data-access handle.
//!
//! # Responsibility
//! - Bind a data-access handle and an entity descriptor at setup time.
//! - Compose filter builders, the validation function and result
//!   normalization into create/read/update/delete/search operations.
//!
//! # Invariants
//! - The only state is the configuration captured at bind time.
//! - Runtime errors are returned as `Failure`, never raised.
//! - Listings are ordered by primary key ascending.
//! - Lookups that fail before a write skip the validation function.

use crate::model::entity::{Entity, EntityDescriptor};
use crate::model::value::{FieldMap, FieldValue, Filter, RecordId};
use crate::repo::data_access::{DataAccess, RepoError};
use crate::repo::query::{exact_filter, partial_filter, Query};
use crate::service::result::{failure_from_repo, normalize, normalize_found, CrudResult, Failure};
use log::{debug, info};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

/// Setup-time error: the binding is incomplete and the surface is unusable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    MissingDataAccess,
    MissingEntity,
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingDataAccess => write!(f, "crud binding requires a data-access handle"),
            Self::MissingEntity => write!(f, "crud binding requires an entity descriptor"),
        }
    }
}

impl Error for ConfigError {}

/// Collects the two required bindings of a [`Crud`] surface.
pub struct CrudBuilder<E, R> {
    repo: Option<R>,
    entity: Option<EntityDescriptor<E>>,
}

impl<E: Entity, R: DataAccess<E>> CrudBuilder<E, R> {
    pub fn data_access(mut self, repo: R) -> Self {
        self.repo = Some(repo);
        self
    }

    pub fn entity(mut self, descriptor: EntityDescriptor<E>) -> Self {
        self.entity = Some(descriptor);
        self
    }

    /// Finishes the binding.
    ///
    /// # Errors
    /// - `MissingDataAccess` when no handle was supplied.
    /// - `MissingEntity` when no descriptor was supplied.
    pub fn build(self) -> Result<Crud<E, R>, ConfigError> {
        let repo = self.repo.ok_or(ConfigError::MissingDataAccess)?;
        let entity = self.entity.ok_or(ConfigError::MissingEntity)?;
        info!(
            "event=crud_bind module=service status=ok entity={} source={}",
            entity.name(),
            E::SOURCE
        );
        Ok(Crud { repo, entity })
    }
}

/// CRUD operations for entity `E` over data-access handle `R`.
pub struct Crud<E, R> {
    repo: R,
    entity: EntityDescriptor<E>,
}

impl<E, R> Debug for Crud<E, R> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Crud")
            .field("entity", &self.entity)
            .finish_non_exhaustive()
    }
}

impl<E: Entity, R: DataAccess<E>> Crud<E, R> {
    pub fn builder() -> CrudBuilder<E, R> {
        CrudBuilder {
            repo: None,
            entity: None,
        }
    }

    /// Binds both required references directly.
    pub fn new(repo: R, entity: EntityDescriptor<E>) -> Self {
        Self { repo, entity }
    }

    pub fn entity_name(&self) -> &str {
        self.entity.name()
    }

    pub fn data_access(&self) -> &R {
        &self.repo
    }

    /// Validates `attrs` against a fresh record and inserts it.
    pub fn create(&self, attrs: impl Into<FieldMap>) -> CrudResult<E> {
        let attrs = attrs.into();
        let changeset = self.entity.changeset(E::default(), &attrs);
        let created = normalize(self.repo.insert(changeset), self.entity_name());
        self.log_write("crud_create", &created);
        created
    }

    /// Fetches one record by identifier.
    pub fn get(&self, id: impl Into<RecordId>) -> CrudResult<E> {
        let id = id.into();
        normalize_found(self.repo.get(&id), self.entity_name())
    }

    /// Fetches the single record matching every filter entry exactly.
    pub fn get_by(&self, filter: impl Into<Filter>) -> CrudResult<E> {
        let filter = filter.into();
        match self.repo.get_by(&filter) {
            Err(RepoError::MultipleResults { count, .. }) => Err(Failure::Message(format!(
                "expected at most one {}, got {count}",
                self.entity_name()
            ))),
            outcome => normalize_found(outcome, self.entity_name()),
        }
    }

    /// Every record, ordered by identifier.
    pub fn all(&self) -> CrudResult<Vec<E>> {
        self.list(Query::new())
    }

    /// Every record matching the filter exactly, ordered by identifier.
    pub fn all_by(&self, filter: impl Into<Filter>) -> CrudResult<Vec<E>> {
        self.list(exact_filter(Query::new(), &filter.into()))
    }

    /// At most `limit` records, ordered by identifier.
    pub fn limit(&self, limit: usize) -> CrudResult<Vec<E>> {
        self.list(Query::new().with_limit(limit))
    }

    /// At most `limit` records after skipping the first `offset`.
    pub fn limit_offset(&self, limit: usize, offset: usize) -> CrudResult<Vec<E>> {
        self.list(Query::new().with_limit(limit).with_offset(offset))
    }

    /// Filtered variant of [`Crud::limit`] with an optional offset.
    pub fn limit_by(
        &self,
        filter: impl Into<Filter>,
        limit: usize,
        offset: Option<usize>,
    ) -> CrudResult<Vec<E>> {
        let query = Query::new()
            .with_limit(limit)
            .with_offset(offset.unwrap_or(0));
        self.list(exact_filter(query, &filter.into()))
    }

    /// Records whose fields contain every filter value, case-insensitively.
    ///
    /// An empty filter matches every record.
    pub fn find(&self, filter: impl Into<Filter>) -> CrudResult<Vec<E>> {
        self.list(partial_filter(Query::new(), &filter.into()))
    }

    /// Applies `changes` to `record` through the validation function.
    pub fn update(&self, record: &E, changes: impl Into<FieldMap>) -> CrudResult<E> {
        let changes = changes.into();
        let changeset = self.entity.changeset(record.clone(), &changes);
        let updated = normalize(self.repo.update(changeset), self.entity_name());
        self.log_write("crud_update", &updated);
        updated
    }

    /// Resolves the record by identifier, then updates it.
    pub fn update_by_id(
        &self,
        id: impl Into<RecordId>,
        changes: impl Into<FieldMap>,
    ) -> CrudResult<E> {
        let record = self.get(id)?;
        self.update(&record, changes)
    }

    /// Resolves the record by one exact field match, then updates it.
    pub fn update_by(
        &self,
        field: &str,
        value: impl Into<FieldValue>,
        changes: impl Into<FieldMap>,
    ) -> CrudResult<E> {
        let record = self.get_by(Filter::new().and(field, value))?;
        self.update(&record, changes)
    }

    /// Deletes `record`; a record that is already gone is reported as
    /// `"<Entity> is not found"`.
    pub fn delete(&self, record: &E) -> CrudResult<E> {
        let deleted = match self.repo.delete(record) {
            Ok(removed) => Ok(removed),
            Err(RepoError::Stale { .. }) => Err(Failure::already_deleted(self.entity_name())),
            Err(err) => Err(failure_from_repo(err, self.entity_name())),
        };
        self.log_write("crud_delete", &deleted);
        deleted
    }

    /// Resolves the record by identifier, then deletes it.
    pub fn delete_by_id(&self, id: impl Into<RecordId>) -> CrudResult<E> {
        let record = self.get(id)?;
        self.delete(&record)
    }

    fn list(&self, query: Query) -> CrudResult<Vec<E>> {
        normalize(self.repo.list(&query), self.entity_name())
    }

    fn log_write(&self, event: &str, outcome: &CrudResult<E>) {
        match outcome {
            Ok(record) => debug!(
                "event={event} module=service status=ok entity={} id={}",
                self.entity_name(),
                record
                    .id()
                    .map_or_else(|| "none".to_string(), |id| id.to_string())
            ),
            Err(failure) => debug!(
                "event={event} module=service status=rejected entity={} reasons={}",
                self.entity_name(),
                failure.reasons().len()
            ),
        }
    }
}
