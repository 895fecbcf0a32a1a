//! Entity contract and the descriptor bound into a CRUD surface.
//!
//! # Responsibility
//! - Describe a record type: display name, storage source, fields.
//! - Expose field access for casting, filtering and row mapping.
//!
//! # Invariants
//! - `PRIMARY_KEY` is not listed in `FIELDS`.
//! - `put_field` assigns nothing when it returns an error.

use crate::model::changeset::Changeset;
use crate::model::value::{CastError, FieldMap, FieldValue, RecordId};
use std::borrow::Cow;
use std::fmt::{Debug, Formatter};

/// A record type that can be bound to a CRUD surface.
pub trait Entity: Clone + Default + Debug {
    /// Human-readable name used in result messages, e.g. `"Post"`.
    const NAME: &'static str;
    /// Table or collection the data-access layer stores records in.
    const SOURCE: &'static str;
    const PRIMARY_KEY: &'static str = "id";
    /// Persisted fields, primary key excluded.
    const FIELDS: &'static [&'static str];

    /// Reads one field; `None` for unknown fields.
    fn get_field(&self, field: &str) -> Option<FieldValue>;

    /// Writes one field from a loosely typed value.
    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), CastError>;

    /// Validation function: casts `attrs` onto `self` and validates them.
    fn changeset(self, attrs: &FieldMap) -> Changeset<Self>;

    fn id(&self) -> Option<RecordId> {
        self.get_field(Self::PRIMARY_KEY)
            .and_then(RecordId::from_value)
    }

    /// Returns whether `field` is the primary key or a persisted field.
    fn has_field(field: &str) -> bool {
        field == Self::PRIMARY_KEY || Self::FIELDS.contains(&field)
    }
}

/// Validation function signature: `(instance template, attributes)`.
pub type ChangesetFn<E> = fn(E, &FieldMap) -> Changeset<E>;

/// Entity binding captured by a CRUD surface.
///
/// Defaults to `E::NAME` and `E::changeset`; either can be replaced, e.g.
/// to bind a stricter registration changeset.
pub struct EntityDescriptor<E> {
    name: Cow<'static, str>,
    changeset: ChangesetFn<E>,
}

impl<E: Entity> EntityDescriptor<E> {
    pub fn of() -> Self {
        Self {
            name: Cow::Borrowed(E::NAME),
            changeset: E::changeset,
        }
    }

    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_changeset(mut self, changeset: ChangesetFn<E>) -> Self {
        self.changeset = changeset;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Applies the bound validation function.
    pub fn changeset(&self, record: E, attrs: &FieldMap) -> Changeset<E> {
        (self.changeset)(record, attrs)
    }
}

impl<E> Clone for EntityDescriptor<E> {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            changeset: self.changeset,
        }
    }
}

impl<E> Debug for EntityDescriptor<E> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityDescriptor")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}
