//! Query object and filter builders.
//!
//! # Responsibility
//! - Hold the conjunctive predicates, limit and offset of one listing.
//! - Fold filters into exact or partial-match predicates.
//!
//! # Invariants
//! - Predicates are always combined with AND.
//! - Results are always ordered by primary key ascending; `Query` carries
//!   no ordering of its own.
//! - An empty filter leaves the query unchanged.

use crate::model::entity::Entity;
use crate::model::value::{FieldValue, Filter};

/// One conjunctive restriction.
#[derive(Debug, Clone, PartialEq)]
pub enum Predicate {
    /// Field equals the value.
    Eq { field: String, value: FieldValue },
    /// Field, cast to text, contains `needle` case-insensitively.
    Contains { field: String, needle: String },
}

impl Predicate {
    pub fn field(&self) -> &str {
        match self {
            Self::Eq { field, .. } | Self::Contains { field, .. } => field,
        }
    }

    /// Evaluates the predicate against an in-memory record.
    pub fn matches<E: Entity>(&self, record: &E) -> bool {
        match self {
            Self::Eq { field, value } => record
                .get_field(field)
                .is_some_and(|current| current.matches(value)),
            Self::Contains { field, needle } => record
                .get_field(field)
                .and_then(|current| current.search_text())
                .is_some_and(|text| text.to_lowercase().contains(&needle.to_lowercase())),
        }
    }
}

/// Listing request handed to `DataAccess::list`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub predicates: Vec<Predicate>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.predicates.push(Predicate::Eq {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn where_contains(mut self, field: impl Into<String>, needle: impl Into<String>) -> Self {
        self.predicates.push(Predicate::Contains {
            field: field.into(),
            needle: needle.into(),
        });
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn with_offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }

    /// First predicate field the entity does not define, if any.
    pub fn unknown_field<E: Entity>(&self) -> Option<&str> {
        self.predicates
            .iter()
            .map(Predicate::field)
            .find(|field| !E::has_field(field))
    }

    /// Returns whether `record` satisfies every predicate.
    pub fn matches<E: Entity>(&self, record: &E) -> bool {
        self.predicates
            .iter()
            .all(|predicate| predicate.matches(record))
    }
}

/// Restricts `query` to rows where every filter field equals its value.
pub fn exact_filter(query: Query, filter: &Filter) -> Query {
    filter
        .iter()
        .fold(query, |query, (field, value)| query.where_eq(field, value.clone()))
}

/// Restricts `query` to rows where every filter field contains its value.
///
/// A `Null` value becomes an empty needle and so matches any non-null field.
pub fn partial_filter(query: Query, filter: &Filter) -> Query {
    filter.iter().fold(query, |query, (field, value)| {
        query.where_contains(field, value.search_text().unwrap_or_default())
    })
}
