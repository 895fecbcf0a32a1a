//! Uniform result shape for every CRUD operation.
//!
//! # Responsibility
//! - Map data-access outcomes onto `CrudResult<T>`.
//! - Flatten changeset errors into `"Field: message"` strings.
//!
//! # Invariants
//! - A missing record is `Failure::Message("<Entity> not found")`.
//! - Validation errors produce one message per failing field.
//! - Every data-access outcome is a typed `Result`; nothing is accepted as
//!   implicit success.

use crate::model::changeset::ValidationErrors;
use crate::repo::data_access::{RepoError, RepoResult};
use log::warn;
use serde::Serialize;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type CrudResult<T> = Result<T, Failure>;

/// Failure reason returned by CRUD operations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "reason", rename_all = "snake_case")]
pub enum Failure {
    /// Human-readable reason, e.g. `"Post not found"`.
    Message(String),
    /// One `"Field: message"` entry per invalid field.
    Validation(Vec<String>),
}

impl Failure {
    /// `"<entity> not found"`.
    pub fn not_found(entity: &str) -> Self {
        Self::Message(format!("{entity} not found"))
    }

    /// `"<entity> is not found"`, reported when deleting a vanished record.
    pub fn already_deleted(entity: &str) -> Self {
        Self::Message(format!("{entity} is not found"))
    }

    /// Reason lines: the message, or every validation entry.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Message(message) => vec![message.clone()],
            Self::Validation(messages) => messages.clone(),
        }
    }
}

impl Display for Failure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Message(message) => write!(f, "{message}"),
            Self::Validation(messages) => write!(f, "{}", messages.join("; ")),
        }
    }
}

impl Error for Failure {}

/// Normalizes a data-access outcome that always carries a value.
pub fn normalize<T>(outcome: RepoResult<T>, entity: &str) -> CrudResult<T> {
    outcome.map_err(|err| failure_from_repo(err, entity))
}

/// Normalizes a lookup outcome; `None` becomes not-found.
pub fn normalize_found<T>(outcome: RepoResult<Option<T>>, entity: &str) -> CrudResult<T> {
    normalize(outcome, entity)?.ok_or_else(|| Failure::not_found(entity))
}

/// Renders validation errors as `"Field: message"` lines.
///
/// Field names are capitalized; several messages for one field are joined
/// with `", "`.
pub fn flatten_errors(errors: &ValidationErrors) -> Vec<String> {
    errors
        .by_field()
        .into_iter()
        .map(|(field, messages)| format!("{}: {}", capitalize(&field), messages.join(", ")))
        .collect()
}

pub(crate) fn failure_from_repo(err: RepoError, entity: &str) -> Failure {
    match err {
        RepoError::Invalid(errors) => Failure::Validation(flatten_errors(&errors)),
        RepoError::Stale { .. } => Failure::not_found(entity),
        other => {
            warn!(
                "event=crud_failure module=service status=error entity={} error={}",
                entity, other
            );
            Failure::Message(other.to_string())
        }
    }
}

fn capitalize(value: &str) -> String {
    let mut chars = value.chars();
    match chars.next() {
        Some(first) => first
            .to_uppercase()
            .chain(chars.flat_map(char::to_lowercase))
            .collect(),
        None => String::new(),
    }
}
