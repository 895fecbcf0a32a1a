//! Changesets: validated, pending modifications of one entity record.
//!
//! # Responsibility
//! - Cast loosely typed attributes into an entity through `Entity::put_field`.
//! - Collect field-level validation errors without touching storage.
//!
//! # Invariants
//! - `record` is always `data` with every entry of `changes` applied.
//! - Value validations (`length`, `format`, `number`) only inspect changes;
//!   `validate_required` inspects the resulting record.
//! - Errors keep insertion order.

use crate::model::entity::Entity;
use crate::model::value::{CastError, FieldMap, FieldValue};
use once_cell::sync::Lazy;
use regex::Regex;

static PLACEHOLDER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"%\{(\w+)\}").expect("valid placeholder regex"));

/// One validation message for one field.
///
/// `message` may contain `%{key}` placeholders filled from `meta`.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldError {
    pub message: String,
    pub meta: Vec<(String, FieldValue)>,
}

impl FieldError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            meta: Vec::new(),
        }
    }

    pub fn with_meta(mut self, key: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.meta.push((key.into(), value.into()));
        self
    }

    /// Renders the message with placeholders replaced by metadata values.
    ///
    /// Unknown placeholders are left as-is.
    pub fn render(&self) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.message, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                self.meta
                    .iter()
                    .find(|(name, _)| name == key)
                    .map_or_else(|| caps[0].to_string(), |(_, value)| value.to_string())
            })
            .into_owned()
    }
}

/// Field errors in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ValidationErrors(Vec<(String, FieldError)>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, error: FieldError) {
        self.0.push((field.into(), error));
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether `field` already carries an error.
    pub fn has(&self, field: &str) -> bool {
        self.0.iter().any(|(name, _)| name == field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldError)> {
        self.0.iter().map(|(field, error)| (field.as_str(), error))
    }

    /// Rendered messages grouped per field, fields in first-error order.
    pub fn by_field(&self) -> Vec<(String, Vec<String>)> {
        let mut grouped: Vec<(String, Vec<String>)> = Vec::new();
        for (field, error) in &self.0 {
            let rendered = error.render();
            match grouped.iter_mut().find(|(name, _)| name == field) {
                Some((_, messages)) => messages.push(rendered),
                None => grouped.push((field.clone(), vec![rendered])),
            }
        }
        grouped
    }
}

/// Pending modification of an entity record.
#[derive(Debug, Clone)]
pub struct Changeset<E> {
    data: E,
    record: E,
    changes: FieldMap,
    errors: ValidationErrors,
}

impl<E: Entity> Changeset<E> {
    /// Starts an empty changeset over `data`.
    pub fn new(data: E) -> Self {
        Self {
            record: data.clone(),
            data,
            changes: FieldMap::new(),
            errors: ValidationErrors::new(),
        }
    }

    /// Builds a changeset from the `permitted` subset of `attrs`.
    ///
    /// Attributes equal to the current value are not recorded as changes.
    /// Attributes outside `permitted` are ignored.
    pub fn cast(data: E, attrs: &FieldMap, permitted: &[&str]) -> Self {
        let mut changeset = Self::new(data);
        for field in permitted {
            let Some(value) = attrs.get(field) else {
                continue;
            };
            if changeset.data.get_field(field).as_ref() == Some(value) {
                continue;
            }
            changeset = changeset.put_change(*field, value.clone());
        }
        changeset
    }

    /// Records one change, or an `is invalid` error if the value does not fit.
    pub fn put_change(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        let field = field.into();
        let value = value.into();
        match self.record.put_field(&field, value.clone()) {
            Ok(()) => self.changes.insert(field, value),
            Err(CastError::TypeMismatch { expected }) => self.errors.push(
                field,
                FieldError::new("is invalid")
                    .with_meta("type", expected)
                    .with_meta("validation", "cast"),
            ),
            Err(CastError::UnknownField) => self.errors.push(
                field,
                FieldError::new("is not a known field").with_meta("validation", "cast"),
            ),
        }
        self
    }

    pub fn add_error(mut self, field: impl Into<String>, error: FieldError) -> Self {
        self.errors.push(field, error);
        self
    }

    /// Requires each field to hold a non-null, non-blank value.
    pub fn validate_required(mut self, fields: &[&str]) -> Self {
        for field in fields {
            if self.errors.has(field) {
                continue;
            }
            let missing = match self.record.get_field(field) {
                None | Some(FieldValue::Null) => true,
                Some(FieldValue::Text(text)) => text.trim().is_empty(),
                Some(_) => false,
            };
            if missing {
                self.errors.push(
                    *field,
                    FieldError::new("can't be blank").with_meta("validation", "required"),
                );
            }
        }
        self
    }

    /// Bounds the character count of a changed text field.
    pub fn validate_length(mut self, field: &str, min: Option<usize>, max: Option<usize>) -> Self {
        let Some(FieldValue::Text(text)) = self.changes.get(field) else {
            return self;
        };
        let count = text.chars().count();
        if let Some(min) = min.filter(|min| count < *min) {
            self.errors.push(
                field,
                FieldError::new("should be at least %{count} character(s)")
                    .with_meta("count", min as i64)
                    .with_meta("validation", "length"),
            );
        } else if let Some(max) = max.filter(|max| count > *max) {
            self.errors.push(
                field,
                FieldError::new("should be at most %{count} character(s)")
                    .with_meta("count", max as i64)
                    .with_meta("validation", "length"),
            );
        }
        self
    }

    /// Requires a changed text field to match `pattern`.
    pub fn validate_format(mut self, field: &str, pattern: &Regex) -> Self {
        if let Some(FieldValue::Text(text)) = self.changes.get(field) {
            if !pattern.is_match(text) {
                self.errors.push(
                    field,
                    FieldError::new("has invalid format").with_meta("validation", "format"),
                );
            }
        }
        self
    }

    /// Bounds a changed numeric field, inclusive on both ends.
    pub fn validate_number_range(mut self, field: &str, min: Option<f64>, max: Option<f64>) -> Self {
        let number = match self.changes.get(field) {
            Some(FieldValue::Integer(value)) => *value as f64,
            Some(FieldValue::Real(value)) => *value,
            _ => return self,
        };
        if let Some(min) = min.filter(|min| number < *min) {
            self.errors.push(
                field,
                FieldError::new("must be greater than or equal to %{number}")
                    .with_meta("number", min)
                    .with_meta("validation", "number"),
            );
        } else if let Some(max) = max.filter(|max| number > *max) {
            self.errors.push(
                field,
                FieldError::new("must be less than or equal to %{number}")
                    .with_meta("number", max)
                    .with_meta("validation", "number"),
            );
        }
        self
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Record as it was before any change.
    pub fn data(&self) -> &E {
        &self.data
    }

    /// Record with all changes applied.
    pub fn record(&self) -> &E {
        &self.record
    }

    pub fn changes(&self) -> &FieldMap {
        &self.changes
    }

    pub fn get_change(&self, field: &str) -> Option<&FieldValue> {
        self.changes.get(field)
    }

    /// Current value of `field`, change first, original data otherwise.
    pub fn get_field(&self, field: &str) -> Option<FieldValue> {
        self.record.get_field(field)
    }

    pub fn errors(&self) -> &ValidationErrors {
        &self.errors
    }

    pub fn into_errors(self) -> ValidationErrors {
        self.errors
    }

    /// Consumes the changeset and returns the record with changes applied.
    pub fn apply_changes(self) -> E {
        self.record
    }
}
