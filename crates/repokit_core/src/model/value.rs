//! Dynamic field values, record identifiers and attribute maps.
//!
//! # Responsibility
//! - Carry loosely typed attribute input into typed entity fields.
//! - Provide the filter shape shared by all query builders.
//!
//! # Invariants
//! - `Bool(true)`/`Bool(false)` compare equal to `Integer(1)`/`Integer(0)`,
//!   matching how SQLite stores booleans.
//! - `Null` never equals anything, including another `Null`.
//! - `Filter` keeps entries in positional order.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::error::Error;
use std::fmt::{Display, Formatter};

/// Loosely typed value for one entity field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    Real(f64),
    Text(String),
}

impl FieldValue {
    /// Returns whether this value is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Equality under storage semantics (see module invariants).
    pub fn matches(&self, other: &FieldValue) -> bool {
        match (self, other) {
            (Self::Null, _) | (_, Self::Null) => false,
            (Self::Bool(a), Self::Bool(b)) => a == b,
            (Self::Bool(a), Self::Integer(b)) | (Self::Integer(b), Self::Bool(a)) => {
                i64::from(*a) == *b
            }
            (Self::Integer(a), Self::Integer(b)) => a == b,
            (Self::Integer(a), Self::Real(b)) | (Self::Real(b), Self::Integer(a)) => {
                (*a as f64) == *b
            }
            (Self::Real(a), Self::Real(b)) => a == b,
            (Self::Text(a), Self::Text(b)) => a == b,
            _ => false,
        }
    }

    /// Text rendering used by substring search. `None` for `Null`.
    pub fn search_text(&self) -> Option<String> {
        match self {
            Self::Null => None,
            Self::Bool(value) => Some(i64::from(*value).to_string()),
            Self::Integer(value) => Some(value.to_string()),
            Self::Real(value) => Some(format!("{value:?}")),
            Self::Text(value) => Some(value.clone()),
        }
    }

    /// Short type name used in cast error metadata.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Real(_) => "float",
            Self::Text(_) => "string",
        }
    }
}

impl Display for FieldValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Null => write!(f, "null"),
            Self::Bool(value) => write!(f, "{value}"),
            Self::Integer(value) => write!(f, "{value}"),
            Self::Real(value) => write!(f, "{value}"),
            Self::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for FieldValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        Self::Real(value)
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&String> for FieldValue {
    fn from(value: &String) -> Self {
        Self::Text(value.clone())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl From<RecordId> for FieldValue {
    fn from(value: RecordId) -> Self {
        match value {
            RecordId::Int(id) => Self::Integer(id),
            RecordId::Text(id) => Self::Text(id),
        }
    }
}

/// Error raised when a value cannot be stored in an entity field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CastError {
    /// The entity has no field with this name.
    UnknownField,
    /// The value has the wrong shape for the field.
    TypeMismatch { expected: &'static str },
}

impl Display for CastError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownField => write!(f, "unknown field"),
            Self::TypeMismatch { expected } => write!(f, "expected {expected}"),
        }
    }
}

impl Error for CastError {}

impl TryFrom<FieldValue> for String {
    type Error = CastError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        match value {
            FieldValue::Text(text) => Ok(text),
            _ => Err(CastError::TypeMismatch { expected: "string" }),
        }
    }
}

impl TryFrom<FieldValue> for i64 {
    type Error = CastError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        match value {
            FieldValue::Integer(number) => Ok(number),
            _ => Err(CastError::TypeMismatch {
                expected: "integer",
            }),
        }
    }
}

impl TryFrom<FieldValue> for i32 {
    type Error = CastError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        let wide = i64::try_from(value)?;
        i32::try_from(wide).map_err(|_| CastError::TypeMismatch {
            expected: "32-bit integer",
        })
    }
}

impl TryFrom<FieldValue> for f64 {
    type Error = CastError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        match value {
            FieldValue::Real(number) => Ok(number),
            FieldValue::Integer(number) => Ok(number as f64),
            _ => Err(CastError::TypeMismatch { expected: "float" }),
        }
    }
}

impl TryFrom<FieldValue> for bool {
    type Error = CastError;

    fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
        match value {
            FieldValue::Bool(flag) => Ok(flag),
            FieldValue::Integer(0) => Ok(false),
            FieldValue::Integer(1) => Ok(true),
            _ => Err(CastError::TypeMismatch {
                expected: "boolean",
            }),
        }
    }
}

macro_rules! nullable_cast {
    ($($target:ty),* $(,)?) => {
        $(
            impl TryFrom<FieldValue> for Option<$target> {
                type Error = CastError;

                fn try_from(value: FieldValue) -> Result<Self, Self::Error> {
                    match value {
                        FieldValue::Null => Ok(None),
                        other => <$target>::try_from(other).map(Some),
                    }
                }
            }
        )*
    };
}

nullable_cast!(String, i64, i32, f64, bool);

/// Record identifier accepted by lookups: numeric or string.
///
/// Ordering puts every `Int` before every `Text`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    Int(i64),
    Text(String),
}

impl RecordId {
    /// Converts a primary key value into an identifier.
    pub fn from_value(value: FieldValue) -> Option<Self> {
        match value {
            FieldValue::Integer(id) => Some(Self::Int(id)),
            FieldValue::Text(id) => Some(Self::Text(id)),
            _ => None,
        }
    }

    /// The same key in the other storage class: `Text("7")` for `Int(7)`
    /// and `Int(7)` for `Text("7")`.
    ///
    /// Mirrors how SQLite converts a lookup key to the column's affinity.
    pub fn coerced(&self) -> Option<Self> {
        match self {
            Self::Int(id) => Some(Self::Text(id.to_string())),
            Self::Text(id) => id.trim().parse().ok().map(Self::Int),
        }
    }
}

impl Display for RecordId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Int(id) => write!(f, "{id}"),
            Self::Text(id) => write!(f, "{id}"),
        }
    }
}

impl From<i64> for RecordId {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<i32> for RecordId {
    fn from(value: i32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u32> for RecordId {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<&str> for RecordId {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for RecordId {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&RecordId> for RecordId {
    fn from(value: &RecordId) -> Self {
        value.clone()
    }
}

/// Attribute map used as create/update input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldMap(BTreeMap<String, FieldValue>);

impl FieldMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.insert(field, value);
        self
    }

    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<FieldValue>) {
        self.0.insert(field.into(), value.into());
    }

    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.0.get(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> From<Vec<(K, V)>> for FieldMap
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

/// Field/value pairs applied conjunctively.
///
/// Field names are not checked here; the data-access layer rejects unknown
/// fields.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Filter(Vec<(String, FieldValue)>);

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends one more conjunctive entry.
    pub fn and(mut self, field: impl Into<String>, value: impl Into<FieldValue>) -> Self {
        self.0.push((field.into(), value.into()));
        self
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &FieldValue)> {
        self.0.iter().map(|(field, value)| (field.as_str(), value))
    }
}

impl<K, V> FromIterator<(K, V)> for Filter
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(field, value)| (field.into(), value.into()))
                .collect(),
        )
    }
}

impl<K, V, const N: usize> From<[(K, V); N]> for Filter
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: [(K, V); N]) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> From<Vec<(K, V)>> for Filter
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: Vec<(K, V)>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> From<HashMap<K, V>> for Filter
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: HashMap<K, V>) -> Self {
        entries.into_iter().collect()
    }
}

impl<K, V> From<BTreeMap<K, V>> for Filter
where
    K: Into<String>,
    V: Into<FieldValue>,
{
    fn from(entries: BTreeMap<K, V>) -> Self {
        entries.into_iter().collect()
    }
}

impl From<FieldMap> for Filter {
    fn from(map: FieldMap) -> Self {
        map.0.into_iter().collect()
    }
}

impl From<&FieldMap> for Filter {
    fn from(map: &FieldMap) -> Self {
        map.iter()
            .map(|(field, value)| (field.to_string(), value.clone()))
            .collect()
    }
}
