//! SQLite implementation of `DataAccess`.
//!
//! # Responsibility
//! - Map entity fields to columns of `E::SOURCE` and back.
//! - Translate `Query` predicates into parameterized SQL.
//!
//! # Invariants
//! - Only identifiers declared by the entity are interpolated into SQL;
//!   filter field names are checked before any statement is prepared.
//! - Every value is bound as a parameter.
//! - Write paths read the row back so callers see stored values.

use crate::db::{
    ensure_table, register_search_functions, table_columns, DbError, SEARCH_LOWER_FN,
};
use crate::model::changeset::Changeset;
use crate::model::entity::Entity;
use crate::model::value::{FieldValue, Filter, RecordId};
use crate::repo::data_access::{
    check_query_fields, valid_changes, DataAccess, RepoError, RepoResult,
};
use crate::repo::query::{exact_filter, Predicate, Query};
use log::debug;
use rusqlite::types::Value;
use rusqlite::{params_from_iter, Connection, Row};
use std::marker::PhantomData;

/// SQLite-backed data-access handle for entity `E`.
pub struct SqliteRepository<'conn, E> {
    conn: &'conn Connection,
    _entity: PhantomData<fn() -> E>,
}

impl<'conn, E: Entity> SqliteRepository<'conn, E> {
    /// Constructs a repository after checking `E::SOURCE` has every column.
    ///
    /// Also registers the case-folding function used by `find` on `conn`.
    pub fn try_new(conn: &'conn Connection) -> RepoResult<Self> {
        ensure_entity_table::<E>(conn)?;
        register_search_functions(conn)?;
        Ok(Self {
            conn,
            _entity: PhantomData,
        })
    }

    fn select_rows(&self, query: &Query) -> RepoResult<Vec<E>> {
        let mut sql = format!("{} WHERE 1 = 1", select_sql::<E>());
        let mut bind_values: Vec<Value> = Vec::new();

        for predicate in &query.predicates {
            match predicate {
                Predicate::Eq { field, value } => {
                    sql.push_str(&format!(" AND {} = ?", quote(field)));
                    bind_values.push(to_sql_value(value));
                }
                Predicate::Contains { field, needle } => {
                    sql.push_str(&format!(
                        " AND {SEARCH_LOWER_FN}(CAST({} AS TEXT)) LIKE ? ESCAPE '\\'",
                        quote(field)
                    ));
                    bind_values.push(Value::Text(like_pattern(needle)));
                }
            }
        }

        sql.push_str(&format!(" ORDER BY {} ASC", quote(E::PRIMARY_KEY)));

        if let Some(limit) = query.limit {
            sql.push_str(" LIMIT ?");
            bind_values.push(Value::Integer(to_sql_count(limit)));
            if query.offset > 0 {
                sql.push_str(" OFFSET ?");
                bind_values.push(Value::Integer(to_sql_count(query.offset)));
            }
        } else if query.offset > 0 {
            sql.push_str(" LIMIT -1 OFFSET ?");
            bind_values.push(Value::Integer(to_sql_count(query.offset)));
        }

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut records = Vec::new();
        while let Some(row) = rows.next()? {
            records.push(parse_row::<E>(row)?);
        }

        debug!(
            "event=repo_query module=repo status=ok source={} predicates={} rows={}",
            E::SOURCE,
            query.predicates.len(),
            records.len()
        );
        Ok(records)
    }

    fn read_back(&self, id: &RecordId) -> RepoResult<E> {
        self.get(id)?.ok_or_else(|| {
            RepoError::InvalidData(format!(
                "written row `{id}` not found in read-back from `{}`",
                E::SOURCE
            ))
        })
    }
}

impl<E: Entity> DataAccess<E> for SqliteRepository<'_, E> {
    fn insert(&self, changeset: Changeset<E>) -> RepoResult<E> {
        let record = valid_changes(changeset)?.apply_changes();
        let explicit_id = record.id();

        let mut columns: Vec<&str> = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        if let Some(id) = explicit_id.as_ref() {
            columns.push(E::PRIMARY_KEY);
            bind_values.push(id_to_sql(id));
        }
        for field in E::FIELDS {
            columns.push(*field);
            bind_values.push(to_sql_value(
                &record.get_field(field).unwrap_or(FieldValue::Null),
            ));
        }

        let sql = if columns.is_empty() {
            format!("INSERT INTO {} DEFAULT VALUES;", quote(E::SOURCE))
        } else {
            format!(
                "INSERT INTO {} ({}) VALUES ({});",
                quote(E::SOURCE),
                quote_all(&columns),
                vec!["?"; columns.len()].join(", ")
            )
        };
        self.conn.execute(&sql, params_from_iter(bind_values))?;

        let id = explicit_id.unwrap_or_else(|| RecordId::Int(self.conn.last_insert_rowid()));
        self.read_back(&id)
    }

    fn get(&self, id: &RecordId) -> RepoResult<Option<E>> {
        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {} = ?1;",
            select_sql::<E>(),
            quote(E::PRIMARY_KEY)
        ))?;

        let mut rows = stmt.query([id_to_sql(id)])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_row::<E>(row)?));
        }

        Ok(None)
    }

    fn get_by(&self, filter: &Filter) -> RepoResult<Option<E>> {
        let query = exact_filter(Query::new(), filter);
        check_query_fields::<E>(&query)?;

        let mut records = self.select_rows(&query)?;
        match records.len() {
            0 | 1 => Ok(records.pop()),
            count => Err(RepoError::MultipleResults {
                table: E::SOURCE,
                count,
            }),
        }
    }

    fn list(&self, query: &Query) -> RepoResult<Vec<E>> {
        check_query_fields::<E>(query)?;
        self.select_rows(query)
    }

    fn update(&self, changeset: Changeset<E>) -> RepoResult<E> {
        let changeset = valid_changes(changeset)?;
        let id = changeset.data().id().ok_or(RepoError::MissingPrimaryKey {
            table: E::SOURCE,
        })?;
        if changeset.changes().is_empty() {
            return Ok(changeset.apply_changes());
        }

        let mut assignments = Vec::new();
        let mut bind_values: Vec<Value> = Vec::new();
        for (field, value) in changeset.changes().iter() {
            if !E::has_field(field) {
                return Err(RepoError::UnknownField {
                    table: E::SOURCE,
                    field: field.to_string(),
                });
            }
            assignments.push(format!("{} = ?", quote(field)));
            bind_values.push(to_sql_value(value));
        }
        bind_values.push(id_to_sql(&id));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} WHERE {} = ?;",
                quote(E::SOURCE),
                assignments.join(", "),
                quote(E::PRIMARY_KEY)
            ),
            params_from_iter(bind_values),
        )?;

        if changed == 0 {
            return Err(RepoError::Stale { table: E::SOURCE });
        }

        let record = changeset.apply_changes();
        let stored_id = record.id().unwrap_or(id);
        self.read_back(&stored_id)
    }

    fn delete(&self, record: &E) -> RepoResult<E> {
        let id = record.id().ok_or(RepoError::MissingPrimaryKey {
            table: E::SOURCE,
        })?;

        let changed = self.conn.execute(
            &format!(
                "DELETE FROM {} WHERE {} = ?1;",
                quote(E::SOURCE),
                quote(E::PRIMARY_KEY)
            ),
            [id_to_sql(&id)],
        )?;

        if changed == 0 {
            return Err(RepoError::Stale { table: E::SOURCE });
        }

        Ok(record.clone())
    }
}

fn ensure_entity_table<E: Entity>(conn: &Connection) -> RepoResult<()> {
    match ensure_table(conn, E::SOURCE) {
        Ok(()) => {}
        Err(DbError::MissingTable(_)) => return Err(RepoError::MissingRequiredTable(E::SOURCE)),
        Err(err) => return Err(err.into()),
    }

    let columns = table_columns(conn, E::SOURCE)?;
    let required = std::iter::once(E::PRIMARY_KEY).chain(E::FIELDS.iter().copied());
    for column in required {
        if !columns.iter().any(|existing| existing.as_str() == column) {
            return Err(RepoError::MissingRequiredColumn {
                table: E::SOURCE,
                column,
            });
        }
    }

    Ok(())
}

fn select_sql<E: Entity>() -> String {
    let mut columns = vec![E::PRIMARY_KEY];
    columns.extend_from_slice(E::FIELDS);
    format!("SELECT {} FROM {}", quote_all(&columns), quote(E::SOURCE))
}

fn parse_row<E: Entity>(row: &Row<'_>) -> RepoResult<E> {
    let mut record = E::default();
    let columns = std::iter::once(E::PRIMARY_KEY).chain(E::FIELDS.iter().copied());
    for (index, column) in columns.enumerate() {
        let value = from_sql_value(row.get::<_, Value>(index)?).ok_or_else(|| {
            RepoError::InvalidData(format!(
                "unsupported blob value in {}.{column}",
                E::SOURCE
            ))
        })?;
        record.put_field(column, value).map_err(|err| {
            RepoError::InvalidData(format!("invalid value in {}.{column}: {err}", E::SOURCE))
        })?;
    }
    Ok(record)
}

fn quote(identifier: &str) -> String {
    format!("\"{}\"", identifier.replace('"', "\"\""))
}

fn quote_all(identifiers: &[&str]) -> String {
    identifiers
        .iter()
        .map(|identifier| quote(identifier))
        .collect::<Vec<_>>()
        .join(", ")
}

fn to_sql_value(value: &FieldValue) -> Value {
    match value {
        FieldValue::Null => Value::Null,
        FieldValue::Bool(flag) => Value::Integer(i64::from(*flag)),
        FieldValue::Integer(number) => Value::Integer(*number),
        FieldValue::Real(number) => Value::Real(*number),
        FieldValue::Text(text) => Value::Text(text.clone()),
    }
}

fn from_sql_value(value: Value) -> Option<FieldValue> {
    match value {
        Value::Null => Some(FieldValue::Null),
        Value::Integer(number) => Some(FieldValue::Integer(number)),
        Value::Real(number) => Some(FieldValue::Real(number)),
        Value::Text(text) => Some(FieldValue::Text(text)),
        Value::Blob(_) => None,
    }
}

fn id_to_sql(id: &RecordId) -> Value {
    match id {
        RecordId::Int(number) => Value::Integer(*number),
        RecordId::Text(text) => Value::Text(text.clone()),
    }
}

fn to_sql_count(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

/// Lowercased `%needle%` with LIKE wildcards escaped by `\`.
fn like_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for ch in needle.to_lowercase().chars() {
        if matches!(ch, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(ch);
    }
    pattern.push('%');
    pattern
}
