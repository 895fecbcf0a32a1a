//! SQLite connection bootstrap for the bundled data-access handle.
//!
//! # Responsibility
//! - Open and configure SQLite connections used by `SqliteRepository`.
//! - Verify that a caller-managed table exists before it is queried.
//!
//! # Invariants
//! - Schema creation and migration stay with the caller; this module only
//!   configures connections and inspects the schema.

use std::error::Error;
use std::fmt::{Display, Formatter};

mod open;

pub use open::{
    ensure_table, open_db, open_db_in_memory, register_search_functions, table_columns,
    SEARCH_LOWER_FN,
};

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    MissingTable(String),
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::MissingTable(table) => write!(f, "table `{table}` does not exist"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::MissingTable(_) => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}
