//! CLI smoke entry point.
//!
//! # Responsibility
//! - Provide a minimal executable to verify `repokit_core` linkage.
//! - Run one create/search/delete round trip against in-memory SQLite.
//!
//! Set `REPOKIT_LOG_DIR` to an absolute path to capture core logs.

use log::info;
use repokit_core::db::open_db_in_memory;
use repokit_core::{
    default_log_level, init_logging, CastError, Changeset, Crud, Entity, EntityDescriptor,
    FieldMap, FieldValue, LoggingConfig, SqliteRepository,
};
use std::error::Error;

const SCHEMA_SQL: &str =
    "CREATE TABLE notes (id INTEGER PRIMARY KEY AUTOINCREMENT, title TEXT NOT NULL);";

#[derive(Debug, Clone, Default)]
struct Note {
    id: Option<i64>,
    title: String,
}

impl Entity for Note {
    const NAME: &'static str = "Note";
    const SOURCE: &'static str = "notes";
    const FIELDS: &'static [&'static str] = &["title"];

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.into()),
            "title" => Some(self.title.as_str().into()),
            _ => None,
        }
    }

    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), CastError> {
        match field {
            "id" => self.id = value.try_into()?,
            "title" => self.title = value.try_into()?,
            _ => return Err(CastError::UnknownField),
        }
        Ok(())
    }

    fn changeset(self, attrs: &FieldMap) -> Changeset<Self> {
        Changeset::cast(self, attrs, &["title"]).validate_required(&["title"])
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    if let Ok(log_dir) = std::env::var("REPOKIT_LOG_DIR") {
        init_logging(&LoggingConfig::new(default_log_level(), log_dir))?;
    }

    println!("repokit_core version={}", repokit_core::core_version());

    let conn = open_db_in_memory()?;
    conn.execute_batch(SCHEMA_SQL)?;
    let notes: Crud<Note, _> = Crud::builder()
        .data_access(SqliteRepository::<Note>::try_new(&conn)?)
        .entity(EntityDescriptor::of())
        .build()?;

    let created = notes.create([("title", "Smoke test note")])?;
    println!("create -> {created:?}");
    println!("invalid -> {:?}", notes.create([("title", "")]));
    println!("find -> {:?}", notes.find([("title", "SMOKE")])?);
    println!("delete -> {:?}", notes.delete(&created)?);
    println!("delete again -> {:?}", notes.delete(&created));

    info!("event=cli_smoke module=cli status=ok");
    Ok(())
}
