#![allow(dead_code)]

use repokit_core::db::open_db_in_memory;
use repokit_core::{CastError, Changeset, Entity, FieldMap, FieldValue};
use rusqlite::Connection;

pub const SCHEMA_SQL: &str = "
CREATE TABLE posts (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    title TEXT NOT NULL,
    body TEXT,
    views INTEGER NOT NULL DEFAULT 0,
    published INTEGER NOT NULL DEFAULT 0
);
CREATE TABLE tags (
    slug TEXT PRIMARY KEY NOT NULL,
    label TEXT NOT NULL
);
CREATE TABLE products (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    price REAL NOT NULL DEFAULT 0
);
";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Post {
    pub id: Option<i64>,
    pub title: String,
    pub body: Option<String>,
    pub views: i64,
    pub published: bool,
}

impl Entity for Post {
    const NAME: &'static str = "Post";
    const SOURCE: &'static str = "posts";
    const FIELDS: &'static [&'static str] = &["title", "body", "views", "published"];

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.into()),
            "title" => Some(self.title.as_str().into()),
            "body" => Some(self.body.clone().into()),
            "views" => Some(self.views.into()),
            "published" => Some(self.published.into()),
            _ => None,
        }
    }

    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), CastError> {
        match field {
            "id" => self.id = value.try_into()?,
            "title" => self.title = value.try_into()?,
            "body" => self.body = value.try_into()?,
            "views" => self.views = value.try_into()?,
            "published" => self.published = value.try_into()?,
            _ => return Err(CastError::UnknownField),
        }
        Ok(())
    }

    fn changeset(self, attrs: &FieldMap) -> Changeset<Self> {
        Changeset::cast(self, attrs, &["title", "body", "views", "published"])
            .validate_required(&["title"])
            .validate_length("title", Some(3), Some(80))
            .validate_number_range("views", Some(0.0), None)
    }
}

/// Stricter validation bound through `EntityDescriptor::with_changeset`.
pub fn publish_changeset(post: Post, attrs: &FieldMap) -> Changeset<Post> {
    post.changeset(attrs).validate_required(&["body"])
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Tag {
    pub slug: Option<String>,
    pub label: String,
}

impl Entity for Tag {
    const NAME: &'static str = "Tag";
    const SOURCE: &'static str = "tags";
    const PRIMARY_KEY: &'static str = "slug";
    const FIELDS: &'static [&'static str] = &["label"];

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "slug" => Some(self.slug.clone().into()),
            "label" => Some(self.label.as_str().into()),
            _ => None,
        }
    }

    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), CastError> {
        match field {
            "slug" => self.slug = value.try_into()?,
            "label" => self.label = value.try_into()?,
            _ => return Err(CastError::UnknownField),
        }
        Ok(())
    }

    fn changeset(self, attrs: &FieldMap) -> Changeset<Self> {
        Changeset::cast(self, attrs, &["slug", "label"]).validate_required(&["slug", "label"])
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Product {
    pub id: Option<i64>,
    pub name: String,
    pub price: f64,
}

impl Entity for Product {
    const NAME: &'static str = "Product";
    const SOURCE: &'static str = "products";
    const FIELDS: &'static [&'static str] = &["name", "price"];

    fn get_field(&self, field: &str) -> Option<FieldValue> {
        match field {
            "id" => Some(self.id.into()),
            "name" => Some(self.name.as_str().into()),
            "price" => Some(self.price.into()),
            _ => None,
        }
    }

    fn put_field(&mut self, field: &str, value: FieldValue) -> Result<(), CastError> {
        match field {
            "id" => self.id = value.try_into()?,
            "name" => self.name = value.try_into()?,
            "price" => self.price = value.try_into()?,
            _ => return Err(CastError::UnknownField),
        }
        Ok(())
    }

    fn changeset(self, attrs: &FieldMap) -> Changeset<Self> {
        Changeset::cast(self, attrs, &["name", "price"])
            .validate_required(&["name"])
            .validate_number_range("price", Some(0.0), None)
    }
}

pub fn open_fixture_db() -> Connection {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch(SCHEMA_SQL).unwrap();
    conn
}

pub fn post_attrs(title: &str, body: &str) -> FieldMap {
    FieldMap::new().with("title", title).with("body", body)
}
