mod common;

use common::{open_fixture_db, post_attrs, publish_changeset, Post, Tag};
use repokit_core::db::{open_db, open_db_in_memory};
use repokit_core::{
    Crud, DataAccess, EntityDescriptor, FieldMap, FieldValue, Failure, Filter, RepoError,
    SqliteRepository,
};
use rusqlite::Connection;

fn post_crud(conn: &Connection) -> Crud<Post, SqliteRepository<'_, Post>> {
    let repo = SqliteRepository::try_new(conn).unwrap();
    Crud::builder()
        .data_access(repo)
        .entity(EntityDescriptor::of())
        .build()
        .unwrap()
}

fn ids(posts: &[Post]) -> Vec<i64> {
    posts.iter().map(|post| post.id.unwrap()).collect()
}

fn seed_posts(crud: &Crud<Post, SqliteRepository<'_, Post>>, count: usize) -> Vec<Post> {
    (0..count)
        .map(|index| {
            crud.create(post_attrs(&format!("post number {index}"), "body"))
                .unwrap()
        })
        .collect()
}

#[test]
fn create_returns_stored_record_matching_input() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let attrs = FieldMap::new()
        .with("title", "Hello world")
        .with("body", "first body")
        .with("views", 7)
        .with("published", true);
    let post = crud.create(attrs).unwrap();

    assert!(post.id.is_some());
    assert_eq!(post.title, "Hello world");
    assert_eq!(post.body.as_deref(), Some("first body"));
    assert_eq!(post.views, 7);
    assert!(post.published);
}

#[test]
fn create_then_get_roundtrip() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let created = crud.create(post_attrs("Roundtrip", "same record")).unwrap();
    let fetched = crud.get(created.id.unwrap()).unwrap();
    assert_eq!(fetched, created);
}

#[test]
fn create_reports_one_message_per_invalid_field() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let result = crud.create(FieldMap::new().with("title", "ab").with("views", -1));
    assert_eq!(
        result,
        Err(Failure::Validation(vec![
            "Title: should be at least 3 character(s)".to_string(),
            "Views: must be greater than or equal to 0".to_string(),
        ]))
    );

    let missing = crud.create(FieldMap::new().with("body", "no title"));
    assert_eq!(
        missing,
        Err(Failure::Validation(vec!["Title: can't be blank".to_string()]))
    );

    let wrong_type = crud.create(post_attrs("Typed", "x").with("views", "many"));
    assert_eq!(
        wrong_type,
        Err(Failure::Validation(vec!["Views: is invalid".to_string()]))
    );

    assert_eq!(crud.all().unwrap(), Vec::new());
}

#[test]
fn create_accepts_attributes_deserialized_from_json() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let attrs: FieldMap =
        serde_json::from_str(r#"{"title":"From JSON","views":3,"published":false}"#).unwrap();
    let post = crud.create(attrs).unwrap();
    assert_eq!(post.title, "From JSON");
    assert_eq!(post.views, 3);
    assert_eq!(post.body, None);
}

#[test]
fn get_missing_id_is_not_found() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    assert_eq!(
        crud.get(404),
        Err(Failure::Message("Post not found".to_string()))
    );
}

#[test]
fn all_is_empty_then_ordered_by_id() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    assert_eq!(crud.all().unwrap(), Vec::new());

    let created = seed_posts(&crud, 3);
    let listed = crud.all().unwrap();
    assert_eq!(listed.len(), 3);
    assert_eq!(ids(&listed), ids(&created));
    assert!(ids(&listed).windows(2).all(|pair| pair[0] < pair[1]));
}

#[test]
fn limit_and_offset_page_through_ordered_records() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let created = ids(&seed_posts(&crud, 5));

    assert_eq!(ids(&crud.limit(2).unwrap()), created[..2].to_vec());
    assert_eq!(ids(&crud.limit_offset(2, 3).unwrap()), created[3..5].to_vec());
    assert_eq!(ids(&crud.limit_offset(10, 4).unwrap()), created[4..].to_vec());
    assert!(crud.limit(0).unwrap().is_empty());
    assert!(crud.limit_offset(3, 9).unwrap().is_empty());
}

#[test]
fn all_by_and_limit_by_apply_exact_filters() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let a = crud
        .create(post_attrs("Draft one", "x").with("published", false))
        .unwrap();
    let b = crud
        .create(post_attrs("Live one", "x").with("published", true))
        .unwrap();
    let c = crud
        .create(post_attrs("Live two", "y").with("published", true))
        .unwrap();
    let d = crud
        .create(post_attrs("Live three", "x").with("published", true))
        .unwrap();

    let live = crud.all_by([("published", true)]).unwrap();
    assert_eq!(ids(&live), ids(&[b.clone(), c.clone(), d.clone()]));

    let live_x = crud
        .all_by(Filter::new().and("published", true).and("body", "x"))
        .unwrap();
    assert_eq!(ids(&live_x), ids(&[b.clone(), d.clone()]));

    let first_live = crud.limit_by([("published", true)], 1, None).unwrap();
    assert_eq!(ids(&first_live), ids(&[b]));

    let skipped = crud.limit_by([("published", true)], 5, Some(1)).unwrap();
    assert_eq!(ids(&skipped), ids(&[c, d]));

    let exact_only = crud.all_by([("title", "draft")]).unwrap();
    assert!(exact_only.is_empty());
    assert_eq!(ids(&crud.all_by([("title", "Draft one")]).unwrap()), ids(&[a]));
}

#[test]
fn get_by_returns_single_match_or_failure() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let first = crud.create(post_attrs("Unique title", "same")).unwrap();
    crud.create(post_attrs("Other title", "same")).unwrap();

    assert_eq!(crud.get_by([("title", "Unique title")]).unwrap(), first);
    assert_eq!(
        crud.get_by([("title", "Nope")]),
        Err(Failure::not_found("Post"))
    );
    assert_eq!(
        crud.get_by([("body", "same")]),
        Err(Failure::Message("expected at most one Post, got 2".to_string()))
    );
}

#[test]
fn unknown_filter_field_fails_at_data_access_layer() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let failure = crud.all_by([("author", "me")]).unwrap_err();
    assert_eq!(
        failure,
        Failure::Message("unknown field `author` for `posts`".to_string())
    );
    assert!(crud.find([("author", "me")]).is_err());
}

#[test]
fn update_variants_converge_on_the_same_mutation_path() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let post = crud.create(post_attrs("Original", "body")).unwrap();
    let id = post.id.unwrap();

    let updated = crud
        .update(&post, FieldMap::new().with("title", "Renamed"))
        .unwrap();
    assert_eq!(updated.title, "Renamed");
    assert_eq!(updated.id, post.id);

    let by_id = crud
        .update_by_id(id, FieldMap::new().with("views", 42))
        .unwrap();
    assert_eq!(by_id.views, 42);
    assert_eq!(by_id.title, "Renamed");

    let by_field = crud
        .update_by("title", "Renamed", FieldMap::new().with("published", true))
        .unwrap();
    assert!(by_field.published);

    assert_eq!(crud.get(id).unwrap(), by_field);
}

#[test]
fn update_with_no_changes_returns_record_untouched() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let post = crud.create(post_attrs("Stable", "body")).unwrap();

    let same = crud
        .update(&post, FieldMap::new().with("title", "Stable"))
        .unwrap();
    assert_eq!(same, post);
}

#[test]
fn update_of_missing_record_is_not_found_before_validation() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);

    let invalid_changes = FieldMap::new().with("title", "x");
    assert_eq!(
        crud.update_by_id(999, invalid_changes.clone()),
        Err(Failure::not_found("Post"))
    );
    assert_eq!(
        crud.update_by("title", "ghost", invalid_changes),
        Err(Failure::not_found("Post"))
    );
}

#[test]
fn update_rejects_invalid_changes_and_keeps_stored_row() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let post = crud.create(post_attrs("Keep me", "body")).unwrap();

    let result = crud.update(&post, FieldMap::new().with("title", "").with("views", -5));
    assert_eq!(
        result,
        Err(Failure::Validation(vec![
            "Title: can't be blank, should be at least 3 character(s)".to_string(),
            "Views: must be greater than or equal to 0".to_string(),
        ]))
    );
    assert_eq!(crud.get(post.id.unwrap()).unwrap(), post);
}

#[test]
fn update_of_deleted_record_is_not_found() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let post = crud.create(post_attrs("Short lived", "body")).unwrap();
    crud.delete(&post).unwrap();

    assert_eq!(
        crud.update(&post, FieldMap::new().with("title", "Revived")),
        Err(Failure::not_found("Post"))
    );
}

#[test]
fn delete_removes_record_and_second_delete_is_not_found() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let keep = crud.create(post_attrs("Keep", "body")).unwrap();
    let drop = crud.create(post_attrs("Drop", "body")).unwrap();

    let deleted = crud.delete(&drop).unwrap();
    assert_eq!(deleted, drop);
    assert_eq!(crud.all().unwrap(), vec![keep]);

    assert_eq!(
        crud.delete(&drop),
        Err(Failure::Message("Post is not found".to_string()))
    );
}

#[test]
fn delete_by_id_short_circuits_on_lookup_failure() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let post = crud.create(post_attrs("Target", "body")).unwrap();

    assert_eq!(crud.delete_by_id(post.id.unwrap()).unwrap(), post);
    assert_eq!(
        crud.delete_by_id(post.id.unwrap()),
        Err(Failure::Message("Post not found".to_string()))
    );
}

#[test]
fn find_matches_case_insensitive_substrings_conjunctively() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let ownership = crud
        .create(post_attrs("Rust Ownership", "borrowing and moves"))
        .unwrap();
    let async_rust = crud
        .create(post_attrs("Async Rust", "futures and executors"))
        .unwrap();
    let gardening = crud
        .create(post_attrs("Gardening", "Soil and seeds"))
        .unwrap();

    let rust = crud.find([("title", "rust")]).unwrap();
    assert_eq!(ids(&rust), ids(&[ownership.clone(), async_rust.clone()]));

    let narrowed = crud
        .find(Filter::new().and("title", "RUST").and("body", "FUT"))
        .unwrap();
    assert_eq!(ids(&narrowed), ids(&[async_rust.clone()]));

    let shared = crud.find([("body", "and")]).unwrap();
    assert_eq!(
        ids(&shared),
        ids(&[ownership.clone(), async_rust.clone(), gardening.clone()])
    );

    let disjoint = crud
        .find(Filter::new().and("title", "garden").and("body", "borrow"))
        .unwrap();
    assert!(disjoint.is_empty());

    let numeric = crud.find([("views", 0)]).unwrap();
    assert_eq!(numeric.len(), 3);
}

#[test]
fn find_with_empty_filter_returns_every_record() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let created = seed_posts(&crud, 3);

    assert_eq!(ids(&crud.find(Filter::new()).unwrap()), ids(&created));
}

#[test]
fn find_treats_like_wildcards_literally() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    let sale = crud.create(post_attrs("50% off_today", "promo")).unwrap();
    crud.create(post_attrs("500 offers", "promo")).unwrap();

    assert_eq!(ids(&crud.find([("title", "0% off_")]).unwrap()), ids(&[sale]));
    assert!(crud.find([("title", "%")]).unwrap().len() == 1);
}

#[test]
fn descriptor_can_rename_entity_and_bind_stricter_changeset() {
    let conn = open_fixture_db();
    let repo = SqliteRepository::<Post>::try_new(&conn).unwrap();
    let crud = Crud::new(
        repo,
        EntityDescriptor::of()
            .named("Article")
            .with_changeset(publish_changeset),
    );

    assert_eq!(crud.entity_name(), "Article");
    assert_eq!(
        crud.create(FieldMap::new().with("title", "No body")),
        Err(Failure::Validation(vec!["Body: can't be blank".to_string()]))
    );
    assert_eq!(crud.get(1), Err(Failure::not_found("Article")));
}

#[test]
fn text_primary_keys_are_supported() {
    let conn = open_fixture_db();
    let repo = SqliteRepository::<Tag>::try_new(&conn).unwrap();
    let crud = Crud::new(repo, EntityDescriptor::of());

    let rust = crud
        .create(FieldMap::new().with("slug", "rust").with("label", "Rust"))
        .unwrap();
    crud.create(FieldMap::new().with("slug", "go").with("label", "Go"))
        .unwrap();

    assert_eq!(crud.get("rust").unwrap(), rust);
    let slugs: Vec<_> = crud
        .all()
        .unwrap()
        .into_iter()
        .map(|tag| tag.slug.unwrap())
        .collect();
    assert_eq!(slugs, vec!["go".to_string(), "rust".to_string()]);

    let renamed = crud
        .update_by_id("rust", FieldMap::new().with("label", "Rust lang"))
        .unwrap();
    assert_eq!(renamed.label, "Rust lang");

    assert!(crud.delete_by_id("go").is_ok());
    assert_eq!(crud.get("go"), Err(Failure::not_found("Tag")));
}

#[test]
fn duplicate_text_key_surfaces_as_failure_message() {
    let conn = open_fixture_db();
    let repo = SqliteRepository::<Tag>::try_new(&conn).unwrap();
    let crud = Crud::new(repo, EntityDescriptor::of());

    crud.create(FieldMap::new().with("slug", "dup").with("label", "One"))
        .unwrap();
    let failure = crud
        .create(FieldMap::new().with("slug", "dup").with("label", "Two"))
        .unwrap_err();
    assert!(matches!(failure, Failure::Message(message) if message.contains("UNIQUE")));
}

#[test]
fn repository_rejects_connection_without_required_table() {
    let conn = open_db_in_memory().unwrap();

    let result = SqliteRepository::<Post>::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredTable("posts"))
    ));
}

#[test]
fn repository_rejects_table_missing_required_column() {
    let conn = open_db_in_memory().unwrap();
    conn.execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT NOT NULL);")
        .unwrap();

    let result = SqliteRepository::<Post>::try_new(&conn);
    assert!(matches!(
        result,
        Err(RepoError::MissingRequiredColumn {
            table: "posts",
            column: "body"
        })
    ));
}

#[test]
fn invalid_persisted_data_is_reported_not_masked() {
    let conn = open_fixture_db();
    let crud = post_crud(&conn);
    conn.execute(
        "INSERT INTO posts (title, views) VALUES ('Corrupt', 'lots');",
        [],
    )
    .unwrap();

    let failure = crud.all().unwrap_err();
    assert!(failure.to_string().contains("posts.views"));
}

#[test]
fn file_backed_database_persists_across_connections() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("posts.sqlite3");

    let created = {
        let conn = open_db(&path).unwrap();
        conn.execute_batch(common::SCHEMA_SQL).unwrap();
        let crud = post_crud(&conn);
        let post = crud.create(post_attrs("Durable", "on disk")).unwrap();
        post
    };

    let conn = open_db(&path).unwrap();
    let crud = post_crud(&conn);
    assert_eq!(crud.get(created.id.unwrap()).unwrap(), created);
    assert_eq!(
        crud.data_access().get(&created.id.unwrap().into()).unwrap(),
        Some(created.clone())
    );
    assert_eq!(
        crud.find([("body", FieldValue::from("DISK"))]).unwrap(),
        vec![created]
    );
}
