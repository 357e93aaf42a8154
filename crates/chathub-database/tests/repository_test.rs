//! Repository integration tests over the in-memory executor.

mod common;

use chrono::Utc;

use chathub_core::error::ErrorKind;
use chathub_database::{BuildStrategy, build_entity};
use chathub_entity::{Message, User};

use common::Harness;

fn roma() -> User {
    User {
        id: 0,
        username: "roma".into(),
        tag: "roma228".into(),
        email: Some("roma@example.com".into()),
        display_name: None,
        created_at: Utc::now(),
    }
}

fn message(chat_id: i64, body: &str) -> Message {
    Message {
        id: 0,
        chat_id,
        sender_id: 1,
        body: body.into(),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn test_save_assigns_id_and_find_one_round_trips() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();
    assert!(user.id > 0);

    // First read misses the cache and hits the database.
    let found = repo.find_one(user.id).await.unwrap().unwrap();
    assert_eq!(found, user);
    let db_calls = harness.executor.fetch_calls();

    // The entity is now cached under its key; a second read stays off the
    // database.
    let cached = harness
        .provider_get(&format!("entity_cache:users:{}", user.id))
        .await;
    assert!(cached.is_some());
    let again = repo.find_one(user.id).await.unwrap().unwrap();
    assert_eq!(again, user);
    assert_eq!(harness.executor.fetch_calls(), db_calls);
}

#[tokio::test]
async fn test_generation_counts_one_per_mutation() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();
    assert_eq!(harness.cache.generation_of("users").await, 1);

    assert!(repo.delete_by_id(user.id).await.unwrap());
    assert_eq!(harness.cache.generation_of("users").await, 2);

    assert_eq!(repo.find_one(user.id).await.unwrap(), None);
}

#[tokio::test]
async fn test_generator_entities_get_time_ordered_ids() {
    let harness = Harness::new();
    let repo = harness.repository::<Message>();

    let mut first = message(10, "hello");
    let mut second = message(10, "world");
    repo.save(&mut first).await.unwrap();
    repo.save(&mut second).await.unwrap();

    assert!(first.id > 0);
    assert!(second.id > first.id);
    let (_, service_id, _) = chathub_id::decompose(first.id);
    assert_eq!(service_id, 1);
}

#[tokio::test]
async fn test_failed_save_leaves_cache_and_generation_untouched() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();
    let cached_before = repo.find_one(user.id).await.unwrap();
    assert_eq!(harness.cache.generation_of("users").await, 1);

    harness.executor.set_failing(true);
    user.username = "changed".into();
    let err = repo.save(&mut user).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);

    // The cached entity and the generation counter are exactly as before
    // the failed write.
    harness.executor.set_failing(false);
    assert_eq!(repo.find_one(user.id).await.unwrap(), cached_before);
    assert_eq!(harness.cache.generation_of("users").await, 1);
}

#[tokio::test]
async fn test_database_error_is_distinct_from_not_found() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    assert_eq!(repo.find_one(999).await.unwrap(), None);

    harness.executor.set_failing(true);
    let err = repo.find_one(999).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}

#[tokio::test]
async fn test_exists_uses_short_lived_cached_boolean() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();

    assert!(repo.exists(user.id).await.unwrap());
    let db_calls = harness.executor.fetch_calls();

    // Second check is served from the cached boolean.
    assert!(repo.exists(user.id).await.unwrap());
    assert_eq!(harness.executor.fetch_calls(), db_calls);

    assert!(!repo.exists(987_654).await.unwrap());
}

#[tokio::test]
async fn test_save_batch_assigns_generator_ids_and_bumps_once() {
    let harness = Harness::new();
    let repo = harness.repository::<Message>();

    let mut batch = vec![message(1, "a"), message(1, "b"), message(2, "c")];
    repo.save_batch(&mut batch).await.unwrap();

    assert!(batch.iter().all(|m| m.id > 0));
    let mut ids: Vec<i64> = batch.iter().map(|m| m.id).collect();
    ids.dedup();
    assert_eq!(ids.len(), 3);

    assert_eq!(harness.executor.row_count("messages"), 3);
    assert_eq!(harness.executor.execute_calls(), 1);
    assert_eq!(harness.cache.generation_of("messages").await, 1);
}

#[tokio::test]
async fn test_save_batch_rejects_unsaved_database_sourced_entities() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut batch = vec![roma()];
    let err = repo.save_batch(&mut batch).await.unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
    assert_eq!(harness.executor.row_count("users"), 0);
}

#[tokio::test]
async fn test_delete_batch_removes_rows_and_bumps_once() {
    let harness = Harness::new();
    let repo = harness.repository::<Message>();

    let mut batch = vec![message(1, "a"), message(1, "b")];
    repo.save_batch(&mut batch).await.unwrap();
    assert_eq!(harness.cache.generation_of("messages").await, 1);

    let deleted = repo.delete_batch(&batch).await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(harness.executor.row_count("messages"), 0);
    assert_eq!(harness.cache.generation_of("messages").await, 2);
}

#[tokio::test]
async fn test_truncate_clears_rows_and_table_cache_keys() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();
    repo.find_one(user.id).await.unwrap();
    let key = format!("entity_cache:users:{}", user.id);
    assert!(harness.provider_get(&key).await.is_some());

    let removed = repo.truncate().await.unwrap();
    assert_eq!(removed, 1);
    assert_eq!(harness.executor.row_count("users"), 0);
    assert!(harness.provider_get(&key).await.is_none());
    assert_eq!(repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_find_one_without_cache_never_populates() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut user = roma();
    repo.save(&mut user).await.unwrap();

    let found = repo.find_one_without_cache(user.id).await.unwrap().unwrap();
    assert_eq!(found, user);
    let key = format!("entity_cache:users:{}", user.id);
    assert!(harness.provider_get(&key).await.is_none());

    // Every call goes to the database.
    let db_calls = harness.executor.fetch_calls();
    repo.find_one_without_cache(user.id).await.unwrap();
    assert_eq!(harness.executor.fetch_calls(), db_calls + 1);
}

#[tokio::test]
async fn test_builder_strategies_are_equivalent() {
    let mut row = chathub_core::types::value::SqlRow::new();
    let now = Utc::now();
    row.push("id", chathub_core::types::value::SqlValue::BigInt(6));
    row.push(
        "username",
        chathub_core::types::value::SqlValue::Text("roma".into()),
    );
    row.push(
        "tag",
        chathub_core::types::value::SqlValue::Text("roma228".into()),
    );
    row.push("email", chathub_core::types::value::SqlValue::Null);
    row.push("display_name", chathub_core::types::value::SqlValue::Null);
    row.push(
        "created_at",
        chathub_core::types::value::SqlValue::Timestamp(now),
    );

    let reflective: User = build_entity(&row, BuildStrategy::Reflective).unwrap();
    let fast: User = build_entity(&row, BuildStrategy::Fast).unwrap();
    assert_eq!(reflective, fast);
    assert_eq!(reflective.id, 6);
    assert_eq!(reflective.email, None);
    assert_eq!(reflective.created_at, now);
}
