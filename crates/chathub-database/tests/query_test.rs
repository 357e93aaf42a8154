//! Query builder integration tests: rendering, filtering, and
//! generation-gated result caching.

mod common;

use chrono::Utc;

use chathub_core::error::ErrorKind;
use chathub_core::types::filter::FilterOp;
use chathub_core::types::sorting::SortDirection;
use chathub_entity::{Message, User};

use common::Harness;

fn user(username: &str, tag: &str) -> User {
    User {
        id: 0,
        username: username.into(),
        tag: tag.into(),
        email: None,
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
async fn test_repeated_query_is_served_from_cache() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    for (name, tag) in [("roma", "roma228"), ("lena", "lena1"), ("ivan", "ivan7")] {
        let mut u = user(name, tag);
        repo.save(&mut u).await.unwrap();
    }

    let first = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    assert_eq!(first[0].username, "roma");
    let db_calls = harness.executor.fetch_calls();

    // No intervening writes: the second execution never reaches the
    // database.
    let second = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(harness.executor.fetch_calls(), db_calls);
}

#[tokio::test]
async fn test_write_to_involved_table_forces_requery() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut u = user("roma", "roma228");
    repo.save(&mut u).await.unwrap();

    let first = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap();
    assert_eq!(first.len(), 1);
    let db_calls = harness.executor.fetch_calls();

    // Any write to the table bumps its generation and misses the cache.
    let mut other = user("lena", "lena1");
    repo.save(&mut other).await.unwrap();

    let second = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap();
    assert_eq!(second, first);
    assert_eq!(harness.executor.fetch_calls(), db_calls + 1);
}

#[tokio::test]
async fn test_distinct_params_are_cached_independently() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut a = user("roma", "roma228");
    let mut b = user("lena", "lena1");
    repo.save(&mut a).await.unwrap();
    repo.save(&mut b).await.unwrap();

    let for_a = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap();
    let for_b = repo.query().filter("tag", "lena1").execute().await.unwrap();
    assert_eq!(for_a[0].username, "roma");
    assert_eq!(for_b[0].username, "lena");

    // Both results live under distinct keys and replay from cache.
    let db_calls = harness.executor.fetch_calls();
    assert_eq!(
        repo.query()
            .filter("tag", "roma228")
            .execute()
            .await
            .unwrap(),
        for_a
    );
    assert_eq!(
        repo.query().filter("tag", "lena1").execute().await.unwrap(),
        for_b
    );
    assert_eq!(harness.executor.fetch_calls(), db_calls);
}

#[tokio::test]
async fn test_filters_ordering_and_limit() {
    let harness = Harness::new();
    let repo = harness.repository::<Message>();

    let mut batch = vec![
        message(1, "first"),
        message(1, "second"),
        message(1, "third"),
        message(2, "elsewhere"),
    ];
    repo.save_batch(&mut batch).await.unwrap();

    let newest_two = repo
        .query()
        .filter_op("chat_id", FilterOp::Eq, 1i64)
        .order_by("id", SortDirection::Desc)
        .limit(2)
        .execute_without_cache()
        .await
        .unwrap();

    assert_eq!(newest_two.len(), 2);
    assert_eq!(newest_two[0].body, "third");
    assert_eq!(newest_two[1].body, "second");
}

#[tokio::test]
async fn test_comparison_operators() {
    let harness = Harness::new();
    let repo = harness.repository::<Message>();

    let mut batch = vec![message(1, "a"), message(2, "b"), message(3, "c")];
    repo.save_batch(&mut batch).await.unwrap();

    let later_chats = repo
        .query()
        .filter_op("chat_id", FilterOp::Gt, 1i64)
        .order_by("chat_id", SortDirection::Asc)
        .execute_without_cache()
        .await
        .unwrap();
    assert_eq!(later_chats.len(), 2);
    assert_eq!(later_chats[0].body, "b");

    let not_two = repo
        .query()
        .filter_op("chat_id", FilterOp::Ne, 2i64)
        .execute_without_cache()
        .await
        .unwrap();
    assert_eq!(not_two.len(), 2);
}

#[tokio::test]
async fn test_execute_without_cache_always_queries() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let mut u = user("roma", "roma228");
    repo.save(&mut u).await.unwrap();

    let db_calls = harness.executor.fetch_calls();
    repo.query()
        .filter("tag", "roma228")
        .execute_without_cache()
        .await
        .unwrap();
    repo.query()
        .filter("tag", "roma228")
        .execute_without_cache()
        .await
        .unwrap();
    assert_eq!(harness.executor.fetch_calls(), db_calls + 2);
}

#[tokio::test]
async fn test_unknown_filter_field_is_rejected() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    let err = repo
        .query()
        .filter("no_such_column", 1i64)
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Validation);
}

#[tokio::test]
async fn test_database_failure_propagates_from_query() {
    let harness = Harness::new();
    let repo = harness.repository::<User>();

    harness.executor.set_failing(true);
    let err = repo
        .query()
        .filter("tag", "roma228")
        .execute()
        .await
        .unwrap_err();
    assert_eq!(err.kind, ErrorKind::Database);
}
