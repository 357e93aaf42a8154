//! Batcher integration tests: size-, timer-, and shutdown-triggered
//! flushes over the in-memory executor.

mod common;

use std::time::Duration;

use chrono::Utc;

use chathub_core::config::batcher::BatcherConfig;
use chathub_entity::{DeliveryState, MessageStatus};
use chathub_worker::{DeleteBatcher, SaveBatcher};

use common::Harness;

fn status(message_id: i64, user_id: i64) -> MessageStatus {
    MessageStatus {
        id: 0,
        message_id,
        user_id,
        state: DeliveryState::Delivered,
        updated_at: Utc::now(),
    }
}

fn config(batch_size: usize, flush_interval_seconds: u64) -> BatcherConfig {
    BatcherConfig {
        batch_size,
        flush_interval_seconds,
    }
}

#[tokio::test]
async fn test_reaching_batch_size_triggers_one_full_flush() {
    let harness = Harness::new();
    let batcher = SaveBatcher::new(
        harness.repository::<MessageStatus>(),
        harness.pool.clone(),
        &config(3, 3600),
    );

    batcher.add(status(1, 1));
    batcher.add(status(1, 2));
    assert_eq!(harness.executor.row_count("message_statuses"), 0);

    batcher.add(status(1, 3));
    harness.pool.wait_all().await;

    assert_eq!(harness.executor.row_count("message_statuses"), 3);
    assert_eq!(batcher.pending(), 0);
    // One multi-row statement, not three.
    assert_eq!(harness.executor.execute_calls(), 1);
}

#[tokio::test]
async fn test_timer_flushes_partial_buffer() {
    let harness = Harness::new();
    let batcher = SaveBatcher::new(
        harness.repository::<MessageStatus>(),
        harness.pool.clone(),
        &config(100, 1),
    );

    batcher.add(status(2, 1));
    batcher.add(status(2, 2));
    assert_eq!(harness.executor.row_count("message_statuses"), 0);

    tokio::time::sleep(Duration::from_millis(1500)).await;
    harness.pool.wait_all().await;

    assert_eq!(harness.executor.row_count("message_statuses"), 2);
    assert_eq!(batcher.pending(), 0);
}

#[tokio::test]
async fn test_shutdown_flushes_remainder() {
    let harness = Harness::new();
    let batcher = SaveBatcher::new(
        harness.repository::<MessageStatus>(),
        harness.pool.clone(),
        &config(100, 3600),
    );

    batcher.add(status(3, 1));
    batcher.add(status(3, 2));
    batcher.shutdown().await;

    assert_eq!(harness.executor.row_count("message_statuses"), 2);
    assert_eq!(batcher.pending(), 0);
}

#[tokio::test]
async fn test_failed_flush_is_dropped_not_requeued() {
    let harness = Harness::new();
    let batcher = SaveBatcher::new(
        harness.repository::<MessageStatus>(),
        harness.pool.clone(),
        &config(2, 3600),
    );

    harness.executor.set_failing(true);
    batcher.add(status(4, 1));
    batcher.add(status(4, 2));
    harness.pool.wait_all().await;

    assert_eq!(harness.executor.row_count("message_statuses"), 0);
    assert_eq!(batcher.pending(), 0);

    // The batcher keeps working after a dropped batch.
    harness.executor.set_failing(false);
    batcher.add(status(4, 3));
    batcher.add(status(4, 4));
    harness.pool.wait_all().await;
    assert_eq!(harness.executor.row_count("message_statuses"), 2);
}

#[tokio::test]
async fn test_delete_batcher_removes_saved_rows() {
    let harness = Harness::new();
    let repo = harness.repository::<MessageStatus>();

    let mut saved = vec![status(5, 1), status(5, 2), status(5, 3)];
    repo.save_batch(&mut saved).await.unwrap();
    assert_eq!(harness.executor.row_count("message_statuses"), 3);

    let batcher = DeleteBatcher::new(repo, harness.pool.clone(), &config(2, 3600));
    for entity in &saved[..2] {
        batcher.add(entity.clone());
    }
    harness.pool.wait_all().await;
    assert_eq!(harness.executor.row_count("message_statuses"), 1);

    batcher.add(saved[2].clone());
    batcher.shutdown().await;
    assert_eq!(harness.executor.row_count("message_statuses"), 0);
}

#[tokio::test]
async fn test_async_repository_calls_run_on_the_pool() {
    let harness = Harness::new();
    let repo = harness.repository::<MessageStatus>();

    let mut entity = status(6, 1);
    repo.save(&mut entity).await.unwrap();

    let handle = repo.find_one_async(harness.pool.as_ref(), entity.id);
    let found = handle.join().await.unwrap().unwrap().unwrap();
    assert_eq!(found, entity);

    let handle = repo
        .query()
        .filter("message_id", 6i64)
        .execute_async(harness.pool.as_ref());
    let listed = handle.join().await.unwrap().unwrap();
    assert_eq!(listed.len(), 1);
}
