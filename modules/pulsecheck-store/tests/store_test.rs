//! Integration tests for the summary store, change flag and work queue.
//! Requires a Postgres instance. Set DATABASE_TEST_URL or these tests are skipped.

use pulsecheck_common::{AnalysedSummary, BatchMeta, PulseCheckError, TopicCount};
use pulsecheck_store::{migrate, ChangeFlag, MergeOutcome, SummaryStore, WorkQueue};
use sqlx::PgPool;

async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("DATABASE_TEST_URL").ok()?;
    let pool = PgPool::connect(&url).await.ok()?;

    migrate(&pool).await.ok()?;

    sqlx::query("TRUNCATE summaries, analysis_jobs RESTART IDENTITY")
        .execute(&pool)
        .await
        .ok()?;
    sqlx::query("UPDATE change_flag SET changes_made = false WHERE id = 1")
        .execute(&pool)
        .await
        .ok()?;

    Some(pool)
}

fn summary(subject_id: i64, earliest: i64, latest: i64, positive: i64, negative: i64) -> AnalysedSummary {
    AnalysedSummary {
        meta: BatchMeta {
            subject_id,
            earliest_id: earliest,
            latest_id: latest,
        },
        positive,
        negative,
        neutral: 1,
        average_score: AnalysedSummary::recompute_average(positive, negative),
        topics: vec![TopicCount {
            topic: "/News".into(),
            count: 2,
        }],
    }
}

// =========================================================================
// Merge-and-store
// =========================================================================

#[tokio::test]
async fn first_batch_inserts_and_sets_flag() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = SummaryStore::new(pool.clone());
    let flag = ChangeFlag::new(pool);

    let outcome = store.merge_and_store(&summary(1, 10, 20, 3, 2)).await.unwrap();
    assert_eq!(outcome, MergeOutcome::Inserted);

    let stored = store.get(1).await.unwrap().expect("summary stored");
    assert_eq!(stored.meta.earliest_id, 10);
    assert_eq!(stored.meta.latest_id, 20);
    assert_eq!(stored.positive, 3);
    assert_eq!(stored.negative, 2);

    assert!(flag.get().await.unwrap());
}

#[tokio::test]
async fn same_batch_twice_is_idempotent() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = SummaryStore::new(pool);

    let batch = summary(2, 10, 20, 3, 2);
    store.merge_and_store(&batch).await.unwrap();
    let first = store.get(2).await.unwrap().unwrap();

    let outcome = store.merge_and_store(&batch).await.unwrap();
    assert_eq!(outcome, MergeOutcome::AlreadyCovered);

    let second = store.get(2).await.unwrap().unwrap();
    assert_eq!(first, second);
}

#[tokio::test]
async fn covered_batch_rolls_back_without_touching_state() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = SummaryStore::new(pool);

    store.merge_and_store(&summary(3, 5, 50, 10, 4)).await.unwrap();
    let before = store.get(3).await.unwrap().unwrap();

    let outcome = store.merge_and_store(&summary(3, 10, 20, 99, 99)).await.unwrap();
    assert_eq!(outcome, MergeOutcome::AlreadyCovered);
    assert_eq!(store.get(3).await.unwrap().unwrap(), before);
}

#[tokio::test]
async fn adjacent_batch_merges_counts_and_recomputes_average() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = SummaryStore::new(pool);

    store.merge_and_store(&summary(4, 10, 20, 3, 2)).await.unwrap();
    let outcome = store.merge_and_store(&summary(4, 21, 30, 1, 4)).await.unwrap();
    assert_eq!(outcome, MergeOutcome::Merged);

    let merged = store.get(4).await.unwrap().unwrap();
    assert_eq!(merged.meta.earliest_id, 10);
    assert_eq!(merged.meta.latest_id, 30);
    assert_eq!(merged.positive, 4);
    assert_eq!(merged.negative, 6);
    assert_eq!(merged.average_score, -0.2);
    // Topic tallies from both batches add up
    assert_eq!(merged.topics[0].count, 4);
}

#[tokio::test]
async fn zero_unit_summary_is_rejected() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let store = SummaryStore::new(pool);

    let mut empty = summary(5, 10, 20, 0, 0);
    empty.neutral = 0;
    let err = store.merge_and_store(&empty).await.unwrap_err();
    assert!(matches!(err, PulseCheckError::InvalidSummary(_)));
    assert!(store.get(5).await.unwrap().is_none());
}

// =========================================================================
// Change flag
// =========================================================================

#[tokio::test]
async fn check_and_clear_fires_once() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let flag = ChangeFlag::new(pool);

    flag.set().await.unwrap();
    assert!(flag.check_and_clear().await.unwrap());
    assert!(!flag.check_and_clear().await.unwrap());
}

// =========================================================================
// Work queue
// =========================================================================

#[tokio::test]
async fn claim_complete_drains_queue() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let queue = WorkQueue::new(pool);

    queue.enqueue(100, Some("jane")).await.unwrap();
    let job = queue.claim_next().await.unwrap().expect("job pending");
    assert_eq!(job.subject_id, 100);
    assert_eq!(job.handle.as_deref(), Some("jane"));

    queue.complete(job.id).await.unwrap();
    assert!(queue.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn pending_jobs_dedupe_per_subject() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let queue = WorkQueue::new(pool);

    queue.enqueue(200, None).await.unwrap();
    queue.enqueue(200, None).await.unwrap();

    assert!(queue.claim_next().await.unwrap().is_some());
    assert!(queue.claim_next().await.unwrap().is_none());
}

#[tokio::test]
async fn released_job_can_be_claimed_again() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let queue = WorkQueue::new(pool);

    queue.enqueue(300, None).await.unwrap();
    let job = queue.claim_next().await.unwrap().unwrap();
    queue.release(job.id).await.unwrap();

    let again = queue.claim_next().await.unwrap().expect("released job pending");
    assert_eq!(again.id, job.id);
}

#[tokio::test]
async fn stale_running_claim_is_reclaimed() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let queue = WorkQueue::new(pool.clone());

    queue.enqueue(400, Some("stale")).await.unwrap();
    let job = queue.claim_next().await.unwrap().unwrap();

    // A live claim stays invisible to other workers.
    assert!(queue.claim_next().await.unwrap().is_none());

    // Backdate the claim as if the holding worker died mid-run.
    sqlx::query("UPDATE analysis_jobs SET claimed_at = now() - interval '1 hour' WHERE id = $1")
        .bind(job.id)
        .execute(&pool)
        .await
        .unwrap();

    let again = queue.claim_next().await.unwrap().expect("stale job reclaimed");
    assert_eq!(again.id, job.id);
    assert_eq!(again.subject_id, 400);
}
