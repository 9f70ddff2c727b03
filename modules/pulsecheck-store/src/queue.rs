//! WorkQueue — "subject X needs analysis" hand-off between the front end
//! and the worker. At-least-once: a failed run releases its job back to
//! pending, a claim whose worker died goes stale and becomes claimable
//! again, and a redelivered job is harmless because the merge layer drops
//! fully covered batches.

use pulsecheck_common::PulseCheckError;
use sqlx::PgPool;
use tracing::warn;

use crate::db_err;

/// A running job older than this is assumed orphaned by a dead worker and
/// becomes claimable again. Well above the longest observed run (600 posts,
/// two remote calls each).
const STALE_CLAIM_SECS: f64 = 600.0;

/// One claimed work item.
#[derive(Debug, Clone)]
pub struct Job {
    pub id: i64,
    pub subject_id: i64,
    pub handle: Option<String>,
}

#[derive(Clone)]
pub struct WorkQueue {
    pool: PgPool,
}

impl WorkQueue {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Enqueue an analysis request for a subject. A subject with a pending
    /// job is not enqueued twice.
    pub async fn enqueue(&self, subject_id: i64, handle: Option<&str>) -> Result<(), PulseCheckError> {
        let inserted = sqlx::query(
            r#"
            INSERT INTO analysis_jobs (subject_id, handle)
            VALUES ($1, $2)
            ON CONFLICT (subject_id) WHERE status = 'pending' DO NOTHING
            "#,
        )
        .bind(subject_id)
        .bind(handle)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;

        if inserted.rows_affected() > 0 {
            // Best-effort nudge for pollers — a hint, not a delivery guarantee.
            notify_new_job(&self.pool, subject_id).await;
        }

        Ok(())
    }

    /// Claim the oldest claimable job, skipping rows other workers hold.
    /// Running jobs whose claim has gone stale count as claimable — that is
    /// the redelivery path for workers that died mid-run.
    pub async fn claim_next(&self) -> Result<Option<Job>, PulseCheckError> {
        let row = sqlx::query_as::<_, (i64, i64, Option<String>)>(
            r#"
            UPDATE analysis_jobs
            SET status = 'running', claimed_at = now()
            WHERE id = (
                SELECT id FROM analysis_jobs
                WHERE status = 'pending'
                   OR (status = 'running' AND claimed_at < now() - make_interval(secs => $1))
                ORDER BY id
                LIMIT 1
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, subject_id, handle
            "#,
        )
        .bind(STALE_CLAIM_SECS)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        Ok(row.map(|(id, subject_id, handle)| Job {
            id,
            subject_id,
            handle,
        }))
    }

    /// Ack: the job is done, drop it.
    pub async fn complete(&self, job_id: i64) -> Result<(), PulseCheckError> {
        sqlx::query("DELETE FROM analysis_jobs WHERE id = $1")
            .bind(job_id)
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Nack: hand the job back for another attempt.
    pub async fn release(&self, job_id: i64) -> Result<(), PulseCheckError> {
        sqlx::query(
            "UPDATE analysis_jobs SET status = 'pending', claimed_at = NULL WHERE id = $1",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await
        .map_err(db_err)?;
        Ok(())
    }
}

async fn notify_new_job(pool: &PgPool, subject_id: i64) {
    let result = sqlx::query("SELECT pg_notify('analysis_jobs', $1::text)")
        .bind(subject_id)
        .execute(pool)
        .await;

    if let Err(e) = result {
        warn!(error = %e, subject_id, "PG NOTIFY failed (non-fatal)");
    }
}
