//! Idempotent schema setup. Safe to run on every startup.

use pulsecheck_common::PulseCheckError;
use sqlx::PgPool;

use crate::db_err;

pub async fn migrate(pool: &PgPool) -> Result<(), PulseCheckError> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS summaries (
            subject_id    BIGINT           PRIMARY KEY,
            earliest_id   BIGINT           NOT NULL,
            latest_id     BIGINT           NOT NULL,
            positive      BIGINT           NOT NULL,
            negative      BIGINT           NOT NULL,
            neutral       BIGINT           NOT NULL,
            average_score DOUBLE PRECISION NOT NULL,
            topics        JSONB            NOT NULL DEFAULT '[]',
            updated_at    TIMESTAMPTZ      NOT NULL DEFAULT now(),
            CHECK (earliest_id <= latest_id)
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS change_flag (
            id           SMALLINT PRIMARY KEY CHECK (id = 1),
            changes_made BOOLEAN  NOT NULL DEFAULT false
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    // Seed the singleton row so readers and writers can assume it exists.
    sqlx::query("INSERT INTO change_flag (id, changes_made) VALUES (1, false) ON CONFLICT (id) DO NOTHING")
        .execute(pool)
        .await
        .map_err(db_err)?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS analysis_jobs (
            id         BIGSERIAL   PRIMARY KEY,
            subject_id BIGINT      NOT NULL,
            handle     TEXT,
            status     TEXT        NOT NULL DEFAULT 'pending',
            claimed_at TIMESTAMPTZ,
            created_at TIMESTAMPTZ NOT NULL DEFAULT now()
        )
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    // One pending job per subject is enough; redelivery is harmless but noisy.
    sqlx::query(
        r#"
        CREATE UNIQUE INDEX IF NOT EXISTS analysis_jobs_pending_subject
        ON analysis_jobs (subject_id)
        WHERE status = 'pending'
        "#,
    )
    .execute(pool)
    .await
    .map_err(db_err)?;

    Ok(())
}
