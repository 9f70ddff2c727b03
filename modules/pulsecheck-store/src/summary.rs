//! SummaryStore — the merge-and-store transaction.
//!
//! One subject, one row. The transactional read-decide-write on that row is
//! the only serialization point between concurrent pipeline runs for the
//! same subject; runs for different subjects never contend.

use pulsecheck_common::{AnalysedSummary, BatchMeta, PulseCheckError, TopicCount};
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db_err;
use crate::flag::ChangeFlag;

// ---------------------------------------------------------------------------
// Merge decision (pure)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub enum MergeDecision {
    /// No stored summary for this subject; the fresh one is written as-is.
    Insert,
    /// Partial or no overlap: write the combined summary.
    Merge(AnalysedSummary),
    /// The stored range already fully contains the fresh range — the batch
    /// was processed before. Nothing is written.
    AlreadyCovered,
}

/// Decide what the transaction should do given the stored summary (if any)
/// and a freshly finalized one.
///
/// A partially overlapping range merges by plain count summation; the fetch
/// side always reads newest-first from the head of the feed, so a partial
/// overlap only ever extends the covered range. Re-fetches of an
/// already-covered window land in `AlreadyCovered` and are dropped, which is
/// what makes redelivered work items safe.
pub fn decide_merge(existing: Option<&AnalysedSummary>, fresh: &AnalysedSummary) -> MergeDecision {
    match existing {
        None => MergeDecision::Insert,
        Some(stored) if stored.meta.contains(&fresh.meta) => MergeDecision::AlreadyCovered,
        Some(stored) => MergeDecision::Merge(merge_summaries(stored, fresh)),
    }
}

/// Combine two summaries: union of ranges, summed counts, summed topic
/// tallies, and the average recomputed from the summed counts.
pub fn merge_summaries(stored: &AnalysedSummary, fresh: &AnalysedSummary) -> AnalysedSummary {
    let positive = stored.positive + fresh.positive;
    let negative = stored.negative + fresh.negative;
    let neutral = stored.neutral + fresh.neutral;

    let mut topics: Vec<TopicCount> = stored.topics.clone();
    for t in &fresh.topics {
        match topics.iter_mut().find(|s| s.topic == t.topic) {
            Some(slot) => slot.count += t.count,
            None => topics.push(t.clone()),
        }
    }
    topics.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.topic.cmp(&b.topic)));

    AnalysedSummary {
        meta: stored.meta.union(&fresh.meta),
        positive,
        negative,
        neutral,
        average_score: AnalysedSummary::recompute_average(positive, negative),
        topics,
    }
}

// ---------------------------------------------------------------------------
// Outcome
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergeOutcome {
    Inserted,
    Merged,
    /// Rolled back: the batch was already covered by the stored summary.
    AlreadyCovered,
}

// ---------------------------------------------------------------------------
// SummaryStore
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SummaryStore {
    pool: PgPool,
}

impl SummaryStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Read the stored summary for a subject, if any.
    pub async fn get(&self, subject_id: i64) -> Result<Option<AnalysedSummary>, PulseCheckError> {
        let row = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT subject_id, earliest_id, latest_id, positive, negative, neutral,
                   average_score, topics
            FROM summaries
            WHERE subject_id = $1
            "#,
        )
        .bind(subject_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(db_err)?;

        row.map(SummaryRow::into_summary).transpose()
    }

    /// Atomically merge a freshly finalized summary with whatever is stored
    /// for the subject and persist the result.
    ///
    /// The whole read-decide-write runs in one transaction with the subject
    /// row locked. On `AlreadyCovered` the transaction rolls back and the
    /// stored state is untouched. A commit failure surfaces to the caller
    /// with nothing made visible; retrying the whole call is safe.
    ///
    /// The change flag is set only after a successful commit, as a separate
    /// best-effort write — the flag is a freshness hint, not part of the
    /// committed state.
    pub async fn merge_and_store(
        &self,
        fresh: &AnalysedSummary,
    ) -> Result<MergeOutcome, PulseCheckError> {
        // The pipeline reports empty runs as NoData before reaching the
        // store; a zero-unit summary must never be committed.
        if fresh.contributing() == 0 {
            return Err(PulseCheckError::InvalidSummary(
                "zero contributing posts".to_string(),
            ));
        }

        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let existing = sqlx::query_as::<_, SummaryRow>(
            r#"
            SELECT subject_id, earliest_id, latest_id, positive, negative, neutral,
                   average_score, topics
            FROM summaries
            WHERE subject_id = $1
            FOR UPDATE
            "#,
        )
        .bind(fresh.meta.subject_id)
        .fetch_optional(&mut *tx)
        .await
        .map_err(db_err)?
        .map(SummaryRow::into_summary)
        .transpose()?;

        let (entity, outcome) = match decide_merge(existing.as_ref(), fresh) {
            MergeDecision::Insert => (fresh.clone(), MergeOutcome::Inserted),
            MergeDecision::Merge(merged) => (merged, MergeOutcome::Merged),
            MergeDecision::AlreadyCovered => {
                tx.rollback().await.map_err(db_err)?;
                info!(
                    subject_id = fresh.meta.subject_id,
                    earliest = fresh.meta.earliest_id,
                    latest = fresh.meta.latest_id,
                    "Batch already covered by stored summary, dropped"
                );
                return Ok(MergeOutcome::AlreadyCovered);
            }
        };

        upsert(&mut tx, &entity).await?;
        tx.commit().await.map_err(db_err)?;

        info!(
            subject_id = entity.meta.subject_id,
            earliest = entity.meta.earliest_id,
            latest = entity.meta.latest_id,
            contributing = entity.contributing(),
            ?outcome,
            "Summary committed"
        );

        // Best-effort freshness nudge. Failure is logged, never rolled back.
        if let Err(err) = ChangeFlag::new(self.pool.clone()).set().await {
            warn!(error = %err, "Change flag update failed (non-fatal)");
        }

        Ok(outcome)
    }
}

async fn upsert(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    summary: &AnalysedSummary,
) -> Result<(), PulseCheckError> {
    let topics = serde_json::to_value(&summary.topics)
        .map_err(|e| PulseCheckError::Database(e.to_string()))?;

    sqlx::query(
        r#"
        INSERT INTO summaries (subject_id, earliest_id, latest_id, positive, negative,
                               neutral, average_score, topics, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, now())
        ON CONFLICT (subject_id) DO UPDATE SET
            earliest_id   = EXCLUDED.earliest_id,
            latest_id     = EXCLUDED.latest_id,
            positive      = EXCLUDED.positive,
            negative      = EXCLUDED.negative,
            neutral       = EXCLUDED.neutral,
            average_score = EXCLUDED.average_score,
            topics        = EXCLUDED.topics,
            updated_at    = now()
        "#,
    )
    .bind(summary.meta.subject_id)
    .bind(summary.meta.earliest_id)
    .bind(summary.meta.latest_id)
    .bind(summary.positive)
    .bind(summary.negative)
    .bind(summary.neutral)
    .bind(summary.average_score)
    .bind(topics)
    .execute(&mut **tx)
    .await
    .map_err(db_err)?;

    Ok(())
}

// ---------------------------------------------------------------------------
// Row mapping
// ---------------------------------------------------------------------------

struct SummaryRow {
    subject_id: i64,
    earliest_id: i64,
    latest_id: i64,
    positive: i64,
    negative: i64,
    neutral: i64,
    average_score: f64,
    topics: serde_json::Value,
}

impl SummaryRow {
    fn into_summary(self) -> Result<AnalysedSummary, PulseCheckError> {
        let topics: Vec<TopicCount> = serde_json::from_value(self.topics)
            .map_err(|e| PulseCheckError::Database(format!("bad topics column: {e}")))?;

        Ok(AnalysedSummary {
            meta: BatchMeta {
                subject_id: self.subject_id,
                earliest_id: self.earliest_id,
                latest_id: self.latest_id,
            },
            positive: self.positive,
            negative: self.negative,
            neutral: self.neutral,
            average_score: self.average_score,
            topics,
        })
    }
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for SummaryRow {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> std::result::Result<Self, sqlx::Error> {
        use sqlx::Row;
        Ok(SummaryRow {
            subject_id: row.try_get("subject_id")?,
            earliest_id: row.try_get("earliest_id")?,
            latest_id: row.try_get("latest_id")?,
            positive: row.try_get("positive")?,
            negative: row.try_get("negative")?,
            neutral: row.try_get("neutral")?,
            average_score: row.try_get("average_score")?,
            topics: row.try_get("topics")?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests (pure merge logic — no database needed)
// ---------------------------------------------------------------------------
