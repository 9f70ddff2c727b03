//! The end-to-end run for one subject: fetch, fan out to the classifiers,
//! finalize, merge-and-store.

use std::sync::Arc;

use anyhow::Result;
use nlp_client::{SentimentClassifier, TopicClassifier};
use pulsecheck_common::AnalysisReport;
use pulsecheck_store::{MergeOutcome, SummaryStore};
use tracing::info;

use crate::aggregator::aggregate;
use crate::source::PostSource;
use crate::stats::finalize;

/// What one run produced. `NoData` covers both an empty fetch and a batch
/// where every post failed classification; no summary is written in either
/// case.
#[derive(Debug)]
pub enum RunOutcome {
    Stored {
        report: AnalysisReport,
        merge: MergeOutcome,
    },
    NoData,
}

/// Per-run counters, reported at the end of each job.
#[derive(Debug, Default)]
pub struct RunStats {
    pub posts_fetched: usize,
    pub posts_scored: i64,
    pub labels_assigned: i64,
}

impl std::fmt::Display for RunStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "posts fetched: {}, scored: {}, labels: {}",
            self.posts_fetched, self.posts_scored, self.labels_assigned
        )
    }
}

pub struct Analyst {
    source: Arc<dyn PostSource>,
    sentiment: Arc<dyn SentimentClassifier>,
    topics: Arc<dyn TopicClassifier>,
    store: SummaryStore,
}

impl Analyst {
    pub fn new(
        source: Arc<dyn PostSource>,
        sentiment: Arc<dyn SentimentClassifier>,
        topics: Arc<dyn TopicClassifier>,
        store: SummaryStore,
    ) -> Self {
        Self {
            source,
            sentiment,
            topics,
            store,
        }
    }

    /// Run the full pipeline for one subject.
    ///
    /// Individual post failures are absorbed upstream; the errors that
    /// surface here (fetch failure, store commit failure) leave no partial
    /// state behind, so the caller retries the whole run. Retrying a run
    /// whose batch was already stored lands in the full-overlap rollback.
    pub async fn run_subject(&self, subject_id: i64) -> Result<RunOutcome> {
        let batch = self.source.fetch_batch(subject_id).await?;
        if batch.is_empty() {
            info!(subject_id, "No posts fetched, nothing to analyze");
            return Ok(RunOutcome::NoData);
        }

        let mut stats = RunStats {
            posts_fetched: batch.units.len(),
            ..Default::default()
        };

        let Some(state) =
            aggregate(batch.units, self.sentiment.clone(), self.topics.clone()).await
        else {
            info!(subject_id, "No posts survived classification, nothing to analyze");
            return Ok(RunOutcome::NoData);
        };
        stats.posts_scored = state.scores.len() as i64;
        stats.labels_assigned = state.topics.len() as i64;

        // aggregate() returning Some guarantees a non-empty score set, so
        // the finalizer cannot report empty here.
        let Some(report) = finalize(state, batch.meta) else {
            return Ok(RunOutcome::NoData);
        };

        let merge = self.store.merge_and_store(&report.summary).await?;

        info!(
            subject_id,
            mean = report.mean,
            median = report.median,
            ?merge,
            %stats,
            "Subject run complete"
        );

        Ok(RunOutcome::Stored { report, merge })
    }
}
