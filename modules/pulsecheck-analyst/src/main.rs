use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use feed_client::FeedClient;
use nlp_client::NlpClient;
use pulsecheck_analyst::{Analyst, FeedSource, RunOutcome};
use pulsecheck_common::Config;
use pulsecheck_store::{migrate, SummaryStore, WorkQueue};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("pulsecheck=info")),
        )
        .init();

    info!("PulseCheck analyst starting...");

    let config = Config::worker_from_env();

    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(8)
        .connect(&config.database_url)
        .await?;
    migrate(&pool).await?;
    info!("Connected to database, schema ready");

    let nlp = Arc::new(NlpClient::new(&config.nlp_api_key));
    let source = Arc::new(FeedSource::new(FeedClient::new(&config.feed_token)));
    let store = SummaryStore::new(pool.clone());
    let queue = WorkQueue::new(pool);

    let analyst = Analyst::new(source, nlp.clone(), nlp, store);

    let poll_interval = Duration::from_secs(config.poll_interval_secs);
    info!(poll_secs = config.poll_interval_secs, "Entering work loop");

    loop {
        let job = match queue.claim_next().await {
            Ok(job) => job,
            Err(err) => {
                error!(error = %err, "Failed to claim job");
                tokio::time::sleep(poll_interval).await;
                continue;
            }
        };

        let Some(job) = job else {
            tokio::time::sleep(poll_interval).await;
            continue;
        };

        info!(job_id = job.id, subject_id = job.subject_id, handle = ?job.handle, "Claimed job");

        let ack = match analyst.run_subject(job.subject_id).await {
            Ok(RunOutcome::Stored { merge, .. }) => {
                info!(job_id = job.id, ?merge, "Job complete");
                queue.complete(job.id).await
            }
            Ok(RunOutcome::NoData) => {
                // Nothing to analyze is a clean outcome, not a retry.
                info!(job_id = job.id, "Job complete (no data)");
                queue.complete(job.id).await
            }
            Err(err) => {
                // The run left no partial state; hand the job back whole.
                warn!(job_id = job.id, error = %err, "Job failed, releasing for retry");
                queue.release(job.id).await
            }
        };

        // A lost ack means the job stays claimed until an operator
        // intervenes or a redelivery runs it again; either is safe.
        if let Err(err) = ack {
            error!(job_id = job.id, error = %err, "Queue ack failed");
        }
    }
}
