//! The fetch-source boundary: anything that can resolve a handle and yield
//! a bounded batch of posts plus its covered id range.

use anyhow::Result;
use async_trait::async_trait;
use feed_client::FeedClient;
use pulsecheck_common::{BatchMeta, TextUnit};

/// A bounded batch of posts for one subject. `meta` covers the inclusive
/// id range of `units`; when `units` is empty the range is meaningless and
/// the batch is a no-op upstream.
#[derive(Debug, Clone)]
pub struct Batch {
    pub meta: BatchMeta,
    pub units: Vec<TextUnit>,
}

impl Batch {
    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }
}

#[async_trait]
pub trait PostSource: Send + Sync {
    /// Resolve a handle to a subject id.
    async fn resolve(&self, handle: &str) -> Result<i64>;

    /// Fetch the subject's recent posts. A truncated batch (remote rate
    /// limit) is returned like a complete one; an empty batch is valid.
    async fn fetch_batch(&self, subject_id: i64) -> Result<Batch>;
}

/// Production source backed by the feed API.
pub struct FeedSource {
    client: FeedClient,
}

impl FeedSource {
    pub fn new(client: FeedClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PostSource for FeedSource {
    async fn resolve(&self, handle: &str) -> Result<i64> {
        let subject = self.client.resolve_subject(handle).await?;
        Ok(subject.id)
    }

    async fn fetch_batch(&self, subject_id: i64) -> Result<Batch> {
        let timeline = self.client.fetch_timeline(subject_id).await?;

        let units: Vec<TextUnit> = timeline
            .posts
            .into_iter()
            .map(|p| TextUnit {
                id: p.id,
                text: p.text,
            })
            .collect();

        Ok(Batch {
            meta: BatchMeta {
                subject_id,
                earliest_id: timeline.earliest_id,
                latest_id: timeline.latest_id,
            },
            units,
        })
    }
}
