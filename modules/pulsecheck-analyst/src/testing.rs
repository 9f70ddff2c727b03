//! In-memory doubles for the remote boundaries, used by unit and
//! integration tests.

use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use nlp_client::{NlpError, SentimentClassifier, TopicClassifier};
use pulsecheck_common::{BatchMeta, TextUnit};

use crate::source::{Batch, PostSource};

// --- Classifier doubles ---

/// Scores known texts from a fixed table; unknown texts fail like a remote
/// error would.
pub struct StaticSentiment {
    scores: HashMap<String, f64>,
}

impl StaticSentiment {
    pub fn scoring(entries: &[(&str, f64)]) -> Self {
        Self {
            scores: entries
                .iter()
                .map(|(t, s)| (t.to_string(), *s))
                .collect(),
        }
    }
}

#[async_trait]
impl SentimentClassifier for StaticSentiment {
    async fn analyze_sentiment(&self, text: &str) -> nlp_client::Result<f64> {
        self.scores.get(text).copied().ok_or(NlpError::Api {
            status: 429,
            message: "rate limited".to_string(),
        })
    }
}

/// Labels known texts from a fixed table; unknown texts fail.
pub struct StaticTopics {
    labels: HashMap<String, Vec<String>>,
}

impl StaticTopics {
    pub fn labeling(entries: &[(&str, &[&str])]) -> Self {
        Self {
            labels: entries
                .iter()
                .map(|(t, ls)| (t.to_string(), ls.iter().map(|l| l.to_string()).collect()))
                .collect(),
        }
    }
}

#[async_trait]
impl TopicClassifier for StaticTopics {
    async fn classify_topics(&self, text: &str) -> nlp_client::Result<Vec<String>> {
        self.labels.get(text).cloned().ok_or(NlpError::Api {
            status: 429,
            message: "rate limited".to_string(),
        })
    }
}

/// Every call fails.
pub struct FailingSentiment;

#[async_trait]
impl SentimentClassifier for FailingSentiment {
    async fn analyze_sentiment(&self, _text: &str) -> nlp_client::Result<f64> {
        Err(NlpError::Network("connection reset".to_string()))
    }
}

pub struct FailingTopics;

#[async_trait]
impl TopicClassifier for FailingTopics {
    async fn classify_topics(&self, _text: &str) -> nlp_client::Result<Vec<String>> {
        Err(NlpError::Network("connection reset".to_string()))
    }
}

// --- Source double ---

/// Serves a canned batch per subject.
pub struct FixtureSource {
    batches: HashMap<i64, Batch>,
    handles: HashMap<String, i64>,
}

impl FixtureSource {
    pub fn new() -> Self {
        Self {
            batches: HashMap::new(),
            handles: HashMap::new(),
        }
    }

    pub fn with_subject(mut self, handle: &str, subject_id: i64, posts: &[(i64, &str)]) -> Self {
        self.handles.insert(handle.to_string(), subject_id);

        let units: Vec<TextUnit> = posts
            .iter()
            .map(|(id, text)| TextUnit {
                id: *id,
                text: text.to_string(),
            })
            .collect();
        let earliest_id = units.iter().map(|u| u.id).min().unwrap_or(0);
        let latest_id = units.iter().map(|u| u.id).max().unwrap_or(0);

        self.batches.insert(
            subject_id,
            Batch {
                meta: BatchMeta {
                    subject_id,
                    earliest_id,
                    latest_id,
                },
                units,
            },
        );
        self
    }
}

impl Default for FixtureSource {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PostSource for FixtureSource {
    async fn resolve(&self, handle: &str) -> Result<i64> {
        self.handles
            .get(handle)
            .copied()
            .ok_or_else(|| anyhow::anyhow!("no subject found for handle: {handle}"))
    }

    async fn fetch_batch(&self, subject_id: i64) -> Result<Batch> {
        Ok(self
            .batches
            .get(&subject_id)
            .cloned()
            .unwrap_or(Batch {
                meta: BatchMeta {
                    subject_id,
                    earliest_id: 0,
                    latest_id: 0,
                },
                units: vec![],
            }))
    }
}
