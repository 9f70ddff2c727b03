//! Fan-out/fan-in over the two classification services.
//!
//! Two worker loops push results into their own channels; a fan-in primitive
//! drains both in first-available order until each has signalled closure.
//! Classification calls are high-latency independent I/O — issuing sentiment
//! and topic calls concurrently is what makes a 600-post batch tolerable.

use std::sync::Arc;

use nlp_client::{SentimentClassifier, TopicClassifier};
use pulsecheck_common::{ScoreCount, TextUnit, TopicCount};
use tokio::sync::mpsc;
use tracing::warn;

/// Channel depth matches the feed page size; workers never get far ahead of
/// the collector.
const CHANNEL_CAPACITY: usize = 200;

// ---------------------------------------------------------------------------
// AggregateState
// ---------------------------------------------------------------------------

/// Running aggregate for one pipeline run. Owned exclusively by the
/// collector; never shared across runs.
#[derive(Debug, Default)]
pub struct AggregateState {
    pub score_sum: f64,
    /// One entry per scored post, in arrival order, count 1 each.
    pub scores: Vec<ScoreCount>,
    /// One entry per assigned label, in arrival order, count 1 each.
    pub topics: Vec<TopicCount>,
}

impl AggregateState {
    fn fold(&mut self, item: Collected) {
        match item {
            Collected::Sentiment(score) => {
                self.score_sum += score;
                self.scores.push(ScoreCount { score, count: 1 });
            }
            Collected::Topic(topic) => {
                self.topics.push(TopicCount { topic, count: 1 });
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Fan-in
// ---------------------------------------------------------------------------

/// A result from either classification stream.
#[derive(Debug, Clone, PartialEq)]
pub enum Collected {
    Sentiment(f64),
    Topic(String),
}

/// Merges the two result streams, first-available-wins. Yields until both
/// streams have reported closed; a closed stream stops being polled while
/// the other drains.
struct Fanin {
    sentiment: mpsc::Receiver<f64>,
    topics: mpsc::Receiver<String>,
    sentiment_open: bool,
    topics_open: bool,
}

impl Fanin {
    fn new(sentiment: mpsc::Receiver<f64>, topics: mpsc::Receiver<String>) -> Self {
        Self {
            sentiment,
            topics,
            sentiment_open: true,
            topics_open: true,
        }
    }

    async fn next(&mut self) -> Option<Collected> {
        while self.sentiment_open || self.topics_open {
            tokio::select! {
                msg = self.sentiment.recv(), if self.sentiment_open => match msg {
                    Some(score) => return Some(Collected::Sentiment(score)),
                    None => self.sentiment_open = false,
                },
                msg = self.topics.recv(), if self.topics_open => match msg {
                    Some(topic) => return Some(Collected::Topic(topic)),
                    None => self.topics_open = false,
                },
            }
        }
        None
    }
}

// ---------------------------------------------------------------------------
// Workers
// ---------------------------------------------------------------------------

fn spawn_sentiment_worker(
    units: Vec<TextUnit>,
    classifier: Arc<dyn SentimentClassifier>,
    tx: mpsc::Sender<f64>,
) {
    tokio::spawn(async move {
        for unit in units {
            match classifier.analyze_sentiment(&unit.text).await {
                Ok(score) => {
                    if tx.send(score).await.is_err() {
                        break;
                    }
                }
                // One failed post never aborts the batch.
                Err(err) => {
                    warn!(post_id = unit.id, error = %err, "Sentiment call failed, post skipped")
                }
            }
        }
        // tx drops here, closing the stream.
    });
}

fn spawn_topic_worker(
    units: Vec<TextUnit>,
    classifier: Arc<dyn TopicClassifier>,
    tx: mpsc::Sender<String>,
) {
    tokio::spawn(async move {
        'outer: for unit in units {
            match classifier.classify_topics(&unit.text).await {
                Ok(topics) => {
                    for topic in topics {
                        if tx.send(topic).await.is_err() {
                            break 'outer;
                        }
                    }
                }
                Err(err) => {
                    warn!(post_id = unit.id, error = %err, "Topic call failed, post skipped")
                }
            }
        }
    });
}

// ---------------------------------------------------------------------------
// Aggregate
// ---------------------------------------------------------------------------

/// Fan a batch of posts out to both classifiers and fold the results back
/// into one aggregate. Each worker walks its own copy of the batch; result
/// ordering between the two streams is arbitrary and irrelevant.
///
/// Returns `None` when no post produced a usable sentiment score — empty
/// input and all-units-failed look the same downstream, and neither may
/// manufacture a zero-valued aggregate.
pub async fn aggregate(
    units: Vec<TextUnit>,
    sentiment: Arc<dyn SentimentClassifier>,
    topics: Arc<dyn TopicClassifier>,
) -> Option<AggregateState> {
    if units.is_empty() {
        return None;
    }

    let (s_tx, s_rx) = mpsc::channel(CHANNEL_CAPACITY);
    let (t_tx, t_rx) = mpsc::channel(CHANNEL_CAPACITY);

    spawn_sentiment_worker(units.clone(), sentiment, s_tx);
    spawn_topic_worker(units, topics, t_tx);

    let mut fanin = Fanin::new(s_rx, t_rx);
    let mut state = AggregateState::default();
    while let Some(item) = fanin.next().await {
        state.fold(item);
    }

    if state.scores.is_empty() {
        return None;
    }
    Some(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FailingSentiment, FailingTopics, StaticSentiment, StaticTopics};

    fn units(texts: &[&str]) -> Vec<TextUnit> {
        texts
            .iter()
            .enumerate()
            .map(|(i, t)| TextUnit {
                id: i as i64 + 1,
                text: t.to_string(),
            })
            .collect()
    }

    #[tokio::test]
    async fn collects_results_from_both_streams() {
        let sentiment = Arc::new(StaticSentiment::scoring(&[("good", 0.8), ("bad", -0.6)]));
        let topics = Arc::new(StaticTopics::labeling(&[("good", &["/Life"]), ("bad", &["/Life", "/News"])]));

        let state = aggregate(units(&["good", "bad"]), sentiment, topics)
            .await
            .expect("data collected");

        assert_eq!(state.scores.len(), 2);
        assert_eq!(state.topics.len(), 3);
        assert!((state.score_sum - 0.2).abs() < 1e-9);
    }

    #[tokio::test]
    async fn empty_input_is_no_data() {
        let sentiment = Arc::new(StaticSentiment::scoring(&[]));
        let topics = Arc::new(StaticTopics::labeling(&[]));
        assert!(aggregate(vec![], sentiment, topics).await.is_none());
    }

    #[tokio::test]
    async fn all_sentiment_failures_is_no_data() {
        let sentiment = Arc::new(FailingSentiment);
        let topics = Arc::new(StaticTopics::labeling(&[("x", &["/News"])]));
        assert!(aggregate(units(&["x", "y"]), sentiment, topics).await.is_none());
    }

    #[tokio::test]
    async fn failed_posts_are_skipped_not_fatal() {
        // "mid" is unknown to the classifier and fails; the other two land.
        let sentiment = Arc::new(StaticSentiment::scoring(&[("a", 0.9), ("b", -0.9)]));
        let topics = Arc::new(FailingTopics);

        let state = aggregate(units(&["a", "mid", "b"]), sentiment, topics)
            .await
            .expect("partial data collected");

        assert_eq!(state.scores.len(), 2);
        assert!(state.topics.is_empty());
    }
}
