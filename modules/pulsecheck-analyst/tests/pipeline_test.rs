//! End-to-end pipeline tests against in-memory doubles. The persistence
//! step has its own suite in pulsecheck-store; these cover fetch → fan-out →
//! fan-in → finalize.

use std::sync::Arc;

use pulsecheck_analyst::aggregate;
use pulsecheck_analyst::source::PostSource;
use pulsecheck_analyst::stats::finalize;
use pulsecheck_analyst::testing::{FixtureSource, StaticSentiment, StaticTopics};
use pulsecheck_common::{TextUnit, TopicCount};

fn classifier_tables() -> (Arc<StaticSentiment>, Arc<StaticTopics>) {
    let sentiment = Arc::new(StaticSentiment::scoring(&[
        ("loved the show", 0.9),
        ("terrible service", -0.8),
        ("it was fine", 0.1),
        ("worst day ever", -0.9),
        ("great news", 0.7),
    ]));
    let topics = Arc::new(StaticTopics::labeling(&[
        ("loved the show", &["/Arts & Entertainment"]),
        ("terrible service", &["/Business"]),
        ("it was fine", &[]),
        ("worst day ever", &["/Life"]),
        ("great news", &["/News", "/Life"]),
    ]));
    (sentiment, topics)
}

fn units(texts: &[&str]) -> Vec<TextUnit> {
    texts
        .iter()
        .enumerate()
        .map(|(i, t)| TextUnit {
            id: 1000 + i as i64,
            text: t.to_string(),
        })
        .collect()
}

#[tokio::test]
async fn fetch_through_finalize_produces_report() {
    let source = FixtureSource::new().with_subject(
        "jane",
        7,
        &[
            (101, "loved the show"),
            (102, "terrible service"),
            (103, "it was fine"),
        ],
    );
    let (sentiment, topics) = classifier_tables();

    let subject_id = source.resolve("jane").await.unwrap();
    let batch = source.fetch_batch(subject_id).await.unwrap();
    assert_eq!(batch.meta.earliest_id, 101);
    assert_eq!(batch.meta.latest_id, 103);

    let state = aggregate(batch.units, sentiment, topics).await.unwrap();
    let report = finalize(state, batch.meta).unwrap();

    assert_eq!(report.count, 3);
    assert_eq!(report.median, 0.1);
    assert!((report.mean - 0.2 / 3.0).abs() < 1e-9);
    assert_eq!(report.summary.positive, 1);
    assert_eq!(report.summary.negative, 1);
    assert_eq!(report.summary.neutral, 1);
    assert_eq!(report.summary.meta, batch.meta);
}

#[tokio::test]
async fn shuffled_input_order_changes_nothing() {
    let (sentiment, topics) = classifier_tables();
    let texts = [
        "loved the show",
        "terrible service",
        "it was fine",
        "worst day ever",
        "great news",
    ];
    let mut reversed = texts;
    reversed.reverse();

    let meta = pulsecheck_common::BatchMeta {
        subject_id: 1,
        earliest_id: 1000,
        latest_id: 1004,
    };

    let a = finalize(
        aggregate(units(&texts), sentiment.clone(), topics.clone())
            .await
            .unwrap(),
        meta,
    )
    .unwrap();
    let b = finalize(
        aggregate(units(&reversed), sentiment, topics).await.unwrap(),
        meta,
    )
    .unwrap();

    assert_eq!(a.mean, b.mean);
    assert_eq!(a.median, b.median);
    assert_eq!(a.scores, b.scores);
    assert_eq!(a.dist, b.dist);
    assert_eq!(a.summary.positive, b.summary.positive);
    assert_eq!(a.summary.negative, b.summary.negative);

    // Topic tallies match as sets; tie order between equal counts is not
    // defined.
    let sort = |mut ts: Vec<TopicCount>| {
        ts.sort_by(|x, y| x.topic.cmp(&y.topic));
        ts
    };
    assert_eq!(sort(a.summary.topics), sort(b.summary.topics));
}

#[tokio::test]
async fn unknown_subject_yields_empty_batch() {
    let source = FixtureSource::new();
    let batch = source.fetch_batch(999).await.unwrap();
    assert!(batch.is_empty());
}

#[tokio::test]
async fn unknown_handle_fails_resolution() {
    let source = FixtureSource::new();
    assert!(source.resolve("nobody").await.is_err());
}
