//! The statistics finalizer: turns a completed aggregate into the per-run
//! report. A fixed pipeline — sort, count, median, mean, collapse, bucket,
//! tally — where the order matters for the derived values.

use std::collections::HashMap;

use pulsecheck_common::{
    AnalysedSummary, AnalysisReport, BatchMeta, ScoreCount, ScoreDist, SentimentBucket,
    TopicCount,
};

use crate::aggregator::AggregateState;

/// Bucket thresholds. The single source of truth for the discrete
/// negative/neutral/positive encoding; scores are stored continuous and
/// bucketed here.
pub const NEGATIVE_THRESHOLD: f64 = -0.5;
pub const POSITIVE_THRESHOLD: f64 = 0.5;

/// Pure 3-way bucketing: `score <= -0.5` negative, `score >= 0.5` positive,
/// everything between neutral.
pub fn bucket_score(score: f64) -> SentimentBucket {
    if score <= NEGATIVE_THRESHOLD {
        SentimentBucket::Negative
    } else if score >= POSITIVE_THRESHOLD {
        SentimentBucket::Positive
    } else {
        SentimentBucket::Neutral
    }
}

/// Finalize a completed aggregate into the run report.
///
/// Returns `None` for an empty aggregate (zero scored posts) — the distinct
/// nothing-to-analyze outcome, surfaced before any division happens.
pub fn finalize(state: AggregateState, meta: BatchMeta) -> Option<AnalysisReport> {
    if state.scores.is_empty() {
        return None;
    }

    // 1. Sort raw per-post scores ascending. Only the sorted multiset
    //    matters from here on.
    let mut raw = state.scores;
    raw.sort_by(|a, b| a.score.total_cmp(&b.score));

    // 2-3. Count and median.
    let count = raw.len() as i64;
    let mid = raw.len() / 2;
    let median = if raw.len() % 2 == 0 {
        (raw[mid - 1].score + raw[mid].score) / 2.0
    } else {
        raw[mid].score
    };

    // 4. Mean from the running sum.
    let mean = state.score_sum / count as f64;

    // 5. Collapse duplicate scores into (score, count) pairs. Grouping runs
    //    of the already-sorted list keeps the result ascending.
    let mut scores: Vec<ScoreCount> = Vec::new();
    for sc in raw {
        match scores.last_mut() {
            Some(last) if last.score == sc.score => last.count += sc.count,
            _ => scores.push(sc),
        }
    }

    // 6. Bucket totals, weighted by each distinct score's count.
    let mut dist = ScoreDist::default();
    for sc in &scores {
        match bucket_score(sc.score) {
            SentimentBucket::Negative => dist.negative += sc.count,
            SentimentBucket::Neutral => dist.neutral += sc.count,
            SentimentBucket::Positive => dist.positive += sc.count,
        }
    }

    // 7. Collapse topic labels, most common first. Tie order between equal
    //    counts is not defined.
    let mut tally: HashMap<String, i64> = HashMap::new();
    for tc in state.topics {
        *tally.entry(tc.topic).or_insert(0) += tc.count;
    }
    let mut topics: Vec<TopicCount> = tally
        .into_iter()
        .map(|(topic, count)| TopicCount { topic, count })
        .collect();
    topics.sort_by(|a, b| b.count.cmp(&a.count));

    let summary = AnalysedSummary {
        meta,
        positive: dist.positive,
        negative: dist.negative,
        neutral: dist.neutral,
        average_score: AnalysedSummary::recompute_average(dist.positive, dist.negative),
        topics,
    };

    Some(AnalysisReport {
        summary,
        count,
        mean,
        median,
        scores,
        dist,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta() -> BatchMeta {
        BatchMeta {
            subject_id: 1,
            earliest_id: 100,
            latest_id: 200,
        }
    }

    fn state(scores: &[f64], topics: &[&str]) -> AggregateState {
        AggregateState {
            score_sum: scores.iter().sum(),
            scores: scores
                .iter()
                .map(|&score| ScoreCount { score, count: 1 })
                .collect(),
            topics: topics
                .iter()
                .map(|&t| TopicCount {
                    topic: t.to_string(),
                    count: 1,
                })
                .collect(),
        }
    }

    #[test]
    fn empty_aggregate_is_none() {
        assert!(finalize(state(&[], &[]), meta()).is_none());
    }

    #[test]
    fn median_odd_count() {
        let report = finalize(state(&[1.0, -1.0, 0.0], &[]), meta()).unwrap();
        assert_eq!(report.median, 0.0);
    }

    #[test]
    fn median_even_count() {
        let report = finalize(state(&[1.0, 0.0], &[]), meta()).unwrap();
        assert_eq!(report.median, 0.5);
    }

    #[test]
    fn mean_is_arithmetic_average() {
        let report = finalize(state(&[0.2, 0.4, 0.9], &[]), meta()).unwrap();
        assert!((report.mean - 0.5).abs() < 1e-9);
        assert_eq!(report.count, 3);
    }

    #[test]
    fn mean_and_median_are_order_independent() {
        let a = finalize(state(&[0.9, -0.3, 0.1, -0.9], &[]), meta()).unwrap();
        let b = finalize(state(&[-0.9, 0.1, -0.3, 0.9], &[]), meta()).unwrap();
        assert_eq!(a.mean, b.mean);
        assert_eq!(a.median, b.median);
        assert_eq!(a.scores, b.scores);
        assert_eq!(a.dist, b.dist);
    }

    #[test]
    fn duplicate_scores_collapse_sorted_ascending() {
        let report = finalize(state(&[0.5, -0.5, 0.5, 0.0, -0.5], &[]), meta()).unwrap();
        assert_eq!(
            report.scores,
            vec![
                ScoreCount { score: -0.5, count: 2 },
                ScoreCount { score: 0.0, count: 1 },
                ScoreCount { score: 0.5, count: 2 },
            ]
        );
        // Collapsing loses no posts
        assert_eq!(report.count, 5);
    }

    #[test]
    fn bucket_thresholds_are_inclusive() {
        assert_eq!(bucket_score(-0.5), SentimentBucket::Negative);
        assert_eq!(bucket_score(0.5), SentimentBucket::Positive);
        assert_eq!(bucket_score(0.0), SentimentBucket::Neutral);
    }

    #[test]
    fn distribution_weighted_by_count() {
        let report =
            finalize(state(&[-0.9, -0.5, 0.0, 0.5, 0.9], &[]), meta()).unwrap();
        assert_eq!(report.dist.negative, 2);
        assert_eq!(report.dist.neutral, 1);
        assert_eq!(report.dist.positive, 2);
        // pos + neg never exceeds contributing posts
        assert!(report.dist.positive + report.dist.negative <= report.count);
    }

    #[test]
    fn topics_tallied_most_common_first() {
        let report = finalize(
            state(&[0.1], &["/News", "/Sports", "/News", "/News", "/Sports", "/Music"]),
            meta(),
        )
        .unwrap();
        assert_eq!(report.summary.topics[0], TopicCount { topic: "/News".into(), count: 3 });
        assert_eq!(report.summary.topics[1], TopicCount { topic: "/Sports".into(), count: 2 });
        assert_eq!(report.summary.topics[2], TopicCount { topic: "/Music".into(), count: 1 });
    }

    #[test]
    fn summary_average_from_bucket_counts() {
        let report = finalize(state(&[0.9, 0.8, -0.7, 0.0], &[]), meta()).unwrap();
        assert_eq!(report.summary.positive, 2);
        assert_eq!(report.summary.negative, 1);
        assert_eq!(report.summary.neutral, 1);
        assert!((report.summary.average_score - 1.0 / 3.0).abs() < 1e-9);
    }
}
