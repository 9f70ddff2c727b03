use serde::{Deserialize, Serialize};

// --- Text units ---

/// One piece of analyzable content: opaque text plus the ordinal post id
/// used for range tracking. Immutable once read.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TextUnit {
    pub id: i64,
    pub text: String,
}

// --- Batch metadata ---

/// Identifies which slice of a subject's feed a batch or stored summary
/// covers: the subject plus the inclusive [earliest, latest] post-id range.
///
/// Shared by composition between the in-flight batch, the run report and the
/// persisted summary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchMeta {
    pub subject_id: i64,
    pub earliest_id: i64,
    pub latest_id: i64,
}

impl BatchMeta {
    /// True when `other`'s range lies entirely inside this one. A fully
    /// contained batch carries no data the stored summary hasn't already
    /// incorporated.
    pub fn contains(&self, other: &BatchMeta) -> bool {
        self.earliest_id <= other.earliest_id && self.latest_id >= other.latest_id
    }

    /// The smallest range covering both.
    pub fn union(&self, other: &BatchMeta) -> BatchMeta {
        BatchMeta {
            subject_id: self.subject_id,
            earliest_id: self.earliest_id.min(other.earliest_id),
            latest_id: self.latest_id.max(other.latest_id),
        }
    }
}

// --- Per-run value types ---

/// A distinct sentiment score and how many posts produced it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreCount {
    pub score: f64,
    pub count: i64,
}

/// A topic label and how many times it was assigned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCount {
    pub topic: String,
    pub count: i64,
}

/// Discrete reading of a continuous score. Derived at read time; the
/// continuous score stays the stored representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SentimentBucket {
    Negative,
    Neutral,
    Positive,
}

/// Post counts per sentiment bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreDist {
    pub negative: i64,
    pub neutral: i64,
    pub positive: i64,
}

// --- Persisted summary ---

/// The per-subject analysis record as stored. Only additive fields survive
/// here: counts and the topic tally merge across runs by summation, and
/// `average_score` is always recomputed from the summed bucket counts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysedSummary {
    pub meta: BatchMeta,
    pub positive: i64,
    pub negative: i64,
    pub neutral: i64,
    pub average_score: f64,
    pub topics: Vec<TopicCount>,
}

impl AnalysedSummary {
    /// Total posts that contributed to this summary.
    pub fn contributing(&self) -> i64 {
        self.positive + self.negative + self.neutral
    }

    /// The derived average from bucket counts: (positive - negative) over
    /// all scored posts. Never cached across merges.
    pub fn recompute_average(positive: i64, negative: i64) -> f64 {
        let total = positive + negative;
        if total == 0 {
            0.0
        } else {
            (positive - negative) as f64 / total as f64
        }
    }
}

// --- Run report ---

/// Everything one pipeline run learned, including the non-additive derived
/// values (mean, median, per-score distribution) that are reported but not
/// merged into storage.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub summary: AnalysedSummary,
    pub count: i64,
    pub mean: f64,
    pub median: f64,
    pub scores: Vec<ScoreCount>,
    pub dist: ScoreDist,
}
