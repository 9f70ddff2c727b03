//! Postgres persistence for pulsecheck: per-subject summaries with the
//! transactional merge-and-store operation, the change-flag record, and the
//! at-least-once analysis work queue.

pub mod flag;
pub mod queue;
pub mod schema;
pub mod summary;

pub use flag::ChangeFlag;
pub use queue::{Job, WorkQueue};
pub use schema::migrate;
pub use summary::{decide_merge, merge_summaries, MergeDecision, MergeOutcome, SummaryStore};

use pulsecheck_common::PulseCheckError;

pub(crate) fn db_err(err: sqlx::Error) -> PulseCheckError {
    PulseCheckError::Database(err.to_string())
}
