use thiserror::Error;

#[derive(Error, Debug)]
pub enum PulseCheckError {
    #[error("Database error: {0}")]
    Database(String),

    /// The caller handed over data that violates a store contract. Nothing
    /// was written.
    #[error("Invalid summary: {0}")]
    InvalidSummary(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}
