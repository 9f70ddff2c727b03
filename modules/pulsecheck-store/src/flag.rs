//! The change-flag record: a singleton row meaning "new data exists since
//! the last consumer check". Written under the store's own atomicity so
//! multiple pipeline processes can race on it safely.

use pulsecheck_common::PulseCheckError;
use sqlx::PgPool;

use crate::db_err;

#[derive(Clone)]
pub struct ChangeFlag {
    pool: PgPool,
}

impl ChangeFlag {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Mark that new data exists. Called after a successful summary commit.
    pub async fn set(&self) -> Result<(), PulseCheckError> {
        sqlx::query("UPDATE change_flag SET changes_made = true WHERE id = 1")
            .execute(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    /// Read the flag without clearing it.
    pub async fn get(&self) -> Result<bool, PulseCheckError> {
        let row: (bool,) = sqlx::query_as("SELECT changes_made FROM change_flag WHERE id = 1")
            .fetch_one(&self.pool)
            .await
            .map_err(db_err)?;
        Ok(row.0)
    }

    /// Consumer side: atomically read the flag and clear it if set.
    /// Returns true exactly once per set, however many consumers race.
    pub async fn check_and_clear(&self) -> Result<bool, PulseCheckError> {
        let mut tx = self.pool.begin().await.map_err(db_err)?;

        let row: (bool,) =
            sqlx::query_as("SELECT changes_made FROM change_flag WHERE id = 1 FOR UPDATE")
                .fetch_one(&mut *tx)
                .await
                .map_err(db_err)?;

        if !row.0 {
            tx.rollback().await.map_err(db_err)?;
            return Ok(false);
        }

        sqlx::query("UPDATE change_flag SET changes_made = false WHERE id = 1")
            .execute(&mut *tx)
            .await
            .map_err(db_err)?;
        tx.commit().await.map_err(db_err)?;

        Ok(true)
    }
}
