use rocket_db_pools::sqlx;
use thiserror::Error;

pub type StoreResult<T> = Result<T, StoreError>;

/// Failures surfaced by the flashcard data-access layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Connection, pool or transport failure. The cache keeps its last good graph.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),
    /// A statement reached the database and was rejected (constraint violation etc).
    #[error("database error: {0}")]
    Database(sqlx::Error),
    /// The join result broke the non-null stack invariant.
    #[error("malformed join row {row}: {reason}")]
    MalformedRow { row: usize, reason: String },
    #[error("{0}")]
    NotFound(String),
}

impl StoreError {
    pub fn malformed(row: usize, reason: impl Into<String>) -> Self {
        StoreError::MalformedRow {
            row,
            reason: reason.into(),
        }
    }

    pub fn stack_not_found(stack_id: i32) -> Self {
        StoreError::NotFound(format!("Stack {stack_id} not found"))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::Io(_)
            | sqlx::Error::Tls(_)
            | sqlx::Error::PoolTimedOut
            | sqlx::Error::PoolClosed
            | sqlx::Error::WorkerCrashed => StoreError::StorageUnavailable(err.to_string()),
            other => StoreError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pool_failures_map_to_storage_unavailable() {
        let err = StoreError::from(sqlx::Error::PoolTimedOut);
        assert!(matches!(err, StoreError::StorageUnavailable(_)));
    }

    #[test]
    fn statement_failures_map_to_database() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, StoreError::Database(sqlx::Error::RowNotFound)));
    }
}
