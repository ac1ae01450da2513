use thiserror::Error;

/// PostgreSQL error codes that mean "retry the whole transaction"
const SERIALIZATION_FAILURE: &str = "40001";
const DEADLOCK_DETECTED: &str = "40P01";
const UNIQUE_VIOLATION: &str = "23505";

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(sqlx::Error),

    /// Unique violation, serialization failure or deadlock
    #[error("Conflicting concurrent write: {0}")]
    Conflict(String),

    /// A row could not be mapped back into a domain value
    #[error("Corrupt row: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Conflict(_))
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err
            && let Some(code) = db_err.code()
            && matches!(
                code.as_ref(),
                SERIALIZATION_FAILURE | DEADLOCK_DETECTED | UNIQUE_VIOLATION
            )
        {
            return StoreError::Conflict(db_err.message().to_string());
        }
        StoreError::Database(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_row_not_found_is_not_conflict() {
        let err = StoreError::from(sqlx::Error::RowNotFound);
        assert!(!err.is_conflict());
        assert!(matches!(err, StoreError::Database(_)));
    }

    #[test]
    fn test_conflict_display() {
        let err = StoreError::Conflict("duplicate key".into());
        assert!(err.is_conflict());
        assert_eq!(err.to_string(), "Conflicting concurrent write: duplicate key");
    }
}
