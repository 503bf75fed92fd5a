use std::fmt::Display;
use std::time::Duration;

use thiserror::Error;

pub type Result<T> = std::result::Result<T, DynamodbError>;

/// Failures while provisioning the REAL table.
#[derive(Error, Debug)]
pub enum DynamodbError {
    #[error("DynamoDB request failed: {0}")]
    Aws(String),

    #[error("Confirmation prompt failed: {0}")]
    Prompt(#[from] dialoguer::Error),

    #[error("Aborted, no changes applied")]
    Cancelled,

    #[error("Table '{table}' did not become active within {waited:?}")]
    NotActive { table: String, waited: Duration },

    #[error("Table '{table}' has {pending} pending change(s), run `dynamodb deploy`")]
    OutOfDate { table: String, pending: usize },
}

impl DynamodbError {
    /// Wraps an SDK or builder error.
    pub fn aws(err: impl Display) -> Self {
        Self::Aws(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_date_names_the_fix() {
        let err = DynamodbError::OutOfDate {
            table: "real".to_string(),
            pending: 2,
        };
        assert_eq!(
            err.to_string(),
            "Table 'real' has 2 pending change(s), run `dynamodb deploy`"
        );
    }

    #[test]
    fn test_not_active_reports_wait() {
        let err = DynamodbError::NotActive {
            table: "real".to_string(),
            waited: Duration::from_secs(120),
        };
        assert_eq!(
            err.to_string(),
            "Table 'real' did not become active within 120s"
        );
    }
}
