use thiserror::Error;

/// Errors that can occur during repository operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RepositoryError {
    #[error("{entity_type} not found: {id}")]
    NotFound {
        entity_type: &'static str,
        id: String,
    },
    #[error("{entity_type} already exists: {id}")]
    AlreadyExists {
        entity_type: &'static str,
        id: String,
    },
    /// A conditional write was rejected, e.g. decrementing a counter at zero.
    #[error("Condition failed on {entity_type} {id}: {condition}")]
    ConditionFailed {
        entity_type: &'static str,
        id: String,
        condition: String,
    },
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Query failed: {0}")]
    QueryFailed(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

impl RepositoryError {
    pub fn not_found(entity_type: &'static str, id: impl Into<String>) -> Self {
        RepositoryError::NotFound {
            entity_type,
            id: id.into(),
        }
    }

    pub fn already_exists(entity_type: &'static str, id: impl Into<String>) -> Self {
        RepositoryError::AlreadyExists {
            entity_type,
            id: id.into(),
        }
    }

    pub fn condition_failed(
        entity_type: &'static str,
        id: impl Into<String>,
        condition: impl Into<String>,
    ) -> Self {
        RepositoryError::ConditionFailed {
            entity_type,
            id: id.into(),
            condition: condition.into(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, RepositoryError::NotFound { .. })
    }

    pub fn is_already_exists(&self) -> bool {
        matches!(self, RepositoryError::AlreadyExists { .. })
    }
}

/// Result type for repository operations.
pub type Result<T> = std::result::Result<T, RepositoryError>;
