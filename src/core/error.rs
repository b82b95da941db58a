use super::types::EntityId;
use std::fmt;
use thiserror::Error;

/// Store write that was in flight when a flush stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushOperation {
    Insert,
    Update,
    Delete,
}

impl fmt::Display for FlushOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FlushOperation::Insert => write!(f, "INSERT"),
            FlushOperation::Update => write!(f, "UPDATE"),
            FlushOperation::Delete => write!(f, "DELETE"),
        }
    }
}

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Invalid entity state: {0}")]
    InvalidState(String),

    #[error("Entity is not managed by this context: {0}")]
    NotManaged(String),

    #[error("Row {0} not found")]
    NotFound(EntityId),

    #[error("Row {0} already exists")]
    DuplicateKey(EntityId),

    #[error("Flush failed during {operation} of row {id}: {source}")]
    Flush {
        operation: FlushOperation,
        id: EntityId,
        #[source]
        source: Box<DbError>,
    },

    #[error("Column '{0}' not found in table '{1}'")]
    ColumnNotFound(String, String),

    #[error("Type mismatch: {0}")]
    TypeMismatch(String),

    #[error("Constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("Entity instance is already borrowed: {0}")]
    Borrow(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    IoError(String),
}

impl DbError {
    /// Wraps a store failure with the flush step that triggered it.
    pub fn flush(operation: FlushOperation, id: EntityId, source: DbError) -> Self {
        DbError::Flush {
            operation,
            id,
            source: Box::new(source),
        }
    }

    /// The store error underneath a flush failure, or `self` for every other kind.
    pub fn root_cause(&self) -> &DbError {
        match self {
            DbError::Flush { source, .. } => source.root_cause(),
            other => other,
        }
    }
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<std::io::Error> for DbError {
    fn from(err: std::io::Error) -> Self {
        Self::IoError(err.to_string())
    }
}

impl From<std::cell::BorrowError> for DbError {
    fn from(err: std::cell::BorrowError) -> Self {
        Self::Borrow(err.to_string())
    }
}

impl From<std::cell::BorrowMutError> for DbError {
    fn from(err: std::cell::BorrowMutError) -> Self {
        Self::Borrow(err.to_string())
    }
}
