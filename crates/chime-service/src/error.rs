use thiserror::Error;

/// Service layer errors - combines all error types
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error(transparent)]
    DatabaseError(#[from] chime_db::error::DbError),

    #[error("Recurrence rule error: {0}")]
    RecurrenceError(String),

    #[error("Chat host error: {0}")]
    HostError(String),

    #[error("Not found: {0}")]
    NotFound(String),
}

pub type ServiceResult<T> = std::result::Result<T, ServiceError>;
