use thiserror::Error;

/// Database layer errors
#[derive(Error, Debug)]
pub enum DbError {
    #[error("Database error: {0}")]
    DatabaseError(#[from] diesel::result::Error),

    #[error("Pool error: {0}")]
    PoolError(#[from] diesel_async::pooled_connection::bb8::RunError),

    #[error("Row decode error for event {event_id}: {reason}")]
    RowDecodeError { event_id: String, reason: String },
}

pub type DbResult<T> = std::result::Result<T, DbError>;
