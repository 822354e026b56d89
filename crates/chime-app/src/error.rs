use thiserror::Error;

/// Application-level errors (chat host client)
#[derive(Error, Debug)]
pub enum AppError {
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Chat host returned {status}: {message}")]
    HostStatus { status: u16, message: String },
}

pub type AppResult<T> = std::result::Result<T, AppError>;
