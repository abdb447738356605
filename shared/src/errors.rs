//! Shared error types for the server supervisor

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SharedError {
    #[error("Deserialization failed: {message}")]
    DeserializationError { message: String },

    #[error("Unknown log level: {level}")]
    InvalidLogLevel { level: String },
}

pub type SharedResult<T> = Result<T, SharedError>;
