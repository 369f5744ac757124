use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum DbError {
    #[error("Cannot open {path}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("{message}")]
    Query { query: String, message: String },

    #[error("Database handle is closed")]
    Closed,
}

impl DbError {
    pub fn io(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        DbError::Io {
            path: path.into(),
            message: message.to_string(),
        }
    }

    pub fn query(query: impl Into<String>, message: impl ToString) -> Self {
        DbError::Query {
            query: query.into(),
            message: message.to_string(),
        }
    }

    /// Errors the console recovers from by reporting and moving on.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, DbError::Query { .. })
    }
}

pub type Result<T> = std::result::Result<T, DbError>;
