use rustyline::error::ReadlineError;
use thiserror::Error;

use crate::db::DbError;

#[derive(Error, Debug)]
pub enum ConsoleError {
    #[error(transparent)]
    Db(#[from] DbError),

    #[error("Line editor error: {0}")]
    Readline(#[from] ReadlineError),

    #[error("Output error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
