//! Command handlers
//!
//! Navigation (`ls`, `cd`) and file content (`cat`, `tac`, `head`)
//! operations, plus the tagged error type whose display strings are the
//! user-visible failure results.

pub mod file;
pub mod nav;

use thiserror::Error;

use crate::fs::FsError;

/// Handler failure, mapped to display text at the dispatch boundary.
///
/// None of these terminate the session; `Unsupported` is a normal,
/// informative outcome rather than an error condition.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CommandError {
    #[error("Path '{0}' does not exist.")]
    PathNotFound(String),

    #[error("Directory '{0}' does not exist.")]
    DirectoryNotFound(String),

    #[error("File '{0}' does not exist.")]
    FileNotFound(String),

    #[error("Error: {0}")]
    Malformed(String),

    #[error("Command '{0}' is not supported.")]
    Unsupported(String),
}

impl From<FsError> for CommandError {
    fn from(err: FsError) -> Self {
        CommandError::Malformed(err.to_string())
    }
}
