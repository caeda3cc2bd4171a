use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    #[error("Invalid source filter: {0}")]
    InvalidFilter(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error("Vector index error: {0}")]
    Index(String),

    #[error("Invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    #[error("Search timed out after {0:?}")]
    Timeout(Duration),

    #[error("Solution not found: {0}")]
    SolutionNotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Coarse classification used at the request boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Caller supplied something unusable; never retried.
    Validation,
    /// Embedding service or vector index failed.
    Retrieval,
    NotFound,
    Internal,
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidQuery(_) | Error::InvalidFilter(_) => ErrorKind::Validation,
            Error::Embedding(_)
            | Error::Index(_)
            | Error::InvalidDimension { .. }
            | Error::Timeout(_) => ErrorKind::Retrieval,
            Error::SolutionNotFound(_) => ErrorKind::NotFound,
            Error::Storage(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::InvalidConfig(_)
            | Error::Internal(_) => ErrorKind::Internal,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
