//! Common error types for WMP
//!
//! The taxonomy mirrors how a workflow failure is reported to callers:
//! validation and precondition failures are detected before any write,
//! persistence and external-service failures abort the whole unit of work.

use thiserror::Error;

/// Common result type for WMP operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across WMP services
#[derive(Error, Debug)]
pub enum Error {
    /// Missing or malformed input (never touches the database)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Guard failed: wrong entity state, duplicate pending request,
    /// insufficient balance, negative classifier verdict
    #[error("Precondition failed: {0}")]
    Precondition(String),

    /// Requested entity not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Actor does not own or administer the entity
    #[error("Not authorized: {0}")]
    Authorization(String),

    /// Classifier or storage unavailable or returned garbage
    #[error("External service error: {0}")]
    ExternalService(String),

    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Persistence(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Short machine-readable error class
    pub fn kind(&self) -> &'static str {
        match self {
            Error::Validation(_) => "validation",
            Error::Precondition(_) => "precondition",
            Error::NotFound(_) => "not_found",
            Error::Authorization(_) => "authorization",
            Error::ExternalService(_) => "external_service",
            Error::Persistence(_) => "persistence",
            Error::Io(_) => "io",
            Error::Config(_) => "config",
            Error::Internal(_) => "internal",
        }
    }
}
