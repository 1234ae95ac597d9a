//! Common error types for the Kashi lyrics engine

use thiserror::Error;

/// Common result type for Kashi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy shared across the resolver and sync crates
///
/// Provider-level failures are recovered inside the chain and only ever
/// surface as a single aggregate `NotFound` once every source is exhausted.
/// Stale translation records are recomputed silently and have no variant.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// No provider returned lyrics for the song (terminal, shown to user)
    #[error("No lyrics found: {0}")]
    NotFound(String),

    /// A single lyrics provider failed (recovered by continuing the chain)
    #[error("Provider error: {0}")]
    Provider(String),

    /// Malformed provider payload (treated the same as a provider failure)
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Translation or romanization engine failure (propagated to caller)
    #[error("Translation failed: {0}")]
    Translation(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
