//! Error types for ranking runs and embedding calls

use std::time::Duration;
use thiserror::Error;

/// Fatal for a whole run; reported before any scoring starts
#[derive(Debug, Error)]
pub enum RankError {
    #[error("invalid ranking schema: {0}")]
    InvalidSchema(String),

    #[error("embedding provider unavailable: {0}")]
    ProviderUnavailable(#[source] EmbedError),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// A single embedding call (or the provider as a whole) failed
#[derive(Debug, Clone, Error)]
pub enum EmbedError {
    #[error("provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding call timed out after {0:?}")]
    Timeout(Duration),

    #[error("input rejected: {0}")]
    Rejected(String),

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    Dimension { expected: usize, actual: usize },

    #[error("transport error: {0}")]
    Transport(String),
}
