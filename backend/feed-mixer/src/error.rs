//! Error types for the feed mixing pipeline
//!
//! The pure pipeline stages never fail for valid input. Errors only surface
//! while building configuration, decoding client cursors, or at the seams to
//! external collaborators (where they are logged and substituted, not raised).

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedError {
    /// Invalid rule set or mixer configuration (programming error)
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Invalid cursor: {0}")]
    InvalidCursor(String),

    /// A candidate source failed
    #[error("Sourcing failure: {0}")]
    Sourcing(String),

    #[error("Carousel error: {0}")]
    Carousel(String),

    #[error("Environment error: {0}")]
    Env(#[from] envy::Error),
}

pub type Result<T> = std::result::Result<T, FeedError>;
