//! Chain errors
//!
//! Every failure is fatal for the whole chain. Nothing here is carried back
//! along the backward channel; a generation that hits one of these stops and
//! the failure surfaces to its parent as a broken link.

use thiserror::Error;

/// Chain result
pub type ChainResult<T> = Result<T, ChainError>;

/// Chain errors
#[derive(Debug, Error)]
pub enum ChainError {
    #[error("transport failure: {0}")]
    Transport(String),

    #[error("can't spawn generation {generation}: {reason}")]
    Spawn { generation: usize, reason: String },

    #[error("can't wait for generation {generation}: {reason}")]
    Synchronization { generation: usize, reason: String },

    #[error("state needs {needed} bytes but channel capacity is {capacity}")]
    CapacityExceeded { needed: usize, capacity: usize },

    #[error("malformed expression: {0}")]
    MalformedExpression(String),

    /// A descendant already reported its own diagnostic and exited non-zero.
    #[error("generation {generation} aborted")]
    Aborted { generation: usize },
}

impl ChainError {
    /// Wrap an I/O failure on a channel end.
    pub fn transport(
        what: &str,
        err: impl std::fmt::Display,
    ) -> Self {
        ChainError::Transport(format!("{}: {}", what, err))
    }

    /// True when a descendant has already printed the real diagnostic.
    pub fn is_reported(&self) -> bool {
        matches!(self, ChainError::Aborted { .. })
    }
}
