//! Chain configuration
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Config file (--config FILE, RON)
//! 3. Default values
//! ```
//!
//! # Usage
//!
//! ```rust
//! use postfix_chain::util::config::ChainConfig;
//!
//! let config: ChainConfig = ChainConfig::from_ron_str("(capacity: 8192)").unwrap();
//! assert_eq!(config.capacity, 8192);
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::convert::FRAME_OVERHEAD;
use crate::util::logger::LogLevel;

/// Capacity of each channel when nothing else is configured.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Smallest capacity that still frames a one-byte expression.
pub const MIN_CAPACITY: usize = FRAME_OVERHEAD + 1;

/// How generations are created.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum TransportKind {
    /// One thread per generation.
    #[default]
    Thread,
    /// One child process per generation.
    Process,
}

/// Chain configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainConfig {
    /// Maximum transmissible buffer, in bytes
    #[serde(default = "default_capacity")]
    pub capacity: usize,
    /// Generation transport
    #[serde(default)]
    pub transport: TransportKind,
    /// Log level for every generation
    #[serde(default)]
    pub log_level: LogLevel,
}

fn default_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for ChainConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            transport: TransportKind::default(),
            log_level: LogLevel::default(),
        }
    }
}

impl ChainConfig {
    /// Parse a RON document.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Load a RON config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_ron_str(&content)
    }

    /// Reject settings no chain could run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity < MIN_CAPACITY {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                minimum: MIN_CAPACITY,
            });
        }
        Ok(())
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("capacity {capacity} is below the minimum of {minimum}")]
    CapacityTooSmall { capacity: usize, minimum: usize },
}
