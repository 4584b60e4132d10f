//! Postfix chain
//!
//! Converts infix arithmetic into postfix (Reverse Polish) notation, running
//! every shunting-yard step in its own generation of a worker chain. The
//! chain behaves like one recursive function whose frames are threads or
//! processes and whose arguments and return values travel over single-use
//! byte channels.
//!
//! # Example
//!
//! ```
//! use postfix_chain::{run, util::config::ChainConfig};
//!
//! let postfix = run("( a + b ) * c", &ChainConfig::default()).unwrap();
//! assert_eq!(postfix.as_deref(), Some("a b + c *"));
//! ```

#![warn(rust_2018_idioms)]

pub mod chain;
pub mod convert;
pub mod error;

// Utility modules
pub mod util;

// Re-exports
pub use convert::convert;
pub use error::{ChainError, ChainResult};

use tracing::debug;

use crate::chain::{run_chain, ProcessTransport, ThreadTransport};
use crate::util::config::{ChainConfig, TransportKind};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Program name
pub const NAME: &str = "postfix-chain";

/// Convert `expression` through a worker chain built as `config` says.
///
/// Returns `None` for an empty expression. The process transport re-executes
/// the running binary, so it only works from the `postfix-chain` executable.
pub fn run(
    expression: &str,
    config: &ChainConfig,
) -> ChainResult<Option<String>> {
    debug!(transport = ?config.transport, capacity = config.capacity, "starting chain");
    match config.transport {
        TransportKind::Thread => run_chain(&ThreadTransport::new(config.capacity), expression),
        TransportKind::Process => {
            let transport = ProcessTransport::current(config.capacity, config.log_level)?;
            run_chain(&transport, expression)
        }
    }
}
