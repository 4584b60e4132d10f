//! Infix to postfix conversion
//!
//! The reduction is split into single steps so that each step can run in its
//! own generation of a worker chain (see [`crate::chain`]). [`convert`] runs
//! the same steps as plain recursive calls in one thread.

pub mod scanner;
pub mod step;

pub use scanner::{next_token, Scan, SEPARATOR};
pub use step::{classify, step, ConversionState, Operator, Step, TokenKind, FRAME_OVERHEAD};

use crate::error::ChainResult;

/// Convert `expression` to postfix with one stack frame per reduction step.
pub fn convert(
    expression: &str,
    capacity: usize,
) -> ChainResult<String> {
    descend(ConversionState::new(expression, capacity)?)
}

fn descend(state: ConversionState) -> ChainResult<String> {
    match step(state)? {
        Step::Finished(result) => Ok(result),
        Step::Advanced(next) => descend(next),
    }
}
