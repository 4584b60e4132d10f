//! State codec
//!
//! Wire layout, one buffer per forward transmission:
//!
//! ```text
//! remaining \0 stack \0 result \0
//! ```

use crate::convert::step::{ConversionState, Operator, OPEN};
use crate::error::{ChainError, ChainResult};

/// Field terminator
pub const TERMINATOR: u8 = 0;

/// An encoded state, never larger than the capacity it was built for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StateBuffer {
    bytes: Vec<u8>,
}

impl StateBuffer {
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Frame `state` into a single buffer.
pub fn encode(state: &ConversionState) -> ChainResult<StateBuffer> {
    let len = state.encoded_len();
    if len > state.capacity() {
        return Err(ChainError::CapacityExceeded {
            needed: len,
            capacity: state.capacity(),
        });
    }

    let mut bytes = Vec::with_capacity(len);
    for field in [state.remaining(), state.stack(), state.result()] {
        bytes.extend_from_slice(field.as_bytes());
        bytes.push(TERMINATOR);
    }
    Ok(StateBuffer { bytes })
}

/// Split a received buffer back into a state.
pub fn decode(
    bytes: &[u8],
    capacity: usize,
) -> ChainResult<ConversionState> {
    if bytes.len() > capacity {
        return Err(ChainError::CapacityExceeded {
            needed: bytes.len(),
            capacity,
        });
    }

    let body = bytes
        .strip_suffix(&[TERMINATOR])
        .ok_or_else(|| malformed("missing final terminator"))?;
    let mut fields = body.split(|&b| b == TERMINATOR);
    let (Some(remaining), Some(stack), Some(result), None) =
        (fields.next(), fields.next(), fields.next(), fields.next())
    else {
        return Err(malformed("expected exactly three fields"));
    };

    let stack = utf8(stack)?;
    if let Some(c) = stack
        .chars()
        .find(|&c| c != OPEN && Operator::from_char(c).is_none())
    {
        return Err(malformed(&format!("`{}` can't be on the operator stack", c)));
    }

    ConversionState::from_parts(utf8(remaining)?, stack, utf8(result)?, capacity)
}

fn utf8(field: &[u8]) -> ChainResult<String> {
    String::from_utf8(field.to_vec()).map_err(|e| malformed(&e.to_string()))
}

fn malformed(reason: &str) -> ChainError {
    ChainError::transport("malformed state buffer", reason)
}
