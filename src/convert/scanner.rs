//! Token scanner
//!
//! Tokens are maximal runs of non-separator characters. Only the space
//! character separates tokens; anything else, tabs included, is token text.

/// Token separator
pub const SEPARATOR: char = ' ';

/// Outcome of scanning the unconsumed input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scan<'a> {
    /// The next token and the number of separator bytes skipped before it.
    Token { skipped: usize, token: &'a str },
    /// Only separators (or nothing) remain.
    Exhausted,
}

impl Scan<'_> {
    /// Bytes to drop from the front of the input to move past this token.
    #[inline]
    pub fn consumed(&self) -> usize {
        match self {
            Scan::Token { skipped, token } => skipped + token.len(),
            Scan::Exhausted => 0,
        }
    }
}

/// Scan the next token from `remaining`.
pub fn next_token(remaining: &str) -> Scan<'_> {
    let rest = remaining.trim_start_matches(SEPARATOR);
    let skipped = remaining.len() - rest.len();
    let len = rest.find(SEPARATOR).unwrap_or(rest.len());
    if len == 0 {
        return Scan::Exhausted;
    }
    Scan::Token {
        skipped,
        token: &rest[..len],
    }
}
