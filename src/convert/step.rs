//! Step engine
//!
//! One shunting-yard reduction per call. The operator stack is kept as text
//! with its top at the end, the same shape it has on the wire.

use crate::convert::scanner::{next_token, Scan};
use crate::error::{ChainError, ChainResult};

/// Open-group marker
pub const OPEN: char = '(';
/// Close-group marker
pub const CLOSE: char = ')';

/// Terminator bytes added by the state codec, one per field.
pub const FRAME_OVERHEAD: usize = 3;

/// Arithmetic operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
    Add,
    Sub,
    Mul,
    Div,
}

impl Operator {
    /// Parse an operator character.
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Operator::Add),
            '-' => Some(Operator::Sub),
            '*' => Some(Operator::Mul),
            '/' => Some(Operator::Div),
            _ => None,
        }
    }

    /// Character written to the stack and the result.
    pub fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Sub => '-',
            Operator::Mul => '*',
            Operator::Div => '/',
        }
    }

    /// Binding priority: additive 0, multiplicative 1.
    pub fn priority(self) -> u8 {
        match self {
            Operator::Add | Operator::Sub => 0,
            Operator::Mul | Operator::Div => 1,
        }
    }
}

/// Token classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Operand,
    Open,
    Close,
    Operator(Operator),
}

/// Classify a non-empty token.
///
/// Any token longer than one character is an operand, whatever it contains.
pub fn classify(token: &str) -> ChainResult<TokenKind> {
    let mut chars = token.chars();
    let (Some(c), None) = (chars.next(), chars.next()) else {
        return Ok(TokenKind::Operand);
    };
    match c {
        'a'..='z' | '0'..='9' => Ok(TokenKind::Operand),
        OPEN => Ok(TokenKind::Open),
        CLOSE => Ok(TokenKind::Close),
        _ => Operator::from_char(c).map(TokenKind::Operator).ok_or_else(|| {
            ChainError::MalformedExpression(format!("unexpected token `{}`", token))
        }),
    }
}

/// Result of one reduction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    /// A token was consumed; the state moves on to the next generation.
    Advanced(ConversionState),
    /// Input was exhausted and the stack flushed; this is the answer.
    Finished(String),
}

/// State carried from one generation to the next.
///
/// `remaining + stack + result` plus [`FRAME_OVERHEAD`] never exceeds
/// `capacity`; every growing operation checks it first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionState {
    remaining: String,
    stack: String,
    result: String,
    capacity: usize,
}

impl ConversionState {
    /// Initial state for `expression`.
    pub fn new(
        expression: &str,
        capacity: usize,
    ) -> ChainResult<Self> {
        Self::from_parts(expression.to_owned(), String::new(), String::new(), capacity)
    }

    /// Rebuild a state from its three fields.
    pub fn from_parts(
        remaining: String,
        stack: String,
        result: String,
        capacity: usize,
    ) -> ChainResult<Self> {
        if remaining.contains('\0') {
            return Err(ChainError::MalformedExpression(
                "expression contains a NUL character".to_string(),
            ));
        }
        let state = Self {
            remaining,
            stack,
            result,
            capacity,
        };
        state.reserve(0)?;
        Ok(state)
    }

    pub fn remaining(&self) -> &str {
        &self.remaining
    }

    pub fn stack(&self) -> &str {
        &self.stack
    }

    pub fn result(&self) -> &str {
        &self.result
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Size of this state once framed by the codec.
    #[inline]
    pub fn encoded_len(&self) -> usize {
        self.remaining.len() + self.stack.len() + self.result.len() + FRAME_OVERHEAD
    }

    fn reserve(
        &self,
        additional: usize,
    ) -> ChainResult<()> {
        let needed = self.encoded_len() + additional;
        if needed > self.capacity {
            return Err(ChainError::CapacityExceeded {
                needed,
                capacity: self.capacity,
            });
        }
        Ok(())
    }

    /// Append a token to the result, space separated.
    fn emit(
        &mut self,
        token: &str,
    ) -> ChainResult<()> {
        let separator = usize::from(!self.result.is_empty());
        self.reserve(separator + token.len())?;
        if separator == 1 {
            self.result.push(' ');
        }
        self.result.push_str(token);
        Ok(())
    }

    fn emit_char(
        &mut self,
        c: char,
    ) -> ChainResult<()> {
        let mut buf = [0u8; 4];
        self.emit(c.encode_utf8(&mut buf))
    }

    fn push(
        &mut self,
        c: char,
    ) -> ChainResult<()> {
        self.reserve(c.len_utf8())?;
        self.stack.push(c);
        Ok(())
    }

    fn top_operator(&self) -> Option<Operator> {
        self.stack.chars().next_back().and_then(Operator::from_char)
    }

    /// Pop operators into the result until the matching open marker.
    fn close_group(&mut self) -> ChainResult<()> {
        loop {
            match self.stack.pop() {
                Some(OPEN) => return Ok(()),
                Some(op) => self.emit_char(op)?,
                None => {
                    return Err(ChainError::MalformedExpression(
                        "`)` without matching `(`".to_string(),
                    ))
                }
            }
        }
    }

    fn push_operator(
        &mut self,
        op: Operator,
    ) -> ChainResult<()> {
        while let Some(top) = self.top_operator() {
            if op.priority() > top.priority() {
                break;
            }
            self.stack.pop();
            self.emit_char(top.symbol())?;
        }
        self.push(op.symbol())
    }

    /// Drain the operator stack into the result.
    pub fn flush(mut self) -> ChainResult<String> {
        while let Some(top) = self.stack.pop() {
            if top == OPEN {
                return Err(ChainError::MalformedExpression(
                    "`(` without matching `)`".to_string(),
                ));
            }
            self.emit_char(top)?;
        }
        Ok(self.result)
    }
}

/// Apply one reduction to `state`.
pub fn step(mut state: ConversionState) -> ChainResult<Step> {
    let (consumed, token) = match next_token(&state.remaining) {
        Scan::Exhausted => return state.flush().map(Step::Finished),
        scan @ Scan::Token { token, .. } => (scan.consumed(), token.to_owned()),
    };
    // Consume first so the capacity checks below see the shrunk input.
    state.remaining.drain(..consumed);

    match classify(&token)? {
        TokenKind::Operand => state.emit(&token)?,
        TokenKind::Open => state.push(OPEN)?,
        TokenKind::Close => state.close_group()?,
        TokenKind::Operator(op) => state.push_operator(op)?,
    }
    Ok(Step::Advanced(state))
}
