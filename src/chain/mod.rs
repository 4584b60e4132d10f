//! Worker chain
//!
//! Runs the reduction of [`crate::convert`] as a chain of generations instead
//! of a call stack:
//!
//! ```text
//! root ──state──▶ gen 1 ──state──▶ gen 2 ── … ──▶ gen n+1 (flush)
//! root ◀─result── gen 1 ◀─result── gen 2 ◀─ … ◀── gen n+1
//! ```
//!
//! Spawning a generation is the call, the forward channel carries the
//! arguments, the backward channel carries the return value and waiting for
//! the generation to terminate is the return. The root only encodes the
//! initial state; every spawned generation performs exactly one step, so a
//! chain for `n` tokens is `n + 1` generations deep.

pub mod channel;
pub mod codec;
pub mod process;
pub mod thread;

#[cfg(test)]
mod tests;

pub use channel::{channel, ByteReceiver, ByteSender};
pub use codec::{decode, encode, StateBuffer};
pub use process::ProcessTransport;
pub use thread::ThreadTransport;

use tracing::{debug, trace};

use crate::convert::{step, ConversionState, Step};
use crate::error::ChainResult;

/// Position of a generation in the chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Holds the original expression; nobody to relay to.
    Root,
    /// Relays whatever its child returns.
    Link,
    /// Input exhausted; produces the answer itself.
    Terminal,
}

/// Creates generations and the channel pair linking each one to its parent.
pub trait Transport {
    type Child: ChildLink;

    /// Start generation `generation`, already connected to the caller.
    fn spawn(
        &self,
        generation: usize,
    ) -> ChainResult<Self::Child>;

    /// Largest buffer either channel accepts.
    fn capacity(&self) -> usize;
}

/// Parent-side view of a spawned generation.
pub trait ChildLink {
    /// Write the encoded state on the forward channel and close it.
    fn send_state(
        &mut self,
        state: &StateBuffer,
    ) -> ChainResult<()>;

    /// Block until the child's result arrives on the backward channel.
    fn recv_result(&mut self) -> ChainResult<String>;

    /// Wait for the child to terminate.
    ///
    /// A child that failed surfaces its failure here.
    fn wait(self) -> ChainResult<()>;
}

/// Child-side read end of the forward channel.
pub trait StateSource {
    fn receive(self) -> ChainResult<Vec<u8>>;
}

/// Child-side write end of the backward channel.
pub trait ResultSink {
    fn relay(
        self,
        result: &str,
    ) -> ChainResult<()>;
}

impl StateSource for ByteReceiver {
    fn receive(self) -> ChainResult<Vec<u8>> {
        self.recv()
    }
}

impl ResultSink for ByteSender {
    fn relay(
        self,
        result: &str,
    ) -> ChainResult<()> {
        self.send(result.as_bytes())
    }
}

/// Run the whole chain for `expression` as its root.
///
/// Returns `None` for an empty expression; no generation is spawned then.
pub fn run_chain<T: Transport>(
    transport: &T,
    expression: &str,
) -> ChainResult<Option<String>> {
    if expression.is_empty() {
        debug!("empty expression, chain not started");
        return Ok(None);
    }

    let encoded = {
        let state = ConversionState::new(expression, transport.capacity())?;
        encode(&state)?
    };
    let (result, child) = call(transport, 0, &encoded)?;
    child.wait()?;
    debug!(role = ?Role::Root, "chain finished");
    Ok(Some(result))
}

/// Body of every spawned generation.
///
/// Reads the state, performs one step and either answers directly or calls
/// the next generation and relays its answer.
pub fn run_link<T, S, K>(
    transport: &T,
    generation: usize,
    source: S,
    sink: K,
) -> ChainResult<()>
where
    T: Transport,
    S: StateSource,
    K: ResultSink,
{
    let state = decode(&source.receive()?, transport.capacity())?;
    trace!(generation, remaining = state.remaining(), stack = state.stack(), "stepping");

    match step(state)? {
        Step::Finished(result) => {
            debug!(generation, role = ?Role::Terminal, result = %result, "stack flushed");
            sink.relay(&result)
        }
        Step::Advanced(next) => {
            let encoded = encode(&next)?;
            drop(next);
            let (result, child) = call(transport, generation, &encoded)?;
            debug!(generation, role = ?Role::Link, "relaying result");
            sink.relay(&result)?;
            child.wait()
        }
    }
}

/// Spawn the generation after `generation`, forward `encoded` and receive its
/// result. The caller relays the result and then waits on the returned child.
fn call<T: Transport>(
    transport: &T,
    generation: usize,
    encoded: &StateBuffer,
) -> ChainResult<(String, T::Child)> {
    let mut child = transport.spawn(generation + 1)?;
    trace!(generation, child = generation + 1, bytes = encoded.len(), "forwarding state");

    let received = child
        .send_state(encoded)
        .and_then(|()| child.recv_result());
    match received {
        Ok(result) => Ok((result, child)),
        Err(err) => {
            // The child's own failure explains a broken link better.
            child.wait()?;
            Err(err)
        }
    }
}
