//! Thread transport: one OS thread per generation.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use tracing::trace;

use super::channel::{channel, ByteReceiver, ByteSender};
use super::codec::StateBuffer;
use super::{run_link, ChildLink, Transport};
use crate::error::{ChainError, ChainResult};

/// Default stack size of a generation thread.
///
/// A generation only holds one state and two channel ends, so it needs far
/// less than the platform default.
pub const DEFAULT_STACK_SIZE: usize = 256 * 1024;

/// Spawns each generation on its own thread, linked by crossbeam channels.
#[derive(Debug, Clone)]
pub struct ThreadTransport {
    capacity: usize,
    stack_size: usize,
    spawned: Arc<AtomicUsize>,
}

impl ThreadTransport {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            stack_size: DEFAULT_STACK_SIZE,
            spawned: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn with_stack_size(
        mut self,
        stack_size: usize,
    ) -> Self {
        self.stack_size = stack_size;
        self
    }

    /// Generations spawned so far by this transport and its clones.
    pub fn spawned(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }
}

impl Transport for ThreadTransport {
    type Child = ThreadChild;

    fn spawn(
        &self,
        generation: usize,
    ) -> ChainResult<ThreadChild> {
        let (state_tx, state_rx) = channel(self.capacity);
        let (result_tx, result_rx) = channel(self.capacity);
        let transport = self.clone();

        let handle = thread::Builder::new()
            .name(format!("generation-{}", generation))
            .stack_size(self.stack_size)
            .spawn(move || run_link(&transport, generation, state_rx, result_tx))
            .map_err(|e| ChainError::Spawn {
                generation,
                reason: e.to_string(),
            })?;
        self.spawned.fetch_add(1, Ordering::SeqCst);
        trace!(generation, "thread spawned");

        Ok(ThreadChild {
            generation,
            forward: Some(state_tx),
            backward: Some(result_rx),
            handle,
        })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A generation running on a thread.
#[derive(Debug)]
pub struct ThreadChild {
    generation: usize,
    forward: Option<ByteSender>,
    backward: Option<ByteReceiver>,
    handle: JoinHandle<ChainResult<()>>,
}

impl ChildLink for ThreadChild {
    fn send_state(
        &mut self,
        state: &StateBuffer,
    ) -> ChainResult<()> {
        self.forward
            .take()
            .ok_or_else(|| ChainError::transport("can't write to channel", "already used"))?
            .send(state.as_bytes())
    }

    fn recv_result(&mut self) -> ChainResult<String> {
        let bytes = self
            .backward
            .take()
            .ok_or_else(|| ChainError::transport("can't read from channel", "already used"))?
            .recv()?;
        String::from_utf8(bytes).map_err(|e| ChainError::transport("can't read from channel", e))
    }

    fn wait(self) -> ChainResult<()> {
        // Unused ends close here, before blocking on the join.
        drop(self.forward);
        drop(self.backward);
        match self.handle.join() {
            Ok(outcome) => outcome,
            Err(_) => Err(ChainError::Synchronization {
                generation: self.generation,
                reason: "generation panicked".to_string(),
            }),
        }
    }
}
