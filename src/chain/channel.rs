//! Single-use byte channels
//!
//! Each end carries exactly one buffer and is consumed by the call that uses
//! it, so a second transmission on the same channel can't be written.

use crossbeam::channel::{bounded, Receiver, Sender};

use crate::error::{ChainError, ChainResult};

/// Create a channel that accepts one buffer of at most `capacity` bytes.
pub fn channel(capacity: usize) -> (ByteSender, ByteReceiver) {
    let (tx, rx) = bounded(1);
    (
        ByteSender { tx, capacity },
        ByteReceiver { rx, capacity },
    )
}

/// Write end of a single-use channel.
#[derive(Debug)]
pub struct ByteSender {
    tx: Sender<Vec<u8>>,
    capacity: usize,
}

impl ByteSender {
    /// Transmit `bytes` and close this end.
    pub fn send(
        self,
        bytes: &[u8],
    ) -> ChainResult<()> {
        if bytes.len() > self.capacity {
            return Err(ChainError::CapacityExceeded {
                needed: bytes.len(),
                capacity: self.capacity,
            });
        }
        self.tx
            .send(bytes.to_vec())
            .map_err(|_| ChainError::transport("can't write to channel", "reader is gone"))
    }
}

/// Read end of a single-use channel.
#[derive(Debug)]
pub struct ByteReceiver {
    rx: Receiver<Vec<u8>>,
    capacity: usize,
}

impl ByteReceiver {
    /// Block until the one buffer arrives, then close this end.
    pub fn recv(self) -> ChainResult<Vec<u8>> {
        let bytes = self
            .rx
            .recv()
            .map_err(|e| ChainError::transport("can't read from channel", e))?;
        if bytes.len() > self.capacity {
            return Err(ChainError::CapacityExceeded {
                needed: bytes.len(),
                capacity: self.capacity,
            });
        }
        Ok(bytes)
    }
}
