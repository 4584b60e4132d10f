//! Process transport: one OS process per generation.
//!
//! Every generation re-executes the same binary with the hidden
//! `--worker-generation` flag. The child's stdin is the forward channel and its stdout the
//! backward channel; stderr is inherited so each generation reports its own
//! diagnostics.

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};

use tracing::{debug, trace};

use super::codec::StateBuffer;
use super::{run_link, ChildLink, ResultSink, StateSource, Transport};
use crate::error::{ChainError, ChainResult};
use crate::util::logger::LogLevel;

/// Hidden flag a spawned generation is started with.
///
/// A flag rather than a subcommand name, so no expression operand can be
/// mistaken for it.
pub const WORKER_FLAG: &str = "--worker-generation";

/// Spawns each generation as a child process of its parent.
#[derive(Debug, Clone)]
pub struct ProcessTransport {
    program: PathBuf,
    capacity: usize,
    log_level: LogLevel,
}

impl ProcessTransport {
    /// Re-execute the running binary for every generation.
    pub fn current(
        capacity: usize,
        log_level: LogLevel,
    ) -> ChainResult<Self> {
        let program = std::env::current_exe().map_err(|e| ChainError::Spawn {
            generation: 0,
            reason: format!("can't locate own executable: {}", e),
        })?;
        Ok(Self::with_program(program, capacity, log_level))
    }

    /// Use `program`, which must understand the `--worker-generation` flag.
    pub fn with_program(
        program: impl Into<PathBuf>,
        capacity: usize,
        log_level: LogLevel,
    ) -> Self {
        Self {
            program: program.into(),
            capacity,
            log_level,
        }
    }

    fn command(
        &self,
        generation: usize,
    ) -> Command {
        let mut command = Command::new(&self.program);
        command
            .arg(WORKER_FLAG)
            .arg(generation.to_string())
            .arg("--capacity")
            .arg(self.capacity.to_string())
            .arg("--log-level")
            .arg(self.log_level.as_str())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit());
        command
    }
}

impl Transport for ProcessTransport {
    type Child = ProcessChild;

    fn spawn(
        &self,
        generation: usize,
    ) -> ChainResult<ProcessChild> {
        let mut child = self
            .command(generation)
            .spawn()
            .map_err(|e| ChainError::Spawn {
                generation,
                reason: e.to_string(),
            })?;
        trace!(generation, pid = child.id(), "process spawned");

        Ok(ProcessChild {
            generation,
            capacity: self.capacity,
            stdin: child.stdin.take(),
            stdout: child.stdout.take(),
            child,
        })
    }

    fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A generation running as a child process.
#[derive(Debug)]
pub struct ProcessChild {
    generation: usize,
    capacity: usize,
    stdin: Option<ChildStdin>,
    stdout: Option<ChildStdout>,
    child: Child,
}

impl ChildLink for ProcessChild {
    fn send_state(
        &mut self,
        state: &StateBuffer,
    ) -> ChainResult<()> {
        let mut stdin = self
            .stdin
            .take()
            .ok_or_else(|| ChainError::transport("can't write to pipe", "already used"))?;
        stdin
            .write_all(state.as_bytes())
            .map_err(|e| ChainError::transport("can't write to pipe", e))
    }

    fn recv_result(&mut self) -> ChainResult<String> {
        let stdout = self
            .stdout
            .take()
            .ok_or_else(|| ChainError::transport("can't read from pipe", "already used"))?;
        let bytes = read_bounded(stdout, self.capacity)?;
        String::from_utf8(bytes).map_err(|e| ChainError::transport("can't read from pipe", e))
    }

    fn wait(mut self) -> ChainResult<()> {
        drop(self.stdin.take());
        drop(self.stdout.take());
        let status = self.child.wait().map_err(|e| ChainError::Synchronization {
            generation: self.generation,
            reason: e.to_string(),
        })?;
        if !status.success() {
            debug!(generation = self.generation, %status, "generation failed");
            return Err(ChainError::Aborted {
                generation: self.generation,
            });
        }
        Ok(())
    }
}

/// Read until end of stream, refusing more than `capacity` bytes.
fn read_bounded(
    reader: impl Read,
    capacity: usize,
) -> ChainResult<Vec<u8>> {
    // One byte past capacity tells an oversized stream from an exact fit.
    let limit = u64::try_from(capacity).map_or(u64::MAX, |c| c.saturating_add(1));
    let mut bytes = Vec::new();
    reader
        .take(limit)
        .read_to_end(&mut bytes)
        .map_err(|e| ChainError::transport("can't read from pipe", e))?;
    if bytes.len() > capacity {
        return Err(ChainError::CapacityExceeded {
            needed: bytes.len(),
            capacity,
        });
    }
    Ok(bytes)
}

/// Forward channel as seen from inside a worker process.
#[derive(Debug)]
pub struct StdinSource {
    capacity: usize,
}

impl StateSource for StdinSource {
    fn receive(self) -> ChainResult<Vec<u8>> {
        read_bounded(io::stdin().lock(), self.capacity)
    }
}

/// Backward channel as seen from inside a worker process.
#[derive(Debug)]
pub struct StdoutSink;

impl ResultSink for StdoutSink {
    fn relay(
        self,
        result: &str,
    ) -> ChainResult<()> {
        let mut stdout = io::stdout().lock();
        stdout
            .write_all(result.as_bytes())
            .and_then(|()| stdout.flush())
            .map_err(|e| ChainError::transport("can't write to pipe", e))
    }
}

/// Entry point of a worker process for `generation`.
pub fn run_worker(
    generation: usize,
    capacity: usize,
    log_level: LogLevel,
) -> ChainResult<()> {
    debug!(generation, "worker started");
    let transport = ProcessTransport::current(capacity, log_level)?;
    run_link(&transport, generation, StdinSource { capacity }, StdoutSink)?;
    debug!(generation, "worker finished");
    Ok(())
}
