//! Worker chain tests
//!
//! 线程链的行为、顺序和失败传播


use std::sync::{Arc, Mutex};

use crate::chain::{run_chain, ChildLink, ProcessTransport, StateBuffer, ThreadTransport, Transport};
use crate::error::{ChainError, ChainResult};
use crate::util::logger::LogLevel;

fn chain(expression: &str) -> (ChainResult<Option<String>>, usize) {
    let transport = ThreadTransport::new(4096);
    let result = run_chain(&transport, expression);
    (result, transport.spawned())
}

fn postfix(expression: &str) -> String {
    chain(expression).0.unwrap().unwrap()
}

#[cfg(test)]
mod thread_chain_tests {
    use super::*;

    #[test]
    fn test_left_associativity() {
        assert_eq!(postfix("a - b - c"), "a b - c -");
    }

    #[test]
    fn test_parenthesis_precedence_override() {
        assert_eq!(postfix("( a + b ) * c"), "a b + c *");
    }

    #[test]
    fn test_multi_char_token_is_operand() {
        assert_eq!(postfix("ab + c"), "ab c +");
    }

    #[test]
    fn test_mixed_precedence() {
        assert_eq!(postfix("a + b * c"), "a b c * +");
    }

    #[test]
    fn test_longer_expression() {
        assert_eq!(
            postfix("( 1 + 2 ) * ( 3 - 4 / x ) - y"),
            "1 2 + 3 4 x / - * y -"
        );
    }

    #[test]
    fn test_empty_expression_spawns_nothing() {
        let (result, depth) = chain("");
        assert_eq!(result.unwrap(), None);
        assert_eq!(depth, 0);
    }

    #[test]
    fn test_blank_expression_runs_terminal_only() {
        let (result, depth) = chain("   ");
        assert_eq!(result.unwrap(), Some(String::new()));
        assert_eq!(depth, 1);
    }

    #[test]
    fn test_depth_is_tokens_plus_one() {
        let (result, depth) = chain("a");
        assert_eq!(result.unwrap().as_deref(), Some("a"));
        assert_eq!(depth, 2);

        let (_, depth) = chain("( a + b ) * c");
        assert_eq!(depth, 8);
    }

    #[test]
    fn test_malformed_error_reaches_root() {
        let (result, _) = chain("( a + b");
        assert!(matches!(result, Err(ChainError::MalformedExpression(_))));

        let (result, depth) = chain("a ) b");
        assert!(matches!(result, Err(ChainError::MalformedExpression(_))));
        // Generation 2 fails on `)` and spawns nobody.
        assert_eq!(depth, 2);
    }

    #[test]
    fn test_unknown_token_reaches_root() {
        let (result, _) = chain("a % b");
        assert!(matches!(result, Err(ChainError::MalformedExpression(_))));
    }

    #[test]
    fn test_over_capacity_fails_before_spawning() {
        let transport = ThreadTransport::new(8);
        let result = run_chain(&transport, "a + b + c");
        assert!(matches!(
            result,
            Err(ChainError::CapacityExceeded {
                needed: 12,
                capacity: 8
            })
        ));
        assert_eq!(transport.spawned(), 0);
    }

    #[test]
    fn test_exact_capacity() {
        let transport = ThreadTransport::new("a + b * c".len() + 3);
        let result = run_chain(&transport, "a + b * c").unwrap();
        assert_eq!(result.as_deref(), Some("a b c * +"));
    }

    #[test]
    fn test_small_stack_size() {
        let transport = ThreadTransport::new(4096).with_stack_size(64 * 1024);
        let result = run_chain(&transport, "a * b").unwrap();
        assert_eq!(result.as_deref(), Some("a b *"));
    }
}

/// Wraps the thread transport and records what the root does with its child.
#[derive(Debug, Clone)]
struct Recording {
    inner: ThreadTransport,
    events: Arc<Mutex<Vec<String>>>,
}

struct RecordingChild {
    inner: <ThreadTransport as Transport>::Child,
    events: Arc<Mutex<Vec<String>>>,
}

impl Recording {
    fn record(
        events: &Mutex<Vec<String>>,
        event: String,
    ) {
        events.lock().unwrap().push(event);
    }
}

impl Transport for Recording {
    type Child = RecordingChild;

    fn spawn(
        &self,
        generation: usize,
    ) -> ChainResult<RecordingChild> {
        Self::record(&self.events, format!("spawn {}", generation));
        Ok(RecordingChild {
            inner: self.inner.spawn(generation)?,
            events: Arc::clone(&self.events),
        })
    }

    fn capacity(&self) -> usize {
        self.inner.capacity()
    }
}

impl ChildLink for RecordingChild {
    fn send_state(
        &mut self,
        state: &StateBuffer,
    ) -> ChainResult<()> {
        Recording::record(&self.events, format!("send {}", state.len()));
        self.inner.send_state(state)
    }

    fn recv_result(&mut self) -> ChainResult<String> {
        let result = self.inner.recv_result()?;
        Recording::record(&self.events, format!("recv {}", result));
        Ok(result)
    }

    fn wait(self) -> ChainResult<()> {
        let outcome = self.inner.wait();
        Recording::record(&self.events, format!("wait {}", outcome.is_ok()));
        outcome
    }
}

#[cfg(test)]
mod protocol_tests {
    use super::*;

    #[test]
    fn test_root_sends_receives_then_waits() {
        let transport = Recording {
            inner: ThreadTransport::new(64),
            events: Arc::new(Mutex::new(Vec::new())),
        };
        let result = run_chain(&transport, "a + b").unwrap();
        assert_eq!(result.as_deref(), Some("a b +"));

        let events = transport.events.lock().unwrap().clone();
        assert_eq!(
            events,
            vec!["spawn 1", "send 8", "recv a b +", "wait true"]
        );
        // Generations past the first are spawned by the chain itself.
        assert_eq!(transport.inner.spawned(), 4);
    }

    #[test]
    fn test_root_waits_on_failed_link() {
        let transport = Recording {
            inner: ThreadTransport::new(64),
            events: Arc::new(Mutex::new(Vec::new())),
        };
        let result = run_chain(&transport, "( a");
        assert!(matches!(result, Err(ChainError::MalformedExpression(_))));

        let events = transport.events.lock().unwrap().clone();
        assert_eq!(events, vec!["spawn 1", "send 6", "wait false"]);
    }
}

#[cfg(test)]
mod process_transport_tests {
    use super::*;

    #[test]
    fn test_missing_program_is_spawn_failure() {
        let transport =
            ProcessTransport::with_program("/nonexistent/postfix-chain", 64, LogLevel::Warn);
        assert!(matches!(
            run_chain(&transport, "a + b"),
            Err(ChainError::Spawn { generation: 1, .. })
        ));
    }
}
