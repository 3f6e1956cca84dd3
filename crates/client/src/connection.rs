//! Stream connection state machine.
//!
//! The transport drives this machine with the events it observes (socket
//! opened, socket lost, explicit teardown); the machine answers with the
//! current state and the delay before the next attempt. Keeping it pure
//! makes the retry behavior testable without a network.

use std::time::Duration;

use tokio::sync::watch;
use tracing::debug;

/// Backoff policy for reconnect and resync retries.
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    base: Duration,
    cap: Duration,
    max_attempts: u32,
}

impl RetryPolicy {
    /// Create a policy with the given base delay, cap, and attempt budget.
    #[must_use]
    pub const fn new(base: Duration, cap: Duration, max_attempts: u32) -> Self {
        Self {
            base,
            cap,
            max_attempts,
        }
    }

    /// Delay before the given attempt: base doubling per attempt, capped.
    #[must_use]
    pub fn delay(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt);
        self.base.saturating_mul(factor).min(self.cap)
    }

    /// Attempt budget for bounded retries.
    #[must_use]
    pub const fn max_attempts(&self) -> u32 {
        self.max_attempts
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_millis(250), Duration::from_secs(30), 5)
    }
}

/// Connection lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// No live stream; a retry may be pending.
    Disconnected,
    /// Attempting to establish the stream.
    Connecting,
    /// Stream established and delivering events.
    Connected,
    /// Explicit teardown; terminal.
    Closed,
}

/// Connection state machine with automatic retry scheduling.
#[derive(Debug)]
pub struct Connection {
    state_tx: watch::Sender<ConnectionState>,
    retry: RetryPolicy,
    attempt: u32,
}

impl Connection {
    /// Create a machine in the disconnected state.
    #[must_use]
    pub fn new(retry: RetryPolicy) -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            state_tx,
            retry,
            attempt: 0,
        }
    }

    /// Current state.
    #[must_use]
    pub fn state(&self) -> ConnectionState {
        *self.state_tx.borrow()
    }

    /// Observe state transitions.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// An attempt to establish the stream has started.
    pub fn connecting(&mut self) {
        self.transition(ConnectionState::Connecting);
    }

    /// The stream is established. Resets the backoff sequence.
    pub fn connected(&mut self) {
        self.attempt = 0;
        self.transition(ConnectionState::Connected);
    }

    /// The stream was lost. Returns the delay before the next attempt,
    /// or `None` when the machine is already torn down.
    pub fn connection_lost(&mut self) -> Option<Duration> {
        if self.state() == ConnectionState::Closed {
            return None;
        }
        self.transition(ConnectionState::Disconnected);
        let delay = self.retry.delay(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        debug!(attempt = self.attempt, ?delay, "Scheduling reconnect");
        Some(delay)
    }

    /// Explicit teardown; no further transitions are accepted.
    pub fn teardown(&mut self) {
        let _ = self.state_tx.send(ConnectionState::Closed);
    }

    fn transition(&mut self, next: ConnectionState) {
        // Closed is terminal
        if self.state() == ConnectionState::Closed {
            return;
        }
        let _ = self.state_tx.send(next);
    }
}

impl Default for Connection {
    fn default() -> Self {
        Self::new(RetryPolicy::default())
    }
}
