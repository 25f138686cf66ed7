use serde::Serialize;
use std::sync::Mutex;

/// Session lifecycle states
///
/// Transitions are monotonic forward; `Closed` is terminal and reachable
/// from any state on fatal error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Connecting,
    Streaming,
    Draining,
    Closed,
}

/// Shared state cell enforcing forward-only transitions
#[derive(Debug)]
pub struct StateCell {
    inner: Mutex<SessionState>,
}

impl StateCell {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(SessionState::Idle),
        }
    }

    pub fn get(&self) -> SessionState {
        *self.inner.lock().unwrap()
    }

    /// Advance to `next` if it is ahead of the current state; a lagging
    /// `next` leaves the state unchanged
    pub fn advance(&self, next: SessionState) -> SessionState {
        let mut current = self.inner.lock().unwrap();
        if next > *current {
            *current = next;
        }
        *current
    }
}

impl Default for StateCell {
    fn default() -> Self {
        Self::new()
    }
}
