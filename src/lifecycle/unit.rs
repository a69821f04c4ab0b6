//! The service abstraction the orchestrator supervises.
//!
//! # State Transitions
//! ```text
//! Created → Bound → Serving → ShuttingDown → Stopped
//!    │        │        │
//!    ▼        ▼        ▼
//! Failed   Failed   Failed   (fatal unless caused by shutdown)
//!
//! Bound → Stopped:   startup aborted by a sibling's bind failure
//! Serving → Stopped: server returned on its own without an error
//! ```
//! `ShuttingDown → Stopped` happens regardless of drain outcome.

use std::net::SocketAddr;

use futures_util::future::BoxFuture;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::ServeError;

/// Future driving a service until it stops.
pub type ServeFuture = BoxFuture<'static, Result<(), ServeError>>;

/// One network service: a listener, a serve loop and a drain procedure.
///
/// The orchestrator binds the listener, then calls [`ServiceUnit::serve`].
/// Implementations must stop accepting and drain in-flight requests once
/// `drain` fires, resolving with `Ok(())` or [`ServeError::Closed`]. If the
/// drain outlives the grace period the serve future is dropped.
pub trait ServiceUnit: Send + 'static {
    /// Name used in log events.
    fn name(&self) -> &str;

    /// Address to bind.
    fn bind_address(&self) -> SocketAddr;

    fn serve(self: Box<Self>, listener: TcpListener, drain: CancellationToken) -> ServeFuture;
}

/// Lifecycle state of a registered unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnitState {
    Created,
    Bound,
    Serving,
    ShuttingDown,
    Stopped,
    Failed,
}

impl UnitState {
    /// Whether `next` is a legal successor of `self`.
    pub fn can_become(self, next: UnitState) -> bool {
        use UnitState::*;
        matches!(
            (self, next),
            (Created, Bound)
                | (Created, Failed)
                | (Bound, Serving)
                | (Bound, Stopped)
                | (Bound, Failed)
                | (Serving, ShuttingDown)
                | (Serving, Stopped)
                | (Serving, Failed)
                | (ShuttingDown, Stopped)
        )
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, UnitState::Stopped | UnitState::Failed)
    }
}

/// Apply a transition if it is legal. Returns whether the state changed.
pub(crate) fn advance(state: &watch::Sender<UnitState>, next: UnitState) -> bool {
    state.send_if_modified(|current| {
        if current.can_become(next) {
            *current = next;
            true
        } else {
            false
        }
    })
}

/// Read-only view of a unit's state, handed out at registration.
#[derive(Debug, Clone)]
pub struct UnitStatus {
    name: String,
    rx: watch::Receiver<UnitState>,
}

impl UnitStatus {
    pub(crate) fn new(name: String, rx: watch::Receiver<UnitState>) -> Self {
        Self { name, rx }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn current(&self) -> UnitState {
        *self.rx.borrow()
    }

    /// Wait until the unit reaches a terminal state.
    pub async fn stopped(&mut self) -> UnitState {
        let reached = self
            .rx
            .wait_for(|state| state.is_terminal())
            .await
            .map(|state| *state);
        match reached {
            Ok(state) => state,
            // Sender gone: the orchestrator was dropped, report what we last saw.
            Err(_) => *self.rx.borrow(),
        }
    }
}
