//! Shutdown coordination for the daemon.

use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};

/// Coordinator for graceful shutdown.
///
/// Wraps a cancellation token that every long-running task can observe.
/// Triggering is idempotent and broadcast: each waiter sees it, no matter
/// when it starts waiting, and the token never resets.
#[derive(Debug, Clone, Default)]
pub struct Shutdown {
    token: CancellationToken,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        Self {
            token: CancellationToken::new(),
        }
    }

    /// Derive a coordinator that fires when this one does, but can also be
    /// triggered on its own without affecting the parent.
    pub fn child(&self) -> Self {
        Self {
            token: self.token.child_token(),
        }
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.token.cancel();
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Wait until shutdown is requested.
    pub fn triggered(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn trigger_is_idempotent() {
        let shutdown = Shutdown::new();
        shutdown.trigger();
        shutdown.trigger();
        assert!(shutdown.is_triggered());
        shutdown.triggered().await;
    }

    #[tokio::test]
    async fn late_waiters_still_observe_trigger() {
        let shutdown = Shutdown::new();
        shutdown.trigger();

        let waiter = shutdown.clone();
        tokio::time::timeout(Duration::from_millis(100), waiter.triggered())
            .await
            .expect("waiter should observe earlier trigger");
    }

    #[test]
    fn child_does_not_trigger_parent() {
        let parent = Shutdown::new();
        let child = parent.child();

        child.trigger();
        assert!(child.is_triggered());
        assert!(!parent.is_triggered());
    }

    #[test]
    fn parent_triggers_child() {
        let parent = Shutdown::new();
        let child = parent.child();

        parent.trigger();
        assert!(child.is_triggered());
    }
}
