//! Fail-fast error collection across service tasks.

use std::sync::{Mutex, PoisonError};

use crate::error::LifecycleError;
use crate::lifecycle::Shutdown;

/// Collects fatal errors from concurrently running tasks.
///
/// The first error reported wins the single result slot and triggers
/// shutdown for every other task. Later reports are logged and dropped.
#[derive(Debug)]
pub struct FailFast {
    first: Mutex<Option<LifecycleError>>,
    shutdown: Shutdown,
}

impl FailFast {
    pub fn new(shutdown: Shutdown) -> Self {
        Self {
            first: Mutex::new(None),
            shutdown,
        }
    }

    /// Report a fatal error. Returns `true` if it became the reported cause.
    pub fn fail(&self, error: LifecycleError) -> bool {
        let won = {
            let mut slot = self.first.lock().unwrap_or_else(PoisonError::into_inner);
            if slot.is_none() {
                *slot = Some(error.clone());
                true
            } else {
                false
            }
        };

        if won {
            tracing::error!(error = %error, "Fatal error, shutting down all services");
        } else {
            tracing::error!(error = %error, "Additional failure during shutdown");
        }

        self.shutdown.trigger();
        won
    }

    /// The first reported error, if any.
    pub fn first_error(&self) -> Option<LifecycleError> {
        self.first
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
