//! Startup, supervision and shutdown of all registered services.
//!
//! # Responsibilities
//! - Bind every listener before any service starts serving
//! - Run one serve task and one shutdown watcher per service
//! - Fail fast: the first fatal serve error shuts every service down
//! - Bound each drain by the grace period, force-closing on overrun
//!
//! # Design Decisions
//! - Fail fast: any bind error aborts startup, nothing serves half-started
//! - The internal shutdown is a child of the caller's, so a service failure
//!   never triggers the caller's token
//! - Shutdown errors are logged, never escalated, including a serve error
//!   raised while the unit is already draining

use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::watch;
use tokio::task::{AbortHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::error::{LifecycleError, ServeError, ShutdownError};
use crate::lifecycle::coordinator::FailFast;
use crate::lifecycle::unit::{advance, ServiceUnit, UnitState, UnitStatus};
use crate::lifecycle::Shutdown;

/// How a serve task ended. `None` while it is still running.
type Outcome = Option<Result<(), ServeError>>;

struct Registered {
    unit: Box<dyn ServiceUnit>,
    state: watch::Sender<UnitState>,
}

/// Supervises a fixed set of services under one shutdown signal.
pub struct Orchestrator {
    shutdown: Shutdown,
    grace_period: Duration,
    coordinator: Arc<FailFast>,
    pending: Vec<Registered>,
    tasks: JoinSet<()>,
    started: bool,
}

impl Orchestrator {
    /// Create an orchestrator whose services stop when `parent` fires.
    pub fn new(parent: &Shutdown, grace_period: Duration) -> Self {
        let shutdown = parent.child();
        Self {
            coordinator: Arc::new(FailFast::new(shutdown.clone())),
            shutdown,
            grace_period,
            pending: Vec::new(),
            tasks: JoinSet::new(),
            started: false,
        }
    }

    /// The shutdown signal shared by all services. Triggering it stops them.
    pub fn shutdown(&self) -> &Shutdown {
        &self.shutdown
    }

    /// Add a service. Only allowed before [`Orchestrator::start`].
    pub fn register<U: ServiceUnit>(&mut self, unit: U) -> Result<UnitStatus, LifecycleError> {
        if self.started {
            return Err(LifecycleError::AlreadyStarted);
        }
        let (state, rx) = watch::channel(UnitState::Created);
        let status = UnitStatus::new(unit.name().to_string(), rx);
        self.pending.push(Registered {
            unit: Box::new(unit),
            state,
        });
        Ok(status)
    }

    /// Bind every service, then start serving.
    ///
    /// A bind failure aborts before any service serves; the error is returned
    /// here and again from [`Orchestrator::wait`].
    pub async fn start(&mut self) -> Result<(), LifecycleError> {
        if self.started {
            return Err(LifecycleError::AlreadyStarted);
        }
        self.started = true;

        let pending = std::mem::take(&mut self.pending);
        let mut bound = Vec::with_capacity(pending.len());

        for registered in pending {
            let name = registered.unit.name().to_string();
            let address = registered.unit.bind_address();

            match TcpListener::bind(address).await {
                Ok(listener) => {
                    advance(&registered.state, UnitState::Bound);
                    bound.push((registered, listener));
                }
                Err(e) => {
                    tracing::error!(service = %name, address = %address, error = %e, "Failed to bind");
                    advance(&registered.state, UnitState::Failed);
                    for (other, _) in &bound {
                        advance(&other.state, UnitState::Stopped);
                    }
                    let error = LifecycleError::Bind {
                        service: name,
                        address,
                        source: Arc::new(e),
                    };
                    self.coordinator.fail(error.clone());
                    return Err(error);
                }
            }
        }

        for (registered, listener) in bound {
            self.spawn_unit(registered, listener);
        }
        Ok(())
    }

    fn spawn_unit(&mut self, registered: Registered, listener: TcpListener) {
        let Registered { unit, state } = registered;
        let name = unit.name().to_string();
        let state = Arc::new(state);

        match listener.local_addr() {
            Ok(addr) => tracing::info!(service = %name, address = %addr, port = addr.port(), "started"),
            Err(_) => tracing::info!(service = %name, "started"),
        }
        advance(&state, UnitState::Serving);

        let drain = CancellationToken::new();
        let (outcome_tx, mut outcome) = watch::channel::<Outcome>(None);
        let server = tokio::spawn(unit.serve(listener, drain.clone()));
        let abort = server.abort_handle();

        // Serve task: classify how the server ended.
        {
            let name = name.clone();
            let state = state.clone();
            let coordinator = self.coordinator.clone();
            self.tasks.spawn(async move {
                let result = match server.await {
                    Ok(result) => result,
                    Err(e) if e.is_cancelled() => Err(ServeError::Closed),
                    Err(e) => Err(ServeError::Panicked(e.to_string())),
                };

                // The outcome is published before the coordinator fires shutdown,
                // so the watcher never mistakes a failure for a completed drain.
                match result {
                    Err(e) if !e.is_shutdown() => {
                        tracing::error!(service = %name, error = %e, "Server failed");
                        if advance(&state, UnitState::Failed) {
                            outcome_tx.send_replace(Some(Err(e.clone())));
                            coordinator.fail(LifecycleError::Serve {
                                service: name,
                                source: e,
                            });
                        } else {
                            // Already draining: a shutdown error, never fatal.
                            advance(&state, UnitState::Stopped);
                            outcome_tx.send_replace(Some(Err(e)));
                        }
                    }
                    _ => {
                        advance(&state, UnitState::Stopped);
                        outcome_tx.send_replace(Some(Ok(())));
                    }
                }
            });
        }

        // Shutdown watcher: drain once shutdown fires.
        {
            let shutdown = self.shutdown.clone();
            let grace_period = self.grace_period;
            self.tasks.spawn(async move {
                tokio::select! {
                    biased;
                    // Already stopped on its own, nothing to drain.
                    _ = outcome.wait_for(Option::is_some) => return,
                    _ = shutdown.triggered() => {}
                }

                if !advance(&state, UnitState::ShuttingDown) {
                    return;
                }
                tracing::debug!(service = %name, grace_period = ?grace_period, "Draining");

                match drain_unit(&drain, &mut outcome, &abort, grace_period).await {
                    Ok(()) => tracing::info!(service = %name, "gracefully shutdown"),
                    Err(e) => tracing::error!(service = %name, error = %e, "Shutdown did not complete cleanly"),
                }
            });
        }
    }

    /// Wait for every task to finish. Returns the first fatal error, if any.
    pub async fn wait(mut self) -> Result<(), LifecycleError> {
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Supervisor task panicked");
            }
        }

        match self.coordinator.first_error() {
            Some(error) => Err(error),
            None => Ok(()),
        }
    }
}

/// Ask the server to drain and wait for it, force-closing after `grace_period`.
async fn drain_unit(
    drain: &CancellationToken,
    outcome: &mut watch::Receiver<Outcome>,
    abort: &AbortHandle,
    grace_period: Duration,
) -> Result<(), ShutdownError> {
    drain.cancel();
    let finished = tokio::time::timeout(grace_period, outcome.wait_for(Option::is_some))
        .await
        .map(|seen| seen.map(|value| (*value).clone()).ok().flatten());

    match finished {
        Ok(Some(Err(e))) if !e.is_shutdown() => Err(ShutdownError::Failed(e)),
        Ok(_) => Ok(()),
        Err(_) => {
            abort.abort();
            let _ = outcome.wait_for(Option::is_some).await;
            Err(ShutdownError::GraceExceeded(grace_period))
        }
    }
}
