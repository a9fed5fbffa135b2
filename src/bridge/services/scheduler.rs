//! Scheduler bridge: one tokio runtime on a dedicated worker thread.
//!
//! Synchronous callers hand asynchronous units to the worker through an
//! unbounded queue and block on a per-submission one-shot reply. Every unit
//! runs on the same current-thread runtime, so units interleave only at their
//! await points and never run in parallel with each other.

use crate::bridge::domain::{ClientId, ClientLifecycleState};
use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError, mpsc as std_mpsc};
use std::thread::JoinHandle;
use std::time::Duration;
use thiserror::Error;
use tokio::runtime::Builder;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

type Unit = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

enum WorkItem {
    Run(Unit),
    Shutdown,
}

/// Programmer errors: operations attempted outside their valid lifecycle.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum UsageError {
    /// The scheduler has been stopped; it accepts no further work.
    #[error("scheduler has been stopped")]
    SchedulerStopped,

    /// `stop` was called from a unit running on the worker it would join.
    #[error("scheduler cannot be stopped from its own worker thread")]
    StopFromWorker,

    /// A client operation was attempted in a state that does not allow it.
    #[error("cannot {operation} a client in state '{state}'")]
    InvalidState {
        /// Attempted operation.
        operation: &'static str,
        /// Current lifecycle state.
        state: ClientLifecycleState,
    },
}

/// Errors raised by the scheduler bridge itself, never by a unit.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The bridge was used outside its lifecycle.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// The worker thread or its runtime could not be created.
    #[error("failed to start scheduler worker: {0}")]
    RuntimeInit(#[source] std::io::Error),

    /// The worker thread panicked.
    #[error("scheduler worker panicked")]
    WorkerPanicked,

    /// The unit was dropped before producing a result, typically because it
    /// panicked.
    #[error("submitted unit aborted before completing")]
    UnitAborted,
}

/// Owns the single cooperative scheduler of a client session.
///
/// Constructing the bridge starts it; [`SchedulerBridge::stop`] tears it down
/// exactly once. Dropping a running bridge stops it.
pub struct SchedulerBridge {
    client_id: ClientId,
    sender: mpsc::UnboundedSender<WorkItem>,
    worker: Mutex<Option<JoinHandle<()>>>,
    stopped: AtomicBool,
}

impl SchedulerBridge {
    /// Starts the worker thread and its runtime.
    ///
    /// Blocks until the worker reports that the runtime is accepting work.
    /// `shutdown_grace` bounds how long units still running at
    /// [`SchedulerBridge::stop`] may take before they are dropped.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::RuntimeInit`] when the thread or runtime
    /// cannot be created and [`SchedulerError::WorkerPanicked`] when the
    /// worker dies before signalling readiness.
    pub fn start(client_id: ClientId, shutdown_grace: Duration) -> Result<Self, SchedulerError> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (ready_tx, ready_rx) = std_mpsc::sync_channel(1);

        let handle = std::thread::Builder::new()
            .name(format!("toolbridge-{client_id}"))
            .spawn(move || run_worker(receiver, &ready_tx, shutdown_grace))
            .map_err(SchedulerError::RuntimeInit)?;

        match ready_rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(err)) => {
                join_worker(handle)?;
                return Err(SchedulerError::RuntimeInit(err));
            }
            Err(_) => {
                join_worker(handle)?;
                return Err(SchedulerError::WorkerPanicked);
            }
        }

        tracing::debug!(client = %client_id, "scheduler worker started");
        Ok(Self {
            client_id,
            sender,
            worker: Mutex::new(Some(handle)),
            stopped: AtomicBool::new(false),
        })
    }

    /// Returns the owning client's identifier.
    #[must_use]
    pub const fn client_id(&self) -> ClientId {
        self.client_id
    }

    /// Returns whether the bridge still accepts work.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.stopped.load(Ordering::Acquire)
    }

    /// Runs `unit` on the scheduler and blocks the calling thread until it
    /// completes.
    ///
    /// The unit's output, including any error it returns, is handed back
    /// unchanged. There is no cancellation: if the caller stops waiting, the
    /// unit still runs to completion on the worker.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::SchedulerStopped`] after [`SchedulerBridge::stop`]
    /// and [`SchedulerError::UnitAborted`] when the unit panics.
    ///
    /// # Panics
    ///
    /// Panics when called from a unit already running on this scheduler,
    /// where blocking would deadlock the worker.
    pub fn submit<F, T>(&self, unit: F) -> Result<T, SchedulerError>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        if !self.is_running() {
            return Err(UsageError::SchedulerStopped.into());
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let job: Unit = Box::pin(async move {
            let output = unit.await;
            if reply_tx.send(output).is_err() {
                tracing::trace!("unit completed after its caller stopped waiting");
            }
        });

        self.sender
            .send(WorkItem::Run(job))
            .map_err(|_| SchedulerError::from(UsageError::SchedulerStopped))?;

        reply_rx.blocking_recv().map_err(|_| {
            if self.is_running() {
                SchedulerError::UnitAborted
            } else {
                UsageError::SchedulerStopped.into()
            }
        })
    }

    /// Signals shutdown and joins the worker thread.
    ///
    /// Units still running get the configured grace period and are then
    /// dropped. After this returns the worker thread has terminated.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::SchedulerStopped`] on a second call,
    /// [`UsageError::StopFromWorker`] when called from the worker itself, and
    /// [`SchedulerError::WorkerPanicked`] when the worker panicked.
    pub fn stop(&self) -> Result<(), SchedulerError> {
        let mut worker = self.worker.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(handle) = worker.as_ref() else {
            return Err(UsageError::SchedulerStopped.into());
        };
        if handle.thread().id() == std::thread::current().id() {
            return Err(UsageError::StopFromWorker.into());
        }
        let Some(owned_handle) = worker.take() else {
            return Err(UsageError::SchedulerStopped.into());
        };
        drop(worker);

        self.stopped.store(true, Ordering::Release);
        if self.sender.send(WorkItem::Shutdown).is_err() {
            tracing::debug!(client = %self.client_id, "scheduler worker already exited");
        }
        join_worker(owned_handle)?;
        tracing::debug!(client = %self.client_id, "scheduler worker joined");
        Ok(())
    }
}

impl Drop for SchedulerBridge {
    fn drop(&mut self) {
        if self.is_running() {
            if let Err(err) = self.stop() {
                tracing::warn!(client = %self.client_id, error = %err, "scheduler stop on drop failed");
            }
        }
    }
}

impl std::fmt::Debug for SchedulerBridge {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SchedulerBridge")
            .field("client_id", &self.client_id)
            .field("running", &self.is_running())
            .finish_non_exhaustive()
    }
}

fn join_worker(handle: JoinHandle<()>) -> Result<(), SchedulerError> {
    handle.join().map_err(|_| SchedulerError::WorkerPanicked)
}

fn run_worker(
    receiver: mpsc::UnboundedReceiver<WorkItem>,
    ready: &std_mpsc::SyncSender<std::io::Result<()>>,
    shutdown_grace: Duration,
) {
    let runtime = match Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            if ready.send(Err(err)).is_err() {
                tracing::error!("scheduler starter vanished before runtime failure was reported");
            }
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        return;
    }

    runtime.block_on(run_loop(receiver, shutdown_grace));
}

async fn run_loop(mut receiver: mpsc::UnboundedReceiver<WorkItem>, shutdown_grace: Duration) {
    let mut units = JoinSet::new();

    loop {
        tokio::select! {
            item = receiver.recv() => match item {
                Some(WorkItem::Run(unit)) => {
                    units.spawn(unit);
                }
                Some(WorkItem::Shutdown) | None => break,
            },
            Some(finished) = units.join_next(), if !units.is_empty() => {
                if let Err(err) = finished {
                    tracing::warn!(error = %err, "submitted unit did not complete");
                }
            }
        }
    }

    receiver.close();
    let drained = tokio::time::timeout(shutdown_grace, async {
        while units.join_next().await.is_some() {}
    })
    .await;
    if drained.is_err() {
        tracing::warn!(
            remaining = units.len(),
            "dropping units still running after shutdown grace period"
        );
    }
    units.shutdown().await;
}
