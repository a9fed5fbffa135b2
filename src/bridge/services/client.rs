//! Session lifecycle manager: the synchronous client façade.

use super::{
    adapter::{AdapterCallError, OperationDescriptor, SyncAdapter},
    scheduler::{SchedulerBridge, SchedulerError, UsageError},
};
use crate::bridge::{
    domain::{
        AdapterId, BridgeDomainError, CallArguments, ClientConfig, ClientId,
        ClientLifecycleState, ProviderName, SchemaError,
    },
    ports::{ProviderConnector, ProviderSession, ProviderSessionError, ProviderSessionResult},
};
use chrono::{DateTime, Utc};
use mockable::Clock;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

type SessionHandle = (ProviderName, Arc<dyn ProviderSession>);

/// Service-level errors for the synchronous client.
#[derive(Debug, Error)]
pub enum SyncClientError {
    /// Domain validation failed.
    #[error(transparent)]
    Domain(#[from] BridgeDomainError),

    /// An operation's parameter schema is unsupported; startup was aborted.
    #[error("provider {provider} operation '{operation}' has an unsupported schema: {source}")]
    Configuration {
        /// Provider exposing the operation.
        provider: ProviderName,
        /// Operation whose schema was rejected.
        operation: String,
        /// Translation failure.
        #[source]
        source: SchemaError,
    },

    /// Two discovered operations map to the same adapter identifier.
    #[error("duplicate adapter identifier: {0}")]
    DuplicateAdapter(AdapterId),

    /// A provider could not be opened or connected; startup was aborted.
    #[error("provider {provider} failed to start: {source}")]
    Startup {
        /// First provider that failed.
        provider: ProviderName,
        /// Session failure.
        #[source]
        source: ProviderSessionError,
    },

    /// The scheduler failed.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The client was used outside its lifecycle.
    #[error(transparent)]
    Usage(#[from] UsageError),

    /// No adapter has the requested identifier.
    #[error("unknown adapter: {0}")]
    UnknownAdapter(String),

    /// An adapter call failed.
    #[error(transparent)]
    Call(#[from] AdapterCallError),
}

/// Result type for client operations.
pub type SyncClientResult<T> = Result<T, SyncClientError>;

/// Snapshot of one connected provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderStatus {
    name: ProviderName,
    transport_kind: &'static str,
    operation_count: usize,
    connected_at: DateTime<Utc>,
}

impl ProviderStatus {
    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
    }

    /// Returns the configured transport kind.
    #[must_use]
    pub const fn transport_kind(&self) -> &'static str {
        self.transport_kind
    }

    /// Returns how many operations the provider exposed.
    #[must_use]
    pub const fn operation_count(&self) -> usize {
        self.operation_count
    }

    /// Returns when startup completed for this provider.
    #[must_use]
    pub const fn connected_at(&self) -> DateTime<Utc> {
        self.connected_at
    }
}

/// A provider whose disconnect failed during `close`.
#[derive(Debug, Clone)]
pub struct DisconnectFailure {
    /// Provider name.
    pub provider: ProviderName,
    /// Failure reported by the session or by the timeout.
    pub error: ProviderSessionError,
}

/// Outcome of closing a client.
#[derive(Debug, Clone)]
pub struct ShutdownReport {
    closed_at: DateTime<Utc>,
    disconnected: Vec<ProviderName>,
    failures: Vec<DisconnectFailure>,
}

impl ShutdownReport {
    /// Returns when the client finished closing.
    #[must_use]
    pub const fn closed_at(&self) -> DateTime<Utc> {
        self.closed_at
    }

    /// Returns providers that disconnected cleanly.
    #[must_use]
    pub fn disconnected(&self) -> &[ProviderName] {
        &self.disconnected
    }

    /// Returns providers whose disconnect failed.
    #[must_use]
    pub fn failures(&self) -> &[DisconnectFailure] {
        &self.failures
    }

    /// Returns whether every provider disconnected cleanly.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Synchronous client over every configured provider.
///
/// Lifecycle: `Unstarted -> start() -> Active -> close() -> Closed`. A failed
/// startup leaves the client `Closed` with nothing running.
///
/// Dropping an active client closes it. When the drop happens inside an
/// asynchronous runtime, where blocking on the scheduler would panic, the
/// scheduler is stopped and sessions are released without `disconnect`.
pub struct SyncToolClient<C>
where
    C: Clock + Send + Sync,
{
    id: ClientId,
    config: ClientConfig,
    connector: Arc<dyn ProviderConnector>,
    clock: Arc<C>,
    state: ClientLifecycleState,
    scheduler: Option<Arc<SchedulerBridge>>,
    sessions: Vec<SessionHandle>,
    statuses: Vec<ProviderStatus>,
    adapters: Vec<SyncAdapter>,
}

impl<C> SyncToolClient<C>
where
    C: Clock + Send + Sync,
{
    /// Creates an unstarted client.
    ///
    /// # Errors
    ///
    /// Returns [`SyncClientError::Domain`] when the configuration repeats a
    /// provider name or carries an invalid transport.
    pub fn new(
        config: ClientConfig,
        connector: Arc<dyn ProviderConnector>,
        clock: Arc<C>,
    ) -> SyncClientResult<Self> {
        config.validate()?;
        Ok(Self {
            id: ClientId::new(),
            config,
            connector,
            clock,
            state: ClientLifecycleState::Unstarted,
            scheduler: None,
            sessions: Vec::new(),
            statuses: Vec::new(),
            adapters: Vec::new(),
        })
    }

    /// Creates and starts a client in one step.
    ///
    /// # Errors
    ///
    /// Returns the errors of [`SyncToolClient::new`] and
    /// [`SyncToolClient::start`].
    pub fn connect(
        config: ClientConfig,
        connector: Arc<dyn ProviderConnector>,
        clock: Arc<C>,
    ) -> SyncClientResult<Self> {
        let mut client = Self::new(config, connector, clock)?;
        client.start()?;
        Ok(client)
    }

    /// Returns the client identifier.
    #[must_use]
    pub const fn id(&self) -> ClientId {
        self.id
    }

    /// Returns the current lifecycle state.
    #[must_use]
    pub const fn state(&self) -> ClientLifecycleState {
        self.state
    }

    /// Returns the adapters built at startup, grouped by provider in
    /// configuration order. Empty unless the client is active.
    #[must_use]
    pub fn adapters(&self) -> &[SyncAdapter] {
        &self.adapters
    }

    /// Finds an adapter by identifier.
    #[must_use]
    pub fn adapter(&self, id: &str) -> Option<&SyncAdapter> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id().as_str() == id)
    }

    /// Returns a status snapshot per connected provider.
    #[must_use]
    pub fn providers(&self) -> &[ProviderStatus] {
        &self.statuses
    }

    /// Starts the scheduler, connects every provider in configuration order
    /// and synthesizes one adapter per discovered operation.
    ///
    /// Startup is all-or-nothing: on any failure the providers connected so
    /// far are disconnected, the scheduler is stopped and the client becomes
    /// `Closed`.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidState`] unless the client is unstarted,
    /// [`SyncClientError::Startup`] naming the first provider that could not
    /// be opened or connected, [`SyncClientError::Configuration`] for an
    /// unsupported schema, [`SyncClientError::DuplicateAdapter`] for
    /// colliding identifiers, and scheduler errors.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous runtime context.
    pub fn start(&mut self) -> SyncClientResult<&[SyncAdapter]> {
        self.ensure_state("start", ClientLifecycleState::Unstarted)?;
        let options = *self.config.options();

        let scheduler = match SchedulerBridge::start(self.id, options.shutdown_grace()) {
            Ok(started) => Arc::new(started),
            Err(err) => {
                self.state = self.state.transition_to(ClientLifecycleState::Closed)?;
                return Err(err.into());
            }
        };

        let discovery = self.open_sessions().and_then(|sessions| {
            scheduler
                .submit(discover_all(
                    sessions,
                    options.connect_timeout(),
                    options.disconnect_timeout(),
                ))
                .map_err(SyncClientError::from)
                .and_then(|outcome| outcome.map_err(SyncClientError::from))
        });

        match discovery {
            Ok(discovered) => {
                self.activate(&scheduler, discovered)?;
                tracing::info!(
                    client = %self.id,
                    providers = self.statuses.len(),
                    adapters = self.adapters.len(),
                    "sync tool client started"
                );
                self.scheduler = Some(scheduler);
                Ok(&self.adapters)
            }
            Err(err) => {
                tracing::error!(client = %self.id, error = %err, "sync tool client startup aborted");
                self.state = self.state.transition_to(ClientLifecycleState::Closed)?;
                if let Err(stop_err) = scheduler.stop() {
                    tracing::warn!(client = %self.id, error = %stop_err, "scheduler stop after failed startup");
                }
                Err(err)
            }
        }
    }

    /// Invokes an adapter by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidState`] unless the client is active,
    /// [`SyncClientError::UnknownAdapter`] for an unknown identifier, and
    /// [`SyncClientError::Call`] for call failures.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous runtime context.
    pub fn call(&self, id: &str, arguments: CallArguments) -> SyncClientResult<Value> {
        self.ensure_state("call", ClientLifecycleState::Active)?;
        let adapter = self
            .adapter(id)
            .ok_or_else(|| SyncClientError::UnknownAdapter(id.to_owned()))?;
        Ok(adapter.call(arguments)?)
    }

    /// Disconnects every provider, stops the scheduler and joins its worker.
    ///
    /// Disconnect failures are recorded in the report and never stop the
    /// sweep. Adapters retained by callers fail with a usage error afterwards.
    ///
    /// # Errors
    ///
    /// Returns [`UsageError::InvalidState`] unless the client is active and
    /// [`SyncClientError::Scheduler`] when the worker panicked. The worker is
    /// joined in both cases.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous runtime context.
    pub fn close(&mut self) -> SyncClientResult<ShutdownReport> {
        self.ensure_state("close", ClientLifecycleState::Active)?;
        self.state = self.state.transition_to(ClientLifecycleState::Closed)?;
        self.adapters.clear();
        self.statuses.clear();
        let sessions = std::mem::take(&mut self.sessions);
        let Some(scheduler) = self.scheduler.take() else {
            return Err(UsageError::SchedulerStopped.into());
        };

        let names: Vec<ProviderName> = sessions.iter().map(|(name, _)| name.clone()).collect();
        let timeout = self.config.options().disconnect_timeout();
        let failures = match scheduler.submit(disconnect_all(sessions, timeout)) {
            Ok(failures) => failures,
            Err(err) => {
                tracing::warn!(client = %self.id, error = %err, "teardown unit did not complete");
                let error = ProviderSessionError::Runtime(Arc::new(err));
                names
                    .iter()
                    .map(|provider| DisconnectFailure {
                        provider: provider.clone(),
                        error: error.clone(),
                    })
                    .collect()
            }
        };
        for failure in &failures {
            tracing::warn!(
                client = %self.id,
                provider = %failure.provider,
                error = %failure.error,
                "provider disconnect failed"
            );
        }

        let stopped = scheduler.stop();
        let report = ShutdownReport {
            closed_at: self.clock.utc(),
            disconnected: names
                .into_iter()
                .filter(|name| !failures.iter().any(|failure| &failure.provider == name))
                .collect(),
            failures,
        };
        stopped?;

        tracing::info!(
            client = %self.id,
            disconnected = report.disconnected.len(),
            failed = report.failures.len(),
            "sync tool client closed"
        );
        Ok(report)
    }

    /// Closes without the blocking disconnect sweep, for drops inside an
    /// asynchronous runtime where `close` would panic. Sessions are released
    /// without `disconnect`.
    fn abandon(&mut self) {
        tracing::warn!(
            client = %self.id,
            providers = self.sessions.len(),
            "client dropped inside an async runtime; providers released without disconnect"
        );
        self.state = ClientLifecycleState::Closed;
        self.adapters.clear();
        self.statuses.clear();
        self.sessions.clear();
        if let Some(scheduler) = self.scheduler.take() {
            if let Err(err) = scheduler.stop() {
                tracing::warn!(client = %self.id, error = %err, "scheduler stop on drop failed");
            }
        }
    }

    fn ensure_state(
        &self,
        operation: &'static str,
        expected: ClientLifecycleState,
    ) -> Result<(), UsageError> {
        if self.state == expected {
            Ok(())
        } else {
            Err(UsageError::InvalidState {
                operation,
                state: self.state,
            })
        }
    }

    fn open_sessions(&self) -> SyncClientResult<Vec<SessionHandle>> {
        self.config
            .providers()
            .iter()
            .map(|provider| {
                self.connector
                    .open(provider)
                    .map(|session| (provider.name().clone(), session))
                    .map_err(|source| SyncClientError::Startup {
                        provider: provider.name().clone(),
                        source,
                    })
            })
            .collect()
    }

    fn activate(
        &mut self,
        scheduler: &Arc<SchedulerBridge>,
        discovered: Vec<DiscoveredProvider>,
    ) -> SyncClientResult<()> {
        self.state = self.state.transition_to(ClientLifecycleState::Active)?;
        let connected_at = self.clock.utc();

        for provider in discovered {
            let transport_kind = self
                .config
                .providers()
                .iter()
                .find(|config| config.name() == &provider.name)
                .map_or("unknown", |config| config.transport().kind());
            self.statuses.push(ProviderStatus {
                name: provider.name.clone(),
                transport_kind,
                operation_count: provider.descriptors.len(),
                connected_at,
            });
            self.adapters.extend(
                provider
                    .descriptors
                    .into_iter()
                    .map(|descriptor| SyncAdapter::synthesize(descriptor, Arc::clone(scheduler))),
            );
            self.sessions.push((provider.name, provider.session));
        }
        Ok(())
    }
}

impl<C> Drop for SyncToolClient<C>
where
    C: Clock + Send + Sync,
{
    fn drop(&mut self) {
        if !self.state.accepts_calls() {
            return;
        }
        if tokio::runtime::Handle::try_current().is_ok() {
            self.abandon();
            return;
        }
        if let Err(err) = self.close() {
            tracing::warn!(client = %self.id, error = %err, "close on drop failed");
        }
    }
}

impl<C> std::fmt::Debug for SyncToolClient<C>
where
    C: Clock + Send + Sync,
{
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        formatter
            .debug_struct("SyncToolClient")
            .field("id", &self.id)
            .field("state", &self.state)
            .field("providers", &self.statuses)
            .field("adapters", &self.adapters.len())
            .finish_non_exhaustive()
    }
}

struct DiscoveredProvider {
    name: ProviderName,
    session: Arc<dyn ProviderSession>,
    descriptors: Vec<OperationDescriptor>,
}

enum DiscoveryFailure {
    Connect {
        provider: ProviderName,
        source: ProviderSessionError,
    },
    Schema {
        provider: ProviderName,
        operation: String,
        source: SchemaError,
    },
    Duplicate(AdapterId),
}

impl From<DiscoveryFailure> for SyncClientError {
    fn from(failure: DiscoveryFailure) -> Self {
        match failure {
            DiscoveryFailure::Connect { provider, source } => Self::Startup { provider, source },
            DiscoveryFailure::Schema {
                provider,
                operation,
                source,
            } => Self::Configuration {
                provider,
                operation,
                source,
            },
            DiscoveryFailure::Duplicate(id) => Self::DuplicateAdapter(id),
        }
    }
}

/// Connect-and-discover unit. Runs on the scheduler.
async fn discover_all(
    sessions: Vec<SessionHandle>,
    connect_timeout: Duration,
    disconnect_timeout: Duration,
) -> Result<Vec<DiscoveredProvider>, DiscoveryFailure> {
    let mut discovered: Vec<DiscoveredProvider> = Vec::with_capacity(sessions.len());
    let mut seen_ids = HashSet::new();

    for (name, session) in sessions {
        let outcome = discover_one(&name, &session, connect_timeout, &mut seen_ids).await;
        match outcome {
            Ok(descriptors) => {
                tracing::info!(provider = %name, operations = descriptors.len(), "provider connected");
                discovered.push(DiscoveredProvider {
                    name,
                    session,
                    descriptors,
                });
            }
            Err(failure) => {
                let mut rollback: Vec<SessionHandle> = discovered
                    .into_iter()
                    .map(|provider| (provider.name, provider.session))
                    .collect();
                if !matches!(failure, DiscoveryFailure::Connect { .. }) {
                    rollback.push((name, session));
                }
                for rollback_failure in disconnect_all(rollback, disconnect_timeout).await {
                    tracing::warn!(
                        provider = %rollback_failure.provider,
                        error = %rollback_failure.error,
                        "disconnect during startup rollback failed"
                    );
                }
                return Err(failure);
            }
        }
    }

    Ok(discovered)
}

async fn discover_one(
    name: &ProviderName,
    session: &Arc<dyn ProviderSession>,
    connect_timeout: Duration,
    seen_ids: &mut HashSet<AdapterId>,
) -> Result<Vec<OperationDescriptor>, DiscoveryFailure> {
    let operations = tokio::time::timeout(connect_timeout, session.connect())
        .await
        .map_err(|_| ProviderSessionError::Timeout {
            provider: name.clone(),
            phase: "connect",
            timeout_ms: duration_millis(connect_timeout),
        })
        .and_then(|connected| connected)
        .map_err(|source| DiscoveryFailure::Connect {
            provider: name.clone(),
            source,
        })?;

    let mut descriptors = Vec::with_capacity(operations.len());
    for operation in operations {
        let operation_name = operation.name().to_owned();
        let descriptor = OperationDescriptor::new(name.clone(), operation, Arc::clone(session))
            .map_err(|source| DiscoveryFailure::Schema {
                provider: name.clone(),
                operation: operation_name,
                source,
            })?;
        if !seen_ids.insert(descriptor.id().clone()) {
            return Err(DiscoveryFailure::Duplicate(descriptor.id().clone()));
        }
        descriptors.push(descriptor);
    }
    Ok(descriptors)
}

/// Teardown unit. Runs on the scheduler; never stops early.
///
/// Each disconnect runs as its own task so a panicking session is recorded as
/// a failure and the sweep moves on to the next provider.
async fn disconnect_all(sessions: Vec<SessionHandle>, timeout: Duration) -> Vec<DisconnectFailure> {
    let mut failures = Vec::new();
    for (provider, session) in sessions {
        let task_provider = provider.clone();
        let task = tokio::spawn(async move {
            disconnect_within(&task_provider, session.as_ref(), timeout).await
        });
        let outcome = task
            .await
            .unwrap_or_else(|join_err| Err(ProviderSessionError::runtime(join_err)));
        if let Err(error) = outcome {
            failures.push(DisconnectFailure { provider, error });
        }
    }
    failures
}

async fn disconnect_within(
    provider: &ProviderName,
    session: &dyn ProviderSession,
    timeout: Duration,
) -> ProviderSessionResult<()> {
    tokio::time::timeout(timeout, session.disconnect())
        .await
        .map_err(|_| ProviderSessionError::Timeout {
            provider: provider.clone(),
            phase: "disconnect",
            timeout_ms: duration_millis(timeout),
        })?
}

fn duration_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
