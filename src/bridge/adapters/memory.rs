//! In-memory provider adapter for tests and deterministic local flows.

use crate::bridge::{
    domain::{ProviderConfig, ProviderName, RemoteOperation},
    ports::{ProviderConnector, ProviderSession, ProviderSessionError, ProviderSessionResult},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock};
use std::time::Duration;

/// Handler producing the result of one in-memory operation.
pub type OperationHandler =
    Arc<dyn Fn(&Map<String, Value>) -> ProviderSessionResult<Value> + Send + Sync>;

/// Scripted provider that answers without spawning any process.
///
/// Clones share connection state and the invocation log, so a test can keep
/// one clone for assertions while the client drives another.
#[derive(Clone)]
pub struct InMemoryProvider {
    name: ProviderName,
    operations: Vec<RemoteOperation>,
    handlers: HashMap<String, OperationHandler>,
    connect_failure: Option<String>,
    disconnect_failure: Option<String>,
    invoke_delay: Option<Duration>,
    disconnect_delay: Option<Duration>,
    state: Arc<RwLock<InMemoryProviderState>>,
}

#[derive(Debug, Default)]
struct InMemoryProviderState {
    connected: bool,
    disconnect_attempts: usize,
    invocations: Vec<(String, Map<String, Value>)>,
}

impl InMemoryProvider {
    /// Creates a provider exposing no operations.
    #[must_use]
    pub fn new(name: ProviderName) -> Self {
        Self {
            name,
            operations: Vec::new(),
            handlers: HashMap::new(),
            connect_failure: None,
            disconnect_failure: None,
            invoke_delay: None,
            disconnect_delay: None,
            state: Arc::default(),
        }
    }

    /// Adds an operation answered by `handler`.
    ///
    /// An operation with the same name is replaced.
    #[must_use]
    pub fn with_operation<F>(mut self, operation: RemoteOperation, handler: F) -> Self
    where
        F: Fn(&Map<String, Value>) -> ProviderSessionResult<Value> + Send + Sync + 'static,
    {
        self.operations
            .retain(|existing| existing.name() != operation.name());
        self.handlers
            .insert(operation.name().to_owned(), Arc::new(handler));
        self.operations.push(operation);
        self
    }

    /// Makes `connect` fail with a protocol error carrying `reason`.
    #[must_use]
    pub fn failing_connect(mut self, reason: impl Into<String>) -> Self {
        self.connect_failure = Some(reason.into());
        self
    }

    /// Makes `disconnect` fail with a protocol error carrying `reason`.
    #[must_use]
    pub fn failing_disconnect(mut self, reason: impl Into<String>) -> Self {
        self.disconnect_failure = Some(reason.into());
        self
    }

    /// Suspends every invocation for `delay` before answering.
    #[must_use]
    pub const fn with_invoke_delay(mut self, delay: Duration) -> Self {
        self.invoke_delay = Some(delay);
        self
    }

    /// Suspends `disconnect` for `delay` before completing.
    #[must_use]
    pub const fn with_disconnect_delay(mut self, delay: Duration) -> Self {
        self.disconnect_delay = Some(delay);
        self
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
    }

    /// Returns whether the provider is currently connected.
    ///
    /// # Errors
    ///
    /// Returns provider runtime errors when lock acquisition fails.
    pub fn is_connected(&self) -> ProviderSessionResult<bool> {
        let state = self
            .state
            .read()
            .map_err(|err| ProviderSessionError::runtime(std::io::Error::other(err.to_string())))?;
        Ok(state.connected)
    }

    /// Returns how many times `disconnect` has been attempted.
    ///
    /// # Errors
    ///
    /// Returns provider runtime errors when lock acquisition fails.
    pub fn disconnect_attempts(&self) -> ProviderSessionResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|err| ProviderSessionError::runtime(std::io::Error::other(err.to_string())))?;
        Ok(state.disconnect_attempts)
    }

    /// Returns the argument sets received by `operation`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns provider runtime errors when lock acquisition fails.
    pub fn invocations(&self, operation: &str) -> ProviderSessionResult<Vec<Map<String, Value>>> {
        let state = self
            .state
            .read()
            .map_err(|err| ProviderSessionError::runtime(std::io::Error::other(err.to_string())))?;
        Ok(state
            .invocations
            .iter()
            .filter(|(name, _)| name == operation)
            .map(|(_, arguments)| arguments.clone())
            .collect())
    }

    /// Returns the total number of invocations across all operations.
    ///
    /// # Errors
    ///
    /// Returns provider runtime errors when lock acquisition fails.
    pub fn invocation_count(&self) -> ProviderSessionResult<usize> {
        let state = self
            .state
            .read()
            .map_err(|err| ProviderSessionError::runtime(std::io::Error::other(err.to_string())))?;
        Ok(state.invocations.len())
    }

    fn protocol_error(&self, reason: &str) -> ProviderSessionError {
        ProviderSessionError::Protocol {
            provider: self.name.clone(),
            reason: reason.to_owned(),
        }
    }
}

impl fmt::Debug for InMemoryProvider {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("InMemoryProvider")
            .field("name", &self.name)
            .field("operations", &self.operations.len())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ProviderSession for InMemoryProvider {
    async fn connect(&self) -> ProviderSessionResult<Vec<RemoteOperation>> {
        if let Some(reason) = &self.connect_failure {
            return Err(self.protocol_error(reason));
        }
        let mut state = self
            .state
            .write()
            .map_err(|err| ProviderSessionError::runtime(std::io::Error::other(err.to_string())))?;
        state.connected = true;
        Ok(self.operations.clone())
    }

    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> ProviderSessionResult<Value> {
        let handler = {
            let mut state = self.state.write().map_err(|err| {
                ProviderSessionError::runtime(std::io::Error::other(err.to_string()))
            })?;
            if !state.connected {
                return Err(ProviderSessionError::NotConnected(self.name.clone()));
            }
            let registered = self.handlers.get(operation).cloned().ok_or_else(|| {
                ProviderSessionError::UnknownOperation {
                    provider: self.name.clone(),
                    operation: operation.to_owned(),
                }
            })?;
            state
                .invocations
                .push((operation.to_owned(), arguments.clone()));
            registered
        };

        if let Some(delay) = self.invoke_delay {
            tokio::time::sleep(delay).await;
        }
        handler(&arguments)
    }

    async fn disconnect(&self) -> ProviderSessionResult<()> {
        {
            let mut state = self.state.write().map_err(|err| {
                ProviderSessionError::runtime(std::io::Error::other(err.to_string()))
            })?;
            state.disconnect_attempts += 1;
            state.connected = false;
        }

        if let Some(delay) = self.disconnect_delay {
            tokio::time::sleep(delay).await;
        }
        self.disconnect_failure
            .as_deref()
            .map_or(Ok(()), |reason| Err(self.protocol_error(reason)))
    }
}

/// Connector serving registered in-memory providers by name.
#[derive(Debug, Clone, Default)]
pub struct InMemoryProviderConnector {
    providers: HashMap<ProviderName, InMemoryProvider>,
}

impl InMemoryProviderConnector {
    /// Creates a connector with no providers.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a provider, replacing any provider with the same name.
    #[must_use]
    pub fn with_provider(mut self, provider: InMemoryProvider) -> Self {
        self.providers.insert(provider.name().clone(), provider);
        self
    }

    /// Returns the registered provider named `name`.
    #[must_use]
    pub fn provider(&self, name: &ProviderName) -> Option<&InMemoryProvider> {
        self.providers.get(name)
    }
}

impl ProviderConnector for InMemoryProviderConnector {
    fn open(&self, config: &ProviderConfig) -> ProviderSessionResult<Arc<dyn ProviderSession>> {
        let provider = self
            .providers
            .get(config.name())
            .cloned()
            .ok_or_else(|| ProviderSessionError::Spawn {
                provider: config.name().clone(),
                reason: "no in-memory provider registered under this name".to_owned(),
            })?;
        Ok(Arc::new(provider))
    }
}
