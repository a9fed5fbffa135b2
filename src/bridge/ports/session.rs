//! Provider session port: the asynchronous client to one tool provider.

use crate::bridge::domain::{ProviderConfig, ProviderName, RemoteOperation};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::sync::Arc;
use thiserror::Error;

/// Result type for provider session operations.
pub type ProviderSessionResult<T> = Result<T, ProviderSessionError>;

/// Live connection contract for one tool provider.
///
/// Implementations are driven exclusively from units running on the
/// scheduler worker; callers never touch a session directly.
#[async_trait]
pub trait ProviderSession: Send + Sync {
    /// Establishes the connection and returns the operations the provider
    /// exposes.
    async fn connect(&self) -> ProviderSessionResult<Vec<RemoteOperation>>;

    /// Invokes one operation with a keyed argument set and returns the
    /// provider's raw result.
    async fn invoke(
        &self,
        operation: &str,
        arguments: Map<String, Value>,
    ) -> ProviderSessionResult<Value>;

    /// Releases the connection and any transport resources.
    async fn disconnect(&self) -> ProviderSessionResult<()>;
}

/// Opens unconnected sessions for provider configurations.
///
/// Opening performs no I/O; the returned session connects when
/// [`ProviderSession::connect`] runs on the scheduler.
pub trait ProviderConnector: Send + Sync {
    /// Creates a session for `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ProviderSessionError::UnsupportedTransport`] when the
    /// connector cannot serve the configured transport.
    fn open(&self, config: &ProviderConfig) -> ProviderSessionResult<Arc<dyn ProviderSession>>;
}

/// Errors returned by provider session adapters.
#[derive(Debug, Clone, Error)]
pub enum ProviderSessionError {
    /// The session has not connected, or has already disconnected.
    #[error("provider {0} is not connected")]
    NotConnected(ProviderName),

    /// The connector cannot serve the provider's transport.
    #[error("unsupported transport for provider {provider}: {reason}")]
    UnsupportedTransport {
        /// Provider name.
        provider: ProviderName,
        /// Reason string.
        reason: String,
    },

    /// The provider process could not be started.
    #[error("failed to spawn provider {provider}: {reason}")]
    Spawn {
        /// Provider name.
        provider: ProviderName,
        /// Reason string.
        reason: String,
    },

    /// The provider violated the wire protocol or the transport failed.
    #[error("protocol error for provider {provider}: {reason}")]
    Protocol {
        /// Provider name.
        provider: ProviderName,
        /// Reason string.
        reason: String,
    },

    /// The provider rejected the request.
    #[error("provider error [{code}]: {message}")]
    Remote {
        /// Provider-defined error code.
        code: i64,
        /// Provider-supplied message.
        message: String,
        /// Optional structured detail.
        data: Option<Box<Value>>,
    },

    /// The provider does not expose the requested operation.
    #[error("provider {provider} has no operation '{operation}'")]
    UnknownOperation {
        /// Provider name.
        provider: ProviderName,
        /// Requested operation name.
        operation: String,
    },

    /// A connect or disconnect exceeded its time budget.
    #[error("provider {provider} did not finish {phase} within {timeout_ms}ms")]
    Timeout {
        /// Provider name.
        provider: ProviderName,
        /// Lifecycle phase that timed out.
        phase: &'static str,
        /// Budget in milliseconds.
        timeout_ms: u64,
    },

    /// Generic runtime failure.
    #[error("provider runtime error: {0}")]
    Runtime(Arc<dyn std::error::Error + Send + Sync>),
}

impl ProviderSessionError {
    /// Wraps a runtime error from a session adapter.
    #[must_use]
    pub fn runtime(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Runtime(Arc::new(err))
    }
}
