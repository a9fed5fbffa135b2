//! Synchronous adapters synthesized from discovered operations.

use super::scheduler::{SchedulerBridge, SchedulerError};
use crate::bridge::{
    domain::{
        AdapterId, ArgumentBindingError, CallArguments, ParameterList, ProviderName,
        RemoteOperation, SchemaError, translate_schema,
    },
    ports::{ProviderSession, ProviderSessionError},
};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// A discovered operation bound to the session that exposes it.
#[derive(Clone)]
pub struct OperationDescriptor {
    id: AdapterId,
    provider: ProviderName,
    operation: RemoteOperation,
    parameters: ParameterList,
    session: Arc<dyn ProviderSession>,
}

impl OperationDescriptor {
    /// Builds a descriptor, translating the operation's parameter schema.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError`] when the schema is not a supported shape.
    pub fn new(
        provider: ProviderName,
        operation: RemoteOperation,
        session: Arc<dyn ProviderSession>,
    ) -> Result<Self, SchemaError> {
        let parameters = translate_schema(operation.input_schema())?;
        Ok(Self {
            id: AdapterId::qualified(&provider, operation.name()),
            provider,
            operation,
            parameters,
            session,
        })
    }

    /// Returns the globally unique adapter identifier.
    #[must_use]
    pub const fn id(&self) -> &AdapterId {
        &self.id
    }

    /// Returns the originating provider.
    #[must_use]
    pub const fn provider(&self) -> &ProviderName {
        &self.provider
    }

    /// Returns the operation name as the provider knows it.
    #[must_use]
    pub fn operation_name(&self) -> &str {
        self.operation.name()
    }

    /// Returns the operation description.
    #[must_use]
    pub fn description(&self) -> &str {
        self.operation.description()
    }

    /// Returns the translated parameters in declaration order.
    #[must_use]
    pub const fn parameters(&self) -> &ParameterList {
        &self.parameters
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("OperationDescriptor")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("operation", &self.operation)
            .field("parameters", &self.parameters)
            .finish_non_exhaustive()
    }
}

/// Errors returned by a synchronous adapter call.
#[derive(Debug, Error)]
pub enum AdapterCallError {
    /// Arguments did not match the parameter list; nothing was sent.
    #[error("cannot call {adapter}: {source}")]
    Binding {
        /// Adapter that rejected the arguments.
        adapter: AdapterId,
        /// Binding failure.
        #[source]
        source: ArgumentBindingError,
    },

    /// The scheduler refused or lost the unit.
    #[error(transparent)]
    Scheduler(#[from] SchedulerError),

    /// The provider's own failure, unchanged.
    #[error(transparent)]
    Invocation(#[from] ProviderSessionError),
}

/// Blocking callable for one remote operation.
///
/// Cloning is cheap; clones share the descriptor and the scheduler.
#[derive(Clone)]
pub struct SyncAdapter {
    descriptor: Arc<OperationDescriptor>,
    scheduler: Arc<SchedulerBridge>,
}

impl SyncAdapter {
    /// Wraps a descriptor so it can be called from synchronous code.
    #[must_use]
    pub fn synthesize(descriptor: OperationDescriptor, scheduler: Arc<SchedulerBridge>) -> Self {
        Self {
            descriptor: Arc::new(descriptor),
            scheduler,
        }
    }

    /// Returns the adapter identifier.
    #[must_use]
    pub fn id(&self) -> &AdapterId {
        self.descriptor.id()
    }

    /// Returns the wrapped descriptor.
    #[must_use]
    pub fn descriptor(&self) -> &OperationDescriptor {
        &self.descriptor
    }

    /// Returns the parameters callers bind against.
    #[must_use]
    pub fn parameters(&self) -> &ParameterList {
        self.descriptor.parameters()
    }

    /// Invokes the operation and blocks until the provider answers.
    ///
    /// Arguments are bound before anything reaches the scheduler, so a
    /// missing required argument never causes provider traffic. In-flight
    /// calls cannot be cancelled.
    ///
    /// # Errors
    ///
    /// Returns [`AdapterCallError::Binding`] for argument mismatches,
    /// [`AdapterCallError::Scheduler`] when the client has been closed, and
    /// [`AdapterCallError::Invocation`] carrying the provider's error.
    ///
    /// # Panics
    ///
    /// Panics when called from a unit running on the client's own scheduler.
    pub fn call(&self, arguments: CallArguments) -> Result<Value, AdapterCallError> {
        let bound =
            arguments
                .bind(self.parameters())
                .map_err(|source| AdapterCallError::Binding {
                    adapter: self.id().clone(),
                    source,
                })?;

        tracing::debug!(adapter = %self.id(), arguments = bound.len(), "dispatching adapter call");

        let session = Arc::clone(&self.descriptor.session);
        let operation = self.descriptor.operation_name().to_owned();
        let outcome = self
            .scheduler
            .submit(async move { session.invoke(&operation, bound).await })?;
        Ok(outcome?)
    }

    /// Invokes the operation with named arguments only.
    ///
    /// # Errors
    ///
    /// See [`SyncAdapter::call`].
    ///
    /// # Panics
    ///
    /// See [`SyncAdapter::call`].
    pub fn call_named(&self, arguments: Map<String, Value>) -> Result<Value, AdapterCallError> {
        self.call(CallArguments::from_named(arguments))
    }

    /// Invokes the operation with positional arguments only, matched to
    /// parameters in declaration order.
    ///
    /// # Errors
    ///
    /// See [`SyncAdapter::call`].
    ///
    /// # Panics
    ///
    /// See [`SyncAdapter::call`].
    pub fn call_positional(&self, arguments: Vec<Value>) -> Result<Value, AdapterCallError> {
        self.call(CallArguments::from_positional(arguments))
    }
}

impl fmt::Debug for SyncAdapter {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("SyncAdapter")
            .field("id", self.id())
            .field("parameters", self.parameters())
            .finish_non_exhaustive()
    }
}
