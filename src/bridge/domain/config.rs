//! Provider and client configuration.

use super::{BridgeDomainError, ProviderName, ProviderTransport};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_CONNECT_TIMEOUT_MS: u64 = 30_000;
const DEFAULT_DISCONNECT_TIMEOUT_MS: u64 = 5_000;
const DEFAULT_SHUTDOWN_GRACE_MS: u64 = 1_000;

/// Identifies one tool provider and how to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    name: ProviderName,
    transport: ProviderTransport,
}

impl ProviderConfig {
    /// Creates a provider configuration.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError`] when the name is invalid.
    pub fn new(
        name: impl Into<String>,
        transport: ProviderTransport,
    ) -> Result<Self, BridgeDomainError> {
        Ok(Self {
            name: ProviderName::new(name)?,
            transport,
        })
    }

    /// Returns the provider name.
    #[must_use]
    pub const fn name(&self) -> &ProviderName {
        &self.name
    }

    /// Returns the transport settings.
    #[must_use]
    pub const fn transport(&self) -> &ProviderTransport {
        &self.transport
    }
}

/// Timing knobs for a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientOptions {
    /// Upper bound on one provider's `connect`, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Upper bound on one provider's `disconnect`, in milliseconds.
    pub disconnect_timeout_ms: u64,
    /// Time granted to still-running units when the scheduler stops, in
    /// milliseconds.
    pub shutdown_grace_ms: u64,
}

impl ClientOptions {
    /// Returns the connect timeout.
    #[must_use]
    pub const fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Returns the disconnect timeout.
    #[must_use]
    pub const fn disconnect_timeout(&self) -> Duration {
        Duration::from_millis(self.disconnect_timeout_ms)
    }

    /// Returns the scheduler shutdown grace period.
    #[must_use]
    pub const fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            connect_timeout_ms: DEFAULT_CONNECT_TIMEOUT_MS,
            disconnect_timeout_ms: DEFAULT_DISCONNECT_TIMEOUT_MS,
            shutdown_grace_ms: DEFAULT_SHUTDOWN_GRACE_MS,
        }
    }
}

/// Ordered provider set plus session options.
///
/// Providers are connected in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(default)]
    providers: Vec<ProviderConfig>,
    #[serde(default)]
    options: ClientOptions,
}

/// Errors returned while reading or parsing a client configuration.
#[derive(Debug, Error)]
pub enum ClientConfigError {
    /// The configuration source could not be read.
    #[error("failed to read client config '{path}': {source}")]
    Read {
        /// Path of the configuration file.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON for this schema.
    #[error("failed to parse client config: {0}")]
    Parse(#[from] serde_json::Error),

    /// The configuration parsed but violates a domain invariant.
    #[error(transparent)]
    Invalid(#[from] BridgeDomainError),
}

impl ClientConfig {
    /// Creates an empty configuration with default options.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a provider.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::DuplicateProvider`] when a provider with
    /// the same name is already present.
    pub fn with_provider(mut self, provider: ProviderConfig) -> Result<Self, BridgeDomainError> {
        if self
            .providers
            .iter()
            .any(|existing| existing.name() == provider.name())
        {
            return Err(BridgeDomainError::DuplicateProvider(provider.name().clone()));
        }
        self.providers.push(provider);
        Ok(self)
    }

    /// Replaces the session options.
    #[must_use]
    pub const fn with_options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// # Errors
    ///
    /// Returns [`ClientConfigError::Parse`] for malformed JSON and
    /// [`ClientConfigError::Invalid`] when names repeat or transports are
    /// invalid.
    pub fn from_json_str(document: &str) -> Result<Self, ClientConfigError> {
        let config: Self = serde_json::from_str(document)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks provider-name uniqueness and transport invariants.
    ///
    /// # Errors
    ///
    /// Returns the first [`BridgeDomainError`] found.
    pub fn validate(&self) -> Result<(), BridgeDomainError> {
        let mut seen = HashSet::new();
        for provider in &self.providers {
            provider.transport().validate()?;
            if !seen.insert(provider.name()) {
                return Err(BridgeDomainError::DuplicateProvider(provider.name().clone()));
            }
        }
        Ok(())
    }

    /// Returns the providers in connection order.
    #[must_use]
    pub fn providers(&self) -> &[ProviderConfig] {
        &self.providers
    }

    /// Returns the session options.
    #[must_use]
    pub const fn options(&self) -> &ClientOptions {
        &self.options
    }
}
