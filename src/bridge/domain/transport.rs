//! How the client reaches each provider.
//!
//! Only `stdio` providers are served by the bundled connector. `http_sse`
//! entries parse and validate so a configuration can name them, but serving
//! them needs a connector of its own.

use super::BridgeDomainError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Command line, environment and directory used to spawn a provider process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StdioTransportConfig {
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: BTreeMap<String, String>,
    #[serde(default)]
    working_directory: Option<String>,
}

impl StdioTransportConfig {
    /// Spawns `command` with no arguments and the inherited environment.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::EmptyStdioCommand`] for a blank command.
    pub fn new(command: impl Into<String>) -> Result<Self, BridgeDomainError> {
        Ok(Self {
            command: non_blank(&command.into(), || BridgeDomainError::EmptyStdioCommand)?,
            args: Vec::new(),
            env: BTreeMap::new(),
            working_directory: None,
        })
    }

    /// Sets the process arguments, in order.
    #[must_use]
    pub fn with_args(mut self, args: impl IntoIterator<Item = String>) -> Self {
        self.args = args.into_iter().collect();
        self
    }

    /// Sets variables added to the inherited environment.
    #[must_use]
    pub fn with_env(mut self, variables: impl IntoIterator<Item = (String, String)>) -> Self {
        self.env = variables.into_iter().collect();
        self
    }

    /// Runs the provider from `directory` instead of the caller's directory.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::EmptyWorkingDirectory`] for a blank path.
    pub fn with_working_directory(
        mut self,
        directory: impl Into<String>,
    ) -> Result<Self, BridgeDomainError> {
        self.working_directory = Some(non_blank(&directory.into(), || {
            BridgeDomainError::EmptyWorkingDirectory
        })?);
        Ok(self)
    }

    /// Program to spawn.
    #[must_use]
    pub fn command(&self) -> &str {
        &self.command
    }

    /// Process arguments.
    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Extra environment variables.
    #[must_use]
    pub const fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Directory the provider runs in, when set.
    #[must_use]
    pub fn working_directory(&self) -> Option<&str> {
        self.working_directory.as_deref()
    }

    fn validate(&self) -> Result<(), BridgeDomainError> {
        if is_blank(&self.command) {
            return Err(BridgeDomainError::EmptyStdioCommand);
        }
        match self.working_directory.as_deref() {
            Some(directory) if is_blank(directory) => {
                Err(BridgeDomainError::EmptyWorkingDirectory)
            }
            _ => Ok(()),
        }
    }
}

/// Endpoint of a provider reached over HTTP with server-sent events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HttpSseTransportConfig {
    base_url: String,
}

impl HttpSseTransportConfig {
    /// Points at `base_url`, which must use `http` or `https`.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::EmptyHttpSseBaseUrl`] for a blank URL and
    /// [`BridgeDomainError::InvalidHttpSseBaseUrl`] for any other scheme.
    pub fn new(base_url: impl Into<String>) -> Result<Self, BridgeDomainError> {
        let url = base_url.into().trim().to_owned();
        check_base_url(&url)?;
        Ok(Self { base_url: url })
    }

    /// Provider endpoint.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

/// Transport declared for one provider in the client configuration.
///
/// Serialized as `{"kind": "stdio" | "http_sse", "config": {...}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "config")]
pub enum ProviderTransport {
    /// Child process speaking line-delimited JSON-RPC on stdin and stdout.
    Stdio(StdioTransportConfig),
    /// Remote provider over HTTP+SSE.
    HttpSse(HttpSseTransportConfig),
}

impl ProviderTransport {
    /// Shorthand for a `stdio` transport with no arguments.
    ///
    /// # Errors
    ///
    /// See [`StdioTransportConfig::new`].
    pub fn stdio(command: impl Into<String>) -> Result<Self, BridgeDomainError> {
        StdioTransportConfig::new(command).map(Self::Stdio)
    }

    /// Shorthand for an `http_sse` transport.
    ///
    /// # Errors
    ///
    /// See [`HttpSseTransportConfig::new`].
    pub fn http_sse(base_url: impl Into<String>) -> Result<Self, BridgeDomainError> {
        HttpSseTransportConfig::new(base_url).map(Self::HttpSse)
    }

    /// Serialized `kind` tag, also reported in provider status snapshots.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Stdio(_) => "stdio",
            Self::HttpSse(_) => "http_sse",
        }
    }

    /// Checks a deserialized transport, which skipped the constructors.
    ///
    /// # Errors
    ///
    /// Returns the errors the constructors would have returned.
    pub fn validate(&self) -> Result<(), BridgeDomainError> {
        match self {
            Self::Stdio(config) => config.validate(),
            Self::HttpSse(config) => check_base_url(config.base_url.trim()),
        }
    }
}

fn is_blank(value: &str) -> bool {
    value.trim().is_empty()
}

fn non_blank(
    value: &str,
    on_blank: impl FnOnce() -> BridgeDomainError,
) -> Result<String, BridgeDomainError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(on_blank())
    } else {
        Ok(trimmed.to_owned())
    }
}

fn check_base_url(url: &str) -> Result<(), BridgeDomainError> {
    if url.is_empty() {
        return Err(BridgeDomainError::EmptyHttpSseBaseUrl);
    }
    if ["http://", "https://"]
        .iter()
        .any(|scheme| url.starts_with(scheme))
    {
        Ok(())
    } else {
        Err(BridgeDomainError::InvalidHttpSseBaseUrl(url.to_owned()))
    }
}
