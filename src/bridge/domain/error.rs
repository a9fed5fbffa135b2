//! Error types for bridge domain validation and parsing.

use super::ProviderName;
use thiserror::Error;

/// Errors returned while constructing bridge domain values.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BridgeDomainError {
    /// The provider name is empty after trimming.
    #[error("provider name must not be empty")]
    EmptyProviderName,

    /// The provider name contains characters outside `[a-z0-9_]`.
    #[error(
        "provider name '{0}' contains invalid characters (only lowercase alphanumeric and underscores allowed)"
    )]
    InvalidProviderName(String),

    /// The provider name exceeds the 100-character limit.
    #[error("provider name exceeds 100 character limit: {0}")]
    ProviderNameTooLong(String),

    /// Two provider configurations share a name.
    #[error("duplicate provider name: {0}")]
    DuplicateProvider(ProviderName),

    /// The STDIO command is empty.
    #[error("STDIO command must not be empty")]
    EmptyStdioCommand,

    /// The STDIO working directory is empty after trimming.
    #[error("STDIO working directory must not be empty when provided")]
    EmptyWorkingDirectory,

    /// The HTTP+SSE base URL is empty.
    #[error("HTTP+SSE base URL must not be empty")]
    EmptyHttpSseBaseUrl,

    /// The HTTP+SSE base URL does not have an `http://` or `https://` prefix.
    #[error("HTTP+SSE base URL '{0}' must start with 'http://' or 'https://'")]
    InvalidHttpSseBaseUrl(String),

    /// An operation name is empty after trimming.
    #[error("operation name must not be empty")]
    EmptyOperationName,

    /// Transitioning between two client lifecycle states is invalid.
    #[error("invalid client lifecycle transition: {from} -> {to}")]
    InvalidLifecycleTransition {
        /// Current lifecycle state.
        from: String,
        /// Requested target lifecycle state.
        to: String,
    },
}

/// Error returned while parsing a client lifecycle state.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("unknown client lifecycle state: {0}")]
pub struct ParseClientLifecycleStateError(pub String);
