//! Remote operation metadata reported by a provider.

use super::BridgeDomainError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One callable operation exposed by a provider, as discovered on connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteOperation {
    name: String,
    description: String,
    input_schema: Value,
}

impl RemoteOperation {
    /// Creates an operation definition.
    ///
    /// The description may be empty; providers are not required to document
    /// their operations.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::EmptyOperationName`] when the name is
    /// empty after trimming.
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        input_schema: Value,
    ) -> Result<Self, BridgeDomainError> {
        let normalized_name = name.into().trim().to_owned();
        if normalized_name.is_empty() {
            return Err(BridgeDomainError::EmptyOperationName);
        }

        Ok(Self {
            name: normalized_name,
            description: description.into().trim().to_owned(),
            input_schema,
        })
    }

    /// Returns the operation name, unique within its provider.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the human-readable description.
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// Returns the raw parameter schema.
    #[must_use]
    pub const fn input_schema(&self) -> &Value {
        &self.input_schema
    }
}
