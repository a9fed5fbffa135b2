//! Client session lifecycle states.

use super::{BridgeDomainError, ParseClientLifecycleStateError};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle state of a synchronous client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientLifecycleState {
    /// Constructed; no scheduler or provider session exists yet.
    Unstarted,
    /// Scheduler running, providers connected, adapters available.
    Active,
    /// Torn down. Terminal.
    Closed,
}

impl ClientLifecycleState {
    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Unstarted => "unstarted",
            Self::Active => "active",
            Self::Closed => "closed",
        }
    }

    /// Returns whether adapters may be invoked in this state.
    #[must_use]
    pub const fn accepts_calls(self) -> bool {
        matches!(self, Self::Active)
    }

    /// Returns whether transition to `target` is allowed.
    ///
    /// `Unstarted -> Closed` covers a startup that was aborted.
    #[must_use]
    pub const fn can_transition_to(self, target: Self) -> bool {
        matches!(
            (self, target),
            (Self::Unstarted, Self::Active | Self::Closed) | (Self::Active, Self::Closed)
        )
    }

    /// Returns `target` when the transition is allowed.
    ///
    /// # Errors
    ///
    /// Returns [`BridgeDomainError::InvalidLifecycleTransition`] otherwise.
    pub fn transition_to(self, target: Self) -> Result<Self, BridgeDomainError> {
        if self.can_transition_to(target) {
            Ok(target)
        } else {
            Err(BridgeDomainError::InvalidLifecycleTransition {
                from: self.as_str().to_owned(),
                to: target.as_str().to_owned(),
            })
        }
    }
}

impl fmt::Display for ClientLifecycleState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl TryFrom<&str> for ClientLifecycleState {
    type Error = ParseClientLifecycleStateError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        let normalized = value.trim().to_ascii_lowercase();
        match normalized.as_str() {
            "unstarted" => Ok(Self::Unstarted),
            "active" => Ok(Self::Active),
            "closed" => Ok(Self::Closed),
            _ => Err(ParseClientLifecycleStateError(value.to_owned())),
        }
    }
}
