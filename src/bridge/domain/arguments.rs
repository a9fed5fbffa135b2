//! Call arguments and their binding against a [`ParameterList`].

use super::ParameterList;
use serde_json::{Map, Value};
use thiserror::Error;

/// Arguments supplied to one adapter call: positional values first, then
/// named values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CallArguments {
    positional: Vec<Value>,
    named: Map<String, Value>,
}

impl CallArguments {
    /// Creates an empty argument set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an argument set from named values.
    #[must_use]
    pub const fn from_named(named: Map<String, Value>) -> Self {
        Self {
            positional: Vec::new(),
            named,
        }
    }

    /// Creates an argument set from positional values.
    #[must_use]
    pub fn from_positional(positional: Vec<Value>) -> Self {
        Self {
            positional,
            named: Map::new(),
        }
    }

    /// Appends a positional value.
    #[must_use]
    pub fn arg(mut self, value: impl Into<Value>) -> Self {
        self.positional.push(value.into());
        self
    }

    /// Sets a named value, replacing any earlier value for the same name.
    #[must_use]
    pub fn named(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Returns the positional values.
    #[must_use]
    pub fn positional_values(&self) -> &[Value] {
        &self.positional
    }

    /// Returns the named values.
    #[must_use]
    pub const fn named_values(&self) -> &Map<String, Value> {
        &self.named
    }

    /// Binds these arguments to `parameters`, producing the keyed argument
    /// set sent to the provider.
    ///
    /// Positional values fill parameters in declaration order. Absent
    /// optional parameters receive their declared default, or are omitted
    /// when none is declared. The resulting map follows declaration order.
    ///
    /// # Errors
    ///
    /// Returns [`ArgumentBindingError`] when a required parameter is missing,
    /// a name is unknown, a parameter is supplied twice, or there are more
    /// positional values than parameters.
    pub fn bind(
        self,
        parameters: &ParameterList,
    ) -> Result<Map<String, Value>, ArgumentBindingError> {
        let Self { positional, mut named } = self;

        if positional.len() > parameters.len() {
            return Err(ArgumentBindingError::TooManyPositional {
                expected: parameters.len(),
                received: positional.len(),
            });
        }

        if let Some(unknown) = named
            .keys()
            .find(|name| parameters.get(name.as_str()).is_none())
        {
            return Err(ArgumentBindingError::UnexpectedArgument(unknown.clone()));
        }

        let mut positional_values = positional.into_iter();
        let mut bound = Map::new();
        for parameter in parameters {
            let name = parameter.name();
            let from_position = positional_values.next();
            let from_name = named.remove(name);

            let value = match (from_position, from_name) {
                (Some(_), Some(_)) => {
                    return Err(ArgumentBindingError::DuplicateArgument(name.to_owned()));
                }
                (Some(value), None) | (None, Some(value)) => Some(value),
                (None, None) if parameter.is_required() => {
                    return Err(ArgumentBindingError::MissingRequired(name.to_owned()));
                }
                (None, None) => parameter.default_value().cloned(),
            };

            if let Some(bound_value) = value {
                bound.insert(name.to_owned(), bound_value);
            }
        }

        Ok(bound)
    }
}

impl From<Map<String, Value>> for CallArguments {
    fn from(named: Map<String, Value>) -> Self {
        Self::from_named(named)
    }
}

/// Reasons a call's arguments cannot be bound to an operation's parameters.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ArgumentBindingError {
    /// A required parameter was not supplied.
    #[error("missing required argument '{0}'")]
    MissingRequired(String),

    /// A named argument matches no declared parameter.
    #[error("unexpected argument '{0}'")]
    UnexpectedArgument(String),

    /// A parameter was supplied both positionally and by name.
    #[error("argument '{0}' supplied both positionally and by name")]
    DuplicateArgument(String),

    /// More positional values than declared parameters.
    #[error("expected at most {expected} positional arguments, received {received}")]
    TooManyPositional {
        /// Number of declared parameters.
        expected: usize,
        /// Number of positional values supplied.
        received: usize,
    },
}
