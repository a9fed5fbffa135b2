//! Typed parameter descriptions derived from provider schemas.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Semantic type of one operation parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParameterType {
    /// JSON string.
    String,
    /// JSON integer.
    Integer,
    /// JSON number.
    Float,
    /// JSON boolean.
    Boolean,
    /// JSON array.
    Array,
    /// JSON object.
    Object,
    /// Undeclared or unrecognised type; any value is accepted.
    Any,
}

impl ParameterType {
    /// Maps a JSON Schema type keyword. Unknown keywords map to
    /// [`ParameterType::Any`].
    #[must_use]
    pub fn from_schema_keyword(keyword: &str) -> Self {
        match keyword {
            "string" => Self::String,
            "integer" => Self::Integer,
            "number" => Self::Float,
            "boolean" => Self::Boolean,
            "array" => Self::Array,
            "object" => Self::Object,
            _ => Self::Any,
        }
    }

    /// Returns the canonical representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Integer => "integer",
            Self::Float => "float",
            Self::Boolean => "boolean",
            Self::Array => "array",
            Self::Object => "object",
            Self::Any => "any",
        }
    }
}

impl fmt::Display for ParameterType {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Whether a parameter must be supplied, and what fills it when it is not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind")]
pub enum Requirement {
    /// Every call must supply the parameter.
    Required,
    /// The parameter may be omitted.
    Optional {
        /// Value sent when the caller omits the parameter. `None` means the
        /// parameter is left out of the argument set entirely.
        default: Option<Value>,
    },
}

/// One parameter's name, type and requirement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParameterSpec {
    name: String,
    parameter_type: ParameterType,
    requirement: Requirement,
}

impl ParameterSpec {
    /// Creates a required parameter.
    #[must_use]
    pub fn required(name: impl Into<String>, parameter_type: ParameterType) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            requirement: Requirement::Required,
        }
    }

    /// Creates an optional parameter with an optional default.
    #[must_use]
    pub fn optional(
        name: impl Into<String>,
        parameter_type: ParameterType,
        default: Option<Value>,
    ) -> Self {
        Self {
            name: name.into(),
            parameter_type,
            requirement: Requirement::Optional { default },
        }
    }

    /// Returns the parameter name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the semantic type.
    #[must_use]
    pub const fn parameter_type(&self) -> ParameterType {
        self.parameter_type
    }

    /// Returns the requirement.
    #[must_use]
    pub const fn requirement(&self) -> &Requirement {
        &self.requirement
    }

    /// Returns whether callers must supply this parameter.
    #[must_use]
    pub const fn is_required(&self) -> bool {
        matches!(self.requirement, Requirement::Required)
    }

    /// Returns the default for an optional parameter, if declared.
    #[must_use]
    pub const fn default_value(&self) -> Option<&Value> {
        match &self.requirement {
            Requirement::Required => None,
            Requirement::Optional { default } => default.as_ref(),
        }
    }
}

/// Parameters of one operation in schema declaration order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterList(Vec<ParameterSpec>);

impl ParameterList {
    /// Wraps parameters, keeping their order.
    #[must_use]
    pub const fn new(parameters: Vec<ParameterSpec>) -> Self {
        Self(parameters)
    }

    /// Returns the parameters in declaration order.
    #[must_use]
    pub fn as_slice(&self) -> &[ParameterSpec] {
        &self.0
    }

    /// Iterates the parameters in declaration order.
    pub fn iter(&self) -> std::slice::Iter<'_, ParameterSpec> {
        self.0.iter()
    }

    /// Finds a parameter by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParameterSpec> {
        self.0.iter().find(|parameter| parameter.name() == name)
    }

    /// Returns the number of parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns whether the operation takes no parameters.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterates the names of required parameters.
    pub fn required_names(&self) -> impl Iterator<Item = &str> {
        self.0
            .iter()
            .filter(|parameter| parameter.is_required())
            .map(ParameterSpec::name)
    }
}

impl<'a> IntoIterator for &'a ParameterList {
    type Item = &'a ParameterSpec;
    type IntoIter = std::slice::Iter<'a, ParameterSpec>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
