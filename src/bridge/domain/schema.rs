//! Translation of provider parameter schemas into [`ParameterList`]s.
//!
//! Only the structural "object with `properties` and `required`" shape is
//! understood. Anything else is rejected so a provider cannot silently expose
//! an operation whose parameters the adapter layer would misreport.

use super::{ParameterList, ParameterSpec, ParameterType};
use serde_json::{Map, Value};
use thiserror::Error;

/// Keywords that describe a schema by composition rather than by properties.
const COMPOSITION_KEYWORDS: [&str; 4] = ["anyOf", "oneOf", "allOf", "$ref"];

/// Unsupported schema shapes.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SchemaError {
    /// The schema is not a JSON object.
    #[error("parameter schema must be a JSON object, got {0}")]
    NotAnObject(&'static str),

    /// The top-level `type` is something other than `"object"`.
    #[error("parameter schema must have type \"object\", got {0}")]
    NotObjectType(String),

    /// The schema is expressed through composition keywords.
    #[error("parameter schema uses unsupported keyword '{0}'")]
    UnsupportedComposition(String),

    /// `properties` is present but not an object.
    #[error("parameter schema 'properties' must be an object")]
    MalformedProperties,

    /// One property's schema is not an object.
    #[error("schema for parameter '{0}' must be an object")]
    MalformedProperty(String),

    /// `required` is present but not an array of strings.
    #[error("parameter schema 'required' must be an array of strings")]
    MalformedRequired,

    /// `required` names a parameter absent from `properties`.
    #[error("required parameter '{0}' is not declared in 'properties'")]
    UndeclaredRequired(String),
}

/// Translates one operation's parameter schema.
///
/// Parameters keep the order in which `properties` declares them. Optional
/// parameters carry the property's `default` when one is declared.
///
/// # Errors
///
/// Returns [`SchemaError`] when the schema is not the supported shape.
pub fn translate_schema(schema: &Value) -> Result<ParameterList, SchemaError> {
    let Value::Object(root) = schema else {
        return Err(SchemaError::NotAnObject(json_kind(schema)));
    };

    if let Some(declared) = root.get("type") {
        if declared.as_str() != Some("object") {
            return Err(SchemaError::NotObjectType(declared.to_string()));
        }
    }

    reject_composition(root)?;
    let properties = match root.get("properties") {
        None => return Ok(ParameterList::default()),
        Some(Value::Object(properties)) => properties,
        Some(_) => return Err(SchemaError::MalformedProperties),
    };

    let required = required_names(root)?;
    if let Some(undeclared) = required
        .iter()
        .find(|name| !properties.contains_key(name.as_str()))
    {
        return Err(SchemaError::UndeclaredRequired(undeclared.clone()));
    }

    properties
        .iter()
        .map(|(name, property)| translate_property(name, property, &required))
        .collect::<Result<Vec<_>, _>>()
        .map(ParameterList::new)
}

fn reject_composition(root: &Map<String, Value>) -> Result<(), SchemaError> {
    match COMPOSITION_KEYWORDS
        .iter()
        .find(|keyword| root.contains_key(**keyword))
    {
        Some(keyword) => Err(SchemaError::UnsupportedComposition((*keyword).to_owned())),
        None => Ok(()),
    }
}

fn required_names(root: &Map<String, Value>) -> Result<Vec<String>, SchemaError> {
    match root.get("required") {
        None => Ok(Vec::new()),
        Some(Value::Array(entries)) => entries
            .iter()
            .map(|entry| {
                entry
                    .as_str()
                    .map(str::to_owned)
                    .ok_or(SchemaError::MalformedRequired)
            })
            .collect(),
        Some(_) => Err(SchemaError::MalformedRequired),
    }
}

fn translate_property(
    name: &str,
    property: &Value,
    required: &[String],
) -> Result<ParameterSpec, SchemaError> {
    let Value::Object(fields) = property else {
        return Err(SchemaError::MalformedProperty(name.to_owned()));
    };

    let parameter_type = fields
        .get("type")
        .map_or(ParameterType::Any, declared_type);

    if required.iter().any(|required_name| required_name == name) {
        Ok(ParameterSpec::required(name, parameter_type))
    } else {
        Ok(ParameterSpec::optional(
            name,
            parameter_type,
            fields.get("default").cloned(),
        ))
    }
}

/// Maps a `type` value. Unions such as `["string", "null"]` map to their
/// first non-null member.
fn declared_type(declared: &Value) -> ParameterType {
    match declared {
        Value::String(keyword) => ParameterType::from_schema_keyword(keyword),
        Value::Array(members) => members
            .iter()
            .filter_map(Value::as_str)
            .find(|keyword| *keyword != "null")
            .map_or(ParameterType::Any, ParameterType::from_schema_keyword),
        _ => ParameterType::Any,
    }
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
