//! JSON-RPC 2.0 wire types and tool-listing decoding.

use crate::bridge::{
    domain::{ProviderName, RemoteOperation},
    ports::{ProviderSessionError, ProviderSessionResult},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub(super) const JSONRPC_VERSION: &str = "2.0";
pub(super) const PROTOCOL_VERSION: &str = "2024-11-05";

/// Internal error code used when a response carries neither result nor error.
pub(super) const INTERNAL_ERROR: i64 = -32603;

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcRequest<'a> {
    pub(super) const fn new(id: u64, method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            method,
            params,
        }
    }
}

#[derive(Debug, Serialize)]
pub(super) struct JsonRpcNotification<'a> {
    jsonrpc: &'static str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

impl<'a> JsonRpcNotification<'a> {
    pub(super) const fn new(method: &'a str, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            method,
            params,
        }
    }
}

#[derive(Debug, Deserialize)]
pub(super) struct JsonRpcResponse {
    #[serde(default)]
    pub(super) id: Option<u64>,
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    message: String,
    #[serde(default)]
    data: Option<Value>,
}

/// Splits a response into its result or the provider's error.
pub(super) fn extract_result(response: JsonRpcResponse) -> ProviderSessionResult<Value> {
    if let Some(error) = response.error {
        return Err(ProviderSessionError::Remote {
            code: error.code,
            message: error.message,
            data: error.data.map(Box::new),
        });
    }

    response.result.ok_or_else(|| ProviderSessionError::Remote {
        code: INTERNAL_ERROR,
        message: "response carries neither result nor error".to_owned(),
        data: None,
    })
}

pub(super) fn initialize_params() -> Value {
    json!({
        "protocolVersion": PROTOCOL_VERSION,
        "capabilities": {},
        "clientInfo": {
            "name": env!("CARGO_PKG_NAME"),
            "version": env!("CARGO_PKG_VERSION"),
        },
    })
}

pub(super) fn call_params(operation: &str, arguments: serde_json::Map<String, Value>) -> Value {
    json!({ "name": operation, "arguments": arguments })
}

#[derive(Debug, Deserialize)]
struct ToolListing {
    #[serde(default)]
    tools: Vec<WireTool>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WireTool {
    name: String,
    #[serde(default)]
    description: String,
    #[serde(default = "empty_object_schema", rename = "inputSchema")]
    input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({ "type": "object" })
}

/// One decoded page of a `tools/list` answer.
#[derive(Debug)]
pub(super) struct ToolPage {
    pub(super) operations: Vec<RemoteOperation>,
    pub(super) next_cursor: Option<String>,
}

pub(super) fn parse_tool_page(provider: &ProviderName, result: Value) -> ProviderSessionResult<ToolPage> {
    let listing: ToolListing =
        serde_json::from_value(result).map_err(|err| ProviderSessionError::Protocol {
            provider: provider.clone(),
            reason: format!("malformed tools/list result: {err}"),
        })?;

    let operations = listing
        .tools
        .into_iter()
        .map(|tool| {
            RemoteOperation::new(tool.name, tool.description, tool.input_schema).map_err(|err| {
                ProviderSessionError::Protocol {
                    provider: provider.clone(),
                    reason: err.to_string(),
                }
            })
        })
        .collect::<ProviderSessionResult<Vec<_>>>()?;

    Ok(ToolPage {
        operations,
        next_cursor: listing.next_cursor.filter(|cursor| !cursor.is_empty()),
    })
}
