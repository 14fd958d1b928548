//! JSON-RPC 2.0 envelope and tool dispatch.

use crate::tools::{ToolError, ToolRegistry, ToolResult};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Instant;
use tracing::{debug, warn};

pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;

const JSONRPC_VERSION: &str = "2.0";

/// Incoming request
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    #[serde(default)]
    pub id: Value,
    pub method: String,
    #[serde(default)]
    pub params: Value,
}

/// Error object
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

/// Outgoing response; exactly one of `result` and `error` is set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<RpcError>,
}

impl RpcResponse {
    pub fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(RpcError {
                code,
                message: message.into(),
            }),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// Decode a request body. The error side is the response to send back.
pub fn parse_request(body: &[u8]) -> Result<RpcRequest, RpcResponse> {
    let value: Value = serde_json::from_slice(body)
        .map_err(|e| RpcResponse::error(Value::Null, PARSE_ERROR, format!("Parse error: {e}")))?;
    let id = value.get("id").cloned().unwrap_or(Value::Null);
    let request: RpcRequest = serde_json::from_value(value)
        .map_err(|e| RpcResponse::error(id.clone(), INVALID_REQUEST, format!("Invalid request: {e}")))?;
    match request.jsonrpc.as_deref() {
        None | Some(JSONRPC_VERSION) => Ok(request),
        Some(other) => Err(RpcResponse::error(
            id,
            INVALID_REQUEST,
            format!("Unsupported jsonrpc version: {other}"),
        )),
    }
}

/// Route a request to the registry.
pub async fn dispatch(registry: &ToolRegistry, request: RpcRequest) -> RpcResponse {
    debug!(method = %request.method, "rpc request");
    let id = request.id;
    match request.method.as_str() {
        "tools/list" => RpcResponse::result(id, json!({ "tools": registry.definitions() })),
        "tools/call" => call_tool(registry, id, request.params).await,
        other => RpcResponse::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}")),
    }
}

async fn call_tool(registry: &ToolRegistry, id: Value, params: Value) -> RpcResponse {
    let call: CallParams = match serde_json::from_value(params) {
        Ok(call) => call,
        Err(e) => return RpcResponse::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
    };
    if !registry.has(&call.name) {
        return RpcResponse::error(id, INVALID_PARAMS, format!("Unknown tool: {}", call.name));
    }

    let started = Instant::now();
    let outcome = registry.execute(&call.name, call.arguments).await;
    let elapsed_ms = started.elapsed().as_millis() as u64;

    let result = match outcome {
        Ok(output) => {
            debug!(tool = %call.name, success = output.success, elapsed_ms, "Tool finished");
            if output.success {
                ToolResult::success(output.content)
            } else {
                ToolResult::error(output.content)
            }
        }
        Err(ToolError::InvalidParameters(msg)) | Err(ToolError::NotFound(msg)) => {
            return RpcResponse::error(id, INVALID_PARAMS, msg)
        }
        Err(e) => {
            warn!(tool = %call.name, error = %e, elapsed_ms, "Tool failed");
            ToolResult::error(e.to_string())
        }
    }
    .with_execution_time(elapsed_ms);

    match serde_json::to_value(&result) {
        Ok(value) => RpcResponse::result(id, value),
        Err(e) => RpcResponse::error(id, INVALID_REQUEST, e.to_string()),
    }
}
