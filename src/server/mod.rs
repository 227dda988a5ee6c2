//! Usage: Stdio JSON-RPC server loop and method dispatch.
//!
//! One JSON message per line on stdin, responses on stdout. Logs go to
//! stderr only; stdout carries nothing but protocol frames.

pub mod prompts;
pub mod protocol;
pub mod resources;
pub mod tools;

use crate::shared::error::{AppError, AppResult};
use crate::xero::XeroApi;
use protocol::{
    CallToolParams, GetPromptParams, Implementation, InitializeResult, JsonRpcError,
    JsonRpcMessage, JsonRpcResponse, ListPromptsResult, ListResourcesResult, ListToolsResult,
    PromptsCapability, ReadResourceParams, ResourcesCapability, ServerCapabilities,
    ToolsCapability, PROTOCOL_VERSION,
};
use resources::ResourceRouter;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tools::ToolRouter;

pub struct McpServer {
    info: Implementation,
    tools: ToolRouter,
    resources: ResourceRouter,
}

impl McpServer {
    pub fn new(api: Arc<XeroApi>) -> Self {
        Self {
            info: Implementation {
                name: env!("CARGO_PKG_NAME").to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
            },
            tools: ToolRouter::new(api.clone()),
            resources: ResourceRouter::new(api),
        }
    }

    pub async fn run_stdio(&self) -> AppResult<()> {
        let stdin = tokio::io::stdin();
        let mut stdout = tokio::io::stdout();
        let mut reader = BufReader::new(stdin);
        let mut line = String::new();

        loop {
            line.clear();
            let read = reader
                .read_line(&mut line)
                .await
                .map_err(|e| AppError::Internal(format!("stdin read failed: {e}")))?;
            if read == 0 {
                tracing::info!("stdin closed, shutting down");
                return Ok(());
            }
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }

            if let Some(response) = self.handle_message(trimmed).await {
                let encoded = serde_json::to_string(&response)
                    .map_err(|e| AppError::Internal(format!("response encode failed: {e}")))?;
                stdout
                    .write_all(encoded.as_bytes())
                    .await
                    .map_err(|e| AppError::Internal(format!("stdout write failed: {e}")))?;
                stdout
                    .write_all(b"\n")
                    .await
                    .map_err(|e| AppError::Internal(format!("stdout write failed: {e}")))?;
                stdout
                    .flush()
                    .await
                    .map_err(|e| AppError::Internal(format!("stdout flush failed: {e}")))?;
            }
        }
    }

    pub async fn handle_message(&self, message: &str) -> Option<JsonRpcResponse> {
        let message: JsonRpcMessage = match serde_json::from_str(message) {
            Ok(m) => m,
            Err(e) => {
                return Some(JsonRpcResponse::error(
                    0,
                    JsonRpcError::PARSE_ERROR,
                    format!("parse error: {e}"),
                ));
            }
        };

        let request = match message {
            // Notifications (initialized, cancelled, ...) never get a reply.
            JsonRpcMessage::Notification(notification) => {
                tracing::debug!(method = %notification.method, "notification");
                return None;
            }
            JsonRpcMessage::Request(request) => request,
        };

        tracing::debug!(method = %request.method, "request");
        match request.method.as_str() {
            "initialize" => {
                let result = InitializeResult {
                    protocol_version: PROTOCOL_VERSION.to_string(),
                    capabilities: ServerCapabilities {
                        tools: Some(ToolsCapability::default()),
                        resources: Some(ResourcesCapability::default()),
                        prompts: Some(PromptsCapability::default()),
                    },
                    server_info: self.info.clone(),
                    instructions: None,
                };
                Some(JsonRpcResponse::success(request.id, result))
            }
            "tools/list" => Some(JsonRpcResponse::success(
                request.id,
                ListToolsResult {
                    tools: self.tools.definitions(),
                    next_cursor: None,
                },
            )),
            "tools/call" => {
                let params: CallToolParams = match parse_params(request.params) {
                    Ok(p) => p,
                    Err(message) => {
                        return Some(JsonRpcResponse::error(
                            request.id,
                            JsonRpcError::INVALID_PARAMS,
                            message,
                        ));
                    }
                };
                match self.tools.call(&params.name, params.arguments).await {
                    Some(result) => Some(JsonRpcResponse::success(request.id, result)),
                    None => Some(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::INVALID_PARAMS,
                        format!("tool not found: {}", params.name),
                    )),
                }
            }
            "prompts/list" => Some(JsonRpcResponse::success(
                request.id,
                ListPromptsResult {
                    prompts: prompts::descriptors(),
                },
            )),
            "prompts/get" => {
                let params: GetPromptParams = match parse_params(request.params) {
                    Ok(p) => p,
                    Err(message) => {
                        return Some(JsonRpcResponse::error(
                            request.id,
                            JsonRpcError::INVALID_PARAMS,
                            message,
                        ));
                    }
                };
                match prompts::render(&params.name, &params.arguments) {
                    Some(Ok(result)) => Some(JsonRpcResponse::success(request.id, result)),
                    Some(Err(message)) => Some(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::INVALID_PARAMS,
                        message,
                    )),
                    None => Some(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::INVALID_PARAMS,
                        format!("prompt not found: {}", params.name),
                    )),
                }
            }
            "resources/list" => Some(JsonRpcResponse::success(
                request.id,
                ListResourcesResult {
                    resources: resources::descriptors(),
                },
            )),
            "resources/read" => {
                let params: ReadResourceParams = match parse_params(request.params) {
                    Ok(p) => p,
                    Err(message) => {
                        return Some(JsonRpcResponse::error(
                            request.id,
                            JsonRpcError::INVALID_PARAMS,
                            message,
                        ));
                    }
                };
                match self.resources.read(&params.uri).await {
                    Some(Ok(result)) => Some(JsonRpcResponse::success(request.id, result)),
                    Some(Err(e)) => Some(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::INTERNAL_ERROR,
                        e.to_string(),
                    )),
                    None => Some(JsonRpcResponse::error(
                        request.id,
                        JsonRpcError::INVALID_PARAMS,
                        format!("resource not found: {}", params.uri),
                    )),
                }
            }
            other => Some(JsonRpcResponse::error(
                request.id,
                JsonRpcError::METHOD_NOT_FOUND,
                format!("method not found: {other}"),
            )),
        }
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(
    params: Option<serde_json::Value>,
) -> Result<T, String> {
    let params = params.ok_or_else(|| "missing params".to_string())?;
    serde_json::from_value(params).map_err(|e| format!("invalid params: {e}"))
}
