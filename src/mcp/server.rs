use crate::app::App;
use crate::constants::protocol::{PROTOCOL_VERSION, SERVER_NAME};
use crate::errors::{ErrorCode, McpError, ToolError, ToolErrorKind};
use crate::mcp::catalog::{list_tools, validate_tool_args};
use crate::mcp::help::build_help_payload;
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::normalize::strip_lone_surrogate_escapes;
use crate::services::logger::LogLevel;
use crate::services::tool_executor::ToolCallMeta;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader, BufWriter};

const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

pub(crate) fn map_tool_error(tool: &str, error: &ToolError) -> McpError {
    let mut lines = vec![
        format!("tool: {}", tool),
        format!("kind: {:?}", error.kind).to_lowercase(),
        format!("code: {}", error.code),
        format!("retryable: {}", error.retryable),
        format!("message: {}", error.message),
    ];
    if let Some(hint) = &error.hint {
        lines.push(format!("hint: {}", hint));
    }
    if let Some(details) = &error.details {
        lines.push(format!("details: {}", details));
    }
    let message = lines.join("\n");

    match error.kind {
        ToolErrorKind::InvalidParams => McpError::new(ErrorCode::InvalidParams, message),
        ToolErrorKind::Timeout => McpError::new(ErrorCode::RequestTimeout, message),
        ToolErrorKind::Denied
        | ToolErrorKind::Conflict
        | ToolErrorKind::NotFound
        | ToolErrorKind::Retryable => McpError::new(ErrorCode::RemoteError, message),
        ToolErrorKind::Internal => McpError::new(ErrorCode::InternalError, message),
    }
}

fn text_content(envelope: &Value) -> Value {
    json!({
        "content": [{
            "type": "text",
            "text": serde_json::to_string(envelope).unwrap_or_else(|_| "{}".to_string()),
        }]
    })
}

pub struct McpServer {
    app: Arc<App>,
}

impl McpServer {
    pub fn new() -> Result<Self, ToolError> {
        let app = App::initialize()?;
        Ok(Self::with_app(Arc::new(app)))
    }

    pub fn with_app(app: Arc<App>) -> Self {
        Self { app }
    }

    fn handle_initialize(&self) -> Value {
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {"tools": {}, "logging": {}},
            "serverInfo": {"name": SERVER_NAME, "version": SERVER_VERSION},
        })
    }

    fn handle_tools_list(&self) -> Value {
        json!({ "tools": list_tools() })
    }

    fn handle_set_level(&self, params: &Value) -> Result<Value, McpError> {
        let raw = params.get("level").and_then(|v| v.as_str()).unwrap_or("");
        let level = LogLevel::parse(raw).ok_or_else(|| {
            McpError::new(
                ErrorCode::InvalidParams,
                format!("Unknown log level: {}", raw),
            )
        })?;
        self.app.logger.set_level(level);
        Ok(json!({}))
    }

    async fn handle_tools_call(&self, name: &str, raw_args: Value) -> Result<Value, McpError> {
        let args = if raw_args.is_null() {
            json!({})
        } else {
            raw_args
        };

        if name == "help" {
            validate_tool_args(name, &args)?;
            let result = build_help_payload(&args);
            let trace_id = args
                .get("trace_id")
                .and_then(|v| v.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let envelope = self.app.tool_executor.wrap_result(
                name,
                &args,
                result,
                ToolCallMeta {
                    started_at: chrono::Utc::now().timestamp_millis(),
                    trace_id,
                    invoked_as: None,
                    normalized_args: None,
                },
            );
            return Ok(text_content(&envelope));
        }

        let call = self
            .app
            .tool_executor
            .resolve_call(name, args)
            .map_err(|err| map_tool_error(name, &err))?;
        validate_tool_args(&call.tool, &call.args)?;

        let tool = call.tool.clone();
        let envelope = self
            .app
            .tool_executor
            .execute_resolved(call)
            .await
            .map_err(|err| map_tool_error(&tool, &err))?;
        Ok(text_content(&envelope))
    }

    /// Handles one JSON-RPC message. `None` means nothing is written back.
    pub async fn handle_message(&self, raw: &str) -> Option<JsonRpcResponse> {
        let cleaned = strip_lone_surrogate_escapes(raw);
        let parsed: Value = match serde_json::from_str(&cleaned) {
            Ok(value) => value,
            Err(_) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    ErrorCode::ParseError.as_i32(),
                    "Parse error".to_string(),
                ))
            }
        };
        let id_hint = parsed.get("id").cloned().unwrap_or(Value::Null);
        let request = match serde_json::from_value::<JsonRpcRequest>(parsed) {
            Ok(req) if req.jsonrpc == "2.0" => req,
            _ => {
                return Some(JsonRpcResponse::failure(
                    id_hint,
                    ErrorCode::InvalidRequest.as_i32(),
                    "Invalid request".to_string(),
                ))
            }
        };

        // Notifications never get a response, whatever the method.
        let id = request.id.clone()?;
        let outcome = match request.method.as_str() {
            "initialize" => Ok(self.handle_initialize()),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(self.handle_tools_list()),
            "resources/list" => Ok(json!({"resources": []})),
            "prompts/list" => Ok(json!({"prompts": []})),
            "logging/setLevel" => self.handle_set_level(&request.params),
            "tools/call" => {
                let params = request.params.as_object().cloned().unwrap_or_default();
                match params.get("name").and_then(|v| v.as_str()) {
                    Some(name) if !name.is_empty() => {
                        let args = params.get("arguments").cloned().unwrap_or(Value::Null);
                        self.handle_tools_call(name, args).await
                    }
                    _ => Err(McpError::new(ErrorCode::InvalidParams, "Missing tool name")),
                }
            }
            other => Err(McpError::method_not_found(other)),
        };
        Some(match outcome {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(err) => JsonRpcResponse::failure(id, err.code.as_i32(), err.message),
        })
    }

    /// Newline-delimited JSON-RPC. Lines are decoded lossily so that a client
    /// sending invalid UTF-8 gets an answer instead of a dead connection.
    pub async fn serve<R, W>(&self, reader: R, writer: W) -> Result<(), ToolError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut reader = reader;
        let mut writer = BufWriter::new(writer);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf).await?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8_lossy(&buf);
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if let Some(response) = self.handle_message(trimmed).await {
                let payload = serde_json::to_string(&response)?;
                writer.write_all(payload.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok(())
    }

    pub async fn run_stdio(&self) -> Result<(), ToolError> {
        self.app.logger.info(
            "serving on stdio",
            Some(&json!({"version": SERVER_VERSION, "protocol": PROTOCOL_VERSION})),
        );
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }
}

pub async fn run_stdio() -> Result<(), ToolError> {
    let server = McpServer::new()?;
    server.run_stdio().await
}
