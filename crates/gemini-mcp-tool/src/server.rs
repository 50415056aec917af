//! JSON-RPC 2.0 stdio server.
//!
//! Exposes the Gemini execution engine as MCP tools. One task owns stdout, so
//! responses and progress notifications never interleave mid-frame; each
//! `tools/call` runs in its own task and can be cancelled via
//! `notifications/cancelled`.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use gmt_cache::ChunkStore;
use gmt_core::EngineError;
use gmt_engine::{Engine, EngineConfig, InvocationContext};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// JSON-RPC 2.0 Request
#[derive(Deserialize)]
struct JsonRpcRequest {
    #[allow(dead_code)]
    jsonrpc: String,
    method: String,
    #[serde(default)]
    params: Option<Value>,
    id: Option<Value>,
}

/// JSON-RPC 2.0 Response
#[derive(Serialize)]
struct JsonRpcResponse {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<JsonRpcError>,
    id: Option<Value>,
}

/// JSON-RPC 2.0 Error
#[derive(Serialize)]
struct JsonRpcError {
    code: i32,
    message: String,
}

impl JsonRpcResponse {
    fn result(id: Option<Value>, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            result: Some(result),
            error: None,
            id,
        }
    }

    fn error(id: Option<Value>, code: i32, message: String) -> Self {
        Self {
            jsonrpc: "2.0",
            result: None,
            error: Some(JsonRpcError { code, message }),
            id,
        }
    }
}

/// Shared server state: the engine, the chunk cache, the stdout writer
/// handle, and the in-flight request registry.
pub struct ServerState {
    pub engine: Engine,
    pub cache: ChunkStore,
    out: mpsc::UnboundedSender<String>,
    inflight: Mutex<HashMap<String, CancellationToken>>,
}

impl ServerState {
    pub fn new(config: EngineConfig, out: mpsc::UnboundedSender<String>) -> Arc<Self> {
        let cache = ChunkStore::new(config.chunk_ttl(), config.chunk.max_entries);
        Arc::new(Self {
            engine: Engine::new(config),
            cache,
            out,
            inflight: Mutex::new(HashMap::new()),
        })
    }

    fn send_response(&self, response: &JsonRpcResponse) {
        match serde_json::to_string(response) {
            Ok(frame) => {
                // Receiver gone means stdout is closed and we are shutting down.
                self.out.send(frame).ok();
            }
            Err(e) => error!("failed to serialize response: {e}"),
        }
    }

    fn send_progress(&self, token: &Value, sequence: u64, message: &str) {
        let frame = serde_json::json!({
            "jsonrpc": "2.0",
            "method": "notifications/progress",
            "params": {
                "progressToken": token,
                "progress": sequence,
                "message": message,
            }
        });
        self.out.send(frame.to_string()).ok();
    }

    fn register(&self, key: String, token: CancellationToken) {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .insert(key, token);
    }

    fn unregister(&self, key: &str) {
        self.inflight
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .remove(key);
    }

    fn cancel(&self, key: &str) -> bool {
        let inflight = self.inflight.lock().unwrap_or_else(|e| e.into_inner());
        match inflight.get(key) {
            Some(token) => {
                token.cancel();
                true
            }
            None => false,
        }
    }
}

/// Run the server until stdin closes.
pub async fn run(config: EngineConfig) -> Result<()> {
    info!(
        executable = %config.executable,
        default_model = %config.default_model,
        "starting MCP server on stdio"
    );

    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(frame) = out_rx.recv().await {
            if stdout.write_all(frame.as_bytes()).await.is_err() {
                break;
            }
            if stdout.write_all(b"\n").await.is_err() {
                break;
            }
            if stdout.flush().await.is_err() {
                break;
            }
        }
    });

    let state = ServerState::new(config, out_tx);

    let stdin = BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    while let Some(line) = lines.next_line().await.context("failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        handle_message(&state, &line);
    }

    info!("stdin closed; MCP server shutting down");
    drop(state);
    writer.await.ok();
    Ok(())
}

/// Parse one frame and act on it. Tool calls are spawned; everything else is
/// answered inline.
pub fn handle_message(state: &Arc<ServerState>, line: &str) {
    debug!("received: {line}");

    let request: JsonRpcRequest = match serde_json::from_str(line.trim()) {
        Ok(req) => req,
        Err(e) => {
            error!("failed to parse JSON-RPC request: {e}");
            state.send_response(&JsonRpcResponse::error(
                None,
                -32700,
                format!("Parse error: {e}"),
            ));
            return;
        }
    };

    let id = request.id.clone();
    match request.method.as_str() {
        "initialize" => {
            state.send_response(&JsonRpcResponse::result(
                id,
                serde_json::json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {
                        "tools": {}
                    },
                    "serverInfo": {
                        "name": "gemini-mcp-tool",
                        "version": env!("CARGO_PKG_VERSION")
                    }
                }),
            ));
        }
        "notifications/initialized" => {
            debug!("client initialized");
        }
        "notifications/cancelled" => {
            let request_id = request
                .params
                .as_ref()
                .and_then(|p| p.get("requestId"))
                .cloned();
            match request_id {
                Some(request_id) => {
                    let key = id_key(&request_id);
                    if state.cancel(&key) {
                        info!(request = %key, "cancellation requested");
                    } else {
                        debug!(request = %key, "cancellation for unknown or finished request");
                    }
                }
                None => warn!("cancelled notification without requestId"),
            }
        }
        "tools/list" => {
            let tools = crate::tools::definitions();
            state.send_response(&JsonRpcResponse::result(
                id,
                serde_json::json!({ "tools": tools }),
            ));
        }
        "tools/call" => {
            let state = state.clone();
            tokio::spawn(async move {
                handle_tool_call(state, id, request.params).await;
            });
        }
        "ping" => {
            state.send_response(&JsonRpcResponse::result(id, serde_json::json!({})));
        }
        "shutdown" => {
            state.send_response(&JsonRpcResponse::result(id, serde_json::json!({})));
        }
        method if method.starts_with("notifications/") => {
            debug!("ignoring notification: {method}");
        }
        method => {
            state.send_response(&JsonRpcResponse::error(
                id,
                -32601,
                format!("Method not found: {method}"),
            ));
        }
    }
}

async fn handle_tool_call(state: Arc<ServerState>, id: Option<Value>, params: Option<Value>) {
    let params = params.unwrap_or(Value::Null);
    let name = match params.get("name").and_then(|v| v.as_str()) {
        Some(name) => name.to_string(),
        None => {
            state.send_response(&JsonRpcResponse::error(
                id,
                -32602,
                "Missing tool name".to_string(),
            ));
            return;
        }
    };
    let arguments = params.get("arguments").cloned().unwrap_or(Value::Null);
    let progress_token = params
        .get("_meta")
        .and_then(|m| m.get("progressToken"))
        .cloned();

    debug!(tool = %name, "tool call");

    let (ctx, mut progress_rx) = InvocationContext::new();

    // Register before the forwarder starts so a cancellation racing the
    // spawn still finds its token.
    let key = id.as_ref().map(id_key);
    if let Some(key) = &key {
        state.register(key.clone(), ctx.cancel.clone());
    }

    // Forward progress events for as long as the invocation is live; the
    // channel closes on resolution, which ends this task.
    let forwarder = {
        let state = state.clone();
        tokio::spawn(async move {
            while let Some(event) = progress_rx.recv().await {
                match &progress_token {
                    Some(token) => state.send_progress(token, event.sequence, &event.message),
                    None => debug!(
                        sequence = event.sequence,
                        elapsed_ms = event.elapsed_ms,
                        "progress: {}",
                        event.message
                    ),
                }
            }
        })
    };

    let outcome =
        crate::tools::dispatch(&state.engine, &state.cache, &name, &arguments, &ctx).await;

    if let Some(key) = &key {
        state.unregister(key);
    }
    // Drop the context (and with it the progress sender) so the forwarder's
    // receive loop sees end-of-stream; only then hand back the response,
    // keeping every progress frame ahead of it.
    drop(ctx);
    forwarder.await.ok();

    match outcome {
        None => {
            state.send_response(&JsonRpcResponse::error(
                id,
                -32602,
                format!("Unknown tool: {name}"),
            ));
        }
        // A cancelled request gets no response; the client already moved on.
        Some(Err(EngineError::Cancelled)) => {
            info!(tool = %name, "tool call cancelled; suppressing response");
        }
        Some(Ok(result)) => {
            state.send_response(&JsonRpcResponse::result(id, result));
        }
        Some(Err(error)) => {
            // Tool-level failures travel as results with isError so the
            // model sees them; protocol errors are reserved for framing.
            state.send_response(&JsonRpcResponse::result(
                id,
                crate::tools::failure_payload(&error),
            ));
        }
    }
}

/// Canonical map key for a JSON-RPC id (number or string).
fn id_key(id: &Value) -> String {
    match id {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
