//! Tool registry: definitions, argument coercion, and dispatch.

use gmt_cache::{Chunk, ChunkStore};
use gmt_core::EngineError;
use gmt_engine::{Engine, InvocationContext};
use serde::Serialize;
use serde_json::{Value, json};

pub mod ask_gemini;
pub mod brainstorm;
pub mod chunks;
pub mod codebase;
pub mod simple;
pub mod web;

/// MCP Tool Definition
#[derive(Serialize)]
pub struct McpToolDef {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

pub fn definitions() -> Vec<McpToolDef> {
    vec![
        ask_gemini::def(),
        web::search_def(),
        web::fetch_def(),
        codebase::analyze_def(),
        codebase::verify_def(),
        brainstorm::def(),
        chunks::def(),
        simple::ping_def(),
        simple::help_def(),
    ]
}

/// Route one tool call by name. `None` means the tool does not exist.
pub async fn dispatch(
    engine: &Engine,
    cache: &ChunkStore,
    name: &str,
    args: &Value,
    ctx: &InvocationContext,
) -> Option<Result<Value, EngineError>> {
    match name {
        "ask-gemini" => Some(ask_gemini::handle(engine, cache, args, ctx).await),
        "web-search" => Some(web::handle_search(engine, args, ctx).await),
        "web-fetch" => Some(web::handle_fetch(engine, args, ctx).await),
        "analyze-codebase" => Some(codebase::handle_analyze(engine, args, ctx).await),
        "verify-implementation" => Some(codebase::handle_verify(engine, args, ctx).await),
        "brainstorm" => Some(brainstorm::handle(engine, args, ctx).await),
        "fetch-chunk" => Some(chunks::handle(cache, args)),
        "ping" => Some(simple::handle_ping(args)),
        "help" => Some(simple::handle_help()),
        _ => None,
    }
}

/// Plain single-text result.
pub fn text_payload(text: impl Into<String>) -> Value {
    json!({
        "content": [
            { "type": "text", "text": text.into() }
        ]
    })
}

/// One page of a chunked result, with the metadata a caller needs to
/// request the next page.
pub fn chunk_payload(chunk: &Chunk, cache_key: &str) -> Value {
    json!({
        "content": [
            { "type": "text", "text": chunk.text }
        ],
        "index": chunk.index,
        "total": chunk.total,
        "cacheKey": cache_key,
        "hasMore": chunk.has_more,
    })
}

/// Failure result the calling model can read and react to.
pub fn failure_payload(error: &EngineError) -> Value {
    json!({
        "content": [
            { "type": "text", "text": error.to_string() }
        ],
        "isError": true,
        "kind": error.kind(),
    })
}

pub(crate) fn require_str<'a>(args: &'a Value, key: &str) -> Result<&'a str, EngineError> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| EngineError::InvalidInput(format!("missing required argument '{key}'")))
}

pub(crate) fn opt_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.trim().is_empty())
}

/// Booleans arrive as real booleans or as the strings "true"/"false",
/// depending on the client.
pub(crate) fn opt_bool(args: &Value, key: &str) -> bool {
    match args.get(key) {
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Chunk indices arrive as numbers or as numeric strings.
pub(crate) fn opt_index(args: &Value, key: &str) -> Result<Option<usize>, EngineError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n
            .as_u64()
            .map(|n| Some(n as usize))
            .ok_or_else(|| EngineError::InvalidInput(format!("'{key}' must be a positive integer"))),
        Some(Value::String(s)) => s
            .trim()
            .parse::<usize>()
            .map(Some)
            .map_err(|_| EngineError::InvalidInput(format!("'{key}' must be a positive integer"))),
        Some(other) => Err(EngineError::InvalidInput(format!(
            "'{key}' must be a positive integer, got {other}"
        ))),
    }
}

/// A string-or-array-of-strings argument, flattened.
pub(crate) fn str_list(args: &Value, key: &str) -> Vec<String> {
    match args.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => vec![s.clone()],
        Some(Value::Array(items)) => items
            .iter()
            .filter_map(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(String::from)
            .collect(),
        _ => Vec::new(),
    }
}
