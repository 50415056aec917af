//! The primary tool: run a prompt through the Gemini CLI.
//!
//! In change mode the (large) structured-edit output is split and cached, and
//! the first page is returned with a cache key; follow-up pages come back
//! through the same tool or `fetch-chunk`.

use gmt_cache::ChunkStore;
use gmt_core::{EngineError, InvocationRequest};
use gmt_engine::{Engine, InvocationContext};
use serde_json::{Value, json};

use super::{McpToolDef, chunk_payload, opt_bool, opt_index, opt_str, require_str, text_payload};

pub fn def() -> McpToolDef {
    McpToolDef {
        name: "ask-gemini",
        description: "Execute 'gemini -p <prompt>' to get Gemini AI's response. Use @ syntax to \
                      include files (e.g., '@largefile.js explain what this does'). Supports \
                      enhanced change mode for structured edit suggestions.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Analysis request. Use @ syntax to include files."
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override (e.g. 'gemini-2.5-flash'). \
                                    Defaults to the server's configured model."
                },
                "sandbox": {
                    "type": "boolean",
                    "description": "Run in sandbox mode for safe code execution"
                },
                "changeMode": {
                    "type": "boolean",
                    "description": "Return structured edit suggestions, chunked and cached"
                },
                "chunkIndex": {
                    "type": "number",
                    "description": "1-based index of the chunk to retrieve from a prior changeMode result"
                },
                "chunkCacheKey": {
                    "type": "string",
                    "description": "Cache key of a prior changeMode result"
                }
            },
            "required": ["prompt"]
        }),
    }
}

pub async fn handle(
    engine: &Engine,
    cache: &ChunkStore,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let change_mode = opt_bool(args, "changeMode");

    // Continuation of a previous change-mode result: serve from cache, no
    // child process involved.
    if change_mode {
        if let (Some(index), Some(key)) = (opt_index(args, "chunkIndex")?, opt_str(args, "chunkCacheKey")) {
            let chunk = cache.get(key, index)?;
            return Ok(chunk_payload(&chunk, key));
        }
    }

    let prompt = require_str(args, "prompt")?;
    let req = InvocationRequest::new(prompt)
        .with_model(opt_str(args, "model").map(String::from))
        .with_sandbox(opt_bool(args, "sandbox"))
        .with_change_mode(change_mode);

    let invocation = engine.invoke(&req, ctx).await?;

    if change_mode {
        let token = gmt_cache::generate_token();
        let key = gmt_cache::derive_key(prompt, &token);
        let max_chars = engine.config().chunk.max_chars;
        cache.store(&key, &invocation.text, max_chars);
        // A fresh run may ask for a later page directly.
        let index = opt_index(args, "chunkIndex")?.unwrap_or(1);
        let page = cache.get(&key, index)?;
        let mut payload = chunk_payload(&page, &key);
        if invocation.used_fallback {
            annotate_fallback(&mut payload);
        }
        return Ok(payload);
    }

    let mut text = String::new();
    if invocation.used_fallback {
        text.push_str(FALLBACK_NOTE);
        text.push_str("\n\n");
    }
    text.push_str("Gemini response:\n");
    text.push_str(&invocation.text);
    Ok(text_payload(text))
}

const FALLBACK_NOTE: &str = "[Retried with Flash model after quota exhaustion]";

/// Mark a chunked payload as produced by the fallback model. The note rides
/// alongside the chunk text so the cached pages stay byte-exact.
fn annotate_fallback(payload: &mut Value) {
    payload["usedFallback"] = Value::Bool(true);
    if let Some(items) = payload["content"].as_array_mut() {
        items.insert(0, json!({ "type": "text", "text": FALLBACK_NOTE }));
    }
}
