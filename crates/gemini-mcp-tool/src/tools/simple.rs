//! Trivial tools: liveness echo and usage text. Neither touches the engine.

use gmt_core::EngineError;
use serde_json::{Value, json};

use super::{McpToolDef, opt_str, text_payload};

pub fn ping_def() -> McpToolDef {
    McpToolDef {
        name: "ping",
        description: "Echo test to verify the server is responsive.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "prompt": {
                    "type": "string",
                    "description": "Optional message to echo back"
                }
            }
        }),
    }
}

pub fn help_def() -> McpToolDef {
    McpToolDef {
        name: "help",
        description: "Describe the available tools and how to use them.",
        input_schema: json!({
            "type": "object",
            "properties": {}
        }),
    }
}

pub fn handle_ping(args: &Value) -> Result<Value, EngineError> {
    let message = opt_str(args, "prompt").unwrap_or("Pong!");
    Ok(text_payload(message))
}

const HELP_TEXT: &str = "\
gemini-mcp-tool: run the Gemini CLI through MCP.

Tools:
  ask-gemini            Run a prompt through Gemini. Use @ syntax to include
                        files ('@src/ explain this'). Options: model, sandbox,
                        changeMode (chunked edit suggestions).
  web-search            AI-summarized web search with citations.
  web-fetch             Fetch 1-20 URLs and process them per your instruction.
  analyze-codebase      Whole-project analysis via Gemini's large context.
  verify-implementation Check whether a feature or pattern exists in a codebase.
  brainstorm            Structured ideation (divergent, scamper, lateral, ...).
  fetch-chunk           Retrieve page N of a previous changeMode response
                        (cacheKey + chunkIndex).
  ping                  Echo test.
  help                  This text.

Long invocations report liveness through progress notifications; quota
exhaustion on the primary model triggers one automatic retry with Flash.";

pub fn handle_help() -> Result<Value, EngineError> {
    Ok(text_payload(HELP_TEXT))
}
