//! Web tools: search and fetch, both delegated to the Gemini CLI's built-in
//! `google_web_search` and `web_fetch` capabilities.

use gmt_core::{EngineError, InvocationRequest};
use gmt_engine::{Engine, InvocationContext};
use serde_json::{Value, json};

use super::{McpToolDef, opt_str, require_str, str_list, text_payload};

const MAX_FETCH_URLS: usize = 20;

pub fn search_def() -> McpToolDef {
    McpToolDef {
        name: "web-search",
        description: "Search the web using Gemini's google_web_search tool. Returns AI-processed \
                      summaries with citations, not raw search results. Perfect for: latest \
                      documentation, current events, API updates, tutorials, package info.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query. Gemini returns a processed summary with citations."
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override"
                }
            },
            "required": ["query"]
        }),
    }
}

pub fn fetch_def() -> McpToolDef {
    McpToolDef {
        name: "web-fetch",
        description: "Fetch and process web content using Gemini's web_fetch tool. Handles 1-20 \
                      URLs. Perfect for: fetching latest API docs, comparing documentation, \
                      extracting code examples, summarizing articles/blogs.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "urls": {
                    "description": "One or more URLs to fetch and analyze (http:// or https://). \
                                    Single URL string or array of URLs.",
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "instruction": {
                    "type": "string",
                    "description": "What to do with the fetched content (e.g., 'summarize key \
                                    points', 'compare these APIs', 'extract code examples')"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override"
                }
            },
            "required": ["urls", "instruction"]
        }),
    }
}

pub fn search_prompt(query: &str) -> String {
    format!(
        "Search the web for: {query}\n\nPlease use the google_web_search tool to find the most \
         current and relevant information. Provide a comprehensive summary with citations."
    )
}

pub async fn handle_search(
    engine: &Engine,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let query = require_str(args, "query")?;
    let req = InvocationRequest::new(search_prompt(query))
        .with_model(opt_str(args, "model").map(String::from));
    let invocation = engine.invoke(&req, ctx).await?;
    Ok(text_payload(format!("Gemini response:\n\n{}", invocation.text)))
}

pub fn validate_urls(urls: &[String]) -> Result<(), EngineError> {
    if urls.is_empty() {
        return Err(EngineError::InvalidInput(
            "missing required argument 'urls'".to_string(),
        ));
    }
    if urls.len() > MAX_FETCH_URLS {
        return Err(EngineError::InvalidInput(format!(
            "maximum {MAX_FETCH_URLS} URLs allowed per request, got {}",
            urls.len()
        )));
    }
    for url in urls {
        if !url.starts_with("http://") && !url.starts_with("https://") {
            return Err(EngineError::InvalidInput(format!(
                "invalid URL: {url}. URLs must start with http:// or https://"
            )));
        }
    }
    Ok(())
}

pub fn fetch_prompt(urls: &[String], instruction: &str) -> String {
    let plural = if urls.len() > 1 { "s" } else { "" };
    format!(
        "Please use the web_fetch tool to fetch and analyze the following URL{plural}: {}\n\n\
         Task: {instruction}\n\n\
         Provide detailed, relevant information based on the fetched content.",
        urls.join(", ")
    )
}

pub async fn handle_fetch(
    engine: &Engine,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let urls = str_list(args, "urls");
    validate_urls(&urls)?;
    let instruction = require_str(args, "instruction")?;

    let req = InvocationRequest::new(fetch_prompt(&urls, instruction))
        .with_model(opt_str(args, "model").map(String::from));
    let invocation = engine.invoke(&req, ctx).await?;
    Ok(text_payload(format!("Gemini response:\n\n{}", invocation.text)))
}
