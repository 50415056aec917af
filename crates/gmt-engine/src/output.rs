//! Aggregation of the CLI's structured output formats into one final string.
//!
//! The engine never interprets the semantic content of the output; it only
//! unwraps the CLI's JSON envelopes. On any parse failure the raw text is
//! passed through unchanged.

use gmt_core::OutputFormat;
use serde_json::Value;
use tracing::debug;

pub fn aggregate_output(format: OutputFormat, raw: &str) -> String {
    match format {
        OutputFormat::Text => raw.to_string(),
        OutputFormat::Json => aggregate_json(raw),
        OutputFormat::StreamJson => aggregate_stream_json(raw),
    }
}

/// `--output-format json`: a single envelope with a `response` field.
fn aggregate_json(raw: &str) -> String {
    match serde_json::from_str::<Value>(raw.trim()) {
        Ok(value) => value
            .get("response")
            .and_then(Value::as_str)
            .map(str::to_string)
            .unwrap_or_else(|| raw.to_string()),
        Err(error) => {
            debug!(%error, "json output did not parse; passing raw text through");
            raw.to_string()
        }
    }
}

/// `--output-format stream-json`: JSONL events, parsed line by line.
///
/// Text-bearing events are concatenated in arrival order; a terminal event
/// carrying a full `response` supersedes the accumulated deltas.
fn aggregate_stream_json(raw: &str) -> String {
    let mut accumulated = String::new();
    let mut parsed_any = false;

    for line in raw.lines() {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }
        let Ok(event) = serde_json::from_str::<Value>(trimmed) else {
            continue;
        };
        parsed_any = true;

        if let Some(response) = event.get("response").and_then(Value::as_str) {
            return response.to_string();
        }
        collect_text(&event, &mut accumulated);
    }

    if parsed_any {
        accumulated
    } else {
        debug!("stream-json output had no parseable events; passing raw text through");
        raw.to_string()
    }
}

/// Pull text payloads out of one event: a top-level `text`/`delta` string or
/// nested `content[].text` blocks.
fn collect_text(event: &Value, out: &mut String) {
    for key in ["text", "delta"] {
        if let Some(text) = event.get(key).and_then(Value::as_str) {
            out.push_str(text);
            return;
        }
    }
    let blocks = event
        .get("content")
        .or_else(|| event.get("message").and_then(|m| m.get("content")));
    if let Some(items) = blocks.and_then(Value::as_array) {
        for item in items {
            if let Some(text) = item.get("text").and_then(Value::as_str) {
                out.push_str(text);
            }
        }
    }
}
