//! Codebase tools: whole-project analysis and implementation verification,
//! built on the Gemini CLI's `@path` file-inclusion syntax.

use gmt_core::{EngineError, InvocationRequest};
use gmt_engine::{Engine, InvocationContext};
use serde_json::{Value, json};

use super::{McpToolDef, opt_str, require_str, str_list, text_payload};

pub fn analyze_def() -> McpToolDef {
    McpToolDef {
        name: "analyze-codebase",
        description: "Analyze large codebases using Gemini's 2M+ token context window. Handles \
                      entire directories, multiple files, or whole projects. Perfect for: \
                      understanding architecture, finding patterns, analyzing dependencies, \
                      code review.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "paths": {
                    "description": "File or directory paths to analyze. Use @ syntax: '@src/', \
                                    '@package.json', '@./'. Single path or array of paths.",
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "question": {
                    "type": "string",
                    "description": "What you want to know about the codebase (e.g., 'explain the \
                                    architecture', 'find all API endpoints')"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override"
                }
            },
            "required": ["paths", "question"]
        }),
    }
}

pub fn verify_def() -> McpToolDef {
    McpToolDef {
        name: "verify-implementation",
        description: "Verify if features, patterns, or security measures are implemented in a \
                      codebase. Uses Gemini's large context to search the entire project. Returns \
                      specific files, functions, and implementation details.",
        input_schema: json!({
            "type": "object",
            "properties": {
                "paths": {
                    "description": "Directories/files to search in. Use @ syntax: '@src/', \
                                    '@lib/', '@./'. Single path or array.",
                    "anyOf": [
                        { "type": "string" },
                        { "type": "array", "items": { "type": "string" } }
                    ]
                },
                "feature": {
                    "type": "string",
                    "description": "Feature or pattern to check for (e.g., 'JWT authentication', \
                                    'rate limiting', 'Redis caching')"
                },
                "details": {
                    "type": "string",
                    "description": "Optional: specific aspects to verify (e.g., 'Show me the \
                                    middleware functions', 'Check error handling')"
                },
                "model": {
                    "type": "string",
                    "description": "Optional model override"
                }
            },
            "required": ["paths", "feature"]
        }),
    }
}

/// Normalize paths to the CLI's `@` inclusion syntax.
pub fn format_paths(paths: &[String]) -> Vec<String> {
    paths
        .iter()
        .map(|p| {
            let trimmed = p.trim();
            if trimmed.starts_with('@') {
                trimmed.to_string()
            } else {
                format!("@{trimmed}")
            }
        })
        .collect()
}

fn require_paths(args: &Value) -> Result<Vec<String>, EngineError> {
    let paths = str_list(args, "paths");
    if paths.is_empty() {
        return Err(EngineError::InvalidInput(
            "missing required argument 'paths'".to_string(),
        ));
    }
    Ok(format_paths(&paths))
}

pub fn analysis_prompt(paths: &[String], question: &str) -> String {
    format!(
        "{}\n\nAnalyze the above codebase and answer the following:\n\n{question}\n\n\
         Please provide a comprehensive analysis with specific file references, code examples \
         where relevant, and clear explanations.",
        paths.join(" ")
    )
}

pub fn verification_prompt(paths: &[String], feature: &str, details: Option<&str>) -> String {
    let details_section = details
        .map(|d| format!("\n\nSpecific aspects to check: {d}"))
        .unwrap_or_default();
    format!(
        "{}\n\nTASK: Verify if the following feature/pattern is implemented in the codebase:\n\
         \"{feature}\"{details_section}\n\n\
         Please provide:\n\
         1. YES/NO answer with confidence level\n\
         2. If YES:\n\
            - List all relevant files with exact paths\n\
            - Show specific functions, classes, or components involved\n\
            - Provide code snippets demonstrating the implementation\n\
            - Explain how it's implemented\n\
         3. If NO or PARTIAL:\n\
            - Explain what's missing\n\
            - Suggest what would be needed for full implementation\n\n\
         Be specific and thorough. Include file paths and line numbers where possible.",
        paths.join(" ")
    )
}

pub async fn handle_analyze(
    engine: &Engine,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let paths = require_paths(args)?;
    let question = require_str(args, "question")?;

    let req = InvocationRequest::new(analysis_prompt(&paths, question))
        .with_model(opt_str(args, "model").map(String::from));
    let invocation = engine.invoke(&req, ctx).await?;
    Ok(text_payload(format!("Gemini response:\n\n{}", invocation.text)))
}

pub async fn handle_verify(
    engine: &Engine,
    args: &Value,
    ctx: &InvocationContext,
) -> Result<Value, EngineError> {
    let paths = require_paths(args)?;
    let feature = require_str(args, "feature")?;

    let prompt = verification_prompt(&paths, feature, opt_str(args, "details"));
    let req =
        InvocationRequest::new(prompt).with_model(opt_str(args, "model").map(String::from));
    let invocation = engine.invoke(&req, ctx).await?;
    Ok(text_payload(format!("Gemini response:\n\n{}", invocation.text)))
}
